use std::fmt;
use std::io::{self, Stdout, Write};

use super::styling::{muted, status_tag, warning_label};

/// Outcome of one per-job operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Created,
    Updated,
    Removed,
    NotFound,
    Started,
    Running,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::Removed => "REMOVED",
            Self::NotFound => "NOT FOUND",
            Self::Started => "STARTED",
            Self::Running => "RUNNING",
        })
    }
}

/// Writes user-facing result lines, one per job.
pub struct Reporter<W: Write> {
    out: W,
    styled: bool,
}

impl Reporter<Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: io::stdout(),
            styled: console::colors_enabled(),
        }
    }
}

impl<W: Write> Reporter<W> {
    /// Plain, unstyled output into `out`.
    pub fn new(out: W) -> Self {
        Self { out, styled: false }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn tag(&self, status: JobStatus) -> String {
        if self.styled {
            status_tag(status).to_string()
        } else {
            format!("({status})")
        }
    }

    /// `target (STATUS)`
    pub fn status(&mut self, job: &str, status: JobStatus) -> io::Result<()> {
        let tag = self.tag(status);
        writeln!(self.out, "{job} {tag}")
    }

    /// `source => target (STATUS)`
    pub fn copied(&mut self, source: &str, target: &str, status: JobStatus) -> io::Result<()> {
        let tag = self.tag(status);
        writeln!(self.out, "{source} => {target} {tag}")
    }

    pub fn warning(&mut self, message: impl fmt::Display) -> io::Result<()> {
        if self.styled {
            writeln!(self.out, "  {} {message}", warning_label())
        } else {
            writeln!(self.out, "  warning: {message}")
        }
    }

    pub fn line(&mut self, text: impl fmt::Display) -> io::Result<()> {
        writeln!(self.out, "{text}")
    }

    pub fn note(&mut self, text: impl fmt::Display) -> io::Result<()> {
        if self.styled {
            writeln!(self.out, "{}", muted(text))
        } else {
            writeln!(self.out, "{text}")
        }
    }

    /// Print `text` without a newline, ready for the user's answer.
    pub fn prompt(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{text}")?;
        self.out.flush()
    }
}
