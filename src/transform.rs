//! Rewrites a Jenkins job `config.xml` so it builds a feature branch.
//!
//! The document is parsed with `roxmltree` only to locate elements; every
//! edit is applied as a splice over the original text, so bytes outside the
//! edited elements are preserved exactly.

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

use log::debug;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const BRANCH_SPEC: &str = "hudson.plugins.git.BranchSpec";
const MAILER: &str = "hudson.tasks.Mailer";
const PARAMETERS_PROPERTY: &str = "hudson.model.ParametersDefinitionProperty";
const SCM_TRIGGER: &str = "hudson.triggers.SCMTrigger";
const BUILD_TRIGGER: &str = "hudson.tasks.BuildTrigger";

/// Polling schedule given to feature-branch jobs.
pub const POLL_SCHEDULE: &str = "H/5 * * * *";

/// Which edits `specialize` applies beyond the branch and mail recipient.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TransformProfile {
    /// Branch spec and mail recipient only
    #[default]
    Plain,
    /// Also tags the display name, drops build parameters and downstream
    /// triggers, and polls SCM every five minutes
    Isolated,
}

impl TransformProfile {
    /// Token replaced by the branch name in job name patterns.
    pub fn placeholder(self) -> &'static str {
        match self {
            Self::Plain => "$fb",
            Self::Isolated => "$name",
        }
    }
}

impl fmt::Display for TransformProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("plain"),
            Self::Isolated => f.write_str("isolated"),
        }
    }
}

/// A structural surprise in the source document. The edit it concerns was
/// skipped; everything else was still applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformWarning {
    NoBranchSpec,
    NoRecipients,
    AmbiguousRecipients(usize),
}

impl fmt::Display for TransformWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBranchSpec => f.write_str("Could not find any branch spec to replace!"),
            Self::NoRecipients => {
                f.write_str("Could not find any mail recipients; notification address unchanged")
            }
            Self::AmbiguousRecipients(count) => write!(
                f,
                "Found {count} mail recipient lists; notification address unchanged"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specialized {
    pub document: String,
    pub warnings: Vec<TransformWarning>,
}

/// Specialize a job configuration for `branch`, sending notifications to
/// `email`.
///
/// Jenkins saves configs as XML 1.1 so it can keep references to control
/// characters such as `&#x7;`. The parser only accepts XML 1.0, so those
/// references are read as spaces; they are still written back unchanged,
/// but a `displayName` holding one is tagged with spaces in its place.
///
/// # Errors
///
/// Returns [`crate::error::CitError::Xml`] if `document` is not well-formed.
pub fn specialize(
    document: &str,
    branch: &str,
    email: &str,
    profile: TransformProfile,
) -> Result<Specialized> {
    let parse_source = blank_control_references(document);
    let doc = Document::parse(&parse_source)?;
    let root = doc.root_element();
    let mut edits = Edits::new(document);
    let mut warnings = Vec::new();

    let branch_spec = doc
        .descendants()
        .find(|node| is_named(node, "name") && parent_is(node, BRANCH_SPEC));
    match branch_spec {
        Some(node) => edits.set_text(node, branch),
        None => warnings.push(TransformWarning::NoBranchSpec),
    }

    let recipients: Vec<_> = doc
        .descendants()
        .filter(|node| is_named(node, "recipients") && parent_is(node, MAILER))
        .collect();
    match recipients.as_slice() {
        [node] => edits.set_text(*node, email),
        [] => warnings.push(TransformWarning::NoRecipients),
        many => warnings.push(TransformWarning::AmbiguousRecipients(many.len())),
    }

    if profile == TransformProfile::Isolated {
        if let Some(display_name) = child(root, "displayName") {
            let current = display_name.text().unwrap_or_default();
            let tagged = format!("{current} ({branch})");
            edits.set_text(display_name, tagged.trim_start());
        }

        if let Some(properties) = child(root, "properties") {
            for node in children(properties, PARAMETERS_PROPERTY) {
                edits.remove(node);
            }
        }

        let trigger = format!(
            "<{SCM_TRIGGER}>\n  <spec>{POLL_SCHEDULE}</spec>\n  <ignorePostCommitHooks>false</ignorePostCommitHooks>\n</{SCM_TRIGGER}>"
        );
        match child(root, "triggers") {
            Some(triggers) => {
                for node in children(triggers, SCM_TRIGGER) {
                    edits.remove(node);
                }
                edits.append_child(triggers, &trigger);
            }
            None => {
                let indented: String = trigger.lines().map(|line| format!("\n  {line}")).collect();
                edits.append_child(root, &format!("<triggers>{indented}\n</triggers>"));
            }
        }

        if let Some(publishers) = child(root, "publishers") {
            for node in children(publishers, BUILD_TRIGGER) {
                edits.remove(node);
            }
        }
    }

    debug!(
        "Specialized job config for {branch} ({profile}): {} edit(s), {} warning(s)",
        edits.len(),
        warnings.len()
    );

    Ok(Specialized {
        document: edits.apply(),
        warnings,
    })
}

fn is_named(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn parent_is(node: &Node, name: &str) -> bool {
    node.parent_element().is_some_and(|parent| is_named(&parent, name))
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| is_named(c, name))
}

fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |c| is_named(c, name))
}

struct Splice {
    range: Range<usize>,
    text: String,
}

/// Text replacements against the original document.
struct Edits<'s> {
    source: &'s str,
    splices: Vec<Splice>,
}

impl<'s> Edits<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            splices: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.splices.len()
    }

    /// Replace the content of `element` with escaped `text`.
    fn set_text(&mut self, element: Node, text: &str) {
        let source = self.source;
        let range = element.range();
        let slice = &source[range.clone()];
        let Some(tag_end) = start_tag_end(slice) else {
            return;
        };
        let escaped = escape(text);

        if slice[..tag_end].ends_with("/>") {
            let name = raw_tag_name(slice);
            self.push(
                range.start + tag_end - 2..range.start + tag_end,
                format!(">{escaped}</{name}>"),
            );
        } else if let Some(close) = slice.rfind("</") {
            self.push(range.start + tag_end..range.start + close, escaped);
        }
    }

    /// Drop `element` along with the whitespace leading up to it.
    fn remove(&mut self, element: Node) {
        let range = element.range();
        let bytes = self.source.as_bytes();
        let mut start = range.start;
        while start > 0 && bytes[start - 1].is_ascii_whitespace() {
            start -= 1;
        }
        self.push(start..range.end, String::new());
    }

    /// Insert `fragment` as the last child of `parent`, indented one level
    /// deeper than the parent's own line.
    fn append_child(&mut self, parent: Node, fragment: &str) {
        let source = self.source;
        let range = parent.range();
        let slice = &source[range.clone()];
        let Some(tag_end) = start_tag_end(slice) else {
            return;
        };
        let indent = line_indent(source, range.start);
        let body: String = fragment
            .lines()
            .map(|line| format!("\n{indent}  {line}"))
            .collect();

        if slice[..tag_end].ends_with("/>") {
            let name = raw_tag_name(slice);
            self.push(
                range.start + tag_end - 2..range.start + tag_end,
                format!(">{body}\n{indent}</{name}>"),
            );
        } else if let Some(close) = slice.rfind("</") {
            let close = range.start + close;
            let content = &source[..close];
            let at = content.trim_end().len().max(range.start + tag_end);
            if at == close {
                self.push(at..at, format!("{body}\n{indent}"));
            } else {
                self.push(at..at, body);
            }
        }
    }

    fn push(&mut self, range: Range<usize>, text: String) {
        self.splices.push(Splice { range, text });
    }

    fn apply(mut self) -> String {
        self.splices
            .sort_by_key(|splice| (splice.range.start, splice.range.end));

        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for splice in &self.splices {
            if splice.range.start < cursor {
                debug!("Skipping overlapping edit at byte {}", splice.range.start);
                continue;
            }
            out.push_str(&self.source[cursor..splice.range.start]);
            out.push_str(&splice.text);
            cursor = splice.range.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

/// Replace character references to C0 controls, which only XML 1.1 allows,
/// with spaces of the same length so node ranges still index `document`.
fn blank_control_references(document: &str) -> Cow<'_, str> {
    let mut blanked: Option<String> = None;
    let mut search = 0;
    while let Some(offset) = document[search..].find("&#") {
        let start = search + offset;
        let Some(end) = document[start..].find(';').map(|i| start + i + 1) else {
            break;
        };
        let body = &document[start + 2..end - 1];
        let code = match body.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => body.parse::<u32>().ok(),
        };
        match code {
            Some(code) => {
                if code < 0x20 && !matches!(code, 0x9 | 0xA | 0xD) {
                    blanked
                        .get_or_insert_with(|| document.to_string())
                        .replace_range(start..end, &" ".repeat(end - start));
                }
                search = end;
            }
            None => search = start + 2,
        }
    }
    blanked.map_or(Cow::Borrowed(document), Cow::Owned)
}

/// Byte offset just past the `>` that closes the start tag.
fn start_tag_end(tag: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in tag.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => return Some(i + 1),
            _ => {}
        }
    }
    None
}

/// Qualified name as written in the source, prefix included.
fn raw_tag_name(tag: &str) -> &str {
    let name = tag.trim_start_matches('<');
    let end = name
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(name.len());
    &name[..end]
}

fn line_indent(source: &str, pos: usize) -> String {
    let line_start = source[..pos].rfind('\n').map_or(0, |i| i + 1);
    source[line_start..pos]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
