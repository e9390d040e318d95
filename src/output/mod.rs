mod progress;
mod reporter;
mod styling;
mod tables;

pub use progress::Spinner;
pub use reporter::{JobStatus, Reporter};
use styling::{muted, tool_name};
pub use tables::templates_table;

/// Prints the `cit` banner to stderr.
///
/// Displays the tool name, version, and description ahead of interactive
/// setup.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        tool_name(),
        muted(env!("CARGO_PKG_VERSION")),
        muted("Feature-branch jobs for Jenkins")
    );
}
