use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{failed, succeeded, waiting};

/// Spinner shown on stderr while waiting on a single remote call.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
            pb.set_style(style);
        }
        pb.set_message(waiting(message).to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { pb }
    }

    pub fn succeed(self, message: &str) {
        self.pb.finish_with_message(succeeded(message).to_string());
    }

    pub fn fail(self, message: &str) {
        self.pb.finish_with_message(failed(message).to_string());
    }
}
