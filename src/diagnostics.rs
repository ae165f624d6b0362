//! Verbose diagnostics whose messages are only built when enabled.

use tracing::info;

/// Gate for the plugin's `verbose` output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Diagnostics {
    verbose: bool,
}

impl Diagnostics {
    /// Diagnostics enabled when `verbose` is set.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Emit the message parts produced by `message`, joined by spaces.
    ///
    /// `message` is never called when diagnostics are disabled.
    pub fn emit<F>(&self, message: F)
    where
        F: FnOnce() -> Vec<String>,
    {
        if self.verbose {
            info!("{}", message().join(" "));
        }
    }
}
