//! Console output control
//!
//! Small logger with quiet and verbose modes. All user-visible diagnostics go
//! through here so that components never print directly.

/// Logger responsible for all user-visible output
#[derive(Debug, Clone, Default)]
pub struct Logger {
    pub verbose: bool,
    pub quiet: bool,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            quiet: false,
        }
    }

    pub fn new_quiet() -> Self {
        Self {
            verbose: false,
            quiet: true,
        }
    }

    /// Information message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{}", message);
        }
    }

    /// Detailed information, shown only in verbose mode
    pub fn debug(&self, message: &str) {
        if self.verbose && !self.quiet {
            println!("DEBUG: {}", message);
        }
    }

    /// Warning message
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            eprintln!("WARNING: {}", message);
        }
    }

    /// Error message; always emitted, even in quiet mode
    pub fn error(&self, message: &str) {
        eprintln!("ERROR: {}", message);
    }
}
