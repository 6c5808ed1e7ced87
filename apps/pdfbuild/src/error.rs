//! CLI error handling

use std::fmt;

use pdfbuild_errors::UserFacingError;

/// Startup and runtime failures of the server binary
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid
    Config(pdfbuild_errors::Error),
    /// Listener could not be bound or failed while serving
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => {
                write!(f, "Configuration error: {}", e.user_message())?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                Ok(())
            }
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Io(e) => Some(e),
        }
    }
}

impl From<pdfbuild_errors::Error> for CliError {
    fn from(e: pdfbuild_errors::Error) -> Self {
        CliError::Config(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
