use std::{error::Error, fmt::Display};

/// A semantic error found during checking. The checker accumulates these
/// without aborting, so one pass reports every error in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    pub message: String,
    pub line: usize,
    pub filename: String,
}

impl Display for TypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.filename, self.line, self.message)
    }
}

impl Error for TypeError {}
