//! Parse diagnostics.
use std::error;
use std::fmt;

/// An error produced while parsing or validating a script.
///
/// Most errors are tagged with the source line that produced them and render
/// as `"<line>: <message>"`. Validation errors raised after the whole script
/// has been consumed carry no line and render as the bare message.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    line: Option<u32>,
    message: String,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Error {
        Error {
            line: None,
            message: message.into(),
        }
    }

    pub fn at(line: u32, message: impl Into<String>) -> Error {
        Error {
            line: Some(line),
            message: message.into(),
        }
    }

    /// Tags the error with `line` if it does not already carry one.
    pub fn with_line(mut self, line: u32) -> Error {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}: {}", line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_line() {
        let e = Error::at(7, "unknown shader in ATTACH command");
        assert_eq!("7: unknown shader in ATTACH command", e.to_string());
    }

    #[test]
    fn display_without_line() {
        let e = Error::new("compute pipeline requires a compute shader");
        assert_eq!("compute pipeline requires a compute shader", e.to_string());
    }

    #[test]
    fn with_line_does_not_overwrite() {
        let e = Error::at(3, "oops").with_line(9);
        assert_eq!(Some(3), e.line());
        let e = Error::new("oops").with_line(9);
        assert_eq!(Some(9), e.line());
    }
}
