use std::io;
use thiserror::Error;

/// A time expression matched none of the accepted grammars.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{0:?} couldn't be parsed as a time, duration, or minute count")]
    Unrecognized(String),

    #[error("{0:?} is negative")]
    Negative(String),

    #[error("{0:?} is too large")]
    OutOfRange(String),
}

impl ParseError {
    /// The offending text exactly as the user supplied it.
    pub fn text(&self) -> &str {
        match self {
            Self::Unrecognized(t) | Self::Negative(t) | Self::OutOfRange(t) => t,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ZoneError {
    #[error("unknown timezone {0:?}")]
    Unknown(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to initialize terminal: {0}")]
    Init(#[source] io::Error),

    #[error("failed to draw: {0}")]
    Draw(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] io::Error),

    #[error("config serialize: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_names_offending_text() {
        let err = ParseError::Unrecognized("soon".to_string());
        assert_eq!(err.text(), "soon");
        assert!(err.to_string().contains("\"soon\""));
    }

    #[test]
    fn zone_error_names_zone() {
        let err = ZoneError::Unknown("Mars/Base".to_string());
        assert!(err.to_string().contains("Mars/Base"));
    }

    #[test]
    fn render_init_error_keeps_source() {
        let err = RenderError::Init(io::Error::other("no tty"));
        assert!(err.to_string().contains("no tty"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
