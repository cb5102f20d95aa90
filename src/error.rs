//! Hard failures: anything that stops a level from being checked at all.
//!
//! Problems found *in* a level are findings (see [`crate::report`]), not
//! errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LevelError {
    /// The level text is not even lenient JSON
    #[error("syntax error at line {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("level has no events list")]
    MissingEvents,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for level loading
pub type LevelResult<T> = Result<T, LevelError>;

impl LevelError {
    /// Syntax error positioned where `remaining` starts inside `input`.
    ///
    /// Line and column are 1-based; the column counts characters.
    pub fn syntax_at(input: &str, remaining: &str, message: impl Into<String>) -> Self {
        let consumed = input.len().saturating_sub(remaining.len());
        let parsed = &input[..consumed];
        let line = parsed.matches('\n').count() + 1;
        let line_start = parsed.rfind('\n').map_or(0, |i| i + 1);
        let column = parsed[line_start..].chars().count() + 1;
        LevelError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_position() {
        let input = "{\n  \"a\": 1,\n  oops\n}";
        let remaining = &input[input.find("oops").unwrap()..];
        match LevelError::syntax_at(input, remaining, "unexpected word") {
            LevelError::Syntax { line, column, message } => {
                assert_eq!(line, 3);
                assert_eq!(column, 3);
                assert_eq!(message, "unexpected word");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_display() {
        let err = LevelError::Syntax {
            line: 1,
            column: 4,
            message: "expected ':'".to_string(),
        };
        assert_eq!(err.to_string(), "syntax error at line 1:4: expected ':'");
        assert_eq!(LevelError::MissingEvents.to_string(), "level has no events list");
    }
}
