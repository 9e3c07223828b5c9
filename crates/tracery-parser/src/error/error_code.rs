//! Error codes, grouped by the stage that reports them:
//!
//! - `E0xx`: splitting the source into `@start`/`@end` blocks
//! - `E1xx`: the preprocessor
//! - `E2xx`: command matching and execution
//! - `E3xx`: finished diagrams

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A block is opened with `@start...` but never closed.
    E001,
    /// `@start` names an unsupported diagram kind.
    E002,
    /// An `@end` line does not match the open block.
    E003,

    /// A preprocessor expression could not be parsed.
    E100,
    /// Unknown `!` directive.
    E101,
    /// `!else`, `!endif`, `!endwhile` or similar without its opening line,
    /// or an opening line that is never closed.
    E102,
    /// Call to an undefined function, procedure or variable.
    E103,
    /// A `!while` loop exceeded the iteration limit.
    E104,
    /// An `!assert` failed.
    E105,
    /// Wrong number of arguments in a call.
    E106,
    /// A function ended without `!return`, or `!return` outside a function.
    E107,

    /// No command of any diagram kind accepts the line.
    E200,
    /// A command matched but could not be applied.
    E201,

    /// The diagram is inconsistent once all lines are read.
    E300,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            ErrorCode::E104 => "E104",
            ErrorCode::E105 => "E105",
            ErrorCode::E106 => "E106",
            ErrorCode::E107 => "E107",
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E300 => "E300",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "unterminated block",
            ErrorCode::E002 => "unsupported diagram kind",
            ErrorCode::E003 => "mismatched block end",
            ErrorCode::E100 => "invalid preprocessor expression",
            ErrorCode::E101 => "unknown directive",
            ErrorCode::E102 => "unbalanced directive",
            ErrorCode::E103 => "undefined name",
            ErrorCode::E104 => "loop limit exceeded",
            ErrorCode::E105 => "assertion failed",
            ErrorCode::E106 => "wrong number of arguments",
            ErrorCode::E107 => "misplaced return",
            ErrorCode::E200 => "syntax error",
            ErrorCode::E201 => "command failed",
            ErrorCode::E300 => "invalid diagram",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::E001.to_string(), "E001");
        assert_eq!(ErrorCode::E104.to_string(), "E104");
    }

    #[test]
    fn test_description() {
        assert_eq!(ErrorCode::E200.description(), "syntax error");
        assert_eq!(ErrorCode::E105.description(), "assertion failed");
    }
}
