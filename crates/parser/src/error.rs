use std::fmt;

use thiserror::Error;

use crate::pos::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagKind {
    Lex,
    Parse,
}

impl DiagKind {
    const fn preamble(self) -> &'static str {
        match self {
            DiagKind::Lex => "Lexical Error !",
            DiagKind::Parse => "Syntax Error !",
        }
    }
}

/// A positioned diagnostic, rendered as a two-line message: the summary line
/// names the error class, the detail line carries the specific complaint.
#[derive(Debug, Clone, PartialEq)]
pub struct Diag {
    pub kind: DiagKind,
    pub pos: Position,
    pub message: String,
}

impl fmt::Display for Diag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}\n  {}", self.pos, self.kind.preamble(), self.message)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexErrorKind {
    /// No rule accepts the byte at the cursor. The offending character is
    /// spliced into the message by [`LexErrorKind::message`].
    #[default]
    #[error("The character does not fit here.")]
    Unmatched,
    #[error("Invalid integer constant suffix")]
    InvalidIntSuffix,
    #[error("Hexadecimal floating constant requires an exponent")]
    HexFloatNoExponent,
    #[error("Universal character names are unsupported")]
    UcnInChar,
    #[error("Universal character names in string literals are unsupported")]
    UcnInString,
    #[error("Invalid escape sequence")]
    InvalidEscape,
}

impl LexErrorKind {
    /// Detail-line text for a diagnostic about `lexeme`.
    pub fn message(&self, lexeme: &str) -> String {
        match self {
            LexErrorKind::Unmatched => {
                let c = lexeme.chars().next().unwrap_or('\u{FFFD}');
                format!("The character {c} does not fit here.")
            }
            other => other.to_string(),
        }
    }
}
