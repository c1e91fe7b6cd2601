use std::fmt;

use smallvec::SmallVec;

use crate::intern::Name;
use crate::pos::Position;

// =============================================================================
// Literal payloads
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    Dec,
    Oct,
    Hex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntSuffix {
    pub unsigned: bool,
    pub long: bool,
    pub longlong: bool,
    pub imaginary: bool,
}

/// Decoded integer constant. `value` is `None` when the magnitude exceeds
/// `u128`; the retained lexeme text preserves the exact digits so the type
/// checker can still diagnose the overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntConst {
    pub value: Option<u128>,
    pub base: Base,
    pub suffix: IntSuffix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatWidth {
    #[default]
    Double,
    Float,
    LongDouble,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FloatSuffix {
    pub width: FloatWidth,
    pub imaginary: bool,
}

/// Decoded floating constant. The raw text travels with the token; `value`
/// is the double-precision reading of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatConst {
    pub value: f64,
    pub hex: bool,
    pub suffix: FloatSuffix,
}

/// Character constant: one code point per element, several for multi-char
/// constants like `'ab'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharConst {
    pub units: SmallVec<[u32; 4]>,
    pub wide: bool,
}

/// String literal with escapes decoded to code units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrConst {
    pub units: Vec<u32>,
    pub wide: bool,
}

// =============================================================================
// Token
// =============================================================================

/// A token with its source position and the byte length of its lexeme.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'src> {
    pub pos: Position,
    pub len: usize,
    pub tok: Tok<'src>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tok<'src> {
    Ident(Name, &'src str),
    /// Same lexeme shape as `Ident`; the typedef environment decided
    /// otherwise at emission time.
    TypeIdent(Name, &'src str),
    IntLit(&'src str, IntConst),
    FloatLit(&'src str, FloatConst),
    CharLit(CharConst),
    StrLit(StrConst),
    /// `major.minor.rev` triple from clang's preprocessor output.
    VersionLit(u32, u32, u32),

    // Keywords (canonical token per spelling family)
    KwAuto,
    KwBreak,
    KwCase,
    KwChar,
    KwConst,
    KwContinue,
    KwDefault,
    KwDo,
    KwDouble,
    KwElse,
    KwEnum,
    KwExtern,
    KwFloat,
    KwFor,
    KwGoto,
    KwIf,
    KwInline,
    KwInt,
    KwLong,
    KwRegister,
    KwRestrict,
    KwReturn,
    KwShort,
    KwSigned,
    KwSizeof,
    KwStatic,
    KwStruct,
    KwSwitch,
    KwTypedef,
    KwTypeof,
    KwUnion,
    KwUnsigned,
    KwVoid,
    KwVolatile,
    KwWhile,
    KwAlignas,
    KwAlignof,
    KwAtomic,
    KwBool,
    KwComplex,
    KwGeneric,
    KwNoreturn,
    KwStaticAssert,
    KwThreadLocal,
    KwNullable,
    KwNonnull,
    KwAsm,
    KwInt128,
    KwLabel,

    // GNU extension markers
    Attribute,
    Extension,
    Real,
    Imag,
    BuiltinVaArg,
    BuiltinOffsetof,
    BuiltinTypesCompatibleP,

    // Punctuation / operators
    Ellipsis,
    ShlAssign,
    ShrAssign,
    Arrow,
    Inc,
    Dec,
    Shl,
    Shr,
    Le,
    Ge,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    XorAssign,
    OrAssign,
    LBrack,
    RBrack,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Dot,
    Amp,
    Star,
    Plus,
    Minus,
    Tilde,
    Bang,
    Slash,
    Percent,
    Lt,
    Gt,
    Caret,
    Pipe,
    Question,
    Colon,
    Semi,
    Assign,
    Comma,

    Eof,
    Error,
}

impl<'src> Tok<'src> {
    /// Canonical spelling for tokens with a fixed lexeme (keywords, markers,
    /// punctuation). `None` for payload-carrying tokens.
    pub fn lexeme(&self) -> Option<&'static str> {
        use Tok::*;
        let s = match self {
            KwAuto => "auto",
            KwBreak => "break",
            KwCase => "case",
            KwChar => "char",
            KwConst => "const",
            KwContinue => "continue",
            KwDefault => "default",
            KwDo => "do",
            KwDouble => "double",
            KwElse => "else",
            KwEnum => "enum",
            KwExtern => "extern",
            KwFloat => "float",
            KwFor => "for",
            KwGoto => "goto",
            KwIf => "if",
            KwInline => "inline",
            KwInt => "int",
            KwLong => "long",
            KwRegister => "register",
            KwRestrict => "restrict",
            KwReturn => "return",
            KwShort => "short",
            KwSigned => "signed",
            KwSizeof => "sizeof",
            KwStatic => "static",
            KwStruct => "struct",
            KwSwitch => "switch",
            KwTypedef => "typedef",
            KwTypeof => "typeof",
            KwUnion => "union",
            KwUnsigned => "unsigned",
            KwVoid => "void",
            KwVolatile => "volatile",
            KwWhile => "while",
            KwAlignas => "_Alignas",
            KwAlignof => "alignof",
            KwAtomic => "_Atomic",
            KwBool => "_Bool",
            KwComplex => "_Complex",
            KwGeneric => "_Generic",
            KwNoreturn => "_Noreturn",
            KwStaticAssert => "_Static_assert",
            KwThreadLocal => "_Thread_local",
            KwNullable => "_Nullable",
            KwNonnull => "_Nonnull",
            KwAsm => "asm",
            KwInt128 => "__int128",
            KwLabel => "__label__",
            Attribute => "__attribute__",
            Extension => "__extension__",
            Real => "__real__",
            Imag => "__imag__",
            BuiltinVaArg => "__builtin_va_arg",
            BuiltinOffsetof => "__builtin_offsetof",
            BuiltinTypesCompatibleP => "__builtin_types_compatible_p",
            Ellipsis => "...",
            ShlAssign => "<<=",
            ShrAssign => ">>=",
            Arrow => "->",
            Inc => "++",
            Dec => "--",
            Shl => "<<",
            Shr => ">>",
            Le => "<=",
            Ge => ">=",
            EqEq => "==",
            NotEq => "!=",
            AndAnd => "&&",
            OrOr => "||",
            AddAssign => "+=",
            SubAssign => "-=",
            MulAssign => "*=",
            DivAssign => "/=",
            ModAssign => "%=",
            AndAssign => "&=",
            XorAssign => "^=",
            OrAssign => "|=",
            LBrack => "[",
            RBrack => "]",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            Dot => ".",
            Amp => "&",
            Star => "*",
            Plus => "+",
            Minus => "-",
            Tilde => "~",
            Bang => "!",
            Slash => "/",
            Percent => "%",
            Lt => "<",
            Gt => ">",
            Caret => "^",
            Pipe => "|",
            Question => "?",
            Colon => ":",
            Semi => ";",
            Assign => "=",
            Comma => ",",
            _ => return None,
        };
        Some(s)
    }
}

// One code unit of a char/string literal, re-escaped so the result lexes back
// to the same unit sequence. `quote` is the enclosing delimiter.
fn write_unit(f: &mut fmt::Formatter<'_>, u: u32, quote: u8) -> fmt::Result {
    match u {
        0x07 => f.write_str("\\a"),
        0x08 => f.write_str("\\b"),
        0x0C => f.write_str("\\f"),
        0x0A => f.write_str("\\n"),
        0x0D => f.write_str("\\r"),
        0x09 => f.write_str("\\t"),
        0x0B => f.write_str("\\v"),
        0x5C => f.write_str("\\\\"),
        u if u == quote as u32 => write!(f, "\\{}", quote as char),
        0x20..=0x7E => write!(f, "{}", u as u8 as char),
        // Fixed-width octal keeps a following digit from extending the escape.
        u if u <= 0o777 => write!(f, "\\{u:03o}"),
        u => write!(f, "\\x{u:x}"),
    }
}

impl fmt::Display for Tok<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::Ident(_, text) | Tok::TypeIdent(_, text) => f.write_str(text),
            Tok::IntLit(text, _) | Tok::FloatLit(text, _) => f.write_str(text),
            Tok::CharLit(c) => {
                if c.wide {
                    f.write_str("L")?;
                }
                f.write_str("'")?;
                for &u in &c.units {
                    write_unit(f, u, b'\'')?;
                }
                f.write_str("'")
            }
            Tok::StrLit(s) => {
                if s.wide {
                    f.write_str("L")?;
                }
                f.write_str("\"")?;
                for &u in &s.units {
                    write_unit(f, u, b'"')?;
                }
                f.write_str("\"")
            }
            Tok::VersionLit(major, minor, rev) => write!(f, "{major}.{minor}.{rev}"),
            Tok::Eof => f.write_str("<eof>"),
            Tok::Error => f.write_str("<error>"),
            fixed => match fixed.lexeme() {
                Some(s) => f.write_str(s),
                None => write!(f, "{fixed:?}"),
            },
        }
    }
}
