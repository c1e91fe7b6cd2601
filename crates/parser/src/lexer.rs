use std::rc::Rc;

use logos::{Lexer as LogosLexer, Logos};
use smallvec::SmallVec;

use crate::env::Env;
use crate::error::{Diag, DiagKind, LexErrorKind};
use crate::intern::Names;
use crate::pos::{Cursor, Position};
use crate::token::{
    Base, CharConst, FloatConst, FloatSuffix, FloatWidth, IntConst, IntSuffix, StrConst, Tok, Token,
};

// =============================================================================
// 0. Helpers (hot path)
// =============================================================================

#[inline(always)]
const fn in_u8_inclusive(x: u8, lo: u8, hi: u8) -> bool {
    x >= lo && x <= hi
}

#[inline(always)]
pub(crate) const fn lower_ascii(b: u8) -> u8 {
    if in_u8_inclusive(b, b'A', b'Z') {
        b + 32
    } else {
        b
    }
}

#[inline(always)]
pub(crate) const fn is_dec_digit(b: u8) -> bool {
    in_u8_inclusive(b, b'0', b'9')
}

#[inline(always)]
pub(crate) const fn is_oct_digit(b: u8) -> bool {
    in_u8_inclusive(b, b'0', b'7')
}

#[inline(always)]
pub(crate) const fn is_hex_digit(b: u8) -> bool {
    let c = lower_ascii(b);
    is_dec_digit(c) || in_u8_inclusive(c, b'a', b'f')
}

#[inline(always)]
pub(crate) const fn hex_val(b: u8) -> Option<u32> {
    let c = lower_ascii(b);
    if in_u8_inclusive(c, b'0', b'9') {
        Some((c - b'0') as u32)
    } else if in_u8_inclusive(c, b'a', b'f') {
        Some((c - b'a' + 10) as u32)
    } else {
        None
    }
}

#[inline(always)]
const fn is_float_width_suffix(b: u8) -> bool {
    matches!(lower_ascii(b), b'f' | b'l')
}

#[inline(always)]
const fn is_imag_suffix(b: u8) -> bool {
    matches!(lower_ascii(b), b'i' | b'j')
}

// =============================================================================
// 1. Number scanning (maximal munch, C constant grammar)
// =============================================================================

// `fsuffix? imag?` or `imag? fsuffix?`, each slot at most once.
#[inline]
fn scan_float_suffix(src: &[u8], mut i: usize) -> usize {
    let n = src.len();
    if i < n && is_float_width_suffix(src[i]) {
        i += 1;
        if i < n && is_imag_suffix(src[i]) {
            i += 1;
        }
    } else if i < n && is_imag_suffix(src[i]) {
        i += 1;
        if i < n && is_float_width_suffix(src[i]) {
            i += 1;
        }
    }
    i
}

// Integer suffix: at most one `u|U`, one `l|L|ll|LL` run (same case,
// contiguous), one `i|j` imaginary marker, in any order. A raw `[uUlL]+` run
// longer than the longest valid suffix outgrows every integer rule and is
// reported as an invalid suffix, consuming the whole run.
#[inline]
fn scan_int_suffix_block(src: &[u8], start: usize) -> (usize, Option<LexErrorKind>) {
    let n = src.len();

    let mut j = start;
    let mut seen_u = false;
    let mut seen_imag = false;
    let mut l_case = 0u8;
    let mut l_len = 0u8;
    let mut l_end = 0usize;
    while j < n {
        match src[j] {
            b'u' | b'U' if !seen_u => seen_u = true,
            b'l' | b'L' if l_len == 0 => {
                l_case = src[j];
                l_len = 1;
                l_end = j + 1;
            }
            b'l' | b'L' if l_len == 1 && src[j] == l_case && j == l_end => {
                l_len = 2;
                l_end = j + 1;
            }
            b'i' | b'I' | b'j' | b'J' if !seen_imag => seen_imag = true,
            _ => break,
        }
        j += 1;
    }

    let mut k = start;
    while k < n && matches!(src[k], b'u' | b'U' | b'l' | b'L') {
        k += 1;
    }
    if k > j {
        (k, Some(LexErrorKind::InvalidIntSuffix))
    } else {
        (j, None)
    }
}

/// Grow the one-byte seed match (`[0-9]` or `.[0-9]`) to the maximal numeric
/// lexeme: octal/decimal/hex integer with suffix, decimal or hex float, or a
/// clang version triple. Malformed forms are consumed whole so the error span
/// covers what the user wrote.
fn lex_number(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    let src = lex.source().as_bytes();
    let start = lex.span().start;
    let n = src.len();
    let mut i = start;
    let mut err = None;

    if src[i] == b'.' {
        // `.5` — fraction-first decimal float
        i += 1;
        while i < n && is_dec_digit(src[i]) {
            i += 1;
        }
        if i < n && lower_ascii(src[i]) == b'e' {
            i = scan_dec_exponent(src, i).unwrap_or(i);
        }
        i = scan_float_suffix(src, i);
    } else if src[i] == b'0' && i + 1 < n && lower_ascii(src[i + 1]) == b'x' {
        i += 2;
        let digits = i;
        while i < n && is_hex_digit(src[i]) {
            i += 1;
        }
        let int_digits = i - digits;
        let mut is_float = false;
        if i < n && src[i] == b'.' && !(i + 1 < n && src[i + 1] == b'.') {
            is_float = true;
            i += 1;
            while i < n && is_hex_digit(src[i]) {
                i += 1;
            }
        }
        if int_digits == 0 && !is_float {
            // A bare `0x` binds the prefix to nothing: bad suffix on zero.
            err = Some(LexErrorKind::InvalidIntSuffix);
        } else if is_float {
            // the binary exponent is mandatory once a hex point is seen
            match scan_bin_exponent(src, i) {
                Some(j) => i = scan_float_suffix(src, j),
                None => err = Some(LexErrorKind::HexFloatNoExponent),
            }
        } else if let Some(j) = scan_bin_exponent(src, i) {
            // `0x1p3` — exponent alone makes it a float
            i = scan_float_suffix(src, j);
        } else {
            let (j, e) = scan_int_suffix_block(src, i);
            i = j;
            err = e;
        }
    } else {
        while i < n && is_dec_digit(src[i]) {
            i += 1;
        }
        let int_end = i;
        let mut is_float = false;
        let mut version = false;

        if i < n && src[i] == b'.' && !(i + 1 < n && src[i + 1] == b'.') {
            is_float = true;
            i += 1;
            let frac_start = i;
            while i < n && is_dec_digit(src[i]) {
                i += 1;
            }
            // clang version triple: digits '.' digits '.' digits
            if i > frac_start && i + 1 < n && src[i] == b'.' && is_dec_digit(src[i + 1]) {
                i += 1;
                while i < n && is_dec_digit(src[i]) {
                    i += 1;
                }
                version = true;
            }
        }

        if !version {
            if i < n && lower_ascii(src[i]) == b'e' {
                if let Some(j) = scan_dec_exponent(src, i) {
                    i = j;
                    is_float = true;
                }
            }
            if is_float {
                i = scan_float_suffix(src, i);
            } else {
                // A leading 0 makes it octal; digits 8/9 start the next token.
                if src[start] == b'0' && int_end > start + 1 {
                    let mut o = start + 1;
                    while o < int_end && is_oct_digit(src[o]) {
                        o += 1;
                    }
                    i = o;
                }
                let (j, e) = scan_int_suffix_block(src, i);
                i = j;
                err = e;
            }
        }
    }

    let already = lex.span().end;
    if i > already {
        lex.bump(i - already);
    }
    match err {
        None => Ok(()),
        Some(kind) => Err(kind),
    }
}

// `e` must be followed by an optional sign and at least one digit, otherwise
// it belongs to the next token.
#[inline]
fn scan_dec_exponent(src: &[u8], i: usize) -> Option<usize> {
    let n = src.len();
    debug_assert!(lower_ascii(src[i]) == b'e');
    let mut j = i + 1;
    if j < n && (src[j] == b'+' || src[j] == b'-') {
        j += 1;
    }
    if j < n && is_dec_digit(src[j]) {
        while j < n && is_dec_digit(src[j]) {
            j += 1;
        }
        Some(j)
    } else {
        None
    }
}

#[inline]
fn scan_bin_exponent(src: &[u8], i: usize) -> Option<usize> {
    let n = src.len();
    if i >= n || lower_ascii(src[i]) != b'p' {
        return None;
    }
    let mut j = i + 1;
    if j < n && (src[j] == b'+' || src[j] == b'-') {
        j += 1;
    }
    if j < n && is_dec_digit(src[j]) {
        while j < n && is_dec_digit(src[j]) {
            j += 1;
        }
        Some(j)
    } else {
        None
    }
}

// =============================================================================
// 2. Number classification and decoding
// =============================================================================

pub(crate) enum NumLit {
    Int(IntConst),
    Float(FloatConst),
    Version(u32, u32, u32),
}

fn decode_int_suffix(s: &[u8]) -> Result<IntSuffix, LexErrorKind> {
    let mut out = IntSuffix::default();
    let mut l_seen = 0u8;
    for &b in s {
        match b {
            b'u' | b'U' if !out.unsigned => out.unsigned = true,
            b'l' | b'L' if l_seen == 0 => l_seen = 1,
            b'l' | b'L' if l_seen == 1 => l_seen = 2,
            b'i' | b'I' | b'j' | b'J' if !out.imaginary => out.imaginary = true,
            _ => return Err(LexErrorKind::InvalidIntSuffix),
        }
    }
    out.long = l_seen == 1;
    out.longlong = l_seen == 2;
    Ok(out)
}

fn decode_float_suffix(s: &[u8]) -> Result<FloatSuffix, LexErrorKind> {
    let mut out = FloatSuffix::default();
    let mut seen_width = false;
    for &b in s {
        match b {
            b'f' | b'F' if !seen_width => {
                out.width = FloatWidth::Float;
                seen_width = true;
            }
            b'l' | b'L' if !seen_width => {
                out.width = FloatWidth::LongDouble;
                seen_width = true;
            }
            b'i' | b'I' | b'j' | b'J' if !out.imaginary => out.imaginary = true,
            _ => return Err(LexErrorKind::InvalidIntSuffix),
        }
    }
    Ok(out)
}

fn parse_version(text: &str) -> Option<(u32, u32, u32)> {
    let mut parts = text.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let rev = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, rev))
}

// Mantissa digits are accumulated into a u128 (28 hex digits are plenty for
// an f64); anything beyond the cap only shifts the binary exponent.
fn decode_hex_float(text: &str) -> Result<FloatConst, LexErrorKind> {
    let b = text.as_bytes();
    let n = b.len();
    let mut i = 2; // past 0x
    let mut mant = 0u128;
    let mut sig = 0u32;
    let mut scale = 0i32;

    while i < n {
        match hex_val(b[i]) {
            Some(d) => {
                if sig < 28 {
                    mant = (mant << 4) | d as u128;
                    sig += 1;
                } else {
                    scale += 4;
                }
                i += 1;
            }
            None => break,
        }
    }
    if i < n && b[i] == b'.' {
        i += 1;
        while i < n {
            match hex_val(b[i]) {
                Some(d) => {
                    if sig < 28 {
                        mant = (mant << 4) | d as u128;
                        sig += 1;
                        scale -= 4;
                    }
                    i += 1;
                }
                None => break,
            }
        }
    }
    if i >= n || !matches!(b[i], b'p' | b'P') {
        return Err(LexErrorKind::HexFloatNoExponent);
    }
    i += 1;
    let mut neg = false;
    if i < n && (b[i] == b'+' || b[i] == b'-') {
        neg = b[i] == b'-';
        i += 1;
    }
    let mut exp = 0i32;
    let mut any = false;
    while i < n && is_dec_digit(b[i]) {
        exp = exp.saturating_mul(10).saturating_add((b[i] - b'0') as i32).min(1 << 20);
        any = true;
        i += 1;
    }
    if !any {
        return Err(LexErrorKind::HexFloatNoExponent);
    }
    if neg {
        exp = -exp;
    }
    let suffix = decode_float_suffix(&b[i..])?;
    let value = (mant as f64) * 2f64.powi(exp.saturating_add(scale));
    Ok(FloatConst {
        value,
        hex: true,
        suffix,
    })
}

/// Second pass over a lexeme `lex_number` accepted: classify it as integer,
/// float, or version triple and decode the payload.
pub(crate) fn decode_number(text: &str) -> Result<NumLit, LexErrorKind> {
    let b = text.as_bytes();

    if b[0] == b'0' && b.len() > 1 && matches!(b[1], b'x' | b'X') {
        if b[2..].iter().any(|&c| matches!(c, b'.' | b'p' | b'P')) {
            return Ok(NumLit::Float(decode_hex_float(text)?));
        }
        let mut i = 2;
        let mut value: Option<u128> = Some(0);
        while i < b.len() && is_hex_digit(b[i]) {
            let d = match hex_val(b[i]) {
                Some(d) => d as u128,
                None => break,
            };
            value = value.and_then(|v| v.checked_mul(16)).and_then(|v| v.checked_add(d));
            i += 1;
        }
        let suffix = decode_int_suffix(&b[i..])?;
        return Ok(NumLit::Int(IntConst {
            value,
            base: Base::Hex,
            suffix,
        }));
    }

    if let Some((major, minor, rev)) = parse_version(text) {
        return Ok(NumLit::Version(major, minor, rev));
    }

    if b.iter().any(|&c| matches!(c, b'.' | b'e' | b'E')) {
        let mut end = b.len();
        while end > 0 && matches!(b[end - 1], b'f' | b'F' | b'l' | b'L' | b'i' | b'I' | b'j' | b'J')
        {
            end -= 1;
        }
        let suffix = decode_float_suffix(&b[end..])?;
        let value: f64 = text[..end]
            .parse()
            .map_err(|_| LexErrorKind::InvalidIntSuffix)?;
        return Ok(NumLit::Float(FloatConst {
            value,
            hex: false,
            suffix,
        }));
    }

    let mut i = 0;
    while i < b.len() && is_dec_digit(b[i]) {
        i += 1;
    }
    let digits = &b[..i];
    let suffix = decode_int_suffix(&b[i..])?;
    let base = if digits.len() > 1 && digits[0] == b'0' {
        Base::Oct
    } else {
        Base::Dec
    };
    let radix: u128 = match base {
        Base::Oct => 8,
        _ => 10,
    };
    let mut value: Option<u128> = Some(0);
    for &d in digits {
        value = value
            .and_then(|v| v.checked_mul(radix))
            .and_then(|v| v.checked_add((d - b'0') as u128));
    }
    Ok(NumLit::Int(IntConst { value, base, suffix }))
}

// =============================================================================
// 3. Character and string body decoding (C99 6.4.4.4 escapes)
// =============================================================================

/// Decode a quoted body (quotes and `L` prefix already stripped) to code
/// points. Latin-1 passthrough for unescaped characters; `\u`/`\U` are
/// recognized only to be rejected.
pub(crate) fn decode_literal_body(body: &str, in_string: bool) -> Result<Vec<u32>, LexErrorKind> {
    let b = body.as_bytes();
    let mut out = Vec::with_capacity(b.len());
    let mut i = 0;
    while i < b.len() {
        if b[i] != b'\\' {
            match body[i..].chars().next() {
                Some(ch) => {
                    out.push(ch as u32);
                    i += ch.len_utf8();
                }
                None => return Err(LexErrorKind::InvalidEscape),
            }
            continue;
        }
        i += 1;
        let e = match b.get(i) {
            Some(&e) => e,
            None => return Err(LexErrorKind::InvalidEscape),
        };
        i += 1;
        let cp = match e {
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0C,
            b'n' => 0x0A,
            b'r' => 0x0D,
            b't' => 0x09,
            b'v' => 0x0B,
            b'\\' | b'\'' | b'"' | b'?' => e as u32,
            b'0'..=b'7' => {
                let mut v = (e - b'0') as u32;
                let mut taken = 1;
                while taken < 3 && i < b.len() && is_oct_digit(b[i]) {
                    v = v * 8 + (b[i] - b'0') as u32;
                    i += 1;
                    taken += 1;
                }
                v
            }
            b'x' => {
                let mut v = 0u32;
                let mut any = false;
                while i < b.len() {
                    match hex_val(b[i]) {
                        Some(d) => {
                            v = v.wrapping_shl(4) | d;
                            any = true;
                            i += 1;
                        }
                        None => break,
                    }
                }
                if !any {
                    return Err(LexErrorKind::InvalidEscape);
                }
                v
            }
            b'u' | b'U' => {
                return Err(if in_string {
                    LexErrorKind::UcnInString
                } else {
                    LexErrorKind::UcnInChar
                });
            }
            _ => return Err(LexErrorKind::InvalidEscape),
        };
        out.push(cp);
    }
    Ok(out)
}

// =============================================================================
// 4. Raw token definition (DFA generated by Logos)
// =============================================================================

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t\n\r\x0B\x0C]+")]
#[logos(skip r"#[ \t]*pragma[^\n]*\n?")]
#[logos(skip r"#[ \t]*ident[^\n]*\n?")]
#[rustfmt::skip]
enum RawTok {
    // Preprocessor line markers: `# 42 "file.c" 1 2` or `#line 42 "file.c"`.
    // The wrapper re-bases the position and never emits a token for these.
    #[regex(r"#[ \t]*(line[ \t]+)?[0-9][^\n]*\n?")] LineMarker,

    // Keywords (every accepted spelling maps to one canonical token)
    #[token("auto")] KwAuto,
    #[token("break")] KwBreak,
    #[token("case")] KwCase,
    #[token("char")] KwChar,
    #[token("const")] #[token("__const")] #[token("__const__")] KwConst,
    #[token("continue")] KwContinue,
    #[token("default")] KwDefault,
    #[token("do")] KwDo,
    #[token("double")] KwDouble,
    #[token("else")] KwElse,
    #[token("enum")] KwEnum,
    #[token("extern")] KwExtern,
    #[token("float")] KwFloat,
    #[token("for")] KwFor,
    #[token("goto")] KwGoto,
    #[token("if")] KwIf,
    #[token("inline")] #[token("__inline")] #[token("__inline__")] KwInline,
    #[token("int")] KwInt,
    #[token("long")] KwLong,
    #[token("register")] KwRegister,
    #[token("restrict")] #[token("__restrict")] #[token("__restrict__")] KwRestrict,
    #[token("return")] KwReturn,
    #[token("short")] KwShort,
    #[token("signed")] #[token("__signed")] #[token("__signed__")] KwSigned,
    #[token("sizeof")] KwSizeof,
    #[token("static")] KwStatic,
    #[token("struct")] KwStruct,
    #[token("switch")] KwSwitch,
    #[token("typedef")] KwTypedef,
    #[token("typeof")] #[token("__typeof")] #[token("__typeof__")] KwTypeof,
    #[token("union")] KwUnion,
    #[token("unsigned")] KwUnsigned,
    #[token("void")] KwVoid,
    #[token("volatile")] #[token("__volatile")] #[token("__volatile__")] KwVolatile,
    #[token("while")] KwWhile,
    #[token("_Alignas")] KwAlignas,
    #[token("_Alignof")] #[token("alignof")] #[token("__alignof")] #[token("__alignof__")] KwAlignof,
    #[token("_Atomic")] KwAtomic,
    #[token("_Bool")] KwBool,
    #[token("_Complex")] #[token("__complex__")] KwComplex,
    #[token("_Generic")] KwGeneric,
    #[token("_Noreturn")] KwNoreturn,
    #[token("_Static_assert")] KwStaticAssert,
    #[token("_Thread_local")] #[token("__thread")] KwThreadLocal,
    #[token("_Nullable")] #[token("__nullable")] KwNullable,
    #[token("_Nonnull")] #[token("__nonnull")] KwNonnull,
    #[token("asm")] #[token("__asm")] #[token("__asm__")] KwAsm,
    #[token("__int128")] KwInt128,
    #[token("__label__")] KwLabel,

    // GNU extension markers
    #[token("__attribute")] #[token("__attribute__")] Attribute,
    #[token("__extension__")] Extension,
    #[token("__real")] #[token("__real__")] Real,
    #[token("__imag")] #[token("__imag__")] Imag,
    #[token("__builtin_va_arg")] BuiltinVaArg,
    #[token("__builtin_offsetof")] BuiltinOffsetof,
    #[token("__builtin_types_compatible_p")] BuiltinTypesCompatibleP,

    // Identifiers ($ is a GNU extension; no keyword contains it)
    #[regex(r"[A-Za-z_$][A-Za-z_$0-9]*")] Ident,

    // Numbers: seeded by a digit or ".<digit>", grown to the maximal numeric
    // lexeme in the callback
    #[regex(r"[0-9]|\.[0-9]", lex_number)] Number,

    // Character and string literals
    #[regex(r"'([^'\\\n]|\\.)+'")] CharLit,
    #[regex(r"L'([^'\\\n]|\\.)+'")] WideCharLit,
    #[regex(r#""([^"\\\n]|\\.)*""#)] StrLit,
    #[regex(r#"L"([^"\\\n]|\\.)*""#)] WideStrLit,

    // Operators (multi-char first)
    #[token("...")] Ellipsis,
    #[token("<<=")] ShlAssign,
    #[token(">>=")] ShrAssign,
    #[token("->")] Arrow,
    #[token("++")] Inc,
    #[token("--")] Dec,
    #[token("<<")] Shl,
    #[token(">>")] Shr,
    #[token("<=")] Le,
    #[token(">=")] Ge,
    #[token("==")] EqEq,
    #[token("!=")] NotEq,
    #[token("&&")] AndAnd,
    #[token("||")] OrOr,
    #[token("+=")] AddAssign,
    #[token("-=")] SubAssign,
    #[token("*=")] MulAssign,
    #[token("/=")] DivAssign,
    #[token("%=")] ModAssign,
    #[token("&=")] AndAssign,
    #[token("^=")] XorAssign,
    #[token("|=")] OrAssign,
    #[token("[")] LBrack,
    #[token("]")] RBrack,
    #[token("(")] LParen,
    #[token(")")] RParen,
    #[token("{")] LBrace,
    #[token("}")] RBrace,
    #[token(".")] Dot,
    #[token("&")] Amp,
    #[token("*")] Star,
    #[token("+")] Plus,
    #[token("-")] Minus,
    #[token("~")] Tilde,
    #[token("!")] Bang,
    #[token("/")] Slash,
    #[token("%")] Percent,
    #[token("<")] Lt,
    #[token(">")] Gt,
    #[token("^")] Caret,
    #[token("|")] Pipe,
    #[token("?")] Question,
    #[token(":")] Colon,
    #[token(";")] Semi,
    #[token("=")] Assign,
    #[token(",")] Comma,

    // Catch-all (low priority so it never shadows a real rule)
    #[regex(r".", priority = 0)] Unmatched,
}

// =============================================================================
// 5. Raw token -> public token (fixed-lexeme tokens only)
// =============================================================================

impl RawTok {
    fn simple<'src>(self) -> Tok<'src> {
        macro_rules! map {
            ($($raw:ident => $tok:ident),* $(,)?) => {
                match self {
                    $(Self::$raw => Tok::$tok,)*
                    // payload-carrying variants are handled by the wrapper
                    _ => Tok::Error,
                }
            };
        }

        map! {
            KwAuto => KwAuto, KwBreak => KwBreak, KwCase => KwCase, KwChar => KwChar,
            KwConst => KwConst, KwContinue => KwContinue, KwDefault => KwDefault, KwDo => KwDo,
            KwDouble => KwDouble, KwElse => KwElse, KwEnum => KwEnum, KwExtern => KwExtern,
            KwFloat => KwFloat, KwFor => KwFor, KwGoto => KwGoto, KwIf => KwIf,
            KwInline => KwInline, KwInt => KwInt, KwLong => KwLong, KwRegister => KwRegister,
            KwRestrict => KwRestrict, KwReturn => KwReturn, KwShort => KwShort,
            KwSigned => KwSigned, KwSizeof => KwSizeof, KwStatic => KwStatic,
            KwStruct => KwStruct, KwSwitch => KwSwitch, KwTypedef => KwTypedef,
            KwTypeof => KwTypeof, KwUnion => KwUnion, KwUnsigned => KwUnsigned,
            KwVoid => KwVoid, KwVolatile => KwVolatile, KwWhile => KwWhile,
            KwAlignas => KwAlignas, KwAlignof => KwAlignof, KwAtomic => KwAtomic,
            KwBool => KwBool, KwComplex => KwComplex, KwGeneric => KwGeneric,
            KwNoreturn => KwNoreturn, KwStaticAssert => KwStaticAssert,
            KwThreadLocal => KwThreadLocal, KwNullable => KwNullable, KwNonnull => KwNonnull,
            KwAsm => KwAsm, KwInt128 => KwInt128, KwLabel => KwLabel,

            Attribute => Attribute, Extension => Extension, Real => Real, Imag => Imag,
            BuiltinVaArg => BuiltinVaArg, BuiltinOffsetof => BuiltinOffsetof,
            BuiltinTypesCompatibleP => BuiltinTypesCompatibleP,

            Ellipsis => Ellipsis, ShlAssign => ShlAssign, ShrAssign => ShrAssign,
            Arrow => Arrow, Inc => Inc, Dec => Dec, Shl => Shl, Shr => Shr, Le => Le, Ge => Ge,
            EqEq => EqEq, NotEq => NotEq, AndAnd => AndAnd, OrOr => OrOr,
            AddAssign => AddAssign, SubAssign => SubAssign, MulAssign => MulAssign,
            DivAssign => DivAssign, ModAssign => ModAssign, AndAssign => AndAssign,
            XorAssign => XorAssign, OrAssign => OrAssign,
            LBrack => LBrack, RBrack => RBrack, LParen => LParen, RParen => RParen,
            LBrace => LBrace, RBrace => RBrace, Dot => Dot, Amp => Amp, Star => Star,
            Plus => Plus, Minus => Minus, Tilde => Tilde, Bang => Bang, Slash => Slash,
            Percent => Percent, Lt => Lt, Gt => Gt, Caret => Caret, Pipe => Pipe,
            Question => Question, Colon => Colon, Semi => Semi, Assign => Assign, Comma => Comma,
        }
    }
}

// =============================================================================
// 6. Line-directive processing
// =============================================================================

// `#` hspace* ["line" hspace+] digits [hspace* "filename"] junk — returns the
// new row and the optional filename. Trailing integers (gcc linemarker flags)
// are tolerated and ignored.
fn parse_line_marker(slice: &str) -> Option<(u32, Option<&str>)> {
    let b = slice.as_bytes();
    let n = b.len();
    let mut i = 1;
    while i < n && matches!(b[i], b' ' | b'\t') {
        i += 1;
    }
    if slice[i..].starts_with("line") {
        i += 4;
        while i < n && matches!(b[i], b' ' | b'\t') {
            i += 1;
        }
    }
    let digits = i;
    let mut row = 0u32;
    while i < n && is_dec_digit(b[i]) {
        row = row.saturating_mul(10).saturating_add((b[i] - b'0') as u32);
        i += 1;
    }
    if i == digits {
        return None;
    }
    while i < n && matches!(b[i], b' ' | b'\t') {
        i += 1;
    }
    let file = if i < n && b[i] == b'"' {
        let rest = &slice[i + 1..];
        rest.find('"').map(|end| &rest[..end])
    } else {
        None
    };
    Some((row, file))
}

// =============================================================================
// 7. Lexer: positions, classification, diagnostics, recent-token cache
// =============================================================================

/// The lexer proper. Drives the scanner, keeps the [`Position`] honest across
/// skipped regions and `#line` markers, interns identifiers, and classifies
/// them against the shared typedef environment.
pub struct Lexer<'src> {
    logos: LogosLexer<'src, RawTok>,
    cursor: Cursor<'src>,
    names: Names,
    env: Rc<Env>,
    diags: Vec<Diag>,
    last: Option<Token<'src>>,
    src_len: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(input: &'src str, file: &str) -> Self {
        Self::with_env(input, file, Rc::new(Env::with_gnu()))
    }

    /// Share a typedef environment with the parser. The environment is read
    /// at every identifier classification, so updates between tokens take
    /// effect immediately.
    pub fn with_env(input: &'src str, file: &str, env: Rc<Env>) -> Self {
        Lexer {
            logos: RawTok::lexer(input),
            cursor: Cursor::new(input, file),
            names: Names::default(),
            env,
            diags: Vec::with_capacity(4),
            last: None,
            src_len: input.len(),
        }
    }

    pub fn env(&self) -> &Rc<Env> {
        &self.env
    }

    pub fn names(&self) -> &Names {
        &self.names
    }

    pub fn diags(&self) -> &[Diag] {
        &self.diags
    }

    pub fn take_diags(&mut self) -> Vec<Diag> {
        std::mem::take(&mut self.diags)
    }

    /// Most recently emitted token, for the parser's error reporter.
    pub fn last_token(&self) -> Option<&Token<'src>> {
        self.last.as_ref()
    }

    /// Current position of the cursor (end of input once the stream is done).
    pub fn position(&self) -> &Position {
        self.cursor.pos()
    }

    /// Format a syntax-error diagnostic around the last emitted token.
    pub fn parse_error(&self) -> Diag {
        let (pos, symbol) = match &self.last {
            Some(t) => (t.pos.clone(), t.tok.to_string()),
            None => (self.cursor.pos().clone(), Tok::Eof.to_string()),
        };
        Diag {
            kind: DiagKind::Parse,
            pos,
            message: format!("The symbol {symbol} does not fit here."),
        }
    }

    /// Next token, with the EOF sentinel once the input is exhausted.
    pub fn next_token(&mut self) -> Token<'src> {
        match self.next() {
            Some(token) => token,
            None => Token {
                pos: self.cursor.pos().clone(),
                len: 0,
                tok: Tok::Eof,
            },
        }
    }

    fn report(&mut self, kind: LexErrorKind, pos: &Position, lexeme: &str) {
        let message = kind.message(lexeme);
        log::debug!("lexical error at {pos}: {message}");
        self.diags.push(Diag {
            kind: DiagKind::Lex,
            pos: pos.clone(),
            message,
        });
    }

    fn classify_ident(&mut self, slice: &'src str, pos: &Position) -> Tok<'src> {
        let name = self.names.intern(slice, pos);
        if self.env.is_typename(slice) {
            Tok::TypeIdent(name, slice)
        } else {
            Tok::Ident(name, slice)
        }
    }

    fn next_impl(&mut self) -> Option<Token<'src>> {
        loop {
            let Some(res) = self.logos.next() else {
                self.cursor.advance_to(self.src_len);
                return None;
            };
            let span = self.logos.span();
            self.cursor.advance_to(span.start);
            let pos = self.cursor.pos().clone();
            let len = span.end - span.start;

            let raw = match res {
                Ok(raw) => raw,
                Err(kind) => {
                    let slice = self.logos.slice();
                    self.cursor.advance_to(span.end);
                    self.report(kind, &pos, slice);
                    return Some(Token {
                        pos,
                        len,
                        tok: Tok::Error,
                    });
                }
            };

            if raw == RawTok::LineMarker {
                let slice = self.logos.slice();
                match parse_line_marker(slice) {
                    Some((row, file)) => {
                        let file = match file {
                            Some(name) if self.cursor.pos().file.as_ref() != name => {
                                Rc::from(name)
                            }
                            _ => self.cursor.pos().file.clone(),
                        };
                        log::debug!("line marker re-bases position to {file}:{row}");
                        self.cursor.rebase(file, row, span.end);
                    }
                    None => self.cursor.advance_to(span.end),
                }
                continue;
            }

            let slice = self.logos.slice();
            self.cursor.advance_to(span.end);

            let tok = match raw {
                RawTok::Ident => self.classify_ident(slice, &pos),
                RawTok::Number => match decode_number(slice) {
                    Ok(NumLit::Int(c)) => Tok::IntLit(slice, c),
                    Ok(NumLit::Float(c)) => Tok::FloatLit(slice, c),
                    Ok(NumLit::Version(major, minor, rev)) => Tok::VersionLit(major, minor, rev),
                    Err(kind) => {
                        self.report(kind, &pos, slice);
                        Tok::Error
                    }
                },
                RawTok::CharLit | RawTok::WideCharLit => {
                    let wide = raw == RawTok::WideCharLit;
                    let body = &slice[wide as usize + 1..slice.len() - 1];
                    match decode_literal_body(body, false) {
                        Ok(units) => Tok::CharLit(CharConst {
                            units: SmallVec::from_vec(units),
                            wide,
                        }),
                        Err(kind) => {
                            self.report(kind, &pos, slice);
                            Tok::Error
                        }
                    }
                }
                RawTok::StrLit | RawTok::WideStrLit => {
                    let wide = raw == RawTok::WideStrLit;
                    let body = &slice[wide as usize + 1..slice.len() - 1];
                    match decode_literal_body(body, true) {
                        Ok(units) => Tok::StrLit(StrConst { units, wide }),
                        Err(kind) => {
                            self.report(kind, &pos, slice);
                            Tok::Error
                        }
                    }
                }
                RawTok::Unmatched => {
                    self.report(LexErrorKind::Unmatched, &pos, slice);
                    Tok::Error
                }
                simple => simple.simple(),
            };

            return Some(Token { pos, len, tok });
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        // This is the top-level entry: internal skip/`#line` re-entries above
        // never touch the cache, so a token is recorded exactly once.
        let token = self.next_impl()?;
        self.last = Some(token.clone());
        Some(token)
    }
}
