// crates/parser/tests/lexer_typenames.rs
use std::rc::Rc;

use c11_parser::env::{Env, Symbol};
use c11_parser::lexer::Lexer;
use c11_parser::token::Tok;

// Scenario (a): no typedefs registered, so `x` is an ordinary identifier.
#[test]
fn plain_declaration() {
    let mut lx = Lexer::new("int x;", "a.c");
    let toks: Vec<_> = lx.by_ref().collect();

    assert_eq!(toks.len(), 3);
    assert!(matches!(toks[0].tok, Tok::KwInt));
    assert_eq!((toks[0].pos.row, toks[0].pos.col, toks[0].len), (1, 1, 3));
    assert!(matches!(toks[1].tok, Tok::Ident(_, "x")));
    assert_eq!((toks[1].pos.row, toks[1].pos.col, toks[1].len), (1, 5, 1));
    assert!(matches!(toks[2].tok, Tok::Semi));
    assert_eq!((toks[2].pos.row, toks[2].pos.col), (1, 6));

    let eof = lx.next_token();
    assert!(matches!(eof.tok, Tok::Eof));
    assert_eq!(eof.pos.offset, 6);
}

// Scenario (b): the parser registers `T` after the first semicolon; the
// second occurrence classifies as a type identifier, `y` stays ordinary.
#[test]
fn typedef_feedback_changes_classification() {
    let env = Rc::new(Env::with_core());
    let mut lx = Lexer::with_env("typedef int T;\nT y;", "b.c", Rc::clone(&env));

    let mut seen = Vec::new();
    loop {
        let t = lx.next_token();
        if matches!(t.tok, Tok::Eof) {
            break;
        }
        if matches!(t.tok, Tok::Semi) {
            // what a parser would do on reducing `typedef int T;`
            env.add_typename("T");
        }
        seen.push(t);
    }

    assert!(matches!(seen[0].tok, Tok::KwTypedef));
    assert!(matches!(seen[1].tok, Tok::KwInt));
    assert!(
        matches!(seen[2].tok, Tok::Ident(_, "T")),
        "first T precedes the registration: {:?}",
        seen[2].tok
    );
    assert!(
        matches!(seen[4].tok, Tok::TypeIdent(_, "T")),
        "second T must be a type identifier: {:?}",
        seen[4].tok
    );
    assert!(matches!(seen[5].tok, Tok::Ident(_, "y")));
}

// Scenario (e): the attribute marker is one token; everything inside the
// parens is lexed normally (balanced-paren skipping is the parser's job).
#[test]
fn attribute_contents_are_ordinary_tokens() {
    let mut lx = Lexer::new("__attribute__((packed)) struct S { int x; };", "e.c");
    let kinds: Vec<String> = lx.by_ref().map(|t| t.tok.to_string()).collect();
    assert_eq!(
        kinds,
        vec![
            "__attribute__",
            "(",
            "(",
            "packed",
            ")",
            ")",
            "struct",
            "S",
            "{",
            "int",
            "x",
            ";",
            "}",
            ";"
        ]
    );
    assert!(lx.take_diags().is_empty());
}

// Property 4: repeated occurrences of a lexeme share one Name id, and ids
// are handed out in first-sight order.
#[test]
fn interning_is_stable_and_monotonic() {
    let mut lx = Lexer::new("foo bar foo baz bar", "i.c");
    let names: Vec<_> = lx
        .by_ref()
        .map(|t| match t.tok {
            Tok::Ident(name, text) => (name, text.to_owned()),
            other => panic!("expected identifiers only, got {other:?}"),
        })
        .collect();

    assert_eq!(names[0].0, names[2].0, "foo must intern once");
    assert_eq!(names[1].0, names[4].0, "bar must intern once");
    assert_ne!(names[0].0, names[1].0);
    assert_ne!(names[1].0, names[3].0);

    assert_eq!(lx.names().len(), 3);
    assert_eq!(lx.names().text(names[0].0), "foo");
    // first-seen position is recorded at interning time
    assert_eq!(lx.names().data(names[3].0).first_seen.col, 13);
}

// `with_gnu` seeds `__builtin_va_list` as a typename.
#[test]
fn gnu_builtin_va_list_is_a_typename() {
    let mut lx = Lexer::new("__builtin_va_list ap;", "g.c");
    let toks: Vec<_> = lx.by_ref().collect();
    assert!(matches!(toks[0].tok, Tok::TypeIdent(_, "__builtin_va_list")));
    assert!(matches!(toks[1].tok, Tok::Ident(_, "ap")));
}

// Innermost scope wins: a block-scope object shadows an outer typedef.
#[test]
fn inner_scope_shadows_typedef() {
    let env = Rc::new(Env::with_core());
    env.add_symbol("T", Symbol::Typename);
    env.enter_scope();
    env.add_symbol("T", Symbol::Identifier);

    let mut lx = Lexer::with_env("T", "s.c", Rc::clone(&env));
    let t = lx.next_token();
    assert!(matches!(t.tok, Tok::Ident(_, "T")));

    env.leave_scope();
    let mut lx = Lexer::with_env("T", "s.c", env);
    let t = lx.next_token();
    assert!(matches!(t.tok, Tok::TypeIdent(_, "T")));
}

// A keyword spelling is never an identifier, even a GNU alternate one.
#[test]
fn keyword_spellings_are_not_identifiers() {
    let mut lx = Lexer::new("__const __restrict__ _Bool $if if$", "k.c");
    let toks: Vec<_> = lx.by_ref().collect();
    assert!(matches!(toks[0].tok, Tok::KwConst));
    assert!(matches!(toks[1].tok, Tok::KwRestrict));
    assert!(matches!(toks[2].tok, Tok::KwBool));
    // $-containing lexemes are always identifiers
    assert!(matches!(toks[3].tok, Tok::Ident(_, "$if")));
    assert!(matches!(toks[4].tok, Tok::Ident(_, "if$")));
}

// The recent-token cache feeds the parser's error reporter.
#[test]
fn parse_error_uses_last_token() {
    let mut lx = Lexer::new("int x", "p.c");
    let _ = lx.next_token();
    let x = lx.next_token();
    assert!(matches!(x.tok, Tok::Ident(_, "x")));
    assert_eq!(lx.last_token(), Some(&x));

    let diag = lx.parse_error();
    assert_eq!(diag.message, "The symbol x does not fit here.");
    assert_eq!(diag.pos, x.pos);
    let rendered = diag.to_string();
    assert!(rendered.starts_with("p.c:1:5: Syntax Error !"));
}
