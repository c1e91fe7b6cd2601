// crates/parser/tests/lexer_directives.rs
use std::rc::Rc;

use c11_parser::error::Diag;
use c11_parser::lexer::Lexer;
use c11_parser::token::{Tok, Token};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn lex_all<'s>(input: &'s str) -> (Vec<Token<'s>>, Vec<Diag>) {
    let mut lx = Lexer::new(input, "main.c");
    let toks: Vec<_> = lx.by_ref().collect();
    let diags = lx.take_diags();
    (toks, diags)
}

// Scenario (c): `#line` re-bases file, row, and column.
#[test]
fn line_directive_rebases_position() {
    init_logs();
    let (toks, diags) = lex_all("#line 42 \"foo.c\"\nint z;");
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(toks.len(), 3);

    let int = &toks[0];
    assert!(matches!(int.tok, Tok::KwInt));
    assert_eq!(int.pos.file.as_ref(), "foo.c");
    assert_eq!(int.pos.row, 42);
    assert_eq!(int.pos.col, 1);
    assert_eq!(int.pos.offset, 17);

    let z = &toks[1];
    assert_eq!(z.pos.row, 42);
    assert_eq!(z.pos.col, 5);
}

// gcc emits `# N "file" flags...`; trailing integers are ignored.
#[test]
fn gcc_linemarker_with_flags() {
    let (toks, diags) = lex_all("# 7 \"bar.h\" 1 2 3\nx;");
    assert!(diags.is_empty(), "{diags:?}");
    assert!(matches!(toks[0].tok, Tok::Ident(_, "x")));
    assert_eq!(toks[0].pos.file.as_ref(), "bar.h");
    assert_eq!(toks[0].pos.row, 7);
    assert_eq!(toks[0].pos.col, 1);
}

#[test]
fn line_directive_without_filename_keeps_file() {
    let (toks, diags) = lex_all("#line 100\ny;");
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(toks[0].pos.file.as_ref(), "main.c");
    assert_eq!(toks[0].pos.row, 100);
}

#[test]
fn rows_continue_counting_after_rebase() {
    let (toks, diags) = lex_all("#line 10 \"f.c\"\na\nb");
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(toks[0].pos.row, 10);
    assert_eq!(toks[1].pos.row, 11);
    assert_eq!(toks[1].pos.col, 1);
}

// A filename equal to the current one must be shared by reference, and
// re-applying the same directive is idempotent (same resulting position).
#[test]
fn filename_sharing_and_idempotence() {
    let (toks, diags) = lex_all("#line 42 \"foo.c\"\na\n#line 42 \"foo.c\"\nb");
    assert!(diags.is_empty(), "{diags:?}");
    let a = &toks[0];
    let b = &toks[1];
    assert_eq!(a.pos.row, 42);
    assert_eq!(b.pos.row, 42);
    assert_eq!(a.pos.col, b.pos.col);
    assert_eq!(a.pos.file, b.pos.file);
    assert!(
        Rc::ptr_eq(&a.pos.file, &b.pos.file),
        "equal filename must retain the existing reference"
    );
}

#[test]
fn pragma_and_ident_lines_are_skipped() {
    let (toks, diags) = lex_all("#pragma once\nint x;");
    assert!(diags.is_empty(), "{diags:?}");
    assert!(matches!(toks[0].tok, Tok::KwInt));
    assert_eq!(toks[0].pos.row, 2);
    assert_eq!(toks[0].pos.col, 1);

    let (toks, diags) = lex_all("# pragma GCC poison printf\n#ident \"build\"\ny");
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(toks.len(), 1);
    assert!(matches!(toks[0].tok, Tok::Ident(_, "y")));
    assert_eq!(toks[0].pos.row, 3);
}

#[test]
fn crlf_and_bare_cr_column_rules() {
    // \r\n counts as one row bump
    let (toks, diags) = lex_all("int\r\nx");
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(toks[1].pos.row, 2);
    assert_eq!(toks[1].pos.col, 1);

    // a bare \r advances the offset but not the column
    let (toks, diags) = lex_all("a\rb");
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(toks[1].pos.row, 1);
    assert_eq!(toks[1].pos.col, 2);
    assert_eq!(toks[1].pos.offset, 2);
}

#[test]
fn directive_at_eof_without_newline() {
    let mut lx = Lexer::new("#line 42", "main.c");
    assert!(lx.next().is_none());
    assert_eq!(lx.position().row, 42);
    assert_eq!(lx.position().col, 1);

    let eof = Lexer::new("#line 5 \"end.c\"", "main.c").next_token();
    assert!(matches!(eof.tok, Tok::Eof));
    assert_eq!(eof.pos.file.as_ref(), "end.c");
}

// A `#` that introduces no known directive is a plain lexical error.
#[test]
fn stray_hash_is_rejected() {
    let mut lx = Lexer::new("#include <stdio.h>\n", "main.c");
    let toks: Vec<_> = lx.by_ref().collect();
    assert!(toks.iter().any(|t| matches!(t.tok, Tok::Error)));
    assert!(!lx.diags().is_empty());
    assert_eq!(lx.diags()[0].message, "The character # does not fit here.");
}
