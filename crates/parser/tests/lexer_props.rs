// crates/parser/tests/lexer_props.rs
use c11_parser::lexer::Lexer;
use c11_parser::token::Tok;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]
    #[test]
    fn never_panics_and_progresses(s in ".*") {
        let mut lx = Lexer::new(&s, "prop.c");

        let mut last_end = 0usize;
        let max_steps = s.len().saturating_mul(4) + 64;

        for (steps, t) in lx.by_ref().enumerate() {
            let start = t.pos.offset;
            let end = start + t.len;

            // 1) spans are in bounds and never overlap backwards
            prop_assert!(end <= s.len(), "end out of bounds: ({start},{end}) len={} tok={:?} input={s:?}", s.len(), t.tok);
            prop_assert!(
                start >= last_end,
                "token moved backwards: start={start} < last_end={last_end} tok={:?} input={s:?}",
                t.tok
            );
            last_end = end;

            // 2) anti-hang guard
            prop_assert!(
                steps <= max_steps,
                "too many steps (possible hang): steps={steps} len={} input={s:?}",
                s.len()
            );
        }

        // 3) coverage: emitted lexemes plus skipped regions span the input
        prop_assert_eq!(lx.position().offset, s.len());
    }

    // Property 4: the same lexeme always interns to the same Name.
    #[test]
    fn repeated_identifiers_intern_once(name in "[a-z_][a-z0-9_]{0,10}") {
        let src = format!("{name} {name}");
        let mut lx = Lexer::new(&src, "prop.c");
        let toks: Vec<_> = lx.by_ref().collect();
        prop_assert_eq!(toks.len(), 2);
        // generated lexemes that happen to be keywords have no Name
        if let (Tok::Ident(a, _), Tok::Ident(b, _)) = (&toks[0].tok, &toks[1].tok) {
            prop_assert_eq!(a, b);
            prop_assert_eq!(lx.names().len(), 1);
        }
    }

    // Property 3: positions are monotone over any directive-free input.
    #[test]
    fn positions_are_monotone(s in r"[ \t\na-z0-9;{}()+*/=.,<>-]{0,64}") {
        let mut lx = Lexer::new(&s, "prop.c");
        let mut prev_row = 1u32;
        let mut prev_offset = 0usize;
        for t in lx.by_ref() {
            prop_assert!(t.pos.row >= prev_row, "row regressed in {s:?}");
            prop_assert!(t.pos.offset >= prev_offset, "offset regressed in {s:?}");
            prev_row = t.pos.row;
            prev_offset = t.pos.offset + t.len;
        }
    }

    // Clean single-token inputs survive a render/relex round trip.
    #[test]
    fn roundtrip_integer_literals(v in any::<u64>(), suffix in prop::sample::select(vec!["", "u", "l", "ul", "ull", "i"])) {
        let src = format!("{v}{suffix}");
        let mut lx = Lexer::new(&src, "prop.c");
        let toks: Vec<_> = lx.by_ref().collect();
        prop_assert!(lx.take_diags().is_empty());
        prop_assert_eq!(toks.len(), 1);
        match &toks[0].tok {
            Tok::IntLit(text, c) => {
                prop_assert_eq!(*text, src.as_str());
                prop_assert_eq!(c.value, Some(v as u128));
            }
            other => prop_assert!(false, "expected IntLit, got {other:?}"),
        }
    }
}
