// fuzz_targets/lexer.rs
#![no_main]

use c11_parser::lexer::Lexer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Lossy conversion keeps arbitrary bytes from tripping over UTF-8.
    let s = String::from_utf8_lossy(data);

    let mut lx = Lexer::new(&s, "fuzz.c");

    let mut last_end = 0usize;
    let mut steps = 0usize;
    let max_steps = s.len().saturating_mul(4) + 64;

    for t in lx.by_ref() {
        let start = t.pos.offset;
        let end = start + t.len;

        assert!(end <= s.len());
        assert!(start >= last_end);
        last_end = end;

        steps += 1;
        assert!(steps <= max_steps);
    }

    // every byte is accounted for by a lexeme or a skipped region
    assert_eq!(lx.position().offset, s.len());
});
