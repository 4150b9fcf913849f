// Mon Oct 19 2026 - Alex

//! Properties checked on the software backend, plus agreement with the
//! native one.

mod common;

use common::{exact, init_logging, masked, naive_find, with_horspool, Bytes};
use jit_pattern_scanner::emit::ProgramFault;
use jit_pattern_scanner::{JitRuntime, Pattern, PatternCompiler, SkipTable, TargetWidth};

fn corpus() -> Vec<Pattern> {
    vec![
        with_horspool(exact(b"ABCD")),
        with_horspool(exact(b"AAAB")),
        with_horspool(masked(b"A?CA", &[0xFF, 0x00, 0xFF, 0xFF])),
        with_horspool(masked(&[0x40, b'B', b'A'], &[0xF0, 0xFF, 0xFF])),
        masked(b"AB??", &[0xFF, 0xFF, 0x00, 0x00]),
    ]
}

#[test]
fn test_skip_tables_always_make_progress() {
    init_logging();
    let compiler = PatternCompiler::new();
    let mut gen = Bytes::new(7);

    for pattern in corpus() {
        let program = compiler.compile_program(&pattern, TargetWidth::Bits64).unwrap();

        for len in 0..128 {
            let data = gen.buffer(len, b"ABCD");
            // Every iteration moves at least one byte forward.
            let outcome = program
                .run(&data, 0, data.len(), Some(data.len() as u64 + 1))
                .unwrap();
            assert_eq!(outcome.found, naive_find(&pattern, &data), "{} over {:?}", pattern, data);
        }
    }
}

#[test]
fn test_stalling_table_is_caught() {
    init_logging();
    // A table built with a zero entry is refused up front.
    let err = exact(b"AB")
        .with_skip_table(SkipTable::from_entries(2, [(b'C', 0)]), 1)
        .unwrap_err();
    assert_eq!(err.to_string(), "Skip table entry for byte 0x43 is zero");

    // And a runaway loop would be reported instead of hanging.
    let program = PatternCompiler::new()
        .compile_program(&exact(b"Z"), TargetWidth::Bits64)
        .unwrap();
    let data = vec![b'Y'; 1000];
    assert_eq!(program.run(&data, 0, data.len(), Some(10)), Err(ProgramFault::StepLimit(10)));
}

#[test]
fn test_reads_stay_inside_range() {
    init_logging();
    let compiler = PatternCompiler::new();
    let mut gen = Bytes::new(99);

    for pattern in corpus() {
        let program = compiler.compile_program(&pattern, TargetWidth::Bits32).unwrap();
        for len in 0..64 {
            let data = gen.buffer(len, b"ABCD");
            for start in 0..=len {
                // Out-of-bounds reads fault in the reference backend.
                let outcome = program.run(&data, start, len, None).unwrap();
                let expected = naive_find(&pattern, &data[start..]).map(|i| i + start);
                assert_eq!(outcome.found, expected);
            }
        }
    }
}

#[test]
fn test_table_width_does_not_change_results() {
    init_logging();
    let compiler = PatternCompiler::new();
    let mut gen = Bytes::new(1234);

    for pattern in corpus() {
        let wide = compiler.compile_program(&pattern, TargetWidth::Bits64).unwrap();
        let narrow = compiler.compile_program(&pattern, TargetWidth::Bits32).unwrap();

        for _ in 0..50 {
            let data = gen.buffer(80, b"ABCD@");
            assert_eq!(
                wide.run(&data, 0, data.len(), None),
                narrow.run(&data, 0, data.len(), None)
            );
        }
    }
}

#[test]
fn test_native_agrees_with_reference() {
    init_logging();
    let runtime = JitRuntime::new().unwrap();
    let compiler = PatternCompiler::new();
    let mut gen = Bytes::new(0xC0FFEE);

    for pattern in corpus() {
        let program = compiler.compile_program(&pattern, runtime.target()).unwrap();
        let scanner = runtime.compile(&pattern).expect("scanner");

        for len in 0..100 {
            let data = gen.buffer(len, b"ABCD@");
            assert_eq!(scanner.scan(&data), program.scan(&data).unwrap(), "{}", pattern);
        }
    }
}
