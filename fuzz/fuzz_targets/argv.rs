#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use suiteboot::argv::{normalize, split_assignments, OptionRegistry};

#[derive(Arbitrary, Debug)]
struct Input {
    argv: Vec<String>,
}

fuzz_target!(|input: Input| {
    let registry = OptionRegistry::standard();

    // Splitting only ever happens at the first '='
    let split = split_assignments(&input.argv);
    let expected_len = input.argv.len()
        + input
            .argv
            .iter()
            .skip(1)
            .filter(|arg| arg.contains('='))
            .count();
    assert_eq!(split.len(), expected_len);
    if let Some(program) = input.argv.first() {
        assert_eq!(&split[0], program);
    }

    // Normalization must not panic; a successful result never forwards a
    // registered option and keeps the program name in front
    if let Ok(normalized) = normalize(&input.argv, &registry) {
        for token in normalized.forwardable.iter().skip(1) {
            assert!(registry.lookup(token).is_none(), "forwarded {:?}", token);
        }
        assert_eq!(normalized.forwardable.first(), input.argv.first());
    }
});
