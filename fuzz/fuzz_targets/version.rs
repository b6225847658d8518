#![no_main]

use libfuzzer_sys::fuzz_target;
use std::cmp::Ordering;
use suiteboot::version::{compare_versions, parse_banner};

fuzz_target!(|data: (String, String)| {
    let (a, b) = data;

    // Ordering must be antisymmetric and reflexive
    assert_eq!(compare_versions(&a, &a), Ordering::Equal);
    assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());

    let _ = parse_banner(&a);
});
