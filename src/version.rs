//! Runtime version parsing and ordering

use regex::Regex;
use std::cmp::Ordering;

/// Version reported by a runtime built from an unreleased checkout
pub const DEVELOPMENT_VERSION: &str = "@package_version@";

/// Oldest runtime release the launcher accepts
pub const MINIMUM_VERSION: &str = "3.7.0";

/// Extract the version from a runtime's `--version` banner
///
/// Recognizes the development sentinel and dotted numeric versions with an
/// optional pre-release suffix, e.g. `PHPUnit 3.8.0-RC1 by Sebastian Bergmann.`.
pub fn parse_banner(banner: &str) -> Option<String> {
    if banner.contains(DEVELOPMENT_VERSION) {
        return Some(DEVELOPMENT_VERSION.to_string());
    }
    let pattern = Regex::new(r"\b\d+(?:\.\d+)+(?:[-+][0-9A-Za-z]+(?:\.[0-9A-Za-z]+)*)?").ok()?;
    pattern.find(banner).map(|m| m.as_str().to_string())
}

#[derive(Debug, PartialEq, Eq)]
enum Part<'a> {
    Number(&'a str),
    Word(&'a str),
}

/// Split a version into numeric and alphabetic parts
///
/// `-`, `_` and `+` act like `.`, and a change between digits and letters
/// starts a new part: `1.0rc1` becomes `1`, `0`, `rc`, `1`.
fn parts(version: &str) -> Vec<Part<'_>> {
    let mut parts = Vec::new();
    let mut start = None;
    let mut numeric = false;

    for (index, ch) in version.char_indices() {
        if matches!(ch, '.' | '-' | '_' | '+') {
            if let Some(from) = start.take() {
                parts.push(part(&version[from..index], numeric));
            }
            continue;
        }
        let digit = ch.is_ascii_digit();
        match start {
            Some(from) if digit != numeric => {
                parts.push(part(&version[from..index], numeric));
                start = Some(index);
            }
            Some(_) => {}
            None => start = Some(index),
        }
        numeric = digit;
    }
    if let Some(from) = start {
        parts.push(part(&version[from..], numeric));
    }
    parts
}

fn part(text: &str, numeric: bool) -> Part<'_> {
    if numeric {
        Part::Number(text)
    } else {
        Part::Word(text)
    }
}

/// Rank of a part relative to the pre-release keywords; numbers rank as 4
fn rank(part: &Part<'_>) -> i32 {
    match part {
        Part::Number(_) => 4,
        Part::Word(word) => match word.to_ascii_lowercase().as_str() {
            "dev" => 0,
            "alpha" | "a" => 1,
            "beta" | "b" => 2,
            "rc" => 3,
            "pl" | "p" => 5,
            _ => -1,
        },
    }
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Order two versions the way release numbering is conventionally read
///
/// `3.7.0 < 3.7.1 < 3.10.0`, `3.7.0-dev < 3.7.0-alpha1 < 3.7.0-beta <
/// 3.7.0-RC1 < 3.7.0 < 3.7.0-pl1`, and `3.7 < 3.7.0`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = parts(a);
    let right = parts(b);

    for pair in left.iter().zip(right.iter()) {
        let ordering = match pair {
            (Part::Number(x), Part::Number(y)) => compare_numbers(x, y),
            (x, y) => rank(x).cmp(&rank(y)),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    // A trailing number makes a version newer, a trailing pre-release older
    let tail = |extra: &Part<'_>| match extra {
        Part::Number(_) => Ordering::Greater,
        word => rank(word).cmp(&4),
    };
    match left.len().cmp(&right.len()) {
        Ordering::Greater => tail(&left[right.len()]),
        Ordering::Less => tail(&right[left.len()]).reverse(),
        Ordering::Equal => Ordering::Equal,
    }
}

/// Whether a reported version passes the minimum-version gate
///
/// The development sentinel always passes.
pub fn satisfies_minimum(version: &str, minimum: &str) -> bool {
    version == DEVELOPMENT_VERSION || compare_versions(version, minimum) != Ordering::Less
}
