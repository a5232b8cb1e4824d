use std::str::FromStr;

use modsolve_core::version::{Level, Version};
use modsolve_util::errors::ModError;

fn parse(s: &str) -> Version {
    Version::parse(s).unwrap()
}

fn reason(s: &str) -> String {
    match Version::parse(s) {
        Err(ModError::MalformedVersion { input, reason }) => {
            assert_eq!(input, s);
            reason
        }
        other => panic!("expected malformed version for {s:?}, got {other:?}"),
    }
}

const MUST_BEGIN: &str = "Version numbers MUST begin with three dot-separated numbers";

#[test]
fn rejects_wrong_number_of_parts() {
    assert_eq!(reason("1.2"), MUST_BEGIN);
    assert_eq!(reason("1.2.3.4"), MUST_BEGIN);
    assert_eq!(reason(""), MUST_BEGIN);
}

#[test]
fn rejects_non_integers_and_negatives() {
    for s in ["x.2.3", "1.y.3", "1.2.z", "-1.2.3", "1.-2.3", "1.2.-3"] {
        assert_eq!(reason(s), MUST_BEGIN, "input {s}");
    }
}

#[test]
fn rejects_leading_zeroes() {
    for s in ["01.2.3", "1.02.3", "1.2.03"] {
        assert_eq!(reason(s), "Version numbers MUST NOT contain leading zeroes");
    }
}

#[test]
fn permits_zero_components() {
    for s in ["0.2.3", "1.0.3", "1.2.0", "0.0.0"] {
        assert!(Version::parse(s).is_ok(), "input {s}");
    }
}

#[test]
fn parses_components() {
    let v = parse("1.10.0");
    assert_eq!((v.major(), v.minor(), v.patch()), (1, 10, 0));
    assert!(v.is_stable());
    assert_eq!(v.prerelease(), None);
    assert_eq!(v.build(), None);
}

#[test]
fn rejects_bad_prerelease_identifiers() {
    let charset = "Prerelease identifiers MUST use only ASCII alphanumerics and hyphens";
    let empty = "Prerelease identifiers MUST NOT be empty";
    let zeroes = "Prerelease identifiers MUST NOT contain leading zeroes";

    assert_eq!(reason("1.2.3-$100"), charset);
    assert_eq!(reason("1.2.3-rc.1@me"), charset);
    assert_eq!(reason("1.2.3-"), empty);
    assert_eq!(reason("1.2.3-.rc1"), empty);
    assert_eq!(reason("1.2.3-rc1."), empty);
    assert_eq!(reason("1.2.3-rc..1"), empty);
    assert_eq!(reason("1.2.3-01"), zeroes);
    assert_eq!(reason("1.2.3-rc.01"), zeroes);
}

#[test]
fn permits_valid_prerelease_identifiers() {
    for s in ["1.2.3-0", "1.2.3-rc.0", "1.2.3-0xDEADBEEF", "1.2.3-rc.0x10c", "1.0.0-x-y"] {
        assert!(Version::parse(s).is_ok(), "input {s}");
    }
    assert_eq!(parse("1.0.0-x.7.z.92").prerelease().as_deref(), Some("x.7.z.92"));
    assert_eq!(parse("1.0.0-0.3.7").prerelease().as_deref(), Some("0.3.7"));
}

#[test]
fn rejects_bad_build_identifiers() {
    let charset = "Build identifiers MUST use only ASCII alphanumerics and hyphens";
    let empty = "Build identifiers MUST NOT be empty";

    assert_eq!(reason("1.2.3+$100"), charset);
    assert_eq!(reason("1.2.3+rc.1@me"), charset);
    assert_eq!(reason("1.2.3+"), empty);
    assert_eq!(reason("1.2.3+.rc1"), empty);
    assert_eq!(reason("1.2.3+rc1."), empty);
    assert_eq!(reason("1.2.3+rc..1"), empty);
}

#[test]
fn permits_build_identifiers_with_leading_zeroes() {
    for s in ["1.2.3+01", "1.2.3+rc.01", "1.2.3+0", "1.2.3+0xDEADBEEF"] {
        assert!(Version::parse(s).is_ok(), "input {s}");
    }
    let v = parse("1.0.0-beta+exp.sha.5114f85");
    assert_eq!(v.prerelease().as_deref(), Some("beta"));
    assert_eq!(v.build().as_deref(), Some("exp.sha.5114f85"));
}

#[test]
fn rejects_numeric_overflow() {
    let err = Version::parse("18446744073709551616.0.0").unwrap_err();
    assert!(err.to_string().contains("64 bits"), "got: {err}");
}

#[test]
fn stable_versions_sort_numerically() {
    let mut list: Vec<Version> = ["2.1.1", "1.0.0", "2.1.0", "1.10.0", "2.0.0", "1.9.0"]
        .iter()
        .map(|s| parse(s))
        .collect();
    list.sort();
    let sorted: Vec<String> = list.iter().map(|v| v.to_string()).collect();
    assert_eq!(
        sorted,
        vec!["1.0.0", "1.9.0", "1.10.0", "2.0.0", "2.1.0", "2.1.1"]
    );
}

#[test]
fn prereleases_sort_by_identifiers() {
    let expected = [
        "1.0.0-alpha",
        "1.0.0-alpha.1",
        "1.0.0-alpha.beta",
        "1.0.0-beta",
        "1.0.0-beta.2",
        "1.0.0-beta.11",
        "1.0.0-rc.1",
        "1.0.0",
    ];
    let mut list: Vec<Version> = expected.iter().rev().map(|s| parse(s)).collect();
    list.sort();
    let sorted: Vec<String> = list.iter().map(|v| v.to_string()).collect();
    assert_eq!(sorted, expected);
}

#[test]
fn numeric_identifiers_sort_below_alphanumerics() {
    assert!(parse("1.0.0-2") < parse("1.0.0-11"));
    assert!(parse("1.0.0-1") < parse("1.0.0-one"));
    assert!(
        parse("1.0.0-these.parts.are.the-same.but.not.123.waffles")
            < parse("1.0.0-these.parts.are.the-same.but.not.waffles.123")
    );
}

#[test]
fn build_metadata_does_not_affect_precedence() {
    let a = parse("1.0.0-alpha+SHA1");
    let b = parse("1.0.0-alpha+MD5");
    assert_eq!(a, b);
    assert_eq!(a.cmp(&b), std::cmp::Ordering::Equal);
    assert_ne!(a.to_string(), b.to_string());
}

#[test]
fn ordering_is_total_and_transitive() {
    let list: Vec<Version> = [
        "0.0.1", "0.1.0-rc", "0.1.0", "1.0.0-0", "1.0.0-a", "1.0.0-a.0", "1.0.0+x", "1.0.1",
    ]
    .iter()
    .map(|s| parse(s))
    .collect();
    for a in &list {
        for b in &list {
            assert_eq!(a.cmp(b), b.cmp(a).reverse(), "{a} vs {b}");
            for c in &list {
                if a < b && b < c {
                    assert!(a < c, "{a} < {b} < {c}");
                }
            }
        }
    }
}

#[test]
fn display_round_trips() {
    for s in [
        "1.2.3",
        "0.0.0",
        "1.0.0-alpha.1",
        "1.0.0+20130313144700",
        "1.0.0-beta+exp.sha.5114f85",
    ] {
        let v = parse(s);
        assert_eq!(v.to_string(), s);
        assert_eq!(parse(&v.to_string()), v);
    }
}

#[test]
fn from_str_matches_parse() {
    assert_eq!(Version::from_str("2.3.0").unwrap(), Version::new(2, 3, 0));
    assert!(Version::from_str("not-a-version").is_err());
}

#[test]
fn next_major_resets_lower_components() {
    assert_eq!(parse("1.1.1").next(Level::Major).unwrap(), parse("2.0.0"));
    assert_eq!(parse("1.0.0-alpha+abc").next(Level::Major).unwrap(), parse("2.0.0"));
    assert_eq!(parse("1.0.0-alpha+abc").next(Level::Major).unwrap().to_string(), "2.0.0");
}

#[test]
fn next_minor_resets_patch() {
    assert_eq!(parse("1.1.1").next(Level::Minor).unwrap(), parse("1.2.0"));
    assert_eq!(parse("1.1.0-alpha+abc").next(Level::Minor).unwrap(), parse("1.2.0"));
}

#[test]
fn next_patch_drops_prerelease() {
    assert_eq!(parse("1.1.1").next(Level::Patch).unwrap(), parse("1.1.2"));
    assert_eq!(parse("1.0.0-alpha+abc").next(Level::Patch).unwrap(), parse("1.0.1"));
}

#[test]
fn next_does_not_modify_receiver() {
    let v1 = parse("1.0.0");
    let v2 = v1.next(Level::Major).unwrap();
    assert_ne!(v1, v2);
    assert_eq!(v1.to_string(), "1.0.0");
}

#[test]
fn next_past_u64_max_is_none() {
    let max = u64::MAX;
    assert!(Version::new(max, 0, 0).next(Level::Major).is_none());
    assert!(Version::new(1, max, 0).next(Level::Minor).is_none());
    assert!(Version::new(1, 2, max).next(Level::Patch).is_none());
    assert_eq!(
        Version::new(1, 2, max).next(Level::Minor),
        Some(Version::new(1, 3, 0))
    );
}
