//! Property tests for OSC address pattern matching.

use osc_receiver::address::{is_pattern, matches};
use proptest::prelude::*;

fn address() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-zA-Z0-9_.-]{1,8}", 1..5)
        .prop_map(|parts| format!("/{}", parts.join("/")))
}

proptest! {
    #[test]
    fn literal_pattern_matches_only_itself(a in address(), b in address()) {
        prop_assume!(!is_pattern(&a));
        prop_assert!(matches(&a, &a));
        prop_assert_eq!(matches(&a, &b), a == b);
    }

    #[test]
    fn lone_star_matches_any_address(a in address()) {
        prop_assert!(matches("*", &a));
    }

    #[test]
    fn star_part_matches_single_part(a in address(), tail in "[a-z]{1,6}") {
        let pattern = format!("{}/*", a);
        let one_deeper = format!("{}/{}", a, tail);
        let two_deeper = format!("{}/{}/{}", a, tail, tail);
        prop_assert!(matches(&pattern, &one_deeper));
        prop_assert!(!matches(&pattern, &two_deeper));
    }

    #[test]
    fn question_marks_match_same_length(a in address()) {
        let pattern: String = a.chars().map(|c| if c == '/' { '/' } else { '?' }).collect();
        prop_assert!(matches(&pattern, &a));

        let longer = format!("{}x", a);
        prop_assert!(!matches(&pattern, &longer));
    }

    #[test]
    fn alternation_matches_each_alternative(x in "[a-z]{1,6}", y in "[a-z]{1,6}", rest in address()) {
        let pattern = format!("/{{{},{}}}{}", x, y, rest);
        let via_x = format!("/{}{}", x, rest);
        let via_y = format!("/{}{}", y, rest);
        prop_assert!(matches(&pattern, &via_x));
        prop_assert!(matches(&pattern, &via_y));
    }
}

#[test]
fn test_pattern_examples() {
    assert!(matches("/foo/*", "/foo/bar"));
    assert!(!matches("/foo/*", "/foo/bar/baz"));
    assert!(matches("/foo/*/baz", "/foo/bar/baz"));
    assert!(matches("/foo/[a-c]oo", "/foo/boo"));
    assert!(!matches("/foo/[a-c]oo", "/foo/doo"));
    assert!(matches("/{foo,bar}/x", "/bar/x"));
    assert!(matches("*", "/"));
}
