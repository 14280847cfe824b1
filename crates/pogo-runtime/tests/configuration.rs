//! Feature-set configuration tests
//!
//! Feature-set tokens are validated when a definition is created: a bad
//! token fails fast, before any call, naming the offending value.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use pogo_runtime::{FeatureSet, RuntimeError, TailFn, Value};
use rstest::rstest;

#[test]
fn unknown_feature_set_string_fails_at_definition_time() {
    let result = TailFn::with_feature_set_str("broken", "not_a_feature_set", |_| Ok(Value::Null));
    match result {
        Err(RuntimeError::InvalidConfiguration { token }) => {
            assert_eq!(token, "not_a_feature_set")
        }
        other => panic!("expected InvalidConfiguration, got {:?}", other),
    }
}

#[test]
fn unknown_feature_set_message_names_the_token() {
    let err = TailFn::recursive_with_feature_set_str("broken", "fulll", |_, _| Ok(Value::Null))
        .err()
        .expect("definition should be rejected");
    assert!(err.to_string().contains("'fulll'"), "message: {}", err);
}

#[rstest]
#[case("base", FeatureSet::Base)]
#[case("nested", FeatureSet::Nested)]
#[case("capture", FeatureSet::Capture)]
#[case("full", FeatureSet::Full)]
fn known_feature_set_strings_are_accepted(#[case] token: &str, #[case] expected: FeatureSet) {
    let defined = TailFn::with_feature_set_str("ok", token, |_| Ok(Value::Null))
        .expect("token should be accepted");
    assert_eq!(defined.feature_set(), expected);
}

#[test]
fn full_combines_nested_resolution_and_capture() {
    assert!(FeatureSet::Full.resolves_nested_calls());
    assert!(FeatureSet::Full.captures_operators());
    assert!(!FeatureSet::Base.resolves_nested_calls());
    assert!(!FeatureSet::Base.captures_operators());
}

#[test]
fn default_feature_set_is_full() {
    let defined = TailFn::new("defaulted", |_| Ok(Value::Null));
    assert_eq!(defined.feature_set(), FeatureSet::Full);
}
