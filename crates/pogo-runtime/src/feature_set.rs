//! Feature set selection
//!
//! A feature set picks the resolver/proxy pairing a definition uses:
//! whether deferred calls nested inside argument trees are resolved, and
//! whether operators applied to unresolved deferred calls are captured.
//! Tokens are validated when the definition is created — a bad name never
//! survives to call time.

use crate::value::RuntimeError;
use std::fmt;
use std::str::FromStr;

/// Resolver/proxy pairing for a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FeatureSet {
    /// Top-level trampoline only; no operator capture.
    Base,
    /// Nested-resolution stack machine; no operator capture.
    Nested,
    /// Top-level trampoline with operator capture.
    Capture,
    /// Nested resolution and operator capture.
    #[default]
    Full,
}

impl FeatureSet {
    /// All recognized variants, in token order.
    pub const ALL: [FeatureSet; 4] = [
        FeatureSet::Base,
        FeatureSet::Nested,
        FeatureSet::Capture,
        FeatureSet::Full,
    ];

    /// Whether deferred calls nested as arguments are resolved before the
    /// enclosing operation runs.
    pub fn resolves_nested_calls(self) -> bool {
        matches!(self, FeatureSet::Nested | FeatureSet::Full)
    }

    /// Whether operators applied to an unresolved deferred call produce a
    /// new deferred call instead of failing.
    pub fn captures_operators(self) -> bool {
        matches!(self, FeatureSet::Capture | FeatureSet::Full)
    }

    /// The configuration token for this variant.
    pub fn name(self) -> &'static str {
        match self {
            FeatureSet::Base => "base",
            FeatureSet::Nested => "nested",
            FeatureSet::Capture => "capture",
            FeatureSet::Full => "full",
        }
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FeatureSet {
    type Err = RuntimeError;

    /// Parse a feature-set token. Unrecognized tokens fail immediately,
    /// naming the offending value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base" => Ok(FeatureSet::Base),
            "nested" => Ok(FeatureSet::Nested),
            "capture" => Ok(FeatureSet::Capture),
            "full" => Ok(FeatureSet::Full),
            other => Err(RuntimeError::InvalidConfiguration {
                token: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_tokens() {
        for fs in FeatureSet::ALL {
            assert_eq!(fs.name().parse::<FeatureSet>().unwrap(), fs);
        }
    }

    #[test]
    fn test_unknown_token_names_offender() {
        let err = "not_a_feature_set".parse::<FeatureSet>().unwrap_err();
        assert_eq!(
            err,
            RuntimeError::InvalidConfiguration {
                token: "not_a_feature_set".to_string()
            }
        );
        assert!(err.to_string().contains("not_a_feature_set"));
    }

    #[test]
    fn test_selector_flags() {
        assert!(!FeatureSet::Base.resolves_nested_calls());
        assert!(!FeatureSet::Base.captures_operators());
        assert!(FeatureSet::Nested.resolves_nested_calls());
        assert!(!FeatureSet::Nested.captures_operators());
        assert!(!FeatureSet::Capture.resolves_nested_calls());
        assert!(FeatureSet::Capture.captures_operators());
        assert!(FeatureSet::Full.resolves_nested_calls());
        assert!(FeatureSet::Full.captures_operators());
    }

    #[test]
    fn test_default_is_full() {
        assert_eq!(FeatureSet::default(), FeatureSet::Full);
    }
}
