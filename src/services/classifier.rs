use crate::models::job::FailureClass;
use crate::models::options::EngineSettings;

/// Error-message substrings that indicate a content-policy rejection rather
/// than infrastructure trouble. Matched case-insensitively; anything that
/// matches none of these is treated as transient.
const POLICY_MARKERS: &[&str] = &[
    "prohibited",
    "policy",
    "moderation",
    "moderated",
    "safety",
    "blocked",
    "rejected",
    "nsfw",
    "content filter",
];

/// Classify a raw error message into its failure class.
pub fn classify(message: &str) -> FailureClass {
    let message = message.to_lowercase();
    if POLICY_MARKERS.iter().any(|marker| message.contains(marker)) {
        FailureClass::Policy
    } else {
        FailureClass::Transient
    }
}

/// The retry ceiling that applies to a failure class.
pub fn retry_limit(class: FailureClass, settings: &EngineSettings) -> u32 {
    match class {
        FailureClass::Transient => settings.transient_retry_limit,
        FailureClass::Policy => settings.policy_retry_limit,
    }
}

/// A failed item at or over its class ceiling is blocked: still visible and
/// deletable, but excluded from retry.
pub fn is_blocked(class: FailureClass, retry_count: u32, settings: &EngineSettings) -> bool {
    retry_count >= retry_limit(class, settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prohibited_is_a_policy_rejection() {
        assert_eq!(
            classify("Request contains PROHIBITED content"),
            FailureClass::Policy
        );
    }

    #[test]
    fn overloaded_is_transient() {
        assert_eq!(
            classify("model is temporarily overloaded, try again"),
            FailureClass::Transient
        );
    }

    #[test]
    fn timeout_is_transient() {
        assert_eq!(classify("request timed out after 30s"), FailureClass::Transient);
    }

    #[test]
    fn safety_and_blocked_are_policy() {
        assert_eq!(classify("blocked by safety system"), FailureClass::Policy);
        assert_eq!(classify("image was Blocked"), FailureClass::Policy);
    }

    #[test]
    fn each_class_uses_its_own_ceiling() {
        let settings = EngineSettings {
            concurrency: 2,
            transient_retry_limit: 5,
            policy_retry_limit: 1,
        };
        assert_eq!(retry_limit(FailureClass::Transient, &settings), 5);
        assert_eq!(retry_limit(FailureClass::Policy, &settings), 1);

        assert!(!is_blocked(FailureClass::Transient, 4, &settings));
        assert!(is_blocked(FailureClass::Transient, 5, &settings));
        assert!(is_blocked(FailureClass::Policy, 1, &settings));
        assert!(!is_blocked(FailureClass::Policy, 0, &settings));
    }

    #[test]
    fn zero_policy_ceiling_blocks_every_policy_failure() {
        let settings = EngineSettings {
            policy_retry_limit: 0,
            ..EngineSettings::default()
        };
        for retry_count in 0..=5 {
            assert!(is_blocked(FailureClass::Policy, retry_count, &settings));
        }
    }
}
