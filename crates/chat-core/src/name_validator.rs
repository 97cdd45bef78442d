//! Display-name policy.

/// Names nobody may pick, compared case-insensitively.
const RESERVED_NAMES: [&str; 5] = ["me", "admin", "administrator", "server", "host"];

/// Stateless predicate over candidate display names.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameValidator;

impl NameValidator {
    pub fn new() -> Self {
        NameValidator
    }

    /// Returns `false` for blank names and for reserved words.
    pub fn is_valid(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return false;
        }

        let lowered = candidate.to_lowercase();
        !RESERVED_NAMES.iter().any(|reserved| *reserved == lowered)
    }

    /// The fixed reserved-word list.
    pub fn reserved_names() -> &'static [&'static str] {
        &RESERVED_NAMES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names_are_rejected() {
        let validator = NameValidator::new();
        for name in NameValidator::reserved_names() {
            assert!(!validator.is_valid(name), "{} should be rejected", name);
        }
    }

    #[test]
    fn reserved_names_are_rejected_in_any_case() {
        let validator = NameValidator::new();
        assert!(!validator.is_valid("ME"));
        assert!(!validator.is_valid("Admin"));
        assert!(!validator.is_valid("ADMINISTRATOR"));
        assert!(!validator.is_valid("Host"));
    }

    #[test]
    fn blank_names_are_rejected() {
        let validator = NameValidator::new();
        assert!(!validator.is_valid(""));
        assert!(!validator.is_valid("   "));
        assert!(!validator.is_valid("\t\n"));
    }

    #[test]
    fn ordinary_names_are_accepted() {
        let validator = NameValidator::new();
        assert!(validator.is_valid("Alice"));
        assert!(validator.is_valid("admin2"));
        assert!(validator.is_valid("the host"));
    }
}
