use sha2::{Digest, Sha256};

use crate::error::{Result, SessionError};

/// Length of every one-time code the providers issue.
pub const OTP_LENGTH: usize = 6;

/// Normalize a user-typed phone number to E.164-ish form.
///
/// Whitespace is stripped and what remains must be digits, optionally
/// after a single leading `+`. Numbers without a leading `+` get
/// `default_country_code` prepended; numbers that already carry a prefix are
/// returned unchanged, so normalizing twice is a no-op.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> Result<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let (prefixed, digits) = match compact.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, compact.as_str()),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SessionError::validation("Please enter a valid phone number"));
    }

    if prefixed {
        return Ok(compact);
    }
    Ok(format!("{}{}", default_country_code, compact))
}

/// A code is exactly six ASCII digits.
pub fn is_valid_code(code: &str) -> bool {
    code.len() == OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

/// SHA-256 hex of a phone number, used as a stable subject id and lookup key
/// where the raw number should not be stored.
pub fn hash_phone_number(phone_number: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(phone_number.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepends_default_country_code() {
        assert_eq!(normalize_phone("9999999999", "+91").unwrap(), "+919999999999");
    }

    #[test]
    fn prefixed_numbers_are_unchanged() {
        assert_eq!(normalize_phone("+15551234567", "+91").unwrap(), "+15551234567");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["9999999999", "+919999999999", " 98765 43210 ", "+1 555 123 4567"] {
            let once = normalize_phone(raw, "+91").unwrap();
            let twice = normalize_phone(&once, "+91").unwrap();
            assert_eq!(once, twice, "normalizing {raw:?} twice changed it");
            assert_eq!(once.matches('+').count(), 1);
        }
    }

    #[test]
    fn strips_inner_whitespace() {
        assert_eq!(normalize_phone(" 98765 43210 ", "+91").unwrap(), "+919876543210");
    }

    #[test]
    fn empty_number_is_rejected() {
        assert!(matches!(
            normalize_phone("   ", "+91"),
            Err(SessionError::Validation(_))
        ));
    }

    #[test]
    fn bare_prefix_and_letters_are_rejected() {
        for raw in ["+", " + ", "+abc", "+91-99999", "99x99", "++919999999999"] {
            assert!(
                matches!(normalize_phone(raw, "+91"), Err(SessionError::Validation(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn code_format() {
        assert!(is_valid_code("112233"));
        assert!(!is_valid_code("11223"));
        assert!(!is_valid_code("1122334"));
        assert!(!is_valid_code("11a233"));
        assert!(!is_valid_code("١١٢٢٣٣"));
    }

    #[test]
    fn phone_hash_consistency() {
        assert_eq!(hash_phone_number("+1234567890"), hash_phone_number("+1234567890"));
        assert_ne!(hash_phone_number("+1234567890"), hash_phone_number("+9876543210"));
    }

    #[test]
    fn phone_hash_format() {
        let hash = hash_phone_number("+1234567890");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
