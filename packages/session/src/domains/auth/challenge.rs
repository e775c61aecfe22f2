use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Pending OTP verification for one phone number.
///
/// Held in memory only. It is consumed by the first successful verification;
/// after that, or once it expires, every further attempt is rejected.
/// Requesting a new code simply produces a new challenge and the old one is
/// dropped with whatever screen held it.
#[derive(Debug)]
pub struct Challenge {
    id: Uuid,
    phone_number: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    consumed: AtomicBool,
}

impl Challenge {
    pub(crate) fn new(phone_number: String, ttl: Duration) -> Self {
        let issued_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(1));
        Self {
            id: Uuid::new_v4(),
            phone_number,
            issued_at,
            expires_at: issued_at + ttl,
            consumed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Normalized number the code was sent to
    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed.load(Ordering::Acquire)
    }

    pub fn is_usable(&self) -> bool {
        !self.is_consumed() && !self.is_expired()
    }

    /// Mark the challenge used. Returns false if another verification got
    /// there first.
    pub(crate) fn consume(&self) -> bool {
        self.consumed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumes_exactly_once() {
        let challenge = Challenge::new("+919999999999".into(), Duration::from_secs(600));
        assert!(challenge.is_usable());
        assert!(challenge.consume());
        assert!(!challenge.consume());
        assert!(!challenge.is_usable());
    }

    #[test]
    fn zero_ttl_is_expired_immediately() {
        let challenge = Challenge::new("+919999999999".into(), Duration::ZERO);
        assert!(challenge.is_expired());
        assert!(!challenge.is_usable());
    }

    #[test]
    fn challenges_are_distinct() {
        let a = Challenge::new("+919999999999".into(), Duration::from_secs(600));
        let b = Challenge::new("+919999999999".into(), Duration::from_secs(600));
        assert_ne!(a.id(), b.id());
    }
}
