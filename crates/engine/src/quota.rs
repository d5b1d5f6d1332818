//! Per-user daily quota for the branded bonus pack.
//!
//! The quota check runs before any credit deduction; a claim is released
//! again if the deduction itself is refused so a rejected request does not
//! burn the day's use.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;

/// In-memory record of which users claimed today's bonus track.
#[derive(Debug, Default)]
pub struct BonusQuota {
    claimed: Mutex<HashMap<String, NaiveDate>>,
}

impl BonusQuota {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim today's bonus use for `user_id`. Returns `false` if already
    /// claimed today.
    pub fn try_claim(&self, user_id: &str) -> bool {
        self.try_claim_on(user_id, chrono::Utc::now().date_naive())
    }

    /// Release a claim taken earlier today (the deduction it gated was
    /// refused).
    pub fn release(&self, user_id: &str) {
        let mut claimed = self.claimed.lock().expect("quota lock poisoned");
        claimed.remove(user_id);
    }

    fn try_claim_on(&self, user_id: &str, today: NaiveDate) -> bool {
        let mut claimed = self.claimed.lock().expect("quota lock poisoned");
        match claimed.get(user_id) {
            Some(date) if *date == today => false,
            _ => {
                claimed.insert(user_id.to_string(), today);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    #[test]
    fn second_same_day_claim_is_rejected() {
        let quota = BonusQuota::new();
        assert!(quota.try_claim_on("user-1", day(6)));
        assert!(!quota.try_claim_on("user-1", day(6)));
    }

    #[test]
    fn claims_reset_the_next_day() {
        let quota = BonusQuota::new();
        assert!(quota.try_claim_on("user-1", day(6)));
        assert!(quota.try_claim_on("user-1", day(7)));
    }

    #[test]
    fn users_are_independent() {
        let quota = BonusQuota::new();
        assert!(quota.try_claim_on("user-1", day(6)));
        assert!(quota.try_claim_on("user-2", day(6)));
    }

    #[test]
    fn release_allows_a_retry() {
        let quota = BonusQuota::new();
        assert!(quota.try_claim_on("user-1", day(6)));
        quota.release("user-1");
        assert!(quota.try_claim_on("user-1", day(6)));
    }
}
