//! Daily action budget for autonomous mode.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Capped counter that resets when the calendar date changes.
///
/// `limit == -1` means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceBudget {
    pub count: u32,
    pub limit: i64,
    pub last_reset_date: NaiveDate,
}

impl ResourceBudget {
    pub const UNLIMITED: i64 = -1;

    pub fn new(limit: i64, today: NaiveDate) -> Self {
        Self {
            count: 0,
            limit,
            last_reset_date: today,
        }
    }

    /// Reset the counter if `today` differs from the last reset date.
    ///
    /// Returns `true` when a reset happened. Calling again with the same
    /// date is a no-op.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.last_reset_date == today {
            return false;
        }
        self.count = 0;
        self.last_reset_date = today;
        true
    }

    pub fn is_unlimited(&self) -> bool {
        self.limit == Self::UNLIMITED
    }

    pub fn is_exhausted(&self) -> bool {
        !self.is_unlimited() && i64::from(self.count) >= self.limit
    }

    /// Actions left today, `None` when unlimited.
    pub fn remaining(&self) -> Option<u32> {
        if self.is_unlimited() {
            return None;
        }
        let left = (self.limit - i64::from(self.count)).max(0);
        Some(u32::try_from(left).unwrap_or(u32::MAX))
    }

    pub fn record_action(&mut self) {
        self.count = self.count.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_exhaustion() {
        let mut budget = ResourceBudget::new(2, day(1));
        assert!(!budget.is_exhausted());
        budget.record_action();
        budget.record_action();
        assert!(budget.is_exhausted());
        assert_eq!(budget.remaining(), Some(0));
    }

    #[test]
    fn test_unlimited_never_exhausts() {
        let mut budget = ResourceBudget::new(ResourceBudget::UNLIMITED, day(1));
        for _ in 0..1000 {
            budget.record_action();
        }
        assert!(!budget.is_exhausted());
        assert_eq!(budget.remaining(), None);
    }

    #[test]
    fn test_resets_once_per_distinct_date() {
        let mut budget = ResourceBudget::new(5, day(1));
        budget.record_action();
        assert!(!budget.roll_over(day(1)));
        assert_eq!(budget.count, 1);

        assert!(budget.roll_over(day(2)));
        assert_eq!(budget.count, 0);
        budget.record_action();

        // Same date again: no second reset
        assert!(!budget.roll_over(day(2)));
        assert_eq!(budget.count, 1);
        assert_eq!(budget.last_reset_date, day(2));
    }

    #[test]
    fn test_zero_limit_is_immediately_exhausted() {
        let budget = ResourceBudget::new(0, day(1));
        assert!(budget.is_exhausted());
    }
}
