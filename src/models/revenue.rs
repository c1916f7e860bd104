//! Visit revenue and the cut-off chart that splits it.
//!
//! The cut-off chart maps a price range to the platform's (admin's) share of
//! a visit, expressed in basis points. The gym receives the remainder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 100% in basis points.
pub const FULL_SHARE_BPS: i32 = 10_000;

/// One row of the cut-off chart.
///
/// A rule applies to amounts in `min_amount_cents..=max_amount_cents`; a
/// missing maximum makes the range open-ended.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct CutoffRule {
    pub id: i64,
    pub label: String,
    pub min_amount_cents: i64,
    pub max_amount_cents: Option<i64>,
    pub admin_share_bps: i32,
}

impl CutoffRule {
    pub fn contains(&self, amount_cents: i64) -> bool {
        amount_cents >= self.min_amount_cents
            && self.max_amount_cents.is_none_or(|max| amount_cents <= max)
    }
}

/// How one visit's revenue is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RevenueSplit {
    pub rule_id: i64,
    pub admin_cut_cents: i64,
    pub gym_cut_cents: i64,
}

/// The loaded cut-off chart.
#[derive(Debug, Clone, Default)]
pub struct CutoffChart {
    rules: Vec<CutoffRule>,
}

impl CutoffChart {
    pub fn new(rules: Vec<CutoffRule>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Find the rule for `amount_cents`.
    ///
    /// Overlapping ranges resolve to the rule with the highest minimum (the
    /// narrowest band for that price), ties to the lowest id.
    pub fn rule_for(&self, amount_cents: i64) -> Option<&CutoffRule> {
        self.rules
            .iter()
            .filter(|rule| rule.contains(amount_cents))
            .max_by(|a, b| {
                a.min_amount_cents
                    .cmp(&b.min_amount_cents)
                    .then_with(|| b.id.cmp(&a.id))
            })
    }

    /// Split `amount_cents`, flooring the admin cut.
    pub fn split(&self, amount_cents: i64) -> Option<RevenueSplit> {
        let rule = self.rule_for(amount_cents)?;
        let admin_cut_cents =
            (i128::from(amount_cents) * i128::from(rule.admin_share_bps) / i128::from(FULL_SHARE_BPS)) as i64;

        Some(RevenueSplit {
            rule_id: rule.id,
            admin_cut_cents,
            gym_cut_cents: amount_cents - admin_cut_cents,
        })
    }
}

/// A pending visit revenue row, as locked by the distribution run.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingRevenue {
    pub id: i64,
    pub gym_id: i64,
    pub booking_ref: String,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Request body for adding a cut-off rule.
///
/// # JSON Example
///
/// ```json
/// { "label": "Premium", "min_amount_cents": 50000, "max_amount_cents": null, "admin_share_bps": 1500 }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateCutoffRuleRequest {
    pub label: String,
    pub min_amount_cents: i64,
    pub max_amount_cents: Option<i64>,
    pub admin_share_bps: i32,
}

impl CreateCutoffRuleRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.label.trim().is_empty() {
            return Err("label must not be empty".to_string());
        }
        if self.min_amount_cents < 0 {
            return Err("min_amount_cents must not be negative".to_string());
        }
        if let Some(max) = self.max_amount_cents {
            if max < self.min_amount_cents {
                return Err("max_amount_cents must be >= min_amount_cents".to_string());
            }
        }
        if !(0..=FULL_SHARE_BPS).contains(&self.admin_share_bps) {
            return Err(format!("admin_share_bps must be between 0 and {FULL_SHARE_BPS}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: i64, min: i64, max: Option<i64>, bps: i32) -> CutoffRule {
        CutoffRule {
            id,
            label: format!("rule-{id}"),
            min_amount_cents: min,
            max_amount_cents: max,
            admin_share_bps: bps,
        }
    }

    fn chart() -> CutoffChart {
        CutoffChart::new(vec![
            rule(1, 0, Some(49_999), 2_000),
            rule(2, 50_000, Some(99_999), 1_500),
            rule(3, 100_000, None, 1_000),
        ])
    }

    #[test]
    fn picks_band_containing_amount() {
        let chart = chart();

        assert_eq!(chart.rule_for(10_000).map(|r| r.id), Some(1));
        assert_eq!(chart.rule_for(50_000).map(|r| r.id), Some(2));
        assert_eq!(chart.rule_for(99_999).map(|r| r.id), Some(2));
        assert_eq!(chart.rule_for(5_000_000).map(|r| r.id), Some(3));
    }

    #[test]
    fn admin_cut_is_floored_and_gym_gets_remainder() {
        let split = chart().split(33_333).unwrap();

        // 20% of 333.33 = 66.666 -> 66.66
        assert_eq!(split.admin_cut_cents, 6_666);
        assert_eq!(split.gym_cut_cents, 26_667);
        assert_eq!(split.admin_cut_cents + split.gym_cut_cents, 33_333);
    }

    #[test]
    fn overlapping_rules_prefer_highest_minimum() {
        let chart = CutoffChart::new(vec![rule(1, 0, None, 2_000), rule(2, 10_000, None, 500)]);

        assert_eq!(chart.split(20_000).unwrap().rule_id, 2);
        assert_eq!(chart.split(5_000).unwrap().rule_id, 1);
    }

    #[test]
    fn gap_in_chart_yields_no_split() {
        let chart = CutoffChart::new(vec![rule(1, 10_000, Some(20_000), 1_000)]);

        assert!(chart.split(5_000).is_none());
        assert!(CutoffChart::default().split(5_000).is_none());
    }

    #[test]
    fn full_and_zero_shares() {
        let everything = CutoffChart::new(vec![rule(1, 0, None, FULL_SHARE_BPS)]);
        let nothing = CutoffChart::new(vec![rule(1, 0, None, 0)]);

        assert_eq!(everything.split(12_345).unwrap().gym_cut_cents, 0);
        assert_eq!(nothing.split(12_345).unwrap().admin_cut_cents, 0);
    }

    #[test]
    fn create_request_validation() {
        let mut request = CreateCutoffRuleRequest {
            label: "Standard".to_string(),
            min_amount_cents: 0,
            max_amount_cents: Some(50_000),
            admin_share_bps: 2_000,
        };
        assert!(request.validate().is_ok());

        request.admin_share_bps = 10_001;
        assert!(request.validate().is_err());

        request.admin_share_bps = 2_000;
        request.max_amount_cents = Some(-1);
        assert!(request.validate().is_err());
    }
}
