//! Calendar month labels, inclusive month ranges and distribution weights.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::DistributionMode;

const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A `YYYY-MM` month label.
///
/// Labels are compared as strings; for well-formed labels lexicographic
/// order is chronological order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthLabel(pub String);

/// Weight per month label.
pub type MonthWeights = BTreeMap<MonthLabel, Decimal>;

impl MonthLabel {
    /// Zero-padded label for the given year and month.
    pub fn new(year: i32, month: u32) -> Self {
        MonthLabel(format!("{year:04}-{month:02}"))
    }

    /// Label of the month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Year and month when the label is `YYYY-MM` with a month in 1..=12.
    pub fn parts(&self) -> Option<(i32, u32)> {
        let (y, m) = self.0.split_once('-')?;
        if y.len() != 4 || m.len() != 2 {
            return None;
        }
        if !y.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year: i32 = y.parse().ok()?;
        let month: u32 = m.parse().ok()?;
        if year == 0 || !(1..=12).contains(&month) {
            return None;
        }
        Some((year, month))
    }

    pub fn is_valid(&self) -> bool {
        self.parts().is_some()
    }

    /// Display form `"MMM YYYY"`, e.g. `"Jan 2026"`. Malformed labels are
    /// returned unchanged.
    pub fn nice(&self) -> String {
        match self.parts() {
            Some((year, month)) => format!("{} {}", MONTH_ABBR[(month - 1) as usize], year),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for MonthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MonthLabel {
    fn from(s: &str) -> Self {
        MonthLabel(s.to_string())
    }
}

/// Convenience wrapper around [`MonthLabel::nice`] for raw strings.
pub fn month_label_to_nice(label: &str) -> String {
    MonthLabel::from(label).nice()
}

/// Parse a calendar date leniently.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY-MM` (first of month) and
/// timestamps starting with `YYYY-MM-DD` followed by `T` or a space.
/// Returns `None` for anything else.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let date_part = match s.get(10..11) {
        Some("T") | Some(" ") => s.get(..10)?,
        _ => s,
    };
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%Y/%m/%d"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{date_part}-01"), "%Y-%m-%d"))
        .ok()
}

/// Every calendar month from the earlier date's month through the later
/// date's month, inclusive. Argument order does not matter.
pub fn month_range(start: NaiveDate, end: NaiveDate) -> Vec<MonthLabel> {
    let (from, to) = if start <= end { (start, end) } else { (end, start) };
    let last = (to.year(), to.month());
    let (mut year, mut month) = (from.year(), from.month());
    let mut months = Vec::new();
    while (year, month) <= last {
        months.push(MonthLabel::new(year, month));
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
    months
}

/// [`month_range`] over optional dates; empty when either is missing.
pub fn month_range_opt(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<MonthLabel> {
    match (start, end) {
        (Some(s), Some(e)) => month_range(s, e),
        _ => Vec::new(),
    }
}

/// [`month_range`] over raw date strings; empty when either fails to parse.
pub fn month_range_str(start: &str, end: &str) -> Vec<MonthLabel> {
    month_range_opt(parse_date(start), parse_date(end))
}

/// Normalised per-month weights for a distribution mode.
///
/// The returned weights sum to one. Custom weights are clamped at zero;
/// missing custom weights, or custom weights that are all zero, fall back
/// to a uniform split.
pub fn build_distribution_weights(
    months: &[MonthLabel],
    mode: DistributionMode,
    custom: Option<&MonthWeights>,
) -> MonthWeights {
    let n = months.len();
    if n == 0 {
        return MonthWeights::new();
    }
    let uniform = || vec![Decimal::ONE; n];
    let raw: Vec<Decimal> = match mode {
        DistributionMode::Uniform => uniform(),
        DistributionMode::FrontLoaded => (0..n).map(|i| Decimal::from(n - i)).collect(),
        DistributionMode::BackLoaded => (1..=n).map(Decimal::from).collect(),
        DistributionMode::Custom => match custom {
            None => uniform(),
            Some(weights) => {
                let w: Vec<Decimal> = months
                    .iter()
                    .map(|m| {
                        weights
                            .get(m)
                            .copied()
                            .unwrap_or(Decimal::ZERO)
                            .max(Decimal::ZERO)
                    })
                    .collect();
                if w.iter().all(|v| v.is_zero()) {
                    uniform()
                } else {
                    w
                }
            }
        },
    };
    let total = raw
        .iter()
        .fold(Decimal::ZERO, |acc, w| acc.saturating_add(*w));
    months
        .iter()
        .cloned()
        .zip(raw)
        .map(|(m, w)| (m, w / total))
        .collect()
}

/// Spread `total` across months proportionally to `weights`. No rounding.
pub fn distribute_quantity(total: Decimal, weights: &MonthWeights) -> MonthWeights {
    weights
        .iter()
        .map(|(m, w)| (m.clone(), total * *w))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn labels(v: &[&str]) -> Vec<MonthLabel> {
        v.iter().map(|s| MonthLabel::from(*s)).collect()
    }

    #[test]
    fn range_spans_year_boundary() {
        let months = month_range(d(2025, 11, 20), d(2026, 2, 3));
        assert_eq!(months, labels(&["2025-11", "2025-12", "2026-01", "2026-02"]));
    }

    #[test]
    fn range_single_month() {
        assert_eq!(month_range(d(2026, 3, 1), d(2026, 3, 31)), labels(&["2026-03"]));
    }

    #[test]
    fn range_from_bad_strings_is_empty() {
        assert!(month_range_str("not a date", "2026-03-01").is_empty());
        assert!(month_range_str("2026-01-01", "").is_empty());
        assert_eq!(month_range_str("2026-01-15T00:00:00Z", "2026-02").len(), 2);
    }

    #[test]
    fn nice_labels() {
        assert_eq!(month_label_to_nice("2026-01"), "Jan 2026");
        assert_eq!(month_label_to_nice("2026-12"), "Dec 2026");
        assert_eq!(month_label_to_nice("garbage"), "garbage");
        assert_eq!(month_label_to_nice("2026-13"), "2026-13");
    }

    #[test]
    fn front_loaded_weights() {
        let months = labels(&["2026-01", "2026-02", "2026-03"]);
        let w = build_distribution_weights(&months, DistributionMode::FrontLoaded, None);
        assert_eq!(w[&months[0]], Decimal::new(3, 0) / Decimal::new(6, 0));
        assert_eq!(w[&months[2]], Decimal::ONE / Decimal::new(6, 0));
    }

    #[test]
    fn custom_weights_clamp_and_fallback() {
        let months = labels(&["2026-01", "2026-02"]);
        let mut custom = MonthWeights::new();
        custom.insert(months[0].clone(), Decimal::new(-5, 0));
        custom.insert(months[1].clone(), Decimal::new(3, 0));
        let w = build_distribution_weights(&months, DistributionMode::Custom, Some(&custom));
        assert_eq!(w[&months[0]], Decimal::ZERO);
        assert_eq!(w[&months[1]], Decimal::ONE);

        let zeros: MonthWeights = months.iter().map(|m| (m.clone(), Decimal::ZERO)).collect();
        let w = build_distribution_weights(&months, DistributionMode::Custom, Some(&zeros));
        assert_eq!(w[&months[0]], Decimal::new(5, 1));

        let w = build_distribution_weights(&months, DistributionMode::Custom, None);
        assert_eq!(w[&months[1]], Decimal::new(5, 1));
    }

    #[test]
    fn empty_months_give_empty_weights() {
        assert!(build_distribution_weights(&[], DistributionMode::BackLoaded, None).is_empty());
    }

    #[test]
    fn distribute_has_no_rounding() {
        let months = labels(&["2026-01", "2026-02", "2026-03"]);
        let w = build_distribution_weights(&months, DistributionMode::Uniform, None);
        let q = distribute_quantity(Decimal::new(10, 0), &w);
        assert!(q[&months[0]] > Decimal::new(333, 2));
        assert!(q[&months[0]] < Decimal::new(334, 2));
    }

    fn date_strategy() -> impl Strategy<Value = NaiveDate> {
        (1990i32..2100, 1u32..=12, 1u32..=28).prop_map(|(y, m, day)| d(y, m, day))
    }

    fn mode_strategy() -> impl Strategy<Value = DistributionMode> {
        prop_oneof![
            Just(DistributionMode::Uniform),
            Just(DistributionMode::FrontLoaded),
            Just(DistributionMode::BackLoaded),
            Just(DistributionMode::Custom),
        ]
    }

    proptest! {
        #[test]
        fn range_is_order_independent(a in date_strategy(), b in date_strategy()) {
            let ab = month_range(a, b);
            prop_assert_eq!(&ab, &month_range(b, a));
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let expected = (hi.year() - lo.year()) * 12 + hi.month() as i32 - lo.month() as i32 + 1;
            prop_assert_eq!(ab.len() as i32, expected);
        }

        #[test]
        fn weights_sum_to_one(n in 1usize..60, mode in mode_strategy(), raw in proptest::collection::vec(0u32..100, 60)) {
            let months = month_range(d(2020, 1, 1), d(2020 + (n as i32 - 1) / 12, ((n as u32 - 1) % 12) + 1, 1));
            let custom: MonthWeights = months.iter().cloned().zip(raw.into_iter().map(Decimal::from)).collect();
            let w = build_distribution_weights(&months, mode, Some(&custom));
            let sum: Decimal = w.values().sum();
            prop_assert!((sum - Decimal::ONE).abs() < Decimal::new(1, 20));
        }

        #[test]
        fn front_and_back_are_mirrors(n in 1usize..48) {
            let months: Vec<MonthLabel> = (0..n).map(|i| MonthLabel::new(2024 + (i / 12) as i32, (i % 12) as u32 + 1)).collect();
            let front = build_distribution_weights(&months, DistributionMode::FrontLoaded, None);
            let back = build_distribution_weights(&months, DistributionMode::BackLoaded, None);
            let f: Vec<Decimal> = months.iter().map(|m| front[m]).collect();
            let mut b: Vec<Decimal> = months.iter().map(|m| back[m]).collect();
            b.reverse();
            prop_assert_eq!(f, b);
        }
    }
}
