//! OPEX expansion across a campaign's months and per-month totals.

use chrono::NaiveDate;
use plan_core::months::month_range_opt;
use plan_core::{Campaign, MonthLabel, OpexId, OpexItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// End month assumed for open-ended items.
const OPEN_END: &str = "9999-12";

/// One OPEX item charged in one month.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpexRow {
    pub month: MonthLabel,
    pub month_nice: String,
    pub opex_id: OpexId,
    pub name: String,
    pub category: String,
    pub cost: Decimal,
    pub is_one_time: bool,
    pub notes: String,
}

/// OPEX charged in one month, all items combined.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpexMonth {
    pub month: MonthLabel,
    pub month_nice: String,
    pub total_cost: Decimal,
}

/// Per-month OPEX table of a campaign plus its grand total.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignOpex {
    pub months: Vec<OpexMonth>,
    pub total: Decimal,
}

/// Whether `item` is charged in `month`.
///
/// Recurring items are charged for every month in `start..=end`; one-time
/// items only in their start month.
fn charged_in(item: &OpexItem, start: &MonthLabel, end: &MonthLabel, month: &MonthLabel) -> bool {
    if month < start || month > end {
        return false;
    }
    !item.is_one_time || month == start
}

/// Expand OPEX items into one row per charged campaign month.
///
/// Rows are ordered by item, then by month. Items without a start month are
/// skipped; items without an end month run to the end of the campaign.
pub fn expand_opex_for_campaign(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    items: &[OpexItem],
) -> Vec<OpexRow> {
    let months = month_range_opt(start, end);
    if months.is_empty() {
        return Vec::new();
    }
    let open_end = MonthLabel::from(OPEN_END);

    let mut rows = Vec::new();
    for item in items {
        let Some(first) = &item.start_month else {
            continue;
        };
        let last = item.end_month.as_ref().unwrap_or(&open_end);
        for m in months.iter().filter(|m| charged_in(item, first, last, m)) {
            rows.push(OpexRow {
                month: m.clone(),
                month_nice: m.nice(),
                opex_id: item.id.clone(),
                name: item.name.clone(),
                category: item.category.clone(),
                cost: item.cost,
                is_one_time: item.is_one_time,
                notes: item.notes.clone(),
            });
        }
    }
    rows
}

/// Sum expanded rows per month, ascending by month label.
pub fn opex_month_table(rows: &[OpexRow]) -> Vec<OpexMonth> {
    let mut by_month: BTreeMap<&MonthLabel, Decimal> = BTreeMap::new();
    for r in rows {
        let total = by_month.entry(&r.month).or_insert(Decimal::ZERO);
        *total = total.saturating_add(r.cost);
    }
    by_month
        .into_iter()
        .map(|(month, total_cost)| OpexMonth {
            month: month.clone(),
            month_nice: month.nice(),
            total_cost,
        })
        .collect()
}

/// Month table and total for the OPEX attached to `campaign`.
pub fn campaign_opex(campaign: &Campaign) -> CampaignOpex {
    let rows = expand_opex_for_campaign(campaign.start_date, campaign.end_date, &campaign.opex);
    let months = opex_month_table(&rows);
    let total = months
        .iter()
        .fold(Decimal::ZERO, |acc, m| acc.saturating_add(m.total_cost));
    CampaignOpex { months, total }
}
