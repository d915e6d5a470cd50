//! Campaign profitability: variable profit per month with OPEX deducted.
//!
//! Monthly revenue rows of the campaign forecast are summed per month and
//! joined with the OPEX month table over the union of their months, so a
//! month carrying only OPEX still shows up with zero revenue.

use plan_core::{Campaign, MonthLabel, Product};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::forecast::{forecast_campaign, CampaignForecast};
use crate::opex::{expand_opex_for_campaign, opex_month_table, OpexRow};

/// Revenue, variable cost and OPEX of one month, all products combined.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfitabilityMonth {
    pub month: MonthLabel,
    pub month_nice: String,
    pub qty: Decimal,
    pub gross_revenue: Decimal,
    pub effective_revenue: Decimal,
    pub variable_cost: Decimal,
    pub net_profit_variable: Decimal,
    pub opex_cost: Decimal,
    pub net_profit_after_opex: Decimal,
}

impl ProfitabilityMonth {
    fn empty(month: &MonthLabel) -> Self {
        ProfitabilityMonth {
            month: month.clone(),
            month_nice: month.nice(),
            qty: Decimal::ZERO,
            gross_revenue: Decimal::ZERO,
            effective_revenue: Decimal::ZERO,
            variable_cost: Decimal::ZERO,
            net_profit_variable: Decimal::ZERO,
            opex_cost: Decimal::ZERO,
            net_profit_after_opex: Decimal::ZERO,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfitabilityTotals {
    pub campaign_qty: Decimal,
    pub gross_revenue: Decimal,
    pub effective_revenue: Decimal,
    pub net_profit_variable: Decimal,
    pub total_opex: Decimal,
    pub net_profit_after_opex: Decimal,
}

/// OPEX charged to the campaign for one category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpexCategoryCost {
    pub category: String,
    pub cost: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignProfitability {
    /// Ascending by month label.
    pub monthly: Vec<ProfitabilityMonth>,
    pub totals: ProfitabilityTotals,
    /// Ascending by category name.
    pub opex_by_category: Vec<OpexCategoryCost>,
}

/// Join a built forecast with expanded OPEX rows.
pub fn merge_profitability(forecast: &CampaignForecast, opex_rows: &[OpexRow]) -> CampaignProfitability {
    let mut months: BTreeMap<MonthLabel, ProfitabilityMonth> = BTreeMap::new();
    for row in &forecast.monthly {
        let m = months
            .entry(row.month.clone())
            .or_insert_with(|| ProfitabilityMonth::empty(&row.month));
        m.qty = m.qty.saturating_add(row.qty);
        m.gross_revenue = m.gross_revenue.saturating_add(row.economics.gross_revenue);
        m.effective_revenue = m
            .effective_revenue
            .saturating_add(row.economics.effective_revenue);
        m.variable_cost = m.variable_cost.saturating_add(row.economics.total_cost);
        m.net_profit_variable = m
            .net_profit_variable
            .saturating_add(row.economics.net_profit);
    }
    for opex in opex_month_table(opex_rows) {
        let m = months
            .entry(opex.month.clone())
            .or_insert_with(|| ProfitabilityMonth::empty(&opex.month));
        m.opex_cost = opex.total_cost;
    }

    let mut totals = ProfitabilityTotals::default();
    let monthly: Vec<ProfitabilityMonth> = months
        .into_values()
        .map(|mut m| {
            m.net_profit_after_opex = m.net_profit_variable.saturating_sub(m.opex_cost);
            totals.campaign_qty = totals.campaign_qty.saturating_add(m.qty);
            totals.gross_revenue = totals.gross_revenue.saturating_add(m.gross_revenue);
            totals.effective_revenue = totals.effective_revenue.saturating_add(m.effective_revenue);
            totals.net_profit_variable = totals
                .net_profit_variable
                .saturating_add(m.net_profit_variable);
            totals.total_opex = totals.total_opex.saturating_add(m.opex_cost);
            totals.net_profit_after_opex = totals
                .net_profit_after_opex
                .saturating_add(m.net_profit_after_opex);
            m
        })
        .collect();

    let mut by_category: BTreeMap<&str, Decimal> = BTreeMap::new();
    for r in opex_rows {
        let cost = by_category.entry(r.category.as_str()).or_insert(Decimal::ZERO);
        *cost = cost.saturating_add(r.cost);
    }
    let opex_by_category = by_category
        .into_iter()
        .map(|(category, cost)| OpexCategoryCost {
            category: category.to_string(),
            cost,
        })
        .collect();

    CampaignProfitability {
        monthly,
        totals,
        opex_by_category,
    }
}

/// Monthly profitability of a stored campaign: its forecast (campaign
/// overrides applied) joined with its attached OPEX.
pub fn campaign_profitability(products: &[Product], campaign: &Campaign) -> CampaignProfitability {
    let forecast = forecast_campaign(products, campaign);
    let opex_rows = expand_opex_for_campaign(campaign.start_date, campaign.end_date, &campaign.opex);
    let out = merge_profitability(&forecast, &opex_rows);
    debug!(
        campaign = %campaign.id.0,
        months = out.monthly.len(),
        categories = out.opex_by_category.len(),
        "campaign profitability built"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use plan_core::{OpexId, OpexItem, ProductId};

    fn tee() -> Product {
        Product {
            id: ProductId::from("P"),
            name: "Tee".into(),
            category: "Apparel".into(),
            price: Decimal::new(100, 0),
            discount_rate: Decimal::new(1, 1),
            return_rate: Decimal::new(5, 2),
            manufacturing_cost: Decimal::new(40, 0),
            packaging_cost: Decimal::new(5, 0),
            shipping_cost: Decimal::ZERO,
            marketing_cost: Decimal::ZERO,
            cost_override_total: None,
        }
    }

    fn opex(id: &str, category: &str, cost: i64, start: &str, once: bool) -> OpexItem {
        OpexItem {
            id: OpexId::from(id),
            name: id.to_uppercase(),
            category: category.into(),
            cost: Decimal::new(cost, 0),
            start_month: Some(MonthLabel::from(start)),
            end_month: None,
            is_one_time: once,
            notes: String::new(),
        }
    }

    fn campaign() -> Campaign {
        let mut c = Campaign {
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 2, 28),
            ..Campaign::default()
        };
        c.quantities.insert(ProductId::from("P"), Decimal::new(1000, 0));
        c
    }

    #[test]
    fn months_carry_revenue_and_opex() {
        let mut c = campaign();
        c.opex = vec![
            opex("rent", "Office", 1000, "2026-01", false),
            opex("launch", "Marketing", 500, "2026-02", true),
        ];
        let p = campaign_profitability(&[tee()], &c);

        assert_eq!(p.monthly.len(), 2);
        let jan = &p.monthly[0];
        assert_eq!(jan.month_nice, "Jan 2026");
        assert_eq!(jan.qty, Decimal::new(500, 0));
        assert_eq!(jan.effective_revenue, Decimal::new(42_750, 0));
        assert_eq!(jan.variable_cost, Decimal::new(22_500, 0));
        assert_eq!(jan.net_profit_variable, Decimal::new(20_250, 0));
        assert_eq!(jan.opex_cost, Decimal::new(1000, 0));
        assert_eq!(jan.net_profit_after_opex, Decimal::new(19_250, 0));
        assert_eq!(p.monthly[1].opex_cost, Decimal::new(1500, 0));

        let t = p.totals;
        assert_eq!(t.campaign_qty, Decimal::new(1000, 0));
        assert_eq!(t.gross_revenue, Decimal::new(100_000, 0));
        assert_eq!(t.net_profit_variable, Decimal::new(40_500, 0));
        assert_eq!(t.total_opex, Decimal::new(2500, 0));
        assert_eq!(t.net_profit_after_opex, Decimal::new(38_000, 0));

        let categories: Vec<(&str, Decimal)> = p
            .opex_by_category
            .iter()
            .map(|c| (c.category.as_str(), c.cost))
            .collect();
        assert_eq!(
            categories,
            [("Marketing", Decimal::new(500, 0)), ("Office", Decimal::new(2000, 0))]
        );
    }

    #[test]
    fn opex_only_month_is_kept() {
        let mut c = campaign();
        c.quantities.clear();
        c.opex = vec![opex("tools", "Software", 30, "2026-02", false)];
        let p = campaign_profitability(&[tee()], &c);

        assert_eq!(p.monthly.len(), 1);
        let feb = &p.monthly[0];
        assert_eq!(feb.month, MonthLabel::from("2026-02"));
        assert_eq!(feb.qty, Decimal::ZERO);
        assert_eq!(feb.net_profit_after_opex, Decimal::new(-30, 0));
        assert_eq!(p.totals.net_profit_after_opex, Decimal::new(-30, 0));
    }

    #[test]
    fn no_opex_means_variable_profit_only() {
        let p = campaign_profitability(&[tee()], &campaign());
        assert!(p.opex_by_category.is_empty());
        assert_eq!(p.totals.total_opex, Decimal::ZERO);
        assert_eq!(p.totals.net_profit_after_opex, p.totals.net_profit_variable);
        let v = serde_json::to_value(&p).unwrap();
        assert!(v["monthly"][0].get("net_profit_after_opex").is_some());
    }
}
