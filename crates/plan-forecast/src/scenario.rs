//! What-if scenarios layered on top of a base campaign.
//!
//! A scenario shadows product prices, rates, unit costs and quantities,
//! may switch the distribution mode, and replaces OPEX costs. The campaign
//! forecast builder is then re-run on the adjusted inputs and OPEX is
//! totalled over the campaign's months.

use plan_core::months::month_range_opt;
use plan_core::{
    Campaign, DistributionMode, MonthLabel, OpexItem, Product, ProductId, ScenarioOpexOverride,
    ScenarioOverrides, ScenarioProductOverride,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::forecast::{
    apply_campaign_overrides, build_campaign_forecast, ForecastInputs, MonthlyRow, ProductSummary,
};

/// Scenario totals, with OPEX deducted from the variable profit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioTotals {
    pub campaign_qty: Decimal,
    pub gross_revenue: Decimal,
    pub effective_revenue: Decimal,
    pub total_cost: Decimal,
    /// Net profit before OPEX.
    pub net_profit_variable: Decimal,
    pub opex_total: Decimal,
    pub net_profit_after_opex: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioForecast {
    pub monthly: Vec<MonthlyRow>,
    pub product_summary: Vec<ProductSummary>,
    pub totals: ScenarioTotals,
}

fn override_index(overrides: &[ScenarioProductOverride]) -> BTreeMap<&ProductId, &ScenarioProductOverride> {
    // later records replace earlier ones for the same product
    overrides.iter().map(|o| (&o.product_id, o)).collect()
}

/// Products with scenario price, rate and cost overrides applied.
///
/// Discount and return overrides are percentage points. A product with an
/// override record but no `cost_override` goes back to its component sum.
pub fn apply_product_overrides(
    products: &[Product],
    overrides: &[ScenarioProductOverride],
) -> Vec<Product> {
    let index = override_index(overrides);
    products
        .iter()
        .map(|p| {
            let mut out = p.clone();
            if let Some(ov) = index.get(&p.id) {
                out.price = ov.price_override.unwrap_or(p.price);
                out.discount_rate = ov
                    .discount_override
                    .map(|pct| pct / Decimal::ONE_HUNDRED)
                    .unwrap_or(p.discount_rate);
                out.return_rate = ov
                    .return_rate_override
                    .map(|pct| pct / Decimal::ONE_HUNDRED)
                    .unwrap_or(p.return_rate);
                out.cost_override_total = ov.cost_override;
            }
            out
        })
        .collect()
}

/// Base quantities with every `qty_override` replacing its product's total.
pub fn apply_quantity_overrides(
    base: &BTreeMap<ProductId, Decimal>,
    overrides: &[ScenarioProductOverride],
) -> BTreeMap<ProductId, Decimal> {
    let mut out = base.clone();
    for ov in overrides {
        if let Some(q) = ov.qty_override {
            out.insert(ov.product_id.clone(), q);
        }
    }
    out
}

/// OPEX items with scenario cost overrides applied.
pub fn apply_opex_overrides(items: &[OpexItem], overrides: &[ScenarioOpexOverride]) -> Vec<OpexItem> {
    let index: BTreeMap<_, _> = overrides
        .iter()
        .filter_map(|o| o.cost_override.map(|c| (&o.opex_item_id, c)))
        .collect();
    items
        .iter()
        .map(|item| {
            let mut out = item.clone();
            if let Some(cost) = index.get(&item.id) {
                out.cost = *cost;
            }
            out
        })
        .collect()
}

/// Total OPEX charged over `months`.
///
/// One-time items count once when their start month is one of `months`.
/// Recurring items count for every month between their start month and
/// their end month, or the last of `months` when they have none.
pub fn opex_total_over_months(months: &[MonthLabel], items: &[OpexItem]) -> Decimal {
    let Some(last) = months.last() else {
        return Decimal::ZERO;
    };
    let mut total = Decimal::ZERO;
    for item in items {
        let Some(start) = &item.start_month else {
            continue;
        };
        if item.is_one_time {
            if months.contains(start) {
                total = total.saturating_add(item.cost);
            }
            continue;
        }
        let end = item.end_month.as_ref().unwrap_or(last);
        let active = months.iter().filter(|m| *m >= start && *m <= end).count();
        total = total.saturating_add(item.cost.saturating_mul(Decimal::from(active)));
    }
    total
}

/// Forecast `campaign` with `overrides` layered on top.
///
/// The campaign's own product overrides are applied first, then the
/// scenario's. With empty scenario overrides the totals equal those of
/// [`crate::forecast::forecast_campaign`], with OPEX deducted.
pub fn build_scenario_forecast(
    products: &[Product],
    campaign: &Campaign,
    overrides: &ScenarioOverrides,
) -> ScenarioForecast {
    let months = month_range_opt(campaign.start_date, campaign.end_date);

    let campaign_products = apply_campaign_overrides(products, &campaign.product_overrides);
    let scenario_products = apply_product_overrides(&campaign_products, &overrides.products);
    let quantities = apply_quantity_overrides(&campaign.quantities, &overrides.products);

    let mode = overrides
        .distribution_mode
        .unwrap_or(campaign.distribution_mode);
    let (month_weights, product_month_weights) = match mode {
        DistributionMode::Custom => (
            Some(
                overrides
                    .custom_weights
                    .as_ref()
                    .unwrap_or(&campaign.month_weights),
            ),
            Some(&campaign.product_month_weights),
        ),
        _ => (None, None),
    };

    let forecast = build_campaign_forecast(&ForecastInputs {
        products: &scenario_products,
        quantities: &quantities,
        start_date: campaign.start_date,
        end_date: campaign.end_date,
        distribution_mode: mode,
        month_weights,
        product_month_weights,
        size_breakdown: Some(&campaign.size_breakdown),
    });

    let opex = apply_opex_overrides(&campaign.opex, &overrides.opex);
    let opex_total = opex_total_over_months(&months, &opex);

    let t = forecast.totals;
    let totals = ScenarioTotals {
        campaign_qty: t.campaign_qty,
        gross_revenue: t.economics.gross_revenue,
        effective_revenue: t.economics.effective_revenue,
        total_cost: t.economics.total_cost,
        net_profit_variable: t.economics.net_profit,
        opex_total,
        net_profit_after_opex: t.economics.net_profit.saturating_sub(opex_total),
    };

    debug!(
        campaign = %campaign.id.0,
        mode = %mode,
        product_overrides = overrides.products.len(),
        opex_overrides = overrides.opex.len(),
        "scenario forecast built"
    );

    ScenarioForecast {
        monthly: forecast.monthly,
        product_summary: forecast.product_summary,
        totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::forecast_campaign;
    use chrono::NaiveDate;
    use plan_core::{CampaignProductOverride, OpexId};
    use proptest::prelude::*;

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

    fn mug() -> Product {
        Product {
            id: ProductId::from("M"),
            name: "Mug".into(),
            category: "Home".into(),
            price: Decimal::new(20, 0),
            discount_rate: Decimal::ZERO,
            return_rate: Decimal::ZERO,
            manufacturing_cost: Decimal::new(8, 0),
            packaging_cost: Decimal::new(1, 0),
            shipping_cost: Decimal::new(2, 0),
            marketing_cost: Decimal::new(1, 0),
            cost_override_total: None,
        }
    }

    fn rent(cost: i64, once: bool) -> OpexItem {
        OpexItem {
            id: OpexId::from("rent"),
            name: "Rent".into(),
            category: "Office".into(),
            cost: Decimal::new(cost, 0),
            start_month: Some(MonthLabel::from("2026-01")),
            end_month: None,
            is_one_time: once,
            notes: String::new(),
        }
    }

    fn campaign(tee_qty: i64, mug_qty: i64) -> Campaign {
        let mut c = Campaign {
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 2, 28),
            ..Campaign::default()
        };
        c.quantities.insert(ProductId::from("P"), Decimal::new(tee_qty, 0));
        c.quantities.insert(ProductId::from("M"), Decimal::new(mug_qty, 0));
        c
    }

    fn product_override(id: &str) -> ScenarioProductOverride {
        ScenarioProductOverride {
            product_id: ProductId::from(id),
            price_override: None,
            discount_override: None,
            return_rate_override: None,
            cost_override: None,
            qty_override: None,
        }
    }

    #[test]
    fn no_overrides_matches_campaign_forecast() {
        let mut c = campaign(1000, 0);
        c.opex.push(rent(1000, false));
        let s = build_scenario_forecast(&[tee()], &c, &ScenarioOverrides::default());
        assert_eq!(s.totals.effective_revenue, Decimal::new(85_500, 0));
        assert_eq!(s.totals.net_profit_variable, Decimal::new(40_500, 0));
        assert_eq!(s.totals.opex_total, Decimal::new(2000, 0));
        assert_eq!(s.totals.net_profit_after_opex, Decimal::new(38_500, 0));
        assert_eq!(s.monthly, forecast_campaign(&[tee()], &c).monthly);
    }

    #[test]
    fn percentage_overrides_become_rates() {
        let ov = ScenarioProductOverride {
            price_override: Some(Decimal::new(120, 0)),
            discount_override: Some(Decimal::new(20, 0)),
            return_rate_override: Some(Decimal::ZERO),
            ..product_override("P")
        };
        let out = apply_product_overrides(&[tee(), mug()], &[ov]);
        assert_eq!(out[0].price, Decimal::new(120, 0));
        assert_eq!(out[0].discount_rate, Decimal::new(2, 1));
        assert_eq!(out[0].return_rate, Decimal::ZERO);
        assert_eq!(out[1], mug());
    }

    #[test]
    fn last_product_override_wins() {
        let first = ScenarioProductOverride {
            price_override: Some(Decimal::new(50, 0)),
            ..product_override("P")
        };
        let second = ScenarioProductOverride {
            price_override: Some(Decimal::new(70, 0)),
            qty_override: Some(Decimal::new(3, 0)),
            ..product_override("P")
        };
        let overrides = [first, second];
        let out = apply_product_overrides(&[tee()], &overrides);
        assert_eq!(out[0].price, Decimal::new(70, 0));
        let q = apply_quantity_overrides(&campaign(10, 5).quantities, &overrides);
        assert_eq!(q[&ProductId::from("P")], Decimal::new(3, 0));
        assert_eq!(q[&ProductId::from("M")], Decimal::new(5, 0));
    }

    #[test]
    fn cost_override_replaces_unit_cost() {
        let c = campaign(100, 0);
        let overrides = ScenarioOverrides {
            products: vec![ScenarioProductOverride {
                cost_override: Some(Decimal::new(60, 0)),
                qty_override: Some(Decimal::new(200, 0)),
                ..product_override("P")
            }],
            ..ScenarioOverrides::default()
        };
        let s = build_scenario_forecast(&[tee()], &c, &overrides);
        assert_eq!(s.totals.campaign_qty, Decimal::new(200, 0));
        assert_eq!(s.totals.total_cost, Decimal::new(12_000, 0));
        assert_eq!(s.totals.net_profit_variable, Decimal::new(5100, 0));
    }

    #[test]
    fn override_without_cost_clears_stored_unit_cost() {
        let mut fixed = tee();
        fixed.cost_override_total = Some(Decimal::new(30, 0));
        let c = campaign(100, 0);

        let base = forecast_campaign(&[fixed.clone()], &c);
        assert_eq!(base.totals.economics.total_cost, Decimal::new(3000, 0));

        let ov = ScenarioProductOverride {
            price_override: Some(Decimal::new(110, 0)),
            ..product_override("P")
        };
        let out = apply_product_overrides(&[fixed.clone()], &[ov.clone()]);
        assert_eq!(out[0].cost_override_total, None);

        let overrides = ScenarioOverrides {
            products: vec![ov],
            ..ScenarioOverrides::default()
        };
        let s = build_scenario_forecast(&[fixed], &c, &overrides);
        // components: 40 manufacturing + 5 packaging
        assert_eq!(s.totals.total_cost, Decimal::new(4500, 0));
        assert_eq!(s.totals.gross_revenue, Decimal::new(11_000, 0));
    }

    #[test]
    fn scenario_layers_over_campaign_overrides() {
        let mut c = campaign(100, 0);
        c.product_overrides.insert(
            ProductId::from("P"),
            CampaignProductOverride {
                packaging_cost: Some(Decimal::new(15, 0)),
                ..CampaignProductOverride::default()
            },
        );
        let overrides = ScenarioOverrides {
            products: vec![ScenarioProductOverride {
                price_override: Some(Decimal::new(200, 0)),
                ..product_override("P")
            }],
            ..ScenarioOverrides::default()
        };
        let s = build_scenario_forecast(&[tee()], &c, &overrides);
        assert_eq!(s.totals.total_cost, Decimal::new(5500, 0));
        assert_eq!(s.totals.gross_revenue, Decimal::new(20_000, 0));
    }

    #[test]
    fn mode_override_and_custom_weights() {
        let c = campaign(100, 0);
        let weights: plan_core::MonthWeights = [("2026-01", 0), ("2026-02", 1)]
            .into_iter()
            .map(|(m, w)| (MonthLabel::from(m), Decimal::new(w, 0)))
            .collect();
        let overrides = ScenarioOverrides {
            distribution_mode: Some(DistributionMode::Custom),
            custom_weights: Some(weights),
            ..ScenarioOverrides::default()
        };
        let s = build_scenario_forecast(&[tee()], &c, &overrides);
        assert_eq!(s.monthly.len(), 1);
        assert_eq!(s.monthly[0].month, MonthLabel::from("2026-02"));

        let front = ScenarioOverrides {
            distribution_mode: Some(DistributionMode::FrontLoaded),
            ..ScenarioOverrides::default()
        };
        let s = build_scenario_forecast(&[tee()], &c, &front);
        assert!(s.monthly[0].qty > s.monthly[1].qty);
    }

    #[test]
    fn opex_overrides_and_windows() {
        let mut launch = rent(500, true);
        launch.id = OpexId::from("launch");
        launch.start_month = Some(MonthLabel::from("2026-02"));
        let mut old = rent(50, true);
        old.id = OpexId::from("old");
        old.start_month = Some(MonthLabel::from("2025-12"));
        let items = [rent(1000, false), launch, old];

        let overrides = [
            ScenarioOpexOverride {
                opex_item_id: OpexId::from("rent"),
                cost_override: Some(Decimal::new(800, 0)),
            },
            ScenarioOpexOverride {
                opex_item_id: OpexId::from("launch"),
                cost_override: None,
            },
        ];
        let adjusted = apply_opex_overrides(&items, &overrides);
        assert_eq!(adjusted[0].cost, Decimal::new(800, 0));
        assert_eq!(adjusted[1].cost, Decimal::new(500, 0));

        let months = [MonthLabel::from("2026-01"), MonthLabel::from("2026-02")];
        assert_eq!(opex_total_over_months(&months, &adjusted), Decimal::new(2100, 0));
        assert_eq!(opex_total_over_months(&[], &adjusted), Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn empty_overrides_are_identity(a in 0i64..50_000, b in 0i64..50_000, mode in 0usize..3) {
            let mut c = campaign(a, b);
            c.distribution_mode = [
                DistributionMode::Uniform,
                DistributionMode::FrontLoaded,
                DistributionMode::BackLoaded,
            ][mode];
            let products = [tee(), mug()];
            let base = forecast_campaign(&products, &c).totals;
            let s = build_scenario_forecast(&products, &c, &ScenarioOverrides::default()).totals;
            prop_assert_eq!(s.campaign_qty, base.campaign_qty);
            prop_assert_eq!(s.effective_revenue, base.economics.effective_revenue);
            prop_assert_eq!(s.total_cost, base.economics.total_cost);
            prop_assert_eq!(s.net_profit_variable, base.economics.net_profit);
            prop_assert_eq!(s.opex_total, Decimal::ZERO);
        }
    }
}
