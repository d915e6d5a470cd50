//! Campaign forecast builder: monthly lines, product summaries, size rows
//! and campaign totals.

use chrono::NaiveDate;
use plan_core::months::{build_distribution_weights, distribute_quantity, month_range_opt};
use plan_core::{
    Campaign, CampaignProductOverride, DistributionMode, MonthLabel, MonthWeights, Product,
    ProductId, SizeQuantities,
};
use plan_econ::{effective_price, gross_margin_pct, line_economics, net_margin_pct, LineEconomics};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One product in one month.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRow {
    pub month: MonthLabel,
    pub month_nice: String,
    pub product_id: ProductId,
    pub product_name: String,
    pub category: String,
    /// Units sold in the month; may be fractional.
    pub qty: Decimal,
    pub price: Decimal,
    pub effective_price: Decimal,
    #[serde(flatten)]
    pub economics: LineEconomics,
}

/// One product over the whole campaign.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product_id: ProductId,
    pub product_name: String,
    pub category: String,
    pub campaign_qty: Decimal,
    #[serde(flatten)]
    pub economics: LineEconomics,
    #[serde(rename = "gross_margin_%")]
    pub gross_margin_pct: Decimal,
    #[serde(rename = "net_margin_%")]
    pub net_margin_pct: Decimal,
}

/// A product's campaign economics allocated to one size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeRow {
    pub product_id: ProductId,
    pub product_name: String,
    pub size: String,
    pub qty: Decimal,
    #[serde(flatten)]
    pub economics: LineEconomics,
}

/// Sums over every monthly row of a campaign.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignTotals {
    pub campaign_qty: Decimal,
    #[serde(flatten)]
    pub economics: LineEconomics,
}

/// Full output of [`build_campaign_forecast`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignForecast {
    pub monthly: Vec<MonthlyRow>,
    pub product_summary: Vec<ProductSummary>,
    pub size_breakdown: Vec<SizeRow>,
    pub totals: CampaignTotals,
}

/// Inputs of the campaign forecast builder.
#[derive(Clone, Copy, Debug)]
pub struct ForecastInputs<'a> {
    pub products: &'a [Product],
    /// Total units per product over the campaign.
    pub quantities: &'a BTreeMap<ProductId, Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub distribution_mode: DistributionMode,
    /// Campaign-level custom weights, consulted in `Custom` mode only.
    pub month_weights: Option<&'a MonthWeights>,
    /// Per-product custom weights, consulted in `Custom` mode only.
    pub product_month_weights: Option<&'a BTreeMap<ProductId, MonthWeights>>,
    pub size_breakdown: Option<&'a BTreeMap<ProductId, SizeQuantities>>,
}

struct SummaryAcc<'a> {
    product: &'a Product,
    qty: Decimal,
    economics: LineEconomics,
}

/// Turn quantities, a date range and a distribution policy into monthly
/// lines, product summaries, size rows and totals.
///
/// Products with a non-positive quantity or missing from the catalog are
/// left out entirely. Size rows are only produced for products that have
/// a summary.
pub fn build_campaign_forecast(input: &ForecastInputs<'_>) -> CampaignForecast {
    let months = month_range_opt(input.start_date, input.end_date);
    let base_weights =
        build_distribution_weights(&months, input.distribution_mode, input.month_weights);

    let catalog: BTreeMap<&ProductId, &Product> =
        input.products.iter().map(|p| (&p.id, p)).collect();

    let mut monthly = Vec::new();
    let mut summaries: BTreeMap<&ProductId, SummaryAcc<'_>> = BTreeMap::new();
    let mut totals = CampaignTotals::default();
    for (pid, total_qty) in input.quantities {
        let Some(product) = catalog.get(pid).copied() else {
            continue;
        };
        if *total_qty <= Decimal::ZERO {
            continue;
        }

        let own_weights = match input.distribution_mode {
            DistributionMode::Custom => input
                .product_month_weights
                .and_then(|per_product| per_product.get(pid))
                .map(|w| build_distribution_weights(&months, DistributionMode::Custom, Some(w))),
            _ => None,
        };
        let weights = own_weights.as_ref().unwrap_or(&base_weights);

        let price_eff = effective_price(product);
        for (month, qty) in distribute_quantity(*total_qty, weights) {
            if qty <= Decimal::ZERO {
                continue;
            }
            let economics = line_economics(product, qty);
            let acc = summaries.entry(&product.id).or_insert_with(|| SummaryAcc {
                product,
                qty: Decimal::ZERO,
                economics: LineEconomics::default(),
            });
            acc.qty = acc.qty.saturating_add(qty);
            acc.economics.accumulate(&economics);
            totals.campaign_qty = totals.campaign_qty.saturating_add(qty);
            totals.economics.accumulate(&economics);

            monthly.push(MonthlyRow {
                month_nice: month.nice(),
                month,
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                category: product.category.clone(),
                qty,
                price: product.price,
                effective_price: price_eff,
                economics,
            });
        }
    }

    let size_breakdown = input
        .size_breakdown
        .map(|sizes| allocate_sizes(sizes, &summaries))
        .unwrap_or_default();

    let product_summary = summaries
        .values()
        .map(|acc| ProductSummary {
            product_id: acc.product.id.clone(),
            product_name: acc.product.name.clone(),
            category: acc.product.category.clone(),
            campaign_qty: acc.qty,
            economics: acc.economics,
            gross_margin_pct: gross_margin_pct(
                acc.economics.gross_revenue,
                acc.economics.total_cost,
            ),
            net_margin_pct: net_margin_pct(
                acc.economics.net_profit,
                acc.economics.effective_revenue,
            ),
        })
        .collect();

    debug!(
        months = months.len(),
        products = summaries.len(),
        rows = monthly.len(),
        "campaign forecast built"
    );

    CampaignForecast {
        monthly,
        product_summary,
        size_breakdown,
        totals,
    }
}

fn allocate_sizes(
    sizes_by_product: &BTreeMap<ProductId, SizeQuantities>,
    summaries: &BTreeMap<&ProductId, SummaryAcc<'_>>,
) -> Vec<SizeRow> {
    let mut rows = Vec::new();
    for (pid, sizes) in sizes_by_product {
        let Some(acc) = summaries.get(pid) else {
            continue;
        };
        let size_total = sizes
            .values()
            .fold(Decimal::ZERO, |acc, q| acc.saturating_add(*q));
        let denom = if acc.qty > Decimal::ZERO {
            acc.qty
        } else {
            size_total
        };
        if denom <= Decimal::ZERO {
            continue;
        }
        for (size, qty) in sizes {
            if *qty <= Decimal::ZERO {
                continue;
            }
            let share = qty.checked_div(denom).unwrap_or(Decimal::MAX);
            rows.push(SizeRow {
                product_id: pid.clone(),
                product_name: acc.product.name.clone(),
                size: size.clone(),
                qty: *qty,
                economics: acc.economics.scaled(share),
            });
        }
    }
    rows
}

/// Shadow product fields with campaign-scoped overrides.
///
/// Only fields set on the override replace the product's own values; the
/// input slice is left untouched.
pub fn apply_campaign_overrides(
    products: &[Product],
    overrides: &BTreeMap<ProductId, CampaignProductOverride>,
) -> Vec<Product> {
    products
        .iter()
        .map(|p| {
            let mut out = p.clone();
            if let Some(ov) = overrides.get(&p.id) {
                out.packaging_cost = ov.packaging_cost.unwrap_or(p.packaging_cost);
                out.marketing_cost = ov.marketing_cost.unwrap_or(p.marketing_cost);
                out.discount_rate = ov.discount_rate.unwrap_or(p.discount_rate);
                out.return_rate = ov.return_rate.unwrap_or(p.return_rate);
            }
            out
        })
        .collect()
}

/// Forecast a stored campaign against the catalog, applying the campaign's
/// own product overrides first.
pub fn forecast_campaign(products: &[Product], campaign: &Campaign) -> CampaignForecast {
    let merged = apply_campaign_overrides(products, &campaign.product_overrides);
    let month_weights = if campaign.month_weights.is_empty() {
        None
    } else {
        Some(&campaign.month_weights)
    };
    build_campaign_forecast(&ForecastInputs {
        products: &merged,
        quantities: &campaign.quantities,
        start_date: campaign.start_date,
        end_date: campaign.end_date,
        distribution_mode: campaign.distribution_mode,
        month_weights,
        product_month_weights: Some(&campaign.product_month_weights),
        size_breakdown: Some(&campaign.size_breakdown),
    })
}
