#![deny(warnings)]

//! Product economics: pricing and per-unit cost helpers for campaign planning.
//!
//! This module provides total (never failing, never panicking) utilities
//! for:
//! - Effective price after sequential discount and return-rate reduction
//! - Per-unit cost, with an optional total-cost override
//! - Per-line revenue/cost/profit for a quantity of one product
//! - Gross and net margin percentages
//!
//! Arithmetic saturates at the `Decimal` bounds instead of overflowing, so
//! unvalidated inputs degrade to extreme values rather than a panic.

use plan_core::Product;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unit price after discount, then after returns.
///
/// `price * (1 - discount_rate) * (1 - return_rate)`. The return rate
/// applies to the already discounted price.
///
/// Example:
/// price 100, discount 0.1, return 0.05 => 85.5
pub fn effective_price(product: &Product) -> Decimal {
    let after_discount = product
        .price
        .saturating_mul(Decimal::ONE.saturating_sub(product.discount_rate));
    after_discount.saturating_mul(Decimal::ONE.saturating_sub(product.return_rate))
}

/// Sum of the four per-unit cost components.
pub fn total_unit_cost(product: &Product) -> Decimal {
    product
        .manufacturing_cost
        .saturating_add(product.packaging_cost)
        .saturating_add(product.shipping_cost)
        .saturating_add(product.marketing_cost)
}

/// The override total when present, otherwise [`total_unit_cost`].
pub fn total_unit_cost_with_override(product: &Product) -> Decimal {
    product
        .cost_override_total
        .unwrap_or_else(|| total_unit_cost(product))
}

/// Effective price minus the component unit cost (ignores overrides).
pub fn unit_net_profit(product: &Product) -> Decimal {
    effective_price(product).saturating_sub(total_unit_cost(product))
}

/// Money figures for a quantity of one product.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineEconomics {
    /// List price times quantity.
    pub gross_revenue: Decimal,
    /// Effective price times quantity.
    pub effective_revenue: Decimal,
    /// Override-aware unit cost times quantity.
    pub total_cost: Decimal,
    /// Effective revenue minus total cost.
    pub net_profit: Decimal,
}

impl LineEconomics {
    /// Component-wise sum, used when aggregating rows.
    pub fn accumulate(&mut self, other: &LineEconomics) {
        self.gross_revenue = self.gross_revenue.saturating_add(other.gross_revenue);
        self.effective_revenue = self.effective_revenue.saturating_add(other.effective_revenue);
        self.total_cost = self.total_cost.saturating_add(other.total_cost);
        self.net_profit = self.net_profit.saturating_add(other.net_profit);
    }

    /// Every field multiplied by `share`, with net profit recomputed from
    /// the scaled revenue and cost.
    pub fn scaled(&self, share: Decimal) -> LineEconomics {
        let effective_revenue = self.effective_revenue.saturating_mul(share);
        let total_cost = self.total_cost.saturating_mul(share);
        LineEconomics {
            gross_revenue: self.gross_revenue.saturating_mul(share),
            effective_revenue,
            total_cost,
            net_profit: effective_revenue.saturating_sub(total_cost),
        }
    }
}

/// Economics of selling `qty` units of `product`.
///
/// Example:
/// price 100, discount 0.1, return 0.05, unit cost 45, qty 500
/// => effective_revenue 42750, total_cost 22500, net_profit 20250
pub fn line_economics(product: &Product, qty: Decimal) -> LineEconomics {
    let ep = effective_price(product);
    let unit_cost = total_unit_cost_with_override(product);
    LineEconomics {
        gross_revenue: product.price.saturating_mul(qty),
        effective_revenue: ep.saturating_mul(qty),
        total_cost: unit_cost.saturating_mul(qty),
        net_profit: ep.saturating_sub(unit_cost).saturating_mul(qty),
    }
}

/// `numerator / denominator * 100`; zero for a zero denominator, saturated
/// when the quotient does not fit.
fn percent_of(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    match numerator.checked_div(denominator) {
        Some(ratio) => ratio.saturating_mul(Decimal::ONE_HUNDRED),
        None if numerator.is_sign_negative() != denominator.is_sign_negative() => Decimal::MIN,
        None => Decimal::MAX,
    }
}

/// `(gross_revenue - total_cost) / gross_revenue * 100`, or zero when there
/// is no gross revenue.
pub fn gross_margin_pct(gross_revenue: Decimal, total_cost: Decimal) -> Decimal {
    percent_of(gross_revenue.saturating_sub(total_cost), gross_revenue)
}

/// `net_profit / effective_revenue * 100`, or zero when there is no
/// effective revenue.
pub fn net_margin_pct(net_profit: Decimal, effective_revenue: Decimal) -> Decimal {
    percent_of(net_profit, effective_revenue)
}
