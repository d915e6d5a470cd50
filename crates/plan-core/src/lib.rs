#![deny(warnings)]

//! Core domain models and invariants for campaign financial planning.
//!
//! This crate defines the serializable records the forecast engine consumes
//! (products, campaigns, OPEX items, scenario overrides), month utilities,
//! display settings, and the validation helpers that are run once at the
//! boundary so the engine itself can stay total.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

pub mod display;
pub mod months;

pub use display::{Currency, DisplaySettings};
pub use months::{MonthLabel, MonthWeights};

/// Upper bound accepted for any money amount or quantity at the boundary (1e12).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Unique identifier for a catalog product.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

/// Unique identifier for an OPEX item.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OpexId(pub String);

/// Unique identifier for a campaign.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CampaignId(pub String);

/// Unique identifier for a scenario.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScenarioId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        ProductId(s.to_string())
    }
}

impl From<&str> for OpexId {
    fn from(s: &str) -> Self {
        OpexId(s.to_string())
    }
}

/// Units per size label for one product.
pub type SizeQuantities = BTreeMap<String, Decimal>;

/// Policy for spreading a campaign quantity across its months.
///
/// Unrecognised names deserialize as [`DistributionMode::Uniform`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DistributionMode {
    /// Equal weight for every month.
    #[default]
    Uniform,
    /// Earliest month heaviest: weights n, n-1, ..., 1.
    FrontLoaded,
    /// Latest month heaviest: weights 1, 2, ..., n.
    BackLoaded,
    /// Caller-supplied month weights.
    Custom,
}

impl DistributionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DistributionMode::Uniform => "Uniform",
            DistributionMode::FrontLoaded => "Front-loaded",
            DistributionMode::BackLoaded => "Back-loaded",
            DistributionMode::Custom => "Custom",
        }
    }

    /// Parse a mode name; anything unrecognised is `Uniform`.
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "Front-loaded" => DistributionMode::FrontLoaded,
            "Back-loaded" => DistributionMode::BackLoaded,
            "Custom" => DistributionMode::Custom,
            _ => DistributionMode::Uniform,
        }
    }
}

impl From<String> for DistributionMode {
    fn from(s: String) -> Self {
        DistributionMode::parse(&s)
    }
}

impl From<DistributionMode> for String {
    fn from(m: DistributionMode) -> Self {
        m.as_str().to_string()
    }
}

impl fmt::Display for DistributionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog product with pricing and per-unit cost components.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier.
    pub id: ProductId,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Catalog category, e.g. "Apparel".
    #[serde(default)]
    pub category: String,
    /// Unit sale price.
    pub price: Decimal,
    /// Discount rate in [0,1].
    #[serde(default)]
    pub discount_rate: Decimal,
    /// Return rate in [0,1], applied after the discount.
    #[serde(default)]
    pub return_rate: Decimal,
    /// Manufacturing cost per unit (>= 0).
    #[serde(default)]
    pub manufacturing_cost: Decimal,
    /// Packaging cost per unit (>= 0).
    #[serde(default)]
    pub packaging_cost: Decimal,
    /// Shipping cost per unit (>= 0).
    #[serde(default)]
    pub shipping_cost: Decimal,
    /// Marketing cost per unit (>= 0).
    #[serde(default)]
    pub marketing_cost: Decimal,
    /// Replacement for the summed unit cost, set by scenario overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_override_total: Option<Decimal>,
}

/// Campaign-scoped replacement values for a product's own fields.
///
/// `None` keeps the product's value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignProductOverride {
    #[serde(default)]
    pub packaging_cost: Option<Decimal>,
    #[serde(default)]
    pub marketing_cost: Option<Decimal>,
    #[serde(default)]
    pub discount_rate: Option<Decimal>,
    #[serde(default)]
    pub return_rate: Option<Decimal>,
}

impl CampaignProductOverride {
    pub fn is_empty(&self) -> bool {
        self.packaging_cost.is_none()
            && self.marketing_cost.is_none()
            && self.discount_rate.is_none()
            && self.return_rate.is_none()
    }
}

/// An operating-expense item with an active month window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpexItem {
    pub id: OpexId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    /// Cost per active month, or the single charge for one-time items.
    pub cost: Decimal,
    /// First active month. Items without one never expand.
    #[serde(default)]
    pub start_month: Option<MonthLabel>,
    /// Last active month; open-ended when absent.
    #[serde(default)]
    pub end_month: Option<MonthLabel>,
    /// One-time items only apply in `start_month`.
    #[serde(default)]
    pub is_one_time: bool,
    #[serde(default)]
    pub notes: String,
}

/// All stored inputs of one campaign, already resolved by the collaborator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    #[serde(default)]
    pub name: String,
    /// Campaign start; `None` when the stored value did not parse.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Campaign end; `None` when the stored value did not parse.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub distribution_mode: DistributionMode,
    /// Total units per product over the whole campaign.
    #[serde(default)]
    pub quantities: BTreeMap<ProductId, Decimal>,
    /// Campaign-level custom weights (used in `Custom` mode).
    #[serde(default)]
    pub month_weights: MonthWeights,
    /// Per-product custom weights, preferred over `month_weights`.
    #[serde(default)]
    pub product_month_weights: BTreeMap<ProductId, MonthWeights>,
    /// Units per size per product.
    #[serde(default)]
    pub size_breakdown: BTreeMap<ProductId, SizeQuantities>,
    /// Campaign-scoped product field overrides.
    #[serde(default)]
    pub product_overrides: BTreeMap<ProductId, CampaignProductOverride>,
    /// OPEX items attached to the campaign.
    #[serde(default)]
    pub opex: Vec<OpexItem>,
    /// Campaign-level marketing budget, reported as-is.
    #[serde(default)]
    pub marketing_total: Option<Decimal>,
}

/// Scenario replacement values for one product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioProductOverride {
    pub product_id: ProductId,
    /// Absolute unit price.
    #[serde(default)]
    pub price_override: Option<Decimal>,
    /// Discount in percentage points.
    #[serde(default)]
    pub discount_override: Option<Decimal>,
    /// Return rate in percentage points.
    #[serde(default)]
    pub return_rate_override: Option<Decimal>,
    /// Absolute total unit cost.
    #[serde(default)]
    pub cost_override: Option<Decimal>,
    /// Absolute replacement campaign quantity.
    #[serde(default)]
    pub qty_override: Option<Decimal>,
}

/// Scenario replacement cost for one OPEX item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOpexOverride {
    pub opex_item_id: OpexId,
    #[serde(default)]
    pub cost_override: Option<Decimal>,
}

/// Everything a scenario layers on top of its base campaign.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOverrides {
    #[serde(default)]
    pub products: Vec<ScenarioProductOverride>,
    #[serde(default)]
    pub opex: Vec<ScenarioOpexOverride>,
    /// Replaces the campaign's distribution mode.
    #[serde(default)]
    pub distribution_mode: Option<DistributionMode>,
    /// Replaces the campaign's custom weights in `Custom` mode.
    #[serde(default)]
    pub custom_weights: Option<MonthWeights>,
}

/// A named what-if variant of a base campaign.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: ScenarioId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub base_campaign_id: CampaignId,
    #[serde(flatten)]
    pub overrides: ScenarioOverrides,
}

/// Validation errors for boundary invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Required text field is empty.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    /// Price, cost or quantity below zero.
    #[error("{0} cannot be negative")]
    NegativeMoney(&'static str),
    /// Rate outside [0, 1].
    #[error("{0} must be between 0 and 1")]
    RateOutOfRange(&'static str),
    /// Percentage outside [0, 100].
    #[error("{0} must be between 0 and 100")]
    PercentOutOfRange(&'static str),
    /// Amount above [`MAX_AMOUNT`].
    #[error("{0} exceeds the supported maximum")]
    TooLarge(&'static str),
    /// Month label not of the form `YYYY-MM`.
    #[error("invalid month label: {0}")]
    InvalidMonth(String),
    /// End month precedes start month.
    #[error("end month {end} precedes start month {start}")]
    EndBeforeStart { start: String, end: String },
    /// Identifier used twice in one collection.
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    /// Exchange rate missing or not strictly positive.
    #[error("exchange rate for {0} must be a positive number")]
    InvalidExchangeRate(String),
}

fn check_amount(value: Decimal, field: &'static str) -> Result<(), ValidationError> {
    if value < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney(field));
    }
    if value > MAX_AMOUNT {
        return Err(ValidationError::TooLarge(field));
    }
    Ok(())
}

fn check_cap(value: Decimal, field: &'static str) -> Result<(), ValidationError> {
    if value > MAX_AMOUNT {
        return Err(ValidationError::TooLarge(field));
    }
    Ok(())
}

fn check_rate(value: Decimal, field: &'static str) -> Result<(), ValidationError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ValidationError::RateOutOfRange(field));
    }
    Ok(())
}

fn check_percent(value: Decimal, field: &'static str) -> Result<(), ValidationError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::PercentOutOfRange(field));
    }
    Ok(())
}

fn check_month(label: &MonthLabel) -> Result<(), ValidationError> {
    if !label.is_valid() {
        return Err(ValidationError::InvalidMonth(label.0.clone()));
    }
    Ok(())
}

/// Validate a catalog product.
pub fn validate_product(p: &Product) -> Result<(), ValidationError> {
    if p.id.0.trim().is_empty() {
        return Err(ValidationError::EmptyField("product id"));
    }
    check_amount(p.price, "price")?;
    check_amount(p.manufacturing_cost, "manufacturing_cost")?;
    check_amount(p.packaging_cost, "packaging_cost")?;
    check_amount(p.shipping_cost, "shipping_cost")?;
    check_amount(p.marketing_cost, "marketing_cost")?;
    check_rate(p.discount_rate, "discount_rate")?;
    check_rate(p.return_rate, "return_rate")?;
    if let Some(c) = p.cost_override_total {
        check_amount(c, "cost_override_total")?;
    }
    Ok(())
}

/// Validate an OPEX item, including its month window.
pub fn validate_opex_item(item: &OpexItem) -> Result<(), ValidationError> {
    if item.id.0.trim().is_empty() {
        return Err(ValidationError::EmptyField("opex id"));
    }
    check_amount(item.cost, "cost")?;
    if let Some(start) = &item.start_month {
        check_month(start)?;
    }
    if let Some(end) = &item.end_month {
        check_month(end)?;
        if let Some(start) = &item.start_month {
            if end < start {
                return Err(ValidationError::EndBeforeStart {
                    start: start.0.clone(),
                    end: end.0.clone(),
                });
            }
        }
    }
    Ok(())
}

impl Campaign {
    /// Drop quantities and size counts that are not positive and month
    /// weights below zero. Returns the number of entries removed.
    pub fn drop_non_contributing(&mut self) -> usize {
        let mut dropped = 0;
        let mut keep = |contributes: bool| {
            if !contributes {
                dropped += 1;
            }
            contributes
        };
        self.quantities.retain(|_, q| keep(*q > Decimal::ZERO));
        self.month_weights.retain(|_, w| keep(*w >= Decimal::ZERO));
        for weights in self.product_month_weights.values_mut() {
            weights.retain(|_, w| keep(*w >= Decimal::ZERO));
        }
        for sizes in self.size_breakdown.values_mut() {
            sizes.retain(|_, q| keep(*q > Decimal::ZERO));
        }
        self.size_breakdown.retain(|_, sizes| !sizes.is_empty());
        dropped
    }
}

impl ScenarioOverrides {
    /// Clear negative quantity overrides and drop negative custom weights.
    /// Returns the number of values removed.
    pub fn drop_non_contributing(&mut self) -> usize {
        let mut dropped = 0;
        for p in &mut self.products {
            if p.qty_override.is_some_and(|q| q < Decimal::ZERO) {
                p.qty_override = None;
                dropped += 1;
            }
        }
        if let Some(weights) = &mut self.custom_weights {
            let before = weights.len();
            weights.retain(|_, w| *w >= Decimal::ZERO);
            dropped += before - weights.len();
        }
        dropped
    }
}

/// Validate a campaign's scalar inputs and nested maps.
///
/// Negative quantities, weights and size counts are not errors: the
/// engine treats them as zero, and loaders drop them with
/// [`Campaign::drop_non_contributing`]. Only the upper cap and month
/// labels are checked for them here.
pub fn validate_campaign(c: &Campaign) -> Result<(), ValidationError> {
    if c.id.0.trim().is_empty() {
        return Err(ValidationError::EmptyField("campaign id"));
    }
    for q in c.quantities.values() {
        check_cap(*q, "quantity")?;
    }
    for (m, w) in &c.month_weights {
        check_month(m)?;
        check_cap(*w, "month weight")?;
    }
    for weights in c.product_month_weights.values() {
        for (m, w) in weights {
            check_month(m)?;
            check_cap(*w, "month weight")?;
        }
    }
    for sizes in c.size_breakdown.values() {
        for q in sizes.values() {
            check_cap(*q, "size quantity")?;
        }
    }
    for ov in c.product_overrides.values() {
        if let Some(v) = ov.packaging_cost {
            check_amount(v, "packaging_cost")?;
        }
        if let Some(v) = ov.marketing_cost {
            check_amount(v, "marketing_cost")?;
        }
        if let Some(v) = ov.discount_rate {
            check_rate(v, "discount_rate")?;
        }
        if let Some(v) = ov.return_rate {
            check_rate(v, "return_rate")?;
        }
    }
    let mut seen = BTreeSet::new();
    for item in &c.opex {
        validate_opex_item(item)?;
        if !seen.insert(&item.id) {
            return Err(ValidationError::DuplicateId(item.id.0.clone()));
        }
    }
    if let Some(total) = c.marketing_total {
        check_amount(total, "marketing_total")?;
    }
    Ok(())
}

/// Validate scenario overrides.
pub fn validate_scenario_overrides(o: &ScenarioOverrides) -> Result<(), ValidationError> {
    for p in &o.products {
        if let Some(v) = p.price_override {
            check_amount(v, "price_override")?;
        }
        if let Some(v) = p.discount_override {
            check_percent(v, "discount_override")?;
        }
        if let Some(v) = p.return_rate_override {
            check_percent(v, "return_rate_override")?;
        }
        if let Some(v) = p.cost_override {
            check_amount(v, "cost_override")?;
        }
        if let Some(v) = p.qty_override {
            check_cap(v, "qty_override")?;
        }
    }
    for ov in &o.opex {
        if let Some(v) = ov.cost_override {
            check_amount(v, "opex cost_override")?;
        }
    }
    if let Some(weights) = &o.custom_weights {
        for (m, w) in weights {
            check_month(m)?;
            check_cap(*w, "month weight")?;
        }
    }
    Ok(())
}

/// Validate a product catalog, including id uniqueness.
pub fn validate_catalog(products: &[Product]) -> Result<(), ValidationError> {
    let mut ids: BTreeSet<&ProductId> = BTreeSet::new();
    for p in products {
        validate_product(p)?;
        if !ids.insert(&p.id) {
            return Err(ValidationError::DuplicateId(p.id.0.clone()));
        }
    }
    Ok(())
}
