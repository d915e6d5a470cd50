#![deny(warnings)]

//! Forecast engine for campaign planning.
//!
//! Pure and synchronous: every builder takes borrowed records and returns
//! owned rows and totals without touching its inputs.
//!
//! - [`forecast`]: monthly lines, product summaries, size rows and totals
//! - [`opex`]: OPEX expansion across campaign months
//! - [`profitability`]: monthly variable profit joined with OPEX
//! - [`scenario`]: what-if overrides re-run through the campaign builder

pub mod forecast;
pub mod opex;
pub mod profitability;
pub mod scenario;

pub use forecast::{
    apply_campaign_overrides, build_campaign_forecast, forecast_campaign, CampaignForecast,
    CampaignTotals, ForecastInputs, MonthlyRow, ProductSummary, SizeRow,
};
pub use opex::{
    campaign_opex, expand_opex_for_campaign, opex_month_table, CampaignOpex, OpexMonth, OpexRow,
};
pub use profitability::{
    campaign_profitability, merge_profitability, CampaignProfitability, OpexCategoryCost,
    ProfitabilityMonth, ProfitabilityTotals,
};
pub use scenario::{
    apply_opex_overrides, apply_product_overrides, apply_quantity_overrides, build_scenario_forecast,
    opex_total_over_months, ScenarioForecast, ScenarioTotals,
};
