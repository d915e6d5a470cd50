#![deny(warnings)]

//! Plan documents: loading, resolution and validation of planner inputs.
//!
//! A plan document (YAML or JSON) carries display settings, the product
//! catalog, the OPEX catalog, campaigns and scenarios. Loading resolves
//! campaign OPEX attachments against the catalog and validates every
//! record once, so the forecast engine only ever sees sanitised data.

use chrono::NaiveDate;
use plan_core::months::parse_date;
use plan_core::{
    validate_campaign, validate_catalog, validate_opex_item, validate_scenario_overrides,
    Campaign, CampaignId, CampaignProductOverride, DisplaySettings, DistributionMode, MonthWeights,
    OpexId, OpexItem, Product, ProductId, Scenario, SizeQuantities, ValidationError,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid plan: {0}")]
    Invalid(#[from] ValidationError),
    #[error("plan has no campaigns")]
    NoCampaigns,
    #[error("unknown campaign: {0}")]
    UnknownCampaign(String),
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
    #[error("campaign {campaign} references unknown opex item {opex}")]
    UnknownOpex { campaign: String, opex: String },
}

impl From<std::io::Error> for InputError {
    fn from(e: std::io::Error) -> Self {
        InputError::Io(e.to_string())
    }
}

impl From<serde_yaml::Error> for InputError {
    fn from(e: serde_yaml::Error) -> Self {
        InputError::Parse(e.to_string())
    }
}

impl From<serde_json::Error> for InputError {
    fn from(e: serde_json::Error) -> Self {
        InputError::Parse(e.to_string())
    }
}

/// Serialization format of a plan document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanFormat {
    Yaml,
    Json,
}

impl PlanFormat {
    /// `.json` files are JSON; everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => PlanFormat::Json,
            _ => PlanFormat::Yaml,
        }
    }
}

/// Campaign as written in a plan document.
///
/// Dates are free-form strings and OPEX is attached by id.
#[derive(Debug, Clone, Deserialize)]
struct CampaignDoc {
    id: CampaignId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    distribution_mode: DistributionMode,
    #[serde(default)]
    quantities: BTreeMap<ProductId, Decimal>,
    #[serde(default)]
    month_weights: MonthWeights,
    #[serde(default)]
    product_month_weights: BTreeMap<ProductId, MonthWeights>,
    #[serde(default)]
    size_breakdown: BTreeMap<ProductId, SizeQuantities>,
    #[serde(default)]
    product_overrides: BTreeMap<ProductId, CampaignProductOverride>,
    #[serde(default)]
    opex_ids: Vec<OpexId>,
    #[serde(default)]
    marketing_total: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
struct PlanDocument {
    #[serde(default)]
    display: DisplaySettings,
    #[serde(default)]
    products: Vec<Product>,
    #[serde(default)]
    opex: Vec<OpexItem>,
    #[serde(default)]
    campaigns: Vec<CampaignDoc>,
    #[serde(default)]
    scenarios: Vec<Scenario>,
}

/// A resolved and validated plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub display: DisplaySettings,
    pub products: Vec<Product>,
    pub opex: Vec<OpexItem>,
    pub campaigns: Vec<Campaign>,
    pub scenarios: Vec<Scenario>,
}

impl Plan {
    /// Campaign by id, or the first campaign when `id` is `None`.
    pub fn campaign(&self, id: Option<&str>) -> Result<&Campaign, InputError> {
        match id {
            Some(id) => self
                .campaigns
                .iter()
                .find(|c| c.id.0 == id)
                .ok_or_else(|| InputError::UnknownCampaign(id.to_string())),
            None => self.campaigns.first().ok_or(InputError::NoCampaigns),
        }
    }

    /// Scenario by id together with its base campaign.
    pub fn scenario(&self, id: &str) -> Result<(&Scenario, &Campaign), InputError> {
        let scenario = self
            .scenarios
            .iter()
            .find(|s| s.id.0 == id)
            .ok_or_else(|| InputError::UnknownScenario(id.to_string()))?;
        let base = self.campaign(Some(&scenario.base_campaign_id.0))?;
        Ok((scenario, base))
    }
}

/// Read, resolve and validate the plan document at `path`.
pub fn load_plan<P: AsRef<Path>>(path: P) -> Result<Plan, InputError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let plan = parse_plan(&text, PlanFormat::from_path(path))?;
    info!(
        path = %path.display(),
        products = plan.products.len(),
        campaigns = plan.campaigns.len(),
        scenarios = plan.scenarios.len(),
        "plan loaded"
    );
    Ok(plan)
}

/// Resolve and validate a plan document held in memory.
pub fn parse_plan(text: &str, format: PlanFormat) -> Result<Plan, InputError> {
    let doc: PlanDocument = match format {
        PlanFormat::Yaml => serde_yaml::from_str(text)?,
        PlanFormat::Json => serde_json::from_str(text)?,
    };
    resolve(doc)
}

fn lenient_date(campaign: &CampaignId, field: &str, raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    let parsed = parse_date(raw);
    if parsed.is_none() {
        warn!(campaign = %campaign.0, field, value = raw, "unparseable date treated as absent");
    }
    parsed
}

fn resolve(doc: PlanDocument) -> Result<Plan, InputError> {
    doc.display.validate()?;
    validate_catalog(&doc.products)?;

    let mut catalog: BTreeMap<&OpexId, &OpexItem> = BTreeMap::new();
    for item in &doc.opex {
        validate_opex_item(item)?;
        if catalog.insert(&item.id, item).is_some() {
            return Err(ValidationError::DuplicateId(item.id.0.clone()).into());
        }
    }

    let mut campaigns = Vec::with_capacity(doc.campaigns.len());
    let mut campaign_ids = BTreeSet::new();
    for c in &doc.campaigns {
        if !campaign_ids.insert(&c.id) {
            return Err(ValidationError::DuplicateId(c.id.0.clone()).into());
        }
        let opex = c
            .opex_ids
            .iter()
            .map(|id| {
                catalog
                    .get(id)
                    .map(|item| (*item).clone())
                    .ok_or_else(|| InputError::UnknownOpex {
                        campaign: c.id.0.clone(),
                        opex: id.0.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut campaign = Campaign {
            id: c.id.clone(),
            name: c.name.clone(),
            start_date: lenient_date(&c.id, "start_date", c.start_date.as_deref()),
            end_date: lenient_date(&c.id, "end_date", c.end_date.as_deref()),
            distribution_mode: c.distribution_mode,
            quantities: c.quantities.clone(),
            month_weights: c.month_weights.clone(),
            product_month_weights: c.product_month_weights.clone(),
            size_breakdown: c.size_breakdown.clone(),
            product_overrides: c.product_overrides.clone(),
            opex,
            marketing_total: c.marketing_total,
        };
        validate_campaign(&campaign)?;
        let dropped = campaign.drop_non_contributing();
        if dropped > 0 {
            warn!(campaign = %c.id.0, dropped, "non-positive quantities or negative weights dropped");
        }
        campaigns.push(campaign);
    }

    let mut scenarios = doc.scenarios;
    let mut scenario_ids = BTreeSet::new();
    for s in &mut scenarios {
        if !scenario_ids.insert(s.id.clone()) {
            return Err(ValidationError::DuplicateId(s.id.0.clone()).into());
        }
        if !campaign_ids.contains(&s.base_campaign_id) {
            return Err(InputError::UnknownCampaign(s.base_campaign_id.0.clone()));
        }
        validate_scenario_overrides(&s.overrides)?;
        let dropped = s.overrides.drop_non_contributing();
        if dropped > 0 {
            warn!(scenario = %s.id.0, dropped, "negative quantity overrides or weights dropped");
        }
    }

    Ok(Plan {
        display: doc.display,
        products: doc.products,
        opex: doc.opex,
        campaigns,
        scenarios,
    })
}
