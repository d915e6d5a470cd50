#![deny(warnings)]

//! Headless CLI for forecasting a campaign or scenario from a plan document.

use anyhow::{bail, Context, Result};
use plan_core::months::month_range_opt;
use plan_core::{Campaign, Currency, DisplaySettings, DistributionMode};
use plan_forecast::{
    build_scenario_forecast, campaign_opex, campaign_profitability, forecast_campaign,
    CampaignForecast, CampaignOpex, CampaignProfitability, ScenarioForecast,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    plan: Option<String>,
    campaign: Option<String>,
    scenario: Option<String>,
    mode: Option<DistributionMode>,
    currency: Option<String>,
    json: bool,
    version: bool,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--plan" => args.plan = it.next(),
            "--campaign" => args.campaign = it.next(),
            "--scenario" => args.scenario = it.next(),
            "--mode" => args.mode = it.next().map(|s| DistributionMode::parse(&s)),
            "--currency" => args.currency = it.next(),
            "--json" => args.json = true,
            "--version" => args.version = true,
            _ => {}
        }
    }
    args
}

#[derive(Serialize)]
struct CampaignReport<'a> {
    campaign_id: &'a str,
    campaign_name: &'a str,
    distribution_mode: DistributionMode,
    months: usize,
    forecast: CampaignForecast,
    opex: CampaignOpex,
    profitability: CampaignProfitability,
    marketing_total: Option<Decimal>,
}

#[derive(Serialize)]
struct ScenarioReport<'a> {
    scenario_id: &'a str,
    scenario_name: &'a str,
    base_campaign_id: &'a str,
    distribution_mode: DistributionMode,
    forecast: ScenarioForecast,
}

fn display_settings(base: &DisplaySettings, code: Option<&str>) -> Result<DisplaySettings> {
    match code {
        None => Ok(base.clone()),
        Some(code) => match Currency::from_code(code) {
            Some(currency) => Ok(base.with_currency(currency)),
            None => bail!("unsupported currency: {code}"),
        },
    }
}

fn print_campaign(report: &CampaignReport<'_>, display: &DisplaySettings) {
    let f = &report.forecast;
    println!(
        "Campaign {} ({}) | mode: {} | months: {} | products: {}",
        report.campaign_id,
        report.campaign_name,
        report.distribution_mode,
        report.months,
        f.product_summary.len()
    );
    for s in &f.product_summary {
        println!(
            "  {} {} | qty: {} | revenue: {} | cost: {} | profit: {} | gross: {:.1}% | net: {:.1}%",
            s.product_id,
            s.product_name,
            s.campaign_qty.normalize(),
            display.format_money(s.economics.effective_revenue),
            display.format_money(s.economics.total_cost),
            display.format_money(s.economics.net_profit),
            s.gross_margin_pct.round_dp(1),
            s.net_margin_pct.round_dp(1)
        );
    }
    for size in &f.size_breakdown {
        println!(
            "  size {} {} | qty: {} | revenue: {}",
            size.product_id,
            size.size,
            size.qty.normalize(),
            display.format_money(size.economics.effective_revenue)
        );
    }
    for m in &report.profitability.monthly {
        println!(
            "  month {} | qty: {} | revenue: {} | variable profit: {} | opex: {} | after opex: {}",
            m.month_nice,
            m.qty.normalize(),
            display.format_money(m.effective_revenue),
            display.format_money(m.net_profit_variable),
            display.format_money(m.opex_cost),
            display.format_money(m.net_profit_after_opex)
        );
    }
    for c in &report.profitability.opex_by_category {
        println!("  opex {} | {}", c.category, display.format_money(c.cost));
    }
    let t = &f.totals;
    println!(
        "Totals | qty: {} | gross: {} | revenue: {} | cost: {} | profit: {} | opex: {}",
        t.campaign_qty.normalize(),
        display.format_money(t.economics.gross_revenue),
        display.format_money(t.economics.effective_revenue),
        display.format_money(t.economics.total_cost),
        display.format_money(t.economics.net_profit),
        display.format_money(report.opex.total)
    );
    println!(
        "Profit after opex | {}",
        display.format_money(report.profitability.totals.net_profit_after_opex)
    );
    if let Some(total) = report.marketing_total {
        println!("Marketing budget | {}", display.format_money(total));
    }
}

fn print_scenario(report: &ScenarioReport<'_>, display: &DisplaySettings) {
    let t = &report.forecast.totals;
    println!(
        "Scenario {} ({}) | base: {} | mode: {}",
        report.scenario_id, report.scenario_name, report.base_campaign_id, report.distribution_mode
    );
    for s in &report.forecast.product_summary {
        println!(
            "  {} {} | qty: {} | revenue: {} | profit: {}",
            s.product_id,
            s.product_name,
            s.campaign_qty.normalize(),
            display.format_money(s.economics.effective_revenue),
            display.format_money(s.economics.net_profit)
        );
    }
    println!(
        "Totals | qty: {} | revenue: {} | cost: {} | variable profit: {} | opex: {} | profit after opex: {}",
        t.campaign_qty.normalize(),
        display.format_money(t.effective_revenue),
        display.format_money(t.total_cost),
        display.format_money(t.net_profit_variable),
        display.format_money(t.opex_total),
        display.format_money(t.net_profit_after_opex)
    );
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();
    if args.version {
        println!(
            "planner {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }
    info!(plan = ?args.plan, campaign = ?args.campaign, scenario = ?args.scenario, "starting CLI");

    let Some(path) = args.plan.as_deref() else {
        bail!("missing required --plan <path>");
    };
    let plan = plan_input::load_plan(path).with_context(|| format!("loading plan {path}"))?;
    let display = display_settings(&plan.display, args.currency.as_deref())?;

    if let Some(id) = args.scenario.as_deref() {
        let (scenario, base) = plan.scenario(id)?;
        let mut overrides = scenario.overrides.clone();
        if args.mode.is_some() {
            overrides.distribution_mode = args.mode;
        }
        let mode = overrides
            .distribution_mode
            .unwrap_or(base.distribution_mode);
        let report = ScenarioReport {
            scenario_id: &scenario.id.0,
            scenario_name: &scenario.name,
            base_campaign_id: &base.id.0,
            distribution_mode: mode,
            forecast: build_scenario_forecast(&plan.products, base, &overrides),
        };
        if args.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_scenario(&report, &display);
        }
        return Ok(());
    }

    let stored = plan.campaign(args.campaign.as_deref())?;
    let campaign = match args.mode {
        Some(mode) => Campaign {
            distribution_mode: mode,
            ..stored.clone()
        },
        None => stored.clone(),
    };
    let report = CampaignReport {
        campaign_id: &campaign.id.0,
        campaign_name: &campaign.name,
        distribution_mode: campaign.distribution_mode,
        months: month_range_opt(campaign.start_date, campaign.end_date).len(),
        forecast: forecast_campaign(&plan.products, &campaign),
        opex: campaign_opex(&campaign),
        profitability: campaign_profitability(&plan.products, &campaign),
        marketing_total: campaign.marketing_total,
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_campaign(&report, &display);
    }
    Ok(())
}
