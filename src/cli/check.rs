use super::ui;
use crate::core::config::AppConfig;
use crate::core::error::StrengthError;
use crate::providers::fixer::FixerRateProvider;
use crate::strength::{StrengthComparator, StrengthQuery, StrengthReport};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Resolves the base currency and access key, runs the comparison and prints the verdict.
pub async fn run(
    config: &AppConfig,
    counter: &str,
    base: Option<&str>,
    access_key: Option<&str>,
) -> Result<()> {
    let fixer = config.fixer();
    let base = base
        .or(config.base_currency.as_deref())
        .context("No base currency given, pass --base or set base_currency in the config")?;
    let access_key = access_key
        .or(fixer.access_key.as_deref())
        .context("No access key given, pass --access-key or set providers.fixer.access_key")?;

    let mut provider = FixerRateProvider::new(&fixer.base_url);
    if let Some(secs) = fixer.timeout_secs {
        provider = provider.with_timeout(Duration::from_secs(secs));
    }
    debug!(
        base_url = %fixer.base_url,
        timeout_secs = ?fixer.timeout_secs,
        "Using fixer provider"
    );

    let comparator = StrengthComparator::new(Arc::new(provider));
    let query = StrengthQuery::new(base, counter, access_key);

    let pb = ui::new_spinner(&format!("Fetching {counter} rates against {base}"));
    let result = comparator.compare_until(&query, interrupted()).await;
    pb.finish_and_clear();

    match result {
        Ok(report) => {
            display_report(&report);
            Ok(())
        }
        Err(e) => {
            let message = describe_error(&e, &query);
            Err(anyhow::Error::new(e).context(message))
        }
    }
}

// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        futures::future::pending::<()>().await;
    }
}

fn describe_error(error: &StrengthError, query: &StrengthQuery) -> String {
    match error {
        StrengthError::CurrencyNotFound { currency } => format!(
            "Unknown currency code: {} is not quoted against {}",
            currency, query.base_currency
        ),
        StrengthError::Transport(_) => {
            "Rate service unavailable, could not fetch exchange rates".to_string()
        }
        StrengthError::Cancelled => "Cancelled".to_string(),
    }
}

fn display_report(report: &StrengthReport) {
    let pair = format!("{}/{}", report.counter_currency, report.base_currency);
    println!("\n{}", ui::style_text(&pair, ui::StyleType::Title));

    println!("{}", report_table(report));
    println!("{}", verdict(report));
}

// The latest row shows the provider's own date when it reports one
fn report_table(report: &StrengthReport) -> comfy_table::Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Rate"),
        ui::header_cell("Change"),
    ]);
    table.add_row(vec![
        comfy_table::Cell::new(report.reference_date.to_string()),
        ui::rate_cell(report.reference_rate),
        comfy_table::Cell::new(""),
    ]);
    table.add_row(vec![
        comfy_table::Cell::new(report.latest_rate_date.unwrap_or(report.today).to_string()),
        ui::rate_cell(report.today_rate),
        ui::change_cell(report.change_percent()),
    ]);
    table
}

fn verdict(report: &StrengthReport) -> String {
    if report.is_stronger() {
        ui::style_text(
            &format!(
                "{} is stronger against {} than on {}",
                report.counter_currency, report.base_currency, report.reference_date
            ),
            ui::StyleType::Positive,
        )
    } else {
        ui::style_text(
            &format!(
                "{} is not stronger against {} than on {}",
                report.counter_currency, report.base_currency, report.reference_date
            ),
            ui::StyleType::Negative,
        )
    }
}
