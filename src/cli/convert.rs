use super::ui;
use crate::core::config::AppConfig;
use crate::core::{ConversionResult, RateProvider, Screen};
use anyhow::{Result, anyhow, bail};

pub async fn run(
    config: &AppConfig,
    provider: &dyn RateProvider,
    amount: &str,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<()> {
    let result = convert_once(config, provider, amount, from, to).await?;
    println!("{}", ui::style_text(&result.to_string(), ui::StyleType::Result));
    if let Some(updated) = result.rates_updated {
        println!(
            "{}",
            ui::style_text(
                &format!("Rates updated {}", updated.format("%Y-%m-%d %H:%M UTC")),
                ui::StyleType::Subtle
            )
        );
    }
    Ok(())
}

/// Mounts a fresh screen, applies the selections and performs one conversion.
pub async fn convert_once(
    config: &AppConfig,
    provider: &dyn RateProvider,
    amount: &str,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<ConversionResult> {
    let mut screen = Screen::new(config);

    let pb = ui::new_spinner("Loading currencies...");
    screen.mount(provider).await;
    pb.finish_and_clear();
    if let Some(notice) = screen.take_notice() {
        bail!("{}", notice);
    }

    if let Some(code) = from {
        screen.select_source(code);
    }
    if let Some(code) = to {
        screen.select_target(code);
    }
    if let Some(notice) = screen.take_notice() {
        bail!("{}", notice);
    }

    screen.set_amount(amount);
    if let Some(ticket) = screen.begin_convert() {
        let pb = ui::new_spinner(&format!(
            "Fetching {} rates...",
            ticket.request.source
        ));
        let fetched = provider.fetch_rates(&ticket.request.source).await;
        screen.finish_convert(ticket, fetched);
        pb.finish_and_clear();
    }
    if let Some(notice) = screen.take_notice() {
        bail!("{}", notice);
    }

    screen
        .result()
        .cloned()
        .ok_or_else(|| anyhow!("Conversion produced no result"))
}
