use super::ui;
use crate::core::config::AppConfig;
use crate::core::{RateProvider, Screen};
use anyhow::{Result, bail};
use comfy_table::{Cell, Table};

const COLUMNS: usize = 8;

pub async fn run(
    config: &AppConfig,
    provider: &dyn RateProvider,
    search: Option<&str>,
) -> Result<()> {
    let mut screen = Screen::new(config);

    let pb = ui::new_spinner("Loading currencies...");
    screen.mount(provider).await;
    pb.finish_and_clear();

    if let Some(notice) = screen.take_notice() {
        bail!("{}", notice);
    }

    let codes = match search {
        Some(query) => screen.search(query),
        None => screen.currencies().iter().map(String::as_str).collect(),
    };

    if codes.is_empty() {
        println!("No currencies match.");
        return Ok(());
    }

    println!(
        "\n{} ({})",
        ui::style_text("Available currencies", ui::StyleType::Title),
        codes.len()
    );
    println!("{}", render_codes(&codes, COLUMNS));
    Ok(())
}

/// Lays the codes out row by row, `columns` per row.
pub fn render_codes(codes: &[&str], columns: usize) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header((1..=columns).map(|i| ui::header_cell(&format!("#{i}"))));
    for row in codes.chunks(columns.max(1)) {
        table.add_row(row.iter().map(|code| Cell::new(*code)));
    }
    table
}
