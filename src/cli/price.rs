use super::ui;
use crate::core::price::PriceQuery;
use crate::core::resolver::PriceResolver;
use anyhow::{Context, Result};
use comfy_table::Cell;

pub async fn run(resolver: &PriceResolver, query: &PriceQuery) -> Result<()> {
    let resolved = resolver
        .resolve(query)
        .await
        .with_context(|| format!("Failed to resolve {} for {}", query.field, query.key))?;

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Field"),
        ui::header_cell("Requested"),
        ui::header_cell("Effective"),
        ui::header_cell("Value"),
    ]);
    table.add_row(vec![
        Cell::new(resolved.key.to_string()),
        Cell::new(resolved.field.to_string()),
        Cell::new(resolved.requested_date.to_string()),
        Cell::new(resolved.effective_date.to_string()),
        ui::number_cell(format!("{:.4}", resolved.price)),
    ]);
    println!("{table}");

    if resolved.is_clamped() {
        println!(
            "{}",
            ui::style_text(
                &format!(
                    "No data published for {} yet, showing latest session {}",
                    resolved.requested_date, resolved.effective_date
                ),
                ui::StyleType::Warning,
            )
        );
    }
    Ok(())
}
