use super::ui;
use crate::core::analytics::{self, AnnualizedReturn, Portfolio};
use crate::core::config;
use crate::core::error::ReturnError;
use crate::core::resolver::PriceResolver;
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::{Attribute, Cell};
use tracing::info;

pub async fn run(
    portfolios: &[config::Portfolio],
    resolver: &PriceResolver,
    from: NaiveDate,
    to: Option<NaiveDate>,
) -> Result<()> {
    info!("Calculating returns for portfolios...");

    if portfolios.is_empty() {
        println!("No portfolios found to calculate returns for.");
        return Ok(());
    }

    let num_portfolios = portfolios.len();
    for (i, portfolio) in portfolios.iter().enumerate() {
        let portfolio = Portfolio::from(portfolio);
        let pb = ui::new_progress_bar(portfolio.instruments.len() as u64);
        let result = analytics::annualized_return_with_progress(
            resolver,
            &portfolio,
            from,
            to,
            &|| pb.inc(1),
        )
        .await;
        pb.finish_and_clear();

        println!(
            "\n{}",
            ui::style_text(&format!("Portfolio: {}", portfolio.name), ui::StyleType::Title)
        );
        match result {
            Ok(returns) => println!("{}", display_returns(&returns)),
            Err(ReturnError::NoResolvablePrices { .. }) => println!(
                "{}",
                ui::style_text(
                    "No price could be resolved for any holding.",
                    ui::StyleType::Error
                )
            ),
            Err(e) => return Err(e.into()),
        }

        if i < num_portfolios - 1 {
            ui::print_separator();
        }
    }

    Ok(())
}

fn display_returns(returns: &AnnualizedReturn) -> String {
    let overall = &returns.overall;
    let mut table = ui::new_styled_table();

    table.set_header(vec![
        ui::header_cell("Active"),
        ui::header_cell(&format!("Price ({})", overall.from)),
        ui::header_cell(&format!("Price ({})", overall.to)),
        ui::header_cell("Delta"),
        ui::header_cell("Delta (%)"),
    ]);

    for delta in &overall.deltas {
        let mut to_price = format!("{:.2}", delta.to.price);
        if delta.to.is_clamped() {
            to_price = format!("{to_price} ({})", delta.to.effective_date);
        }
        table.add_row(vec![
            Cell::new(format!("{} ({})", delta.instrument.name, delta.instrument.symbol)),
            ui::number_cell(format!("{:.2}", delta.from.price)),
            ui::number_cell(to_price),
            ui::number_cell(format!("{:.2}", delta.delta)),
            delta.delta_pct.map_or(ui::na_cell(false), ui::change_cell),
        ]);
    }

    for failure in &overall.failures {
        table.add_row(vec![
            Cell::new(format!(
                "{} ({})",
                failure.instrument.name, failure.instrument.symbol
            )),
            ui::na_cell(true),
            ui::na_cell(true),
            ui::na_cell(true),
            Cell::new(ui::style_text(&failure.error.to_string(), ui::StyleType::Subtle)),
        ]);
    }

    table.add_row(vec![
        Cell::new(ui::style_text("Overall return", ui::StyleType::TotalLabel))
            .add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        ui::change_cell(overall.value),
    ]);
    table.add_row(vec![
        Cell::new(ui::style_text(
            &format!("Annualized return ({} days)", returns.days),
            ui::StyleType::TotalLabel,
        ))
        .add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        ui::change_cell(returns.value),
    ]);

    table.to_string()
}
