use std::error::Error;

use chrono::Days;
use chrono::NaiveDate;
use frontier_rs::market::InMemorySource;
use frontier_rs::market::PriceObservation;
use frontier_rs::report::summary_table;
use frontier_rs::returns::TRADING_DAYS_PER_YEAR;
use frontier_rs::PortfolioEngine;
use frontier_rs::PortfolioEngineConfig;

fn synthetic(start: NaiveDate, drift: f64, freq: f64, days: u64) -> Vec<PriceObservation> {
  let mut price = 100.0;
  (0..days)
    .map(|t| {
      price *= 1.0 + drift + 0.01 * (t as f64 * freq).sin();
      PriceObservation::new(start + Days::new(t), price)
    })
    .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
  let start = NaiveDate::from_ymd_opt(2024, 1, 2).ok_or("invalid start date")?;
  let end = start + Days::new(251);

  let source = InMemorySource::new()
    .with_prices("BOND", synthetic(start, 0.0002, 0.9, 252))
    .with_prices("VALUE", synthetic(start, 0.0004, 1.3, 252))
    .with_prices("GROWTH", synthetic(start, 0.0006, 0.4, 252));

  let config = PortfolioEngineConfig {
    periods_per_year: Some(TRADING_DAYS_PER_YEAR),
    ..PortfolioEngineConfig::default()
  };
  let mut engine = PortfolioEngine::new(source, config);
  let report = engine.optimize(&["BOND", "VALUE", "GROWTH"], start, end)?;

  summary_table(&report).printstd();
  println!("\nfrontier ({} points)", report.frontier.len());
  for p in &report.frontier {
    println!("  return {:>8.4}  volatility {:>8.4}", p.expected_return, p.volatility);
  }

  Ok(())
}
