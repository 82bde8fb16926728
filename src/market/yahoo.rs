use anyhow::Context;
use chrono::DateTime;
use chrono::Datelike;
use chrono::NaiveDate;
use time::OffsetDateTime;
use yahoo_finance_api::YahooConnector;

use super::MarketDataSource;
use super::PriceObservation;
use crate::error::PortfolioError;
use crate::error::Result;

/// Adjusted daily closes from Yahoo Finance.
pub struct YahooSource {
  connector: YahooConnector,
}

impl YahooSource {
  pub fn new() -> Result<Self> {
    let connector = YahooConnector::new()
      .map_err(|err| PortfolioError::data_unavailable("*", format!("connector setup: {err}")))?;
    Ok(Self { connector })
  }

  fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> anyhow::Result<Vec<PriceObservation>> {
    let response = tokio_test::block_on(self.connector.get_quote_history(
      symbol,
      to_offset(start)?,
      to_offset(end.succ_opt().unwrap_or(end))?,
    ))
    .with_context(|| format!("quote history request for {symbol}"))?;
    let quotes = response.quotes().context("malformed quote payload")?;

    let mut out = Vec::with_capacity(quotes.len());
    for quote in quotes {
      let ts = i64::try_from(quote.timestamp).context("timestamp out of range")?;
      let date = DateTime::from_timestamp(ts, 0)
        .context("invalid quote timestamp")?
        .date_naive();
      if date < start || date > end || !quote.adjclose.is_finite() || quote.adjclose <= 0.0 {
        continue;
      }
      out.push(PriceObservation::new(date, quote.adjclose));
    }
    out.sort_by_key(|p| p.date);
    out.dedup_by_key(|p| p.date);

    anyhow::ensure!(!out.is_empty(), "no observations between {start} and {end}");
    Ok(out)
  }
}

fn to_offset(date: NaiveDate) -> anyhow::Result<OffsetDateTime> {
  let month = time::Month::try_from(date.month() as u8)?;
  Ok(
    time::Date::from_calendar_date(date.year(), month, date.day() as u8)?
      .midnight()
      .assume_utc(),
  )
}

impl MarketDataSource for YahooSource {
  fn fetch_prices(
    &self,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<PriceObservation>> {
    self.fetch(symbol, start, end).map_err(|err| {
      tracing::warn!(symbol, error = %err, "yahoo fetch failed");
      PortfolioError::data_unavailable(symbol, format!("{err:#}"))
    })
  }
}
