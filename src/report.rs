//! # Report
//!
//! $$
//! (\sigma_p, \mathbb E[R_p]) \text{ plane: frontier, } \mathbf{w}_{\min\sigma},\ \mathbf{w}_{\max S},\ \text{assets}
//! $$
//!
//! Tabular and graphical views of an [`OptimizationReport`].

use plotly::common::Marker;
use plotly::common::Mode;
use plotly::common::Title;
use plotly::layout::Axis;
use plotly::Layout;
use plotly::Plot;
use plotly::Scatter;
use prettytable::Cell;
use prettytable::Row;
use prettytable::Table;

use crate::portfolio::OptimizationReport;
use crate::portfolio::Portfolio;

/// Weights rounded to `decimals`, keyed by asset id.
pub fn rounded_weights(portfolio: &Portfolio, ids: &[String], decimals: i32) -> Vec<(String, f64)> {
  let scale = 10f64.powi(decimals);
  ids
    .iter()
    .cloned()
    .zip(portfolio.weights.iter().map(|w| (w * scale).round() / scale))
    .collect()
}

/// One row per asset followed by the portfolio statistics.
pub fn weights_table(portfolio: &Portfolio, ids: &[String]) -> Table {
  let mut table = Table::new();
  table.set_titles(Row::new(vec![Cell::new("asset"), Cell::new("weight")]));

  for (id, w) in rounded_weights(portfolio, ids, 4) {
    table.add_row(Row::new(vec![Cell::new(&id), Cell::new(&format!("{w:.4}"))]));
  }

  let stats = [
    ("expected return", portfolio.expected_return),
    ("volatility", portfolio.volatility),
    ("sharpe", portfolio.sharpe),
  ];
  for (label, value) in stats {
    table.add_row(Row::new(vec![Cell::new(label), Cell::new(&format!("{value:.6}"))]));
  }

  table
}

/// Side-by-side weights of the minimum-variance and max-Sharpe portfolios.
pub fn summary_table(report: &OptimizationReport) -> Table {
  let mut table = Table::new();
  table.set_titles(Row::new(vec![
    Cell::new("asset"),
    Cell::new("min variance"),
    Cell::new("max sharpe"),
  ]));

  for (i, id) in report.ids().iter().enumerate() {
    table.add_row(Row::new(vec![
      Cell::new(id),
      Cell::new(&format!("{:.4}", report.min_variance.weights[i])),
      Cell::new(&format!("{:.4}", report.max_sharpe.weights[i])),
    ]));
  }
  table.add_row(Row::new(vec![
    Cell::new("volatility"),
    Cell::new(&format!("{:.6}", report.min_variance.volatility)),
    Cell::new(&format!("{:.6}", report.max_sharpe.volatility)),
  ]));
  table.add_row(Row::new(vec![
    Cell::new("sharpe"),
    Cell::new(&format!("{:.6}", report.min_variance.sharpe)),
    Cell::new(&format!("{:.6}", report.max_sharpe.sharpe)),
  ]));

  table
}

/// Frontier line with the two optimal portfolios and every single asset.
pub fn frontier_plot(report: &OptimizationReport) -> Plot {
  let mut plot = Plot::new();

  let frontier = Scatter::new(report.frontier.volatilities(), report.frontier.returns())
    .name("efficient frontier")
    .mode(Mode::Lines);
  plot.add_trace(frontier);

  let highlights = [
    ("min variance", &report.min_variance),
    ("max sharpe", &report.max_sharpe),
  ];
  for (name, p) in highlights {
    let trace = Scatter::new(vec![p.volatility], vec![p.expected_return])
      .name(name)
      .mode(Mode::Markers)
      .marker(Marker::new().size(12));
    plot.add_trace(trace);
  }

  let stats = &report.statistics;
  let vols = stats.volatilities();
  for (i, id) in stats.ids().iter().enumerate() {
    let trace = Scatter::new(vec![vols[i]], vec![stats.mean()[i]])
      .name(id)
      .mode(Mode::Markers);
    plot.add_trace(trace);
  }

  let layout = Layout::new()
    .title(Title::from("Efficient frontier"))
    .x_axis(Axis::new().title("volatility"))
    .y_axis(Axis::new().title("expected return"));
  plot.set_layout(layout);

  plot
}
