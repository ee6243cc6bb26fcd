// src/output/mod.rs
//! Presentation of the records the session returns. Nothing in the session
//! depends on this module.

use crate::core::order::Order;
use crate::types::{Candle, Quote};
use serde::Serialize;

/// A record that can be laid out as one table row.
pub trait Tabular {
    fn headers() -> &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

impl Tabular for Quote {
    fn headers() -> &'static [&'static str] {
        &["time", "symbol", "price"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.time.format("%Y-%m-%d %H:%M:%S").to_string(),
            self.symbol.clone(),
            self.price.to_string(),
        ]
    }
}

impl Tabular for Candle {
    fn headers() -> &'static [&'static str] {
        &["time", "open", "high", "low", "close", "volume"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.time.format("%Y-%m-%d %H:%M").to_string(),
            self.open.to_string(),
            self.high.to_string(),
            self.low.to_string(),
            self.close.to_string(),
            self.volume.to_string(),
        ]
    }
}

impl Tabular for Order {
    fn headers() -> &'static [&'static str] {
        &["id", "symbol", "direction", "amount", "status", "result"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.symbol.clone(),
            self.direction.to_string(),
            self.amount.to_string(),
            self.status.to_string(),
            self.result.to_string(),
        ]
    }
}

/// Left-aligned plain-text table with a header rule.
pub fn render_table<T: Tabular>(rows: &[T]) -> String {
    let headers = T::headers();
    let body: Vec<Vec<String>> = rows.iter().map(T::cells).collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &body {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let format_row = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(format_row(headers.iter().map(|h| h.to_string()).collect()));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in body {
        lines.push(format_row(row));
    }
    lines.join("\n")
}

/// One JSON object per line.
pub fn render_json<T: Serialize>(rows: &[T]) -> serde_json::Result<String> {
    let lines = rows
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}
