//! Size and age reports over observed file records.

use crate::observer::{DATE_FORMAT, FileRecord};
use chrono::NaiveDateTime;
use colored::{Color, Colorize};
use serde::Serialize;
use std::collections::BTreeMap;

/// Total size and file count for one extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionSummary {
    pub ext: String,
    pub size: u64,
    pub count: usize,
}

/// Number of files sharing an extension and a creation date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeBucket {
    pub ext: String,
    pub date: String,
    pub count: usize,
}

/// Groups records by extension, largest total size first.
///
/// Ties are broken by extension name so the output is stable.
pub fn summarize(records: &[FileRecord]) -> Vec<ExtensionSummary> {
    let mut groups: BTreeMap<&str, (u64, usize)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(record.extension.as_str()).or_insert((0, 0));
        entry.0 += record.size;
        entry.1 += 1;
    }

    let mut summary: Vec<_> = groups
        .into_iter()
        .map(|(ext, (size, count))| ExtensionSummary {
            ext: ext.to_string(),
            size,
            count,
        })
        .collect();
    summary.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.ext.cmp(&b.ext)));
    summary
}

/// Counts records per (extension, date), oldest date first.
///
/// Dates that do not parse with [`DATE_FORMAT`] sort after all valid ones.
pub fn file_age(records: &[FileRecord]) -> Vec<AgeBucket> {
    let mut groups: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for record in records {
        *groups
            .entry((record.extension.as_str(), record.date.as_str()))
            .or_insert(0) += 1;
    }

    let mut buckets: Vec<_> = groups
        .into_iter()
        .map(|((ext, date), count)| AgeBucket {
            ext: ext.to_string(),
            date: date.to_string(),
            count,
        })
        .collect();
    buckets.sort_by_key(|b| {
        let parsed = NaiveDateTime::parse_from_str(&b.date, DATE_FORMAT).ok();
        (parsed.is_none(), parsed, b.ext.clone())
    });
    buckets
}

const PALETTE: [Color; 6] = [
    Color::Cyan,
    Color::Green,
    Color::Yellow,
    Color::Magenta,
    Color::Blue,
    Color::Red,
];

/// Renders a proportional bar chart of sizes per extension.
///
/// Each row shows the extension, a bar whose length is its share of the total
/// size scaled to `width` cells, and the share as a percentage. The largest
/// slice is marked with `*`.
pub fn render_chart(summary: &[ExtensionSummary], width: usize) -> String {
    let total: u64 = summary.iter().map(|s| s.size).sum();
    let largest = summary
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.size.cmp(&b.size).then(ib.cmp(ia)))
        .map(|(i, _)| i);

    let labels: Vec<String> = summary.iter().map(|s| label_for(&s.ext)).collect();
    let label_width = labels.iter().map(|l| l.len()).max().unwrap_or(0);

    let mut out = String::from("File Size Distribution by Extension\n");
    for (i, (entry, label)) in summary.iter().zip(&labels).enumerate() {
        let share = if total == 0 {
            0.0
        } else {
            entry.size as f64 / total as f64
        };
        let cells = (share * width as f64).round() as usize;
        let bar = "█".repeat(cells).color(PALETTE[i % PALETTE.len()]);
        let marker = if Some(i) == largest { "*" } else { " " };

        out.push_str(&format!(
            "{marker} {label:<label_width$} {bar}{pad} {percent:>5.1}%\n",
            pad = " ".repeat(width.saturating_sub(cells)),
            percent = share * 100.0,
        ));
    }
    out
}

fn label_for(ext: &str) -> String {
    if ext.is_empty() {
        "(none)".to_string()
    } else {
        ext.to_string()
    }
}
