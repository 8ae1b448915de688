//! Derived statistics over game logs: composites, trailing windows,
//! leaderboards, pivots and win/loss summaries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{GameRecord, Outcome};

/// A statistic defined as the sum of other statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composite {
    pub label: String,
    pub fields: Vec<String>,
}

impl Composite {
    pub fn new(label: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            label: label.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Points + rebounds + assists
    pub fn pra() -> Self {
        Self::new("P+R+A", &["PTS", "REB", "AST"])
    }

    /// Parse `PTS+REB+AST`; the label is the input as given
    pub fn parse(spec: &str) -> Option<Self> {
        let fields: Vec<String> = spec
            .split('+')
            .map(|f| f.trim().to_ascii_uppercase())
            .filter(|f| !f.is_empty())
            .collect();
        if fields.len() < 2 {
            return None;
        }
        Some(Self {
            label: spec.trim().to_string(),
            fields,
        })
    }

    /// Sum of the named fields; missing fields count as 0
    pub fn value(&self, record: &GameRecord) -> f64 {
        self.fields
            .iter()
            .map(|f| record.stat(f).unwrap_or(0.0))
            .sum()
    }
}

/// Copy of `records` with the composite stored on every record
pub fn with_composite(records: &[GameRecord], composite: &Composite) -> Vec<GameRecord> {
    records
        .iter()
        .map(|r| {
            let value = composite.value(r);
            r.clone().with_stat(composite.label.clone(), value)
        })
        .collect()
}

/// Make `stat` available on `records` and return the column name to read.
///
/// A column already present (as typed or uppercased) is used as is;
/// otherwise `PTS+AST` style input is derived as a composite.
pub fn ensure_stat(records: &mut Vec<GameRecord>, stat: &str) -> String {
    let stat = stat.trim();
    let upper = stat.to_ascii_uppercase();
    for name in [stat, upper.as_str()] {
        if records.iter().any(|r| r.stats.contains_key(name)) {
            return name.to_string();
        }
    }
    match Composite::parse(stat) {
        Some(composite) => {
            *records = with_composite(records, &composite);
            composite.label
        }
        None => upper,
    }
}

/// Mean of `stat` over the records that carry it
pub fn mean(records: &[GameRecord], stat: &str) -> Option<f64> {
    let values: Vec<f64> = records.iter().filter_map(|r| r.stat(stat)).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// First `n` records (providers return newest first)
pub fn recent(records: &[GameRecord], n: usize) -> &[GameRecord] {
    &records[..n.min(records.len())]
}

/// The `n` most recent distinct game dates, newest first
pub fn trailing_dates(records: &[GameRecord], n: usize) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();
    dates.truncate(n);
    dates
}

/// Records played on one of the `n` most recent dates
pub fn within_trailing_dates(records: &[GameRecord], n: usize) -> Vec<GameRecord> {
    let dates = trailing_dates(records, n);
    records
        .iter()
        .filter(|r| dates.contains(&r.date))
        .cloned()
        .collect()
}

/// Sub-entity ranked by the mean of a statistic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leader {
    pub player: String,
    pub mean: f64,
    pub games: usize,
}

/// Top `k` players by mean `stat` over the trailing `window` distinct dates.
///
/// Descending by mean; equal means keep the order in which the players first
/// appear in `records`.
pub fn top_k_by_mean(records: &[GameRecord], stat: &str, window: usize, k: usize) -> Vec<Leader> {
    let dates = trailing_dates(records, window);

    let mut order: Vec<(String, f64, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records.iter().filter(|r| dates.contains(&r.date)) {
        let (Some(player), Some(value)) = (record.player.as_ref(), record.stat(stat)) else {
            continue;
        };
        let slot = *index.entry(player.clone()).or_insert_with(|| {
            order.push((player.clone(), 0.0, 0));
            order.len() - 1
        });
        order[slot].1 += value;
        order[slot].2 += 1;
    }

    let mut leaders: Vec<Leader> = order
        .into_iter()
        .map(|(player, sum, games)| Leader {
            player,
            mean: sum / games as f64,
            games,
        })
        .collect();

    // Stable sort keeps first-appearance order for ties
    leaders.sort_by(|a, b| b.mean.total_cmp(&a.mean));
    leaders.truncate(k);
    leaders
}

/// One row of a player-by-date table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRow {
    pub player: String,
    pub values: Vec<f64>,
}

/// Player-by-date table of one statistic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatTable {
    pub stat: String,
    /// Column dates, newest first
    pub dates: Vec<NaiveDate>,
    /// Rows sorted by player name
    pub rows: Vec<StatRow>,
}

/// Pivot `records` into players x dates; empty cells are 0
pub fn pivot(records: &[GameRecord], stat: &str) -> StatTable {
    let mut dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();

    let mut rows: Vec<StatRow> = Vec::new();
    for record in records {
        let Some(player) = record.player.as_ref() else {
            continue;
        };
        let Ok(col) = dates.binary_search_by(|d| record.date.cmp(d)) else {
            continue;
        };
        let row = match rows.iter().position(|r| &r.player == player) {
            Some(i) => &mut rows[i],
            None => {
                rows.push(StatRow {
                    player: player.clone(),
                    values: vec![0.0; dates.len()],
                });
                let last = rows.len() - 1;
                &mut rows[last]
            }
        };
        row.values[col] = record.stat(stat).unwrap_or(0.0);
    }

    rows.sort_by(|a, b| a.player.cmp(&b.player));
    StatTable {
        stat: stat.to_string(),
        dates,
        rows,
    }
}

/// Win/loss/draw counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub wins: usize,
    pub losses: usize,
    pub draws: usize,
}

impl RecordSummary {
    pub fn games(&self) -> usize {
        self.wins + self.losses + self.draws
    }

    /// Wins over games with a known outcome; `None` when there are none
    pub fn win_rate(&self) -> Option<f64> {
        match self.games() {
            0 => None,
            games => Some(self.wins as f64 / games as f64),
        }
    }
}

pub fn record_summary(records: &[GameRecord]) -> RecordSummary {
    records
        .iter()
        .fold(RecordSummary::default(), |mut acc, r| {
            match r.outcome {
                Some(Outcome::Win) => acc.wins += 1,
                Some(Outcome::Loss) => acc.losses += 1,
                Some(Outcome::Draw) => acc.draws += 1,
                None => {}
            }
            acc
        })
}

pub fn win_rate(records: &[GameRecord]) -> Option<f64> {
    record_summary(records).win_rate()
}

/// How often a statistic cleared a betting line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSummary {
    pub line: f64,
    pub over: usize,
    pub under: usize,
    pub push: usize,
}

impl LineSummary {
    pub fn games(&self) -> usize {
        self.over + self.under + self.push
    }

    pub fn over_rate(&self) -> Option<f64> {
        match self.games() {
            0 => None,
            games => Some(self.over as f64 / games as f64),
        }
    }
}

pub fn line_summary(records: &[GameRecord], stat: &str, line: f64) -> LineSummary {
    let mut summary = LineSummary {
        line,
        over: 0,
        under: 0,
        push: 0,
    };
    for value in records.iter().filter_map(|r| r.stat(stat)) {
        if value > line {
            summary.over += 1;
        } else if value < line {
            summary.under += 1;
        } else {
            summary.push += 1;
        }
    }
    summary
}
