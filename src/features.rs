//! Normalized per-student feature tables.
//!
//! Raw records carry optional fields and arrive in whatever order the caller
//! fetched them. The tables built here substitute defaults for the missing
//! values and fix the ordering the metrics rely on.

use chrono::{NaiveDate, NaiveDateTime};
use ndarray::Array1;
use std::collections::BTreeMap;

use crate::model::{AttemptRecord, InteractionRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionRow<'a> {
    pub timestamp: NaiveDateTime,
    pub interaction_type: &'a str,
    pub content_id: Option<i64>,
    pub duration: f64,
    pub performance_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRow {
    pub completed_at: NaiveDateTime,
    pub score: f64,
    pub total_points: f64,
    pub score_percentage: f64,
    pub quiz_id: i64,
}

/// Interactions in input order, with missing duration and score set to 0.
#[derive(Debug, Clone, Default)]
pub struct InteractionTable<'a> {
    rows: Vec<InteractionRow<'a>>,
}

impl<'a> InteractionTable<'a> {
    pub fn from_records(records: &'a [InteractionRecord]) -> Self {
        let rows = records
            .iter()
            .map(|record| InteractionRow {
                timestamp: record.timestamp,
                interaction_type: record.interaction_type.as_str(),
                content_id: record.content_id,
                duration: record.duration.unwrap_or(0.0),
                performance_score: record.performance_score.unwrap_or(0.0),
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[InteractionRow<'a>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn durations(&self) -> Array1<f64> {
        self.rows.iter().map(|row| row.duration).collect()
    }

    pub fn count_of_type(&self, interaction_type: &str) -> usize {
        self.rows
            .iter()
            .filter(|row| row.interaction_type == interaction_type)
            .count()
    }

    /// Interaction count per calendar day, ordered by day.
    pub fn daily_counts(&self) -> BTreeMap<NaiveDate, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.timestamp.date()).or_insert(0) += 1;
        }
        counts
    }

    pub fn first_and_last(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.rows.iter().map(|row| row.timestamp).min()?;
        let last = self.rows.iter().map(|row| row.timestamp).max()?;
        Some((first, last))
    }
}

/// Attempts sorted ascending by completion time.
#[derive(Debug, Clone, Default)]
pub struct AttemptTable {
    rows: Vec<AttemptRow>,
}

impl AttemptTable {
    pub fn from_records(records: &[AttemptRecord]) -> Self {
        let mut rows: Vec<AttemptRow> = records
            .iter()
            .map(|record| AttemptRow {
                completed_at: record.completed_at,
                score: record.score,
                total_points: record.total_points,
                score_percentage: record.score_percentage(),
                quiz_id: record.quiz_id,
            })
            .collect();
        rows.sort_by_key(|row| row.completed_at);
        Self { rows }
    }

    pub fn rows(&self) -> &[AttemptRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn score_percentages(&self) -> Array1<f64> {
        self.rows.iter().map(|row| row.score_percentage).collect()
    }

    pub fn mean_score(&self) -> f64 {
        self.score_percentages().mean().unwrap_or(0.0)
    }
}
