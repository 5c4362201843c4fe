use chrono::Timelike;
use ndarray::Array1;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::features::{AttemptTable, InteractionTable};
use crate::learners::TrendFitter;
use crate::model::{
    DifficultyArea, LearningPatterns, PerformanceMetrics, PredictedPerformance, Prediction,
    PreferredTime, ProgressTrend, TrendLabel, NO_DATA,
};

/// Interactions needed for the full frequency component.
const FREQUENCY_TARGET: f64 = 10.0;
/// Mean seconds per interaction needed for the full duration component.
const DURATION_TARGET: f64 = 300.0;
/// Distinct interaction kinds needed for the full variety component.
const VARIETY_TARGET: f64 = 3.0;

const FREQUENCY_WEIGHT: f64 = 30.0;
const DURATION_WEIGHT: f64 = 25.0;
const CONSISTENCY_WEIGHT: f64 = 25.0;
const VARIETY_WEIGHT: f64 = 20.0;

/// A quiz is a difficulty area when its mean falls below this share of the
/// student's overall mean.
const DIFFICULTY_RATIO: f64 = 0.8;
const PREDICTION_WINDOW: usize = 3;
const PREDICTION_HORIZON: f64 = 2.0;
const MAX_CONFIDENCE: f64 = 95.0;

pub fn performance_metrics(attempts: &AttemptTable) -> PerformanceMetrics {
    if attempts.is_empty() {
        return PerformanceMetrics::default();
    }

    let scores = attempts.score_percentages();
    PerformanceMetrics {
        average_score: scores.mean().unwrap_or(0.0),
        highest_score: scores.iter().copied().fold(f64::MIN, f64::max),
        lowest_score: scores.iter().copied().fold(f64::MAX, f64::min),
        total_attempts: attempts.len(),
        improvement_rate: improvement_rate(attempts),
    }
}

/// Mean of the last `n/2` attempts minus mean of the first `n/2`. With an
/// odd count the middle attempt belongs to neither half.
pub fn improvement_rate(attempts: &AttemptTable) -> f64 {
    let n = attempts.len();
    if n < 2 {
        return 0.0;
    }
    let half = n / 2;
    let scores = attempts.score_percentages();
    let head = scores.slice(ndarray::s![..half]).mean().unwrap_or(0.0);
    let tail = scores.slice(ndarray::s![n - half..]).mean().unwrap_or(0.0);
    tail - head
}

pub fn learning_patterns(interactions: &InteractionTable<'_>) -> LearningPatterns {
    if interactions.is_empty() {
        return LearningPatterns::default();
    }

    LearningPatterns {
        preferred_time: preferred_time(interactions),
        session_duration: interactions.durations().mean().unwrap_or(0.0),
        content_preference: content_preference(interactions)
            .unwrap_or(NO_DATA)
            .to_string(),
        learning_consistency: learning_consistency(interactions),
    }
}

/// Bucket of the modal hour of day; the earliest hour wins a tie.
pub fn preferred_time(interactions: &InteractionTable<'_>) -> PreferredTime {
    if interactions.is_empty() {
        return PreferredTime::NoData;
    }

    let mut per_hour = [0usize; 24];
    for row in interactions.rows() {
        per_hour[row.timestamp.hour() as usize] += 1;
    }

    let mut modal_hour = 0;
    for hour in 1..per_hour.len() {
        if per_hour[hour] > per_hour[modal_hour] {
            modal_hour = hour;
        }
    }
    PreferredTime::from_hour(modal_hour as u32)
}

/// Most frequent interaction type; the first seen wins a tie.
pub fn content_preference<'a>(interactions: &InteractionTable<'a>) -> Option<&'a str> {
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    for row in interactions.rows() {
        match counts.iter_mut().find(|(kind, _)| *kind == row.interaction_type) {
            Some((_, count)) => *count += 1,
            None => counts.push((row.interaction_type, 1)),
        }
    }

    let mut best: Option<(&'a str, usize)> = None;
    for (kind, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((kind, count));
        }
    }
    best.map(|(kind, _)| kind)
}

/// Percentage of calendar days between the first and last interaction
/// (inclusive) that saw any activity.
pub fn learning_consistency(interactions: &InteractionTable<'_>) -> f64 {
    let Some((first, last)) = interactions.first_and_last() else {
        return 0.0;
    };
    let active_days = interactions.daily_counts().len() as f64;
    let span_days = (last.date() - first.date()).num_days() + 1;
    if span_days <= 0 {
        return 0.0;
    }
    active_days / span_days as f64 * 100.0
}

/// The four capped components of the engagement score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EngagementBreakdown {
    pub frequency: f64,
    pub duration: f64,
    pub consistency: f64,
    pub variety: f64,
}

impl EngagementBreakdown {
    pub fn total(&self) -> f64 {
        (self.frequency + self.duration + self.consistency + self.variety).clamp(0.0, 100.0)
    }
}

pub fn engagement_breakdown(interactions: &InteractionTable<'_>) -> EngagementBreakdown {
    if interactions.is_empty() {
        return EngagementBreakdown::default();
    }

    let mean_duration = interactions.durations().mean().unwrap_or(0.0);
    EngagementBreakdown {
        frequency: (interactions.len() as f64 / FREQUENCY_TARGET).min(1.0) * FREQUENCY_WEIGHT,
        duration: (mean_duration / DURATION_TARGET).clamp(0.0, 1.0) * DURATION_WEIGHT,
        consistency: consistency_factor(interactions) * CONSISTENCY_WEIGHT,
        variety: variety_factor(interactions) * VARIETY_WEIGHT,
    }
}

/// Engagement on a 0–100 scale; 0 without interactions.
pub fn engagement_score(interactions: &InteractionTable<'_>) -> f64 {
    engagement_breakdown(interactions).total()
}

/// `1 - cv` of the per-day interaction counts (sample deviation), floored at
/// zero. A single active day is perfectly consistent.
pub fn consistency_factor(interactions: &InteractionTable<'_>) -> f64 {
    let daily: Array1<f64> = interactions
        .daily_counts()
        .values()
        .map(|&count| count as f64)
        .collect();

    match daily.len() {
        0 => 0.0,
        1 => 1.0,
        _ => {
            let mean = daily.mean().unwrap_or(0.0);
            if mean <= 0.0 {
                return 0.0;
            }
            let cv = daily.std(1.0) / mean;
            (1.0 - cv).max(0.0)
        }
    }
}

fn variety_factor(interactions: &InteractionTable<'_>) -> f64 {
    let mut kinds: Vec<&str> = interactions
        .rows()
        .iter()
        .map(|row| row.interaction_type)
        .collect();
    kinds.sort_unstable();
    kinds.dedup();
    (kinds.len() as f64 / VARIETY_TARGET).min(1.0)
}

/// Quizzes whose mean score is below 80% of the overall mean, by quiz id.
pub fn difficulty_areas(attempts: &AttemptTable) -> Vec<DifficultyArea> {
    if attempts.is_empty() {
        return Vec::new();
    }

    let overall = attempts.mean_score();
    let mut per_quiz: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for row in attempts.rows() {
        let entry = per_quiz.entry(row.quiz_id).or_insert((0.0, 0));
        entry.0 += row.score_percentage;
        entry.1 += 1;
    }

    per_quiz
        .into_iter()
        .filter_map(|(quiz_id, (total, count))| {
            let average_score = total / count as f64;
            (average_score < overall * DIFFICULTY_RATIO).then_some(DifficultyArea {
                quiz_id,
                average_score,
                attempts: count,
            })
        })
        .collect()
}

/// Linear fit of score percentage against attempt position.
pub fn progress_trend(attempts: &AttemptTable, fitter: &dyn TrendFitter) -> ProgressTrend {
    if attempts.len() < 2 {
        return ProgressTrend::default();
    }

    let positions: Array1<f64> = (0..attempts.len()).map(|idx| idx as f64).collect();
    match fitter.fit(&positions, &attempts.score_percentages()) {
        Ok(fit) => ProgressTrend {
            trend: TrendLabel::from_slope(fit.slope),
            slope: fit.slope,
            r_squared: fit.r_squared,
        },
        Err(err) => {
            tracing::debug!(attempts = attempts.len(), "trend fit degenerate: {}", err);
            ProgressTrend::default()
        }
    }
}

/// Projects the recent average two attempts ahead along the fitted slope.
pub fn predict_performance(attempts: &AttemptTable, trend: &ProgressTrend) -> PredictedPerformance {
    if attempts.len() < PREDICTION_WINDOW || trend.trend == TrendLabel::InsufficientData {
        return PredictedPerformance::default();
    }

    let scores = attempts.score_percentages();
    let recent = scores
        .slice(ndarray::s![scores.len() - PREDICTION_WINDOW..])
        .mean()
        .unwrap_or(0.0);
    let predicted = (recent + trend.slope * PREDICTION_HORIZON).clamp(0.0, 100.0);
    let confidence = (trend.r_squared * 100.0).clamp(0.0, MAX_CONFIDENCE);

    PredictedPerformance {
        prediction: Prediction::Score(predicted),
        confidence,
        trend: trend.trend,
    }
}
