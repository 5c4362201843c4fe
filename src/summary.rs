use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::features::AttemptTable;
use crate::model::{AttemptRecord, InteractionRecord, LESSON_VIEW};

const RECENT_ATTEMPTS: usize = 5;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecentAttempt {
    pub quiz_id: i64,
    pub score: f64,
    pub total_points: f64,
    pub percentage: i64,
    pub completed_at: NaiveDateTime,
}

/// Headline activity numbers for a student dashboard.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct StudentSummary {
    pub lessons_viewed: usize,
    pub quizzes_taken: usize,
    /// Total points earned over total points available, as a rounded
    /// percentage.
    pub average_score: i64,
    pub recent_attempts: Vec<RecentAttempt>,
}

pub fn summarize_student(
    interactions: &[InteractionRecord],
    attempts: &[AttemptRecord],
) -> StudentSummary {
    let earned: f64 = attempts.iter().map(|attempt| attempt.score).sum();
    let possible: f64 = attempts.iter().map(|attempt| attempt.total_points).sum();
    let average_score = if possible > 0.0 {
        (earned / possible * 100.0).round() as i64
    } else {
        0
    };

    let table = AttemptTable::from_records(attempts);
    let skip = table.len().saturating_sub(RECENT_ATTEMPTS);
    let recent_attempts = table
        .rows()
        .iter()
        .skip(skip)
        .map(|row| RecentAttempt {
            quiz_id: row.quiz_id,
            score: row.score,
            total_points: row.total_points,
            percentage: row.score_percentage.round() as i64,
            completed_at: row.completed_at,
        })
        .collect();

    StudentSummary {
        lessons_viewed: interactions
            .iter()
            .filter(|interaction| interaction.interaction_type == LESSON_VIEW)
            .count(),
        quizzes_taken: attempts.len(),
        average_score,
        recent_attempts,
    }
}
