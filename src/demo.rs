//! Seeded synthetic cohort for demos and local runs.

use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use crate::model::{AttemptRecord, InteractionRecord, StudentId, StudentRecords, LESSON_VIEW, QUIZ_ATTEMPT};

const LESSON_IDS: [i64; 6] = [1, 2, 3, 4, 5, 6];
/// `(quiz_id, total_points)`
const QUIZZES: [(i64, f64); 2] = [(1, 10.0), (2, 8.0)];

const VIEW_PROBABILITY: f64 = 0.8;
const QUIZ_PROBABILITY: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PerformanceBand {
    High,
    Medium,
    Low,
}

impl PerformanceBand {
    fn pick(rng: &mut StdRng) -> Self {
        match rng.gen_range(0..3) {
            0 => PerformanceBand::High,
            1 => PerformanceBand::Medium,
            _ => PerformanceBand::Low,
        }
    }

    fn sample_fraction(self, rng: &mut StdRng) -> f64 {
        match self {
            PerformanceBand::High => rng.gen_range(0.8..=1.0),
            PerformanceBand::Medium => rng.gen_range(0.6..0.8),
            PerformanceBand::Low => rng.gen_range(0.3..0.6),
        }
    }
}

fn days_before(now: NaiveDateTime, rng: &mut StdRng, max_days: i64) -> NaiveDateTime {
    now - Duration::days(rng.gen_range(1..=max_days)) - Duration::hours(rng.gen_range(0..24))
}

/// Builds `students` students (ids `1..=students`) relative to `now`. The
/// same seed and `now` always produce the same records.
pub fn demo_cohort(students: usize, seed: u64, now: NaiveDateTime) -> BTreeMap<StudentId, StudentRecords> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut cohort = BTreeMap::new();

    for student_id in 1..=students as StudentId {
        let mut records = StudentRecords::default();

        for &lesson_id in &LESSON_IDS {
            if rng.gen_bool(VIEW_PROBABILITY) {
                records.interactions.push(InteractionRecord {
                    student_id,
                    timestamp: days_before(now, &mut rng, 30),
                    interaction_type: LESSON_VIEW.to_string(),
                    content_id: Some(lesson_id),
                    duration: Some(rng.gen_range(120..=600) as f64),
                    performance_score: None,
                });
            }
        }

        for &(quiz_id, total_points) in &QUIZZES {
            if !rng.gen_bool(QUIZ_PROBABILITY) {
                continue;
            }
            let fraction = PerformanceBand::pick(&mut rng).sample_fraction(&mut rng);
            let completed_at = days_before(now, &mut rng, 20);

            records.attempts.push(AttemptRecord {
                student_id,
                quiz_id,
                score: (total_points * fraction).floor(),
                total_points,
                completed_at,
            });
            records.interactions.push(InteractionRecord {
                student_id,
                timestamp: completed_at,
                interaction_type: QUIZ_ATTEMPT.to_string(),
                content_id: Some(quiz_id),
                duration: Some(rng.gen_range(300..=1200) as f64),
                performance_score: Some(fraction),
            });
        }

        cohort.insert(student_id, records);
    }

    cohort
}
