//! # student_analytics
//!
//! Engagement and performance analytics for school platforms.
//!
//! Callers hand in already-loaded interaction and quiz-attempt records and
//! get back a plain result structure:
//! - [`analyze_student`] scores one student's performance, habits,
//!   engagement, trend and next-attempt prediction, with advice.
//! - [`analyze_cohort`] runs the same analysis for every student, groups
//!   them with k-means and flags at-risk students and top performers.
//!
//! Neither call fails: sparse input yields zero values and
//! `"insufficient_data"` markers instead of errors.
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use student_analytics::{analyze_cohort, analyze_student, StudentRecords};
//!
//! let report = analyze_student(&[], &[]);
//! assert_eq!(report.engagement_score, 0.0);
//!
//! let mut cohort = BTreeMap::new();
//! cohort.insert(7, StudentRecords::default());
//! let class = analyze_cohort(&cohort);
//! assert_eq!(class.class_overview.total_students, 1);
//! ```

use std::collections::BTreeMap;

pub use config::Config;
pub use engine::AnalyticsEngine;
pub use error::{Error, Result};
pub use model::*;
pub use summary::{summarize_student, StudentSummary};

pub mod analytics;
pub mod cohort;
pub mod config;
pub mod data;
pub mod demo;
pub mod engine;
pub mod error;
pub mod features;
pub mod learners;
pub mod logging;
pub mod model;
pub mod recommendations;
pub mod server;
pub mod summary;

/// Analyzes one student with the process-wide engine.
pub fn analyze_student(
    interactions: &[InteractionRecord],
    attempts: &[AttemptRecord],
) -> PerStudentAnalysis {
    engine::shared().analyze_student(interactions, attempts)
}

/// Analyzes a cohort with the process-wide engine.
pub fn analyze_cohort(students: &BTreeMap<StudentId, StudentRecords>) -> CohortAnalysis {
    engine::shared().analyze_cohort(students)
}
