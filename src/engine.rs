use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::analytics;
use crate::cohort::{self, StudentFeatures};
use crate::features::{AttemptTable, InteractionTable};
use crate::learners::{
    FeatureScaler, KMeansGrouper, LinearTrendFitter, StandardScaler, StudentGrouper, TrendFitter,
};
use crate::model::{
    AttemptRecord, CohortAnalysis, InteractionRecord, PerStudentAnalysis, StudentId,
    StudentRecords,
};
use crate::recommendations::{student_recommendations, StudentSignals};

/// Runs the per-student and cohort analyses.
///
/// The engine only holds learner *configurations*. Every call fits fresh
/// parameters and returns them inside the result, so a single instance can
/// be shared across threads without locking.
pub struct AnalyticsEngine {
    scaler: Box<dyn FeatureScaler>,
    grouper: Box<dyn StudentGrouper>,
    fitter: Box<dyn TrendFitter>,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::with_learners(
            Box::new(StandardScaler),
            Box::new(KMeansGrouper::default()),
            Box::new(LinearTrendFitter),
        )
    }

    pub fn with_learners(
        scaler: Box<dyn FeatureScaler>,
        grouper: Box<dyn StudentGrouper>,
        fitter: Box<dyn TrendFitter>,
    ) -> Self {
        Self {
            scaler,
            grouper,
            fitter,
        }
    }

    pub fn analyze_student(
        &self,
        interactions: &[InteractionRecord],
        attempts: &[AttemptRecord],
    ) -> PerStudentAnalysis {
        if interactions.is_empty() && attempts.is_empty() {
            return PerStudentAnalysis::empty();
        }

        let interaction_table = InteractionTable::from_records(interactions);
        let attempt_table = AttemptTable::from_records(attempts);

        let performance_metrics = analytics::performance_metrics(&attempt_table);
        let learning_patterns = analytics::learning_patterns(&interaction_table);
        let engagement_score = analytics::engagement_score(&interaction_table);
        let progress_trend = analytics::progress_trend(&attempt_table, self.fitter.as_ref());
        let predicted_performance = analytics::predict_performance(&attempt_table, &progress_trend);

        let recommendations = student_recommendations(&StudentSignals {
            average_score: (!attempt_table.is_empty()).then_some(performance_metrics.average_score),
            engagement: (!interaction_table.is_empty()).then_some(engagement_score),
            learning_consistency: learning_patterns.learning_consistency,
        });

        tracing::debug!(
            interactions = interactions.len(),
            attempts = attempts.len(),
            engagement = engagement_score,
            trend = ?progress_trend.trend,
            "analyzed student"
        );

        PerStudentAnalysis {
            performance_metrics,
            learning_patterns,
            engagement_score,
            difficulty_areas: analytics::difficulty_areas(&attempt_table),
            progress_trend,
            recommendations,
            predicted_performance,
        }
    }

    pub fn analyze_records(&self, records: &StudentRecords) -> PerStudentAnalysis {
        self.analyze_student(&records.interactions, &records.attempts)
    }

    pub fn analyze_cohort(&self, students: &BTreeMap<StudentId, StudentRecords>) -> CohortAnalysis {
        if students.is_empty() {
            return CohortAnalysis::empty();
        }

        let rows: Vec<StudentFeatures> = students
            .iter()
            .map(|(&student_id, records)| {
                let analysis = self.analyze_records(records);
                let interactions = InteractionTable::from_records(&records.interactions);
                StudentFeatures::from_analysis(student_id, &interactions, &analysis)
            })
            .collect();

        let groups = cohort::assign_groups(&rows, self.scaler.as_ref(), self.grouper.as_ref());
        tracing::debug!(students = rows.len(), "analyzed cohort");
        cohort::summarize_cohort(&rows, &groups)
    }
}

/// Process-wide engine for callers that do not manage their own.
pub fn shared() -> &'static AnalyticsEngine {
    static ENGINE: OnceLock<AnalyticsEngine> = OnceLock::new();
    ENGINE.get_or_init(AnalyticsEngine::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::learners::TrendFit;
    use ndarray::Array1;

    struct NeverFits;

    impl TrendFitter for NeverFits {
        fn fit(&self, _: &Array1<f64>, _: &Array1<f64>) -> Result<TrendFit> {
            Err(Error::degenerate("refused"))
        }
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnalyticsEngine>();
    }

    #[test]
    fn failed_fit_degrades_to_sentinel() {
        use crate::model::TrendLabel;
        use chrono::NaiveDate;

        let engine = AnalyticsEngine::with_learners(
            Box::new(StandardScaler),
            Box::new(KMeansGrouper::default()),
            Box::new(NeverFits),
        );
        let attempts: Vec<AttemptRecord> = (1..=4)
            .map(|day| AttemptRecord {
                student_id: 1,
                quiz_id: 1,
                score: 10.0 * day as f64,
                total_points: 50.0,
                completed_at: NaiveDate::from_ymd_opt(2024, 2, day)
                    .and_then(|d| d.and_hms_opt(12, 0, 0))
                    .unwrap(),
            })
            .collect();
        let analysis = engine.analyze_student(&[], &attempts);
        assert_eq!(analysis.progress_trend.trend, TrendLabel::InsufficientData);
        assert_eq!(analysis.predicted_performance.confidence, 0.0);
        assert_eq!(analysis.performance_metrics.total_attempts, 4);
    }
}
