use ndarray::Array2;
use std::collections::BTreeMap;

use crate::features::InteractionTable;
use crate::learners::{FeatureScaler, StudentGrouper};
use crate::model::{
    ClassOverview, CohortAnalysis, EngagementInsights, GroupProfile, PerStudentAnalysis,
    PerformanceDistribution, StudentGroup, StudentHighlight, StudentId, LESSON_VIEW,
};
use crate::recommendations::{cohort_recommendations, CohortSignals};

const TOP_PERFORMER_LIMIT: usize = 5;

/// Flat per-student row fed to grouping and the cohort summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentFeatures {
    pub student_id: StudentId,
    pub avg_score: f64,
    pub engagement: f64,
    /// Slope of the progress trend.
    pub progress_rate: f64,
    pub quiz_count: usize,
    pub lesson_views: usize,
}

impl StudentFeatures {
    pub fn from_analysis(
        student_id: StudentId,
        interactions: &InteractionTable<'_>,
        analysis: &PerStudentAnalysis,
    ) -> Self {
        Self {
            student_id,
            avg_score: finite_or_zero(analysis.performance_metrics.average_score),
            engagement: finite_or_zero(analysis.engagement_score),
            progress_rate: finite_or_zero(analysis.progress_trend.slope),
            quiz_count: analysis.performance_metrics.total_attempts,
            lesson_views: interactions.count_of_type(LESSON_VIEW),
        }
    }

    pub fn is_at_risk(&self) -> bool {
        self.avg_score < 60.0 || self.engagement < 30.0 || self.progress_rate < -2.0
    }

    pub fn is_top_performer(&self) -> bool {
        self.avg_score >= 85.0 && self.engagement >= 70.0
    }

    fn highlight(&self) -> StudentHighlight {
        StudentHighlight {
            student_id: self.student_id,
            avg_score: self.avg_score,
            engagement: self.engagement,
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// `avg_score, engagement, progress_rate, quiz_count, lesson_views` per row.
pub fn feature_matrix(rows: &[StudentFeatures]) -> Array2<f64> {
    let mut matrix = Array2::zeros((rows.len(), 5));
    for (idx, row) in rows.iter().enumerate() {
        matrix[[idx, 0]] = row.avg_score;
        matrix[[idx, 1]] = row.engagement;
        matrix[[idx, 2]] = row.progress_rate;
        matrix[[idx, 3]] = row.quiz_count as f64;
        matrix[[idx, 4]] = row.lesson_views as f64;
    }
    matrix
}

/// Group id per row. Cohorts smaller than the group count, and fits that
/// fail, put everyone in group 0.
pub fn assign_groups(
    rows: &[StudentFeatures],
    scaler: &dyn FeatureScaler,
    grouper: &dyn StudentGrouper,
) -> Vec<usize> {
    if rows.len() < grouper.n_groups() {
        return vec![0; rows.len()];
    }

    let scaled = scaler.fit_transform(&feature_matrix(rows));
    match grouper.fit_predict(&scaled) {
        Ok(labels) => labels.to_vec(),
        Err(err) => {
            tracing::debug!(students = rows.len(), "grouping degenerate: {}", err);
            vec![0; rows.len()]
        }
    }
}

fn mean_of(rows: &[&StudentFeatures], value: impl Fn(&StudentFeatures) -> f64) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|row| value(row)).sum::<f64>() / rows.len() as f64
}

pub fn class_overview(rows: &[StudentFeatures]) -> ClassOverview {
    let all: Vec<&StudentFeatures> = rows.iter().collect();
    ClassOverview {
        total_students: rows.len(),
        average_score: mean_of(&all, |row| row.avg_score),
        average_engagement: mean_of(&all, |row| row.engagement),
        total_quiz_attempts: rows.iter().map(|row| row.quiz_count).sum(),
        total_lesson_views: rows.iter().map(|row| row.lesson_views).sum(),
    }
}

pub fn performance_distribution(rows: &[StudentFeatures]) -> PerformanceDistribution {
    let mut distribution = PerformanceDistribution::default();
    for row in rows {
        match row.avg_score {
            score if score >= 90.0 => distribution.excellent += 1,
            score if score >= 80.0 => distribution.good += 1,
            score if score >= 70.0 => distribution.satisfactory += 1,
            _ => distribution.needs_improvement += 1,
        }
    }
    distribution
}

/// Summary per non-empty group, keyed `group_<id>`.
pub fn student_groups(rows: &[StudentFeatures], groups: &[usize]) -> BTreeMap<String, StudentGroup> {
    let mut members: BTreeMap<usize, Vec<&StudentFeatures>> = BTreeMap::new();
    for (row, &group) in rows.iter().zip(groups) {
        members.entry(group).or_default().push(row);
    }

    members
        .into_iter()
        .map(|(group, rows)| {
            let avg_score = mean_of(&rows, |row| row.avg_score);
            let avg_engagement = mean_of(&rows, |row| row.engagement);
            (
                format!("group_{group}"),
                StudentGroup {
                    size: rows.len(),
                    avg_score,
                    avg_engagement,
                    characteristics: GroupProfile::describe(avg_score, avg_engagement),
                },
            )
        })
        .collect()
}

pub fn at_risk_students(rows: &[StudentFeatures]) -> Vec<StudentHighlight> {
    rows.iter()
        .filter(|row| row.is_at_risk())
        .map(StudentFeatures::highlight)
        .collect()
}

/// Up to five top performers, best average first; ties keep input order.
pub fn top_performers(rows: &[StudentFeatures]) -> Vec<StudentHighlight> {
    let mut top: Vec<&StudentFeatures> = rows.iter().filter(|row| row.is_top_performer()).collect();
    top.sort_by(|a, b| {
        b.avg_score
            .partial_cmp(&a.avg_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    top.into_iter()
        .take(TOP_PERFORMER_LIMIT)
        .map(StudentFeatures::highlight)
        .collect()
}

pub fn engagement_insights(rows: &[StudentFeatures]) -> EngagementInsights {
    let mut insights = EngagementInsights::default();
    for row in rows {
        match row.engagement {
            engagement if engagement >= 70.0 => insights.highly_engaged += 1,
            engagement if engagement >= 40.0 => insights.moderately_engaged += 1,
            _ => insights.low_engagement += 1,
        }
    }
    let all: Vec<&StudentFeatures> = rows.iter().collect();
    insights.average_engagement = mean_of(&all, |row| row.engagement);
    insights
}

/// Assembles the cohort result from feature rows and their group ids.
pub fn summarize_cohort(rows: &[StudentFeatures], groups: &[usize]) -> CohortAnalysis {
    if rows.is_empty() {
        return CohortAnalysis::empty();
    }

    let class_overview = class_overview(rows);
    let at_risk_students = at_risk_students(rows);
    let recommendations = cohort_recommendations(&CohortSignals {
        average_score: class_overview.average_score,
        average_engagement: class_overview.average_engagement,
        at_risk_count: at_risk_students.len(),
        total_students: rows.len(),
    });

    CohortAnalysis {
        performance_distribution: performance_distribution(rows),
        student_groups: student_groups(rows, groups),
        top_performers: top_performers(rows),
        engagement_insights: engagement_insights(rows),
        class_overview,
        at_risk_students,
        recommendations,
    }
}
