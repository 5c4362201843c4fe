use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

pub type StudentId = i64;

pub const LESSON_VIEW: &str = "lesson_view";
pub const QUIZ_ATTEMPT: &str = "quiz_attempt";
pub const PUZZLE_SOLVE: &str = "puzzle_solve";

pub const NO_DATA: &str = "No data";

// ---------------------------------------------------------------------------
// Input records
// ---------------------------------------------------------------------------

/// A logged student action.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InteractionRecord {
    pub student_id: StudentId,
    pub timestamp: NaiveDateTime,
    pub interaction_type: String,
    #[serde(default)]
    pub content_id: Option<i64>,
    /// Seconds spent, when the client reported it.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Fraction in [0, 1].
    #[serde(default)]
    pub performance_score: Option<f64>,
}

impl InteractionRecord {
    pub fn validate(&self) -> Result<()> {
        if self.interaction_type.trim().is_empty() {
            return Err(Error::invalid("interaction_type", "must not be empty"));
        }
        if let Some(duration) = self.duration {
            if !duration.is_finite() || duration < 0.0 {
                return Err(Error::invalid(
                    "duration",
                    format!("must be a non-negative number of seconds, got {duration}"),
                ));
            }
        }
        if let Some(score) = self.performance_score {
            if !(0.0..=1.0).contains(&score) {
                return Err(Error::invalid(
                    "performance_score",
                    format!("must be within [0, 1], got {score}"),
                ));
            }
        }
        Ok(())
    }
}

/// A completed quiz submission.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AttemptRecord {
    pub student_id: StudentId,
    pub quiz_id: i64,
    pub score: f64,
    pub total_points: f64,
    pub completed_at: NaiveDateTime,
}

impl AttemptRecord {
    pub fn validate(&self) -> Result<()> {
        if !self.total_points.is_finite() || self.total_points < 0.0 {
            return Err(Error::invalid(
                "total_points",
                format!("must be non-negative, got {}", self.total_points),
            ));
        }
        if !self.score.is_finite() || self.score < 0.0 {
            return Err(Error::invalid(
                "score",
                format!("must be non-negative, got {}", self.score),
            ));
        }
        Ok(())
    }

    /// `score / total_points * 100` capped to [0, 100], or 0 when the quiz
    /// carries no points.
    pub fn score_percentage(&self) -> f64 {
        if self.total_points > 0.0 {
            (self.score / self.total_points * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

/// Everything known about one student for a single analysis call.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct StudentRecords {
    #[serde(default)]
    pub interactions: Vec<InteractionRecord>,
    #[serde(default)]
    pub attempts: Vec<AttemptRecord>,
}

impl StudentRecords {
    pub fn new(interactions: Vec<InteractionRecord>, attempts: Vec<AttemptRecord>) -> Self {
        Self {
            interactions,
            attempts,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.interactions.iter().try_for_each(InteractionRecord::validate)?;
        self.attempts.iter().try_for_each(AttemptRecord::validate)
    }
}

// ---------------------------------------------------------------------------
// Per-student results
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PerformanceMetrics {
    pub average_score: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
    pub total_attempts: usize,
    pub improvement_rate: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum PreferredTime {
    Morning,
    Afternoon,
    Evening,
    Night,
    #[default]
    #[serde(rename = "No data")]
    NoData,
}

impl PreferredTime {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => PreferredTime::Morning,
            12..=17 => PreferredTime::Afternoon,
            18..=21 => PreferredTime::Evening,
            _ => PreferredTime::Night,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LearningPatterns {
    pub preferred_time: PreferredTime,
    pub session_duration: f64,
    pub content_preference: String,
    pub learning_consistency: f64,
}

impl Default for LearningPatterns {
    fn default() -> Self {
        Self {
            preferred_time: PreferredTime::NoData,
            session_duration: 0.0,
            content_preference: NO_DATA.to_string(),
            learning_consistency: 0.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DifficultyArea {
    pub quiz_id: i64,
    pub average_score: f64,
    pub attempts: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    Improving,
    Declining,
    Stable,
    #[default]
    InsufficientData,
}

impl TrendLabel {
    pub fn from_slope(slope: f64) -> Self {
        if slope > 2.0 {
            TrendLabel::Improving
        } else if slope < -2.0 {
            TrendLabel::Declining
        } else {
            TrendLabel::Stable
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ProgressTrend {
    pub trend: TrendLabel,
    pub slope: f64,
    /// Coefficient of determination of the fit.
    pub r_squared: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Unavailable {
    InsufficientData,
}

/// A predicted score, or the `"insufficient_data"` marker.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum Prediction {
    Score(f64),
    Unavailable(Unavailable),
}

impl Prediction {
    pub const INSUFFICIENT_DATA: Prediction = Prediction::Unavailable(Unavailable::InsufficientData);

    pub fn score(&self) -> Option<f64> {
        match self {
            Prediction::Score(score) => Some(*score),
            Prediction::Unavailable(_) => None,
        }
    }
}

impl Default for Prediction {
    fn default() -> Self {
        Prediction::INSUFFICIENT_DATA
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PredictedPerformance {
    pub prediction: Prediction,
    /// Percentage in [0, 95].
    pub confidence: f64,
    pub trend: TrendLabel,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Performance,
    Engagement,
    Consistency,
    ClassPerformance,
    ClassEngagement,
    AtRisk,
}

/// Machine-actionable tag a client can route on.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ReviewLessons,
    AdvancedContent,
    IncreaseActivity,
    ScheduleStudy,
    ReviewCurriculum,
    IncreaseInteractivity,
    ProvideSupport,
}

/// English, Arabic and French renderings of one message.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LocalizedMessage {
    #[serde(rename = "message")]
    pub en: String,
    #[serde(rename = "message_ar")]
    pub ar: String,
    #[serde(rename = "message_fr")]
    pub fr: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub priority: Priority,
    #[serde(flatten)]
    pub message: LocalizedMessage,
    pub action: Action,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PerStudentAnalysis {
    pub performance_metrics: PerformanceMetrics,
    pub learning_patterns: LearningPatterns,
    pub engagement_score: f64,
    pub difficulty_areas: Vec<DifficultyArea>,
    pub progress_trend: ProgressTrend,
    pub recommendations: Vec<Recommendation>,
    pub predicted_performance: PredictedPerformance,
}

impl PerStudentAnalysis {
    /// The zero-valued structure returned for a student with no records.
    pub fn empty() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Cohort results
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ClassOverview {
    pub total_students: usize,
    pub average_score: f64,
    pub average_engagement: f64,
    pub total_quiz_attempts: usize,
    pub total_lesson_views: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct PerformanceDistribution {
    pub excellent: usize,
    pub good: usize,
    pub satisfactory: usize,
    pub needs_improvement: usize,
}

impl PerformanceDistribution {
    pub fn total(&self) -> usize {
        self.excellent + self.good + self.satisfactory + self.needs_improvement
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum GroupProfile {
    #[serde(rename = "High performers with strong engagement")]
    HighPerformers,
    #[serde(rename = "Good performers but low engagement")]
    DisengagedPerformers,
    #[serde(rename = "Students needing additional support")]
    NeedsSupport,
    #[serde(rename = "Average performers")]
    Average,
}

impl GroupProfile {
    pub fn describe(avg_score: f64, avg_engagement: f64) -> Self {
        if avg_score >= 80.0 && avg_engagement >= 70.0 {
            GroupProfile::HighPerformers
        } else if avg_score >= 70.0 && avg_engagement < 50.0 {
            GroupProfile::DisengagedPerformers
        } else if avg_score < 60.0 {
            GroupProfile::NeedsSupport
        } else {
            GroupProfile::Average
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StudentGroup {
    pub size: usize,
    pub avg_score: f64,
    pub avg_engagement: f64,
    pub characteristics: GroupProfile,
}

/// A student singled out in a cohort list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StudentHighlight {
    pub student_id: StudentId,
    pub avg_score: f64,
    pub engagement: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct EngagementInsights {
    pub highly_engaged: usize,
    pub moderately_engaged: usize,
    pub low_engagement: usize,
    pub average_engagement: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CohortAnalysis {
    pub class_overview: ClassOverview,
    pub performance_distribution: PerformanceDistribution,
    /// Keyed `group_<id>`; groups with no members are omitted.
    pub student_groups: BTreeMap<String, StudentGroup>,
    pub at_risk_students: Vec<StudentHighlight>,
    pub top_performers: Vec<StudentHighlight>,
    pub engagement_insights: EngagementInsights,
    pub recommendations: Vec<Recommendation>,
}

impl CohortAnalysis {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap()
    }

    fn attempt(score: f64, total_points: f64) -> AttemptRecord {
        AttemptRecord {
            student_id: 1,
            quiz_id: 10,
            score,
            total_points,
            completed_at: at(1),
        }
    }

    #[test]
    fn score_percentage_is_zero_without_points() {
        assert_eq!(attempt(7.0, 0.0).score_percentage(), 0.0);
        assert!((attempt(3.0, 4.0).score_percentage() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn negative_total_points_is_rejected() {
        let err = attempt(1.0, -2.0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidInput { field: "total_points", .. }));
    }

    #[test]
    fn out_of_range_performance_score_is_rejected() {
        let record = InteractionRecord {
            student_id: 1,
            timestamp: at(2),
            interaction_type: LESSON_VIEW.to_string(),
            content_id: Some(3),
            duration: Some(60.0),
            performance_score: Some(1.5),
        };
        assert!(record.validate().is_err());
    }

    #[test]
    fn hour_buckets_cover_the_day() {
        assert_eq!(PreferredTime::from_hour(6), PreferredTime::Morning);
        assert_eq!(PreferredTime::from_hour(11), PreferredTime::Morning);
        assert_eq!(PreferredTime::from_hour(12), PreferredTime::Afternoon);
        assert_eq!(PreferredTime::from_hour(18), PreferredTime::Evening);
        assert_eq!(PreferredTime::from_hour(22), PreferredTime::Night);
        assert_eq!(PreferredTime::from_hour(3), PreferredTime::Night);
    }

    #[test]
    fn prediction_serializes_as_number_or_marker() {
        let json = serde_json::to_string(&Prediction::INSUFFICIENT_DATA).unwrap();
        assert_eq!(json, "\"insufficient_data\"");
        let json = serde_json::to_string(&Prediction::Score(72.5)).unwrap();
        assert_eq!(json, "72.5");
    }

    #[test]
    fn recommendation_flattens_localized_messages() {
        let rec = Recommendation {
            kind: RecommendationKind::Performance,
            priority: Priority::High,
            message: LocalizedMessage {
                en: "en".into(),
                ar: "ar".into(),
                fr: "fr".into(),
            },
            action: Action::ReviewLessons,
        };
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["type"], "performance");
        assert_eq!(value["message_fr"], "fr");
        assert_eq!(value["action"], "review_lessons");
    }

    #[test]
    fn group_profiles_cover_every_band_and_edge() {
        let cases = [
            (80.0, 70.0, GroupProfile::HighPerformers),
            (95.0, 90.0, GroupProfile::HighPerformers),
            (79.9, 70.0, GroupProfile::Average),
            (70.0, 49.9, GroupProfile::DisengagedPerformers),
            (85.0, 40.0, GroupProfile::DisengagedPerformers),
            (70.0, 50.0, GroupProfile::Average),
            (69.9, 49.9, GroupProfile::Average),
            (60.0, 60.0, GroupProfile::Average),
            (59.9, 60.0, GroupProfile::NeedsSupport),
            (30.0, 10.0, GroupProfile::NeedsSupport),
        ];
        for (score, engagement, expected) in cases {
            assert_eq!(
                GroupProfile::describe(score, engagement),
                expected,
                "score {score}, engagement {engagement}"
            );
        }

        let json = serde_json::to_value(GroupProfile::DisengagedPerformers).unwrap();
        assert_eq!(json, "Good performers but low engagement");
        let json = serde_json::to_value(GroupProfile::Average).unwrap();
        assert_eq!(json, "Average performers");
    }
}
