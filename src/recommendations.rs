//! Ordered rule tables for student and cohort advice.
//!
//! Rules are evaluated once, top to bottom. Rules sharing an exclusive tag
//! form an else-if chain: the first one that fires claims the tag and later
//! members are skipped.

use crate::model::{Action, LocalizedMessage, Priority, Recommendation, RecommendationKind};

const LOW_SCORE: f64 = 60.0;
const HIGH_SCORE: f64 = 85.0;
const LOW_ENGAGEMENT: f64 = 40.0;
const LOW_CONSISTENCY: f64 = 50.0;

const CLASS_SCORE_TARGET: f64 = 70.0;
const CLASS_ENGAGEMENT_TARGET: f64 = 50.0;
/// Share of the cohort at risk above which support is escalated.
const AT_RISK_SHARE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleGroup {
    Independent,
    Exclusive(&'static str),
}

pub struct Rule<C> {
    pub group: RuleGroup,
    pub applies: fn(&C) -> bool,
    pub build: fn(&C) -> Recommendation,
}

pub fn evaluate<C>(rules: &[Rule<C>], ctx: &C) -> Vec<Recommendation> {
    let mut claimed: Vec<&'static str> = Vec::new();
    let mut out = Vec::new();

    for rule in rules {
        if let RuleGroup::Exclusive(tag) = rule.group {
            if claimed.contains(&tag) {
                continue;
            }
        }
        if !(rule.applies)(ctx) {
            continue;
        }
        if let RuleGroup::Exclusive(tag) = rule.group {
            claimed.push(tag);
        }
        out.push((rule.build)(ctx));
    }

    out
}

fn message(en: &str, ar: &str, fr: &str) -> LocalizedMessage {
    LocalizedMessage {
        en: en.to_string(),
        ar: ar.to_string(),
        fr: fr.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Per student
// ---------------------------------------------------------------------------

/// What the student rules look at. Score and engagement are `None` when the
/// student has no attempts / no interactions, which silences their rules.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StudentSignals {
    pub average_score: Option<f64>,
    pub engagement: Option<f64>,
    pub learning_consistency: f64,
}

fn struggling(s: &StudentSignals) -> bool {
    s.average_score.is_some_and(|score| score < LOW_SCORE)
}

fn excelling(s: &StudentSignals) -> bool {
    s.average_score.is_some_and(|score| score > HIGH_SCORE)
}

fn disengaged(s: &StudentSignals) -> bool {
    s.engagement.is_some_and(|engagement| engagement < LOW_ENGAGEMENT)
}

fn irregular(s: &StudentSignals) -> bool {
    s.learning_consistency < LOW_CONSISTENCY
}

fn review_lessons(_: &StudentSignals) -> Recommendation {
    Recommendation {
        kind: RecommendationKind::Performance,
        priority: Priority::High,
        message: message(
            "Consider reviewing lesson materials before taking quizzes",
            "فكر في مراجعة مواد الدرس قبل أداء الاختبارات",
            "Considérez réviser les matériaux de cours avant de passer les quiz",
        ),
        action: Action::ReviewLessons,
    }
}

fn advanced_content(_: &StudentSignals) -> Recommendation {
    Recommendation {
        kind: RecommendationKind::Performance,
        priority: Priority::Low,
        message: message(
            "Excellent performance! Try more challenging content",
            "أداء ممتاز! جرب محتوى أكثر تحدياً",
            "Performance excellente! Essayez du contenu plus difficile",
        ),
        action: Action::AdvancedContent,
    }
}

fn increase_activity(_: &StudentSignals) -> Recommendation {
    Recommendation {
        kind: RecommendationKind::Engagement,
        priority: Priority::Medium,
        message: message(
            "Try to engage more regularly with the platform",
            "حاول التفاعل بانتظام أكثر مع المنصة",
            "Essayez de vous engager plus régulièrement avec la plateforme",
        ),
        action: Action::IncreaseActivity,
    }
}

fn schedule_study(_: &StudentSignals) -> Recommendation {
    Recommendation {
        kind: RecommendationKind::Consistency,
        priority: Priority::Medium,
        message: message(
            "Try to maintain a more consistent study schedule",
            "حاول الحفاظ على جدول دراسي أكثر انتظاماً",
            "Essayez de maintenir un horaire d'étude plus cohérent",
        ),
        action: Action::ScheduleStudy,
    }
}

pub const STUDENT_RULES: [Rule<StudentSignals>; 4] = [
    Rule {
        group: RuleGroup::Exclusive("performance"),
        applies: struggling,
        build: review_lessons,
    },
    Rule {
        group: RuleGroup::Exclusive("performance"),
        applies: excelling,
        build: advanced_content,
    },
    Rule {
        group: RuleGroup::Independent,
        applies: disengaged,
        build: increase_activity,
    },
    Rule {
        group: RuleGroup::Independent,
        applies: irregular,
        build: schedule_study,
    },
];

pub fn student_recommendations(signals: &StudentSignals) -> Vec<Recommendation> {
    evaluate(&STUDENT_RULES, signals)
}

// ---------------------------------------------------------------------------
// Per cohort
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CohortSignals {
    pub average_score: f64,
    pub average_engagement: f64,
    pub at_risk_count: usize,
    pub total_students: usize,
}

fn below_score_target(c: &CohortSignals) -> bool {
    c.average_score < CLASS_SCORE_TARGET
}

fn below_engagement_target(c: &CohortSignals) -> bool {
    c.average_engagement < CLASS_ENGAGEMENT_TARGET
}

fn many_at_risk(c: &CohortSignals) -> bool {
    c.at_risk_count as f64 > c.total_students as f64 * AT_RISK_SHARE
}

fn review_curriculum(_: &CohortSignals) -> Recommendation {
    Recommendation {
        kind: RecommendationKind::ClassPerformance,
        priority: Priority::High,
        message: message(
            "Class average is below target. Consider reviewing teaching methods or content difficulty.",
            "متوسط الفصل أقل من المستهدف. فكر في مراجعة طرق التدريس أو صعوبة المحتوى.",
            "La moyenne de la classe est en dessous de l'objectif. Considérez réviser les méthodes d'enseignement ou la difficulté du contenu.",
        ),
        action: Action::ReviewCurriculum,
    }
}

fn increase_interactivity(_: &CohortSignals) -> Recommendation {
    Recommendation {
        kind: RecommendationKind::ClassEngagement,
        priority: Priority::High,
        message: message(
            "Low class engagement. Consider adding more interactive content.",
            "مشاركة منخفضة في الفصل. فكر في إضافة محتوى تفاعلي أكثر.",
            "Faible engagement de la classe. Considérez ajouter plus de contenu interactif.",
        ),
        action: Action::IncreaseInteractivity,
    }
}

fn provide_support(c: &CohortSignals) -> Recommendation {
    let count = c.at_risk_count;
    Recommendation {
        kind: RecommendationKind::AtRisk,
        priority: Priority::High,
        message: LocalizedMessage {
            en: format!("{count} students need additional support."),
            ar: format!("{count} طلاب يحتاجون دعماً إضافياً."),
            fr: format!("{count} étudiants ont besoin de soutien supplémentaire."),
        },
        action: Action::ProvideSupport,
    }
}

pub const COHORT_RULES: [Rule<CohortSignals>; 3] = [
    Rule {
        group: RuleGroup::Independent,
        applies: below_score_target,
        build: review_curriculum,
    },
    Rule {
        group: RuleGroup::Independent,
        applies: below_engagement_target,
        build: increase_interactivity,
    },
    Rule {
        group: RuleGroup::Independent,
        applies: many_at_risk,
        build: provide_support,
    },
];

pub fn cohort_recommendations(signals: &CohortSignals) -> Vec<Recommendation> {
    evaluate(&COHORT_RULES, signals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actions(recs: &[Recommendation]) -> Vec<Action> {
        recs.iter().map(|rec| rec.action).collect()
    }

    #[test]
    fn low_score_and_irregular_both_fire() {
        let recs = student_recommendations(&StudentSignals {
            average_score: Some(45.0),
            engagement: Some(80.0),
            learning_consistency: 20.0,
        });
        assert_eq!(
            actions(&recs),
            vec![Action::ReviewLessons, Action::ScheduleStudy]
        );
        assert_eq!(recs[0].priority, Priority::High);
    }

    #[test]
    fn high_score_only_gets_advanced_content() {
        let recs = student_recommendations(&StudentSignals {
            average_score: Some(92.0),
            engagement: Some(90.0),
            learning_consistency: 100.0,
        });
        assert_eq!(actions(&recs), vec![Action::AdvancedContent]);
    }

    #[test]
    fn missing_signals_silence_their_rules() {
        let recs = student_recommendations(&StudentSignals {
            average_score: None,
            engagement: None,
            learning_consistency: 100.0,
        });
        assert!(recs.is_empty());
    }

    #[test]
    fn exclusive_tag_stops_later_members() {
        let rules: [Rule<f64>; 2] = [
            Rule {
                group: RuleGroup::Exclusive("band"),
                applies: |_| true,
                build: |_| review_lessons(&StudentSignals::default()),
            },
            Rule {
                group: RuleGroup::Exclusive("band"),
                applies: |_| true,
                build: |_| advanced_content(&StudentSignals::default()),
            },
        ];
        assert_eq!(actions(&evaluate(&rules, &0.0)), vec![Action::ReviewLessons]);
    }

    #[test]
    fn at_risk_count_is_interpolated() {
        let recs = cohort_recommendations(&CohortSignals {
            average_score: 75.0,
            average_engagement: 65.0,
            at_risk_count: 3,
            total_students: 10,
        });
        assert_eq!(actions(&recs), vec![Action::ProvideSupport]);
        assert!(recs[0].message.en.starts_with("3 students"));
        assert!(recs[0].message.fr.starts_with("3 étudiants"));
    }

    #[test]
    fn at_risk_share_must_exceed_a_fifth() {
        let signals = CohortSignals {
            average_score: 80.0,
            average_engagement: 80.0,
            at_risk_count: 2,
            total_students: 10,
        };
        assert!(cohort_recommendations(&signals).is_empty());
    }
}
