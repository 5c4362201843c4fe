use actix_web::{http::StatusCode, test, web, App};
use chrono::NaiveDate;
use serde_json::json;

use student_analytics::demo::demo_cohort;
use student_analytics::server::{routes, AppState, ErrorResponse};
use student_analytics::{AnalyticsEngine, CohortAnalysis, PerStudentAnalysis, StudentSummary};

fn state_with_demo_cohort() -> web::Data<AppState> {
    let now = NaiveDate::from_ymd_opt(2024, 10, 1)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .unwrap();
    web::Data::new(AppState::new(AnalyticsEngine::new(), demo_cohort(9, 42, now)))
}

#[actix_web::test]
async fn health_endpoint_responds() {
    let app = test::init_service(App::new().app_data(state_with_demo_cohort()).configure(routes)).await;
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn posted_records_are_analyzed() {
    let app = test::init_service(App::new().app_data(state_with_demo_cohort()).configure(routes)).await;
    let body = json!({
        "interactions": [
            {"student_id": 5, "timestamp": "2024-03-01T09:00:00", "interaction_type": "lesson_view", "content_id": 1, "duration": 300},
            {"student_id": 5, "timestamp": "2024-03-02T09:00:00", "interaction_type": "quiz_attempt", "content_id": 2, "duration": 600, "performance_score": 0.5}
        ],
        "attempts": [
            {"student_id": 5, "quiz_id": 2, "score": 5, "total_points": 10, "completed_at": "2024-03-02T09:10:00"}
        ]
    });
    let req = test::TestRequest::post()
        .uri("/api/analytics/student")
        .set_json(&body)
        .to_request();
    let analysis: PerStudentAnalysis = test::call_and_read_body_json(&app, req).await;

    assert_eq!(analysis.performance_metrics.total_attempts, 1);
    assert!((analysis.performance_metrics.average_score - 50.0).abs() < 1e-9);
    assert_eq!(analysis.learning_patterns.content_preference, "lesson_view");
}

#[actix_web::test]
async fn invalid_records_are_rejected() {
    let app = test::init_service(App::new().app_data(state_with_demo_cohort()).configure(routes)).await;
    let body = json!({
        "attempts": [
            {"student_id": 5, "quiz_id": 2, "score": 5, "total_points": -10, "completed_at": "2024-03-02T09:10:00"}
        ]
    });
    let req = test::TestRequest::post()
        .uri("/api/analytics/student")
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: ErrorResponse = test::read_body_json(resp).await;
    assert!(error.error.contains("total_points"));
}

#[actix_web::test]
async fn posted_cohort_is_analyzed() {
    let app = test::init_service(App::new().app_data(state_with_demo_cohort()).configure(routes)).await;
    let body = json!({
        "students": {
            "1": {"attempts": [{"student_id": 1, "quiz_id": 1, "score": 9, "total_points": 10, "completed_at": "2024-03-02T09:10:00"}]},
            "2": {"interactions": [], "attempts": []}
        }
    });
    let req = test::TestRequest::post()
        .uri("/api/analytics/cohort")
        .set_json(&body)
        .to_request();
    let analysis: CohortAnalysis = test::call_and_read_body_json(&app, req).await;

    assert_eq!(analysis.class_overview.total_students, 2);
    assert_eq!(analysis.performance_distribution.excellent, 1);
    assert_eq!(analysis.performance_distribution.needs_improvement, 1);
    assert_eq!(analysis.student_groups.len(), 1);
}

#[actix_web::test]
async fn stored_records_back_the_read_endpoints() {
    let state = state_with_demo_cohort();
    let expected_students = state.students.len();
    let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

    let req = test::TestRequest::get().uri("/api/class_analytics").to_request();
    let class: CohortAnalysis = test::call_and_read_body_json(&app, req).await;
    assert_eq!(class.class_overview.total_students, expected_students);
    assert_eq!(class.performance_distribution.total(), expected_students);

    let req = test::TestRequest::get().uri("/api/student_analytics/1").to_request();
    let student: PerStudentAnalysis = test::call_and_read_body_json(&app, req).await;
    let direct = state.engine.analyze_records(&state.students[&1]);
    assert_eq!(
        student.performance_metrics.total_attempts,
        direct.performance_metrics.total_attempts
    );
    assert!((student.engagement_score - direct.engagement_score).abs() < 1e-9);

    let req = test::TestRequest::get().uri("/api/student_analytics/999").to_request();
    let unknown: PerStudentAnalysis = test::call_and_read_body_json(&app, req).await;
    assert_eq!(unknown, PerStudentAnalysis::empty());

    let req = test::TestRequest::get().uri("/api/students/1/summary").to_request();
    let summary: StudentSummary = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summary.quizzes_taken, state.students[&1].attempts.len());
}

#[actix_web::test]
async fn empty_posted_cohort_is_zero_valued() {
    let app = test::init_service(App::new().app_data(state_with_demo_cohort()).configure(routes)).await;
    let req = test::TestRequest::post()
        .uri("/api/analytics/cohort")
        .set_json(json!({ "students": {} }))
        .to_request();
    let analysis: CohortAnalysis = test::call_and_read_body_json(&app, req).await;
    assert_eq!(analysis, CohortAnalysis::empty());
}
