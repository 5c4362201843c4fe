use actix_web::{web, App, HttpResponse, HttpServer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;

use crate::engine::AnalyticsEngine;
use crate::model::{StudentId, StudentRecords};
use crate::summary::summarize_student;

/// Engine plus the record set loaded at startup.
pub struct AppState {
    pub engine: AnalyticsEngine,
    pub students: BTreeMap<StudentId, StudentRecords>,
}

impl AppState {
    pub fn new(engine: AnalyticsEngine, students: BTreeMap<StudentId, StudentRecords>) -> Self {
        Self { engine, students }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CohortRequest {
    pub students: BTreeMap<StudentId, StudentRecords>,
}

fn bad_request(err: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: err.to_string(),
    })
}

// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("Student Analytics API is running!")
}

async fn analyze_student(
    body: web::Json<StudentRecords>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let records = body.into_inner();
    if let Err(err) = records.validate() {
        tracing::warn!("rejected student analysis request: {}", err);
        return bad_request(err);
    }
    HttpResponse::Ok().json(state.engine.analyze_records(&records))
}

async fn analyze_cohort(
    body: web::Json<CohortRequest>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let request = body.into_inner();
    for (student_id, records) in &request.students {
        if let Err(err) = records.validate() {
            tracing::warn!(student_id, "rejected cohort analysis request: {}", err);
            return bad_request(format!("student {student_id}: {err}"));
        }
    }
    HttpResponse::Ok().json(state.engine.analyze_cohort(&request.students))
}

async fn stored_student_analytics(
    path: web::Path<StudentId>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let student_id = path.into_inner();
    let analysis = match state.students.get(&student_id) {
        Some(records) => state.engine.analyze_records(records),
        None => state.engine.analyze_records(&StudentRecords::default()),
    };
    HttpResponse::Ok().json(analysis)
}

async fn stored_student_summary(
    path: web::Path<StudentId>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let student_id = path.into_inner();
    let summary = match state.students.get(&student_id) {
        Some(records) => summarize_student(&records.interactions, &records.attempts),
        None => summarize_student(&[], &[]),
    };
    HttpResponse::Ok().json(summary)
}

async fn stored_class_analytics(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.engine.analyze_cohort(&state.students))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/api/analytics/student", web::post().to(analyze_student))
        .route("/api/analytics/cohort", web::post().to(analyze_cohort))
        .route(
            "/api/student_analytics/{student_id}",
            web::get().to(stored_student_analytics),
        )
        .route(
            "/api/students/{student_id}/summary",
            web::get().to(stored_student_summary),
        )
        .route("/api/class_analytics", web::get().to(stored_class_analytics));
}

pub async fn start_api(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let state = web::Data::new(state);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
        .bind(addr)?
        .run()
        .await
}
