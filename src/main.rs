use std::collections::BTreeMap;

use student_analytics::server::{start_api, AppState};
use student_analytics::{data, demo, logging, AnalyticsEngine, Config, StudentId, StudentRecords};

fn load_students(config: &Config) -> student_analytics::Result<BTreeMap<StudentId, StudentRecords>> {
    match config.data_paths()? {
        Some((interactions_path, attempts_path)) => {
            let interactions = data::load_interactions(&interactions_path)?;
            let attempts = data::load_attempts(&attempts_path)?;
            tracing::info!(
                interactions = interactions.len(),
                attempts = attempts.len(),
                "loaded records from {}",
                interactions_path.display()
            );
            Ok(data::group_by_student(interactions, attempts))
        }
        None => {
            tracing::info!(
                students = config.demo_students,
                seed = config.demo_seed,
                "no data directory configured, seeding demo cohort"
            );
            let now = chrono::Utc::now().naive_utc();
            Ok(demo::demo_cohort(config.demo_students, config.demo_seed, now))
        }
    }
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config.log_level, config.file_log_dir.as_deref());

    let students = load_students(&config)?;
    tracing::info!(students = students.len(), "student records ready");

    let addr = config.bind_addr();
    tracing::info!("starting Student Analytics API on http://{}", addr);
    start_api(AppState::new(AnalyticsEngine::new(), students), addr).await?;

    Ok(())
}
