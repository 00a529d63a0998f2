use axum::extract::Multipart;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::pipeline::batch::{self, UploadedFile};
use crate::pipeline::parse::FileFormat;
use crate::routes::activity::ActivitySummary;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/upload", post(upload))
}

#[derive(Serialize, Deserialize)]
struct UploadResponse {
    activities: Vec<ActivitySummary>,
    failures: Vec<UploadFailure>,
}

#[derive(Serialize, Deserialize)]
struct UploadFailure {
    file_name: String,
    error: String,
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        if field.name().unwrap_or("") != "file" {
            continue;
        }

        let name = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::BadRequest("No filename provided".to_string()))?;
        let format = FileFormat::from_filename(&name)
            .ok_or_else(|| AppError::BadRequest(format!("Unsupported file format: {}", name)))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file bytes: {}", e)))?
            .to_vec();

        tracing::info!("Received {} file: {} ({} bytes)", format.as_str(), name, bytes.len());
        files.push(UploadedFile {
            name,
            format,
            bytes,
        });
    }

    if files.is_empty() {
        return Err(AppError::BadRequest("No file provided".to_string()));
    }

    let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
    let results = tokio::task::spawn_blocking(move || batch::ingest_files(&files))
        .await
        .map_err(|e| AppError::Internal(format!("Ingestion task failed: {}", e)))?;

    let mut activities = Vec::new();
    let mut failures = Vec::new();
    let mut first_error = None;

    for (file_name, result) in names.into_iter().zip(results) {
        match result {
            Ok(activity) => {
                let activity_id = Uuid::new_v4().to_string();
                tracing::info!(
                    "Uploaded file {} with ID {} ({} trackpoints, {:.2} km)",
                    file_name,
                    activity_id,
                    activity.trackpoints.len(),
                    activity.distance / 1000.0
                );
                activities.push(ActivitySummary::new(activity_id.clone(), &activity));
                state.insert(activity_id, activity);
            }
            Err(err) => {
                failures.push(UploadFailure {
                    file_name,
                    error: err.to_string(),
                });
                first_error.get_or_insert(err);
            }
        }
    }

    if activities.is_empty() {
        if let Some(err) = first_error {
            return Err(err.into());
        }
    }

    Ok(Json(UploadResponse {
        activities,
        failures,
    }))
}
