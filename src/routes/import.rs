use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::pipeline::aggregate::{self, ActivityInput};
use crate::routes::activity::ActivitySummary;
use crate::state::AppState;
use crate::types::vendor::{StreamSet, VendorActivity, VendorLap};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/import", post(import_activity))
}

/// A vendor detail payload with its optional lap list and stream bundle,
/// as fetched by the client.
#[derive(Deserialize)]
struct ImportRequest {
    activity: VendorActivity,
    #[serde(default)]
    laps: Vec<VendorLap>,
    streams: Option<StreamSet>,
}

async fn import_activity(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ActivitySummary>, AppError> {
    let input = ActivityInput::VendorApi {
        detail: req.activity,
        laps: req.laps,
        streams: req.streams,
    };

    let activity = tokio::task::spawn_blocking(move || aggregate::aggregate(input))
        .await
        .map_err(|e| AppError::Internal(format!("Import task failed: {}", e)))?;

    let activity_id = Uuid::new_v4().to_string();
    tracing::info!(
        "Imported vendor activity {} as {} ({} trackpoints)",
        activity.id,
        activity_id,
        activity.trackpoints.len()
    );

    let summary = ActivitySummary::new(activity_id.clone(), &activity);
    state.insert(activity_id, activity);

    Ok(Json(summary))
}
