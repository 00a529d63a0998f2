use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::pipeline::project::Projection;
use crate::pipeline::segment::{self, SegmentSpan};
use crate::pipeline::{polyline, stats};
use crate::state::AppState;
use crate::types::activity::Activity;
use crate::types::viz::{ProjectedPoint, Rect};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/activity/:activity_id", get(get_activity))
        .route("/api/activity/:activity_id/route", get(get_route))
        .route("/api/activity/:activity_id/segment", post(resolve_segment))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub activity_id: String,
    pub source: String,
    pub name: String,
    pub sport: String,
    pub distance_km: f64,
    pub duration: String,
    pub elevation_gain_m: f64,
    pub avg_speed_kmh: Option<f64>,
    pub pace: Option<String>,
    pub lap_count: usize,
    pub trackpoint_count: usize,
    pub has_route: bool,
    pub has_heart_rate: bool,
    pub has_power: bool,
}

impl ActivitySummary {
    pub fn new(activity_id: String, activity: &Activity) -> Self {
        Self {
            activity_id,
            source: activity.source.as_str().to_string(),
            name: activity.name.clone(),
            sport: activity.sport.clone(),
            distance_km: activity.distance / 1000.0,
            duration: stats::format_duration(activity.moving_time.round() as u64),
            elevation_gain_m: activity.total_elevation_gain,
            avg_speed_kmh: activity.average_speed.map(|mps| mps * 3.6),
            pace: stats::pace_seconds_per_km(activity.distance, activity.moving_time)
                .map(stats::format_pace),
            lap_count: activity.laps.len(),
            trackpoint_count: activity.trackpoints.len(),
            has_route: activity.polyline.is_some(),
            has_heart_rate: activity.has_heart_rate(),
            has_power: activity.has_power(),
        }
    }
}

#[derive(Deserialize)]
struct RouteQuery {
    width: Option<f64>,
    height: Option<f64>,
    padding: Option<f64>,
}

#[derive(Serialize)]
struct RouteResponse {
    width: f64,
    height: f64,
    points: Vec<ProjectedPoint>,
    lap_markers: Vec<LapMarker>,
}

#[derive(Serialize)]
struct LapMarker {
    lap_index: u32,
    position: ProjectedPoint,
}

#[derive(Deserialize)]
struct SegmentRequest {
    start_index: usize,
    end_index: usize,
}

async fn get_activity(
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
) -> Result<Json<Activity>, AppError> {
    let activity = state
        .get(&activity_id)
        .ok_or_else(|| AppError::NotFound(activity_id.clone()))?;
    Ok(Json(Activity::clone(&activity)))
}

async fn get_route(
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
    Query(query): Query<RouteQuery>,
) -> Result<Json<RouteResponse>, AppError> {
    let activity = state
        .get(&activity_id)
        .ok_or_else(|| AppError::NotFound(activity_id.clone()))?;

    let config = state.config();
    let width = query.width.unwrap_or(config.route_width);
    let height = query.height.unwrap_or(config.route_height);
    let padding = query.padding.unwrap_or(config.route_padding);
    validate_canvas(width, height, padding)?;

    // Streams are the full-resolution path; fall back to the encoded summary.
    let mut coordinates = activity.coordinates();
    if coordinates.is_empty() {
        if let Some(encoded) = activity.polyline.as_deref() {
            coordinates = polyline::decode_default(encoded)?;
        }
    }

    let rect = Rect::sized(width, height);
    let Some(projection) = Projection::fit(&coordinates, rect, padding) else {
        return Ok(Json(RouteResponse {
            width,
            height,
            points: Vec::new(),
            lap_markers: Vec::new(),
        }));
    };

    let points = coordinates
        .iter()
        .map(|&(lat, lng)| projection.apply(lat, lng))
        .collect();
    let lap_markers = activity
        .laps
        .iter()
        .filter_map(|lap| {
            let (lat, lng) = activity
                .lap_points(lap)?
                .iter()
                .find_map(|p| p.coordinate())?;
            Some(LapMarker {
                lap_index: lap.lap_index,
                position: projection.apply(lat, lng),
            })
        })
        .collect();

    tracing::debug!(
        "Projected route for {} ({} points, {}x{})",
        activity_id,
        coordinates.len(),
        width,
        height
    );

    Ok(Json(RouteResponse {
        width,
        height,
        points,
        lap_markers,
    }))
}

async fn resolve_segment(
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
    Json(req): Json<SegmentRequest>,
) -> Result<Json<SegmentSpan>, AppError> {
    let activity = state
        .get(&activity_id)
        .ok_or_else(|| AppError::NotFound(activity_id.clone()))?;
    let span = segment::resolve(&activity.trackpoints, req.start_index, req.end_index)?;
    Ok(Json(span))
}

fn validate_canvas(width: f64, height: f64, padding: f64) -> Result<(), AppError> {
    const MAX_DIM: f64 = 8192.0;

    if !(width > 0.0 && width <= MAX_DIM && height > 0.0 && height <= MAX_DIM) {
        return Err(AppError::BadRequest(format!(
            "Invalid dimensions: {}x{}. Width/height must be in (0, {}]",
            width, height, MAX_DIM
        )));
    }
    if !(0.0..1.0).contains(&padding) {
        return Err(AppError::BadRequest(format!(
            "Invalid padding: {}. Use a fraction in [0, 1)",
            padding
        )));
    }
    Ok(())
}
