use axum::{body::to_bytes, http::Request, Router};
use rideflow::{config::Config, routes, state::AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let config = Config::from_env();
    let state = AppState::new(config);
    Router::new()
        .merge(routes::health::router())
        .merge(routes::upload::router())
        .merge(routes::import::router())
        .merge(routes::activity::router())
        .with_state(state)
}

fn request(uri: &str, method: &str, body: Option<Value>) -> Request<axum::body::Body> {
    let builder = Request::builder().uri(uri).method(method);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(axum::body::Body::empty()).expect("request"),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json")
}

async fn import(app: &Router, bundle: Value) -> String {
    let response = app
        .clone()
        .oneshot(request("/api/import", "POST", Some(bundle)))
        .await
        .expect("response");
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    json_body(response).await["activity_id"]
        .as_str()
        .expect("activity id")
        .to_string()
}

fn bundle_with_streams() -> Value {
    json!({
        "activity": { "id": 1, "type": "Ride", "start_date": "2026-03-01T09:00:00Z" },
        "laps": [
            { "start_index": 0, "end_index": 1 },
            { "start_index": 2, "end_index": 2 }
        ],
        "streams": {
            "time": { "data": [0, 30, 60] },
            "distance": { "data": [0, 250, 480] },
            "latlng": { "data": [[10.0, 20.0], [10.5, 20.5], [11.0, 22.0]] }
        }
    })
}

#[tokio::test]
async fn route_projects_into_requested_canvas() {
    let app = app();
    let activity_id = import(&app, bundle_with_streams()).await;

    let response = app
        .oneshot(request(
            &format!("/api/activity/{activity_id}/route?width=400&height=400&padding=0"),
            "GET",
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let json = json_body(response).await;
    let points = json["points"].as_array().expect("points");
    assert_eq!(points.len(), 3);
    // Longitude spans 2 degrees and latitude 1, so width limits the scale to
    // 200 px/degree and the path is centered vertically.
    assert_eq!(points[0]["x"], 0.0);
    assert_eq!(points[0]["y"], 300.0);
    assert_eq!(points[2]["x"], 400.0);
    assert_eq!(points[2]["y"], 100.0);
    assert_eq!(json["lap_markers"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["lap_markers"][1]["lap_index"], 2);
}

#[tokio::test]
async fn route_falls_back_to_encoded_polyline() {
    let app = app();
    let activity_id = import(
        &app,
        json!({
            "activity": { "id": 2, "map": { "polyline": "_p~iF~ps|U_ulLnnqC_mqNvxq`@" } }
        }),
    )
    .await;

    let response = app
        .oneshot(request(&format!("/api/activity/{activity_id}/route"), "GET", None))
        .await
        .expect("response");
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["points"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn route_rejects_invalid_canvas() {
    let app = app();
    let activity_id = import(&app, bundle_with_streams()).await;

    let response = app
        .oneshot(request(
            &format!("/api/activity/{activity_id}/route?width=0&height=200"),
            "GET",
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn segment_resolves_and_validates_indices() {
    let app = app();
    let activity_id = import(&app, bundle_with_streams()).await;
    let uri = format!("/api/activity/{activity_id}/segment");

    let response = app
        .clone()
        .oneshot(request(&uri, "POST", Some(json!({ "start_index": 2, "end_index": 0 }))))
        .await
        .expect("response");
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let span = json_body(response).await;
    assert_eq!(span["distance"], 480.0);
    assert_eq!(span["duration"], 60.0);

    let response = app
        .oneshot(request(&uri, "POST", Some(json!({ "start_index": 0, "end_index": 3 }))))
        .await
        .expect("response");
    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    let error = json_body(response).await;
    assert!(error["error"].as_str().unwrap_or("").contains("out of range"));
}

#[tokio::test]
async fn unknown_activity_is_not_found() {
    let response = app()
        .oneshot(request("/api/activity/missing", "GET", None))
        .await
        .expect("response");
    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
}
