use axum::{body::to_bytes, http::Request, Router};
use rideflow::{config::Config, routes, state::AppState};
use serde_json::Value;
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

fn sample_tcx() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<TrainingCenterDatabase xmlns="http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2">
  <Activities>
    <Activity Sport="Biking">
      <Id>2026-01-01T12:00:00Z</Id>
      <Lap StartTime="2026-01-01T12:00:00Z">
        <TotalTimeSeconds>10</TotalTimeSeconds>
        <DistanceMeters>95</DistanceMeters>
        <Track>
          <Trackpoint><Time>2026-01-01T12:00:00Z</Time><Position><LatitudeDegrees>52.52</LatitudeDegrees><LongitudeDegrees>13.405</LongitudeDegrees></Position><AltitudeMeters>34</AltitudeMeters><DistanceMeters>0</DistanceMeters><HeartRateBpm><Value>140</Value></HeartRateBpm></Trackpoint>
          <Trackpoint><Time>2026-01-01T12:00:10Z</Time><Position><LatitudeDegrees>52.5205</LatitudeDegrees><LongitudeDegrees>13.406</LongitudeDegrees></Position><AltitudeMeters>39</AltitudeMeters><DistanceMeters>95</DistanceMeters><HeartRateBpm><Value>145</Value></HeartRateBpm></Trackpoint>
        </Track>
      </Lap>
    </Activity>
  </Activities>
</TrainingCenterDatabase>"#
}

fn multipart_body(files: &[(&str, &str)], boundary: &str) -> String {
    let mut body = String::new();
    for (file_name, file_body) in files {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n{file_body}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    body
}

async fn post_upload(app: Router, body: String, boundary: &str) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .uri("/api/upload")
            .method("POST")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(axum::body::Body::from(body))
            .expect("request"),
    )
    .await
    .expect("response")
}

#[tokio::test]
async fn upload_tcx_returns_activity_summary() {
    let boundary = "X-BOUNDARY-TEST";
    let body = multipart_body(&[("ride.tcx", sample_tcx())], boundary);

    let response = post_upload(app(), body, boundary).await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: Value = serde_json::from_slice(&body).expect("json");
    let activity = &json["activities"][0];
    assert!(activity["activity_id"].is_string());
    assert_eq!(activity["source"], "file");
    assert_eq!(activity["sport"], "Biking");
    assert_eq!(activity["trackpoint_count"], 2);
    assert_eq!(activity["has_route"], true);
    assert_eq!(activity["has_heart_rate"], true);
    assert_eq!(activity["elevation_gain_m"], 5.0);
    assert_eq!(json["failures"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn upload_reports_bad_files_alongside_good_ones() {
    let boundary = "X-BOUNDARY-TEST";
    let body = multipart_body(
        &[("ride.tcx", sample_tcx()), ("broken.tcx", "<TrainingCenterDatabase>")],
        boundary,
    );

    let response = post_upload(app(), body, boundary).await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(json["activities"].as_array().map(Vec::len), Some(1));
    assert_eq!(json["failures"][0]["file_name"], "broken.tcx");
}

#[tokio::test]
async fn upload_rejects_document_without_activity() {
    let boundary = "X-BOUNDARY-TEST";
    let body = multipart_body(&[("empty.tcx", "<TrainingCenterDatabase/>")], boundary);

    let response = post_upload(app(), body, boundary).await;
    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);

    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let text = String::from_utf8(body.to_vec()).expect("utf8");
    assert!(text.contains("no Activity element"));
}

#[tokio::test]
async fn upload_rejects_unsupported_extension() {
    let boundary = "X-BOUNDARY-TEST";
    let body = multipart_body(&[("ride.txt", "hello")], boundary);

    let response = post_upload(app(), body, boundary).await;
    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}
