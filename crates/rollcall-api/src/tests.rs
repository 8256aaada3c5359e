//! Router tests driven through `tower::ServiceExt::oneshot` against an
//! in-memory SQLite store and a pinned clock.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::{Duration, NaiveDateTime};
use rollcall_core::{Tracker, time::FixedClock};
use rollcall_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

fn at(s: &str) -> NaiveDateTime {
  NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

async fn app(now: &str) -> (Router, Arc<FixedClock>) {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let clock = Arc::new(FixedClock::new(at(now)));
  let tracker = Tracker::new(Arc::new(store), Arc::clone(&clock));
  (api_router(tracker), clock)
}

async fn send(
  app:    &Router,
  method: &str,
  uri:    &str,
  body:   Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = app
    .clone()
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap();

  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, json)
}

/// Shift "Day" 09:00-17:00, shift "Night" 22:00-06:00, user "alice" assigned
/// to "Day".
async fn seed(app: &Router) {
  let (s, _) = send(
    app,
    "POST",
    "/shifts",
    Some(json!({ "name": "Day", "start": "09:00", "end": "17:00" })),
  )
  .await;
  assert_eq!(s, StatusCode::CREATED);
  let (s, _) = send(
    app,
    "POST",
    "/shifts",
    Some(json!({ "name": "Night", "start": "22:00", "end": "06:00" })),
  )
  .await;
  assert_eq!(s, StatusCode::CREATED);
  let (s, _) = send(
    app,
    "POST",
    "/users",
    Some(json!({ "user_id": "alice", "name": "Alice" })),
  )
  .await;
  assert_eq!(s, StatusCode::CREATED);
  let (s, _) = send(
    app,
    "POST",
    "/users/alice/shifts",
    Some(json!({ "shift_name": "Day" })),
  )
  .await;
  assert_eq!(s, StatusCode::CREATED);
}

// ── Shifts ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_shift_reports_derived_fields() {
  let (app, _) = app("2024-05-14 08:00").await;
  let (status, body) = send(
    &app,
    "POST",
    "/shifts",
    Some(json!({ "name": "Night", "start": "22:00", "end": "6:00" })),
  )
  .await;

  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["name"], "Night");
  assert_eq!(body["end"], "06:00");
  assert_eq!(body["tolerance_minutes"], 15);
  assert_eq!(body["overnight"], true);
  assert_eq!(body["duration"], "8:00");
}

#[tokio::test]
async fn bad_shift_input_is_rejected() {
  let (app, _) = app("2024-05-14 08:00").await;
  seed(&app).await;

  let (status, body) = send(
    &app,
    "POST",
    "/shifts",
    Some(json!({ "name": "Odd", "start": "9:5", "end": "17:00" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("9:5"));

  let (status, _) = send(
    &app,
    "POST",
    "/shifts",
    Some(json!({ "name": "Day", "start": "10:00", "end": "18:00" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) = send(&app, "GET", "/shifts/Ghost", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deactivated_shift_is_hidden_from_active_list() {
  let (app, _) = app("2024-05-14 08:00").await;
  seed(&app).await;

  let (status, body) = send(
    &app,
    "PATCH",
    "/shifts/Night",
    Some(json!({ "active": false })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["active"], false);

  let (_, all) = send(&app, "GET", "/shifts", None).await;
  assert_eq!(all.as_array().unwrap().len(), 2);
  let (_, active) = send(&app, "GET", "/shifts?active_only=true", None).await;
  let active = active.as_array().unwrap();
  assert_eq!(active.len(), 1);
  assert_eq!(active[0]["name"], "Day");
}

#[tokio::test]
async fn rename_carries_assignments_and_delete_is_guarded() {
  let (app, _) = app("2024-05-14 08:00").await;
  seed(&app).await;

  let (status, body) = send(
    &app,
    "POST",
    "/shifts/Day/rename",
    Some(json!({ "new_name": "Morning" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["name"], "Morning");

  let (_, set) = send(&app, "GET", "/users/alice/shifts", None).await;
  assert_eq!(set, json!([{ "shift_name": "Morning", "is_default": false }]));

  let (status, _) = send(&app, "DELETE", "/shifts/Morning", None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) = send(&app, "DELETE", "/users/alice/shifts/Morning", None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = send(&app, "DELETE", "/shifts/Morning", None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
}

// ── Users and assignments ───────────────────────────────────────────────────

#[tokio::test]
async fn assignment_endpoints_keep_one_default() {
  let (app, _) = app("2024-05-14 08:00").await;
  seed(&app).await;

  let (status, _) = send(
    &app,
    "POST",
    "/users/alice/shifts",
    Some(json!({ "shift_name": "Day" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, set) = send(
    &app,
    "POST",
    "/users/alice/shifts",
    Some(json!({ "shift_name": "Night", "is_default": true })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(set[1]["is_default"], true);

  let (status, set) = send(&app, "POST", "/users/alice/shifts/Day/default", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(
    set,
    json!([
      { "shift_name": "Day", "is_default": true },
      { "shift_name": "Night", "is_default": false }
    ])
  );

  let (status, body) = send(
    &app,
    "PUT",
    "/users/alice/shifts",
    Some(json!([{ "shift_name": "Ghost" }, { "shift_name": "Day" }])),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("Ghost"));

  let (status, _) = send(&app, "DELETE", "/users/alice/shifts/Ghost", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_directory_round_trip() {
  let (app, _) = app("2024-05-14 09:00").await;
  seed(&app).await;

  let (status, _) = send(
    &app,
    "POST",
    "/users",
    Some(json!({ "user_id": "alice", "name": "Again" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, user) = send(&app, "GET", "/users/alice", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(user["name"], "Alice");

  send(&app, "POST", "/attendance", Some(json!({ "user_id": "alice" }))).await;

  let (status, body) = send(&app, "DELETE", "/users/alice", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["attendance_removed"], 1);

  let (status, _) = send(&app, "GET", "/users/alice", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = send(&app, "DELETE", "/users/alice", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn current_shift_follows_the_clock() {
  let (app, clock) = app("2024-05-14 12:00").await;
  seed(&app).await;

  let (_, body) = send(&app, "GET", "/users/alice/current-shift", None).await;
  assert_eq!(body["name"], "Day");

  clock.set(at("2024-05-14 20:00"));
  let (status, body) = send(&app, "GET", "/users/alice/current-shift", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, Value::Null);
}

// ── Attendance ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn check_in_then_out() {
  let (app, clock) = app("2024-05-14 08:50").await;
  seed(&app).await;

  let (status, body) =
    send(&app, "POST", "/attendance", Some(json!({ "user_id": "alice" }))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["action"], "checked_in");
  assert_eq!(body["record"]["check_in"]["status"], "on_time");
  assert_eq!(body["record"]["date"], "2024-05-14");

  clock.advance(Duration::seconds(20));
  let (status, _) =
    send(&app, "POST", "/attendance", Some(json!({ "user_id": "alice" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  clock.set(at("2024-05-14 16:00"));
  let (status, body) =
    send(&app, "POST", "/attendance", Some(json!({ "user_id": "alice" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["action"], "checked_out");
  assert_eq!(body["record"]["check_out"]["status"], "early");
  assert_eq!(body["record"]["check_out"]["minutes_early"], 60);
  assert_eq!(body["record"]["work_duration"], "7:10");
  assert!(body["message"].as_str().unwrap().contains("60 minutes"));

  clock.set(at("2024-05-14 16:30"));
  let (status, _) =
    send(&app, "POST", "/attendance", Some(json!({ "user_id": "alice" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn rejected_attendance_maps_to_client_errors() {
  let (app, clock) = app("2024-05-14 19:00").await;
  seed(&app).await;

  let (status, body) =
    send(&app, "POST", "/attendance", Some(json!({ "user_id": "alice" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("no active shift"));

  let (status, _) =
    send(&app, "POST", "/attendance", Some(json!({ "user_id": "ghost" }))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  // A default shift resolves at any hour; the check-in window still applies.
  send(&app, "POST", "/users/alice/shifts/Day/default", None).await;
  clock.set(at("2024-05-14 08:30"));
  let (status, body) =
    send(&app, "POST", "/attendance", Some(json!({ "user_id": "alice" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("08:30"));
}

#[tokio::test]
async fn status_and_history() {
  let (app, clock) = app("2024-05-14 09:00").await;
  seed(&app).await;

  let uri = "/attendance/status?user_id=alice&shift_name=Day";
  let (status, body) = send(&app, "GET", uri, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["state"], "none");
  assert_eq!(body["record"], Value::Null);

  send(&app, "POST", "/attendance", Some(json!({ "user_id": "alice" }))).await;
  let (_, body) = send(&app, "GET", uri, None).await;
  assert_eq!(body["state"], "checked_in");

  clock.set(at("2024-05-15 09:05"));
  send(&app, "POST", "/attendance", Some(json!({ "user_id": "alice" }))).await;

  let (_, body) = send(
    &app,
    "GET",
    "/attendance/status?user_id=alice&shift_name=Day&date=2024-05-14",
    None,
  )
  .await;
  assert_eq!(body["state"], "checked_in");

  let (status, list) = send(&app, "GET", "/attendance?user_id=alice", None).await;
  assert_eq!(status, StatusCode::OK);
  let dates: Vec<_> = list
    .as_array()
    .unwrap()
    .iter()
    .map(|r| r["date"].as_str().unwrap().to_owned())
    .collect();
  assert_eq!(dates, ["2024-05-15", "2024-05-14"]);

  let (_, list) = send(&app, "GET", "/attendance?from=2024-05-15&limit=10", None).await;
  assert_eq!(list.as_array().unwrap().len(), 1);
}
