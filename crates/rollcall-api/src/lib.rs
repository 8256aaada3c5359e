//! JSON REST API for rollcall.
//!
//! Exposes an axum [`Router`] backed by a [`Tracker`] over any
//! [`rollcall_core::store::AttendanceStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rollcall_api::api_router(tracker.clone()))
//! ```

pub mod attendance;
pub mod error;
pub mod shifts;
pub mod users;

use axum::{
  Router,
  routing::{delete, get, post},
};
use rollcall_core::{Tracker, store::AttendanceStore, time::Clock};

pub use error::ApiError;

/// Build a fully-materialised API router for `tracker`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C>(tracker: Tracker<S, C>) -> Router<()>
where
  S: AttendanceStore + 'static,
  C: Clock + Clone + 'static,
{
  Router::new()
    // Attendance
    .route(
      "/attendance",
      get(attendance::list::<S, C>).post(attendance::mark::<S, C>),
    )
    .route("/attendance/status", get(attendance::status::<S, C>))
    // Shifts
    .route("/shifts", get(shifts::list::<S, C>).post(shifts::create::<S, C>))
    .route(
      "/shifts/{name}",
      get(shifts::get_one::<S, C>)
        .patch(shifts::update::<S, C>)
        .delete(shifts::delete_one::<S, C>),
    )
    .route("/shifts/{name}/rename", post(shifts::rename::<S, C>))
    // Users
    .route("/users", get(users::list::<S, C>).post(users::create::<S, C>))
    .route(
      "/users/{id}",
      get(users::get_one::<S, C>).delete(users::delete_one::<S, C>),
    )
    .route("/users/{id}/current-shift", get(users::current_shift::<S, C>))
    // Assignments
    .route(
      "/users/{id}/shifts",
      get(users::assignments::<S, C>)
        .put(users::replace_assignments::<S, C>)
        .post(users::assign::<S, C>),
    )
    .route("/users/{id}/shifts/{name}", delete(users::unassign::<S, C>))
    .route("/users/{id}/shifts/{name}/default", post(users::set_default::<S, C>))
    .with_state(tracker)
}

#[cfg(test)]
mod tests;
