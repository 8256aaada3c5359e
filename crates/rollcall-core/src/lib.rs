//! Core types and rules for the rollcall attendance tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! models shifts, per-user shift assignments, and the daily check-in /
//! check-out state machine, and defines the [`store::AttendanceStore`] trait
//! that storage backends implement.

pub mod assignment;
pub mod attendance;
pub mod error;
pub mod resolver;
pub mod shift;
pub mod store;
pub mod time;
pub mod tracker;

pub use error::{Error, Result};
pub use tracker::Tracker;
