//! HTTP front for the cycle calculator.
//!
//! - `GET  /health`: liveness probe
//! - `POST /api/calculate-cycle`: cycle day and phase for a date

pub mod routes;

pub use routes::{app_router, CalculateCycleBody};
