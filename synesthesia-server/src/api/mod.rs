//! HTTP surface
//!
//! Producers connect on `/control` and editors on `/composer` (WebSocket); subscribers follow
//! `/broadcast` (SSE).

pub mod broadcast;
pub mod composer;
pub mod control;
pub mod health;

pub use health::health_routes;
