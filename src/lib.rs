//! Gazette - a single-author blog backend
//!
//! Persistence layer and admin JSON API: posts with a one-time publish
//! stamp, tag links, the blog settings batch and the one registered
//! user. All mutations run in explicit transactions with commit or
//! rollback as a unit.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
