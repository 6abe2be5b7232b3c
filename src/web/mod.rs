//! HTTP server adapter built on warp.
//!
//! [warp::run_webserver] binds the address derived from the platform
//! (`BIND_ADDRESS`, or `0.0.0.0:$PORT`), traces each request and stops on
//! termination signals. [info_service] exposes application metadata read
//! from `VCAP_APPLICATION`.

pub mod error;
pub mod info_service;
pub mod warp;

/// Port used when the platform provides no `PORT`.
pub const DEFAULT_PORT: u16 = 8080;
