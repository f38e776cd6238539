//! lurker - a polling topic-feed client for a Discourse-style forum.
//!
//! The crate splits into four layers:
//!
//! - [`remote`] - HTTP gateway for the forum's JSON API
//! - [`core`] - pure reconciliation logic (merge, read, bookmark, project, notify)
//! - [`storage`] - SQLite-backed key-value persistence
//! - [`app`] - orchestration tying the three together
//!
//! [`config`] holds the slow-moving knob file and [`util`] the display
//! helpers the binary uses for rendering.

pub mod app;
pub mod config;
pub mod core;
pub mod remote;
pub mod storage;
pub mod util;
