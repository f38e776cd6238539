//! Remote gateway for the forum's JSON API.
//!
//! All HTTP lives here: feed pulls, the bookmark set, bookmark mutations,
//! and the fire-and-forget read report. Transient failures (rate limiting,
//! server errors) are retried with exponential backoff inside the gateway,
//! so callers see each operation as a single bounded call.

mod gateway;
mod types;

pub use gateway::{FeedQuery, FetchError, FetchedCollection, RemoteGateway};
