//! Data Transfer Objects
//!
//! Request bodies and query parameters sent to the scan API.

pub mod auth;
pub mod job;
pub mod target;
