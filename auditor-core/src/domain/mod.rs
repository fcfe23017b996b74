//! Core domain types
//!
//! These types mirror the resources exposed by the scan API. The client only
//! ever reads them; every mutation happens server-side.

pub mod finding;
pub mod job;
pub mod metrics;
pub mod target;
pub mod user;
