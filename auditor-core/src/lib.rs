//! Auditor Core
//!
//! Core types shared by the Auditor client crates.
//!
//! This crate contains:
//! - Domain types: entities returned by the scan API (Job, Finding, Target, ...)
//! - DTOs: request payloads and query parameters sent to the API

pub mod domain;
pub mod dto;
