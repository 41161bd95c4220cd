//! Shared test helpers
//!
//! Each integration test binary pulls in the subset it needs.
#![allow(dead_code)]

pub mod fixtures;
pub mod mock_platform;
