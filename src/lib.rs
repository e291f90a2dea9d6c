//! Slidegate - Per-Client Request Admission Service
//!
//! This crate implements a request admission controller that decides, per
//! client key, whether a request should be admitted under a configurable rate
//! rule. Decisions use a sliding window counter: the exact count of the
//! current aligned time window blended with a weighted share of the previous
//! window's count.

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod ratelimit;
