//! Tollgate - HTTP Rate Limiting Service
//!
//! This crate implements an admission-control gate that sits in front of
//! every incoming HTTP request and decides whether to admit or reject it.
//! Requests are counted per client identity (API token or source address)
//! against a fixed time window; exceeding the limit yields HTTP 429 until
//! the window resets.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
