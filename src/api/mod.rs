//! API-level checks over plain HTTP.

pub mod client;

pub use client::{ApiClient, BusinessCheck, RequestOptions, DEFAULT_SUCCESS_CODES};
