//! HTTP transport
//!
//! # Overview
//!
//! The http module provides:
//! - `HttpClient` - GET/POST with retry, backoff, and rate limiting
//! - `HttpClientConfig` - builder-style client configuration
//! - `RateLimiter` - token bucket used as the courtesy delay between page fetches

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
