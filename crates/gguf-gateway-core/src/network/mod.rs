//! Outbound HTTP access.

mod client;

pub use client::{extract_domain, Fetcher, HttpClient};
