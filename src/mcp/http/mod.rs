//! HTTP client and API communication layer for Planday.
//!
//! This module handles all HTTP communication with Planday's open API,
//! including bearer authentication, request construction, and response handling.

mod client;

// Re-export client's public API
pub use client::{
    ApiRequest, BIND_ADDRESS, PLANDAY_API_BASE_URL, PLANDAY_CLIENT_ID, PLANDAY_REFRESH_TOKEN, PLANDAY_TOKEN_URL,
    PlandayClient,
};
