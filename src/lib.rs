//! Odi Pay dashboard client.
//!
//! Authenticated API access, client-side state stores and the route guard
//! for the merchant dashboard.

pub mod app;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
