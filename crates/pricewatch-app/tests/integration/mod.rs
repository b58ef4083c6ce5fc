//! Integration tests for pricewatch-app.
//!
//! These tests verify the interaction between components:
//! - Controller startup and snapshot seeding
//! - Configuration updates and session replacement
//! - The remote HTTP/WS path end to end

pub mod common;
