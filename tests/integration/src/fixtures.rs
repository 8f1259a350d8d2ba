//! Test fixtures and data generators
//!
//! Provides reusable method parameters for integration tests.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

pub const TEST_PASSWORD: &str = "TestPass123!";

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A fresh address nobody has registered yet
pub fn unique_email() -> String {
    format!("tester{}@example.com", unique_suffix())
}

/// `users.register` parameters
pub fn register_params(email: &str) -> Value {
    json!({
        "email": email,
        "password": TEST_PASSWORD,
        "firstName": "Test",
        "lastName": "User",
    })
}

/// `login` parameters for a password login
pub fn login_params(email: &str) -> Value {
    json!({ "email": email, "password": TEST_PASSWORD })
}
