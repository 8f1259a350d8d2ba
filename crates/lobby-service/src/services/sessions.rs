//! Revoked resume-token sessions
//!
//! Tokens are self-contained, so only revocations need to be remembered, and only
//! until the token would have expired anyway.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    revoked: DashMap<String, DateTime<Utc>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse `session_id` for resumption until `until`
    pub fn revoke(&self, session_id: &str, until: DateTime<Utc>) {
        self.revoked.insert(session_id.to_string(), until);
    }

    pub fn is_revoked(&self, session_id: &str) -> bool {
        self.revoked.contains_key(session_id)
    }

    /// Forget revocations whose tokens have expired. Returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.revoked.len();
        self.revoked.retain(|_, until| *until > now);
        before.saturating_sub(self.revoked.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_revoke_and_purge() {
        let registry = SessionRegistry::new();
        let now = Utc::now();

        registry.revoke("a", now + Duration::seconds(10));
        registry.revoke("b", now + Duration::days(30));
        assert!(registry.is_revoked("a"));
        assert!(!registry.is_revoked("c"));

        assert_eq!(registry.purge_expired(now + Duration::seconds(11)), 1);
        assert!(!registry.is_revoked("a"));
        assert!(registry.is_revoked("b"));
    }
}
