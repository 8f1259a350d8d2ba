//! Shared fixture for service-level scenario tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use lobby_common::SessionTokenService;
use lobby_core::{AccountStore, ManualClock, User, UserId};
use lobby_service::dto::{LoginRequest, RegisterRequest};
use lobby_service::{AuthService, CallerContext, ConnectionId, LoginOutcome, ServiceContext};
use lobby_store::MemoryAccountStore;

pub const PASSWORD: &str = "hunter22";

pub struct Harness {
    pub ctx: ServiceContext,
    pub store: Arc<MemoryAccountStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryAccountStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let ctx = ServiceContext::builder()
            .store(store.clone())
            .clock(clock.clone())
            .tokens(Arc::new(SessionTokenService::new("scenario-secret", 3600)))
            .build()
            .unwrap();
        Self { ctx, store, clock }
    }

    /// A fresh, not logged in connection
    pub fn connection(&self) -> CallerContext {
        CallerContext::anonymous(ConnectionId::generate())
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.clock.advance(by);
    }

    /// Register on a throwaway connection so the register limit never interferes
    pub async fn register(&self, email: &str) -> UserId {
        let response = AuthService::new(&self.ctx)
            .register(&self.connection(), registration(email))
            .await
            .unwrap();
        UserId::parse(&response.user_id).unwrap()
    }

    /// Log in on a new connection and return the authenticated caller for it
    pub async fn login(&self, email: &str) -> (CallerContext, LoginOutcome) {
        let caller = self.connection();
        let outcome = AuthService::new(&self.ctx)
            .login(&caller, password_login(email, PASSWORD))
            .await
            .unwrap();
        let caller = CallerContext::authenticated(
            caller.connection_id,
            outcome.user_id,
            outcome.session_id.clone(),
        );
        (caller, outcome)
    }

    pub async fn user(&self, id: UserId) -> User {
        self.store.find_by_id(id).await.unwrap().unwrap()
    }

    /// Wait for spawned background work to land in the outbox
    pub async fn wait_for_outbox(&self, count: usize) -> bool {
        for _ in 0..50 {
            if self.store.sent_verifications().len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

pub fn registration(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
    }
}

pub fn password_login(email: &str, password: &str) -> LoginRequest {
    LoginRequest::Password {
        email: email.to_string(),
        password: password.to_string(),
    }
}
