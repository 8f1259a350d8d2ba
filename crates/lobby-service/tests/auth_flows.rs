//! Registration, login, logout, and credential changes

mod common;

use chrono::Duration;
use common::{password_login, registration, Harness, PASSWORD};
use lobby_core::{AccountStore, UserStatus};
use lobby_service::dto::{ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest};
use lobby_service::{AccountService, AuthService, CallerContext};

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_creates_online_account() {
    let h = Harness::new();
    let id = h.register("ada@example.com").await;

    let user = h.user(id).await;
    assert_eq!(user.primary_email(), Some("ada@example.com"));
    assert!(!user.emails[0].verified);
    assert_eq!(user.profile.status, UserStatus::Online);
    assert_eq!(user.profile.last_seen, user.created_at);
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let h = Harness::new();
    h.register("ada@example.com").await;

    for email in ["ada@example.com", "ADA@Example.com"] {
        let err = AuthService::new(&h.ctx)
            .register(&h.connection(), registration(email))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "USER_EXISTS");
    }
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn test_register_reports_first_invalid_field() {
    let h = Harness::new();
    let cases = [
        ("not-an-email", "short", "A", "B", "INVALID_EMAIL"),
        ("ada@example.com", "short", "A", "B", "INVALID_PASSWORD"),
        ("ada@example.com", PASSWORD, " A ", "B", "INVALID_FIRST_NAME"),
        ("ada@example.com", PASSWORD, "Ada", " B ", "INVALID_LAST_NAME"),
    ];

    for (email, password, first, last, code) in cases {
        let request = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
        };
        let err = AuthService::new(&h.ctx)
            .register(&h.connection(), request)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), code, "case {email}/{first}/{last}");
    }
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_register_sends_verification_email() {
    let h = Harness::new();
    let id = h.register("ada@example.com").await;

    assert!(h.wait_for_outbox(1).await);
    let sent = h.store.sent_verifications();
    assert_eq!(sent[0].user_id, id);
    assert_eq!(sent[0].address, "ada@example.com");
}

#[tokio::test]
async fn test_mail_outage_does_not_fail_registration() {
    let h = Harness::new();
    h.store.set_mail_unavailable(true);

    let id = h.register("ada@example.com").await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert!(h.store.sent_verifications().is_empty());
    assert!(h.store.find_by_id(id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_register_store_outage() {
    let h = Harness::new();
    h.store.set_unavailable(true);

    let err = AuthService::new(&h.ctx)
        .register(&h.connection(), registration("ada@example.com"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "REGISTRATION_FAILED");
}

// =============================================================================
// Login / logout
// =============================================================================

#[tokio::test]
async fn test_login_sets_online_and_last_seen() {
    let h = Harness::new();
    let id = h.register("ada@example.com").await;
    h.store
        .set_presence(id, UserStatus::Offline, h.ctx.now())
        .await
        .unwrap();

    h.advance(Duration::minutes(10));
    let (_, outcome) = h.login("ada@example.com").await;

    assert_eq!(outcome.user_id, id);
    assert_eq!(outcome.response.user_id, id.to_string());
    assert!(!outcome.response.token.is_empty());

    let user = h.user(id).await;
    assert_eq!(user.profile.status, UserStatus::Online);
    assert_eq!(user.profile.last_seen, h.ctx.now());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let h = Harness::new();
    h.register("ada@example.com").await;

    let wrong_password = AuthService::new(&h.ctx)
        .login(&h.connection(), password_login("ada@example.com", "nope-nope"))
        .await
        .unwrap_err();
    let unknown_email = AuthService::new(&h.ctx)
        .login(&h.connection(), password_login("bob@example.com", PASSWORD))
        .await
        .unwrap_err();

    assert_eq!(wrong_password.error_code(), "LOGIN_FAILED");
    assert_eq!(unknown_email.error_code(), "LOGIN_FAILED");
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

#[tokio::test]
async fn test_resume_token_login() {
    let h = Harness::new();
    let id = h.register("ada@example.com").await;
    let (_, first) = h.login("ada@example.com").await;

    let resumed = AuthService::new(&h.ctx)
        .login(
            &h.connection(),
            LoginRequest::Resume {
                resume: first.response.token.clone(),
            },
        )
        .await
        .unwrap();

    assert_eq!(resumed.user_id, id);
    assert_eq!(resumed.session_id, first.session_id);
}

#[tokio::test]
async fn test_logout_goes_offline_and_revokes_token() {
    let h = Harness::new();
    let id = h.register("ada@example.com").await;
    let (caller, outcome) = h.login("ada@example.com").await;

    h.advance(Duration::seconds(30));
    AuthService::new(&h.ctx).logout(&caller).await.unwrap();

    let user = h.user(id).await;
    assert_eq!(user.profile.status, UserStatus::Offline);
    assert_eq!(user.profile.last_seen, h.ctx.now());

    let err = AuthService::new(&h.ctx)
        .login(
            &h.connection(),
            LoginRequest::Resume {
                resume: outcome.response.token,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "LOGIN_FAILED");
}

#[tokio::test]
async fn test_logout_requires_session() {
    let h = Harness::new();
    let err = AuthService::new(&h.ctx)
        .logout(&h.connection())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_AUTHENTICATED");
}

// =============================================================================
// Profile and password
// =============================================================================

#[tokio::test]
async fn test_update_profile_partial() {
    let h = Harness::new();
    let id = h.register("ada@example.com").await;
    let (caller, _) = h.login("ada@example.com").await;
    let accounts = AccountService::new(&h.ctx);

    accounts
        .update_profile(
            &caller,
            UpdateProfileRequest {
                first_name: Some("Augusta".into()),
                avatar: Some("https://img.example.com/ada.png".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let profile = h.user(id).await.profile;
    assert_eq!(profile.first_name, "Augusta");
    assert_eq!(profile.last_name, "Lovelace");
    assert_eq!(profile.avatar.as_deref(), Some("https://img.example.com/ada.png"));

    let err = accounts
        .update_profile(
            &caller,
            UpdateProfileRequest {
                last_name: Some("L".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_LAST_NAME");
    assert_eq!(h.user(id).await.profile.last_name, "Lovelace");
}

#[tokio::test]
async fn test_update_profile_requires_login() {
    let h = Harness::new();
    let err = AccountService::new(&h.ctx)
        .update_profile(&h.connection(), UpdateProfileRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_AUTHENTICATED");
}

#[tokio::test]
async fn test_change_password() {
    let h = Harness::new();
    h.register("ada@example.com").await;
    let (caller, _) = h.login("ada@example.com").await;
    let accounts = AccountService::new(&h.ctx);

    let change = |old: &str, new: &str| ChangePasswordRequest {
        old_password: old.to_string(),
        new_password: new.to_string(),
    };

    let err = accounts
        .change_password(&caller, change("wrong-one", "brand-new"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "PASSWORD_CHANGE_FAILED");

    let err = accounts
        .change_password(&caller, change(PASSWORD, "tiny"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_PASSWORD");

    accounts
        .change_password(&caller, change(PASSWORD, "brand-new"))
        .await
        .unwrap();

    let fresh = CallerContext::anonymous(lobby_service::ConnectionId::generate());
    AuthService::new(&h.ctx)
        .login(&fresh, password_login("ada@example.com", "brand-new"))
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_registrations_create_one_account() {
    let h = Harness::new();

    let attempts: Vec<_> = (0..8)
        .map(|i| {
            let ctx = h.ctx.clone();
            // Vary the case so the lookup and the unique index both see the same address
            let email = if i % 2 == 0 { "race@example.com" } else { "Race@Example.com" };
            let caller = h.connection();
            tokio::spawn(async move {
                AuthService::new(&ctx)
                    .register(&caller, registration(email))
                    .await
            })
        })
        .collect();

    let mut created = Vec::new();
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(response) => created.push(response.user_id),
            Err(e) => assert_eq!(e.error_code(), "USER_EXISTS"),
        }
    }

    assert_eq!(created.len(), 1);
    assert_eq!(h.store.len(), 1);
}
