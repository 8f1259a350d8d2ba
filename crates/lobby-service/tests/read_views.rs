//! The userData, onlineUsers, and allUsers views

mod common;

use chrono::Duration;
use common::Harness;
use lobby_core::{AccountStore, NewAccount, UserStatus};
use lobby_service::dto::{AllUsersParams, ViewRecord};
use lobby_service::{Publication, ViewOutcome, ViewQuery, ViewService};

async fn populate(h: &Harness, count: usize) {
    for i in 0..count {
        h.store
            .create(
                NewAccount {
                    email: format!("user{i}@example.com"),
                    password: "hunter22".into(),
                    first_name: "Test".into(),
                    last_name: format!("User{i}"),
                },
                h.ctx.now(),
            )
            .await
            .unwrap();
        h.advance(Duration::seconds(1));
    }
}

fn records(outcome: ViewOutcome) -> Vec<ViewRecord> {
    match outcome {
        ViewOutcome::Records(records) => records,
        ViewOutcome::Unauthenticated => panic!("expected records"),
    }
}

fn all_users(limit: Option<i64>) -> ViewQuery {
    ViewQuery::new(Publication::AllUsers, AllUsersParams { limit })
}

#[tokio::test]
async fn test_all_users_limit_is_clamped() {
    let h = Harness::new();
    populate(&h, 104).await;
    h.register("ada@example.com").await;
    let (caller, _) = h.login("ada@example.com").await;
    let views = ViewService::new(&h.ctx);

    let cases = [
        (Some(500), 100),
        (Some(10), 10),
        (None, 50),
        (Some(0), 0),
        (Some(-3), 0),
    ];
    for (limit, expected) in cases {
        let found = records(views.snapshot(&caller, all_users(limit)).await.unwrap());
        assert_eq!(found.len(), expected, "limit {limit:?}");
    }
}

#[tokio::test]
async fn test_all_users_most_recent_first() {
    let h = Harness::new();
    populate(&h, 3).await;
    let ada = h.register("ada@example.com").await;
    let (caller, _) = h.login("ada@example.com").await;

    let found = records(
        ViewService::new(&h.ctx)
            .snapshot(&caller, all_users(Some(2)))
            .await
            .unwrap(),
    );
    let ViewRecord::User(first) = &found[0] else {
        panic!("expected a user summary");
    };
    assert_eq!(first.id, ada.to_string());

    let seen: Vec<_> = found
        .iter()
        .map(|r| match r {
            ViewRecord::User(u) => u.profile.last_seen,
            ViewRecord::Own(o) => o.profile.last_seen,
        })
        .collect();
    assert!(seen.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_online_users_excludes_caller_and_offline() {
    let h = Harness::new();
    let ada = h.register("ada@example.com").await;
    let bob = h.register("bob@example.com").await;
    let cyd = h.register("cyd@example.com").await;
    h.store
        .set_presence(cyd, UserStatus::Offline, h.ctx.now())
        .await
        .unwrap();

    let online = ViewService::new(&h.ctx).online_users(ada).await.unwrap();
    let ids: Vec<_> = online.iter().map(|u| u.id.clone()).collect();
    assert_eq!(ids, vec![bob.to_string()]);
}

#[tokio::test]
async fn test_user_data_is_own_record_only() {
    let h = Harness::new();
    let ada = h.register("ada@example.com").await;
    h.register("bob@example.com").await;
    let (caller, _) = h.login("ada@example.com").await;

    let query = ViewQuery::new(Publication::UserData, AllUsersParams::default());
    let found = records(ViewService::new(&h.ctx).subscribe(&caller, query).await.unwrap());
    assert_eq!(found.len(), 1);

    let json = serde_json::to_value(&found[0]).unwrap();
    assert_eq!(json["id"], ada.to_string());
    assert_eq!(json["emails"][0]["address"], "ada@example.com");
    assert_eq!(json["emails"][0]["verified"], false);
    assert_eq!(json["profile"]["status"], "online");
    assert!(json.get("password").is_none());
}

#[tokio::test]
async fn test_other_users_never_expose_email() {
    let h = Harness::new();
    h.register("ada@example.com").await;
    h.register("bob@example.com").await;
    let (caller, _) = h.login("ada@example.com").await;

    let found = records(
        ViewService::new(&h.ctx)
            .snapshot(&caller, all_users(None))
            .await
            .unwrap(),
    );
    assert_eq!(found.len(), 2);
    for record in &found {
        let json = serde_json::to_value(record).unwrap();
        assert!(json.get("emails").is_none());
        assert!(json["profile"]["firstName"].is_string());
    }
}

#[tokio::test]
async fn test_unauthenticated_views_are_empty() {
    let h = Harness::new();
    h.register("ada@example.com").await;
    let views = ViewService::new(&h.ctx);

    for publication in [
        Publication::UserData,
        Publication::OnlineUsers,
        Publication::AllUsers,
    ] {
        let query = ViewQuery::new(publication, AllUsersParams::default());
        let outcome = views.subscribe(&h.connection(), query).await.unwrap();
        assert_eq!(outcome, ViewOutcome::Unauthenticated);
    }
}

#[tokio::test]
async fn test_view_store_outage() {
    let h = Harness::new();
    h.register("ada@example.com").await;
    let (caller, _) = h.login("ada@example.com").await;
    h.store.set_unavailable(true);

    let err = ViewService::new(&h.ctx)
        .snapshot(&caller, all_users(None))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INTERNAL_ERROR");
}
