//! End-to-end tests against a gateway bound to a real socket

use std::time::Duration;

use integration_tests::{login_params, register_params, unique_email, TestClient, TestServer};
use lobby_core::UserStatus;
use serde_json::{json, Value};

/// Register on a throwaway connection, then log in on `client`. Returns the user id.
async fn signed_in(server: &TestServer, client: &mut TestClient) -> String {
    let email = unique_email();

    let mut registrar = server.connect().await.unwrap();
    let registered = registrar
        .call("r1", "users.register", register_params(&email))
        .await
        .unwrap();
    assert_eq!(registered["result"]["success"], true);
    registrar.close().await.unwrap();

    let login = client.call("l1", "login", login_params(&email)).await.unwrap();
    login["result"]["userId"].as_str().unwrap().to_string()
}

fn record_ids(dispatch: &Value) -> Vec<String> {
    dispatch["d"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.unwrap();

    let response = server.get("/health").await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_hello_announces_heartbeat() {
    let server = TestServer::start_with_heartbeat(Duration::from_secs(30))
        .await
        .unwrap();
    let client = server.connect().await.unwrap();

    assert_eq!(client.hello["d"]["heartbeatInterval"], 30_000);
    assert!(client.hello["d"]["connectionId"].is_string());
}

#[tokio::test]
async fn test_heartbeat_ack() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();

    client.send(json!({"op": 1})).await.unwrap();
    let ack = client.recv().await.unwrap();
    assert_eq!(ack["op"], 11);
}

#[tokio::test]
async fn test_register_then_login() {
    let server = TestServer::start().await.unwrap();
    let email = unique_email();

    let mut client = server.connect().await.unwrap();
    let registered = client
        .call("1", "users.register", register_params(&email))
        .await
        .unwrap();
    let user_id = registered["result"]["userId"].as_str().unwrap().to_string();

    let user = server.user(&user_id).await.unwrap();
    assert_eq!(user.profile.status, UserStatus::Online);
    assert_eq!(user.emails[0].address, email);

    let mut other = server.connect().await.unwrap();
    let login = other.call("2", "login", login_params(&email)).await.unwrap();
    assert_eq!(login["result"]["userId"], user_id.as_str());
    assert!(login["result"]["token"].is_string());
}

#[tokio::test]
async fn test_login_failure_is_generic() {
    let server = TestServer::start().await.unwrap();
    let email = unique_email();
    let mut client = server.connect().await.unwrap();
    client
        .call("1", "users.register", register_params(&email))
        .await
        .unwrap();

    let wrong_password = client
        .call("2", "login", json!({"email": email, "password": "nope-nope"}))
        .await
        .unwrap();
    let unknown_email = client
        .call("3", "login", login_params("nobody@example.com"))
        .await
        .unwrap();

    assert_eq!(wrong_password["error"]["code"], "LOGIN_FAILED");
    assert_eq!(wrong_password["error"], unknown_email["error"]);
}

#[tokio::test]
async fn test_unknown_method_and_bad_params() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();

    let unknown = client.call("1", "users.delete", json!({})).await.unwrap();
    assert_eq!(unknown["error"]["code"], "NOT_FOUND");

    let bad = client.call("2", "users.register", json!(42)).await.unwrap();
    assert_eq!(bad["error"]["code"], "INVALID_PARAMS");
}

#[tokio::test]
async fn test_update_requires_login() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();

    let reply = client
        .call("1", "users.updateStatus", json!("away"))
        .await
        .unwrap();
    assert_eq!(reply["error"]["code"], "NOT_AUTHENTICATED");
}

#[tokio::test]
async fn test_anonymous_subscription_ends_empty() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();

    let frames = client.subscribe("s1", "userData", Value::Null).await.unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["op"], 0);
    assert_eq!(frames[0]["d"], json!([]));
    assert_eq!(frames[1]["op"], 6);

    let ended = client.recv().await.unwrap();
    assert_eq!(ended["op"], 7);
    assert_eq!(ended["id"], "s1");
    assert!(ended.get("d").is_none());
}

#[tokio::test]
async fn test_unknown_publication() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();

    let frames = client.subscribe("s1", "everyone", Value::Null).await.unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["op"], 7);
    assert_eq!(frames[0]["d"]["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_user_data_snapshot() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();
    let user_id = signed_in(&server, &mut client).await;

    let frames = client.subscribe("me", "userData", Value::Null).await.unwrap();
    assert_eq!(frames[0]["op"], 0);
    assert_eq!(frames[0]["t"], "userData");
    assert_eq!(record_ids(&frames[0]), vec![user_id]);
    assert!(frames[0]["d"][0]["emails"].is_array());
    assert_eq!(frames[1]["op"], 6);
}

#[tokio::test]
async fn test_online_users_follow_status_changes() {
    let server = TestServer::start().await.unwrap();

    let mut watcher = server.connect().await.unwrap();
    let watcher_id = signed_in(&server, &mut watcher).await;

    let mut peer = server.connect().await.unwrap();
    let peer_id = signed_in(&server, &mut peer).await;

    let frames = watcher
        .subscribe("online", "onlineUsers", Value::Null)
        .await
        .unwrap();
    let initial = record_ids(&frames[0]);
    assert!(initial.contains(&peer_id));
    assert!(!initial.contains(&watcher_id));
    assert!(frames[0]["d"][0].get("emails").is_none());

    let reply = peer
        .call("s", "users.updateStatus", json!({"status": "offline"}))
        .await
        .unwrap();
    assert_eq!(reply["result"]["success"], true);

    let update = watcher
        .recv_until(|f| f["op"] == 0 && f["id"] == "online")
        .await
        .unwrap();
    assert!(!record_ids(&update).contains(&peer_id));
}

#[tokio::test]
async fn test_unsubscribe_answers_nosub() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();
    signed_in(&server, &mut client).await;

    client.subscribe("me", "userData", Value::Null).await.unwrap();
    client.send(json!({"op": 5, "id": "me"})).await.unwrap();

    let reply = client.recv_until(|f| f["id"] == "me").await.unwrap();
    assert_eq!(reply["op"], 7);
}

#[tokio::test]
async fn test_logout_ends_subscriptions() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();
    let user_id = signed_in(&server, &mut client).await;

    client.subscribe("me", "userData", Value::Null).await.unwrap();
    client.send(json!({"op": 2, "id": "out", "t": "logout"})).await.unwrap();

    let mut saw_nosub = false;
    let mut saw_result = false;
    while !(saw_nosub && saw_result) {
        let frame = client.recv().await.unwrap();
        if frame["op"] == 7 && frame["id"] == "me" {
            saw_nosub = true;
        }
        if frame["op"] == 3 && frame["id"] == "out" {
            assert_eq!(frame["d"]["result"]["success"], true);
            saw_result = true;
        }
    }

    let user = server.user(&user_id).await.unwrap();
    assert_eq!(user.profile.status, UserStatus::Offline);
}

#[tokio::test]
async fn test_subscribe_rate_limited() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();
    signed_in(&server, &mut client).await;

    for i in 0..10 {
        let frames = client
            .subscribe(&format!("s{i}"), "userData", Value::Null)
            .await
            .unwrap();
        assert_eq!(frames.last().unwrap()["op"], 6);
    }

    let frames = client.subscribe("s10", "userData", Value::Null).await.unwrap();
    assert_eq!(frames[0]["op"], 7);
    assert_eq!(frames[0]["d"]["error"]["code"], "RATE_LIMITED");
    assert!(frames[0]["d"]["error"]["retryAfterMs"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_disconnect_sets_offline() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();
    let user_id = signed_in(&server, &mut client).await;
    assert_eq!(
        server.user(&user_id).await.unwrap().profile.status,
        UserStatus::Online
    );

    client.close().await.unwrap();

    server
        .wait_for_user(&user_id, |u| u.profile.status == UserStatus::Offline)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_decode_error_closes() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();

    client.send_text("{not json").await.unwrap();
    assert_eq!(client.recv_close().await.unwrap(), Some(4002));
}

#[tokio::test]
async fn test_server_only_opcode_closes() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();

    client.send(json!({"op": 10})).await.unwrap();
    assert_eq!(client.recv_close().await.unwrap(), Some(4001));
}

#[tokio::test]
async fn test_silent_connection_times_out() {
    let server = TestServer::start_with_heartbeat(Duration::from_millis(200))
        .await
        .unwrap();
    let mut client = server.connect().await.unwrap();
    let user_id = signed_in(&server, &mut client).await;

    assert_eq!(client.recv_close().await.unwrap(), Some(4009));
    server
        .wait_for_user(&user_id, |u| u.profile.status == UserStatus::Offline)
        .await
        .unwrap();
}
