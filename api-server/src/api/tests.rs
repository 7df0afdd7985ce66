use super::mount;
use crate::models::config::Config;
use crate::models::context::{Context, ContextPointer};
use request_coordinator::MockBackend;
use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

async fn client() -> (Client, ContextPointer) {
    let backend = Arc::new(MockBackend::with_latency(Duration::ZERO));
    let context = Arc::new(Context::with_backend(Config::default(), backend));
    let client = Client::tracked(mount(rocket::build(), context.clone()))
        .await
        .expect("valid rocket instance");
    (client, context)
}

#[rocket::async_test]
async fn test_health() {
    let (client, _) = client().await;
    let response = client.get("/health").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[rocket::async_test]
async fn test_get_user_then_cache_hit() {
    let (client, _) = client().await;

    let response = client.get("/users/1").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(
        body,
        json!({"id": 1, "name": "John Doe", "email": "john@example.com"})
    );

    let response = client.get("/users/1").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let stats: Value = client.get("/cache/stats").dispatch().await.into_json().await.unwrap();
    assert_eq!(stats, json!({"hits": 1, "misses": 1, "currentSize": 1}));
}

#[rocket::async_test]
async fn test_invalid_and_missing_users() {
    let (client, _) = client().await;

    let response = client.get("/users/abc").dispatch().await;
    assert_eq!(response.status(), Status::BadRequest);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body, json!({"error": "Invalid user ID"}));

    let response = client.get("/users/999").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body, json!({"error": "User not found"}));
}

#[rocket::async_test]
async fn test_create_user_warms_cache() {
    let (client, context) = client().await;

    let response = client
        .post("/users")
        .header(ContentType::JSON)
        .body(json!({"name": "Bob", "email": "bob@example.com"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    let created: Value = response.into_json().await.unwrap();
    assert_eq!(created["id"], 4);

    let response = client.get("/users/4").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let stats = context.users().cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 0);
}

#[rocket::async_test]
async fn test_create_user_validation() {
    let (client, _) = client().await;

    for (body, message) in [
        (json!({"name": "Bob"}), "Name and email are required"),
        (json!({"name": 5, "email": "bob@example.com"}), "Name and email must be strings"),
        (json!({"name": "Bob", "email": "not-an-email"}), "Invalid email format"),
    ] {
        let response = client
            .post("/users")
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        let error: Value = response.into_json().await.unwrap();
        assert_eq!(error, json!({ "error": message }));
    }
}

#[rocket::async_test]
async fn test_rate_limited_after_budget_spent() {
    let (client, _) = client().await;

    for _ in 0..10 {
        let response = client.get("/users/2").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
    }

    let response = client.get("/users/2").dispatch().await;
    assert_eq!(response.status(), Status::TooManyRequests);
    let retry_header = response.headers().get_one("Retry-After").map(str::to_string);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error"], "Too many requests. Please try again later.");
    let retry_after = body["retryAfter"].as_u64().unwrap();
    assert!(retry_after > 0 && retry_after <= 60);
    assert_eq!(retry_header, Some(retry_after.to_string()));

    // Introspection endpoints are not rate limited.
    let response = client.get("/cache/stats").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
}

#[rocket::async_test]
async fn test_create_user_rate_limited() {
    let (client, context) = client().await;

    for i in 0..10 {
        let response = client
            .post("/users")
            .header(ContentType::JSON)
            .body(json!({"name": format!("User {}", i), "email": "user@example.com"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
    }

    let response = client
        .post("/users")
        .header(ContentType::JSON)
        .body(json!({"name": "Late", "email": "late@example.com"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::TooManyRequests);
    assert!(response.headers().get_one("Retry-After").is_some());
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error"], "Too many requests. Please try again later.");

    // The rejected write never reached the backend.
    assert_eq!(context.users().cache_stats().current_size, 10);
}

#[rocket::async_test]
async fn test_user_id_with_trailing_characters() {
    let (client, _) = client().await;
    let response = client.get("/users/1abc").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["id"], 1);
}

#[rocket::async_test]
async fn test_clear_cache() {
    let (client, _) = client().await;
    client.get("/users/1").dispatch().await;
    client.get("/users/1").dispatch().await;

    let response = client.delete("/cache").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "message": "Cache cleared successfully",
            "stats": {"hits": 1, "misses": 1, "currentSize": 0}
        })
    );
}

#[rocket::async_test]
async fn test_cors_headers() {
    let (client, _) = client().await;
    let response = client.get("/health").dispatch().await;
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Origin"),
        Some("*")
    );

    let response = client.options("/users/1").dispatch().await;
    assert_eq!(response.status(), Status::NoContent);
}

#[rocket::async_test]
async fn test_unknown_route_is_json_404() {
    let (client, _) = client().await;
    let response = client.get("/nope").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body, json!({"error": "Not found"}));
}

#[rocket::async_test]
async fn test_shutdown_stops_background_tasks() {
    let (_client, context) = client().await;
    context.start_background_tasks().await;
    assert_eq!(context.running_tasks().await, 2);

    context.shutdown().await;
    assert_eq!(context.running_tasks().await, 0);
}
