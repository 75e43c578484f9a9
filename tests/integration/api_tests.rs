//! API integration tests
//!
//! Require a running server with a seeded librarian account
//! (librarian@lectern.local / librarian). Run with: cargo test -- --ignored

use reqwest::Client;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos()
}

/// Log in as the seed librarian
async fn librarian_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "librarian@lectern.local",
            "password": "librarian"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Sign up a fresh regular user, returning (token, user_id)
async fn signup_user(client: &Client) -> (String, i64) {
    let suffix = unique_suffix();
    let response = client
        .post(format!("{}/auth/signup", BASE_URL))
        .json(&json!({
            "username": format!("reader{}", suffix),
            "email": format!("reader{}@example.com", suffix),
            "password": "readerpass"
        }))
        .send()
        .await
        .expect("Failed to send signup request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse signup response");
    let token = body["token"].as_str().expect("No token").to_string();
    let user_id = body["user"]["id"].as_i64().expect("No user id");
    (token, user_id)
}

/// Create a book as the librarian, returning its id
async fn create_book(client: &Client, token: &str) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": format!("Test Book {}", unique_suffix()),
            "price": 9.99
        }))
        .send()
        .await
        .expect("Failed to send create book request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse book response");
    body["id"].as_i64().expect("No book id")
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_signup_and_login() {
    let client = Client::new();
    let suffix = unique_suffix();

    let response = client
        .post(format!("{}/auth/signup", BASE_URL))
        .json(&json!({
            "username": format!("alice{}", suffix),
            "email": format!("alice{}@example.com", suffix),
            "password": "alicepass"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    // Self-signup never grants the librarian role
    assert_eq!(body["user"]["role"], "user");

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": format!("alice{}@example.com", suffix),
            "password": "alicepass"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "librarian@lectern.local",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_unauthenticated_listing_rejected() {
    let client = Client::new();

    let response = client
        .get(format!("{}/requests", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_profile_reads_are_scoped() {
    let client = Client::new();
    let librarian = librarian_token(&client).await;
    let (alice, alice_id) = signup_user(&client).await;
    let (_bob, bob_id) = signup_user(&client).await;

    // Another user's profile is off limits
    let response = client
        .get(format!("{}/users/{}", BASE_URL, bob_id))
        .header("Authorization", format!("Bearer {}", alice))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    // Your own is not
    let response = client
        .get(format!("{}/users/{}", BASE_URL, alice_id))
        .header("Authorization", format!("Bearer {}", alice))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    // Librarians can read anyone
    let response = client
        .get(format!("{}/users/{}", BASE_URL, bob_id))
        .header("Authorization", format!("Bearer {}", librarian))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);
}

#[tokio::test]
#[ignore]
async fn test_user_cannot_curate_catalog() {
    let client = Client::new();
    let (token, _) = signup_user(&client).await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "title": "Forbidden Book" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_request_then_issue_then_return() {
    let client = Client::new();
    let librarian = librarian_token(&client).await;
    let (user, _) = signup_user(&client).await;
    let book_id = create_book(&client, &librarian).await;

    // Request the book
    let response = client
        .post(format!("{}/books/{}/request", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let request_id = body["id"].as_i64().expect("No request id");
    assert_eq!(body["status"], "open");

    // Access flags reflect the open request
    let response = client
        .get(format!("{}/books/{}/access", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["requested"], true);
    assert_eq!(body["issued"], false);

    // Librarian fulfils the request
    let response = client
        .post(format!("{}/requests/{}/issue", BASE_URL, request_id))
        .header("Authorization", format!("Bearer {}", librarian))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["request"]["status"], "issued");
    let issue_id = body["issue"]["id"].as_i64().expect("No issue id");

    // The request no longer counts as open
    let response = client
        .get(format!("{}/books/{}/access", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["requested"], false);
    assert_eq!(body["issued"], true);

    // Return it
    let response = client
        .post(format!("{}/issues/{}/return", BASE_URL, issue_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["returned"], true);

    // A second return of the same issue is a conflict
    let response = client
        .post(format!("{}/issues/{}/return", BASE_URL, issue_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_request_rejected() {
    let client = Client::new();
    let librarian = librarian_token(&client).await;
    let (user, _) = signup_user(&client).await;
    let book_id = create_book(&client, &librarian).await;

    let response = client
        .post(format!("{}/books/{}/request", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/books/{}/request", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_open_request_quota() {
    let client = Client::new();
    let librarian = librarian_token(&client).await;
    let (user, _) = signup_user(&client).await;

    // Fill the quota of five open requests
    for _ in 0..5 {
        let book_id = create_book(&client, &librarian).await;
        let response = client
            .post(format!("{}/books/{}/request", BASE_URL, book_id))
            .header("Authorization", format!("Bearer {}", user))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), 201);
    }

    // The sixth is refused
    let extra_book = create_book(&client, &librarian).await;
    let response = client
        .post(format!("{}/books/{}/request", BASE_URL, extra_book))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // Withdrawing one frees a slot
    let response = client
        .get(format!("{}/requests", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let first_book = body[0]["book"]["id"].as_i64().expect("No book in request");

    let response = client
        .delete(format!("{}/books/{}/request", BASE_URL, first_book))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/books/{}/request", BASE_URL, extra_book))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
}

#[tokio::test]
#[ignore]
async fn test_quota_holds_under_concurrent_requests() {
    let client = Client::new();
    let librarian = librarian_token(&client).await;
    let (user, _) = signup_user(&client).await;

    // One slot left
    for _ in 0..4 {
        let book_id = create_book(&client, &librarian).await;
        let response = client
            .post(format!("{}/books/{}/request", BASE_URL, book_id))
            .header("Authorization", format!("Bearer {}", user))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), 201);
    }

    // Two in-flight requests for different books race for that slot
    let book_a = create_book(&client, &librarian).await;
    let book_b = create_book(&client, &librarian).await;
    let (first, second) = tokio::join!(
        client
            .post(format!("{}/books/{}/request", BASE_URL, book_a))
            .header("Authorization", format!("Bearer {}", user))
            .send(),
        client
            .post(format!("{}/books/{}/request", BASE_URL, book_b))
            .header("Authorization", format!("Bearer {}", user))
            .send(),
    );
    let mut statuses = [
        first.expect("Failed to send request").status().as_u16(),
        second.expect("Failed to send request").status().as_u16(),
    ];
    statuses.sort_unstable();
    assert_eq!(statuses, [201, 409]);

    // Never more than five open requests, whichever one won
    let response = client
        .get(format!("{}/requests", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body.as_array().expect("Expected array").len(), 5);
}

#[tokio::test]
#[ignore]
async fn test_user_cannot_reject_requests() {
    let client = Client::new();
    let librarian = librarian_token(&client).await;
    let (user, _) = signup_user(&client).await;
    let book_id = create_book(&client, &librarian).await;

    let response = client
        .post(format!("{}/books/{}/request", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let request_id = body["id"].as_i64().expect("No request id");

    let response = client
        .post(format!("{}/requests/{}/reject", BASE_URL, request_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    // Librarian can
    let response = client
        .post(format!("{}/requests/{}/reject", BASE_URL, request_id))
        .header("Authorization", format!("Bearer {}", librarian))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "rejected");

    // A terminal request cannot be issued
    let response = client
        .post(format!("{}/requests/{}/issue", BASE_URL, request_id))
        .header("Authorization", format!("Bearer {}", librarian))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_content_gate() {
    let client = Client::new();
    let librarian = librarian_token(&client).await;
    let (user, _) = signup_user(&client).await;
    let book_id = create_book(&client, &librarian).await;

    // No request, no issue, no purchase: content is forbidden
    let response = client
        .get(format!("{}/books/{}/content", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    // An open request alone does not grant content
    let response = client
        .post(format!("{}/books/{}/request", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .get(format!("{}/books/{}/content", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_purchase_grants_access() {
    let client = Client::new();
    let librarian = librarian_token(&client).await;
    let (user, _) = signup_user(&client).await;
    let book_id = create_book(&client, &librarian).await;

    let response = client
        .post(format!("{}/books/{}/purchase", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({
            "card_number": "4242424242424242",
            "card_holder": "Test Reader",
            "card_expiry": "12/30"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["amount"], 9.99);
    // Card number is never echoed back
    assert!(body.get("card_number").is_none());

    let response = client
        .get(format!("{}/books/{}/access", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["purchased"], true);
}

#[tokio::test]
#[ignore]
async fn test_listing_scope() {
    let client = Client::new();
    let librarian = librarian_token(&client).await;
    let (user, user_id) = signup_user(&client).await;
    let book_id = create_book(&client, &librarian).await;

    let response = client
        .post(format!("{}/books/{}/request", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    // The user sees only their own requests, without requester details
    let response = client
        .get(format!("{}/requests", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let requests = body.as_array().expect("Expected array");
    assert!(!requests.is_empty());
    assert!(requests.iter().all(|r| r["user"].is_null()));

    // The librarian listing includes the requester
    let response = client
        .get(format!("{}/requests", BASE_URL))
        .header("Authorization", format!("Bearer {}", librarian))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let requests = body.as_array().expect("Expected array");
    assert!(requests
        .iter()
        .any(|r| r["user"]["id"].as_i64() == Some(user_id)));
}

#[tokio::test]
#[ignore]
async fn test_stats_require_librarian() {
    let client = Client::new();
    let librarian = librarian_token(&client).await;
    let (user, _) = signup_user(&client).await;

    let response = client
        .get(format!("{}/stats", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    let response = client
        .get(format!("{}/stats", BASE_URL))
        .header("Authorization", format!("Bearer {}", librarian))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["total_requests"].is_number());
    assert!(body["total_issues"].is_number());
    assert!(body["books_per_section"].is_array());
}
