//! Integration tests for confirm, category overrides and the admin cache route.

mod common;

use common::{TestApp, ADMIN_TOKEN};
use serde_json::json;
use statement_service::config::QuotaConfig;
use statement_service::models::{Category, CategorySource};

fn row(date: &str, description: &str, amount: f64, card_id: &str) -> serde_json::Value {
    json!({
        "date": date,
        "description": description,
        "amount": amount,
        "cardId": card_id,
        "currency": "usd"
    })
}

#[tokio::test]
async fn confirm_persists_reviewed_rows() {
    let app = TestApp::spawn().await;
    app.store.add_card("user-1", "card-1").await;

    let mut groceries = row("2025-01-16", "Corner Market", -32.10, "card-1");
    groceries["category"] = json!("Groceries");
    groceries["source"] = json!("manual");

    let response = app
        .confirm(
            "user-1",
            json!({ "transactions": [
                row("2025-01-15", "Starbucks Coffee", -5.25, "card-1"),
                groceries,
            ]}),
        )
        .await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], true);
    assert_eq!(body["inserted"], 2);

    let stored = app.store.transactions_for("user-1").await;
    assert_eq!(stored.len(), 2);

    let coffee = stored
        .iter()
        .find(|t| t.description == "Starbucks Coffee")
        .expect("coffee row stored");
    assert_eq!(coffee.date, "2025-01-15");
    assert_eq!(coffee.currency, "USD");
    assert_eq!(coffee.category, Category::FoodAndDining);
    assert_eq!(coffee.category_source, CategorySource::Rule);

    let market = stored
        .iter()
        .find(|t| t.description == "Corner Market")
        .expect("market row stored");
    assert_eq!(market.category, Category::Groceries);
    assert_eq!(market.category_source, CategorySource::Manual);
    assert_eq!(market.confidence, 1.0);
}

#[tokio::test]
async fn duplicate_rows_in_a_batch_are_stored_once() {
    let app = TestApp::spawn().await;
    app.store.add_card("user-1", "card-1").await;

    let response = app
        .confirm(
            "user-1",
            json!({ "transactions": [
                row("2025-01-15", "Amazon Purchase", -45.99, "card-1"),
                row("2025-01-15", "Amazon Purchase", -45.99, "card-1"),
                row("2025-01-15", "Amazon Purchase", -45.99, "card-2-missing"),
            ]}),
        )
        .await;

    // The third row names a card the user does not own.
    assert_eq!(response.status(), 403);
    assert!(app.store.transactions().await.is_empty());

    let response = app
        .confirm(
            "user-1",
            json!({ "transactions": [
                row("2025-01-15", "Amazon Purchase", -45.99, "card-1"),
                row("2025-01-15", "Amazon Purchase", -45.99, "card-1"),
            ]}),
        )
        .await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["inserted"], 1);
    assert_eq!(app.store.transactions().await.len(), 1);
}

#[tokio::test]
async fn foreign_card_rejects_the_whole_batch() {
    let app = TestApp::spawn().await;
    app.store.add_card("user-1", "card-1").await;
    app.store.add_card("user-2", "card-2").await;

    let response = app
        .confirm(
            "user-1",
            json!({ "transactions": [
                row("2025-01-15", "Coffee", -4.50, "card-1"),
                row("2025-01-16", "Lunch", -12.00, "card-2"),
            ]}),
        )
        .await;
    assert_eq!(response.status(), 403);

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["upgrade"], false);
    assert!(app.store.transactions().await.is_empty());
}

#[tokio::test]
async fn resubmitting_a_batch_inserts_nothing_new() {
    let app = TestApp::spawn().await;
    app.store.add_card("user-1", "card-1").await;

    let batch = json!({ "transactions": [
        row("2025-01-15", "Coffee", -4.50, "card-1"),
        row("2025-01-16", "Lunch", -12.00, "card-1"),
    ]});

    let first = app.confirm("user-1", batch.clone()).await;
    let first: serde_json::Value = first.json().await.expect("Failed to parse response");
    assert_eq!(first["inserted"], 2);

    let second = app.confirm("user-1", batch).await;
    assert_eq!(second.status(), 200);
    let second: serde_json::Value = second.json().await.expect("Failed to parse response");
    assert_eq!(second["inserted"], 0);
    assert_eq!(app.store.transactions().await.len(), 2);
}

#[tokio::test]
async fn batch_without_valid_rows_is_rejected() {
    let app = TestApp::spawn().await;
    app.store.add_card("user-1", "card-1").await;

    let mut no_currency = row("2025-01-15", "Coffee", -4.50, "card-1");
    no_currency["currency"] = json!("");
    let mut deselected = row("2025-01-16", "Lunch", -12.00, "card-1");
    deselected["selected"] = json!(false);

    let response = app
        .confirm(
            "user-1",
            json!({ "transactions": [
                no_currency,
                deselected,
                { "description": "No date", "amount": "-3.00", "cardId": "card-1", "currency": "USD" },
            ]}),
        )
        .await;
    assert_eq!(response.status(), 422);
    assert!(app.store.transactions().await.is_empty());
}

#[tokio::test]
async fn invalid_rows_are_filtered_not_fatal() {
    let app = TestApp::spawn().await;
    app.store.add_card("user-1", "card-1").await;

    let response = app
        .confirm(
            "user-1",
            json!({ "transactions": [
                row("2025-01-15", "Coffee", -4.50, "card-1"),
                { "date": "2025-01-16", "description": "Lunch", "amount": "abc", "cardId": "card-1", "currency": "USD" },
                { "date": "2025-01-17", "description": "Refund", "amount": "$1,250.00", "cardId": "card-1", "currency": "USD" },
            ]}),
        )
        .await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["inserted"], 2);
}

#[tokio::test]
async fn upload_quota_counts_successful_confirms() {
    let app = TestApp::spawn_with_quotas(QuotaConfig {
        daily_previews: 3,
        daily_uploads: 1,
    })
    .await;
    app.store.add_card("user-1", "card-1").await;

    let first = app
        .confirm(
            "user-1",
            json!({ "transactions": [row("2025-01-15", "Coffee", -4.50, "card-1")] }),
        )
        .await;
    assert_eq!(first.status(), 200);

    let second = app
        .confirm(
            "user-1",
            json!({ "transactions": [row("2025-01-16", "Lunch", -12.00, "card-1")] }),
        )
        .await;
    assert_eq!(second.status(), 402);

    let body: serde_json::Value = second.json().await.expect("Failed to parse response");
    assert_eq!(body["upgrade"], true);
    assert_eq!(app.store.transactions().await.len(), 1);
}

#[tokio::test]
async fn user_can_override_a_stored_category() {
    let app = TestApp::spawn().await;
    app.store.add_card("user-1", "card-1").await;
    app.confirm(
        "user-1",
        json!({ "transactions": [row("2025-01-15", "Coffee", -4.50, "card-1")] }),
    )
    .await;

    let id = app.store.transactions().await[0].id.clone();
    let url = format!("{}/transactions/{}/category", app.address, id);

    let response = app
        .client()
        .patch(&url)
        .header("X-User-ID", "user-1")
        .json(&json!({ "category": "groceries" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["category"], "Groceries");
    assert_eq!(body["user_overridden"], true);

    let stored = &app.store.transactions().await[0];
    assert_eq!(stored.category, Category::Groceries);
    assert_eq!(stored.category_source, CategorySource::Manual);
    assert!(stored.user_overridden);

    let other_user = app
        .client()
        .patch(&url)
        .header("X-User-ID", "user-2")
        .json(&json!({ "category": "Shopping" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(other_user.status(), 404);

    let unknown_category = app
        .client()
        .patch(&url)
        .header("X-User-ID", "user-1")
        .json(&json!({ "category": "Pets" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(unknown_category.status(), 422);
}

#[tokio::test]
async fn admin_can_invalidate_a_cached_merchant() {
    let app = TestApp::spawn().await;
    app.store.add_card("user-1", "card-1").await;
    app.confirm(
        "user-1",
        json!({ "transactions": [row("2025-01-15", "Mystery Vendor 123", -9.99, "card-1")] }),
    )
    .await;
    assert_eq!(app.categorize.call_count(), 1);
    assert_eq!(app.store.cache_writes(), 1);

    let url = format!("{}/admin/category-cache/mystery%20vendor", app.address);

    let missing_token = app
        .client()
        .delete(&url)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(missing_token.status(), 401);

    let wrong_token = app
        .client()
        .delete(&url)
        .header("X-Admin-Token", "nope")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(wrong_token.status(), 403);

    let deleted = app
        .client()
        .delete(&url)
        .header("X-Admin-Token", ADMIN_TOKEN)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(deleted.status(), 204);

    let again = app
        .client()
        .delete(&url)
        .header("X-Admin-Token", ADMIN_TOKEN)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(again.status(), 404);
}

#[tokio::test]
async fn out_of_range_confidence_is_recategorized() {
    let app = TestApp::spawn().await;
    app.store.add_card("user-1", "card-1").await;

    let mut inflated = row("2025-01-15", "Starbucks Coffee", -5.25, "card-1");
    inflated["category"] = json!("Shopping");
    inflated["confidence"] = json!(42.0);
    inflated["source"] = json!("ai");

    let mut reviewed = row("2025-01-16", "Corner Store 12", -8.00, "card-1");
    reviewed["category"] = json!("Shopping");
    reviewed["confidence"] = json!(0.7);
    reviewed["source"] = json!("ai");

    let response = app
        .confirm("user-1", json!({ "transactions": [inflated, reviewed] }))
        .await;
    assert_eq!(response.status(), 200);

    let stored = app.store.transactions_for("user-1").await;
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|t| (0.0..=1.0).contains(&t.confidence)));

    let coffee = stored
        .iter()
        .find(|t| t.description == "Starbucks Coffee")
        .expect("coffee row stored");
    assert_eq!(coffee.category, Category::FoodAndDining);
    assert_eq!(coffee.category_source, CategorySource::Rule);
    assert_eq!(coffee.confidence, 0.9);

    let store_row = stored
        .iter()
        .find(|t| t.description == "Corner Store 12")
        .expect("store row stored");
    assert_eq!(store_row.category, Category::Shopping);
    assert_eq!(store_row.category_source, CategorySource::Ai);
    assert_eq!(store_row.confidence, 0.7);
}
