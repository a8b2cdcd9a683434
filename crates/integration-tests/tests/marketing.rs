//! Newsletter signup and the contact form.

use reqwest::StatusCode;
use vitrina_integration_tests::{CUSTOMER_EMAIL, TestApp, location};

#[tokio::test]
async fn test_newsletter_subscribe_returns_to_page() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/newsletter",
            &[("email", "Lector@Example.com"), ("return_to", "/products")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/products");

    let html = app.page("/products").await;
    assert!(html.contains("Thanks for subscribing!"));
    assert_eq!(app.shop.newsletter_emails(), vec!["lector@example.com"]);
}

#[tokio::test]
async fn test_newsletter_twice_is_still_success() {
    let app = TestApp::spawn().await;

    app.post_form("/newsletter", &[("email", "lector@example.com")])
        .await;
    let response = app
        .post_form("/newsletter", &[("email", "lector@example.com")])
        .await;
    assert_eq!(location(&response), "/");

    let html = app.page("/").await;
    assert!(html.contains("already subscribed"));
    assert!(html.contains("flash--success"));
}

#[tokio::test]
async fn test_newsletter_rejects_bad_email_and_foreign_return() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/newsletter",
            &[("email", "nope"), ("return_to", "https://evil.example/")],
        )
        .await;
    assert_eq!(location(&response), "/");

    let html = app.page("/").await;
    assert!(html.contains("Please enter a valid email address."));
    assert!(app.shop.newsletter_emails().is_empty());
}

#[tokio::test]
async fn test_contact_form() {
    let app = TestApp::spawn().await;

    let html = app.page("/contact").await;
    assert!(html.contains("Contact us"));

    let response = app
        .post_form(
            "/contact",
            &[
                ("name", "Carla"),
                ("email", "carla@example.com"),
                ("message", "Do you ship to Rosario?"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/contact");

    let html = app.page("/contact").await;
    assert!(html.contains("Thanks for writing!"));

    let messages = app.shop.contact_messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages.first().and_then(|m| m["message"].as_str()),
        Some("Do you ship to Rosario?")
    );
}

#[tokio::test]
async fn test_contact_form_validation() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/contact",
            &[("name", ""), ("email", "carla@"), ("message", "Hola")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = response.text().await.expect("Failed to read body");
    assert!(html.contains("Name is required."));
    assert!(html.contains("Hola"), "message is kept");
    assert!(app.shop.contact_messages().is_empty());
}

#[tokio::test]
async fn test_contact_form_is_prefilled_for_customers() {
    let app = TestApp::spawn().await;
    app.login().await;

    let html = app.page("/contact").await;
    assert!(html.contains(&format!("value=\"{CUSTOMER_EMAIL}\"")));
    assert!(html.contains("value=\"Ana Pérez\""));
}
