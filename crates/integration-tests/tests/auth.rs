//! Login, registration, logout and the auth guard.

use reqwest::StatusCode;
use vitrina_integration_tests::{CUSTOMER_EMAIL, TestApp, location};

#[tokio::test]
async fn test_login_lands_on_account() {
    let app = TestApp::spawn().await;

    let response = app.login().await;
    assert_eq!(location(&response), "/account");

    let html = app.page("/account").await;
    assert!(html.contains("Welcome back, Ana."));
    assert!(html.contains("Hi, Ana"));
    assert!(html.contains(CUSTOMER_EMAIL));
}

#[tokio::test]
async fn test_login_with_bad_password() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/login",
            &[("email", CUSTOMER_EMAIL), ("password", "wrong-pass1")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let html = response.text().await.expect("Failed to read body");
    assert!(html.contains("Invalid email or password."));
    assert!(html.contains(CUSTOMER_EMAIL), "email is kept in the form");

    assert_eq!(location(&app.get("/account").await), "/auth/login?next=%2Faccount");
}

#[tokio::test]
async fn test_login_form_validation() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form("/auth/login", &[("email", "not-an-email"), ("password", "")])
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = response.text().await.expect("Failed to read body");
    assert!(html.contains("Password is required."));
}

#[tokio::test]
async fn test_guard_redirects_and_returns_to_next() {
    let app = TestApp::spawn().await;

    let response = app.get("/account/orders").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login?next=%2Faccount%2Forders");

    let html = app.page("/auth/login?next=%2Faccount%2Forders").await;
    assert!(html.contains("value=\"/account/orders\""));

    let response = app
        .post_form(
            "/auth/login",
            &[
                ("email", CUSTOMER_EMAIL),
                ("password", vitrina_integration_tests::CUSTOMER_PASSWORD),
                ("next", "/account/orders"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/account/orders");
}

#[tokio::test]
async fn test_next_must_be_local() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/login",
            &[
                ("email", CUSTOMER_EMAIL),
                ("password", vitrina_integration_tests::CUSTOMER_PASSWORD),
                ("next", "https://evil.example/"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/account");
}

#[tokio::test]
async fn test_signed_in_customer_skips_login_page() {
    let app = TestApp::spawn().await;
    app.login().await;

    let response = app.get("/auth/login").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/account");
}

#[tokio::test]
async fn test_register_signs_in() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/register",
            &[
                ("email", "bruno@example.com"),
                ("password", "termo2024"),
                ("password_confirm", "termo2024"),
                ("first_name", "Bruno"),
                ("last_name", "Díaz"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let html = app.page("/account").await;
    assert!(html.contains("Welcome, Bruno!"));
    assert!(html.contains("bruno@example.com"));
}

#[tokio::test]
async fn test_register_validation_and_taken_email() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/register",
            &[
                ("email", "bruno@example.com"),
                ("password", "short1"),
                ("password_confirm", "different1"),
                ("first_name", "Bruno"),
                ("last_name", ""),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = response.text().await.expect("Failed to read body");
    assert!(html.contains("Last name is required."));
    assert!(html.contains("Password must be at least 8 characters."));
    assert!(html.contains("value=\"Bruno\""), "input is kept");

    let response = app
        .post_form(
            "/auth/register",
            &[
                ("email", CUSTOMER_EMAIL),
                ("password", "termo2024"),
                ("password_confirm", "termo2024"),
                ("first_name", "Ana"),
                ("last_name", "Otra"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = response.text().await.expect("Failed to read body");
    assert!(html.contains("That email is already registered."));
}

#[tokio::test]
async fn test_logout_drops_customer_and_cart() {
    let app = TestApp::spawn().await;
    app.login().await;
    app.add_to_cart("yerba-mate-1kg", 1).await;

    let response = app.post_form("/auth/logout", &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let html = app.page("/").await;
    assert!(html.contains("You have been signed out."));
    assert!(html.contains("Sign in"));
    assert!(html.contains("<span class=\"cart-count\">0</span>"));

    assert_eq!(app.get("/account").await.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_revoked_token_expires_session() {
    let app = TestApp::spawn().await;
    app.login().await;
    app.shop.revoke_tokens();

    let response = app.get("/account/orders").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login?expired=1");

    let html = app.page("/auth/login?expired=1").await;
    assert!(html.contains("Your session expired. Please sign in again."));

    // The customer was dropped from the session
    assert_eq!(
        location(&app.get("/account").await),
        "/auth/login?next=%2Faccount"
    );
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let app = TestApp::spawn().await;

    let mut limited = None;
    for _ in 0..8 {
        let response = app
            .post_form(
                "/auth/login",
                &[("email", CUSTOMER_EMAIL), ("password", "wrong-pass1")],
            )
            .await;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            limited = Some(response);
            break;
        }
    }
    let limited = limited.expect("login should be rate limited");
    assert!(limited.headers().contains_key("retry-after"));
    let html = limited.text().await.expect("Failed to read body");
    assert!(html.contains("Too many requests. Please slow down."));
    assert!(html.contains("Back to the shop"));

    // Pages stay reachable
    assert_eq!(app.get("/auth/login").await.status(), StatusCode::OK);
}
