//! Cart flows: add, update, remove and clear, as a guest and after login.

use reqwest::StatusCode;
use vitrina_integration_tests::{TestApp, first_cart_item_id, location};

#[tokio::test]
async fn test_empty_cart() {
    let app = TestApp::spawn().await;

    let html = app.page("/cart").await;
    assert!(html.contains("Your cart is empty."));
    assert!(html.contains("<span class=\"cart-count\">0</span>"));
}

#[tokio::test]
async fn test_add_redirects_and_shows_line() {
    let app = TestApp::spawn().await;

    let response = app.add_to_cart("yerba-mate-1kg", 2).await;
    assert_eq!(location(&response), "/cart");

    let html = app.page("/cart").await;
    assert!(html.contains("Added Yerba mate 1kg to your cart."));
    assert!(html.contains("Yerba mate 1kg"));
    assert!(html.contains("$ 9,000.00"), "subtotal for two units");
    assert!(html.contains("<span class=\"cart-count\">2</span>"));

    // Flash is shown once
    let again = app.page("/cart").await;
    assert!(!again.contains("Added Yerba mate 1kg"));
}

#[tokio::test]
async fn test_add_returns_to_local_page_only() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/cart/add",
            &[
                ("slug", "termo-acero"),
                ("quantity", "1"),
                ("return_to", "/products/termo-acero"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/products/termo-acero");

    let response = app
        .post_form(
            "/cart/add",
            &[
                ("slug", "termo-acero"),
                ("quantity", "1"),
                ("return_to", "//evil.example/phish"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/cart");
}

#[tokio::test]
async fn test_add_beyond_stock_is_refused() {
    let app = TestApp::spawn().await;

    app.add_to_cart("mate-calabaza", 5).await;

    let html = app.page("/cart").await;
    assert!(html.contains("flash--error"));
    assert!(!html.contains("data-item-id"), "nothing was added");
}

#[tokio::test]
async fn test_add_unknown_or_sold_out_product() {
    let app = TestApp::spawn().await;

    app.add_to_cart("does-not-exist", 1).await;
    let html = app.page("/cart").await;
    assert!(html.contains("That product is no longer available."));

    app.add_to_cart("bombilla-alpaca", 1).await;
    let html = app.page("/cart").await;
    assert!(html.contains("flash--error"));
    assert!(html.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_update_and_remove_line() {
    let app = TestApp::spawn().await;
    app.add_to_cart("yerba-mate-1kg", 1).await;

    let html = app.page("/cart").await;
    let item_id = first_cart_item_id(&html).expect("cart line missing");

    let response = app
        .post_form("/cart/update", &[("item_id", &item_id), ("quantity", "3")])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let html = app.page("/cart").await;
    assert!(html.contains("Cart updated."));
    assert!(html.contains("$ 13,500.00"));
    assert!(html.contains("<span class=\"cart-count\">3</span>"));

    let response = app
        .post_form("/cart/remove", &[("item_id", &item_id)])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let html = app.page("/cart").await;
    assert!(html.contains("Item removed from your cart."));
    assert!(html.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_update_to_zero_removes_line() {
    let app = TestApp::spawn().await;
    app.add_to_cart("termo-acero", 1).await;
    let item_id = first_cart_item_id(&app.page("/cart").await).expect("cart line missing");

    app.post_form("/cart/update", &[("item_id", &item_id), ("quantity", "0")])
        .await;

    let html = app.page("/cart").await;
    assert!(html.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_update_with_stale_item_resyncs() {
    let app = TestApp::spawn().await;
    app.add_to_cart("termo-acero", 1).await;

    app.post_form("/cart/update", &[("item_id", "line-999"), ("quantity", "2")])
        .await;

    let html = app.page("/cart").await;
    assert!(html.contains("flash--error"));
    assert!(html.contains("Termo de acero 1L"), "backend cart kept");
}

#[tokio::test]
async fn test_dot_segment_item_id_cannot_reach_cart() {
    let app = TestApp::spawn().await;
    app.add_to_cart("termo-acero", 1).await;

    for id in ["..", "%2e%2e", "."] {
        let response = app.post_form("/cart/remove", &[("item_id", id)]).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{id}");
    }

    let html = app.page("/cart").await;
    assert!(html.contains("Termo de acero 1L"));
    assert!(html.contains("<span class=\"cart-count\">1</span>"));
}

#[tokio::test]
async fn test_clear_cart() {
    let app = TestApp::spawn().await;
    app.add_to_cart("yerba-mate-1kg", 1).await;
    app.add_to_cart("termo-acero", 1).await;

    let response = app.post_form("/cart/clear", &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let html = app.page("/cart").await;
    assert!(html.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_failed_update_during_outage_keeps_previous_cart() {
    let app = TestApp::spawn().await;
    app.add_to_cart("yerba-mate-1kg", 2).await;
    let html = app.page("/cart").await;
    let item_id = first_cart_item_id(&html).expect("cart line missing");

    app.shop.set_outage(true);
    let response = app
        .post_form("/cart/update", &[("item_id", &item_id), ("quantity", "5")])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let html = app.page("/cart").await;
    assert!(html.contains("flash--error"));
    assert!(html.contains("Something went wrong talking to the shop."));
    assert!(html.contains("<span class=\"cart-count\">2</span>"));
    assert!(!html.contains("<span class=\"cart-count\">5</span>"));

    app.shop.set_outage(false);
    let html = app.page("/cart").await;
    assert!(html.contains("<span class=\"cart-count\">2</span>"));
    assert!(html.contains("$ 9,000.00"));
}

#[tokio::test]
async fn test_guest_cart_survives_login() {
    let app = TestApp::spawn().await;
    app.add_to_cart("yerba-mate-1kg", 2).await;

    app.login().await;

    let html = app.page("/cart").await;
    assert!(html.contains("Yerba mate 1kg"));
    assert!(html.contains("<span class=\"cart-count\">2</span>"));
}

#[tokio::test]
async fn test_carts_are_per_browser() {
    let app = TestApp::spawn().await;
    app.add_to_cart("yerba-mate-1kg", 1).await;

    let other = vitrina_integration_tests::browser();
    let html = other
        .get(app.url("/cart"))
        .send()
        .await
        .expect("GET request failed")
        .text()
        .await
        .expect("Failed to read body");
    assert!(html.contains("Your cart is empty."));
}
