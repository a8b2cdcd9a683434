//! Catalog pages: home, listing, search, product and category detail.

use reqwest::StatusCode;
use vitrina_integration_tests::TestApp;

#[tokio::test]
async fn test_home_shows_banner_featured_and_categories() {
    let app = TestApp::spawn().await;

    let html = app.page("/").await;
    assert!(html.contains("Otoño matero"), "banner missing");
    assert!(html.contains("Yerba mate 1kg"));
    assert!(html.contains("Mate de calabaza"));
    assert!(!html.contains("Termo de acero 1L"), "not featured");
    assert!(html.contains("/categories/accesorios"));
}

#[tokio::test]
async fn test_home_renders_when_backend_is_down() {
    let app = TestApp::spawn().await;
    app.shop.set_outage(true);

    let html = app.page("/").await;
    assert!(html.contains("New products are on their way."));
}

#[tokio::test]
async fn test_listing_paginates() {
    let app = TestApp::spawn().await;

    let first = app.page("/products").await;
    assert!(first.contains("Yerba mate 1kg"));
    assert!(first.contains("Mate de calabaza"));
    assert!(!first.contains("Termo de acero 1L"));
    assert!(first.contains("page=2"), "next page link missing");

    let second = app.page("/products?page=2").await;
    assert!(second.contains("Bombilla de alpaca"));
    assert!(second.contains("Termo de acero 1L"));
    assert!(!second.contains("Yerba mate 1kg"));
}

#[tokio::test]
async fn test_search_filters_and_keeps_query() {
    let app = TestApp::spawn().await;

    let html = app.page("/products?q=termo").await;
    assert!(html.contains("Results for"));
    assert!(html.contains("Termo de acero 1L"));
    assert!(!html.contains("Yerba mate 1kg"));

    let none = app.page("/products?q=asado").await;
    assert!(none.contains("No products found."));
}

#[tokio::test]
async fn test_unknown_sort_falls_back_to_default() {
    let app = TestApp::spawn().await;

    let response = app.get("/products?sort=cheapest-first").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_product_page() {
    let app = TestApp::spawn().await;

    let html = app.page("/products/mate-calabaza").await;
    assert!(html.contains("<h1>Mate de calabaza</h1>"));
    assert!(html.contains("<s>"), "sale price is struck through");
    assert!(html.contains("Only 3 left."));
    assert!(html.contains("action=\"/cart/add\""));
}

#[tokio::test]
async fn test_sold_out_product_has_no_add_form() {
    let app = TestApp::spawn().await;

    let html = app.page("/products/bombilla-alpaca").await;
    assert!(html.contains("Out of stock"));
    assert!(!html.contains("action=\"/cart/add\""));
}

#[tokio::test]
async fn test_missing_product_is_404() {
    let app = TestApp::spawn().await;

    let response = app.get("/products/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let html = response.text().await.expect("Failed to read body");
    assert!(html.contains("find that page"));
}

#[tokio::test]
async fn test_category_pages() {
    let app = TestApp::spawn().await;

    let index = app.page("/categories").await;
    assert!(index.contains("Yerba mate"));
    assert!(index.contains("Accesorios"));

    let show = app.page("/categories/yerba").await;
    assert!(show.contains("<h1>Yerba mate</h1>"));
    assert!(show.contains("Yerba mate 1kg"));
    assert!(!show.contains("Termo de acero 1L"));

    let missing = app.get("/categories/parrilla").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_pages_and_fallback() {
    let app = TestApp::spawn().await;

    for slug in ["about", "faq", "terms", "privacy"] {
        let response = app.get(&format!("/pages/{slug}")).await;
        assert_eq!(response.status(), StatusCode::OK, "/pages/{slug}");
    }

    assert_eq!(
        app.get("/pages/careers").await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(app.get("/no/such/route").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_probes() {
    let app = TestApp::spawn().await;

    assert_eq!(app.get("/health").await.status(), StatusCode::OK);
    assert_eq!(app.get("/health/ready").await.status(), StatusCode::OK);

    app.shop.set_outage(true);
    assert_eq!(
        app.get("/health/ready").await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn test_pages_carry_security_headers() {
    let app = TestApp::spawn().await;

    let response = app.get("/").await;
    let headers = response.headers();
    assert!(headers.contains_key("content-security-policy"));
    assert!(headers.contains_key("x-request-id"));
    assert_eq!(
        headers
            .get("x-content-type-options")
            .and_then(|v| v.to_str().ok()),
        Some("nosniff")
    );
}
