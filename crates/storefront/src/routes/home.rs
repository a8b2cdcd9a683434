//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::backend::{Banner, Category, Product, ProductQuery};
use crate::filters;
use crate::middleware::PageContext;
use crate::state::AppState;

/// Number of featured products on the home page.
const FEATURED_COUNT: u32 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub banners: Vec<Banner>,
    pub featured: Vec<Product>,
    pub categories: Vec<Category>,
}

/// Display the home page.
///
/// Each section is fetched concurrently; a failing section is left empty
/// so the rest of the page still renders.
#[instrument(skip(state, page))]
pub async fn home(State(state): State<AppState>, page: PageContext) -> HomeTemplate {
    let backend = state.backend();
    let featured_query = ProductQuery {
        featured: true,
        ..ProductQuery::first_page(FEATURED_COUNT)
    };

    let (banners, featured, categories) = tokio::join!(
        backend.list_banners(),
        backend.list_products(&featured_query),
        backend.list_categories(),
    );

    let banners = banners.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to fetch banners");
        Vec::new()
    });
    let featured = featured.map_or_else(
        |e| {
            tracing::warn!(error = %e, "Failed to fetch featured products");
            Vec::new()
        },
        |page| page.items,
    );
    let categories = categories.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to fetch categories");
        Vec::new()
    });

    HomeTemplate {
        page,
        banners,
        featured,
        categories,
    }
}
