//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitrina_core::validation::MAX_LINE_QUANTITY;

use super::Pagination;
use crate::backend::{Category, Product, ProductPage, ProductQuery, ProductSort};
use crate::error::Result;
use crate::filters;
use crate::middleware::PageContext;
use crate::models::session_keys;
use crate::services::CartMirror;
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListingParams {
    pub page: Option<u32>,
    pub q: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
}

impl ListingParams {
    fn search(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(String::from)
    }

    fn category(&self) -> Option<String> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
    }

    fn sort(&self) -> Option<ProductSort> {
        self.sort.as_deref().and_then(ProductSort::from_param)
    }

    /// Backend query for these parameters.
    #[must_use]
    pub fn to_query(&self, per_page: u32) -> ProductQuery {
        ProductQuery {
            page: self.page.unwrap_or(1).max(1),
            category: self.category(),
            search: self.search(),
            sort: self.sort(),
            ..ProductQuery::first_page(per_page)
        }
    }
}

/// Sort dropdown entry.
#[derive(Debug, Clone)]
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn sort_options(current: Option<ProductSort>) -> Vec<SortOption> {
    let current = current.unwrap_or_default();
    ProductSort::ALL
        .into_iter()
        .map(|sort| SortOption {
            value: sort.as_param(),
            label: sort.label(),
            selected: sort == current,
        })
        .collect()
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub products: ProductPage,
    pub categories: Vec<Category>,
    pub search: String,
    pub category: String,
    pub sort_options: Vec<SortOption>,
    pub pagination: Pagination,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: Product,
    pub in_cart: u32,
    pub max_quantity: u32,
    pub return_to: String,
}

/// Display product listing page.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    Query(params): Query<ListingParams>,
) -> Result<ProductsIndexTemplate> {
    let query = params.to_query(state.config().products_per_page);
    let products = state.backend().list_products(&query).await?;

    let categories = state.backend().list_categories().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to fetch categories for filter");
        Vec::new()
    });

    let search = query.search.clone().unwrap_or_default();
    let category = query.category.clone().unwrap_or_default();
    let sort = query.sort.map(ProductSort::as_param).unwrap_or_default();
    let pagination = Pagination::new(
        &products,
        "/products",
        &[("q", &search), ("category", &category), ("sort", sort)],
    );

    Ok(ProductsIndexTemplate {
        page,
        products,
        categories,
        search,
        category,
        sort_options: sort_options(query.sort),
        pagination,
    })
}

/// Display product detail page.
#[instrument(skip(state, session, page))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Path(slug): Path<String>,
) -> Result<ProductShowTemplate> {
    let product = state.backend().get_product(&slug).await?;

    let in_cart = session
        .get::<CartMirror>(session_keys::CART)
        .await?
        .map_or(0, |cart| cart.quantity_of(&product.id));
    let max_quantity = product
        .stock
        .map_or(MAX_LINE_QUANTITY, |stock| stock.min(MAX_LINE_QUANTITY))
        .saturating_sub(in_cart);
    let return_to = format!("/products/{}", urlencoding::encode(&product.slug));

    Ok(ProductShowTemplate {
        page,
        product,
        in_cart,
        max_quantity,
        return_to,
    })
}
