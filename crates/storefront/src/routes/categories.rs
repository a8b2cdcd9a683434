//! Category route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::instrument;

use super::Pagination;
use crate::backend::{Category, ProductPage, ProductQuery};
use crate::error::Result;
use crate::filters;
use crate::middleware::PageContext;
use crate::state::AppState;

/// Category listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/index.html")]
pub struct CategoriesIndexTemplate {
    pub page: PageContext,
    pub categories: Vec<Category>,
}

/// Category detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/show.html")]
pub struct CategoryShowTemplate {
    pub page: PageContext,
    pub category: Category,
    pub products: ProductPage,
    pub pagination: Pagination,
}

/// Pagination parameters for a category page.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
}

/// Display category listing page.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
) -> Result<CategoriesIndexTemplate> {
    let categories = state.backend().list_categories().await?;
    Ok(CategoriesIndexTemplate { page, categories })
}

/// Display category detail page with its products.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    Path(slug): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<CategoryShowTemplate> {
    let category = state.backend().get_category(&slug).await?;

    let query = ProductQuery {
        page: params.page.unwrap_or(1).max(1),
        category: Some(category.slug.clone()),
        ..ProductQuery::first_page(state.config().products_per_page)
    };
    let products = state.backend().list_products(&query).await?;

    let path = format!("/categories/{}", urlencoding::encode(&category.slug));
    let pagination = Pagination::new(&products, &path, &[]);

    Ok(CategoryShowTemplate {
        page,
        category,
        products,
        pagination,
    })
}
