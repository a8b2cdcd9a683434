//! Cache types for catalog responses.

use super::types::{Banner, Category, Product, ProductPage, ProductQuery};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(String),
    Products(ProductQuery),
    Category(String),
    Categories,
    Banners,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(ProductPage),
    Category(Box<Category>),
    Categories(Vec<Category>),
    Banners(Vec<Banner>),
}
