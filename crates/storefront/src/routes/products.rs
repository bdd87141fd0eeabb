//! Catalog feed handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};

use boutique_core::{CatalogFeed, ProductId, ProductSummary};

use crate::error::Result;
use crate::state::AppState;

/// List active products.
///
/// The chat bot mirrors its catalog from this endpoint.
pub async fn index(State(state): State<AppState>) -> Result<Json<CatalogFeed>> {
    let products = state.commerce().list_products().await?;
    Ok(Json(CatalogFeed {
        products: products.iter().map(|p| p.summary()).collect(),
    }))
}

/// One active product. Withdrawn products are not found.
pub async fn show(
    State(state): State<AppState>,
    path: std::result::Result<Path<ProductId>, PathRejection>,
) -> Result<Json<ProductSummary>> {
    let Path(product_id) = path?;
    let product = state.commerce().product(product_id).await?;
    Ok(Json(product.summary()))
}
