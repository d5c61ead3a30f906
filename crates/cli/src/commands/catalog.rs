//! Catalog browsing commands.

use clap::Subcommand;
use shopfront_client::Storefront;
use shopfront_client::backend::types::ProductQuery;
use shopfront_core::{CollectionId, ProductId};

use super::CommandResult;
use crate::render;

#[derive(Subcommand)]
pub enum ProductAction {
    /// List products
    List {
        #[arg(long)]
        page: Option<u32>,

        /// Free-text search
        #[arg(long)]
        search: Option<String>,

        /// Ordering field, prefix with `-` for descending (e.g. `-unit_price`)
        #[arg(long, allow_hyphen_values = true)]
        ordering: Option<String>,

        /// Only products in this collection
        #[arg(long)]
        collection: Option<i64>,
    },
    /// Show one product
    Show { id: i64 },
}

#[derive(Subcommand)]
pub enum CollectionAction {
    /// List collections
    List,
    /// Show one collection and its first page of products
    Show { id: i64 },
}

pub async fn products(storefront: &Storefront, action: ProductAction) -> CommandResult {
    match action {
        ProductAction::List {
            page,
            search,
            ordering,
            collection,
        } => {
            let query = ProductQuery {
                page,
                search,
                ordering,
                collection_id: collection.map(CollectionId::new),
            };
            let page = storefront.backend().products(&query).await?;
            render::product_page(&page);
        }
        ProductAction::Show { id } => {
            let product = storefront.backend().product(ProductId::new(id)).await?;
            let images: Vec<String> = product
                .images
                .iter()
                .map(|image| storefront.media_url(Some(&image.image)))
                .collect();
            render::product(&product, &images);
        }
    }
    Ok(())
}

pub async fn collections(storefront: &Storefront, action: CollectionAction) -> CommandResult {
    match action {
        CollectionAction::List => {
            let collections = storefront.backend().collections().await?;
            render::collections(&collections);
        }
        CollectionAction::Show { id } => {
            let id = CollectionId::new(id);
            let collection = storefront.backend().collection(id).await?;
            render::collections(std::slice::from_ref(&collection));
            let page = storefront
                .backend()
                .products(&ProductQuery {
                    collection_id: Some(id),
                    ..ProductQuery::default()
                })
                .await?;
            render::product_page(&page);
        }
    }
    Ok(())
}
