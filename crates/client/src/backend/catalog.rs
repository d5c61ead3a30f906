//! Catalog endpoints: products and collections.

use shopfront_core::{CollectionId, ProductId};
use tracing::{debug, instrument};

use super::BackendClient;
use super::cache::{CacheKey, CacheValue};
use super::types::{Collection, Page, Product, ProductQuery};
use crate::error::Result;

impl BackendClient {
    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get a page of products.
    ///
    /// Listings without a search term are cached. A response without usable
    /// pagination fields normalizes to an empty page.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<Page<Product>> {
        let cache_key = CacheKey::for_products(query);

        if let Some(key) = &cache_key
            && let Some(CacheValue::Products(page)) = self.cache.get(key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let value: serde_json::Value = self
            .gateway
            .get_query("store/products/", &query.to_pairs())
            .await?;
        let page = Page::from_value(value);

        if let Some(key) = cache_key {
            self.cache
                .insert(key, CacheValue::Products(page.clone()))
                .await;
        }

        Ok(page)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Server` with status 404 if the product does not
    /// exist, or any transport error.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Product> {
        let cache_key = CacheKey::Product(id);

        if let Some(CacheValue::Product(product)) = self.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self.gateway.get(&format!("store/products/{id}/")).await?;

        self.cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    // =========================================================================
    // Collection Methods
    // =========================================================================

    /// List all collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn collections(&self) -> Result<Vec<Collection>> {
        if let Some(CacheValue::Collections(collections)) =
            self.cache.get(&CacheKey::Collections).await
        {
            debug!("Cache hit for collections");
            return Ok(collections);
        }

        let value: serde_json::Value = self.gateway.get("store/collections/").await?;
        let collections = Page::<Collection>::from_value(value).results;

        self.cache
            .insert(
                CacheKey::Collections,
                CacheValue::Collections(collections.clone()),
            )
            .await;

        Ok(collections)
    }

    /// Get a collection by id.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Server` with status 404 if the collection does
    /// not exist, or any transport error.
    #[instrument(skip(self), fields(collection_id = %id))]
    pub async fn collection(&self, id: CollectionId) -> Result<Collection> {
        let cache_key = CacheKey::Collection(id);

        if let Some(CacheValue::Collection(collection)) = self.cache.get(&cache_key).await {
            debug!("Cache hit for collection");
            return Ok(*collection);
        }

        let collection: Collection = self
            .gateway
            .get(&format!("store/collections/{id}/"))
            .await?;

        self.cache
            .insert(
                cache_key,
                CacheValue::Collection(Box::new(collection.clone())),
            )
            .await;

        Ok(collection)
    }
}
