//! Cache types for catalog responses.

use shopfront_core::{CollectionId, ProductId};

use super::types::{Collection, Page, Product, ProductQuery};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Products {
        page: u32,
        ordering: Option<String>,
        collection_id: Option<CollectionId>,
    },
    Collection(CollectionId),
    Collections,
}

impl CacheKey {
    /// Key for a product listing, or `None` when the listing must not be
    /// cached (free-text searches).
    pub(crate) fn for_products(query: &ProductQuery) -> Option<Self> {
        if query.is_search() {
            return None;
        }
        Some(Self::Products {
            page: query.page.unwrap_or(1).max(1),
            ordering: query.ordering.clone().filter(|o| !o.is_empty()),
            collection_id: query.collection_id,
        })
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Page<Product>),
    Collection(Box<Collection>),
    Collections(Vec<Collection>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_is_not_cacheable() {
        let query = ProductQuery {
            search: Some("mug".into()),
            ..ProductQuery::default()
        };
        assert_eq!(CacheKey::for_products(&query), None);
    }

    #[test]
    fn test_default_page_normalizes() {
        let first = CacheKey::for_products(&ProductQuery::default());
        let explicit = CacheKey::for_products(&ProductQuery {
            page: Some(1),
            ordering: Some(String::new()),
            ..ProductQuery::default()
        });
        assert_eq!(first, explicit);
    }
}
