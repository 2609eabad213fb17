//! REST/JSON client for the document-store gateway.
//!
//! Uses `reqwest` 0.13 for HTTP with a bearer token on every request.
//! Product reads are cached using `moka` (5-minute TTL by default); prefix
//! searches, wishlist, order and address reads always go to the store.

mod cache;
mod conversions;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use moka::future::Cache;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use bazaar_core::{
    AddressId, Order, OrderId, Product, ProductId, ProductRecord, SavedAddress, ShippingAddress,
    UserId, WishlistEntry, WishlistEntryId,
};

use super::{RemoteError, excerpt};
use crate::checkout::OrderDraft;
use crate::config::BackendConfig;
use crate::services::{
    AddressService, CatalogService, FeedCursor, OrderService, WishlistService,
};

use cache::{CacheKey, CacheValue};
use conversions::{
    AddressUpdateDocument, CreatedDocument, ListEnvelope, NewAddressDocument,
    NewWishlistDocument, convert_product, convert_products,
};

/// Error bodies are truncated to this many characters.
const ERROR_BODY_CHARS: usize = 200;

// =============================================================================
// RestBackend
// =============================================================================

/// Client for the document-store gateway.
///
/// Cheap to clone; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct RestBackend {
    inner: Arc<RestBackendInner>,
}

struct RestBackendInner {
    client: reqwest::Client,
    base_url: Url,
    api_token: SecretString,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for RestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBackend")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl RestBackend {
    /// Create a gateway client.
    ///
    /// `request_timeout` is also applied at the HTTP layer so sockets are
    /// released even when a caller does not bound the call itself.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Http` if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig, request_timeout: Duration) -> Result<Self, RemoteError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("bazaar/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(RestBackendInner {
                client,
                base_url: config.base_url.clone(),
                api_token: config.api_token.clone(),
                cache,
            }),
        })
    }

    /// Build `{base_url}/{segments...}?{query...}`.
    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, RemoteError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::Malformed("backend URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Send a request and return the body, or `None` on 404.
    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Option<String>, RemoteError> {
        let mut request = self
            .inner
            .client
            .request(method.clone(), url.clone())
            .bearer_auth(self.inner.api_token.expose_secret());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, %method, path = url.path(), "Gateway request failed");
            e
        })?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!(%method, path = url.path(), "Document not found");
            return Ok(None);
        }

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            tracing::warn!(%method, path = url.path(), retry_after, "Gateway rate limited");
            return Err(RemoteError::RateLimited(retry_after));
        }

        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!(
                status = %status,
                %method,
                path = url.path(),
                body = %excerpt(&text, 500),
                "Gateway returned non-success status"
            );
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message: excerpt(&text, ERROR_BODY_CHARS),
            });
        }

        Ok(Some(text))
    }

    /// GET a JSON document, `None` on 404.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, RemoteError> {
        match self.send::<()>(Method::GET, url, None).await? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// GET a listing; a missing collection is an empty listing.
    async fn get_list<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, RemoteError> {
        Ok(self
            .get_json::<ListEnvelope<T>>(url)
            .await?
            .map(|envelope| envelope.documents)
            .unwrap_or_default())
    }

    /// Send a write whose target must exist.
    async fn write<B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        what: impl Into<String>,
    ) -> Result<String, RemoteError> {
        self.send(method, url, body)
            .await?
            .ok_or_else(|| RemoteError::NotFound(what.into()))
    }

    /// POST a new document and return its ID.
    async fn post_document<B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<String, RemoteError> {
        let text = self.write(Method::POST, url.clone(), Some(body), url.path()).await?;
        let created: CreatedDocument = serde_json::from_str(&text)?;
        Ok(created.id)
    }

    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, RemoteError> {
        let url = self.url(&["products", id.as_str()], &[])?;
        let Some(record) = self.get_json::<ProductRecord>(url).await? else {
            self.inner.cache.invalidate(&CacheKey::Product(id.clone())).await;
            return Ok(None);
        };

        let product = convert_product(record)?;
        self.inner
            .cache
            .insert(
                CacheKey::Product(id.clone()),
                CacheValue::Product(Box::new(product.clone())),
            )
            .await;
        Ok(Some(product))
    }

    async fn cached_list(&self, key: CacheKey, url: Url) -> Result<Vec<Product>, RemoteError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!(?key, "Cache hit for product listing");
            return Ok(products);
        }

        let products = convert_products(self.get_list::<ProductRecord>(url).await?);
        self.inner
            .cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    // =========================================================================
    // Catalog administration
    // =========================================================================

    /// Create or replace a product document.
    ///
    /// Invalidates cached reads so the change is visible immediately to this
    /// client.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway rejects the write.
    #[instrument(skip(self, product), fields(product_id = %product.id()))]
    pub async fn put_product(&self, product: &Product) -> Result<(), RemoteError> {
        let url = self.url(&["products", product.id().as_str()], &[])?;
        // A 404 on PUT means the collection route is missing, not the product.
        self.write(Method::PUT, url, Some(product), "products collection")
            .await?;
        self.inner.cache.invalidate_all();
        Ok(())
    }
}

fn limit_param(limit: usize) -> String {
    limit.to_string()
}

// =============================================================================
// Service implementations
// =============================================================================

#[async_trait]
impl CatalogService for RestBackend {
    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, RemoteError> {
        if let Some(CacheValue::Product(product)) =
            self.inner.cache.get(&CacheKey::Product(id.clone())).await
        {
            debug!("Cache hit for product");
            return Ok(Some(*product));
        }
        self.fetch_product(id).await
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn refresh_product(&self, id: &ProductId) -> Result<Option<Product>, RemoteError> {
        self.fetch_product(id).await
    }

    #[instrument(skip(self))]
    async fn list_by_category(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<Product>, RemoteError> {
        let url = self.url(
            &["products"],
            &[("category", category), ("limit", &limit_param(limit))],
        )?;
        self.cached_list(
            CacheKey::Category {
                name: category.to_string(),
                limit,
            },
            url,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn search_by_name_prefix(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<Product>, RemoteError> {
        let url = self.url(
            &["products"],
            &[("prefix", prefix), ("limit", &limit_param(limit))],
        )?;
        Ok(convert_products(self.get_list(url).await?))
    }

    #[instrument(skip(self))]
    async fn list_recent(
        &self,
        limit: usize,
        after: Option<&FeedCursor>,
    ) -> Result<Vec<Product>, RemoteError> {
        let limit_value = limit_param(limit);
        let created_at = after
            .and_then(|cursor| cursor.created_at)
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true));

        let mut query = vec![("limit", limit_value.as_str())];
        if let Some(cursor) = after {
            query.push(("afterId", cursor.id.as_str()));
        }
        if let Some(created_at) = &created_at {
            query.push(("afterCreatedAt", created_at.as_str()));
        }

        let url = self.url(&["products"], &query)?;
        let key = CacheKey::Recent {
            limit,
            after: after.cloned(),
        };
        self.cached_list(key, url).await
    }
}

#[async_trait]
impl WishlistService for RestBackend {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list(&self, user_id: &UserId) -> Result<Vec<WishlistEntry>, RemoteError> {
        let url = self.url(&["wishlist"], &[("userId", user_id.as_str())])?;
        self.get_list(url).await
    }

    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    async fn add(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<WishlistEntryId, RemoteError> {
        let url = self.url(&["wishlist"], &[])?;
        let body = NewWishlistDocument {
            user_id,
            product_id,
            created_at: Utc::now(),
        };
        Ok(WishlistEntryId::new(self.post_document(url, &body).await?))
    }

    #[instrument(skip(self), fields(entry_id = %entry_id))]
    async fn remove(&self, entry_id: &WishlistEntryId) -> Result<(), RemoteError> {
        let url = self.url(&["wishlist", entry_id.as_str()], &[])?;
        self.write::<()>(
            Method::DELETE,
            url,
            None,
            format!("wishlist entry {entry_id}"),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl OrderService for RestBackend {
    #[instrument(skip(self, draft), fields(user_id = %draft.user_id()))]
    async fn create(&self, draft: &OrderDraft) -> Result<OrderId, RemoteError> {
        let url = self.url(&["orders"], &[])?;
        Ok(OrderId::new(self.post_document(url, draft).await?))
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Order>, RemoteError> {
        let url = self.url(&["orders"], &[("userId", user_id.as_str())])?;
        let mut orders: Vec<Order> = self.get_list(url).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>, RemoteError> {
        let url = self.url(&["orders", order_id.as_str()], &[])?;
        self.get_json(url).await
    }
}

#[async_trait]
impl AddressService for RestBackend {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list(&self, user_id: &UserId) -> Result<Vec<SavedAddress>, RemoteError> {
        let url = self.url(&["addresses"], &[("userId", user_id.as_str())])?;
        let mut addresses: Vec<SavedAddress> = self.get_list(url).await?;
        addresses.sort_by_key(|a| !a.is_default);
        Ok(addresses)
    }

    #[instrument(skip(self, address), fields(user_id = %user_id))]
    async fn add(
        &self,
        user_id: &UserId,
        address: &ShippingAddress,
        is_default: bool,
    ) -> Result<AddressId, RemoteError> {
        let url = self.url(&["addresses"], &[])?;
        let body = NewAddressDocument {
            user_id,
            address,
            is_default,
            created_at: Utc::now(),
        };
        Ok(AddressId::new(self.post_document(url, &body).await?))
    }

    #[instrument(skip(self, address), fields(address_id = %address_id))]
    async fn update(
        &self,
        address_id: &AddressId,
        address: &ShippingAddress,
    ) -> Result<(), RemoteError> {
        let url = self.url(&["addresses", address_id.as_str()], &[])?;
        let body = AddressUpdateDocument {
            address,
            updated_at: Utc::now(),
        };
        self.write(Method::PUT, url, Some(&body), format!("address {address_id}"))
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(address_id = %address_id))]
    async fn remove(&self, address_id: &AddressId) -> Result<(), RemoteError> {
        let url = self.url(&["addresses", address_id.as_str()], &[])?;
        self.write::<()>(Method::DELETE, url, None, format!("address {address_id}"))
            .await?;
        Ok(())
    }
}
