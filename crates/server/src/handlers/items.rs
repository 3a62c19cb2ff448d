use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use http::StatusCode;
use runtime_cache_service::CacheService;
use runtime_common::types::ItemInput;
use runtime_common::RuntimeError;
use runtime_http::{error_response, Controller, RequestContext};
use runtime_repository::ItemRepository;

use super::common::{list_query_key, parse_body, parse_id, parse_pagination};
use super::respond;

const ENTITY: &str = "items";

/// `GET /items` (§6): tag-keyed read-through list cache in front of
/// `ItemRepository::list` (§4.9).
pub struct ItemsIndex {
    repo: Arc<ItemRepository>,
    cache: Arc<CacheService>,
    debug: bool,
}

impl ItemsIndex {
    pub fn new(repo: Arc<ItemRepository>, cache: Arc<CacheService>, debug: bool) -> Self {
        Self { repo, cache, debug }
    }
}

#[async_trait]
impl Controller for ItemsIndex {
    async fn call(&self, ctx: &mut RequestContext, _params: &HashMap<String, String>) -> Response {
        let query = parse_pagination(&ctx.query);
        let key = list_query_key(&query);

        match self.cache.get_list(ENTITY, &key).await {
            Ok(Some(bytes)) => {
                ctx.cache_type = Some("hit");
                return respond::raw_json(StatusCode::OK, bytes);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "list cache read failed, falling back to repository"),
        }

        let result = match self.repo.list(&query).await {
            Ok(r) => r,
            Err(e) => return error_response(&e.into(), self.debug),
        };

        let bytes = serde_json::to_vec(&result).unwrap_or_default();
        if let Err(e) = self.cache.set_list(ENTITY, &key, &bytes).await {
            tracing::warn!(error = %e, "failed to populate list cache");
        }
        ctx.cache_type = Some("miss");
        respond::raw_json(StatusCode::OK, bytes)
    }
}

/// `POST /items` (§6).
pub struct ItemsCreate {
    repo: Arc<ItemRepository>,
    cache: Arc<CacheService>,
    debug: bool,
}

impl ItemsCreate {
    pub fn new(repo: Arc<ItemRepository>, cache: Arc<CacheService>, debug: bool) -> Self {
        Self { repo, cache, debug }
    }
}

#[async_trait]
impl Controller for ItemsCreate {
    async fn call(&self, ctx: &mut RequestContext, _params: &HashMap<String, String>) -> Response {
        let input: ItemInput = match parse_body(&ctx.body) {
            Ok(v) => v,
            Err(e) => return error_response(&e, self.debug),
        };

        let item = match self.repo.create(&input).await {
            Ok(i) => i,
            Err(e) => return error_response(&e.into(), self.debug),
        };

        if let Err(e) = self.cache.invalidate_lists(ENTITY).await {
            tracing::warn!(error = %e, "failed to invalidate item list cache after create");
        }

        respond::json(StatusCode::CREATED, &item)
    }
}

/// `GET /items/{id}` (§6): single-record read-through cache.
pub struct ItemsShow {
    repo: Arc<ItemRepository>,
    cache: Arc<CacheService>,
    debug: bool,
}

impl ItemsShow {
    pub fn new(repo: Arc<ItemRepository>, cache: Arc<CacheService>, debug: bool) -> Self {
        Self { repo, cache, debug }
    }
}

#[async_trait]
impl Controller for ItemsShow {
    async fn call(&self, ctx: &mut RequestContext, params: &HashMap<String, String>) -> Response {
        let id = match parse_id(params, "id") {
            Ok(v) => v,
            Err(e) => return error_response(&e, self.debug),
        };
        let id_str = id.to_string();

        match self.cache.get_record(ENTITY, &id_str).await {
            Ok(Some(bytes)) => {
                ctx.cache_type = Some("hit");
                return respond::raw_json(StatusCode::OK, bytes);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "record cache read failed, falling back to repository"),
        }

        let item = match self.repo.find(id.into()).await {
            Ok(Some(i)) => i,
            Ok(None) => return error_response(&RuntimeError::NotFound(format!("item {id} not found")), self.debug),
            Err(e) => return error_response(&e.into(), self.debug),
        };

        let bytes = serde_json::to_vec(&item).unwrap_or_default();
        if let Err(e) = self.cache.set_record(ENTITY, &id_str, &bytes).await {
            tracing::warn!(error = %e, "failed to populate record cache");
        }
        ctx.cache_type = Some("miss");
        respond::raw_json(StatusCode::OK, bytes)
    }
}

/// `GET /items/sku/{sku}` (§6): secondary-column read-through cache.
/// Registered before `/items/{id}` so this static prefix wins the match
/// (§4.2).
pub struct ItemsShowBySku {
    repo: Arc<ItemRepository>,
    cache: Arc<CacheService>,
    debug: bool,
}

impl ItemsShowBySku {
    pub fn new(repo: Arc<ItemRepository>, cache: Arc<CacheService>, debug: bool) -> Self {
        Self { repo, cache, debug }
    }
}

#[async_trait]
impl Controller for ItemsShowBySku {
    async fn call(&self, ctx: &mut RequestContext, params: &HashMap<String, String>) -> Response {
        let sku = match params.get("sku") {
            Some(v) => v.clone(),
            None => return error_response(&RuntimeError::InvalidInput("missing sku".to_string()), self.debug),
        };

        match self.cache.get_record_by_column(ENTITY, "sku", &sku).await {
            Ok(Some(bytes)) => {
                ctx.cache_type = Some("hit");
                return respond::raw_json(StatusCode::OK, bytes);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "record cache read failed, falling back to repository"),
        }

        let item = match self.repo.find_by_column("sku", &sku).await {
            Ok(Some(i)) => i,
            Ok(None) => return error_response(&RuntimeError::NotFound(format!("item with sku {sku} not found")), self.debug),
            Err(e) => return error_response(&e.into(), self.debug),
        };

        let bytes = serde_json::to_vec(&item).unwrap_or_default();
        if let Err(e) = self.cache.set_record_by_column(ENTITY, "sku", &sku, &bytes).await {
            tracing::warn!(error = %e, "failed to populate record cache");
        }
        ctx.cache_type = Some("miss");
        respond::raw_json(StatusCode::OK, bytes)
    }
}

/// `PUT /items/{id}` (§6): update, then invalidate the record and every
/// cached list.
pub struct ItemsUpdate {
    repo: Arc<ItemRepository>,
    cache: Arc<CacheService>,
    debug: bool,
}

impl ItemsUpdate {
    pub fn new(repo: Arc<ItemRepository>, cache: Arc<CacheService>, debug: bool) -> Self {
        Self { repo, cache, debug }
    }
}

#[async_trait]
impl Controller for ItemsUpdate {
    async fn call(&self, ctx: &mut RequestContext, params: &HashMap<String, String>) -> Response {
        let id = match parse_id(params, "id") {
            Ok(v) => v,
            Err(e) => return error_response(&e, self.debug),
        };
        let input: ItemInput = match parse_body(&ctx.body) {
            Ok(v) => v,
            Err(e) => return error_response(&e, self.debug),
        };

        match self.repo.update(id.into(), &input).await {
            Ok(true) => {}
            Ok(false) => return error_response(&RuntimeError::NotFound(format!("item {id} not found")), self.debug),
            Err(e) => return error_response(&e.into(), self.debug),
        }

        if let Err(e) = self.cache.invalidate_record(ENTITY, &id.to_string()).await {
            tracing::warn!(error = %e, "failed to invalidate item record cache after update");
        }
        if let Err(e) = self.cache.invalidate_lists(ENTITY).await {
            tracing::warn!(error = %e, "failed to invalidate item list cache after update");
        }

        let updated = match self.repo.find(id.into()).await {
            Ok(Some(i)) => i,
            Ok(None) => return error_response(&RuntimeError::NotFound(format!("item {id} not found")), self.debug),
            Err(e) => return error_response(&e.into(), self.debug),
        };

        respond::json(StatusCode::OK, &updated)
    }
}

/// `DELETE /items/{id}` (§6): delete, then invalidate the record and every
/// cached list.
pub struct ItemsDelete {
    repo: Arc<ItemRepository>,
    cache: Arc<CacheService>,
    debug: bool,
}

impl ItemsDelete {
    pub fn new(repo: Arc<ItemRepository>, cache: Arc<CacheService>, debug: bool) -> Self {
        Self { repo, cache, debug }
    }
}

#[async_trait]
impl Controller for ItemsDelete {
    async fn call(&self, _ctx: &mut RequestContext, params: &HashMap<String, String>) -> Response {
        let id = match parse_id(params, "id") {
            Ok(v) => v,
            Err(e) => return error_response(&e, self.debug),
        };

        match self.repo.delete(id.into()).await {
            Ok(true) => {}
            Ok(false) => return error_response(&RuntimeError::NotFound(format!("item {id} not found")), self.debug),
            Err(e) => return error_response(&e.into(), self.debug),
        }

        if let Err(e) = self.cache.invalidate_record(ENTITY, &id.to_string()).await {
            tracing::warn!(error = %e, "failed to invalidate item record cache after delete");
        }
        if let Err(e) = self.cache.invalidate_lists(ENTITY).await {
            tracing::warn!(error = %e, "failed to invalidate item list cache after delete");
        }

        respond::empty(StatusCode::NO_CONTENT)
    }
}
