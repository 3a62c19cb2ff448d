use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use http::StatusCode;
use runtime_cache_service::CacheService;
use runtime_common::types::UserInput;
use runtime_common::RuntimeError;
use runtime_http::{error_response, Controller, RequestContext};
use runtime_repository::UserRepository;

use super::common::{list_query_key, parse_body, parse_id, parse_pagination};
use super::respond;

const ENTITY: &str = "users";

/// `GET /users` (§6): tag-keyed read-through list cache in front of
/// `UserRepository::list` (§4.9).
pub struct UsersIndex {
    repo: Arc<UserRepository>,
    cache: Arc<CacheService>,
    debug: bool,
}

impl UsersIndex {
    pub fn new(repo: Arc<UserRepository>, cache: Arc<CacheService>, debug: bool) -> Self {
        Self { repo, cache, debug }
    }
}

#[async_trait]
impl Controller for UsersIndex {
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

/// `POST /users` (§6): creates the row, then invalidates every cached list
/// for this entity (the new row may belong on any page).
pub struct UsersCreate {
    repo: Arc<UserRepository>,
    cache: Arc<CacheService>,
    debug: bool,
}

impl UsersCreate {
    pub fn new(repo: Arc<UserRepository>, cache: Arc<CacheService>, debug: bool) -> Self {
        Self { repo, cache, debug }
    }
}

#[async_trait]
impl Controller for UsersCreate {
    async fn call(&self, ctx: &mut RequestContext, _params: &HashMap<String, String>) -> Response {
        let input: UserInput = match parse_body(&ctx.body) {
            Ok(v) => v,
            Err(e) => return error_response(&e, self.debug),
        };

        let user = match self.repo.create(&input).await {
            Ok(u) => u,
            Err(e) => return error_response(&e.into(), self.debug),
        };

        if let Err(e) = self.cache.invalidate_lists(ENTITY).await {
            tracing::warn!(error = %e, "failed to invalidate user list cache after create");
        }

        respond::json(StatusCode::CREATED, &user)
    }
}

/// `GET /users/{id}` (§6): single-record read-through cache.
pub struct UsersShow {
    repo: Arc<UserRepository>,
    cache: Arc<CacheService>,
    debug: bool,
}

impl UsersShow {
    pub fn new(repo: Arc<UserRepository>, cache: Arc<CacheService>, debug: bool) -> Self {
        Self { repo, cache, debug }
    }
}

#[async_trait]
impl Controller for UsersShow {
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

        let user = match self.repo.find(id.into()).await {
            Ok(Some(u)) => u,
            Ok(None) => return error_response(&RuntimeError::NotFound(format!("user {id} not found")), self.debug),
            Err(e) => return error_response(&e.into(), self.debug),
        };

        let bytes = serde_json::to_vec(&user).unwrap_or_default();
        if let Err(e) = self.cache.set_record(ENTITY, &id_str, &bytes).await {
            tracing::warn!(error = %e, "failed to populate record cache");
        }
        ctx.cache_type = Some("miss");
        respond::raw_json(StatusCode::OK, bytes)
    }
}

/// `GET /users/email/{email}` (§6): secondary-column read-through cache.
/// Registered before `/users/{id}` so this static prefix wins the match
/// (§4.2).
pub struct UsersShowByEmail {
    repo: Arc<UserRepository>,
    cache: Arc<CacheService>,
    debug: bool,
}

impl UsersShowByEmail {
    pub fn new(repo: Arc<UserRepository>, cache: Arc<CacheService>, debug: bool) -> Self {
        Self { repo, cache, debug }
    }
}

#[async_trait]
impl Controller for UsersShowByEmail {
    async fn call(&self, ctx: &mut RequestContext, params: &HashMap<String, String>) -> Response {
        let email = match params.get("email") {
            Some(v) => v.clone(),
            None => return error_response(&RuntimeError::InvalidInput("missing email".to_string()), self.debug),
        };

        match self.cache.get_record_by_column(ENTITY, "email", &email).await {
            Ok(Some(bytes)) => {
                ctx.cache_type = Some("hit");
                return respond::raw_json(StatusCode::OK, bytes);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "record cache read failed, falling back to repository"),
        }

        let user = match self.repo.find_by_column("email", &email).await {
            Ok(Some(u)) => u,
            Ok(None) => return error_response(&RuntimeError::NotFound(format!("user with email {email} not found")), self.debug),
            Err(e) => return error_response(&e.into(), self.debug),
        };

        let bytes = serde_json::to_vec(&user).unwrap_or_default();
        if let Err(e) = self.cache.set_record_by_column(ENTITY, "email", &email, &bytes).await {
            tracing::warn!(error = %e, "failed to populate record cache");
        }
        ctx.cache_type = Some("miss");
        respond::raw_json(StatusCode::OK, bytes)
    }
}

/// `PUT /users/{id}` (§6): update, then invalidate the record and every
/// cached list (a changed field may affect list membership or ordering).
pub struct UsersUpdate {
    repo: Arc<UserRepository>,
    cache: Arc<CacheService>,
    debug: bool,
}

impl UsersUpdate {
    pub fn new(repo: Arc<UserRepository>, cache: Arc<CacheService>, debug: bool) -> Self {
        Self { repo, cache, debug }
    }
}

#[async_trait]
impl Controller for UsersUpdate {
    async fn call(&self, ctx: &mut RequestContext, params: &HashMap<String, String>) -> Response {
        let id = match parse_id(params, "id") {
            Ok(v) => v,
            Err(e) => return error_response(&e, self.debug),
        };
        let input: UserInput = match parse_body(&ctx.body) {
            Ok(v) => v,
            Err(e) => return error_response(&e, self.debug),
        };

        match self.repo.update(id.into(), &input).await {
            Ok(true) => {}
            Ok(false) => return error_response(&RuntimeError::NotFound(format!("user {id} not found")), self.debug),
            Err(e) => return error_response(&e.into(), self.debug),
        }

        if let Err(e) = self.cache.invalidate_record(ENTITY, &id.to_string()).await {
            tracing::warn!(error = %e, "failed to invalidate user record cache after update");
        }
        if let Err(e) = self.cache.invalidate_lists(ENTITY).await {
            tracing::warn!(error = %e, "failed to invalidate user list cache after update");
        }

        let updated = match self.repo.find(id.into()).await {
            Ok(Some(u)) => u,
            Ok(None) => return error_response(&RuntimeError::NotFound(format!("user {id} not found")), self.debug),
            Err(e) => return error_response(&e.into(), self.debug),
        };

        respond::json(StatusCode::OK, &updated)
    }
}

/// `DELETE /users/{id}` (§6): delete, then invalidate the record and every
/// cached list.
pub struct UsersDelete {
    repo: Arc<UserRepository>,
    cache: Arc<CacheService>,
    debug: bool,
}

impl UsersDelete {
    pub fn new(repo: Arc<UserRepository>, cache: Arc<CacheService>, debug: bool) -> Self {
        Self { repo, cache, debug }
    }
}

#[async_trait]
impl Controller for UsersDelete {
    async fn call(&self, _ctx: &mut RequestContext, params: &HashMap<String, String>) -> Response {
        let id = match parse_id(params, "id") {
            Ok(v) => v,
            Err(e) => return error_response(&e, self.debug),
        };

        match self.repo.delete(id.into()).await {
            Ok(true) => {}
            Ok(false) => return error_response(&RuntimeError::NotFound(format!("user {id} not found")), self.debug),
            Err(e) => return error_response(&e.into(), self.debug),
        }

        if let Err(e) = self.cache.invalidate_record(ENTITY, &id.to_string()).await {
            tracing::warn!(error = %e, "failed to invalidate user record cache after delete");
        }
        if let Err(e) = self.cache.invalidate_lists(ENTITY).await {
            tracing::warn!(error = %e, "failed to invalidate user list cache after delete");
        }

        respond::empty(StatusCode::NO_CONTENT)
    }
}
