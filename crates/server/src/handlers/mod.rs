//! Route table construction (§6): every controller is constructed once per
//! worker with its dependencies injected, then registered against the
//! method/path it serves. Static prefixes (`/users/email/{email}`,
//! `/items/sku/{sku}`) are registered before the parametric `{id}` routes
//! they'd otherwise compete with (§4.2).

mod async_users;
mod banner;
mod common;
mod health;
mod items;
mod metrics;
mod respond;
mod users;

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use runtime_cache_service::CacheService;
use runtime_http::Router;
use runtime_repository::{ItemRepository, UserRepository};
use runtime_task::ChannelQueue;

pub use health::HealthSource;

#[allow(clippy::too_many_arguments)]
pub fn build_router(
    user_repo: Arc<UserRepository>,
    item_repo: Arc<ItemRepository>,
    cache_service: Arc<CacheService>,
    channel: Arc<ChannelQueue>,
    health_source: Arc<HealthSource>,
    metrics_handle: PrometheusHandle,
    debug: bool,
) -> Router {
    let mut router = Router::new();

    router.add("GET", "/", Arc::new(banner::BannerController), vec![]);
    router.add(
        "GET",
        "/health",
        Arc::new(health::HealthController::new(Arc::clone(&health_source))),
        vec![],
    );
    router.add(
        "GET",
        "/health.html",
        Arc::new(health::HealthHtmlController::new(health_source)),
        vec![],
    );
    router.add(
        "GET",
        "/metrics",
        Arc::new(metrics::MetricsController::new(metrics_handle)),
        vec![],
    );

    router.add(
        "GET",
        "/users/email/{email}",
        Arc::new(users::UsersShowByEmail::new(
            Arc::clone(&user_repo),
            Arc::clone(&cache_service),
            debug,
        )),
        vec![],
    );
    router.add(
        "GET",
        "/users/{id}",
        Arc::new(users::UsersShow::new(Arc::clone(&user_repo), Arc::clone(&cache_service), debug)),
        vec![],
    );
    router.add(
        "GET",
        "/users",
        Arc::new(users::UsersIndex::new(Arc::clone(&user_repo), Arc::clone(&cache_service), debug)),
        vec![],
    );
    router.add(
        "POST",
        "/users",
        Arc::new(users::UsersCreate::new(Arc::clone(&user_repo), Arc::clone(&cache_service), debug)),
        vec![],
    );
    router.add(
        "PUT",
        "/users/{id}",
        Arc::new(users::UsersUpdate::new(Arc::clone(&user_repo), Arc::clone(&cache_service), debug)),
        vec![],
    );
    router.add(
        "DELETE",
        "/users/{id}",
        Arc::new(users::UsersDelete::new(user_repo, Arc::clone(&cache_service), debug)),
        vec![],
    );

    router.add(
        "GET",
        "/items/sku/{sku}",
        Arc::new(items::ItemsShowBySku::new(
            Arc::clone(&item_repo),
            Arc::clone(&cache_service),
            debug,
        )),
        vec![],
    );
    router.add(
        "GET",
        "/items/{id}",
        Arc::new(items::ItemsShow::new(Arc::clone(&item_repo), Arc::clone(&cache_service), debug)),
        vec![],
    );
    router.add(
        "GET",
        "/items",
        Arc::new(items::ItemsIndex::new(Arc::clone(&item_repo), Arc::clone(&cache_service), debug)),
        vec![],
    );
    router.add(
        "POST",
        "/items",
        Arc::new(items::ItemsCreate::new(Arc::clone(&item_repo), Arc::clone(&cache_service), debug)),
        vec![],
    );
    router.add(
        "PUT",
        "/items/{id}",
        Arc::new(items::ItemsUpdate::new(Arc::clone(&item_repo), Arc::clone(&cache_service), debug)),
        vec![],
    );
    router.add(
        "DELETE",
        "/items/{id}",
        Arc::new(items::ItemsDelete::new(item_repo, cache_service, debug)),
        vec![],
    );

    for method in ["POST", "PUT", "DELETE"] {
        router.add(
            method,
            "/async-users*",
            Arc::new(async_users::AsyncUsersController::new(Arc::clone(&channel), debug)),
            vec![],
        );
    }

    router
}
