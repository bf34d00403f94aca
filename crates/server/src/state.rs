//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::realtime::NotificationHub;
use crate::services::auth::TokenService;
use crate::services::catalog::ProductCache;
use crate::services::mail::{CodeSender, LogCodeSender};
use crate::services::uploads::UploadStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections, the token service and the
/// notification hub.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    tokens: TokenService,
    hub: NotificationHub,
    products: ProductCache,
    uploads: UploadStore,
    mailer: Arc<dyn CodeSender>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ServerConfig, pool: PgPool) -> Self {
        Self::with_mailer(config, pool, Arc::new(LogCodeSender))
    }

    /// Create application state that delivers codes through `mailer`.
    #[must_use]
    pub fn with_mailer(config: ServerConfig, pool: PgPool, mailer: Arc<dyn CodeSender>) -> Self {
        let tokens = TokenService::new(&config.jwt);
        let uploads = UploadStore::new(&config.upload_dir);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                hub: NotificationHub::new(),
                products: ProductCache::new(),
                uploads,
                mailer,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// JWT issue/verify.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// WebSocket notification fan-out.
    #[must_use]
    pub fn hub(&self) -> &NotificationHub {
        &self.inner.hub
    }

    /// Product detail cache.
    #[must_use]
    pub fn products(&self) -> &ProductCache {
        &self.inner.products
    }

    /// Image file store.
    #[must_use]
    pub fn uploads(&self) -> &UploadStore {
        &self.inner.uploads
    }

    /// Verification code delivery.
    #[must_use]
    pub fn mailer(&self) -> &dyn CodeSender {
        self.inner.mailer.as_ref()
    }
}
