//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use defdrive_auth::jwt::{JwtDecoder, JwtEncoder};
use defdrive_auth::password::{PasswordHasher, PasswordValidator};
use defdrive_core::config::AppConfig;
use defdrive_core::traits::storage::StorageProvider;
use defdrive_database::store::Stores;
use defdrive_service::{AccessService, FileService, LinkService, UserService};

use crate::extractors::client_ip::TrustedProxies;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// When the process started serving
    pub started_at: Instant,

    // ── Infrastructure ───────────────────────────────────────
    /// Metadata stores for the configured backend
    pub stores: Stores,
    /// Blob storage
    pub storage: Arc<dyn StorageProvider>,

    // ── Auth ─────────────────────────────────────────────────
    /// JWT token decoder and validator
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Peers allowed to report the client address via headers
    pub trusted_proxies: Arc<TrustedProxies>,

    // ── Services ─────────────────────────────────────────────
    /// Signup and login
    pub user_service: Arc<UserService>,
    /// Upload and file management
    pub file_service: Arc<FileService>,
    /// Access record management
    pub access_service: Arc<AccessService>,
    /// Public link resolution
    pub link_service: Arc<LinkService>,
}

impl AppState {
    /// Wire every service over the given stores and blob storage.
    pub fn new(config: AppConfig, stores: Stores, storage: Arc<dyn StorageProvider>) -> Self {
        let jwt_encoder = Arc::new(JwtEncoder::new(&config.auth));
        let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth));

        let user_service = Arc::new(UserService::new(
            Arc::clone(&stores.users),
            Arc::new(PasswordHasher::new()),
            Arc::new(PasswordValidator::new(&config.auth)),
            jwt_encoder,
        ));
        let file_service = Arc::new(FileService::new(
            Arc::clone(&stores.users),
            Arc::clone(&stores.files),
            Arc::clone(&storage),
            &config.storage,
        ));
        let access_service = Arc::new(AccessService::new(
            Arc::clone(&stores.accesses),
            Arc::clone(&stores.files),
            config.link.clone(),
            config.server.public_base_url.clone(),
        ));
        let link_service = Arc::new(LinkService::new(
            Arc::clone(&stores.accesses),
            Arc::clone(&stores.files),
            Arc::clone(&storage),
            config.link.clone(),
        ));
        let trusted_proxies = Arc::new(TrustedProxies::from_config(
            &config.server.trusted_proxies,
        ));

        Self {
            config: Arc::new(config),
            started_at: Instant::now(),
            stores,
            storage,
            jwt_decoder,
            trusted_proxies,
            user_service,
            file_service,
            access_service,
            link_service,
        }
    }
}
