//! Access record CRUD restricted to the owning user.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use defdrive_core::config::LinkConfig;
use defdrive_core::error::{AppError, ErrorKind};
use defdrive_core::result::AppResult;
use defdrive_database::store::{AccessStore, CasOutcome, FileStore};
use defdrive_entity::access::{AccessRecord, CreateAccess, parse_expiry};
use defdrive_entity::file::File;

use crate::context::RequestContext;
use crate::link::guard::StoreGuard;
use crate::link::token::generate_link_token;

/// Maximum length of an access record label.
const MAX_NAME_LEN: usize = 255;

/// Owner-controlled restriction settings, used for both create and update.
///
/// Updates replace every field, except that `used` is never touched, TTL
/// enforcement cannot be switched off once on (and `ttl` can only go down),
/// and a consumed one-time link stays one-time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessSettings {
    /// Free-text label.
    pub name: String,
    /// Allow anonymous callers (the file must be public too).
    pub public: bool,
    /// CIDR allow-list.
    pub subnets: Vec<String>,
    /// Literal IP allow-list.
    pub ips: Vec<String>,
    /// RFC 3339 expiry; empty or absent never expires.
    pub expires: Option<String>,
    /// Single-use link.
    pub one_time_use: bool,
    /// Enforce the hop budget.
    #[serde(rename = "enableTTL")]
    pub enable_ttl: bool,
    /// Hop budget.
    pub ttl: i32,
}

impl AccessSettings {
    fn validate(&self) -> AppResult<()> {
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::validation(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }
        if self.ttl < 0 {
            return Err(AppError::validation("ttl must not be negative"));
        }
        parse_expiry(self.expires.as_deref())
            .map_err(|e| AppError::validation(format!("expires must be RFC 3339: {e}")))?;
        Ok(())
    }

    fn normalized_expires(&self) -> Option<String> {
        self.expires
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// A freshly created access record and its shareable URL.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedAccess {
    /// The stored record.
    pub access: AccessRecord,
    /// Absolute URL to hand out.
    pub url: String,
}

/// Manages access records on behalf of file owners.
#[derive(Debug, Clone)]
pub struct AccessService {
    accesses: Arc<dyn AccessStore>,
    files: Arc<dyn FileStore>,
    guard: StoreGuard,
    public_base_url: String,
}

impl AccessService {
    /// Creates a new access service.
    pub fn new(
        accesses: Arc<dyn AccessStore>,
        files: Arc<dyn FileStore>,
        config: LinkConfig,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            accesses,
            files,
            guard: StoreGuard::new(config),
            public_base_url: public_base_url.into(),
        }
    }

    /// Shareable URL for a link token.
    pub fn link_url(&self, link: &str) -> String {
        format!("{}/link/{link}", self.public_base_url.trim_end_matches('/'))
    }

    /// Creates an access record with a fresh unique link.
    pub async fn create_access(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        settings: AccessSettings,
    ) -> AppResult<CreatedAccess> {
        self.owned_file(ctx, file_id).await?;
        settings.validate()?;

        let expires = settings.normalized_expires();
        let attempts = self.guard.config().token_attempts.max(1);
        for attempt in 1..=attempts {
            let link = generate_link_token();
            if self
                .guard
                .run("link_exists", || self.accesses.link_exists(&link))
                .await?
            {
                warn!(attempt, "Generated link token already taken");
                continue;
            }

            let data = CreateAccess {
                file_id,
                name: settings.name.clone(),
                link,
                public: settings.public,
                subnets: settings.subnets.clone(),
                ips: settings.ips.clone(),
                expires: expires.clone(),
                one_time_use: settings.one_time_use,
                enable_ttl: settings.enable_ttl,
                ttl: settings.ttl,
            };

            match self.accesses.create_access(&data).await {
                Ok(access) => {
                    info!(
                        user_id = %ctx.user_id,
                        file_id = %file_id,
                        access_id = %access.id,
                        "Access link created"
                    );
                    let url = self.link_url(&access.link);
                    return Ok(CreatedAccess { access, url });
                }
                Err(e) if e.kind == ErrorKind::Conflict => {
                    warn!(attempt, "Link token collided on insert");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::internal(format!(
            "Could not generate a unique link after {attempts} attempts"
        )))
    }

    /// Lists access records for an owned file.
    pub async fn list_accesses(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
    ) -> AppResult<Vec<AccessRecord>> {
        self.owned_file(ctx, file_id).await?;
        self.guard
            .run("find_accesses_by_file", || {
                self.accesses.find_accesses_by_file(file_id)
            })
            .await
    }

    /// Gets one access record the caller owns.
    pub async fn get_access(&self, ctx: &RequestContext, access_id: Uuid) -> AppResult<AccessRecord> {
        let access = self.find_access(access_id).await?;
        self.owned_file(ctx, access.file_id).await?;
        Ok(access)
    }

    /// Replaces the restriction settings of an access record.
    ///
    /// Saved with compare-and-save so a concurrent admission is never
    /// overwritten. Spent state is sticky: see [`AccessSettings`].
    pub async fn update_access(
        &self,
        ctx: &RequestContext,
        access_id: Uuid,
        settings: AccessSettings,
    ) -> AppResult<AccessRecord> {
        settings.validate()?;
        let expires = settings.normalized_expires();
        let retries = self.guard.config().conflict_retries;

        for attempt in 0..=retries {
            let current = self.get_access(ctx, access_id).await?;

            let (enable_ttl, ttl) = match (current.enable_ttl, settings.enable_ttl) {
                (true, true) => (true, settings.ttl.min(current.ttl)),
                (true, false) => (true, current.ttl),
                (false, true) => (true, settings.ttl),
                (false, false) => (false, current.ttl),
            };
            let one_time_use = settings.one_time_use || (current.one_time_use && current.used);
            if enable_ttl != settings.enable_ttl || one_time_use != settings.one_time_use {
                warn!(
                    access_id = %access_id,
                    enable_ttl,
                    one_time_use,
                    "Kept spent-link restrictions the update tried to lift"
                );
            }
            let next = AccessRecord {
                name: settings.name.clone(),
                public: settings.public,
                subnets: settings.subnets.clone(),
                ips: settings.ips.clone(),
                expires: expires.clone(),
                one_time_use,
                enable_ttl,
                ttl,
                ..current.clone()
            };

            match self
                .guard
                .run("compare_and_save", || {
                    self.accesses.compare_and_save(&next, current.version)
                })
                .await?
            {
                CasOutcome::Saved(saved) => {
                    info!(
                        user_id = %ctx.user_id,
                        access_id = %access_id,
                        version = saved.version,
                        "Access link updated"
                    );
                    return Ok(saved);
                }
                CasOutcome::Conflict => {
                    warn!(access_id = %access_id, attempt, "Access update raced, retrying");
                }
            }
        }

        Err(AppError::conflict(
            "Access record is being modified concurrently, please retry",
        ))
    }

    /// Deletes an access record.
    pub async fn delete_access(&self, ctx: &RequestContext, access_id: Uuid) -> AppResult<()> {
        let access = self.get_access(ctx, access_id).await?;
        if !self
            .guard
            .run("delete_access", || self.accesses.delete_access(access.id))
            .await?
        {
            return Err(AppError::not_found("Access record not found"));
        }

        info!(user_id = %ctx.user_id, access_id = %access_id, "Access link deleted");
        Ok(())
    }

    async fn find_access(&self, access_id: Uuid) -> AppResult<AccessRecord> {
        self.guard
            .run("find_access_by_id", || self.accesses.find_access_by_id(access_id))
            .await?
            .ok_or_else(|| AppError::not_found("Access record not found"))
    }

    async fn owned_file(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<File> {
        let file = self
            .guard
            .run("find_file_by_id", || self.files.find_file_by_id(file_id))
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))?;

        if file.owner_id != ctx.user_id {
            return Err(AppError::forbidden(
                "You don't have permission to manage access for this file",
            ));
        }
        Ok(file)
    }
}
