//! Link resolution: lookup, evaluate, commit, serve.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use defdrive_core::config::LinkConfig;
use defdrive_core::error::{AppError, ErrorKind};
use defdrive_core::result::AppResult;
use defdrive_core::traits::storage::{ByteStream, StorageProvider};
use defdrive_database::store::{AccessStore, FileStore};
use defdrive_entity::access::AccessRecord;
use defdrive_entity::file::File;

use super::committer::{CommitOutcome, MutationCommitter};
use super::evaluator::{Caller, Decision, DenyReason, LinkRequest, evaluate};
use super::guard::StoreGuard;

/// An admitted file, ready to stream.
pub struct ServedFile {
    /// File metadata for response headers.
    pub file: File,
    /// File content.
    pub stream: ByteStream,
}

impl std::fmt::Debug for ServedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServedFile")
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

/// Terminal state of one link request.
#[derive(Debug)]
pub enum LinkOutcome {
    /// Admitted and committed.
    Serve(ServedFile),
    /// Refused.
    Deny(DenyReason),
}

/// Resolves public access links.
#[derive(Debug, Clone)]
pub struct LinkService {
    accesses: Arc<dyn AccessStore>,
    files: Arc<dyn FileStore>,
    storage: Arc<dyn StorageProvider>,
    committer: MutationCommitter,
    guard: StoreGuard,
}

impl LinkService {
    /// Creates a new link service.
    pub fn new(
        accesses: Arc<dyn AccessStore>,
        files: Arc<dyn FileStore>,
        storage: Arc<dyn StorageProvider>,
        config: LinkConfig,
    ) -> Self {
        let guard = StoreGuard::new(config);
        Self {
            committer: MutationCommitter::new(accesses.clone(), guard.clone()),
            accesses,
            files,
            storage,
            guard,
        }
    }

    /// Handle one request against a public link.
    ///
    /// The payload is only returned once the admission mutations are
    /// durable. `Err` means the store or storage failed and maps to 5xx.
    pub async fn handle_link_request(
        &self,
        link: &str,
        client_ip: &str,
        caller: Caller,
    ) -> AppResult<LinkOutcome> {
        let mut conflicts = 0u32;
        loop {
            let (record, file) = match self.lookup(link).await? {
                Ok(found) => found,
                Err(reason) => return Ok(self.deny(link, client_ip, reason)),
            };

            let request = LinkRequest {
                client_ip: client_ip.to_string(),
                caller,
                now: Utc::now(),
            };
            let mutations = match evaluate(&record, &file, &request) {
                Decision::Admit(mutations) => mutations,
                Decision::Deny(reason) => return Ok(self.deny(link, client_ip, reason)),
            };

            // Opened before committing so a missing blob never consumes the link.
            let stream = self.open_payload(&file).await?;

            match self.committer.commit(&record, mutations).await? {
                CommitOutcome::Committed(saved) => {
                    info!(
                        link,
                        client_ip,
                        access_id = %saved.id,
                        file_id = %file.id,
                        attempt = conflicts + 1,
                        used = saved.used,
                        ttl = saved.ttl,
                        "Link request admitted"
                    );
                    return Ok(LinkOutcome::Serve(ServedFile { file, stream }));
                }
                CommitOutcome::Conflict if conflicts < self.guard.config().conflict_retries => {
                    conflicts += 1;
                    warn!(link, client_ip, attempt = conflicts, "Commit conflict, re-evaluating");
                }
                CommitOutcome::Conflict => {
                    return Ok(self.deny(link, client_ip, DenyReason::Conflict));
                }
            }
        }
    }

    /// Evaluate a link against the current state without committing anything.
    pub async fn inspect(&self, link: &str, client_ip: &str, caller: Caller) -> AppResult<Decision> {
        let (record, file) = match self.lookup(link).await? {
            Ok(found) => found,
            Err(reason) => return Ok(Decision::Deny(reason)),
        };
        let request = LinkRequest {
            client_ip: client_ip.to_string(),
            caller,
            now: Utc::now(),
        };
        Ok(evaluate(&record, &file, &request))
    }

    async fn lookup(&self, link: &str) -> AppResult<Result<(AccessRecord, File), DenyReason>> {
        let Some(record) = self
            .guard
            .run("find_access_by_link", || self.accesses.find_access_by_link(link))
            .await?
        else {
            return Ok(Err(DenyReason::NotFound));
        };

        let file_id = record.file_id;
        let Some(file) = self
            .guard
            .run("find_file_by_id", || self.files.find_file_by_id(file_id))
            .await?
        else {
            return Ok(Err(DenyReason::NotFound));
        };

        Ok(Ok((record, file)))
    }

    async fn open_payload(&self, file: &File) -> AppResult<ByteStream> {
        self.storage
            .read(&file.storage_path)
            .await
            .map_err(|e| match e.kind {
                ErrorKind::NotFound => {
                    error!(file_id = %file.id, path = %file.storage_path, "Stored blob is missing");
                    AppError::storage(format!("Blob missing for file {}", file.id))
                }
                _ => e,
            })
    }

    fn deny(&self, link: &str, client_ip: &str, reason: DenyReason) -> LinkOutcome {
        info!(link, client_ip, reason = reason.code(), "Link request denied");
        LinkOutcome::Deny(reason)
    }
}
