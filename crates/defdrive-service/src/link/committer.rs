//! Persists the side effects of an admitted link request.

use std::sync::Arc;

use tracing::debug;

use defdrive_core::result::AppResult;
use defdrive_database::store::{AccessStore, CasOutcome};
use defdrive_entity::access::AccessRecord;

use super::evaluator::Mutations;
use super::guard::StoreGuard;

/// Result of a commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The mutations are durable; holds the saved record.
    Committed(AccessRecord),
    /// The record changed since it was evaluated. Re-fetch and re-evaluate.
    Conflict,
}

/// Applies [`Mutations`] to the exact record version that was evaluated.
#[derive(Debug, Clone)]
pub struct MutationCommitter {
    accesses: Arc<dyn AccessStore>,
    guard: StoreGuard,
}

impl MutationCommitter {
    /// Creates a new committer.
    pub fn new(accesses: Arc<dyn AccessStore>, guard: StoreGuard) -> Self {
        Self { accesses, guard }
    }

    /// Persist `mutations` on top of `evaluated`, conditioned on its version.
    pub async fn commit(
        &self,
        evaluated: &AccessRecord,
        mutations: Mutations,
    ) -> AppResult<CommitOutcome> {
        if mutations.is_empty() {
            return Ok(CommitOutcome::Committed(evaluated.clone()));
        }

        let mut next = evaluated.clone();
        mutations.apply(&mut next);

        // A retried write whose earlier attempt landed comes back as a
        // conflict; the caller's re-evaluation then sees the spent state.
        let outcome = self
            .guard
            .run("compare_and_save", || {
                self.accesses.compare_and_save(&next, evaluated.version)
            })
            .await?;

        Ok(match outcome {
            CasOutcome::Saved(saved) => {
                debug!(
                    access_id = %saved.id,
                    version = saved.version,
                    used = saved.used,
                    ttl = saved.ttl,
                    "Committed link mutations"
                );
                CommitOutcome::Committed(saved)
            }
            CasOutcome::Conflict => CommitOutcome::Conflict,
        })
    }
}

#[cfg(test)]
mod tests {
    use defdrive_core::config::LinkConfig;

    use super::*;
    use crate::testing::Fixture;

    #[tokio::test]
    async fn test_commit_decrements_and_bumps_version() {
        let fixture = Fixture::new().await;
        let record = fixture
            .access(|a| {
                a.enable_ttl = true;
                a.ttl = 2;
            })
            .await;
        let committer = MutationCommitter::new(
            fixture.store.clone(),
            StoreGuard::new(LinkConfig::default()),
        );

        let outcome = committer
            .commit(
                &record,
                Mutations {
                    mark_used: false,
                    decrement_ttl: true,
                },
            )
            .await
            .expect("commit");
        let CommitOutcome::Committed(saved) = outcome else {
            panic!("expected commit");
        };
        assert_eq!(saved.ttl, 1);
        assert_eq!(saved.version, record.version + 1);
    }

    #[tokio::test]
    async fn test_stale_record_conflicts() {
        let fixture = Fixture::new().await;
        let record = fixture.access(|a| a.one_time_use = true).await;
        let committer = MutationCommitter::new(
            fixture.store.clone(),
            StoreGuard::new(LinkConfig::default()),
        );
        let mark_used = Mutations {
            mark_used: true,
            decrement_ttl: false,
        };

        assert!(matches!(
            committer.commit(&record, mark_used).await.expect("first"),
            CommitOutcome::Committed(_)
        ));
        assert_eq!(
            committer.commit(&record, mark_used).await.expect("second"),
            CommitOutcome::Conflict
        );
    }

    #[tokio::test]
    async fn test_empty_mutations_skip_the_store() {
        let fixture = Fixture::new().await;
        let record = fixture.access(|_| {}).await;
        fixture.store.delete_access(record.id).await.expect("delete");

        let committer = MutationCommitter::new(
            fixture.store.clone(),
            StoreGuard::new(LinkConfig::default()),
        );
        let outcome = committer
            .commit(&record, Mutations::default())
            .await
            .expect("commit");
        assert_eq!(outcome, CommitOutcome::Committed(record));
    }
}
