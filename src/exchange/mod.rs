//! Exchange service: the single owner of the roster and assignment state.
//!
//! All mutations run under one async mutex, so every operation is
//! indivisible with respect to every other: no caller ever observes a
//! partially applied draw or a half-cascaded deletion. Each committed
//! mutation flushes the affected blob(s) and bumps the revision id before
//! the lock is released.

use rand::thread_rng;
use tokio::sync::Mutex;

use crate::assignment::{self, AssignmentStore};
use crate::db::BlobStore;
use crate::errors::AppError;
use crate::import;
use crate::models::{
    AssignmentPair, DrawPool, ImportPreview, Member, MemberCandidate,
};
use crate::roster::RosterStore;

/// An individual draw that has presented its pool and is waiting for the
/// caller's selection. Tearing it down commits nothing.
#[derive(Debug, Clone)]
pub struct PendingDraw {
    pub drawer_id: i64,
    pub pool: Vec<i64>,
}

/// Mutable state guarded by the service mutex.
struct Exchange {
    roster: RosterStore,
    assignments: AssignmentStore,
    pending: Option<PendingDraw>,
}

/// Service facade over the exchange state and its persistence.
pub struct ExchangeService {
    blobs: BlobStore,
    inner: Mutex<Exchange>,
}

impl ExchangeService {
    /// Reconstruct the exchange from persisted state.
    pub async fn load(blobs: BlobStore) -> Result<Self, AppError> {
        let persisted = blobs.load().await?;
        let roster = RosterStore::from_snapshot(persisted.roster, persisted.next_id);
        let assignments = AssignmentStore::from_persisted(persisted.assignments, &roster.ids());

        tracing::info!(
            members = roster.len(),
            assignments = assignments.len(),
            revision = persisted.revision_id,
            "Exchange state loaded"
        );

        Ok(Self {
            blobs,
            inner: Mutex::new(Exchange {
                roster,
                assignments,
                pending: None,
            }),
        })
    }

    /// Current revision id.
    pub async fn revision_id(&self) -> Result<i64, AppError> {
        self.blobs.get_revision_id().await
    }

    /// Write every blob back. Called once on shutdown; per-mutation flushes
    /// make this a formality, but it guarantees a consistent final state.
    pub async fn flush(&self) -> Result<(), AppError> {
        let state = self.inner.lock().await;
        self.blobs.save_roster(&state.roster.list()).await?;
        self.blobs.save_next_id(state.roster.next_id()).await?;
        self.blobs.save_assignments(state.assignments.as_map()).await?;
        Ok(())
    }

    // ==================== ROSTER OPERATIONS ====================

    pub async fn list_members(&self) -> Vec<Member> {
        self.inner.lock().await.roster.list()
    }

    pub async fn get_member(&self, id: i64) -> Option<Member> {
        self.inner.lock().await.roster.get(id).cloned()
    }

    pub async fn create_member(
        &self,
        code: String,
        display_name: String,
        interests: Option<String>,
    ) -> Result<Member, AppError> {
        let mut state = self.inner.lock().await;
        let member = state.roster.create(code, display_name, interests)?;
        self.blobs.save_roster(&state.roster.list()).await?;
        self.blobs.save_next_id(state.roster.next_id()).await?;
        self.blobs.increment_revision().await?;
        Ok(member)
    }

    pub async fn update_member(
        &self,
        id: i64,
        code: String,
        display_name: String,
        interests: Option<String>,
    ) -> Result<Member, AppError> {
        let mut state = self.inner.lock().await;
        let member = state.roster.update(id, code, display_name, interests)?;
        self.blobs.save_roster(&state.roster.list()).await?;
        self.blobs.increment_revision().await?;
        Ok(member)
    }

    /// Delete a member and cascade the removal into the assignment map,
    /// both where the member gives and where it receives.
    pub async fn delete_member(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.inner.lock().await;
        state.roster.delete(id)?;
        state.assignments.on_member_removed(id);
        self.blobs.save_roster(&state.roster.list()).await?;
        self.blobs.save_assignments(state.assignments.as_map()).await?;
        self.blobs.increment_revision().await?;
        Ok(())
    }

    // ==================== IMPORT OPERATIONS ====================

    /// Reconcile candidate rows against the roster without mutating it.
    pub async fn preview_import(&self, rows: &[Vec<String>]) -> Result<ImportPreview, AppError> {
        let state = self.inner.lock().await;
        import::reconcile(&state.roster, rows)
    }

    /// Commit previously previewed candidates. The only path that mutates
    /// the roster from an import; all-or-nothing.
    pub async fn confirm_import(
        &self,
        candidates: Vec<MemberCandidate>,
    ) -> Result<Vec<Member>, AppError> {
        let mut state = self.inner.lock().await;
        let inserted = state.roster.insert_batch(candidates)?;
        self.blobs.save_roster(&state.roster.list()).await?;
        self.blobs.save_next_id(state.roster.next_id()).await?;
        self.blobs.increment_revision().await?;
        Ok(inserted)
    }

    // ==================== DRAW OPERATIONS ====================

    /// Draw a fresh derangement over the whole roster, replacing the
    /// assignment map wholesale. Any pending individual draw is dropped,
    /// since its pool no longer reflects the map.
    pub async fn bulk_draw(&self) -> Result<Vec<AssignmentPair>, AppError> {
        let mut state = self.inner.lock().await;
        let map = assignment::bulk_draw(&state.roster.ids(), &mut thread_rng())?;
        state.assignments.replace(map);
        state.pending = None;
        self.blobs.save_assignments(state.assignments.as_map()).await?;
        self.blobs.increment_revision().await?;
        tracing::info!(pairs = state.assignments.len(), "Bulk draw committed");
        Ok(state.assignments.pairs())
    }

    /// Start an individual draw: compute the candidate pool for the drawer
    /// and park it until the caller selects. No state is persisted; an
    /// abandoned pool is simply replaced or cancelled.
    pub async fn request_individual_draw(&self, member_id: i64) -> Result<DrawPool, AppError> {
        let mut state = self.inner.lock().await;
        if !state.roster.contains(member_id) {
            return Err(AppError::NotFound(format!("Member {} not found", member_id)));
        }
        let pool = assignment::candidate_pool(
            &state.roster.ids(),
            member_id,
            &state.assignments.receiver_ids(),
        )?;
        let members = pool
            .iter()
            .filter_map(|&id| state.roster.get(id).cloned())
            .collect();
        state.pending = Some(PendingDraw {
            drawer_id: member_id,
            pool,
        });
        Ok(DrawPool {
            drawer_id: member_id,
            pool: members,
        })
    }

    /// Resolve the pending individual draw.
    ///
    /// `pool_index` must map to a presented slot, but the pick is uniform
    /// over the whole pool regardless of which slot was clicked. The drawer
    /// and the chosen member are re-validated against the live roster;
    /// either having vanished since the pool was presented fails the draw
    /// with `StaleDraw` and the caller must restart it.
    pub async fn select_from_pool(&self, pool_index: usize) -> Result<AssignmentPair, AppError> {
        let mut state = self.inner.lock().await;
        let pending = state.pending.take().ok_or_else(|| {
            AppError::BadRequest("No individual draw is in progress".to_string())
        })?;
        if pool_index >= pending.pool.len() {
            // Put the draw back; a bad index should not burn it
            let message = format!(
                "Pool index {} does not map to a presented candidate",
                pool_index
            );
            state.pending = Some(pending);
            return Err(AppError::BadRequest(message));
        }

        let chosen = assignment::pick_from_pool(&pending.pool, &mut thread_rng());

        if !state.roster.contains(pending.drawer_id) || !state.roster.contains(chosen) {
            return Err(AppError::StaleDraw(
                "A member involved in this draw was removed; restart the draw".to_string(),
            ));
        }
        if state.assignments.is_receiver(chosen) {
            return Err(AppError::StaleDraw(
                "The chosen member was assigned elsewhere; restart the draw".to_string(),
            ));
        }

        state.assignments.insert(pending.drawer_id, chosen);
        self.blobs.save_assignments(state.assignments.as_map()).await?;
        self.blobs.increment_revision().await?;
        Ok(AssignmentPair {
            giver_id: pending.drawer_id,
            receiver_id: chosen,
        })
    }

    /// Tear down the pending individual draw without committing anything.
    pub async fn cancel_individual_draw(&self) {
        self.inner.lock().await.pending = None;
    }

    // ==================== ASSIGNMENT QUERIES ====================

    pub async fn assignments(&self) -> Vec<AssignmentPair> {
        self.inner.lock().await.assignments.pairs()
    }

    pub async fn assignment_for(&self, member_id: i64) -> Result<Option<Member>, AppError> {
        let state = self.inner.lock().await;
        if !state.roster.contains(member_id) {
            return Err(AppError::NotFound(format!("Member {} not found", member_id)));
        }
        Ok(state
            .assignments
            .get(member_id)
            .and_then(|id| state.roster.get(id).cloned()))
    }

    /// Empty the assignment map (explicit user action).
    pub async fn clear_assignments(&self) -> Result<(), AppError> {
        let mut state = self.inner.lock().await;
        state.assignments.clear_all();
        state.pending = None;
        self.blobs.save_assignments(state.assignments.as_map()).await?;
        self.blobs.increment_revision().await?;
        Ok(())
    }
}
