//! In-memory roster store.
//!
//! The roster is the runtime source of truth for members; it is rebuilt from
//! the persisted snapshot at startup and flushed back after every mutation.
//! Two invariants hold at all times: member codes are unique under
//! case-insensitive comparison, and the next-id counter strictly exceeds
//! every id on the roster.

use std::collections::BTreeMap;

use crate::errors::AppError;
use crate::models::{Member, RawMemberRecord};

/// Deduplicated set of members keyed by id, plus the next-id counter.
#[derive(Debug, Clone)]
pub struct RosterStore {
    members: BTreeMap<i64, Member>,
    next_id: i64,
}

impl Default for RosterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterStore {
    pub fn new() -> Self {
        Self {
            members: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Rebuild a roster from possibly corrupt persisted records.
    ///
    /// Records missing id, code, or display name are discarded. When two
    /// surviving records share a code case-insensitively, the earlier one
    /// wins. Surviving members are ordered by ascending id and the counter
    /// is set past the maximum id, never regressing below the persisted
    /// counter. Reloading the output of this function is a no-op.
    pub fn from_snapshot(records: Vec<RawMemberRecord>, persisted_counter: Option<i64>) -> Self {
        let mut members: BTreeMap<i64, Member> = BTreeMap::new();
        let mut seen_codes: Vec<String> = Vec::new();
        let mut max_id = 0;

        for record in records {
            let (Some(id), Some(code), Some(display_name)) =
                (record.id, record.code, record.display_name)
            else {
                tracing::warn!("Discarding snapshot record with missing fields");
                continue;
            };
            if id <= 0 || code.trim().is_empty() || display_name.trim().is_empty() {
                tracing::warn!(id, "Discarding invalid snapshot record");
                continue;
            }
            let folded = code.to_lowercase();
            if seen_codes.contains(&folded) {
                tracing::warn!(id, %code, "Discarding snapshot record with duplicate code");
                continue;
            }
            if members.contains_key(&id) {
                tracing::warn!(id, "Discarding snapshot record with duplicate id");
                continue;
            }
            seen_codes.push(folded);
            max_id = max_id.max(id);
            members.insert(
                id,
                Member {
                    id,
                    code,
                    display_name,
                    interests: record.interests,
                },
            );
        }

        let next_id = persisted_counter.unwrap_or(1).max(max_id + 1).max(1);
        Self { members, next_id }
    }

    /// All members in ascending id order.
    pub fn list(&self) -> Vec<Member> {
        self.members.values().cloned().collect()
    }

    pub fn get(&self, id: i64) -> Option<&Member> {
        self.members.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.members.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Ids of all members in ascending order.
    pub fn ids(&self) -> Vec<i64> {
        self.members.keys().copied().collect()
    }

    /// The id the next created member will receive.
    pub fn next_id(&self) -> i64 {
        self.next_id
    }

    /// Whether `code` collides case-insensitively with any member other than
    /// `excluding` (pass `None` for a create, `Some(id)` for a rename).
    pub fn code_in_use(&self, code: &str, excluding: Option<i64>) -> bool {
        let folded = code.to_lowercase();
        self.members
            .values()
            .any(|m| Some(m.id) != excluding && m.code.to_lowercase() == folded)
    }

    /// Create a member, allocating the next id.
    pub fn create(
        &mut self,
        code: String,
        display_name: String,
        interests: Option<String>,
    ) -> Result<Member, AppError> {
        if self.code_in_use(&code, None) {
            return Err(AppError::DuplicateIdentifier(format!(
                "A member with code '{}' already exists",
                code
            )));
        }
        let member = Member {
            id: self.next_id,
            code,
            display_name,
            interests,
        };
        self.next_id += 1;
        self.members.insert(member.id, member.clone());
        Ok(member)
    }

    /// Replace the mutable fields of a member, preserving its id.
    pub fn update(
        &mut self,
        id: i64,
        code: String,
        display_name: String,
        interests: Option<String>,
    ) -> Result<Member, AppError> {
        if !self.members.contains_key(&id) {
            return Err(AppError::NotFound(format!("Member {} not found", id)));
        }
        if self.code_in_use(&code, Some(id)) {
            return Err(AppError::DuplicateIdentifier(format!(
                "A different member with code '{}' already exists",
                code
            )));
        }
        let member = Member {
            id,
            code,
            display_name,
            interests,
        };
        self.members.insert(id, member.clone());
        Ok(member)
    }

    /// Remove a member. The caller is responsible for cascading the removal
    /// into the assignment store.
    pub fn delete(&mut self, id: i64) -> Result<Member, AppError> {
        self.members
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))
    }

    /// Bulk-insert confirmed import candidates, advancing the counter.
    ///
    /// All-or-nothing: if any candidate collides with the roster or with an
    /// earlier candidate in the batch, nothing is inserted. Candidate ids are
    /// re-allocated from the live counter; the provisional preview ids are
    /// ignored.
    pub fn insert_batch(
        &mut self,
        candidates: Vec<crate::models::MemberCandidate>,
    ) -> Result<Vec<Member>, AppError> {
        let mut batch_codes: Vec<String> = Vec::new();
        for candidate in &candidates {
            let folded = candidate.code.to_lowercase();
            if self.code_in_use(&candidate.code, None) || batch_codes.contains(&folded) {
                return Err(AppError::DuplicateIdentifier(format!(
                    "A member with code '{}' already exists",
                    candidate.code
                )));
            }
            batch_codes.push(folded);
        }

        let mut inserted = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let member = Member {
                id: self.next_id,
                code: candidate.code,
                display_name: candidate.display_name,
                interests: candidate.interests,
            };
            self.next_id += 1;
            self.members.insert(member.id, member.clone());
            inserted.push(member);
        }
        Ok(inserted)
    }
}
