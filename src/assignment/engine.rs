//! Draw engine: bulk derangement and individual-draw pools.
//!
//! All computation here is synchronous and atomic; any presentation delay or
//! cancellation window belongs to the caller. Functions are generic over the
//! random source so tests can drive them with a seeded generator.

use std::collections::HashMap;

use rand::Rng;

use crate::errors::AppError;

/// Retry ceiling for the derangement search. For rosters of two or more
/// members a valid derangement is found almost immediately; the ceiling only
/// guards against the astronomically unlikely run of bad shuffles.
pub const DERANGEMENT_RETRY_LIMIT: usize = 100;

/// Draw a complete giver → receiver bijection with no fixed points over the
/// given member ids, replacing any previous assignment state.
///
/// Fails with `InsufficientMembers` below two members and with
/// `AssignmentInfeasible` if no derangement is found within
/// [`DERANGEMENT_RETRY_LIMIT`] attempts. For exactly two members the result
/// is the unique mutual swap.
pub fn bulk_draw<R: Rng>(member_ids: &[i64], rng: &mut R) -> Result<HashMap<i64, i64>, AppError> {
    if member_ids.len() < 2 {
        return Err(AppError::InsufficientMembers(
            "At least two members are required for a draw".to_string(),
        ));
    }

    for _attempt in 0..DERANGEMENT_RETRY_LIMIT {
        let mut receivers = member_ids.to_vec();
        shuffle(&mut receivers, rng);
        if let Some(map) = pair_without_fixed_points(member_ids, receivers) {
            return Ok(map);
        }
    }

    Err(AppError::AssignmentInfeasible(format!(
        "No valid assignment found in {} attempts",
        DERANGEMENT_RETRY_LIMIT
    )))
}

/// Fisher–Yates: walk from the last index down to 1, swapping each element
/// with a uniformly chosen element at or before it.
fn shuffle<R: Rng>(items: &mut [i64], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Pair givers with the shuffled receivers, repairing fixed points by a
/// bounded circular forward scan. Returns `None` when a fixed point cannot
/// be repaired within one full pass, in which case the caller re-shuffles.
fn pair_without_fixed_points(givers: &[i64], mut receivers: Vec<i64>) -> Option<HashMap<i64, i64>> {
    let n = givers.len();
    for i in 0..n {
        if receivers[i] != givers[i] {
            continue;
        }
        // Nearest slot whose receiver differs from this giver; swapping with
        // it cannot create a new fixed point there because member ids are
        // distinct.
        let swap_with = (1..n).map(|step| (i + step) % n).find(|&k| {
            receivers[k] != givers[i] && receivers[i] != givers[k]
        })?;
        receivers.swap(i, swap_with);
    }
    Some(givers.iter().copied().zip(receivers).collect())
}

/// Candidate pool for an individual draw: every member except the drawer and
/// except anyone already assigned as a receiver.
pub fn candidate_pool(
    member_ids: &[i64],
    drawer_id: i64,
    taken_receivers: &[i64],
) -> Result<Vec<i64>, AppError> {
    let pool: Vec<i64> = member_ids
        .iter()
        .copied()
        .filter(|&id| id != drawer_id && !taken_receivers.contains(&id))
        .collect();

    if pool.is_empty() {
        return Err(AppError::NoAvailableCandidates(
            "Every eligible member has already been drawn".to_string(),
        ));
    }
    Ok(pool)
}

/// Pick uniformly at random from a non-empty pool. The caller's selected
/// slot index never reaches this function; selection is uniform at the
/// moment of the draw.
pub fn pick_from_pool<R: Rng>(pool: &[i64], rng: &mut R) -> i64 {
    pool[rng.gen_range(0..pool.len())]
}
