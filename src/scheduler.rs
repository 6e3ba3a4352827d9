//! Piece-range scheduling
//!
//! Pure policy for turning a byte quota into piece requests. The quota is
//! converted to a whole-piece budget, and the budget is placed as one
//! contiguous window inside the transfer's piece space. Each transfer owns a
//! slot; windows for different slots land in different regions of the piece
//! index space, so co-hosted transfers spread load across their swarms
//! instead of all hammering the first pieces.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A half-open interval of piece indices, `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PieceRange {
    /// First piece index in the range
    pub start: u32,
    /// One past the last piece index
    pub end: u32,
}

impl PieceRange {
    /// Create a range; `end` is clamped up to `start`
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Number of pieces in the range
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Check if the range covers no pieces
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Check if a piece index falls inside the range
    pub fn contains(&self, piece: u32) -> bool {
        piece >= self.start && piece < self.end
    }
}

impl std::fmt::Display for PieceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Convert a byte quota into a whole-piece budget
///
/// The budget is `requested * total_pieces / total_length` rounded up, so a
/// quota that covers any fraction of a piece buys the whole piece. It never
/// exceeds `total_pieces`. Zero pieces or an unknown payload length yield a
/// zero budget.
pub fn piece_budget(requested: u64, total_pieces: u32, total_length: u64) -> u32 {
    if total_pieces == 0 || total_length == 0 {
        return 0;
    }
    let budget = (requested as u128 * total_pieces as u128).div_ceil(total_length as u128);
    budget.min(total_pieces as u128) as u32
}

/// Place a piece budget as a contiguous window inside the piece space
///
/// The window is anchored at `total_pieces * slot / bucket_count`, shifted
/// back by half the budget so it straddles the anchor, and clamped so it
/// never runs past the end of the piece space. A budget of zero produces an
/// empty range at the anchor; a bucket count of zero is treated as one.
pub fn piece_window(total_pieces: u32, slot: u32, bucket_count: u32, budget: u32) -> PieceRange {
    let total = total_pieces as u64;
    let budget = (budget as u64).min(total);
    let anchor = total * slot as u64 / bucket_count.max(1) as u64;
    let mut start = anchor.saturating_sub(budget / 2);
    if start + budget > total {
        start = total - budget;
    }
    PieceRange {
        start: start as u32,
        end: (start + budget) as u32,
    }
}

/// Derive a slot for an identity, spreading identities evenly over
/// `[0, bucket_count)`
///
/// The mapping is stable for the life of the process; callers that need a
/// slot stable across restarts should derive one from the identity
/// themselves and pass it in. A bucket count of zero is treated as one.
pub fn slot_for(identity: &str, bucket_count: u32) -> u32 {
    let mut hasher = DefaultHasher::new();
    identity.hash(&mut hasher);
    (hasher.finish() % bucket_count.max(1) as u64) as u32
}
