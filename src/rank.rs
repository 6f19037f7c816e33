//! Chunk ranking and display pagination.
//!
//! The backend treats the search threshold as a hint, so relevance is
//! enforced here: chunks below the similarity floor are filtered out,
//! unless that would hide every chunk — raw evidence always beats an
//! empty display.

use crate::models::Chunk;

/// Minimum similarity for a chunk to count as relevant.
pub const SIMILARITY_FLOOR: f64 = 0.5;

/// Similarity at or above which a chunk is considered highly relevant.
pub const HIGH_RELEVANCE: f64 = 0.7;

const INITIAL_PAGE_SIZE: usize = 5;
const PAGE_INCREMENT: usize = 5;

/// Filter and order chunks for display.
///
/// Keeps chunks with similarity >= [`SIMILARITY_FLOOR`], sorted descending
/// by similarity. When the filter leaves nothing, all chunks are returned
/// sorted instead, so a zero-result filter never empties a display that
/// has raw evidence.
pub fn rank_chunks(chunks: &[Chunk]) -> Vec<Chunk> {
    let mut ranked: Vec<Chunk> = chunks
        .iter()
        .filter(|c| c.similarity() >= SIMILARITY_FLOOR)
        .cloned()
        .collect();
    if ranked.is_empty() {
        ranked = chunks.to_vec();
    }
    ranked.sort_by(|a, b| {
        b.similarity()
            .partial_cmp(&a.similarity())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

/// Coarse relevance classification used by the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelevanceTier {
    High,
    Medium,
    Low,
}

impl RelevanceTier {
    pub fn of(similarity: f64) -> Self {
        if similarity >= HIGH_RELEVANCE {
            RelevanceTier::High
        } else if similarity >= SIMILARITY_FLOOR {
            RelevanceTier::Medium
        } else {
            RelevanceTier::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RelevanceTier::High => "high",
            RelevanceTier::Medium => "medium",
            RelevanceTier::Low => "low",
        }
    }
}

/// Growable display window over a ranked chunk list.
///
/// Starts at 5 visible chunks, grows in increments of 5, and resets back
/// to 5. One pager per search response — pagination state is never shared
/// across responses.
#[derive(Debug, Clone)]
pub struct ChunkPager {
    page_size: usize,
}

impl ChunkPager {
    pub fn new() -> Self {
        Self {
            page_size: INITIAL_PAGE_SIZE,
        }
    }

    pub fn visible<'a>(&self, ranked: &'a [Chunk]) -> &'a [Chunk] {
        &ranked[..ranked.len().min(self.page_size)]
    }

    pub fn has_more(&self, ranked: &[Chunk]) -> bool {
        ranked.len() > self.page_size
    }

    pub fn show_more(&mut self) {
        self.page_size += PAGE_INCREMENT;
    }

    pub fn reset(&mut self) {
        self.page_size = INITIAL_PAGE_SIZE;
    }
}

impl Default for ChunkPager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: i64, text: &str, similarity: f64) -> Chunk {
        Chunk(index, text.to_string(), similarity)
    }

    #[test]
    fn test_filter_keeps_relevant_sorted() {
        let chunks = vec![chunk(0, "a", 0.9), chunk(1, "b", 0.3)];
        let ranked = rank_chunks(&chunks);
        assert_eq!(ranked, vec![chunk(0, "a", 0.9)]);
    }

    #[test]
    fn test_empty_filter_falls_back_to_all_sorted() {
        let chunks = vec![chunk(0, "a", 0.3)];
        let ranked = rank_chunks(&chunks);
        assert_eq!(ranked, vec![chunk(0, "a", 0.3)]);

        let chunks = vec![chunk(0, "a", 0.1), chunk(1, "b", 0.4)];
        let ranked = rank_chunks(&chunks);
        assert_eq!(ranked, vec![chunk(1, "b", 0.4), chunk(0, "a", 0.1)]);
    }

    #[test]
    fn test_sort_is_descending() {
        let chunks = vec![chunk(0, "a", 0.6), chunk(1, "b", 0.8), chunk(2, "c", 0.7)];
        let ranked = rank_chunks(&chunks);
        let sims: Vec<f64> = ranked.iter().map(Chunk::similarity).collect();
        assert_eq!(sims, vec![0.8, 0.7, 0.6]);
    }

    #[test]
    fn test_floor_is_inclusive() {
        let chunks = vec![chunk(0, "edge", 0.5), chunk(1, "below", 0.49)];
        let ranked = rank_chunks(&chunks);
        assert_eq!(ranked, vec![chunk(0, "edge", 0.5)]);
    }

    #[test]
    fn test_empty_input_stays_empty() {
        assert!(rank_chunks(&[]).is_empty());
    }

    #[test]
    fn test_relevance_tiers() {
        assert_eq!(RelevanceTier::of(0.9), RelevanceTier::High);
        assert_eq!(RelevanceTier::of(0.7), RelevanceTier::High);
        assert_eq!(RelevanceTier::of(0.5), RelevanceTier::Medium);
        assert_eq!(RelevanceTier::of(0.2), RelevanceTier::Low);
    }

    #[test]
    fn test_pager_grows_and_resets() {
        let chunks: Vec<Chunk> = (0..12).map(|i| chunk(i, "t", 0.9)).collect();
        let mut pager = ChunkPager::new();

        assert_eq!(pager.visible(&chunks).len(), 5);
        assert!(pager.has_more(&chunks));

        pager.show_more();
        assert_eq!(pager.visible(&chunks).len(), 10);

        pager.show_more();
        assert_eq!(pager.visible(&chunks).len(), 12);
        assert!(!pager.has_more(&chunks));

        pager.reset();
        assert_eq!(pager.visible(&chunks).len(), 5);
    }

    #[test]
    fn test_pager_with_short_list() {
        let chunks = vec![chunk(0, "only", 0.9)];
        let pager = ChunkPager::new();
        assert_eq!(pager.visible(&chunks).len(), 1);
        assert!(!pager.has_more(&chunks));
    }
}
