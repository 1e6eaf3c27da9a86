/// Allocator for the synthetic match and event ids.
///
/// Matches and events draw from independent monotonic counters seeded from
/// disjoint ranges. The allocator lives as long as the batch loader that owns
/// it, so ids are monotonic for the process lifetime but deliberately not
/// stable across restarts and never derived from document content. Tests
/// construct their own allocator with known seeds to get deterministic ids.
#[derive(Debug)]
pub struct IdAllocator {
    next_match: i64,
    next_event: i64,
}

impl IdAllocator {
    pub fn new(match_seed: i64, event_seed: i64) -> Self {
        Self { next_match: match_seed, next_event: event_seed }
    }

    pub fn next_match_id(&mut self) -> i64 {
        let id = self.next_match;
        self.next_match += 1;
        id
    }

    pub fn next_event_id(&mut self) -> i64 {
        let id = self.next_event;
        self.next_event += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_EVENT_ID_SEED, DEFAULT_MATCH_ID_SEED};

    #[test]
    fn counters_are_monotonic_and_independent() {
        let mut ids = IdAllocator::new(100, 500);
        assert_eq!(ids.next_match_id(), 100);
        assert_eq!(ids.next_event_id(), 500);
        assert_eq!(ids.next_match_id(), 101);
        assert_eq!(ids.next_event_id(), 501);
        assert_eq!(ids.next_match_id(), 102);
    }

    #[test]
    fn default_seeds_keep_ranges_disjoint() {
        // 900k matches before the ranges could meet — far beyond one batch.
        assert!(DEFAULT_EVENT_ID_SEED - DEFAULT_MATCH_ID_SEED >= 900_000);
    }
}
