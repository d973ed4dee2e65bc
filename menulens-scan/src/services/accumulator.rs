//! Caller-side fold of a scan's event sequence
//!
//! Dishes are keyed by the raw dish id from `phase1`, so output always
//! follows menu order regardless of batch completion order.

use crate::services::ranking::{rank, RankView};
use menulens_common::{Dish, Preferences, RawDish, ScanEvent};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Where a scan currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanProgress {
    Extracting,
    Enriching,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ScanAccumulator {
    raw: Vec<RawDish>,
    enriched: HashMap<String, Dish>,
    cache_hit_ids: HashSet<String>,
    progress: ScanProgress,
    last_message: Option<String>,
    error: Option<String>,
}

impl Default for ScanAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanAccumulator {
    pub fn new() -> Self {
        Self {
            raw: Vec::new(),
            enriched: HashMap::new(),
            cache_hit_ids: HashSet::new(),
            progress: ScanProgress::Extracting,
            last_message: None,
            error: None,
        }
    }

    /// Fold one event
    ///
    /// Events after a terminal event are ignored. Batch dishes whose id did
    /// not appear in `phase1` are discarded.
    pub fn apply(&mut self, event: &ScanEvent) {
        if matches!(self.progress, ScanProgress::Done | ScanProgress::Failed) {
            return;
        }

        match event {
            ScanEvent::Progress { message } => self.last_message = Some(message.clone()),
            ScanEvent::Phase1 { dishes } => {
                self.raw = dishes.clone();
                self.progress = ScanProgress::Enriching;
            }
            ScanEvent::Batch { dishes } => {
                for dish in dishes {
                    if !self.raw.iter().any(|r| r.id == dish.id) {
                        debug!(dish_id = %dish.id, "Ignoring dish not in phase1");
                        continue;
                    }
                    if self.cache_hit_ids.contains(&dish.id) {
                        continue;
                    }
                    self.enriched.insert(dish.id.clone(), dish.clone());
                }
            }
            ScanEvent::Done => self.progress = ScanProgress::Done,
            ScanEvent::Error { message } => {
                self.error = Some(message.clone());
                self.progress = ScanProgress::Failed;
            }
        }
    }

    /// Merge instant cache hits; they take precedence over provider results
    pub fn apply_cache_hits(&mut self, hits: &[Dish]) {
        for hit in hits {
            self.cache_hit_ids.insert(hit.id.clone());
            self.enriched.insert(hit.id.clone(), hit.clone());
        }
    }

    pub fn progress(&self) -> ScanProgress {
        self.progress
    }

    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn raw_dishes(&self) -> &[RawDish] {
        &self.raw
    }

    /// Enriched dishes so far, in menu order
    pub fn dishes(&self) -> Vec<Dish> {
        self.raw
            .iter()
            .filter_map(|r| self.enriched.get(&r.id).cloned())
            .collect()
    }

    /// Raw ids with no enriched dish yet
    pub fn pending_ids(&self) -> Vec<String> {
        self.raw
            .iter()
            .filter(|r| !self.enriched.contains_key(&r.id))
            .map(|r| r.id.clone())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.progress == ScanProgress::Done
    }

    /// Ranked dishes, available once `done` has been applied
    pub fn ranked(&self, prefs: &Preferences, view: RankView) -> Option<Vec<Dish>> {
        self.is_complete().then(|| rank(&self.dishes(), prefs, view))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::scripted::{enriched_from_raw, sample_menu};

    fn batch(raw: &[RawDish], provider: &str) -> ScanEvent {
        ScanEvent::Batch {
            dishes: raw.iter().map(|r| enriched_from_raw(r, provider)).collect(),
        }
    }

    #[test]
    fn test_batches_fold_into_menu_order() {
        let raw = sample_menu(4, "Japan");
        let mut acc = ScanAccumulator::new();

        acc.apply(&ScanEvent::progress("Reading menu..."));
        acc.apply(&ScanEvent::Phase1 { dishes: raw.clone() });
        acc.apply(&batch(&raw[2..], "groq"));
        assert_eq!(acc.pending_ids(), vec!["dish-1", "dish-2"]);

        acc.apply(&batch(&raw[..2], "groq"));
        let ids: Vec<String> = acc.dishes().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["dish-1", "dish-2", "dish-3", "dish-4"]);
        assert!(acc.ranked(&Preferences::default(), RankView::Menu).is_none());

        acc.apply(&ScanEvent::Done);
        assert!(acc.is_complete());
        let ranked = acc.ranked(&Preferences::default(), RankView::Menu).unwrap();
        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[0].rank_label.as_deref(), Some("Top Pick"));
    }

    #[test]
    fn test_cache_hits_win_over_batches() {
        let raw = sample_menu(2, "Korea");
        let mut acc = ScanAccumulator::new();
        acc.apply(&ScanEvent::Phase1 { dishes: raw.clone() });

        let mut hit = enriched_from_raw(&raw[0], "cache");
        hit.description = "from cache".into();
        acc.apply_cache_hits(&[hit]);
        acc.apply(&batch(&raw, "groq"));

        let dishes = acc.dishes();
        assert_eq!(dishes[0].description, "from cache");
        assert_ne!(dishes[1].description, "from cache");
    }

    #[test]
    fn test_unknown_ids_and_post_terminal_events_ignored() {
        let raw = sample_menu(1, "Thailand");
        let mut acc = ScanAccumulator::new();
        acc.apply(&ScanEvent::Phase1 { dishes: raw.clone() });

        let stranger = enriched_from_raw(&sample_menu(3, "Thailand")[2], "groq");
        acc.apply(&ScanEvent::Batch {
            dishes: vec![stranger],
        });
        assert!(acc.dishes().is_empty());

        acc.apply(&ScanEvent::error("boom"));
        acc.apply(&batch(&raw, "groq"));
        assert_eq!(acc.progress(), ScanProgress::Failed);
        assert_eq!(acc.error(), Some("boom"));
        assert!(acc.dishes().is_empty());
    }
}
