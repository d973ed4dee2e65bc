//! Phase 2: batched, concurrent enrichment with one retry for missing dishes
//!
//! Raw dishes are partitioned into batches of `batch_size` in menu order.
//! Every batch is launched at once; batch `i` waits `i * stagger` before its
//! first call to soften upstream rate limits. Each call goes through the
//! enrichment fallback chain.
//!
//! After a batch's first call, any raw dish without a matching enriched dish
//! is retried once, as a single smaller batch. Dishes still missing after the
//! retry are dropped and logged. A batch whose entire chain failed counts as
//! "all missing", so it gets the same single retry.

use crate::services::enrichment_chain::EnrichmentChain;
use crate::types::{EnrichmentTier, ProviderError, ScanError};
use futures::stream::{FuturesUnordered, StreamExt};
use menulens_common::{Dish, RawDish};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Batching parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnrichmentSettings {
    pub batch_size: usize,
    pub stagger: Duration,
    pub tier: EnrichmentTier,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            batch_size: crate::config::DEFAULT_BATCH_SIZE,
            stagger: Duration::from_millis(crate::config::DEFAULT_STAGGER_MS),
            tier: EnrichmentTier::Card,
        }
    }
}

/// Result of one batch after its retry
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Zero-based batch index in menu order
    pub index: usize,
    /// Enriched dishes in menu order, keyed by their raw ids
    pub dishes: Vec<Dish>,
    /// Raw ids still missing after the retry
    pub dropped: Vec<String>,
    pub retried: bool,
}

impl BatchOutcome {
    /// Dishes lost to partial enrichment, if any
    pub fn partial_loss(&self) -> Option<PartialEnrichmentLoss> {
        if self.dropped.is_empty() {
            None
        } else {
            Some(PartialEnrichmentLoss {
                batch: self.index,
                dropped_ids: self.dropped.clone(),
            })
        }
    }
}

/// Dishes dropped after the retry; reported, never raised
#[derive(Debug, Clone, PartialEq)]
pub struct PartialEnrichmentLoss {
    pub batch: usize,
    pub dropped_ids: Vec<String>,
}

pub struct EnrichmentOrchestrator {
    chain: EnrichmentChain,
    settings: EnrichmentSettings,
}

impl EnrichmentOrchestrator {
    pub fn new(chain: EnrichmentChain, settings: EnrichmentSettings) -> Self {
        Self { chain, settings }
    }

    pub fn chain(&self) -> &EnrichmentChain {
        &self.chain
    }

    pub fn settings(&self) -> EnrichmentSettings {
        self.settings
    }

    /// Split raw dishes into consecutive batches in menu order
    pub fn partition(&self, raw: &[RawDish]) -> Vec<Vec<RawDish>> {
        raw.chunks(self.settings.batch_size.max(1))
            .map(<[RawDish]>::to_vec)
            .collect()
    }

    /// Enrich everything and return one list in menu order
    ///
    /// Ids are renumbered `dish-1..=M` over the surviving dishes. The
    /// streaming path keeps raw ids instead; see [`Self::spawn_batches`].
    pub async fn enrich(
        &self,
        raw: &[RawDish],
        prefs_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Dish>, ScanError> {
        let batches = self.partition(raw);
        let mut in_flight: FuturesUnordered<_> = batches
            .iter()
            .enumerate()
            .map(|(index, batch)| self.run_batch(index, batch, prefs_text, cancel))
            .collect();

        let mut outcomes = Vec::with_capacity(batches.len());
        while let Some(outcome) = in_flight.next().await {
            outcomes.push(outcome?);
        }
        outcomes.sort_by_key(|o| o.index);

        let mut dishes: Vec<Dish> = outcomes.into_iter().flat_map(|o| o.dishes).collect();
        renumber(&mut dishes);
        info!(requested = raw.len(), enriched = dishes.len(), "Enrichment complete");
        Ok(dishes)
    }

    /// Launch every batch as its own task
    ///
    /// Outcomes arrive on the returned channel in completion order. Returns
    /// the number of batches launched. Tasks stop early once `cancel` fires.
    pub fn spawn_batches(
        self: &Arc<Self>,
        raw: Vec<RawDish>,
        prefs_text: String,
        cancel: CancellationToken,
    ) -> (usize, mpsc::UnboundedReceiver<Result<BatchOutcome, ScanError>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let batches = self.partition(&raw);
        let count = batches.len();
        let prefs_text: Arc<str> = prefs_text.into();

        for (index, batch) in batches.into_iter().enumerate() {
            let orchestrator = Arc::clone(self);
            let prefs_text = Arc::clone(&prefs_text);
            let cancel = cancel.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = orchestrator
                    .run_batch(index, &batch, &prefs_text, &cancel)
                    .await;
                // Receiver gone means the scan was abandoned
                let _ = tx.send(outcome);
            });
        }

        (count, rx)
    }

    /// Run one batch: stagger, first call, one retry of missing dishes
    pub async fn run_batch(
        &self,
        index: usize,
        batch: &[RawDish],
        prefs_text: &str,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, ScanError> {
        let delay = self.settings.stagger.saturating_mul(index as u32);
        if !delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ScanError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let first = self.call_chain(index, batch, prefs_text, cancel).await?;
        let mut matched = reconcile(batch, first, &HashMap::new());

        let missing: Vec<RawDish> = batch
            .iter()
            .filter(|raw| !matched.contains_key(&raw.id))
            .cloned()
            .collect();

        let retried = !missing.is_empty();
        if retried {
            warn!(
                batch = index,
                missing = missing.len(),
                of = batch.len(),
                "Retrying dishes missing from enrichment"
            );
            let second = self.call_chain(index, &missing, prefs_text, cancel).await?;
            let recovered = reconcile(&missing, second, &matched);
            matched.extend(recovered);
        }

        let mut dishes = Vec::with_capacity(batch.len());
        let mut dropped = Vec::new();
        for raw in batch {
            match matched.remove(&raw.id) {
                Some(mut dish) => {
                    dish.id = raw.id.clone();
                    dish.fill_missing_from(raw);
                    dishes.push(dish);
                }
                None => dropped.push(raw.id.clone()),
            }
        }

        if !dropped.is_empty() {
            warn!(batch = index, dropped = ?dropped, "Dropping dishes after retry");
        }
        debug!(batch = index, dishes = dishes.len(), retried, "Batch complete");

        Ok(BatchOutcome {
            index,
            dishes,
            dropped,
            retried,
        })
    }

    /// One pass through the chain; a failed chain yields no dishes
    async fn call_chain(
        &self,
        index: usize,
        batch: &[RawDish],
        prefs_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Dish>, ScanError> {
        match self
            .chain
            .enrich(batch, prefs_text, self.settings.tier, cancel)
            .await
        {
            Ok(dishes) => Ok(dishes),
            Err(ProviderError::Cancelled) => Err(ScanError::Cancelled),
            Err(e) => {
                warn!(batch = index, error = %e, "All enrichment providers failed for batch");
                Ok(Vec::new())
            }
        }
    }
}

/// Pair returned dishes with requested raw dishes
///
/// Matching is by id first. A returned dish with an unknown id is paired with
/// a still-unmatched raw dish of the same English name (case-insensitive);
/// otherwise it is discarded. Duplicates keep the first occurrence. Raw ids
/// present in `already` are never re-matched.
fn reconcile(
    requested: &[RawDish],
    returned: Vec<Dish>,
    already: &HashMap<String, Dish>,
) -> HashMap<String, Dish> {
    let mut matched: HashMap<String, Dish> = HashMap::new();
    let open = |id: &str, matched: &HashMap<String, Dish>| {
        !already.contains_key(id) && !matched.contains_key(id)
    };

    let mut unknown = Vec::new();
    for dish in returned {
        let known = requested.iter().any(|raw| raw.id == dish.id);
        if known {
            if open(&dish.id, &matched) {
                matched.insert(dish.id.clone(), dish);
            }
        } else {
            unknown.push(dish);
        }
    }

    for dish in unknown {
        let by_name = requested.iter().find(|raw| {
            open(&raw.id, &matched)
                && !dish.name_english.trim().is_empty()
                && raw.name_english.trim().eq_ignore_ascii_case(dish.name_english.trim())
        });
        match by_name {
            Some(raw) => {
                matched.insert(raw.id.clone(), dish);
            }
            None => debug!(id = %dish.id, "Discarding enriched dish with unknown id"),
        }
    }

    matched
}

/// Assign compact `dish-1..=M` ids in list order
pub fn renumber(dishes: &mut [Dish]) {
    for (i, dish) in dishes.iter_mut().enumerate() {
        dish.id = format!("dish-{}", i + 1);
    }
}
