//! Streaming scan pipeline
//!
//! A scan runs as a driver task that owns the extraction stage and the
//! enrichment batches, and pushes [`ScanEvent`]s to the caller through a
//! bounded channel:
//!
//! ```text
//! progress → phase1 → progress → batch × ⌈N/B⌉ (completion order) → done
//! ```
//!
//! `error` replaces everything after the point of failure. Cancelling the
//! scan token, or dropping the [`ScanStream`], stops the driver and aborts
//! in-flight provider calls; no further events are delivered after that.

use crate::providers::build_prefs_description;
use crate::services::enrichment_orchestrator::EnrichmentOrchestrator;
use crate::services::extraction::ExtractionStage;
use crate::types::{MenuImage, ProviderError, ScanError};
use futures::Stream;
use menulens_common::{DetailRequest, DishDetail, Preferences, ScanEvent};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events buffered between the driver and a slow consumer
const EVENT_BUFFER: usize = 16;

pub const READING_MESSAGE: &str = "Reading menu...";

/// Extraction + enrichment, assembled once from configuration
pub struct ScanPipeline {
    extraction: ExtractionStage,
    orchestrator: Arc<EnrichmentOrchestrator>,
}

impl ScanPipeline {
    pub fn new(extraction: ExtractionStage, orchestrator: EnrichmentOrchestrator) -> Self {
        Self {
            extraction,
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn extraction(&self) -> &ExtractionStage {
        &self.extraction
    }

    pub fn orchestrator(&self) -> &EnrichmentOrchestrator {
        &self.orchestrator
    }

    /// Start a scan with a fresh cancellation token
    pub fn start(self: &Arc<Self>, image: MenuImage, prefs: Preferences) -> ScanStream {
        self.start_with_token(image, prefs, CancellationToken::new())
    }

    /// Start a scan controlled by `cancel`
    pub fn start_with_token(
        self: &Arc<Self>,
        image: MenuImage,
        prefs: Preferences,
        cancel: CancellationToken,
    ) -> ScanStream {
        let scan_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        let pipeline = Arc::clone(self);
        let driver_cancel = cancel.clone();
        tokio::spawn(async move {
            pipeline
                .drive(scan_id, image, prefs, tx, driver_cancel)
                .await;
        });

        ScanStream {
            scan_id,
            events: rx,
            cancel,
            finished: false,
        }
    }

    /// Detail-tier enrichment for dishes shown at card tier
    pub async fn enrich_detail(
        &self,
        requests: &[DetailRequest],
        prefs: &Preferences,
        cancel: &CancellationToken,
    ) -> Result<Vec<DishDetail>, ProviderError> {
        let prefs_text = build_prefs_description(prefs);
        self.orchestrator
            .chain()
            .enrich_detail(requests, &prefs_text, cancel)
            .await
    }

    async fn drive(
        &self,
        scan_id: Uuid,
        image: MenuImage,
        prefs: Preferences,
        tx: mpsc::Sender<ScanEvent>,
        cancel: CancellationToken,
    ) {
        let started = Instant::now();
        let emitter = Emitter { tx: &tx, cancel: &cancel };
        info!(scan_id = %scan_id, "Scan started");

        if !emitter.emit(ScanEvent::progress(READING_MESSAGE)).await {
            return;
        }

        let raw = match self.extraction.extract(&image, &cancel).await {
            Ok(raw) => raw,
            Err(ScanError::Cancelled) => {
                info!(scan_id = %scan_id, "Scan cancelled during extraction");
                return;
            }
            Err(e) => {
                if let ScanError::EmptyExtraction { attempts } = &e {
                    error!(scan_id = %scan_id, attempts = ?attempts, "Extraction failed");
                }
                emitter.emit(ScanEvent::error(e.to_string())).await;
                return;
            }
        };

        let dish_count = raw.len();
        if !emitter.emit(ScanEvent::Phase1 { dishes: raw.clone() }).await {
            return;
        }
        if !emitter
            .emit(ScanEvent::progress(format!("Enriching {} dishes...", dish_count)))
            .await
        {
            return;
        }

        let prefs_text = build_prefs_description(&prefs);
        let (expected, mut outcomes) =
            self.orchestrator
                .spawn_batches(raw, prefs_text, cancel.clone());

        let mut delivered = 0;
        let mut dropped = 0;
        while delivered < expected {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(scan_id = %scan_id, "Scan cancelled during enrichment");
                    return;
                }
                outcome = outcomes.recv() => outcome,
            };

            match next {
                Some(Ok(outcome)) => {
                    delivered += 1;
                    if let Some(loss) = outcome.partial_loss() {
                        dropped += loss.dropped_ids.len();
                    }
                    if !emitter.emit(ScanEvent::Batch { dishes: outcome.dishes }).await {
                        return;
                    }
                }
                Some(Err(ScanError::Cancelled)) => return,
                Some(Err(e)) => {
                    error!(scan_id = %scan_id, error = %e, "Enrichment batch failed");
                    emitter.emit(ScanEvent::error(e.to_string())).await;
                    cancel.cancel();
                    return;
                }
                None => {
                    error!(scan_id = %scan_id, delivered, expected, "Enrichment tasks ended early");
                    emitter
                        .emit(ScanEvent::error("Enrichment stopped unexpectedly"))
                        .await;
                    return;
                }
            }
        }

        if emitter.emit(ScanEvent::Done).await {
            info!(
                scan_id = %scan_id,
                dishes = dish_count,
                batches = expected,
                dropped,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Scan complete"
            );
        }
    }
}

/// Sends events unless the scan is cancelled; a vanished consumer cancels it
struct Emitter<'a> {
    tx: &'a mpsc::Sender<ScanEvent>,
    cancel: &'a CancellationToken,
}

impl Emitter<'_> {
    async fn emit(&self, event: ScanEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if self.tx.send(event).await.is_err() {
            warn!("Scan consumer went away, cancelling");
            self.cancel.cancel();
            return false;
        }
        true
    }
}

/// Consumer end of a running scan
///
/// Dropping it cancels the scan.
pub struct ScanStream {
    scan_id: Uuid,
    events: mpsc::Receiver<ScanEvent>,
    cancel: CancellationToken,
    finished: bool,
}

impl ScanStream {
    pub fn scan_id(&self) -> Uuid {
        self.scan_id
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Next event, or `None` once the scan has ended or been cancelled
    pub async fn next_event(&mut self) -> Option<ScanEvent> {
        if self.finished {
            return None;
        }

        let event = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        };

        match &event {
            Some(e) if e.is_terminal() => self.finished = true,
            None => self.finished = true,
            Some(_) => {}
        }
        event
    }

    /// Drain every remaining event
    pub async fn collect_events(mut self) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    /// Adapt into a `futures` stream
    pub fn into_stream(self) -> impl Stream<Item = ScanEvent> + Send + 'static {
        futures::stream::unfold(self, |mut scan| async move {
            scan.next_event().await.map(|event| (event, scan))
        })
    }
}

impl Drop for ScanStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
