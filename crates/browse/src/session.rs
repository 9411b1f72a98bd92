//! Debounced, single-flight suggestion fetching
//!
//! Every keystroke goes through [`SuggestionSession::on_query_changed`]. Only
//! a query that stays unchanged for the debounce window is sent to the
//! catalog, and only the newest query may publish its result: each query
//! carries a generation and a result is written to the watch channel only
//! while that generation is still current.

use crate::suggest::{Suggestion, SuggestionRanker};
use autoab_common::catalog::CatalogApi;
use autoab_common::config::BrowseConfig;
use autoab_common::metrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum SuggestionStatus {
    /// No query worth fetching
    Idle,
    /// Waiting out the debounce window or the fetch
    Loading,
    Ready,
    Failed { message: String },
}

/// What the search box shows right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionSnapshot {
    pub query: String,
    pub suggestions: Vec<Suggestion>,
    pub status: SuggestionStatus,
    #[serde(skip)]
    generation: u64,
}

impl Default for SuggestionSnapshot {
    fn default() -> Self {
        Self {
            query: String::new(),
            suggestions: Vec::new(),
            status: SuggestionStatus::Idle,
            generation: 0,
        }
    }
}

pub struct SuggestionSession {
    catalog: Arc<dyn CatalogApi>,
    ranker: Arc<SuggestionRanker>,
    window: Duration,
    tx: watch::Sender<SuggestionSnapshot>,
    token: CancellationToken,
    pending: Option<CancellationToken>,
}

impl SuggestionSession {
    pub fn new(catalog: Arc<dyn CatalogApi>, ranker: SuggestionRanker, window: Duration) -> Self {
        let (tx, _rx) = watch::channel(SuggestionSnapshot::default());
        Self {
            catalog,
            ranker: Arc::new(ranker),
            window,
            tx,
            token: CancellationToken::new(),
            pending: None,
        }
    }

    pub fn from_config(catalog: Arc<dyn CatalogApi>, config: &BrowseConfig) -> Self {
        Self::new(
            catalog,
            SuggestionRanker::from_config(config),
            Duration::from_millis(config.debounce_ms),
        )
    }

    pub fn subscribe(&self) -> watch::Receiver<SuggestionSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> SuggestionSnapshot {
        self.tx.borrow().clone()
    }

    /// Register new search box text. Supersedes any pending query.
    ///
    /// Text shorter than the minimum query length clears the suggestions
    /// without a fetch.
    pub fn on_query_changed(&mut self, text: &str) {
        if self.is_closed() {
            return;
        }
        let accepted = self.ranker.accepts(text);
        let generation = self.supersede(text, accepted);

        if !accepted {
            metrics::record_suggestion_query("short");
            return;
        }
        self.spawn(text.trim().to_string(), generation, self.window);
    }

    /// Re-issue the current query without waiting for the debounce window.
    pub fn retry(&mut self) {
        if self.is_closed() {
            return;
        }
        let query = self.tx.borrow().query.clone();
        if !self.ranker.accepts(&query) {
            return;
        }
        let generation = self.supersede(&query, true);
        self.spawn(query.trim().to_string(), generation, Duration::ZERO);
    }

    /// Abort pending work. Results still in flight are discarded.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
        self.tx.send_modify(|snap| {
            snap.generation += 1;
            if snap.status == SuggestionStatus::Loading {
                snap.status = SuggestionStatus::Idle;
            }
        });
    }

    /// Stop the session for good. Later queries are ignored.
    pub fn close(&mut self) {
        self.cancel();
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    fn supersede(&mut self, text: &str, accepted: bool) -> u64 {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }

        let mut generation = 0;
        self.tx.send_modify(|snap| {
            snap.generation += 1;
            generation = snap.generation;
            snap.query = text.to_string();
            if accepted {
                snap.status = SuggestionStatus::Loading;
            } else {
                snap.suggestions.clear();
                snap.status = SuggestionStatus::Idle;
            }
        });

        debug!(query = %text, generation, accepted, "Suggestion query changed");
        generation
    }

    fn spawn(&mut self, query: String, generation: u64, delay: Duration) {
        let token = self.token.child_token();
        self.pending = Some(token.clone());

        let catalog = Arc::clone(&self.catalog);
        let ranker = Arc::clone(&self.ranker);
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let fetched = tokio::select! {
                _ = token.cancelled() => {
                    metrics::record_suggestion_query("superseded");
                    debug!(query = %query, generation, "Suggestion query superseded");
                    return;
                }
                result = async {
                    tokio::time::sleep(delay).await;
                    metrics::record_suggestion_query("fetched");
                    catalog.search_records(&query).await
                } => result,
            };

            let outcome = match fetched {
                Ok(records) => {
                    let ranked = ranker.rank(&records, &query);
                    info!(query = %query, records = records.len(), suggestions = ranked.len(), "Fetched suggestions");
                    Ok(ranked)
                }
                Err(e) => {
                    warn!(query = %query, error = %e, "Suggestion fetch failed");
                    Err(e.to_string())
                }
            };
            publish(&tx, generation, outcome);
        });
    }
}

impl Drop for SuggestionSession {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Write a fetch outcome if `generation` is still the latest query.
fn publish(
    tx: &watch::Sender<SuggestionSnapshot>,
    generation: u64,
    outcome: Result<Vec<Suggestion>, String>,
) -> bool {
    tx.send_if_modified(|snap| {
        if snap.generation != generation {
            debug!(generation, current = snap.generation, "Dropping stale suggestions");
            return false;
        }
        match outcome {
            Ok(suggestions) => {
                snap.suggestions = suggestions;
                snap.status = SuggestionStatus::Ready;
            }
            Err(message) => snap.status = SuggestionStatus::Failed { message },
        }
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{CatalogCall, InMemoryCatalog};
    use crate::suggest::SuggestionKind;
    use async_trait::async_trait;
    use autoab_common::errors::Result;
    use autoab_common::models::{FilterField, FilterState, Record, RecordPage};
    use autoab_common::Priority;
    use pretty_assertions::assert_eq;
    use std::sync::OnceLock;

    const WINDOW: Duration = Duration::from_millis(300);

    fn record(disease: &str, antibody: &str) -> Record {
        Record {
            disease: disease.to_string(),
            autoantibody: antibody.to_string(),
            priority: Priority::new(1.0),
            ..Record::default()
        }
    }

    fn catalog() -> Arc<InMemoryCatalog> {
        Arc::new(InMemoryCatalog::new(vec![
            record("Lupus", "Anti-dsDNA"),
            record("Autoimmune hepatitis", "Anti-LKM1"),
            record("Celiac disease", "Anti-tTG"),
        ]))
    }

    fn session(catalog: &Arc<InMemoryCatalog>) -> SuggestionSession {
        SuggestionSession::new(catalog.clone(), SuggestionRanker::default(), WINDOW)
    }

    async fn settled(rx: &mut watch::Receiver<SuggestionSnapshot>) -> SuggestionSnapshot {
        rx.wait_for(|s| s.status != SuggestionStatus::Loading)
            .await
            .unwrap()
            .clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_typing_fetches_once() {
        let catalog = catalog();
        let mut session = session(&catalog);
        let mut rx = session.subscribe();

        session.on_query_changed("a");
        tokio::time::advance(Duration::from_millis(100)).await;
        session.on_query_changed("ab");
        tokio::time::advance(Duration::from_millis(100)).await;
        session.on_query_changed("abc");

        let snap = settled(&mut rx).await;
        assert_eq!(snap.query, "abc");
        assert_eq!(snap.status, SuggestionStatus::Ready);
        assert_eq!(catalog.calls(), vec![CatalogCall::Search("abc".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_fetched_before_window_elapses() {
        let catalog = catalog();
        let mut session = session(&catalog);

        session.on_query_changed("lupus");
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(catalog.calls().is_empty());
        assert_eq!(session.snapshot().status, SuggestionStatus::Loading);

        let snap = settled(&mut session.subscribe()).await;
        assert_eq!(snap.suggestions[0].value, "Lupus");
        assert_eq!(snap.suggestions[0].kind, SuggestionKind::Disease);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_does_not_overwrite() {
        let slow = Arc::new(
            InMemoryCatalog::new(vec![record("Lupus", "Anti-dsDNA"), record("Celiac disease", "Anti-tTG")])
                .with_latency(Duration::from_secs(2)),
        );
        let mut session = SuggestionSession::new(slow.clone(), SuggestionRanker::default(), WINDOW);
        let mut rx = session.subscribe();

        session.on_query_changed("lupus");
        // the "lupus" fetch is now in flight
        tokio::time::sleep(Duration::from_millis(500)).await;
        session.on_query_changed("celiac");

        let snap = settled(&mut rx).await;
        assert_eq!(snap.query, "celiac");
        let values: Vec<_> = snap.suggestions.iter().map(|s| s.value.as_str()).collect();
        assert_eq!(values, vec!["Celiac disease"]);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(session.snapshot().suggestions[0].value, "Celiac disease");
    }

    #[tokio::test]
    async fn test_stale_generation_is_not_published() {
        let catalog = catalog();
        let mut session = session(&catalog);
        session.cancel();
        let current = session.snapshot().generation;

        let stale = vec![Suggestion {
            kind: SuggestionKind::Disease,
            value: "Stale".to_string(),
            priority: Priority::ZERO,
            match_score: crate::suggest::MatchScore::Exact,
        }];
        assert!(!publish(&session.tx, current - 1, Ok(stale)));
        assert!(session.snapshot().suggestions.is_empty());
        assert!(publish(&session.tx, current, Ok(Vec::new())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_clears_without_fetch() {
        let catalog = catalog();
        let mut session = session(&catalog);
        let mut rx = session.subscribe();

        session.on_query_changed("anti");
        assert!(!settled(&mut rx).await.suggestions.is_empty());

        session.on_query_changed("a");
        let snap = session.snapshot();
        assert!(snap.suggestions.is_empty());
        assert_eq!(snap.status, SuggestionStatus::Idle);
        assert_eq!(catalog.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_published_and_retry_recovers() {
        let catalog = catalog();
        catalog.fail_with(502, "bad gateway");
        let mut session = session(&catalog);
        let mut rx = session.subscribe();

        session.on_query_changed("celiac");
        let snap = settled(&mut rx).await;
        assert!(matches!(snap.status, SuggestionStatus::Failed { .. }));

        catalog.recover();
        session.retry();
        let snap = settled(&mut rx).await;
        assert_eq!(snap.status, SuggestionStatus::Ready);
        assert_eq!(snap.suggestions.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_query() {
        let catalog = catalog();
        let mut session = session(&catalog);

        session.on_query_changed("lupus");
        session.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(catalog.calls().is_empty());
        assert_eq!(session.snapshot().status, SuggestionStatus::Idle);

        session.close();
        session.on_query_changed("celiac");
        session.retry();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let snap = session.snapshot();
        assert!(session.is_closed());
        assert!(catalog.calls().is_empty());
        assert_eq!(snap.status, SuggestionStatus::Idle);
        assert_eq!(snap.query, "lupus");
    }

    /// Catalog whose answer lands after a newer query was registered,
    /// without the cancellation reaching the fetch.
    struct OvertakenCatalog {
        inner: InMemoryCatalog,
        tx: OnceLock<watch::Sender<SuggestionSnapshot>>,
    }

    #[async_trait]
    impl CatalogApi for OvertakenCatalog {
        async fn list_records(&self, filters: &FilterState, page: u32, limit: u32) -> Result<RecordPage> {
            self.inner.list_records(filters, page, limit).await
        }

        async fn list_unique_values(
            &self,
            field: FilterField,
            dependent: &[(FilterField, String)],
        ) -> Result<Vec<String>> {
            self.inner.list_unique_values(field, dependent).await
        }

        async fn search_records(&self, query: &str) -> Result<Vec<Record>> {
            let records = self.inner.search_records(query).await?;
            if let Some(tx) = self.tx.get() {
                tx.send_modify(|snap| {
                    snap.generation += 1;
                    snap.query = "celiac".to_string();
                });
            }
            Ok(records)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_arriving_after_newer_query_is_dropped() {
        let overtaken = Arc::new(OvertakenCatalog {
            inner: InMemoryCatalog::new(vec![record("Lupus", "Anti-dsDNA")]),
            tx: OnceLock::new(),
        });
        let mut session = SuggestionSession::new(overtaken.clone(), SuggestionRanker::default(), WINDOW);
        assert!(overtaken.tx.set(session.tx.clone()).is_ok());

        session.on_query_changed("lupus");
        tokio::time::sleep(Duration::from_secs(1)).await;

        let snap = session.snapshot();
        assert_eq!(overtaken.inner.calls(), vec![CatalogCall::Search("lupus".to_string())]);
        assert_eq!(snap.query, "celiac");
        assert_eq!(snap.status, SuggestionStatus::Loading);
        assert!(snap.suggestions.is_empty());
    }
}
