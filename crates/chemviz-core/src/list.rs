// ── List synchronizer ──
//
// Drives the paginated equipment listing. Each load replaces the page
// wholesale. Only the most recently issued load may publish: every load
// takes a new generation number and cancels its predecessor, and a
// result whose generation is no longer current is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chemviz_api::{ApiClient, EquipmentRecord, ListQuery, Paginated};
use indexmap::IndexSet;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::error::CoreError;
use crate::state::{Failure, OperationState};

// ── Page ────────────────────────────────────────────────────────────

/// One page of equipment plus its opaque neighbour cursors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<EquipmentRecord>,
    pub next: Option<Url>,
    pub previous: Option<Url>,
    /// Total matching records, when the server reports it.
    pub count: Option<u64>,
}

/// Per-record values for the pressure (bar) and temperature (line) charts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub pressures: Vec<f64>,
    pub temperatures: Vec<f64>,
}

impl Page {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Distinct non-empty materials on this page, in order of first appearance.
    pub fn materials(&self) -> IndexSet<String> {
        self.items
            .iter()
            .map(|r| r.material.trim())
            .filter(|m| !m.is_empty())
            .map(str::to_owned)
            .collect()
    }

    pub fn series(&self) -> ChartSeries {
        ChartSeries {
            labels: self.items.iter().map(|r| r.name.clone()).collect(),
            pressures: self.items.iter().map(|r| r.pressure).collect(),
            temperatures: self.items.iter().map(|r| r.temperature).collect(),
        }
    }
}

impl From<Paginated<EquipmentRecord>> for Page {
    fn from(p: Paginated<EquipmentRecord>) -> Self {
        Self {
            items: p.results,
            next: p.next,
            previous: p.previous,
            count: p.count,
        }
    }
}

// ── LoadOutcome ─────────────────────────────────────────────────────

/// What became of a load request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The response was published as the current page.
    Applied,
    /// A newer load was issued first; this result was dropped.
    Superseded,
    /// No cursor in the requested direction; nothing was sent.
    NoCursor,
}

// ── ListSynchronizer ────────────────────────────────────────────────

pub struct ListSynchronizer {
    client: Arc<ApiClient>,
    query: Mutex<ListQuery>,
    generation: AtomicU64,
    in_flight: Mutex<Option<CancellationToken>>,
    page: watch::Sender<Arc<Page>>,
    state: watch::Sender<OperationState>,
}

impl ListSynchronizer {
    pub fn new(client: Arc<ApiClient>) -> Self {
        let (page, _) = watch::channel(Arc::new(Page::default()));
        let (state, _) = watch::channel(OperationState::Idle);
        Self {
            client,
            query: Mutex::new(ListQuery::default()),
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            page,
            state,
        }
    }

    // ── Snapshots ───────────────────────────────────────────────────

    pub fn page(&self) -> Arc<Page> {
        Arc::clone(&self.page.borrow())
    }

    pub fn state(&self) -> OperationState {
        self.state.borrow().clone()
    }

    pub fn query(&self) -> ListQuery {
        self.query.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn subscribe_page(&self) -> watch::Receiver<Arc<Page>> {
        self.page.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<OperationState> {
        self.state.subscribe()
    }

    // ── Transitions ─────────────────────────────────────────────────

    /// Fetch `target` and, if still current on arrival, publish it.
    ///
    /// On failure the previous page stays visible. An auth rejection is
    /// reported as `SessionExpired` even when superseded so the caller
    /// can still invalidate the session.
    pub async fn load(&self, target: Url) -> Result<LoadOutcome, CoreError> {
        let (generation, cancel) = self.begin();
        debug!(generation, %target, "loading equipment page");

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(generation, "listing request cancelled");
                return Ok(LoadOutcome::Superseded);
            }
            result = self.client.fetch_equipment_page(&target) => result,
        };

        self.settle(generation, result)
    }

    /// Publish a finished load if `generation` is still current. The check
    /// and the publish happen under the slot lock so a concurrent `begin`
    /// or `clear` cannot slip in between.
    fn settle(
        &self,
        generation: u64,
        result: Result<Paginated<EquipmentRecord>, chemviz_api::Error>,
    ) -> Result<LoadOutcome, CoreError> {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_current(generation) {
            drop(slot);
            debug!(generation, "discarding stale listing response");
            return match result {
                Err(e) if e.is_auth_expired() => Err(CoreError::SessionExpired),
                _ => Ok(LoadOutcome::Superseded),
            };
        }
        slot.take();

        match result {
            Ok(resp) => {
                let page = Page::from(resp);
                let message = format!("Loaded {} records", page.items.len());
                self.page.send_replace(Arc::new(page));
                self.state.send_replace(OperationState::Succeeded(message));
                Ok(LoadOutcome::Applied)
            }
            Err(e) => {
                let err = CoreError::from(e);
                warn!(error = %err, "listing failed, keeping previous page");
                self.state
                    .send_replace(OperationState::Failed(Failure::from(&err)));
                Err(err)
            }
        }
    }

    /// Replace the query and fetch its first page. Cursors of the old
    /// query are never reused.
    pub async fn apply_query(&self, query: ListQuery) -> Result<LoadOutcome, CoreError> {
        let target = self.client.equipment_url(&query)?;
        *self.query.lock().unwrap_or_else(PoisonError::into_inner) = query;
        self.load(target).await
    }

    /// First page of the current query.
    pub async fn refresh(&self) -> Result<LoadOutcome, CoreError> {
        let target = self.client.equipment_url(&self.query())?;
        self.load(target).await
    }

    pub async fn go_next(&self) -> Result<LoadOutcome, CoreError> {
        let cursor = self.page.borrow().next.clone();
        let Some(target) = cursor else {
            return Ok(LoadOutcome::NoCursor);
        };
        self.load(target).await
    }

    pub async fn go_previous(&self) -> Result<LoadOutcome, CoreError> {
        let cursor = self.page.borrow().previous.clone();
        let Some(target) = cursor else {
            return Ok(LoadOutcome::NoCursor);
        };
        self.load(target).await
    }

    /// Drop the page and abandon any in-flight load.
    pub fn clear(&self) {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = slot.take() {
            token.cancel();
        }
        self.page.send_replace(Arc::new(Page::default()));
        self.state.send_replace(OperationState::Idle);
    }

    /// Return a finished listing state to `Idle`. No effect while loading.
    pub fn dismiss(&self) {
        self.state.send_if_modified(|state| {
            if state.is_in_flight() || *state == OperationState::Idle {
                return false;
            }
            *state = OperationState::Idle;
            true
        });
    }

    // ── Generation bookkeeping ──────────────────────────────────────

    fn begin(&self) -> (u64, CancellationToken) {
        let token = CancellationToken::new();
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(token.clone()) {
            previous.cancel();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(OperationState::InFlight);
        (generation, token)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(id: u64, name: &str, material: &str, pressure: f64, temperature: f64) -> EquipmentRecord {
        EquipmentRecord {
            id,
            name: name.into(),
            equipment_type: "Pump".into(),
            material: material.into(),
            pressure,
            temperature,
            flowrate: 0.0,
            description: None,
            dataset: None,
        }
    }

    fn sync() -> ListSynchronizer {
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        let client = ApiClient::new(base, &chemviz_api::TransportConfig::default()).unwrap();
        ListSynchronizer::new(Arc::new(client))
    }

    #[test]
    fn materials_are_distinct_in_first_seen_order() {
        let page = Page {
            items: vec![
                record(1, "P1", "Steel", 1.0, 2.0),
                record(2, "P2", "", 1.0, 2.0),
                record(3, "P3", "PVC", 1.0, 2.0),
                record(4, "P4", "Steel", 1.0, 2.0),
                record(5, "P5", " PVC ", 1.0, 2.0),
            ],
            ..Page::default()
        };
        let materials: Vec<_> = page.materials().into_iter().collect();
        assert_eq!(materials, vec!["Steel".to_string(), "PVC".to_string()]);
    }

    #[test]
    fn series_follow_page_order() {
        let page = Page {
            items: vec![
                record(1, "Pump-1", "Steel", 5.2, 110.0),
                record(2, "Valve-1", "PVC", 1.5, 80.0),
            ],
            ..Page::default()
        };
        let series = page.series();
        assert_eq!(series.labels, vec!["Pump-1", "Valve-1"]);
        assert_eq!(series.pressures, vec![5.2, 1.5]);
        assert_eq!(series.temperatures, vec![110.0, 80.0]);
    }

    #[tokio::test]
    async fn paging_without_cursor_is_a_no_op() {
        let list = sync();
        assert_eq!(list.go_next().await.unwrap(), LoadOutcome::NoCursor);
        assert_eq!(list.go_previous().await.unwrap(), LoadOutcome::NoCursor);
        assert_eq!(list.state(), OperationState::Idle);
    }

    #[test]
    fn clear_resets_page_and_state() {
        let list = sync();
        list.page.send_replace(Arc::new(Page {
            items: vec![record(1, "P1", "Steel", 1.0, 2.0)],
            ..Page::default()
        }));
        list.state
            .send_replace(OperationState::Succeeded("Loaded 1 records".into()));

        list.clear();
        assert!(list.page().is_empty());
        assert_eq!(list.state(), OperationState::Idle);
    }

    #[test]
    fn result_arriving_after_clear_is_dropped() {
        let list = sync();
        let (generation, token) = list.begin();
        list.clear();
        assert!(token.is_cancelled());

        let late = Paginated {
            count: Some(1),
            next: None,
            previous: None,
            results: vec![record(1, "P1", "Steel", 1.0, 2.0)],
        };
        assert_eq!(list.settle(generation, Ok(late)).unwrap(), LoadOutcome::Superseded);
        assert!(list.page().is_empty());
        assert_eq!(list.state(), OperationState::Idle);
    }

    #[test]
    fn current_result_is_published() {
        let list = sync();
        let (generation, _) = list.begin();
        let fresh = Paginated {
            count: Some(1),
            next: None,
            previous: None,
            results: vec![record(1, "P1", "Steel", 1.0, 2.0)],
        };
        assert_eq!(list.settle(generation, Ok(fresh)).unwrap(), LoadOutcome::Applied);
        assert_eq!(list.page().items.len(), 1);
        assert!(list.in_flight.lock().unwrap().is_none());
    }

    #[test]
    fn newer_generation_makes_older_stale() {
        let list = sync();
        let (first, first_token) = list.begin();
        let (second, _) = list.begin();
        assert!(first_token.is_cancelled());
        assert!(!list.is_current(first));
        assert!(list.is_current(second));
    }
}
