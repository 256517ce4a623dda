// ── Dataset catalog ──
//
// The full (non-paginated) list of recent uploads, refreshed after every
// successful upload. A failed refresh keeps the previous list. As with
// the listing, only the newest refresh may publish, and `clear` makes
// every refresh still in flight stale.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chemviz_api::{ApiClient, DatasetSummary};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::CoreError;

pub struct DatasetCatalog {
    client: Arc<ApiClient>,
    generation: AtomicU64,
    datasets: watch::Sender<Arc<Vec<DatasetSummary>>>,
}

impl DatasetCatalog {
    pub fn new(client: Arc<ApiClient>) -> Self {
        let (datasets, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            client,
            generation: AtomicU64::new(0),
            datasets,
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<DatasetSummary>> {
        Arc::clone(&self.datasets.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<DatasetSummary>>> {
        self.datasets.subscribe()
    }

    /// Fetch the list and publish it unless a newer refresh or a `clear`
    /// happened meanwhile. A dropped result still comes back to the caller.
    pub async fn refresh(&self) -> Result<Arc<Vec<DatasetSummary>>, CoreError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        match self.client.list_datasets().await {
            Ok(list) => {
                let list = Arc::new(list);
                if self.publish(generation, &list) {
                    debug!(count = list.len(), "datasets refreshed");
                } else {
                    debug!(generation, "discarding stale dataset list");
                }
                Ok(list)
            }
            Err(e) => {
                let err = CoreError::from(e);
                warn!(error = %err, "dataset refresh failed");
                Err(err)
            }
        }
    }

    /// Aggregates for one dataset, straight from the server.
    pub async fn summary(&self, id: u64) -> Result<DatasetSummary, CoreError> {
        Ok(self.client.dataset_summary(id).await?)
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.datasets.send_replace(Arc::new(Vec::new()));
    }

    // The generation check runs under the channel's write lock, so a
    // `clear` either lands before it (and wins) or publishes after it.
    fn publish(&self, generation: u64, list: &Arc<Vec<DatasetSummary>>) -> bool {
        self.datasets.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *current = Arc::clone(list);
            true
        })
    }
}
