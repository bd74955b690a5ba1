use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use goszakup_client::{ApiClient, ApiError, ReqwestTransport, Transport};
use goszakup_model::{AnalyzeTextRequest, FullAnalysis};
use tokio::sync::watch;
use tracing::debug;

use crate::ResourceState;

/// Imperative analysis of free text.
///
/// Unlike `Resource`, nothing happens until `analyze` is called, and the
/// previous result is cleared as soon as a new analysis starts.
pub struct TextAnalysis<C = ReqwestTransport> {
    client: Arc<ApiClient<C>>,
    generation: AtomicU64,
    state: watch::Sender<ResourceState<FullAnalysis>>,
}

impl<C: Transport> TextAnalysis<C> {
    pub fn new(client: Arc<ApiClient<C>>) -> Self {
        let (state, _) = watch::channel(ResourceState::idle());
        Self {
            client,
            generation: AtomicU64::new(0),
            state,
        }
    }

    /// Analyse `request` and publish the result unless a newer analysis has
    /// started in the meantime. The outcome is returned either way.
    pub async fn analyze(&self, request: &AnalyzeTextRequest) -> Result<Arc<FullAnalysis>, ApiError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(ResourceState {
            data: None,
            loading: true,
            error: None,
        });

        let outcome = self.client.analyze_text(request).await.map(Arc::new);

        // Checked under the channel lock so a newer `analyze` cannot slip in
        // between the check and the write.
        let applied = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = match &outcome {
                Ok(analysis) => ResourceState {
                    data: Some(Arc::clone(analysis)),
                    loading: false,
                    error: None,
                },
                Err(error) => ResourceState {
                    data: None,
                    loading: false,
                    error: Some(error.to_string()),
                },
            };
            true
        });

        if !applied {
            debug!(generation, "Discarding superseded text analysis");
        }
        outcome
    }

    pub fn state(&self) -> ResourceState<FullAnalysis> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResourceState<FullAnalysis>> {
        self.state.subscribe()
    }

    /// Back to idle. Any analysis still running will not publish.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(ResourceState::idle());
    }
}
