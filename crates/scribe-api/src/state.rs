use std::sync::Arc;

use scribe_persist::ConversationStore;
use scribe_relay::UpstreamClient;

use crate::config::Config;

/// Shared application state passed to all handlers.
///
/// The store and the upstream client are injected as trait objects so tests
/// can substitute fakes; both have process-wide lifetime.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ConversationStore>,
    pub upstream: Arc<dyn UpstreamClient>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn ConversationStore>,
        upstream: Arc<dyn UpstreamClient>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            upstream,
        }
    }
}
