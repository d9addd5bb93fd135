//! Maps a [`StrategyKind`] to a constructed strategy.

use std::sync::Arc;

use super::{
    BroadcastStrategy, DebounceStrategy, DelayedStrategy, DispatchStrategy, MulticastStrategy,
    PatternMatchingStrategy, PersistedStrategy, PriorityStrategy, RoundRobinStrategy,
    StatefulStrategy, StatelessStrategy, StrategyKind, ThrottleStrategy, UnicastMode,
    UnicastStrategy,
};
use crate::error::StrategyError;
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::ports::{DurableStore, EventLogger};

/// Builds strategies with the collaborators they need.
#[derive(Clone)]
pub struct StrategyFactory {
    logger: Arc<dyn EventLogger>,
    store: Arc<dyn DurableStore>,
    metrics: Arc<dyn MetricsRecorder>,
    unicast_mode: UnicastMode,
}

impl StrategyFactory {
    pub fn new(logger: Arc<dyn EventLogger>, store: Arc<dyn DurableStore>) -> Self {
        Self {
            logger,
            store,
            metrics: Arc::new(NoOpMetrics),
            unicast_mode: UnicastMode::default(),
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    #[must_use]
    pub fn with_unicast_mode(mut self, mode: UnicastMode) -> Self {
        self.unicast_mode = mode;
        self
    }

    /// Construct a strategy.
    ///
    /// Time-shaped strategies need a running tokio runtime; the persisted
    /// strategy fails if the store cannot be initialized.
    pub fn create(&self, kind: StrategyKind) -> Result<Arc<dyn DispatchStrategy>, StrategyError> {
        let strategy: Arc<dyn DispatchStrategy> = match kind {
            StrategyKind::Stateless => Arc::new(StatelessStrategy::new()),
            StrategyKind::Stateful => Arc::new(StatefulStrategy::new()),
            StrategyKind::Broadcast => Arc::new(BroadcastStrategy::new()),
            StrategyKind::Multicast => Arc::new(MulticastStrategy::new()),
            StrategyKind::Unicast => Arc::new(UnicastStrategy::new(self.unicast_mode)),
            StrategyKind::Priority => Arc::new(PriorityStrategy::new()),
            StrategyKind::PatternMatching => Arc::new(PatternMatchingStrategy::new()),
            StrategyKind::RoundRobin => Arc::new(RoundRobinStrategy::new()),
            StrategyKind::Persisted => Arc::new(PersistedStrategy::new(self.store.clone())?),
            StrategyKind::Debounce => Arc::new(DebounceStrategy::new(self.logger.clone())?),
            StrategyKind::Throttle => Arc::new(
                ThrottleStrategy::new(self.logger.clone())?.with_metrics(self.metrics.clone()),
            ),
            StrategyKind::Delayed => Arc::new(DelayedStrategy::new(self.logger.clone())?),
        };
        Ok(strategy)
    }

    /// Parse an identifier and construct the strategy it names.
    pub fn create_named(&self, name: &str) -> Result<Arc<dyn DispatchStrategy>, StrategyError> {
        self.create(name.parse()?)
    }
}
