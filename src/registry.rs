// src/registry.rs - Source registry and ingestion path
use crate::{
    chain::ConditionChain,
    codec::Payload,
    config::{Config, RegistryConfig},
    data_item::DataItem,
    error::{QuarryError, Result},
    level::{Level, SeverityPolicy},
    observation::{Observation, ObservationRef},
};
use chrono::{SecondsFormat, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

#[derive(Debug)]
struct Source {
    item: Arc<DataItem>,
    chain: Option<ConditionChain>,
}

/// Thread-safe registry of data sources and their condition chains
///
/// The registry is the ingestion path: it assigns sequence numbers, builds
/// observations and appends condition observations to their source's chain.
/// Ingestion for one source is serialized by the registry entry, so chain
/// appends never race.
///
/// A condition whose native code is already in the chain supersedes the
/// older observation, so a chain holds at most one observation per code.
/// With `reset_on_clear`, a NORMAL without a native code restarts it.
///
/// # Examples
///
/// ```rust
/// use quarry::{DataItem, Level, SourceRegistry};
///
/// let registry = SourceRegistry::default();
/// registry.register(DataItem::condition("logic"))?;
/// registry.register(DataItem::sample("temp"))?;
///
/// let temp = registry.ingest("temp", "2024-01-01T00:00:00Z", "21.5")?;
/// assert_eq!(temp.sequence(), 1);
///
/// registry.ingest("logic", "", "FAULT|E1")?;
/// let head = registry.ingest("logic", "", "WARNING|W7")?;
///
/// let chain = registry.chain("logic").unwrap();
/// assert_eq!(chain.list(&head)?.len(), 2);
/// assert_eq!(head.level(), Level::Warning);
/// # Ok::<(), quarry::QuarryError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Arc<DashMap<String, Source>>,
    last_sequence: Arc<AtomicU64>,
    policy: Arc<SeverityPolicy>,
    reset_on_clear: bool,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new(policy: SeverityPolicy, config: &RegistryConfig) -> Self {
        Self {
            sources: Arc::new(DashMap::new()),
            last_sequence: Arc::new(AtomicU64::new(config.first_sequence.saturating_sub(1))),
            policy: Arc::new(policy),
            reset_on_clear: config.reset_on_clear,
        }
    }

    /// Create a registry populated with the configured data items
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let registry = Self::new(config.severity.clone(), &config.registry);
        for item in &config.data_items {
            registry.register(item.clone())?;
        }
        info!(data_items = registry.len(), "source registry ready");
        Ok(registry)
    }

    /// Register a data item; condition-shaped items get an empty chain
    pub fn register(&self, item: DataItem) -> Result<Arc<DataItem>> {
        let item = Arc::new(item);
        let chain = if item.is_condition() {
            Some(ConditionChain::new(item.clone())?)
        } else {
            None
        };

        match self.sources.entry(item.id.clone()) {
            Entry::Occupied(_) => Err(QuarryError::Config(format!(
                "Data item '{}' is already registered",
                item.id
            ))),
            Entry::Vacant(slot) => {
                debug!(data_item = %item.id, category = %item.category, "registered data item");
                slot.insert(Source {
                    item: item.clone(),
                    chain,
                });
                Ok(item)
            }
        }
    }

    /// Look up a data item
    pub fn data_item(&self, id: &str) -> Option<Arc<DataItem>> {
        self.sources.get(id).map(|s| s.item.clone())
    }

    /// Current condition chain of a source, `None` for scalar or unknown ids
    pub fn chain(&self, id: &str) -> Option<ConditionChain> {
        self.sources.get(id).and_then(|s| s.chain.clone())
    }

    /// Ingest an observation, assigning the next sequence number
    pub fn ingest(&self, id: &str, timestamp: &str, raw: &str) -> Result<ObservationRef> {
        let source = self
            .sources
            .get_mut(id)
            .ok_or_else(|| QuarryError::DataItemNotFound(id.to_string()))?;

        let last = self
            .last_sequence
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| last.checked_add(1))
            .map_err(|last| QuarryError::SequenceExhausted { last })?;
        self.commit(&source, last + 1, timestamp, raw)
    }

    /// Ingest an observation whose sequence number was assigned upstream
    ///
    /// The sequence must be greater than every sequence assigned so far.
    pub fn ingest_with_sequence(
        &self,
        id: &str,
        sequence: u64,
        timestamp: &str,
        raw: &str,
    ) -> Result<ObservationRef> {
        let source = self
            .sources
            .get_mut(id)
            .ok_or_else(|| QuarryError::DataItemNotFound(id.to_string()))?;

        self.last_sequence
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                (sequence > last).then_some(sequence)
            })
            .map_err(|last| QuarryError::SequenceRegression {
                last,
                got: sequence,
            })?;

        self.commit(&source, sequence, timestamp, raw)
    }

    fn commit(
        &self,
        source: &Source,
        sequence: u64,
        timestamp: &str,
        raw: &str,
    ) -> Result<ObservationRef> {
        let timestamp = if timestamp.is_empty() {
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        } else {
            timestamp.to_string()
        };

        let observation = ObservationRef::new(Observation::with_policy(
            source.item.clone(),
            sequence,
            timestamp,
            raw,
            self.policy.clone(),
        ));

        if let Some(chain) = &source.chain {
            if self.reset_on_clear && clears_all(&observation) {
                chain.restart(&observation)?;
                debug!(sequence, data_item = %source.item.id, "condition chain reset");
            } else {
                chain.supersede(&observation)?;
            }
        }

        trace!(sequence, data_item = %source.item.id, "ingested observation");
        Ok(observation)
    }

    /// Last sequence number handed out
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::SeqCst)
    }

    /// Severity policy applied to new observations
    pub fn policy(&self) -> &Arc<SeverityPolicy> {
        &self.policy
    }

    /// Check if a data item is registered
    pub fn exists(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    /// Get the number of registered data items
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Get all registered data item ids
    pub fn ids(&self) -> Vec<String> {
        self.sources.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new(SeverityPolicy::default(), &RegistryConfig::default())
    }
}

/// A NORMAL condition without a native code clears every outstanding one
fn clears_all(observation: &Observation) -> bool {
    observation.level() == Level::Normal
        && matches!(observation.payload(), Payload::Condition(c) if c.native_code.is_empty())
}
