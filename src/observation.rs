// src/observation.rs - Observation records and shared handles
//
// Purpose:
// --------
// An `Observation` is one reported value of a data source at a given
// sequence and time. Records are immutable once published; derived state
// (decoded payload, level, attribute map) is computed on first access and
// cached for the rest of the record's life.
//
// Interactions:
// -------------
// - Uses: DataItem (catalog back-reference), codec.rs for decoding,
//   SeverityPolicy from level.rs for classification
// - Used by: chain.rs (links hold the predecessor `ObservationRef`), registry.rs
//   (ingestion), buffer and serializer collaborators through `ObservationRef`
//
// Key Responsibilities:
// ---------------------
// 1. Holding the committed scalar fields (source, sequence, time, raw text)
// 2. Compute-once caches safe under concurrent first access (`OnceLock`)
// 3. Shared ownership through `ObservationRef`; the record is released when
//    the last handle drops
// 4. Write-once chain link to the predecessor, filled by `ConditionChain`,
//    and walks toward the root from any held record

use crate::chain::{self, ChainLink};
use crate::codec::{self, Payload};
use crate::data_item::DataItem;
use crate::error::{QuarryError, Result};
use crate::level::{Level, SeverityPolicy};
use crate::value::Value;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{ControlFlow, Deref};
use std::sync::{Arc, OnceLock, Weak};
use tracing::trace;

/// Attribute name to value mapping handed to serializers
pub type Attributes = BTreeMap<String, String>;

/// Derived state computed from the raw value
#[derive(Debug, Clone)]
struct Decoded {
    payload: Payload,
    value: Value,
    level: Level,
}

/// A single observation of a data source
///
/// # Examples
///
/// ```rust
/// use quarry::{DataItem, Level, Observation};
/// use std::sync::Arc;
///
/// let item = Arc::new(DataItem::condition("spindle_temp"));
/// let obs = Observation::new(item, 7, "2024-01-01T00:00:00Z", "WARNING|OVERTEMP");
///
/// assert_eq!(obs.sequence(), 7);
/// assert_eq!(obs.level(), Level::Warning);
/// assert_eq!(obs.attributes()["nativeCode"], "OVERTEMP");
/// ```
#[derive(Debug)]
pub struct Observation {
    data_item: Arc<DataItem>,
    sequence: u64,
    timestamp: String,
    raw: String,
    policy: Arc<SeverityPolicy>,
    decoded: OnceLock<Decoded>,
    attributes: OnceLock<Attributes>,
    link: OnceLock<ChainLink>,
}

impl Observation {
    /// Create an observation classified with the default severity policy
    pub fn new(
        data_item: Arc<DataItem>,
        sequence: u64,
        timestamp: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        Self::with_policy(data_item, sequence, timestamp, raw, SeverityPolicy::shared_default())
    }

    /// Create an observation classified with the given severity policy
    pub fn with_policy(
        data_item: Arc<DataItem>,
        sequence: u64,
        timestamp: impl Into<String>,
        raw: impl Into<String>,
        policy: Arc<SeverityPolicy>,
    ) -> Self {
        let obs = Self {
            data_item,
            sequence,
            timestamp: timestamp.into(),
            raw: raw.into(),
            policy,
            decoded: OnceLock::new(),
            attributes: OnceLock::new(),
            link: OnceLock::new(),
        };
        trace!(sequence, data_item = %obs.data_item.id, "observation created");
        obs
    }

    /// Data item this observation belongs to
    pub fn data_item(&self) -> &Arc<DataItem> {
        &self.data_item
    }

    /// Identifier of the owning data item
    pub fn data_item_id(&self) -> &str {
        &self.data_item.id
    }

    /// Agent-wide sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Timestamp as received
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Timestamp parsed as RFC 3339, if it is one
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Value text as received from the adapter
    pub fn raw_value(&self) -> &str {
        &self.raw
    }

    fn decoded(&self) -> &Decoded {
        self.decoded.get_or_init(|| {
            let payload = codec::decode(&self.raw, &self.data_item);
            let value = codec::value_view(&payload, &self.raw);
            let level = self.policy.classify(&payload);
            Decoded {
                payload,
                value,
                level,
            }
        })
    }

    /// Structured payload decoded from the raw value
    pub fn payload(&self) -> &Payload {
        &self.decoded().payload
    }

    /// Decoded value, normalized into agent units for samples
    pub fn value(&self) -> &Value {
        &self.decoded().value
    }

    /// Severity level; always NORMAL for samples and events
    pub fn level(&self) -> Level {
        self.decoded().level
    }

    /// Severity level spelled for the wire
    pub fn level_str(&self) -> &'static str {
        self.level().as_str()
    }

    /// Native code of an alarm or condition observation
    pub fn native_code(&self) -> Option<&str> {
        self.payload().native_code()
    }

    /// Attribute map for serializers, built once on first request
    pub fn attributes(&self) -> &Attributes {
        self.attributes.get_or_init(|| self.project())
    }

    /// Attribute map rendered as a JSON object
    pub fn attributes_json(&self) -> Result<String> {
        serde_json::to_string(self.attributes()).map_err(QuarryError::from)
    }

    fn project(&self) -> Attributes {
        let item = &self.data_item;
        let mut attrs = Attributes::new();
        let mut put = |name: &str, value: &str| {
            attrs.insert(name.to_string(), value.to_string());
        };

        put("dataItemId", &item.id);
        if let Some(name) = &item.name {
            put("name", name);
        }
        put("sequence", &self.sequence.to_string());
        put("timestamp", &self.timestamp);
        put("level", self.level_str());
        put("value", &self.value().to_string());

        match self.payload() {
            Payload::Scalar(_) => {
                if let Some(sub_type) = &item.sub_type {
                    put("subType", sub_type);
                }
            }
            Payload::Alarm(alarm) => {
                put("code", &alarm.code);
                put("nativeCode", &alarm.native_code);
                put("severity", &alarm.severity);
                put("state", &alarm.state);
            }
            Payload::Condition(condition) => {
                put("nativeCode", &condition.native_code);
                put("severity", &condition.severity);
                let sub_type = match (&condition.sub_type, &item.sub_type) {
                    (own, _) if !own.is_empty() => own.as_str(),
                    (_, Some(catalog)) => catalog.as_str(),
                    _ => "",
                };
                put("subType", sub_type);
            }
        }

        attrs
    }

    /// True once the observation was appended to a condition chain
    pub fn is_linked(&self) -> bool {
        self.link.get().is_some()
    }

    pub(crate) fn chain_link(&self) -> Option<&ChainLink> {
        self.link.get()
    }

    /// Record chain membership; a record joins at most one chain, once
    pub(crate) fn bind_link(&self, link: ChainLink) -> Result<()> {
        self.link.set(link).map_err(|_| QuarryError::AlreadyLinked {
            sequence: self.sequence,
        })
    }
}

/// Copies the committed fields and any derived state already computed.
/// The copy is not linked into a chain; append it explicitly to make it a
/// new head over the original.
impl Clone for Observation {
    fn clone(&self) -> Self {
        Self {
            data_item: Arc::clone(&self.data_item),
            sequence: self.sequence,
            timestamp: self.timestamp.clone(),
            raw: self.raw.clone(),
            policy: Arc::clone(&self.policy),
            decoded: self.decoded.clone(),
            attributes: self.attributes.clone(),
            link: OnceLock::new(),
        }
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        trace!(sequence = self.sequence, "observation released");

        // Release predecessors one at a time so long chains do not recurse
        let mut next = self.link.take().and_then(|link| link.previous);
        while let Some(previous) = next {
            match Arc::try_unwrap(previous.0) {
                Ok(mut observation) => {
                    next = observation.link.take().and_then(|link| link.previous);
                }
                Err(_) => break,
            }
        }
    }
}

/// Shared handle to an [`Observation`]
///
/// Buffer slots, chain links and client iterators each hold one. Cloning
/// takes another reference; the record is freed when the last handle is
/// dropped. Use `Option<ObservationRef>` for a slot that may be empty.
#[derive(Clone)]
pub struct ObservationRef(Arc<Observation>);

impl ObservationRef {
    /// Take ownership of a freshly built observation
    pub fn new(observation: Observation) -> Self {
        Self(Arc::new(observation))
    }

    /// Number of live handles to the record
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// True when both handles point at the same record
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Non-owning handle that does not keep the record alive
    pub fn downgrade(&self) -> WeakObservation {
        WeakObservation(Arc::downgrade(&self.0))
    }

    /// Independent, unlinked copy of the record behind a new handle
    pub fn duplicate(&self) -> Self {
        Self::new(Observation::clone(&self.0))
    }

    /// Observation this one was appended atop, `None` for a root or an
    /// unlinked record
    pub fn previous(&self) -> Result<Option<ObservationRef>> {
        let mut previous = None;
        let mut visited = 0;
        chain::walk(self, |obs| {
            visited += 1;
            if visited == 2 {
                previous = Some(obs.clone());
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;
        Ok(previous)
    }

    /// Oldest observation reachable from this one
    pub fn first(&self) -> Result<ObservationRef> {
        let mut root = self.clone();
        chain::walk(self, |obs| {
            root = obs.clone();
            ControlFlow::Continue(())
        })?;
        Ok(root)
    }

    /// This observation and every predecessor, newest first
    ///
    /// The history is owned by the records themselves, so the walk works
    /// after the source's chain has moved on.
    pub fn list(&self) -> Result<Vec<ObservationRef>> {
        let mut out = Vec::new();
        chain::walk(self, |obs| {
            out.push(obs.clone());
            ControlFlow::Continue(())
        })?;
        Ok(out)
    }
}

impl Deref for ObservationRef {
    type Target = Observation;

    fn deref(&self) -> &Observation {
        &self.0
    }
}

impl From<Observation> for ObservationRef {
    fn from(observation: Observation) -> Self {
        Self::new(observation)
    }
}

/// Adopts an existing reference without taking another one
impl From<Arc<Observation>> for ObservationRef {
    fn from(observation: Arc<Observation>) -> Self {
        Self(observation)
    }
}

impl fmt::Debug for ObservationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationRef")
            .field("sequence", &self.0.sequence)
            .field("data_item", &self.0.data_item.id)
            .field("refs", &self.ref_count())
            .finish()
    }
}

/// Weak counterpart of [`ObservationRef`]
#[derive(Debug, Clone)]
pub struct WeakObservation(Weak<Observation>);

impl WeakObservation {
    /// Get a strong handle if the record is still alive
    pub fn upgrade(&self) -> Option<ObservationRef> {
        self.0.upgrade().map(ObservationRef)
    }

    /// True once every strong handle has been dropped
    pub fn is_released(&self) -> bool {
        self.0.strong_count() == 0
    }
}
