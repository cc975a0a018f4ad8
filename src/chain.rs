// src/chain.rs - Condition chains
//
// Purpose:
// --------
// Keeps the back-linked history of alarm and condition observations for one
// data source. Several faults and warnings can be outstanding at once; each
// new observation is appended atop the previous head, and walking back from
// a head yields every observation still reachable from it.
//
// Layout:
// -------
// Every linked observation owns its predecessor through a write-once
// `ChainLink`. A link only ever points at an observation that was linked
// before it, and records its depth (root = 0), so a walk takes at most
// `depth + 1` hops. Walks re-check the depth at every hop and stop with
// `ChainCorrupted` if it does not step down by exactly one.
//
// The chain itself only holds the current head. History that no head
// reaches any more is released as soon as its last outside handle drops.
//
// Concurrency:
// ------------
// Readers walk without locking the chain. Appends take the head lock; the
// ingestion path is expected to append to a given source from one place at
// a time (see `SourceRegistry`).

use crate::data_item::DataItem;
use crate::error::{QuarryError, Result};
use crate::level::Level;
use crate::observation::ObservationRef;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

static NEXT_CHAIN_ID: AtomicU64 = AtomicU64::new(1);

/// Chain membership recorded on an observation
#[derive(Debug)]
pub(crate) struct ChainLink {
    /// Chain the observation was appended to
    pub(crate) chain: u64,
    /// Distance from the root
    pub(crate) depth: usize,
    /// Older observation this one was appended atop
    pub(crate) previous: Option<ObservationRef>,
}

/// Walk from `start` toward the root, visiting each observation once
///
/// An observation that was never appended is a chain of one.
pub(crate) fn walk<F>(start: &ObservationRef, mut visit: F) -> Result<()>
where
    F: FnMut(&ObservationRef) -> ControlFlow<()>,
{
    let mut cursor = start.clone();
    let mut hops = 0usize;

    loop {
        hops += 1;
        if visit(&cursor).is_break() {
            break;
        }

        let link = match cursor.chain_link() {
            Some(link) => link,
            None => break,
        };

        let next = match (&link.previous, link.depth) {
            (None, 0) => break,
            (Some(prev), depth)
                if depth > 0 && prev.chain_link().map(|l| l.depth) == Some(depth - 1) =>
            {
                prev.clone()
            }
            (previous, depth) => {
                return Err(QuarryError::ChainCorrupted {
                    sequence: cursor.sequence(),
                    detail: match previous {
                        Some(prev) => format!(
                            "link at depth {} points at observation {} with depth {:?}",
                            depth,
                            prev.sequence(),
                            prev.chain_link().map(|l| l.depth)
                        ),
                        None => format!("link at depth {} has no predecessor", depth),
                    },
                });
            }
        };
        cursor = next;
    }

    trace!(sequence = start.sequence(), hops, "walked condition chain");
    Ok(())
}

struct ChainInner {
    id: u64,
    data_item: Arc<DataItem>,
    head: RwLock<Option<ObservationRef>>,
}

/// Condition chain of a single alarm or condition data source
///
/// Cloning is cheap and shares the same chain.
///
/// # Examples
///
/// ```rust
/// use quarry::{ConditionChain, DataItem, Observation, ObservationRef};
/// use std::sync::Arc;
///
/// let item = Arc::new(DataItem::condition("coolant"));
/// let chain = ConditionChain::new(item.clone())?;
///
/// let low = ObservationRef::new(Observation::new(item.clone(), 1, "t1", "WARNING|LOW"));
/// let leak = ObservationRef::new(Observation::new(item.clone(), 2, "t2", "FAULT|LEAK"));
/// chain.push(&low)?;
/// chain.push(&leak)?;
///
/// assert_eq!(chain.list(&leak)?.len(), 2);
/// assert_eq!(leak.first()?.sequence(), 1);
/// # Ok::<(), quarry::QuarryError>(())
/// ```
#[derive(Clone)]
pub struct ConditionChain {
    inner: Arc<ChainInner>,
}

impl ConditionChain {
    /// Create an empty chain for an alarm or condition data item
    pub fn new(data_item: Arc<DataItem>) -> Result<Self> {
        if !data_item.is_condition() {
            return Err(QuarryError::NotConditionSource(data_item.id.clone()));
        }
        Ok(Self {
            inner: Arc::new(ChainInner {
                id: NEXT_CHAIN_ID.fetch_add(1, Ordering::Relaxed),
                data_item,
                head: RwLock::new(None),
            }),
        })
    }

    /// Data item whose conditions this chain holds
    pub fn data_item(&self) -> &Arc<DataItem> {
        &self.inner.data_item
    }

    /// Number of observations reachable from the head
    pub fn len(&self) -> usize {
        self.inner
            .head
            .read()
            .as_ref()
            .and_then(|head| head.chain_link().map(|link| link.depth + 1))
            .unwrap_or(0)
    }

    /// True when nothing has been appended yet, or the head was never linked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recently appended observation
    pub fn head(&self) -> Option<ObservationRef> {
        self.inner.head.read().clone()
    }

    /// True when the observation was appended to this chain
    pub fn contains(&self, observation: &ObservationRef) -> bool {
        matches!(observation.chain_link(), Some(link) if link.chain == self.inner.id)
    }

    /// Append atop the current head
    pub fn push(&self, observation: &ObservationRef) -> Result<()> {
        let mut head = self.inner.head.write();
        let previous = head.clone();
        self.append_locked(&mut head, observation, previous)
    }

    /// Append as a new root; older history is released once nothing holds it
    pub fn restart(&self, observation: &ObservationRef) -> Result<()> {
        let mut head = self.inner.head.write();
        self.append_locked(&mut head, observation, None)
    }

    /// Link `observation` to `head` (or to nothing) and make it the chain head
    ///
    /// Each observation can be appended once. `head` must already be linked
    /// into this chain.
    pub fn append_to(
        &self,
        observation: &ObservationRef,
        head: Option<&ObservationRef>,
    ) -> Result<()> {
        let mut current = self.inner.head.write();
        if let Some(head) = head {
            if !self.contains(head) {
                return Err(self.foreign(head));
            }
        }
        self.append_locked(&mut current, observation, head.cloned())
    }

    /// Append atop the current head, replacing any older observation with the
    /// same native code
    ///
    /// When the code is already present, the surviving observations are
    /// copied into a fresh history (oldest first) and `observation` goes on
    /// top, so the chain holds at most one observation per native code.
    /// Holders of the previous head keep walking their own history.
    pub fn supersede(&self, observation: &ObservationRef) -> Result<()> {
        let mut head = self.inner.head.write();
        let current = match head.clone() {
            Some(current) => current,
            None => return self.append_locked(&mut head, observation, None),
        };

        let code = observation.native_code().unwrap_or_default();
        let mut kept = Vec::new();
        let mut replaced = false;
        walk(&current, |obs| {
            if obs.native_code().unwrap_or_default() == code {
                replaced = true;
            } else {
                kept.push(obs.clone());
            }
            ControlFlow::Continue(())
        })?;

        if !replaced {
            return self.append_locked(&mut head, observation, Some(current));
        }

        let mut previous = None;
        for obs in kept.into_iter().rev() {
            let copy = obs.duplicate();
            self.append_locked(&mut head, &copy, previous)?;
            previous = Some(copy);
        }
        debug!(
            sequence = observation.sequence(),
            data_item = %self.inner.data_item.id,
            code,
            "superseded condition"
        );
        self.append_locked(&mut head, observation, previous)
    }

    fn append_locked(
        &self,
        head: &mut Option<ObservationRef>,
        observation: &ObservationRef,
        previous: Option<ObservationRef>,
    ) -> Result<()> {
        if observation.data_item_id() != self.inner.data_item.id {
            return Err(self.foreign(observation));
        }

        let depth = match &previous {
            Some(prev) => match prev.chain_link() {
                Some(link) => link.depth + 1,
                None => return Err(self.foreign(prev)),
            },
            None => 0,
        };
        let previous_sequence = previous.as_ref().map(|p| p.sequence());

        observation.bind_link(ChainLink {
            chain: self.inner.id,
            depth,
            previous,
        })?;
        *head = Some(observation.clone());

        debug!(
            sequence = observation.sequence(),
            data_item = %self.inner.data_item.id,
            depth,
            previous = ?previous_sequence,
            "appended condition link"
        );
        Ok(())
    }

    fn foreign(&self, observation: &ObservationRef) -> QuarryError {
        QuarryError::ForeignLink {
            sequence: observation.sequence(),
            data_item: self.inner.data_item.id.clone(),
        }
    }

    fn check_item(&self, observation: &ObservationRef) -> Result<()> {
        if observation.data_item_id() == self.inner.data_item.id {
            Ok(())
        } else {
            Err(self.foreign(observation))
        }
    }

    /// Predecessor of an observation of this chain's data item
    pub fn previous(&self, observation: &ObservationRef) -> Result<Option<ObservationRef>> {
        self.check_item(observation)?;
        observation.previous()
    }

    /// Oldest observation reachable from `observation`
    pub fn first(&self, observation: &ObservationRef) -> Result<ObservationRef> {
        self.check_item(observation)?;
        observation.first()
    }

    /// Every observation from `observation` back to the root, newest first
    pub fn list(&self, observation: &ObservationRef) -> Result<Vec<ObservationRef>> {
        let mut out = Vec::new();
        self.list_into(observation, &mut out)?;
        Ok(out)
    }

    /// Append the walk from `observation` to `out`, newest first
    pub fn list_into(
        &self,
        observation: &ObservationRef,
        out: &mut Vec<ObservationRef>,
    ) -> Result<()> {
        self.check_item(observation)?;
        walk(observation, |obs| {
            out.push(obs.clone());
            ControlFlow::Continue(())
        })
    }

    /// Outstanding conditions as seen from `observation`
    ///
    /// The newest observation per native code wins and NORMAL ones are
    /// dropped. A NORMAL observation without a native code clears everything
    /// older than itself.
    pub fn active(&self, observation: &ObservationRef) -> Result<Vec<ObservationRef>> {
        self.check_item(observation)?;
        let mut seen: HashSet<String> = HashSet::new();
        let mut active = Vec::new();

        walk(observation, |obs| {
            let code = obs.native_code().unwrap_or_default();
            let normal = obs.level() == Level::Normal;

            if normal && code.is_empty() {
                return ControlFlow::Break(());
            }
            if seen.insert(code.to_string()) && !normal {
                active.push(obs.clone());
            }
            ControlFlow::Continue(())
        })?;

        Ok(active)
    }
}

impl fmt::Debug for ConditionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionChain")
            .field("data_item", &self.inner.data_item.id)
            .field("len", &self.len())
            .field("head", &self.inner.head.read().as_ref().map(|h| h.sequence()))
            .finish()
    }
}
