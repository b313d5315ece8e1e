//! In-memory connection manager for tests.
//!
//! Static and decaying tag values share one per-peer tag table, the way a
//! real connection manager exposes them. Decay is stepped explicitly with
//! [`MemoryConnManager::advance`] rather than by a timer.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use libp2p::PeerId;
use parking_lot::{Mutex, RwLock};
use tracing::trace;
use web_time::Instant;

use crate::decay::{BumpFn, DecayFn, DecayingValue};
use crate::error::ConnMgrError;
use crate::traits::{ConnectionManager, Decayer, DecayingTag};

/// A tag operation observed by [`MemoryConnManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagCall {
    Tag {
        peer: PeerId,
        tag: String,
        value: i64,
    },
    Untag {
        peer: PeerId,
        tag: String,
    },
    Register {
        name: String,
        interval: Duration,
    },
    Bump {
        peer: PeerId,
        tag: String,
        delta: i64,
    },
}

#[derive(Debug, Default)]
struct Shared {
    tags: RwLock<HashMap<PeerId, HashMap<String, i64>>>,
    decaying: RwLock<HashMap<String, Arc<MemoryDecayingTag>>>,
    calls: Mutex<Vec<TagCall>>,
    reject_registrations: AtomicBool,
    reject_tags: AtomicBool,
}

impl Shared {
    fn record(&self, call: TagCall) {
        self.calls.lock().push(call);
    }

    fn check_tags_accepted(&self, peer: &PeerId, tag: &str) -> Result<(), ConnMgrError> {
        if self.reject_tags.load(Ordering::Relaxed) {
            return Err(ConnMgrError::Rejected(format!("tag {tag} on {peer} refused")));
        }
        Ok(())
    }

    fn set_tag(&self, peer: &PeerId, tag: &str, value: i64) {
        self.tags
            .write()
            .entry(*peer)
            .or_default()
            .insert(tag.to_owned(), value);
    }

    fn clear_tag(&self, peer: &PeerId, tag: &str) {
        let mut tags = self.tags.write();
        if let Some(peer_tags) = tags.get_mut(peer) {
            peer_tags.remove(tag);
            if peer_tags.is_empty() {
                tags.remove(peer);
            }
        }
    }
}

/// Recording connection manager with optional decaying tag support.
#[derive(Debug, Clone)]
pub struct MemoryConnManager {
    shared: Arc<Shared>,
    supports_decay: bool,
}

impl Default for MemoryConnManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnManager {
    /// Connection manager with decaying tag support.
    pub fn new() -> Self {
        Self {
            shared: Arc::default(),
            supports_decay: true,
        }
    }

    /// Connection manager that reports no decaying tag support.
    pub fn without_decay() -> Self {
        Self {
            supports_decay: false,
            ..Self::new()
        }
    }

    /// Make every subsequent decaying tag registration fail.
    pub fn reject_registrations(&self, reject: bool) {
        self.shared
            .reject_registrations
            .store(reject, Ordering::Relaxed);
    }

    /// Make every subsequent static tag or untag call fail. Calls are still recorded.
    pub fn reject_tags(&self, reject: bool) {
        self.shared.reject_tags.store(reject, Ordering::Relaxed);
    }

    pub fn tag_value(&self, peer: &PeerId, tag: &str) -> Option<i64> {
        self.shared
            .tags
            .read()
            .get(peer)
            .and_then(|tags| tags.get(tag).copied())
    }

    pub fn peer_tags(&self, peer: &PeerId) -> HashMap<String, i64> {
        self.shared
            .tags
            .read()
            .get(peer)
            .cloned()
            .unwrap_or_default()
    }

    /// Sum of all tag values on `peer`, the figure a trimming pass would rank by.
    pub fn peer_value(&self, peer: &PeerId) -> i64 {
        self.peer_tags(peer).values().sum()
    }

    pub fn calls(&self) -> Vec<TagCall> {
        self.shared.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.shared.calls.lock().clear();
    }

    /// Names of registered, unclosed decaying tags, sorted.
    pub fn registered_tags(&self) -> Vec<String> {
        let mut names: Vec<_> = self.shared.decaying.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Run `intervals` decay steps over every registered decaying tag.
    pub fn advance(&self, intervals: usize) {
        let tags: Vec<_> = self.shared.decaying.read().values().cloned().collect();
        for _ in 0..intervals {
            for tag in &tags {
                tag.decay_step();
            }
        }
    }
}

impl ConnectionManager for MemoryConnManager {
    fn tag_peer(&self, peer: &PeerId, tag: &str, value: i64) -> Result<(), ConnMgrError> {
        self.shared.record(TagCall::Tag {
            peer: *peer,
            tag: tag.to_owned(),
            value,
        });
        self.shared.check_tags_accepted(peer, tag)?;
        self.shared.set_tag(peer, tag, value);
        Ok(())
    }

    fn untag_peer(&self, peer: &PeerId, tag: &str) -> Result<(), ConnMgrError> {
        self.shared.record(TagCall::Untag {
            peer: *peer,
            tag: tag.to_owned(),
        });
        self.shared.check_tags_accepted(peer, tag)?;
        self.shared.clear_tag(peer, tag);
        Ok(())
    }

    fn decayer(&self) -> Option<Arc<dyn Decayer>> {
        if !self.supports_decay {
            return None;
        }
        Some(Arc::new(MemoryDecayer {
            shared: Arc::clone(&self.shared),
        }))
    }
}

#[derive(Debug)]
struct MemoryDecayer {
    shared: Arc<Shared>,
}

impl Decayer for MemoryDecayer {
    fn register_decaying_tag(
        &self,
        name: &str,
        interval: Duration,
        decay: DecayFn,
        bump: BumpFn,
    ) -> Result<Arc<dyn DecayingTag>, ConnMgrError> {
        if self.shared.reject_registrations.load(Ordering::Relaxed) {
            return Err(ConnMgrError::Rejected(format!(
                "registration of {name} refused"
            )));
        }

        let mut decaying = self.shared.decaying.write();
        if decaying.contains_key(name) {
            return Err(ConnMgrError::DuplicateTag(name.to_owned()));
        }

        let tag = Arc::new(MemoryDecayingTag {
            name: name.to_owned(),
            interval,
            decay,
            bump,
            values: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            shared: Arc::clone(&self.shared),
        });
        decaying.insert(name.to_owned(), Arc::clone(&tag));
        drop(decaying);

        self.shared.record(TagCall::Register {
            name: name.to_owned(),
            interval,
        });
        Ok(tag)
    }
}

struct MemoryDecayingTag {
    name: String,
    interval: Duration,
    decay: DecayFn,
    bump: BumpFn,
    values: Mutex<HashMap<PeerId, DecayingValue>>,
    closed: AtomicBool,
    shared: Arc<Shared>,
}

impl fmt::Debug for MemoryDecayingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDecayingTag")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl MemoryDecayingTag {
    fn ensure_open(&self) -> Result<(), ConnMgrError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConnMgrError::TagClosed(self.name.clone()));
        }
        Ok(())
    }

    fn decay_step(&self) {
        let now = Instant::now();
        let mut values = self.values.lock();
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        values.retain(|peer, value| match (self.decay)(&*value) {
            Some(next) => {
                value.value = next;
                value.last_visit = now;
                self.shared.set_tag(peer, &self.name, next);
                true
            }
            None => {
                trace!(tag = %self.name, %peer, "decaying tag value expired");
                self.shared.clear_tag(peer, &self.name);
                false
            }
        });
    }
}

impl DecayingTag for MemoryDecayingTag {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn bump(&self, peer: &PeerId, delta: i64) -> Result<(), ConnMgrError> {
        // Checked under the values lock; `close` sets the flag before draining values.
        let mut values = self.values.lock();
        self.ensure_open()?;
        self.shared.record(TagCall::Bump {
            peer: *peer,
            tag: self.name.clone(),
            delta,
        });

        let value = values
            .entry(*peer)
            .or_insert_with(|| DecayingValue::new(self.name.clone(), *peer));
        value.value = (self.bump)(&*value, delta);
        value.last_visit = Instant::now();
        self.shared.set_tag(peer, &self.name, value.value);
        Ok(())
    }

    fn remove(&self, peer: &PeerId) -> Result<(), ConnMgrError> {
        let mut values = self.values.lock();
        self.ensure_open()?;
        values.remove(peer);
        self.shared.clear_tag(peer, &self.name);
        Ok(())
    }

    fn close(&self) -> Result<(), ConnMgrError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(ConnMgrError::TagClosed(self.name.clone()));
        }
        self.shared.decaying.write().remove(&self.name);
        let values = std::mem::take(&mut *self.values.lock());
        for peer in values.keys() {
            self.shared.clear_tag(peer, &self.name);
        }
        Ok(())
    }
}
