//! Layered journal: a stack of key/value overlays with checkpoint and replay.
//!
//! Every `push` opens a new layer; writes always land in the top layer. Lookups
//! scan from the newest layer down and fall back to a resolver on a total miss.
//! `pop_to` drops whole layers at once, which is how execution bookkeeping is
//! rolled back. `journal` replays all retained writes in the order they were made.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use tracing::trace;

/// Point in the layer stack that can later be returned to with [`Journal::pop_to`].
pub type Revision = usize;

/// Computes the value of a key that was never written.
pub type Resolver<K, V> = Box<dyn Fn(&K) -> Option<V> + Send + Sync>;

struct Layer<K, V> {
    /// Writes in insertion order.
    entries: Vec<(K, V)>,
    /// key -> index of its latest write in `entries`
    latest: HashMap<K, usize>,
}

impl<K: Hash + Eq + Clone, V> Layer<K, V> {
    fn new() -> Self {
        Layer {
            entries: Vec::new(),
            latest: HashMap::new(),
        }
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.latest.get(key).map(|idx| &self.entries[*idx].1)
    }

    fn put(&mut self, key: K, value: V) {
        self.latest.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
    }
}

pub struct Journal<K, V> {
    layers: Vec<Layer<K, V>>,
    resolver: Resolver<K, V>,
}

impl<K, V> Journal<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
{
    /// Creates an empty journal (depth 0). Call [`push`](Self::push) before writing.
    pub fn new<F>(resolver: F) -> Self
    where
        F: Fn(&K) -> Option<V> + Send + Sync + 'static,
    {
        Journal {
            layers: Vec::new(),
            resolver: Box::new(resolver),
        }
    }

    /// Latest value of `key`, or the resolver's default when no retained layer wrote it.
    /// Resolved defaults are not written back.
    pub fn get(&self, key: &K) -> Option<V> {
        for layer in self.layers.iter().rev() {
            if let Some(value) = layer.get(key) {
                return Some(value.clone());
            }
        }
        (self.resolver)(key)
    }

    /// Writes into the top layer.
    ///
    /// # Panics
    /// If the journal has no layer.
    pub fn put(&mut self, key: K, value: V) {
        match self.layers.last_mut() {
            Some(top) => top.put(key, value),
            None => panic!("journal put with no layer pushed (key: {:?})", key),
        }
    }

    /// Opens a new layer and returns the revision that discards it again.
    pub fn push(&mut self) -> Revision {
        let revision = self.layers.len();
        self.layers.push(Layer::new());
        trace!(revision, "journal layer pushed");
        revision
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Drops every layer at or above `revision`, leaving exactly `revision` layers.
    ///
    /// # Panics
    /// If `revision` is greater than the current depth.
    pub fn pop_to(&mut self, revision: Revision) {
        let depth = self.layers.len();
        if revision > depth {
            panic!("invalid journal revision {} (depth:{})", revision, depth);
        }
        self.layers.truncate(revision);
        trace!(revision, dropped = depth - revision, "journal popped");
    }

    /// Visits every retained write, oldest first, until `visit` returns false.
    pub fn journal<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        for layer in &self.layers {
            for (key, value) in &layer.entries {
                if !visit(key, value) {
                    return;
                }
            }
        }
    }
}

impl<K, V> fmt::Debug for Journal<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Journal")
            .field("depth", &self.layers.len())
            .field(
                "entries",
                &self.layers.iter().map(|l| l.entries.len()).sum::<usize>(),
            )
            .finish()
    }
}
