use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Source of node identifiers. Ids only need to be unique within one
/// workflow; implementations are passed explicitly so tests can inject a
/// deterministic one.
pub trait IdSource {
    fn next_id(&self) -> String;
}

impl<T: IdSource + ?Sized> IdSource for &T {
    fn next_id(&self) -> String {
        (**self).next_id()
    }
}

/// Monotonic counter combined with a millisecond timestamp, e.g.
/// `node_3_1718000000000`. The timestamp only makes ids from separate runs
/// distinguishable; uniqueness comes from the counter.
#[derive(Debug, Default)]
pub struct NodeIdGenerator {
    counter: AtomicU64,
}

impl NodeIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for NodeIdGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("node_{}_{}", n, Utc::now().timestamp_millis())
    }
}

/// Deterministic ids (`<prefix>-1`, `<prefix>-2`, ...).
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", self.prefix, n)
    }
}
