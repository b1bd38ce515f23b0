//! Blank node identifiers for records that do not exist yet.

use std::sync::atomic::{AtomicU64, Ordering};

use quadmap_core::config::BlankNodeStrategy;
use quadmap_core::types::BLANK_PREFIX;

/// Source of fresh blank node identifiers.
///
/// Every returned identifier starts with `_:` and is unique for the
/// lifetime of the generator.
pub trait BlankNodeGenerator: Send + Sync {
    fn next_blank(&self) -> String;
}

/// `_:b1`, `_:b2`, ...
#[derive(Debug, Default)]
pub struct CounterBlankNodes {
    next: AtomicU64,
}

impl CounterBlankNodes {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlankNodeGenerator for CounterBlankNodes {
    fn next_blank(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{BLANK_PREFIX}b{n}")
    }
}

/// `_:<uuid>` from random v4 uuids.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidBlankNodes;

impl BlankNodeGenerator for UuidBlankNodes {
    fn next_blank(&self) -> String {
        format!("{BLANK_PREFIX}{}", uuid::Uuid::new_v4().simple())
    }
}

pub fn generator_for(strategy: BlankNodeStrategy) -> Box<dyn BlankNodeGenerator> {
    match strategy {
        BlankNodeStrategy::Counter => Box::new(CounterBlankNodes::new()),
        BlankNodeStrategy::Uuid => Box::new(UuidBlankNodes),
    }
}

pub fn is_blank(id: &str) -> bool {
    id.starts_with(BLANK_PREFIX)
}
