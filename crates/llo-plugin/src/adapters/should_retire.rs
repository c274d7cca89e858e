//! Should Retire Cache Adapter

use crate::error::PortError;
use crate::ports::ShouldRetireCache;
use std::sync::atomic::{AtomicBool, Ordering};

/// Operator-controlled retirement flag.
#[derive(Default)]
pub struct StaticShouldRetireCache {
    should_retire: AtomicBool,
}

impl StaticShouldRetireCache {
    pub fn new(should_retire: bool) -> Self {
        Self {
            should_retire: AtomicBool::new(should_retire),
        }
    }

    pub fn set(&self, should_retire: bool) {
        self.should_retire.store(should_retire, Ordering::SeqCst);
    }
}

impl ShouldRetireCache for StaticShouldRetireCache {
    fn should_retire(&self) -> Result<bool, PortError> {
        Ok(self.should_retire.load(Ordering::SeqCst))
    }
}
