use std::sync::Arc;

/// A blocking capacity gate consulted before each store round trip.
///
/// Implementations block until the requested permits are granted; the
/// token/permit algorithm behind it is the implementation's business. One
/// shared instance must support concurrent acquisition from many callers.
pub trait RateGate: Send + Sync {
    /// Block until `permits` units of capacity are granted.
    fn acquire(&self, permits: u32);
}

/// A gate that grants everything immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unthrottled;

impl RateGate for Unthrottled {
    fn acquire(&self, _permits: u32) {}
}

/// Optional read and write gates, shared across callers.
#[derive(Clone, Default)]
pub struct ReadWriteGates {
    read: Option<Arc<dyn RateGate>>,
    write: Option<Arc<dyn RateGate>>,
}

impl ReadWriteGates {
    /// Gates for both directions.
    #[must_use]
    pub fn of(read: Arc<dyn RateGate>, write: Arc<dyn RateGate>) -> Self {
        Self {
            read: Some(read),
            write: Some(write),
        }
    }

    /// A read gate only.
    #[must_use]
    pub fn reads(read: Arc<dyn RateGate>) -> Self {
        Self {
            read: Some(read),
            write: None,
        }
    }

    /// A write gate only.
    #[must_use]
    pub fn writes(write: Arc<dyn RateGate>) -> Self {
        Self {
            read: None,
            write: Some(write),
        }
    }

    /// Acquire read capacity, if a read gate is configured.
    pub fn acquire_read(&self, permits: u32) {
        if let Some(gate) = &self.read {
            gate.acquire(permits);
        }
    }

    /// Acquire write capacity, if a write gate is configured.
    pub fn acquire_write(&self, permits: u32) {
        if let Some(gate) = &self.write {
            gate.acquire(permits);
        }
    }
}

impl std::fmt::Debug for ReadWriteGates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadWriteGates")
            .field("read", &self.read.is_some())
            .field("write", &self.write.is_some())
            .finish()
    }
}
