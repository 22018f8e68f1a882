//! Screenshot stream buffer.
//!
//! Holds at most one frame per run: the most recently received one. There is
//! no queue and no rate limiting; frames that arrive faster than a consumer
//! renders are simply overwritten. Frames outlive their run and the
//! connection so a viewer keeps showing the last image until it is cleared.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::{debug, trace};

use playwatch_connection::{HandlerRegistry, Subscription};
use playwatch_protocols::{ExecutionId, FrameRecord};

/// Counters kept by the buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames received.
    pub ingested: u64,
    /// Frames overwritten before being replaced by a newer one.
    pub overwritten: u64,
}

/// Latest screenshot per run.
#[derive(Default)]
pub struct FrameBuffer {
    frames: DashMap<ExecutionId, Arc<FrameRecord>>,
    watchers: DashMap<ExecutionId, HandlerRegistry<Arc<FrameRecord>>>,
    ingested: AtomicU64,
    overwritten: AtomicU64,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a frame, replacing any earlier frame of the same run.
    ///
    /// Subscribers run after the frame is stored and outside any lock. When
    /// two ingests for one run race, their notifications may arrive in
    /// either order; [`FrameBuffer::latest`] is the frame that won.
    pub fn ingest(&self, frame: FrameRecord) -> Arc<FrameRecord> {
        let frame = Arc::new(frame);
        let execution_id = frame.execution_id.clone();

        self.ingested.fetch_add(1, Ordering::Relaxed);
        if self.frames.insert(execution_id.clone(), frame.clone()).is_some() {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        trace!("Frame for {} ({} bytes)", execution_id, frame.len());

        let handlers = self.watchers.get(&execution_id).map(|h| h.clone());
        if let Some(handlers) = handlers {
            handlers.notify(&frame);
        }

        frame
    }

    /// Most recent frame of a run.
    pub fn latest(&self, execution_id: &str) -> Option<Arc<FrameRecord>> {
        self.frames.get(execution_id).map(|f| f.clone())
    }

    /// Be notified of every frame ingested for a run.
    pub fn subscribe<F>(&self, execution_id: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&Arc<FrameRecord>) + Send + Sync + 'static,
    {
        self.watchers
            .entry(execution_id.into())
            .or_default()
            .register(handler)
    }

    /// Drop the frozen frame of a run. Returns whether one was held.
    pub fn clear(&self, execution_id: &str) -> bool {
        let removed = self.frames.remove(execution_id).is_some();
        if removed {
            debug!("Cleared frame for {}", execution_id);
        }
        removed
    }

    /// Drop every held frame.
    pub fn clear_all(&self) {
        self.frames.clear();
        debug!("Cleared all frames");
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            ingested: self.ingested.load(Ordering::Relaxed),
            overwritten: self.overwritten.load(Ordering::Relaxed),
        }
    }
}
