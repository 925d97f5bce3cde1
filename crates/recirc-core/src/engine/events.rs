//! Fixed-capacity event log written by the audio path.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::graph::NodeId;
use crate::kernels::KernelFault;

/// Something the control side should hear about after a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    /// A kernel failed or produced non-finite output. Unless the fault is
    /// [`KernelFault::NumericInstability`], the node's output was zeroed for
    /// the block.
    NodeFault {
        /// Node that faulted.
        node: NodeId,
        /// What went wrong.
        fault: KernelFault,
    },
    /// The RMS guard started reducing a channel's level.
    OverloadGuard {
        /// Host channel.
        channel: usize,
        /// Block RMS before reduction.
        rms: f32,
    },
}

/// Bounded event buffer. Pushing past capacity counts the event as dropped
/// instead of growing.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: Vec<EngineEvent>,
    capacity: usize,
    dropped: u64,
}

impl EventLog {
    /// Preallocates room for `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Records an event, or counts it as dropped when full.
    #[inline]
    pub fn push(&mut self, event: EngineEvent) {
        if self.events.len() < self.capacity {
            self.events.push(event);
        } else {
            self.dropped += 1;
        }
    }

    /// Pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` with nothing pending.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total events dropped since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Removes and yields every pending event. Keeps the allocation.
    pub fn drain(&mut self) -> impl Iterator<Item = EngineEvent> + '_ {
        self.events.drain(..)
    }
}
