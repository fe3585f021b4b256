//! Two-phase readiness barrier and the per-channel ready-callback queue.
//!
//! The transport layer and the type-registry layer come up independently and
//! in either order. Each sets its own monotonic flag; the barrier is open once
//! both are set and never closes again. Callbacks registered before that are
//! queued per channel and handed back, in registration order, when the owner
//! flushes the channel that completed initialisation. Callbacks queued under
//! any other channel name stay queued forever.

use std::collections::HashMap;

use log::debug;
use smallvec::SmallVec;

/// Which initialisation layer raised a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Transport,
    Registry,
}

/// Effect of one signal on the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The flag was already set.
    Unchanged,
    /// The flag is now set; the other layer is still pending.
    Signalled,
    /// This signal completed the pair; the barrier is now open.
    BarrierOpened,
}

/// Callbacks waiting on one channel.
pub type PendingQueue<C> = SmallVec<[C; 4]>;

#[derive(Debug)]
pub struct ReadinessTracker<C> {
    transport_ready: bool,
    registry_ready: bool,
    pending: HashMap<String, PendingQueue<C>>,
}

impl<C> Default for ReadinessTracker<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ReadinessTracker<C> {
    pub fn new() -> Self {
        Self {
            transport_ready: false,
            registry_ready: false,
            pending: HashMap::new(),
        }
    }

    pub fn signal_transport_ready(&mut self) -> Transition {
        self.signal(Layer::Transport)
    }

    pub fn signal_registry_ready(&mut self) -> Transition {
        self.signal(Layer::Registry)
    }

    pub fn signal(&mut self, layer: Layer) -> Transition {
        let flag = match layer {
            Layer::Transport => &mut self.transport_ready,
            Layer::Registry => &mut self.registry_ready,
        };
        if *flag {
            return Transition::Unchanged;
        }
        *flag = true;

        if self.is_barrier_open() {
            debug!("readiness: {layer:?} ready, barrier open");
            Transition::BarrierOpened
        } else {
            debug!("readiness: {layer:?} ready, waiting on the other layer");
            Transition::Signalled
        }
    }

    pub fn is_transport_ready(&self) -> bool {
        self.transport_ready
    }

    pub fn is_registry_ready(&self) -> bool {
        self.registry_ready
    }

    pub fn is_barrier_open(&self) -> bool {
        self.transport_ready && self.registry_ready
    }

    /// Queues `callback` on `channel` while the barrier is closed.
    ///
    /// Once the barrier is open the callback is handed straight back and the
    /// caller must run it immediately.
    #[must_use = "a returned callback must be run now"]
    pub fn on_barrier_open(&mut self, channel: &str, callback: C) -> Option<C> {
        if self.is_barrier_open() {
            return Some(callback);
        }
        self.pending
            .entry(channel.to_owned())
            .or_default()
            .push(callback);
        None
    }

    /// Removes and returns the callbacks queued on `channel`.
    ///
    /// Nothing is released while the barrier is still closed.
    pub fn take_pending(&mut self, channel: &str) -> PendingQueue<C> {
        if !self.is_barrier_open() {
            return PendingQueue::new();
        }
        self.pending.remove(channel).unwrap_or_default()
    }

    pub fn pending_len(&self, channel: &str) -> usize {
        self.pending.get(channel).map_or(0, |queue| queue.len())
    }
}

impl<C: FnOnce()> ReadinessTracker<C> {
    /// Registers `callback`, running it synchronously if the barrier is open.
    pub fn on_barrier_open_run(&mut self, channel: &str, callback: C) {
        if let Some(callback) = self.on_barrier_open(channel, callback) {
            callback();
        }
    }

    /// Runs every callback queued on `channel`; returns how many ran.
    pub fn flush(&mut self, channel: &str) -> usize {
        let batch = self.take_pending(channel);
        let ran = batch.len();
        for callback in batch {
            callback();
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<&'static str>>>;
    type Cb = Box<dyn FnOnce()>;

    fn record(log: &Log, label: &'static str) -> Cb {
        let log = Rc::clone(log);
        Box::new(move || log.borrow_mut().push(label))
    }

    #[test]
    fn either_order_opens_once() {
        for transport_first in [true, false] {
            let mut tracker = ReadinessTracker::<Cb>::new();
            let (first, second) = if transport_first {
                (Layer::Transport, Layer::Registry)
            } else {
                (Layer::Registry, Layer::Transport)
            };
            assert_eq!(tracker.signal(first), Transition::Signalled);
            assert!(!tracker.is_barrier_open());
            assert_eq!(tracker.signal(first), Transition::Unchanged);
            assert_eq!(tracker.signal(second), Transition::BarrierOpened);
            assert!(tracker.is_barrier_open());
            assert_eq!(tracker.signal(second), Transition::Unchanged);
            assert_eq!(tracker.signal(first), Transition::Unchanged);
            assert!(tracker.is_barrier_open());
        }
    }

    #[test]
    fn queued_callbacks_flush_in_order_once() {
        let log = Log::default();
        let mut tracker = ReadinessTracker::<Cb>::new();
        tracker.on_barrier_open_run("flash", record(&log, "a"));
        tracker.on_barrier_open_run("flash", record(&log, "b"));
        tracker.signal_transport_ready();
        assert_eq!(tracker.flush("flash"), 0, "closed barrier releases nothing");
        assert!(log.borrow().is_empty());

        tracker.signal_registry_ready();
        assert_eq!(tracker.flush("flash"), 2);
        assert_eq!(*log.borrow(), ["a", "b"]);
        assert_eq!(tracker.flush("flash"), 0);
        assert_eq!(*log.borrow(), ["a", "b"]);
    }

    #[test]
    fn late_callback_runs_immediately() {
        let log = Log::default();
        let mut tracker = ReadinessTracker::<Cb>::new();
        tracker.signal_registry_ready();
        tracker.signal_transport_ready();
        tracker.on_barrier_open_run("anything", record(&log, "late"));
        assert_eq!(*log.borrow(), ["late"]);
        assert_eq!(tracker.pending_len("anything"), 0);
    }

    #[test]
    fn other_channels_stay_inert() {
        let log = Log::default();
        let mut tracker = ReadinessTracker::<Cb>::new();
        tracker.on_barrier_open_run("flash", record(&log, "flash"));
        tracker.on_barrier_open_run("typo", record(&log, "typo"));
        tracker.signal_transport_ready();
        tracker.signal_registry_ready();
        tracker.flush("flash");
        assert_eq!(*log.borrow(), ["flash"]);
        assert_eq!(tracker.pending_len("typo"), 1);
    }
}
