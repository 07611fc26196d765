//! Lock-free handoff of large, fully-built objects to the audio thread.
//!
//! A loader thread builds a replacement (a wavetable bank, a grain source)
//! completely, then publishes it. The audio thread installs it with a pointer
//! swap between samples and sends the retired object back, so neither
//! allocation nor deallocation ever happens on the audio thread.
//!
//! ```text
//!   loader                                  audio
//!   ──────                                  ─────
//!   begin()      ready = false ──────────▶  is_ready()? no → silence
//!   build Box<T>
//!   publish() ──── [ pending queue ] ─────▶ poll(): swap into slot
//!                                           ready = true (Release)
//!   collect() ◀─── [ retired queue ] ────── old Box<T>
//!   drop old
//! ```
//!
//! Both queues are `rtrb` SPSC ring buffers with equal capacity. The
//! publisher refuses to publish while `pending + retired` would reach that
//! capacity, so the audio side can always retire what it installs.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{debug, warn};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::{LoadError, LoadResult};

/// A published object plus the slot index it replaces.
pub struct Parcel<T> {
    pub slot: usize,
    pub value: Box<T>,
}

/// Loader-side end of a handoff.
pub struct Publisher<T> {
    pending: Producer<Parcel<T>>,
    retired: Consumer<Parcel<T>>,
    ready: Arc<AtomicBool>,
    capacity: usize,
}

/// Audio-side end of a handoff.
pub struct Receiver<T> {
    pending: Consumer<Parcel<T>>,
    retired: Producer<Parcel<T>>,
    ready: Arc<AtomicBool>,
}

/// Create a connected publisher/receiver pair.
///
/// `capacity` bounds how many replacements may be in flight at once.
pub fn channel<T>(capacity: usize) -> (Publisher<T>, Receiver<T>) {
    let capacity = capacity.max(1);
    let (pending_tx, pending_rx) = RingBuffer::new(capacity);
    let (retired_tx, retired_rx) = RingBuffer::new(capacity);
    let ready = Arc::new(AtomicBool::new(true));

    (
        Publisher {
            pending: pending_tx,
            retired: retired_rx,
            ready: Arc::clone(&ready),
            capacity,
        },
        Receiver {
            pending: pending_rx,
            retired: retired_tx,
            ready,
        },
    )
}

impl<T> Publisher<T> {
    /// Mark the target as not ready. Readers emit silence until the next
    /// install or [`Publisher::abort`].
    pub fn begin(&self) {
        self.ready.store(false, Ordering::Release);
    }

    /// Give up on a load started with [`Publisher::begin`].
    pub fn abort(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Queue a fully-built replacement for `slot`.
    pub fn publish(&mut self, slot: usize, value: Box<T>) -> LoadResult {
        self.collect();

        let in_flight = (self.capacity - self.pending.slots()) + self.retired.slots();
        if in_flight >= self.capacity {
            warn!("handoff queue full, dropping replacement for slot {slot}");
            self.abort();
            return Err(LoadError::QueueFull);
        }

        match self.pending.push(Parcel { slot, value }) {
            Ok(()) => Ok(()),
            Err(_) => {
                self.abort();
                Err(LoadError::QueueFull)
            }
        }
    }

    /// Drop objects the audio thread has retired. Returns how many were freed.
    pub fn collect(&mut self) -> usize {
        let mut freed = 0;
        while let Ok(parcel) = self.retired.pop() {
            debug!("reclaimed retired object from slot {}", parcel.slot);
            drop(parcel);
            freed += 1;
        }
        freed
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

impl<T> Receiver<T> {
    /// Install at most one pending replacement into `slots`.
    ///
    /// Realtime-safe: a pointer swap and two queue operations. Returns the
    /// slot index that changed, if any.
    pub fn poll(&mut self, slots: &mut [Box<T>]) -> Option<usize> {
        if self.retired.slots() == 0 {
            return None;
        }

        let mut parcel = self.pending.pop().ok()?;
        let slot = parcel.slot;
        match slots.get_mut(slot) {
            Some(current) => std::mem::swap(current, &mut parcel.value),
            None => {
                // Unknown slot: hand the object straight back untouched.
                let _ = self.retired.push(parcel);
                self.ready.store(true, Ordering::Release);
                return None;
            }
        }
        let _ = self.retired.push(parcel);
        self.ready.store(true, Ordering::Release);
        Some(slot)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_swaps_whole_object() {
        let (mut tx, mut rx) = channel::<Vec<u32>>(2);
        let mut slots = vec![Box::new(vec![1, 1, 1])];

        tx.begin();
        assert!(!rx.is_ready());
        tx.publish(0, Box::new(vec![2, 2, 2])).unwrap();

        assert_eq!(rx.poll(&mut slots), Some(0));
        assert!(rx.is_ready());
        assert_eq!(*slots[0], vec![2, 2, 2]);

        assert_eq!(tx.collect(), 1);
    }

    #[test]
    fn poll_without_pending_is_noop() {
        let (_tx, mut rx) = channel::<u32>(1);
        let mut slots = vec![Box::new(7)];
        assert_eq!(rx.poll(&mut slots), None);
        assert_eq!(*slots[0], 7);
    }

    #[test]
    fn abort_restores_ready() {
        let (tx, rx) = channel::<u32>(1);
        tx.begin();
        assert!(!rx.is_ready());
        tx.abort();
        assert!(rx.is_ready());
    }

    #[test]
    fn publish_refuses_when_in_flight_reaches_capacity() {
        let (mut tx, _rx) = channel::<u32>(1);
        tx.publish(0, Box::new(1)).unwrap();
        assert!(matches!(
            tx.publish(0, Box::new(2)),
            Err(LoadError::QueueFull)
        ));
        assert!(tx.is_ready());
    }

    #[test]
    fn out_of_range_slot_is_returned() {
        let (mut tx, mut rx) = channel::<u32>(2);
        let mut slots = vec![Box::new(0)];
        tx.publish(5, Box::new(9)).unwrap();
        assert_eq!(rx.poll(&mut slots), None);
        assert_eq!(*slots[0], 0);
        assert_eq!(tx.collect(), 1);
    }
}
