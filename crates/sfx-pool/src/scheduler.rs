//! Delay scheduling and the auto-return queue
//!
//! Auto-returned transient voices are not released from inside the
//! scheduler callback. The callback only pushes a lease-stamped
//! [`ReturnTicket`] into a lock-free ring buffer, and the pool drains it on
//! its own thread in [`EffectPool::process_returns`](crate::EffectPool::process_returns).
//!
//! ```text
//! ┌──────────────┐  delay(secs, cb)   ┌────────────────┐
//! │  EffectPool  │ ─────────────────► │ DelayScheduler │
//! └──────┬───────┘                    └───────┬────────┘
//!        │ process_returns()                  │ cb() after secs
//!        ▼                                    ▼
//! ┌──────────────┐      rtrb ring     ┌────────────────┐
//! │ReturnReceiver│ ◄───────────────── │  ReturnSender  │
//! └──────────────┘                    └────────────────┘
//! ```

use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::Arc;

use crate::voice::VoiceId;

/// Deferred callback
pub type DelayedCallback = Box<dyn FnOnce() + Send>;

/// Fire-and-forget delayed execution, owned by the host
///
/// There is no cancellation handle; callbacks that outlive their purpose
/// must be harmless.
pub trait DelayScheduler {
    fn delay(&mut self, seconds: f32, on_elapsed: DelayedCallback);
}

// ═══════════════════════════════════════════════════════════════════════════════
// TICK SCHEDULER
// ═══════════════════════════════════════════════════════════════════════════════

/// Absolute slack for accumulated frame deltas
const CLOCK_EPSILON: f64 = 1e-9;

/// Widen an f32 duration onto the f64 clock
///
/// Rounded down by the f32 representation error, so a duration of exactly
/// `dt` has elapsed after one `advance(dt)`.
pub(crate) fn clock_secs(secs: f32) -> f64 {
    let secs = f64::from(secs.max(0.0));
    (secs - secs * f64::from(f32::EPSILON) - CLOCK_EPSILON).max(0.0)
}

struct PendingCallback {
    due: f64,
    seq: u64,
    callback: DelayedCallback,
}

#[derive(Default)]
struct TickState {
    now: f64,
    next_seq: u64,
    pending: Vec<PendingCallback>,
}

/// Frame-driven [`DelayScheduler`]
///
/// Time only moves when the host calls [`advance`](Self::advance), usually
/// once per update with the frame delta. Clones share one queue.
#[derive(Clone, Default)]
pub struct TickScheduler {
    state: Arc<Mutex<TickState>>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance time by `dt` seconds and fire every elapsed callback in due
    /// order. Returns the number fired.
    pub fn advance(&self, dt: f64) -> usize {
        let due = {
            let mut state = self.state.lock();
            state.now += dt.max(0.0);
            let now = state.now;

            let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending)
                .into_iter()
                .partition(|p| p.due <= now);
            state.pending = pending;
            due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)));
            due
        };

        // Lock released: callbacks may schedule again
        let fired = due.len();
        for pending in due {
            (pending.callback)();
        }
        fired
    }

    /// Callbacks not yet fired
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Elapsed scheduler time in seconds
    pub fn now(&self) -> f64 {
        self.state.lock().now
    }
}

impl DelayScheduler for TickScheduler {
    fn delay(&mut self, seconds: f32, on_elapsed: DelayedCallback) {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        let due = state.now + clock_secs(seconds);
        state.pending.push(PendingCallback {
            due,
            seq,
            callback: on_elapsed,
        });
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RETURN QUEUE
// ═══════════════════════════════════════════════════════════════════════════════

/// Request to return a transient voice, valid only for the lease it was
/// issued under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnTicket {
    pub voice: VoiceId,
    pub lease: u64,
}

/// Producer side, cloned into scheduler callbacks
#[derive(Clone)]
pub struct ReturnSender {
    tx: Arc<Mutex<Producer<ReturnTicket>>>,
}

impl ReturnSender {
    /// Queue a ticket. A full queue drops the ticket; the voice then stays
    /// leased until returned manually or reclaimed.
    pub fn send(&self, ticket: ReturnTicket) -> bool {
        let mut tx = self.tx.lock();
        match tx.push(ticket) {
            Ok(()) => true,
            Err(_) => {
                log::warn!(
                    "Return queue full, dropping auto-return for voice {}",
                    ticket.voice
                );
                false
            }
        }
    }
}

/// Consumer side, owned by the pool
pub struct ReturnReceiver {
    rx: Consumer<ReturnTicket>,
}

impl ReturnReceiver {
    /// Pop every queued ticket
    pub fn drain(&mut self) -> Vec<ReturnTicket> {
        let mut tickets = Vec::with_capacity(self.rx.slots());
        while let Ok(ticket) = self.rx.pop() {
            tickets.push(ticket);
        }
        tickets
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Create a bounded return queue
pub fn return_queue(capacity: usize) -> (ReturnSender, ReturnReceiver) {
    let (tx, rx) = RingBuffer::new(capacity.max(1));
    (
        ReturnSender {
            tx: Arc::new(Mutex::new(tx)),
        },
        ReturnReceiver { rx },
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
