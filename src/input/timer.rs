//! Cancellable deferred-task slot
//!
//! A [`TimerSlot`] holds at most one pending callback. Scheduling a new one
//! cancels whatever was pending before. Clones share the same slot, and
//! [`TimerSlot::global`] hands out the single process-wide slot.
//!
//! ```text
//! schedule(a) ──► [pending a] ──schedule(b)──► [pending b] ──400ms──► b fires
//!                      │
//!                      └──► a cancelled
//! ```

use super::error::InputError;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

static GLOBAL_SLOT: OnceLock<TimerSlot> = OnceLock::new();

#[derive(Debug)]
struct PendingTask {
    generation: u64,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct SlotState {
    next_generation: u64,
    pending: Option<PendingTask>,
}

/// Shared handle to a single deferred-callback slot
#[derive(Clone, Debug)]
pub struct TimerSlot {
    state: Arc<Mutex<SlotState>>,
    pending_tx: Arc<watch::Sender<bool>>,
}

impl Default for TimerSlot {
    fn default() -> Self {
        let (pending_tx, _) = watch::channel(false);
        Self {
            state: Arc::default(),
            pending_tx: Arc::new(pending_tx),
        }
    }
}

/// Releases the slot entry of a timer task that is dropped without firing,
/// e.g. when its runtime shuts down.
struct ReleaseOnDrop {
    slot: TimerSlot,
    generation: u64,
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        if self.slot.claim(self.generation) {
            debug!(generation = self.generation, "Timer task dropped before firing");
        }
    }
}

impl TimerSlot {
    /// Creates a fresh slot owned by the caller
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide slot
    ///
    /// Every controller using this slot cancels every other controller's
    /// pending callback when it schedules.
    pub fn global() -> Self {
        GLOBAL_SLOT.get_or_init(TimerSlot::new).clone()
    }

    /// True if both handles point at the same slot
    pub fn same_slot(&self, other: &TimerSlot) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // Callbacks run outside the guard, so a poisoned lock still holds consistent state.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Must be called with the state guard held
    fn publish(&self, state: &SlotState) {
        self.pending_tx.send_replace(state.pending.is_some());
    }

    /// Cancels the pending callback, if any
    ///
    /// Returns `true` if something was cancelled.
    pub fn cancel(&self) -> bool {
        let pending = {
            let mut state = self.lock();
            let pending = state.pending.take();
            self.publish(&state);
            pending
        };
        match pending {
            Some(task) => {
                task.token.cancel();
                debug!(generation = task.generation, "Cancelled pending timer");
                true
            }
            None => false,
        }
    }

    /// Whether a callback is scheduled and has neither fired nor been cancelled
    pub fn is_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    /// Resolves once nothing is pending on this slot
    ///
    /// Returns immediately when the slot is idle. Otherwise waits until the
    /// pending callback fires, is cancelled, or its task is dropped.
    pub async fn settled(&self) {
        let mut pending_rx = self.pending_tx.subscribe();
        if pending_rx.wait_for(|pending| !*pending).await.is_err() {
            trace!("Timer slot closed while waiting");
        }
    }

    /// Schedules `callback` to run after `delay`, replacing any pending one
    ///
    /// # Errors
    ///
    /// Returns [`InputError::NoRuntime`] when called outside of a tokio runtime.
    /// The slot is left untouched in that case.
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> Result<(), InputError>
    where
        F: FnOnce() + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| InputError::NoRuntime)?;
        let token = CancellationToken::new();

        let generation = {
            let mut state = self.lock();
            if let Some(previous) = state.pending.take() {
                previous.token.cancel();
                debug!(generation = previous.generation, "Superseded pending timer");
            }
            state.next_generation += 1;
            let generation = state.next_generation;
            state.pending = Some(PendingTask {
                generation,
                token: token.clone(),
            });
            self.publish(&state);
            generation
        };

        debug!(generation, delay_ms = delay.as_millis() as u64, "Timer scheduled");

        let slot = self.clone();
        let release = ReleaseOnDrop {
            slot: self.clone(),
            generation,
        };
        runtime.spawn(async move {
            let _release = release;
            tokio::select! {
                _ = token.cancelled() => {
                    trace!(generation, "Timer cancelled before firing");
                }
                _ = tokio::time::sleep(delay) => {
                    if slot.claim(generation) {
                        trace!(generation, "Timer fired");
                        callback();
                    } else {
                        trace!(generation, "Timer elapsed after being superseded");
                    }
                }
            }
        });

        Ok(())
    }

    /// Takes the pending entry if it still belongs to `generation`
    fn claim(&self, generation: u64) -> bool {
        let mut state = self.lock();
        match &state.pending {
            Some(task) if task.generation == generation => {
                state.pending = None;
                self.publish(&state);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = count.clone();
        let make = move || {
            let c = handle.clone();
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }) as Box<dyn FnOnce() + Send>
        };
        (count, make)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let slot = TimerSlot::new();
        let (count, make) = counter();

        slot.schedule(Duration::from_millis(400), make()).unwrap();
        assert!(slot.is_pending());

        tokio::time::sleep(Duration::from_millis(399)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!slot.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_pending_callback() {
        let slot = TimerSlot::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let f = first.clone();
        slot.schedule(Duration::from_millis(400), move || {
            f.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        let s = second.clone();
        slot.schedule(Duration::from_millis(400), move || {
            s.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let slot = TimerSlot::new();
        let (count, make) = counter();

        slot.schedule(Duration::from_millis(400), make()).unwrap();
        assert!(slot.cancel());
        assert!(!slot.cancel());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_the_slot() {
        let slot = TimerSlot::new();
        let other = slot.clone();
        let (count, make) = counter();

        slot.schedule(Duration::from_millis(400), make()).unwrap();
        assert!(other.is_pending());
        other.cancel();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(slot.same_slot(&other));
        assert!(!slot.same_slot(&TimerSlot::new()));
    }

    #[test]
    fn scheduling_without_runtime_fails() {
        let slot = TimerSlot::new();
        let result = slot.schedule(Duration::from_millis(10), || {});
        assert!(matches!(result, Err(InputError::NoRuntime)));
        assert!(!slot.is_pending());
    }

    #[test]
    fn global_slot_is_a_singleton() {
        assert!(TimerSlot::global().same_slot(&TimerSlot::global()));
    }

    #[test]
    fn runtime_shutdown_releases_pending_entry() {
        let slot = TimerSlot::new();
        let (count, make) = counter();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        runtime.block_on(async {
            slot.schedule(Duration::from_secs(60), make()).unwrap();
        });
        assert!(slot.is_pending());

        drop(runtime);
        assert!(!slot.is_pending());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn settled_returns_at_once_when_idle() {
        let slot = TimerSlot::new();
        let start = tokio::time::Instant::now();
        slot.settled().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn settled_waits_for_fire() {
        let slot = TimerSlot::new();
        let (count, make) = counter();
        let start = tokio::time::Instant::now();

        slot.schedule(Duration::from_millis(400), make()).unwrap();
        slot.settled().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn settled_wakes_on_cancel() {
        let slot = TimerSlot::new();
        let (count, make) = counter();
        let start = tokio::time::Instant::now();

        slot.schedule(Duration::from_millis(400), make()).unwrap();
        let canceller = slot.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });
        slot.settled().await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(start.elapsed() < Duration::from_millis(400));
        assert!(!slot.is_pending());
    }
}
