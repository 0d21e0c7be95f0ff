use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_timer::Delay;
use tracing::trace;

pub const DEFAULT_WAIT: Duration = Duration::from_millis(300);

pub type DebouncedCall<R> = Pin<Box<dyn Future<Output = Option<R>> + Send + 'static>>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DebounceTicket(pub u64);

#[derive(Debug)]
struct DebounceState {
    wait: Duration,
    generation: AtomicU64,
    pending: AtomicBool,
    closed: AtomicBool,
}

impl DebounceState {
    fn issue(&self) -> DebounceTicket {
        self.pending.store(true, Ordering::SeqCst);
        DebounceTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn is_current(&self, ticket: DebounceTicket) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == ticket.0
    }

    fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.pending.store(false, Ordering::SeqCst);
    }
}

/// Trailing-edge debounce owned by one field binding.
///
/// Every call supersedes the previous one. Only the last call in a burst runs its
/// action, once `wait` has passed since that call. Dropping the debouncer closes
/// it: waiting calls resolve to `None` and later calls through old handles never run.
#[derive(Debug)]
pub struct Debouncer {
    shared: Arc<DebounceState>,
}

#[derive(Clone, Debug)]
pub struct DebounceHandle {
    shared: Arc<DebounceState>,
}

impl Debouncer {
    pub fn new(wait: Duration) -> Self {
        Self {
            shared: Arc::new(DebounceState {
                wait,
                generation: AtomicU64::new(0),
                pending: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn handle(&self) -> DebounceHandle {
        DebounceHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn wait(&self) -> Duration {
        self.shared.wait
    }

    pub fn is_pending(&self) -> bool {
        self.shared.pending.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        if self.is_pending() {
            trace!("canceling pending debounced call");
        }
        self.shared.cancel();
    }

    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.cancel();
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.close();
    }
}

impl DebounceHandle {
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn call<F, Fut>(&self, action: F) -> DebouncedCall<Fut::Output>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        if self.is_closed() {
            return Box::pin(async { None::<Fut::Output> });
        }
        let shared = self.shared.clone();
        let ticket = shared.issue();
        trace!(ticket = ticket.0, wait = ?shared.wait, "debounced call scheduled");

        let delay = Delay::new(shared.wait);
        Box::pin(async move {
            delay.await;
            if !shared.is_current(ticket) {
                trace!(ticket = ticket.0, "debounced call superseded");
                return None;
            }
            shared.pending.store(false, Ordering::SeqCst);
            Some(action().await)
        })
    }
}
