use crate::error::{OTelSdkError, OTelSdkResult};
use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context as TaskContext, Poll, Waker};
use std::time::{Duration, Instant};

type Callback = Box<dyn FnOnce(&AsyncResult) + Send + 'static>;

enum State {
    Pending {
        callbacks: Vec<Callback>,
        wakers: Vec<Waker>,
    },
    Done(OTelSdkResult),
}

struct Inner {
    state: Mutex<State>,
    resolved: Condvar,
}

/// The outcome of an operation that may complete later, such as an export,
/// a flush or a shutdown.
///
/// An `AsyncResult` starts out pending and is resolved exactly once, either
/// with [`succeed`](Self::succeed) or with [`fail`](Self::fail) /
/// [`fail_with`](Self::fail_with). Later resolutions are ignored. Clones share
/// the same state, so the producer of a result can keep one handle and give
/// another to the caller.
///
/// A caller can wait for the outcome in one of three ways:
/// - block with [`join_until`](Self::join_until), bounded by a timeout,
/// - register a callback with [`on_complete`](Self::on_complete),
/// - `.await` it, as `AsyncResult` implements [`Future`].
///
/// ```
/// use opentelemetry_log_pipeline::AsyncResult;
/// use std::time::Duration;
///
/// let result = AsyncResult::pending();
/// let producer = result.clone();
/// std::thread::spawn(move || {
///     producer.succeed();
/// });
/// assert!(result.join_until(Duration::from_secs(5)).is_success());
/// ```
#[derive(Clone)]
pub struct AsyncResult {
    inner: Arc<Inner>,
}

impl AsyncResult {
    /// Creates an unresolved result.
    pub fn pending() -> Self {
        AsyncResult {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Pending {
                    callbacks: Vec::new(),
                    wakers: Vec::new(),
                }),
                resolved: Condvar::new(),
            }),
        }
    }

    /// Creates a result that has already succeeded.
    pub fn of_success() -> Self {
        Self::of_result(Ok(()))
    }

    /// Creates a result that has already failed with `err`.
    pub fn of_failure(err: OTelSdkError) -> Self {
        Self::of_result(Err(err))
    }

    /// Creates a result that is already resolved to `result`.
    pub fn of_result(result: OTelSdkResult) -> Self {
        AsyncResult {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Done(result)),
                resolved: Condvar::new(),
            }),
        }
    }

    /// Resolves this result as succeeded. No-op if it is already resolved.
    pub fn succeed(&self) -> &Self {
        self.resolve(Ok(()));
        self
    }

    /// Resolves this result as failed without a specific cause. No-op if it
    /// is already resolved.
    pub fn fail(&self) -> &Self {
        self.fail_with(OTelSdkError::InternalFailure(
            "operation failed".to_string(),
        ))
    }

    /// Resolves this result as failed with `err`. No-op if it is already
    /// resolved.
    pub fn fail_with(&self, err: OTelSdkError) -> &Self {
        self.resolve(Err(err));
        self
    }

    /// Resolves this result to `result`. No-op if it is already resolved.
    pub fn complete(&self, result: OTelSdkResult) -> &Self {
        self.resolve(result);
        self
    }

    /// Returns `true` once the result has been resolved.
    pub fn is_done(&self) -> bool {
        matches!(*self.lock(), State::Done(_))
    }

    /// Returns `true` if the result resolved successfully. `false` while
    /// pending.
    pub fn is_success(&self) -> bool {
        matches!(*self.lock(), State::Done(Ok(())))
    }

    /// The failure this result resolved with, if any.
    pub fn error(&self) -> Option<OTelSdkError> {
        match &*self.lock() {
            State::Done(Err(err)) => Some(err.clone()),
            _ => None,
        }
    }

    /// The outcome, or `None` while pending.
    pub fn result(&self) -> Option<OTelSdkResult> {
        match &*self.lock() {
            State::Done(result) => Some(result.clone()),
            State::Pending { .. } => None,
        }
    }

    /// Registers `callback` to run exactly once when this result resolves.
    ///
    /// If the result is already resolved, the callback runs immediately on
    /// the calling thread. Otherwise it runs on the thread that resolves the
    /// result.
    pub fn on_complete<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(&AsyncResult) + Send + 'static,
    {
        {
            let mut state = self.lock();
            if let State::Pending { callbacks, .. } = &mut *state {
                callbacks.push(Box::new(callback));
                return self;
            }
        }
        callback(self);
        self
    }

    /// Blocks the current thread until this result resolves or `timeout`
    /// elapses, whichever comes first. A timeout leaves the result pending.
    pub fn join_until(&self, timeout: Duration) -> &Self {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        while let State::Pending { .. } = *state {
            state = match deadline {
                None => self
                    .inner
                    .resolved
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    self.inner
                        .resolved
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
        self
    }

    /// Returns a result that resolves once every one of `results` has
    /// resolved. It succeeds only if all of them succeeded, otherwise it fails
    /// with the first failure observed. A failure does not resolve the
    /// combined result early.
    ///
    /// An empty input yields a succeeded result.
    pub fn all_of<I>(results: I) -> AsyncResult
    where
        I: IntoIterator<Item = AsyncResult>,
    {
        let results: Vec<AsyncResult> = results.into_iter().collect();
        if results.is_empty() {
            return AsyncResult::of_success();
        }

        let combined = AsyncResult::pending();
        let remaining = Arc::new(AtomicUsize::new(results.len()));
        let first_error: Arc<Mutex<Option<OTelSdkError>>> = Arc::new(Mutex::new(None));

        for result in results {
            let combined = combined.clone();
            let remaining = remaining.clone();
            let first_error = first_error.clone();
            result.on_complete(move |child| {
                if let Some(err) = child.error() {
                    first_error
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .get_or_insert(err);
                }
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    let err = first_error
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .take();
                    match err {
                        Some(err) => combined.fail_with(err),
                        None => combined.succeed(),
                    };
                }
            });
        }
        combined
    }

    fn resolve(&self, result: OTelSdkResult) -> bool {
        let (callbacks, wakers) = {
            let mut state = self.lock();
            if let State::Done(_) = *state {
                return false;
            }
            match std::mem::replace(&mut *state, State::Done(result)) {
                State::Pending { callbacks, wakers } => (callbacks, wakers),
                State::Done(_) => return false,
            }
        };

        self.inner.resolved.notify_all();
        for waker in wakers {
            waker.wake();
        }
        for callback in callbacks {
            callback(self);
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Future for AsyncResult {
    type Output = OTelSdkResult;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let mut state = self.lock();
        match &mut *state {
            State::Done(result) => Poll::Ready(result.clone()),
            State::Pending { wakers, .. } => {
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl Debug for AsyncResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &*self.lock() {
            State::Pending { callbacks, .. } => f
                .debug_struct("AsyncResult")
                .field("state", &"pending")
                .field("callbacks", &callbacks.len())
                .finish(),
            State::Done(result) => f
                .debug_struct("AsyncResult")
                .field("state", result)
                .finish(),
        }
    }
}

impl From<OTelSdkResult> for AsyncResult {
    fn from(result: OTelSdkResult) -> Self {
        AsyncResult::of_result(result)
    }
}

/// Runs `f`, which calls into user supplied code, turning a panic into an
/// already failed result.
pub(crate) fn call_guarded<F>(f: F) -> Result<AsyncResult, String>
where
    F: FnOnce() -> AsyncResult,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
