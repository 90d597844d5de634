use std::{
    collections::VecDeque,
    fmt,
    future::Future,
    mem,
    pin::Pin,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use tokio::runtime;
use tracing::{error, trace, warn};

use crate::{observer::Observer, ObservableError, StreamError};

/// A trait for types that can be subscribed to, allowing consumers to receive
/// values emitted by an observable stream.
pub trait Subscribeable {
    /// The type of items emitted by the observable stream.
    type ObsType;

    /// Subscribes to the observable stream and specifies how to handle emitted values.
    ///
    /// The `Handlers` parameter defines the behavior for processing values emitted
    /// by the observable stream. The implementation of this method should create a
    /// fresh `Subscriber` from them, start the producer and return a
    /// `Subscription` through which the consumer can cancel the stream.
    fn subscribe(&self, handlers: Handlers<Self::ObsType>) -> Subscription;
}

/// A trait for types that can be unsubscribed, allowing the clean release of resources
/// associated with a subscription.
pub trait Unsubscribeable {
    /// Unsubscribes from a subscription and releases associated resources.
    ///
    /// After this call no handler is invoked anymore and the teardown returned by
    /// the observable runs, exactly once no matter how many times `unsubscribe` is
    /// called or whether the stream had already completed or errored.
    ///
    /// This does not interrupt a handler that is already running on another
    /// thread; it only prevents future invocations.
    fn unsubscribe(&self);
}

type NextFn<T> = Box<dyn FnMut(T) + Send>;
type CompleteFn = Box<dyn FnMut() + Send>;
type ErrorFn = Box<dyn FnMut(StreamError) + Send>;

/// Callbacks supplied by a consumer when subscribing.
///
/// Every callback is optional. A missing callback simply suppresses the matching
/// notification; subscribing with `Handlers::empty()` is legal.
pub struct Handlers<NextFnType> {
    next_fn: Option<NextFn<NextFnType>>,
    complete_fn: Option<CompleteFn>,
    error_fn: Option<ErrorFn>,
}

impl<NextFnType> Handlers<NextFnType> {
    /// Creates handlers with all three callbacks set.
    pub fn new(
        next_fn: impl FnMut(NextFnType) + 'static + Send,
        error_fn: impl FnMut(StreamError) + 'static + Send,
        complete_fn: impl FnMut() + 'static + Send,
    ) -> Self {
        Handlers {
            next_fn: Some(Box::new(next_fn)),
            complete_fn: Some(Box::new(complete_fn)),
            error_fn: Some(Box::new(error_fn)),
        }
    }

    /// Create new handlers with only the provided `next` function.
    ///
    /// The `next` closure is called when the observable emits a new item.
    pub fn on_next(next_fn: impl FnMut(NextFnType) + 'static + Send) -> Self {
        Handlers {
            next_fn: Some(Box::new(next_fn)),
            complete_fn: None,
            error_fn: None,
        }
    }

    /// Handlers that ignore every notification.
    #[must_use]
    pub fn empty() -> Self {
        Handlers {
            next_fn: None,
            complete_fn: None,
            error_fn: None,
        }
    }

    /// Set the completion function.
    ///
    /// The provided closure will be called when the observable completes its
    /// emission sequence.
    pub fn on_complete(&mut self, complete_fn: impl FnMut() + 'static + Send) {
        self.complete_fn = Some(Box::new(complete_fn));
    }

    /// Set the error-handling function.
    ///
    /// The provided closure will be called when the observable terminates with an
    /// error. Without it the error is subject to the observable's
    /// [`UnhandledError`] policy.
    pub fn on_error(&mut self, error_fn: impl FnMut(StreamError) + 'static + Send) {
        self.error_fn = Some(Box::new(error_fn));
    }

    /// Builder form of [`Handlers::on_complete`].
    #[must_use]
    pub fn with_complete(mut self, complete_fn: impl FnMut() + 'static + Send) -> Self {
        self.on_complete(complete_fn);
        self
    }

    /// Builder form of [`Handlers::on_error`].
    #[must_use]
    pub fn with_error(mut self, error_fn: impl FnMut(StreamError) + 'static + Send) -> Self {
        self.on_error(error_fn);
        self
    }
}

impl<T> Default for Handlers<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> fmt::Debug for Handlers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("next", &self.next_fn.is_some())
            .field("error", &self.error_fn.is_some())
            .field("complete", &self.complete_fn.is_some())
            .finish()
    }
}

/// What a `Subscriber` does with a stream error when no error handler was supplied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnhandledError {
    /// Drop the error silently. The subscription still terminates.
    #[default]
    Ignore,

    /// Drop the error after emitting a `tracing` warning.
    Log,

    /// Terminate the subscription, run its teardown, then panic.
    ///
    /// An error raised synchronously inside the subscribe function panics out of
    /// `subscribe`, once the returned teardown has run.
    Panic,
}

/// Enumerates the teardown actions an observable can hand back from its
/// subscribe function.
///
/// The teardown runs exactly once, the first time the subscription ends, whether
/// that happens through `complete`, `error` or `unsubscribe`.
pub enum Teardown {
    /// Nothing to release.
    Nil,

    /// If one subscription depends on another. Wrapped subscription's unsubscribe
    /// will be called upon unsubscribing.
    Wrapped(Box<Subscription>),

    /// Teardown defined by a function.
    Logic(Box<dyn FnOnce() + Send>),

    /// Asynchronous teardown represented by a future. Use if you need to spawn
    /// `Tokio` tasks or `.await` as a part of the teardown.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

impl Teardown {
    /// Teardown running `f`.
    pub fn logic(f: impl FnOnce() + Send + 'static) -> Self {
        Teardown::Logic(Box::new(f))
    }

    /// Teardown driving `future` to completion.
    pub fn future(future: impl Future<Output = ()> + Send + 'static) -> Self {
        Teardown::Future(Box::pin(future))
    }

    fn run(self, runtime_handle: Option<&runtime::Handle>) {
        match self {
            Teardown::Nil => (),
            Teardown::Logic(fnc) => fnc(),
            Teardown::Wrapped(subscription) => subscription.unsubscribe(),
            Teardown::Future(future) => {
                let handle = runtime_handle
                    .cloned()
                    .or_else(|| runtime::Handle::try_current().ok());
                match handle {
                    Some(handle) => {
                        let mut pending = PendingTeardown(Some(future));
                        handle.spawn(async move {
                            if let Some(future) = pending.0.take() {
                                future.await;
                            }
                        });
                    }
                    None => drive_detached(future),
                }
            }
        }
    }
}

impl From<Subscription> for Teardown {
    fn from(subscription: Subscription) -> Self {
        Teardown::Wrapped(Box::new(subscription))
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Teardown::Nil => f.write_str("Nil"),
            Teardown::Wrapped(s) => f.debug_tuple("Wrapped").field(s).finish(),
            Teardown::Logic(_) => f.write_str("Logic(..)"),
            Teardown::Future(_) => f.write_str("Future(..)"),
        }
    }
}

type TeardownFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

// Holds an asynchronous teardown until the spawned task first polls it. A
// runtime that already shut down drops the task unpolled; the teardown is then
// completed on its own thread instead of being lost.
struct PendingTeardown(Option<TeardownFuture>);

impl Drop for PendingTeardown {
    fn drop(&mut self) {
        if let Some(future) = self.0.take() {
            error!("runtime dropped asynchronous teardown before running it, driving it detached");
            std::thread::spawn(move || drive_detached(future));
        }
    }
}

// Outside of any Tokio runtime the future is completed on a throwaway
// current-thread runtime, blocking the unsubscribing thread.
fn drive_detached(future: TeardownFuture) {
    let built = runtime::Builder::new_current_thread().enable_all().build();
    match built {
        Ok(rt) => rt.block_on(future),
        Err(e) => {
            let e = ObservableError::from(e);
            error!(label = e.as_label(), error = %e, "asynchronous teardown dropped");
        }
    }
}

const ACTIVE: u8 = 0;
const TERMINATING: u8 = 1;
const UNSUBSCRIBED: u8 = 2;

enum TeardownSlot {
    Pending,
    // Closed while the subscribe function was still running. Holds an unhandled
    // error whose panic waits until the teardown has run.
    Closed { unhandled: Option<StreamError> },
    Installed(Teardown),
    Spent,
}

enum Notification<T> {
    Next(T),
    Error(StreamError),
    Complete,
}

// Notifications accepted but not yet delivered. Only the thread that set
// `draining` calls handlers; everybody else just queues.
struct Mailbox<T> {
    draining: bool,
    pending: VecDeque<Notification<T>>,
}

// Releases the drain role when a handler panics, so later notifications are
// not queued forever.
struct DrainGuard<'a, T> {
    mailbox: &'a Mutex<Mailbox<T>>,
    finished: bool,
}

impl<T> Drop for DrainGuard<'_, T> {
    fn drop(&mut self) {
        if !self.finished {
            lock(self.mailbox).draining = false;
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking handler poisons the mutex; the protected data stays valid.
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn raise_unhandled(observable_error: StreamError) -> ! {
    panic!(
        "{}",
        ObservableError::Unhandled {
            source: observable_error
        }
    )
}

struct Shared<T> {
    state: AtomicU8,
    handlers: Mutex<Handlers<T>>,
    mailbox: Mutex<Mailbox<T>>,
    teardown: Mutex<TeardownSlot>,
    unhandled: UnhandledError,
    runtime_handle: Option<runtime::Handle>,
}

impl<T> Shared<T> {
    fn is_active(&self) -> bool {
        self.state.load(Ordering::Acquire) == ACTIVE
    }

    // Only one caller ever wins the terminal transition.
    fn begin_terminal(&self) -> bool {
        self.state
            .compare_exchange(ACTIVE, TERMINATING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn push(&self, notification: Notification<T>) {
        {
            let mut mailbox = lock(&self.mailbox);
            // Checked under the mailbox lock so a value never lands behind the
            // terminal notification that closed the stream.
            if matches!(notification, Notification::Next(_)) && !self.is_active() {
                trace!("next ignored, subscriber unsubscribed");
                return;
            }
            mailbox.pending.push_back(notification);
            if mailbox.draining {
                trace!("notification queued behind a running handler");
                return;
            }
            mailbox.draining = true;
        }
        self.drain();
    }

    fn drain(&self) {
        let mut guard = DrainGuard {
            mailbox: &self.mailbox,
            finished: false,
        };
        loop {
            let notification = {
                let mut mailbox = lock(&self.mailbox);
                match mailbox.pending.pop_front() {
                    Some(notification) => notification,
                    None => {
                        mailbox.draining = false;
                        break;
                    }
                }
            };
            self.deliver(notification);
        }
        guard.finished = true;
    }

    fn deliver(&self, notification: Notification<T>) {
        if self.state.load(Ordering::Acquire) == UNSUBSCRIBED {
            trace!("queued notification dropped, subscriber unsubscribed");
            return;
        }
        match notification {
            Notification::Next(v) => {
                let mut handlers = lock(&self.handlers);
                if let Some(nfn) = &mut handlers.next_fn {
                    (nfn)(v);
                }
            }
            Notification::Complete => {
                {
                    let mut handlers = lock(&self.handlers);
                    if let Some(cfn) = &mut handlers.complete_fn {
                        (cfn)();
                    }
                }
                self.unsubscribe();
            }
            Notification::Error(observable_error) => {
                let unhandled = {
                    let mut handlers = lock(&self.handlers);
                    match &mut handlers.error_fn {
                        Some(efn) => {
                            (efn)(observable_error);
                            None
                        }
                        None => Some(observable_error),
                    }
                };
                self.unsubscribe();
                if let Some(observable_error) = unhandled {
                    self.report_unhandled(observable_error);
                }
            }
        }
    }

    fn unsubscribe(&self) {
        let previous = self.state.swap(UNSUBSCRIBED, Ordering::AcqRel);
        if previous != UNSUBSCRIBED {
            trace!("subscriber unsubscribed");
        }

        let teardown = {
            let mut slot = lock(&self.teardown);
            match mem::replace(&mut *slot, TeardownSlot::Spent) {
                TeardownSlot::Installed(teardown) => Some(teardown),
                TeardownSlot::Pending => {
                    *slot = TeardownSlot::Closed { unhandled: None };
                    None
                }
                closed @ TeardownSlot::Closed { .. } => {
                    *slot = closed;
                    None
                }
                TeardownSlot::Spent => None,
            }
        };
        if let Some(teardown) = teardown {
            trace!(?teardown, "running teardown");
            teardown.run(self.runtime_handle.as_ref());
        }
    }

    fn install(&self, teardown: Teardown) {
        let (run_now, unhandled) = {
            let mut slot = lock(&self.teardown);
            match mem::replace(&mut *slot, TeardownSlot::Spent) {
                TeardownSlot::Pending => {
                    *slot = TeardownSlot::Installed(teardown);
                    (None, None)
                }
                TeardownSlot::Closed { unhandled } => (Some(teardown), unhandled),
                TeardownSlot::Installed(_) | TeardownSlot::Spent => (Some(teardown), None),
            }
        };
        // The stream ended before the subscribe function returned.
        if let Some(teardown) = run_now {
            trace!(?teardown, "subscriber already closed, running teardown at install");
            teardown.run(self.runtime_handle.as_ref());
        }
        if let Some(observable_error) = unhandled {
            raise_unhandled(observable_error);
        }
    }

    fn report_unhandled(&self, observable_error: StreamError) {
        match self.unhandled {
            UnhandledError::Ignore => trace!("stream error dropped, no error handler"),
            UnhandledError::Log => {
                warn!(error = %observable_error, "stream error dropped, no error handler");
            }
            UnhandledError::Panic => {
                {
                    let mut slot = lock(&self.teardown);
                    if let TeardownSlot::Closed { unhandled } = &mut *slot {
                        // The teardown does not exist yet; `install` panics once
                        // it has run.
                        *unhandled = Some(observable_error);
                        return;
                    }
                }
                raise_unhandled(observable_error);
            }
        }
    }
}

trait Cancel: Send + Sync {
    fn cancel(&self);
}

impl<T: Send> Cancel for Shared<T> {
    fn cancel(&self) {
        self.unsubscribe();
    }
}

/// The observer side of one subscription, handed to an observable's subscribe
/// function.
///
/// A `Subscriber` owns the consumer's [`Handlers`], the lifecycle flag and the
/// teardown slot of a single subscription. It is a cheap handle: clones refer to
/// the same subscription, so it can be moved into threads or tasks that emit
/// values later.
///
/// Once `error`, `complete` or `unsubscribe` has been called, every further
/// notification is a silent no-op.
///
/// Handlers never run concurrently and never nest. A notification sent while a
/// handler of the same subscription is running, from inside that handler or
/// from another thread, is queued and delivered in call order right after the
/// running handler returns, by the thread that is already delivering. Sending a
/// notification therefore never blocks on a handler. Notifications still queued
/// when the subscription is unsubscribed are dropped.
pub struct Subscriber<NextFnType> {
    inner: Arc<Shared<NextFnType>>,
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Subscriber {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Subscriber<T> {
    /// Returns `true` once the subscription has terminated or was cancelled.
    ///
    /// Asynchronous producers should poll this to stop emitting early:
    ///
    /// ```text
    /// Observable::new(|subscriber| {
    ///     // ...
    ///     if subscriber.is_unsubscribed() { return; }
    ///     // ...
    /// });
    /// ```
    #[must_use]
    pub fn is_unsubscribed(&self) -> bool {
        !self.inner.is_active()
    }
}

impl<T: Send + 'static> Subscriber<T> {
    pub(crate) fn new(handlers: Handlers<T>, unhandled: UnhandledError) -> Self {
        Subscriber {
            inner: Arc::new(Shared {
                state: AtomicU8::new(ACTIVE),
                handlers: Mutex::new(handlers),
                mailbox: Mutex::new(Mailbox {
                    draining: false,
                    pending: VecDeque::new(),
                }),
                teardown: Mutex::new(TeardownSlot::Pending),
                unhandled,
                runtime_handle: runtime::Handle::try_current().ok(),
            }),
        }
    }

    /// # Panics
    ///
    /// Under [`UnhandledError::Panic`], if the stream errored without an error
    /// handler before the teardown was installed, this panics after running it.
    pub(crate) fn install_teardown(&self, teardown: Teardown) {
        self.inner.install(teardown);
    }

    pub(crate) fn subscription(&self) -> Subscription {
        Subscription {
            subscriber: Arc::clone(&self.inner) as Arc<dyn Cancel>,
        }
    }
}

impl<T> Observer for Subscriber<T> {
    type NextFnType = T;

    fn next(&self, v: Self::NextFnType) {
        if !self.inner.is_active() {
            trace!("next ignored, subscriber unsubscribed");
            return;
        }
        self.inner.push(Notification::Next(v));
    }

    fn complete(&self) {
        if !self.inner.begin_terminal() {
            return;
        }
        trace!("subscriber completed");
        self.inner.push(Notification::Complete);
    }

    fn error(&self, observable_error: StreamError) {
        if !self.inner.begin_terminal() {
            return;
        }
        trace!(error = %observable_error, "subscriber errored");
        self.inner.push(Notification::Error(observable_error));
    }
}

impl<T> Unsubscribeable for Subscriber<T> {
    fn unsubscribe(&self) {
        self.inner.unsubscribe();
    }
}

impl<T: 'static> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("unsubscribed", &self.is_unsubscribed())
            .field("unhandled", &self.inner.unhandled)
            .finish_non_exhaustive()
    }
}

/// Represents a subscription to an observable, allowing the consumer to cancel it.
///
/// When an observable is subscribed to, it returns a `Subscription` instance.
/// Its only capability is [`Unsubscribeable::unsubscribe`], which is safe to call
/// any number of times, also after the stream has already completed or errored.
/// Clones refer to the same subscription. Dropping a `Subscription` does not
/// unsubscribe.
#[derive(Clone)]
pub struct Subscription {
    subscriber: Arc<dyn Cancel>,
}

impl Unsubscribeable for Subscription {
    fn unsubscribe(&self) {
        self.subscriber.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
