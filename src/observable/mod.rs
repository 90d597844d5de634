//! The `observable` module provides `Observable`, the reusable description of a
//! stream producer.

use std::{fmt, sync::Arc};

use tracing::debug;

use crate::observer::Observer;
use crate::subscription::subscribe::{
    Handlers, Subscribeable, Subscriber, Subscription, Teardown, UnhandledError,
};

type SubscribeFn<T> = dyn Fn(Subscriber<T>) -> Teardown + Send + Sync;

/// The `Observable` struct represents a source of values that can be observed.
///
/// An `Observable` wraps a subscribe function. Nothing happens until
/// [`subscribe`] is called; every call runs the subscribe function anew with a
/// fresh [`Subscriber`], so subscriptions to the same `Observable` never share
/// state. Cloning an `Observable` is cheap and clones can be subscribed to from
/// several threads at once.
///
/// # Example: synchronous `Observable`
///
/// ```no_run
/// use rxcore::subscribe::{Handlers, Subscriber, Teardown};
/// use rxcore::{Observable, Observer, Subscribeable};
///
/// // Create a custom observable that emits values from 1 to 10.
/// let emit_10_observable = Observable::new(|subscriber: Subscriber<u32>| {
///     for i in 1..=10 {
///         subscriber.next(i);
///     }
///     subscriber.complete();
///
///     // Nothing to release.
///     Teardown::Nil
/// });
///
/// let handlers = Handlers::on_next(|v| println!("Emitted {}", v))
///     .with_complete(|| println!("Completed"));
///
/// // Blocks until completion since the subscribe function emits synchronously.
/// emit_10_observable.subscribe(handlers);
/// ```
///
/// # Example: asynchronous `Observable` with teardown
///
/// The subscribe function moves the `Subscriber` into an OS thread and returns a
/// teardown that stops it. Unsubscribing runs the teardown exactly once.
///
/// ```no_run
/// use std::{
///     sync::mpsc::{channel, TryRecvError},
///     time::Duration,
/// };
///
/// use rxcore::subscribe::{Handlers, Subscriber, Teardown, Unsubscribeable};
/// use rxcore::{Observable, Observer, Subscribeable};
///
/// let observable = Observable::new(|o: Subscriber<u32>| {
///     let (tx, rx) = channel::<()>();
///
///     std::thread::spawn(move || {
///         for i in 0..=10000 {
///             // Stop on the unsubscribe signal.
///             if !matches!(rx.try_recv(), Err(TryRecvError::Empty)) {
///                 break;
///             }
///             o.next(i);
///             std::thread::sleep(Duration::from_millis(1));
///         }
///         o.complete();
///     });
///
///     Teardown::logic(move || {
///         let _ = tx.send(());
///     })
/// });
///
/// let subscription = observable.subscribe(Handlers::on_next(|v| println!("Emitted {}", v)));
/// std::thread::sleep(Duration::from_millis(20));
/// subscription.unsubscribe();
/// ```
///
/// [`subscribe`]: Subscribeable::subscribe
pub struct Observable<T> {
    subscribe_fn: Arc<SubscribeFn<T>>,
    unhandled: UnhandledError,
}

impl<T: 'static> Observable<T> {
    /// Creates a new `Observable` with the provided subscribe function.
    ///
    /// The subscribe function (`sf`) is invoked synchronously on every
    /// [`subscribe`] call with a fresh [`Subscriber`]. It may emit right away or
    /// hand the `Subscriber` to a thread or task that emits later, and returns the
    /// [`Teardown`] to run once the subscription ends.
    ///
    /// [`subscribe`]: Subscribeable::subscribe
    pub fn new(sf: impl Fn(Subscriber<T>) -> Teardown + Send + Sync + 'static) -> Self {
        Observable {
            subscribe_fn: Arc::new(sf),
            unhandled: UnhandledError::default(),
        }
    }

    /// Creates an `Observable` that emits every element of `values` in order and
    /// then completes.
    ///
    /// `values` is cloned for each subscription, so the observable can be
    /// subscribed to any number of times. The returned teardown only records a
    /// `debug` level trace event.
    pub fn from_sequence<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
    {
        Observable::new(move |subscriber| {
            for v in values.clone() {
                subscriber.next(v);
            }
            subscriber.complete();

            Teardown::logic(|| debug!("unsubscribed"))
        })
    }

    /// Sets the policy applied when a stream error reaches a subscriber without an
    /// error handler. Defaults to [`UnhandledError::Ignore`].
    #[must_use]
    pub fn on_unhandled_error(mut self, policy: UnhandledError) -> Self {
        self.unhandled = policy;
        self
    }
}

impl<T: Clone + Send + Sync + 'static> FromIterator<T> for Observable<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Observable::from_sequence(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Observable {
            subscribe_fn: Arc::clone(&self.subscribe_fn),
            unhandled: self.unhandled,
        }
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("unhandled", &self.unhandled)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Subscribeable for Observable<T> {
    type ObsType = T;

    fn subscribe(&self, handlers: Handlers<Self::ObsType>) -> Subscription {
        let subscriber = Subscriber::new(handlers, self.unhandled);
        let subscription = subscriber.subscription();

        let teardown = (self.subscribe_fn)(subscriber.clone());
        subscriber.install_teardown(teardown);

        subscription
    }
}

#[cfg(test)]
mod tests;
