//! `rxcore` is a minimal push-based observable stream primitive.
//!
//! A producer, described by an [`Observable`], pushes values to exactly one
//! consumer per subscription and ends the stream with at most one terminal
//! event: completion or an error. Consumers cancel through the [`Subscription`]
//! returned by [`Subscribeable::subscribe`]; cancellation is idempotent and the
//! producer's [`Teardown`] runs exactly once per subscription, whichever way the
//! subscription ended.
//!
//! `rxcore` deliberately leaves scheduling to producers. A subscribe function may
//! emit synchronously inside `subscribe`, or move its [`Subscriber`] into an OS
//! thread or a `Tokio` task and emit later. All handles are `Send + Sync` and the
//! lifecycle is race-free, so emitting and unsubscribing from different threads is
//! sound.
//!
//! ```no_run
//! use rxcore::subscribe::{Handlers, Unsubscribeable};
//! use rxcore::{Observable, Subscribeable};
//!
//! let requests = Observable::from_sequence(vec!["GET /user", "POST /user"]);
//!
//! let subscription = requests.subscribe(
//!     Handlers::on_next(|request| println!("handling {request}"))
//!         .with_error(|e| eprintln!("stream failed: {e}"))
//!         .with_complete(|| println!("complete")),
//! );
//!
//! subscription.unsubscribe();
//! ```
//!
//! Stream errors are delivered only to an error handler. Without one they are
//! dropped by default; see [`UnhandledError`] to log them or to panic instead.
//!
//! [`Subscription`]: subscribe::Subscription
//! [`Teardown`]: subscribe::Teardown
//! [`Subscriber`]: subscribe::Subscriber
//! [`UnhandledError`]: subscribe::UnhandledError

mod errors;
mod observable;
mod observer;
mod subscription;

pub use errors::*;
pub use observable::*;
pub use observer::Observer;
pub use subscription::*;

pub use subscription::subscribe::{Subscribeable, UnhandledError, Unsubscribeable};
