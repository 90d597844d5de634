//! Provides structures and traits related to subscription management.
//!
//! This module includes `Handlers` for describing how observed values, errors
//! and completions are handled, `Subscriber` which carries those handlers
//! together with the lifecycle of one subscription, and `Subscription` for
//! cancelling it from the consumer side.
//!
//! Additionally, it defines the `Teardown` enum describing what has to be released
//! once a subscription ends, and the traits for subscribing and unsubscribing.
pub mod subscribe;
