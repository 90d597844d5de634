use crate::StreamError;

/// The producer-facing side of a subscription.
///
/// Observable implementations push values through `next` and finish the stream
/// with exactly one of `error` or `complete`. Calls made after the stream has
/// terminated or has been unsubscribed are silently ignored.
pub trait Observer {
    type NextFnType;

    fn next(&self, _: Self::NextFnType);
    fn complete(&self);
    fn error(&self, _: StreamError);
}
