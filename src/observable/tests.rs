use super::*;

use std::{
    io,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use crate::subscription::subscribe::Unsubscribeable;
use crate::ObservableError;

fn counting_teardown(count: &Arc<AtomicUsize>) -> Teardown {
    let count = Arc::clone(count);
    Teardown::logic(move || {
        count.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn subscribe_runs_procedure_once_per_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_c = Arc::clone(&calls);

    let observable = Observable::new(move |_: Subscriber<u32>| {
        calls_c.fetch_add(1, Ordering::SeqCst);
        Teardown::Nil
    });
    assert_eq!(calls.load(Ordering::SeqCst), 0, "observables are cold");

    observable.subscribe(Handlers::empty());
    observable.clone().subscribe(Handlers::empty());

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn subscriptions_do_not_share_state() {
    let teardowns = Arc::new(AtomicUsize::new(0));
    let teardowns_c = Arc::clone(&teardowns);

    let observable = Observable::new(move |_: Subscriber<u32>| counting_teardown(&teardowns_c));

    let first = observable.subscribe(Handlers::empty());
    let second = observable.subscribe(Handlers::empty());

    first.unsubscribe();
    first.unsubscribe();
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);

    second.unsubscribe();
    assert_eq!(teardowns.load(Ordering::SeqCst), 2);
}

#[test]
fn synchronous_complete_before_teardown_is_returned() {
    let teardowns = Arc::new(AtomicUsize::new(0));
    let teardowns_c = Arc::clone(&teardowns);

    let observable = Observable::new(move |o: Subscriber<u32>| {
        o.complete();
        // Already closed, the teardown is not installed yet.
        assert!(o.is_unsubscribed());
        counting_teardown(&teardowns_c)
    });

    let subscription = observable.subscribe(Handlers::empty());
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);

    subscription.unsubscribe();
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
}

#[test]
fn from_sequence_is_reusable() {
    let observable = Observable::from_sequence(vec!["a", "b"]);
    let log = Arc::new(Mutex::new(Vec::new()));

    for _ in 0..2 {
        let log_c = Arc::clone(&log);
        observable.subscribe(Handlers::on_next(move |v| log_c.lock().unwrap().push(v)));
    }

    assert_eq!(*log.lock().unwrap(), vec!["a", "b", "a", "b"]);
}

#[test]
fn collect_into_observable() {
    let observable: Observable<i32> = (1..=4).collect();
    let sum = Arc::new(Mutex::new(0));
    let sum_c = Arc::clone(&sum);

    observable.subscribe(Handlers::on_next(move |v| *sum_c.lock().unwrap() += v));

    assert_eq!(*sum.lock().unwrap(), 10);
}

#[test]
fn unhandled_error_policy_is_carried_to_subscribers() {
    let observable = Observable::new(|o: Subscriber<()>| {
        o.error(ObservableError::message("lost").into_stream_error());
        Teardown::Nil
    })
    .on_unhandled_error(UnhandledError::Panic);

    assert_eq!(observable.clone().unhandled, UnhandledError::Panic);
    let outcome = catch_unwind(AssertUnwindSafe(|| observable.subscribe(Handlers::empty())));
    assert!(outcome.is_err());
}

#[test]
fn ignored_unhandled_error_still_terminates() {
    let completes = Arc::new(AtomicUsize::new(0));
    let completes_c = Arc::clone(&completes);
    let teardowns = Arc::new(AtomicUsize::new(0));
    let teardowns_c = Arc::clone(&teardowns);

    let observable = Observable::new(move |o: Subscriber<()>| {
        o.error(ObservableError::message("lost").into_stream_error());
        o.complete();
        counting_teardown(&teardowns_c)
    });

    observable.subscribe(Handlers::empty().with_complete(move || {
        completes_c.fetch_add(1, Ordering::SeqCst);
    }));

    assert_eq!(completes.load(Ordering::SeqCst), 0);
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
}

#[test]
fn panic_policy_runs_synchronous_teardown_first() {
    let teardowns = Arc::new(AtomicUsize::new(0));
    let teardowns_c = Arc::clone(&teardowns);

    let observable = Observable::new(move |o: Subscriber<u32>| {
        o.next(1);
        o.error(ObservableError::message("boom").into_stream_error());
        counting_teardown(&teardowns_c)
    })
    .on_unhandled_error(UnhandledError::Panic);

    let outcome = catch_unwind(AssertUnwindSafe(|| observable.subscribe(Handlers::empty())));

    let payload = outcome.expect_err("unhandled error should panic");
    assert_eq!(
        payload.downcast_ref::<String>().map(String::as_str),
        Some("unhandled stream error: boom")
    );
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
}

#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn log_policy_warns_and_terminates() {
    let log = CapturedLog::default();
    let writer = log.clone();
    let collector = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();

    let completes = Arc::new(AtomicUsize::new(0));
    let completes_c = Arc::clone(&completes);
    let teardowns = Arc::new(AtomicUsize::new(0));
    let teardowns_c = Arc::clone(&teardowns);

    let observable = Observable::new(move |o: Subscriber<()>| {
        o.error(ObservableError::message("lost").into_stream_error());
        o.complete();
        counting_teardown(&teardowns_c)
    })
    .on_unhandled_error(UnhandledError::Log);

    let subscription = tracing::subscriber::with_default(collector, || {
        observable.subscribe(Handlers::empty().with_complete(move || {
            completes_c.fetch_add(1, Ordering::SeqCst);
        }))
    });
    subscription.unsubscribe();

    assert_eq!(completes.load(Ordering::SeqCst), 0);
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);

    let output = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("stream error dropped, no error handler"), "{output}");
    assert!(output.contains("lost"), "{output}");
}
