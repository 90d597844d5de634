use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use rxcore::subscribe::{Handlers, Teardown};

/// One notification as seen by the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission<T> {
    Next(T),
    Error(String),
    Complete,
}

pub fn register_emissions_handlers<T: Send + 'static>(
) -> (Handlers<T>, Arc<Mutex<Vec<Emission<T>>>>) {
    let emissions = Arc::new(Mutex::new(Vec::with_capacity(8)));
    let nexts_c = Arc::clone(&emissions);
    let errors_c = Arc::clone(&emissions);
    let completes_c = Arc::clone(&emissions);

    let handlers = Handlers::new(
        move |n| {
            // Track next() calls.
            nexts_c.lock().unwrap().push(Emission::Next(n));
        },
        move |e| {
            // Track error() calls.
            errors_c.lock().unwrap().push(Emission::Error(e.to_string()));
        },
        move || {
            // Track complete() calls.
            completes_c.lock().unwrap().push(Emission::Complete);
        },
    );
    (handlers, emissions)
}

pub fn counting_teardown() -> (Teardown, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let count_c = Arc::clone(&count);
    let teardown = Teardown::logic(move || {
        count_c.fetch_add(1, Ordering::SeqCst);
    });
    (teardown, count)
}
