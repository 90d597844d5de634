use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier, Mutex,
    },
    thread::JoinHandle,
    time::Duration,
};

use rxcore::{
    subscribe::{Subscriber, Teardown},
    Observable, Observer,
};

type Producer = Arc<Mutex<Option<JoinHandle<u32>>>>;

/// Emits `0..=end` from an OS thread, one value per millisecond, and stops early
/// once unsubscribed. The producer thread returns the number of values emitted.
pub fn generate_u32_observable(end: u32) -> (Observable<u32>, Producer, Arc<AtomicUsize>) {
    let producer: Producer = Arc::new(Mutex::new(None));
    let producer_c = Arc::clone(&producer);
    let teardowns = Arc::new(AtomicUsize::new(0));
    let teardowns_c = Arc::clone(&teardowns);

    let observable = Observable::new(move |o: Subscriber<_>| {
        let jh = std::thread::spawn(move || {
            let mut emitted = 0;

            for i in 0..=end {
                if o.is_unsubscribed() {
                    break;
                }
                o.next(i);
                emitted += 1;
                // Important. Put an await point after each emit.
                std::thread::sleep(Duration::from_millis(1));
            }
            o.complete();
            emitted
        });
        *producer_c.lock().unwrap() = Some(jh);

        let teardowns_c = Arc::clone(&teardowns_c);
        Teardown::logic(move || {
            teardowns_c.fetch_add(1, Ordering::SeqCst);
        })
    });

    (observable, producer, teardowns)
}

/// An observable whose producer thread blocks on `gate` before emitting
/// `0..end` and completing, so tests can act before the first emission.
pub struct GatedObservable {
    pub observable: Observable<u32>,
    pub gate: Arc<Barrier>,
    pub producer: Producer,
    pub teardowns: Arc<AtomicUsize>,
}

pub fn gated_u32_observable(end: u32) -> GatedObservable {
    let gate = Arc::new(Barrier::new(2));
    let gate_c = Arc::clone(&gate);
    let producer: Producer = Arc::new(Mutex::new(None));
    let producer_c = Arc::clone(&producer);
    let teardowns = Arc::new(AtomicUsize::new(0));
    let teardowns_c = Arc::clone(&teardowns);

    let observable = Observable::new(move |o: Subscriber<_>| {
        let gate = Arc::clone(&gate_c);
        let jh = std::thread::spawn(move || {
            gate.wait();
            for i in 0..end {
                o.next(i);
            }
            o.complete();
            end
        });
        *producer_c.lock().unwrap() = Some(jh);

        let teardowns_c = Arc::clone(&teardowns_c);
        Teardown::logic(move || {
            teardowns_c.fetch_add(1, Ordering::SeqCst);
        })
    });

    GatedObservable {
        observable,
        gate,
        producer,
        teardowns,
    }
}

pub fn join_producer(producer: &Producer) -> u32 {
    producer
        .lock()
        .unwrap()
        .take()
        .expect("producer thread was not started")
        .join()
        .expect("producer thread panicked")
}
