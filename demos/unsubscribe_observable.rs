//! This `Observable` emits values from an OS thread and returns a teardown that
//! signals the thread to stop. Unsubscribing runs the teardown exactly once, and
//! any value the thread still tries to push afterwards is dropped.
//!
//! To run this example, execute `cargo run --example unsubscribe_observable`.

use std::{
    sync::mpsc::{channel, TryRecvError},
    time::Duration,
};

use rxcore::{
    subscribe::{Handlers, Subscriber, Teardown, Unsubscribeable},
    Observable, Observer, Subscribeable,
};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    // Create a custom observable that emits values in a separate thread.
    let observable = Observable::new(|o: Subscriber<i32>| {
        let (tx, rx) = channel::<()>();

        std::thread::spawn(move || {
            for i in 0..=10000 {
                // Stop once the teardown signalled us or dropped its sender.
                if !matches!(rx.try_recv(), Err(TryRecvError::Empty)) {
                    println!("Producer stopped at {}", i);
                    break;
                }
                // Emit the value to the subscriber.
                o.next(i);
                std::thread::sleep(Duration::from_millis(1));
            }
            // Ignored if the subscription was already cancelled.
            o.complete();
        });

        Teardown::logic(move || {
            if tx.send(()).is_err() {
                println!("Producer already finished.");
            }
        })
    });

    let handlers = Handlers::on_next(|v: i32| println!("Emitted {}", v))
        .with_complete(|| println!("Completed"));

    // This observable uses OS threads so it will not block the current thread.
    let subscription = observable.subscribe(handlers);

    // Do something else here.
    println!("Do something while Observable is emitting.");
    std::thread::sleep(Duration::from_millis(50));

    // Unsubscribe from the observable to stop emissions.
    subscription.unsubscribe();

    // Allow some time for the main thread to confirm that the observable indeed
    // isn't emitting.
    std::thread::sleep(Duration::from_millis(200));
    println!("`main` function done")
}
