//! This simple `Observable` emits a fixed sequence of requests and completes.
//! Every request is handled synchronously, so `subscribe` blocks until the
//! sequence is exhausted.
//!
//! The sequence observable's teardown only records a `debug` trace event, which
//! this demo prints by installing a `tracing` subscriber.
//!
//! To run this example, execute `cargo run --example basic_observable`.

use rxcore::subscribe::{Handlers, Unsubscribeable};
use rxcore::{Observable, Subscribeable};

#[derive(Clone, Debug)]
enum Method {
    Get,
    Post,
}

#[derive(Clone, Debug)]
struct Request {
    method: Method,
    path: &'static str,
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let requests = Observable::from_sequence(vec![
        Request {
            method: Method::Post,
            path: "/user",
        },
        Request {
            method: Method::Get,
            path: "/user?id=3f5h67s4s",
        },
    ]);

    let handlers = Handlers::on_next(|r: Request| println!("Handling {:?} {}", r.method, r.path))
        .with_error(|e| eprintln!("Request stream failed: {}", e))
        .with_complete(|| println!("Completed"));

    // Observables are cold so if you comment out the line bellow nothing will be emitted.
    let subscription = requests.subscribe(handlers);

    // The stream already completed; unsubscribing again has no effect.
    subscription.unsubscribe();
}
