use crate::error::handler::HandlerError;
use crate::events::EventSource;

use std::future::{Ready, ready};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

fn recorder(
    log: &Arc<Mutex<Vec<String>>>,
    label: &'static str,
) -> impl Fn(u32) -> Ready<Result<(), HandlerError>> + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |value| {
        log.lock().unwrap().push(format!("{label}:{value}"));
        ready(Ok(()))
    }
}

/// **VALUE**: Subscribers run in registration order, one after another.
///
/// **BUG THIS CATCHES**: Concurrent fan-out that reorders state transitions
/// between listeners.
#[tokio::test]
async fn given_two_subscribers_when_publishing_then_called_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let source = EventSource::new("test");
    let _first = source.subscribe(recorder(&log, "first"));
    let _second = source.subscribe(recorder(&log, "second"));

    source.publish(1).await;
    source.publish(2).await;

    assert_eq!(
        *log.lock().unwrap(),
        vec!["first:1", "second:1", "first:2", "second:2"]
    );
}

/// **VALUE**: One failing subscriber does not starve the others.
///
/// **BUG THIS CATCHES**: `?`-style early return inside publish.
#[tokio::test]
async fn given_failing_subscriber_when_publishing_then_later_subscribers_still_run() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let source = EventSource::new("test");
    let _failing = source.subscribe(|_: u32| async { Err(HandlerError::failed("boom")) });
    let _after = source.subscribe(recorder(&log, "after"));

    source.publish(7).await;

    assert_eq!(*log.lock().unwrap(), vec!["after:7"]);
}

#[tokio::test]
async fn given_dropped_subscription_when_publishing_then_callback_not_called() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let source = EventSource::new("test");
    let kept = source.subscribe(recorder(&log, "kept"));
    let dropped = source.subscribe(recorder(&log, "dropped"));

    drop(dropped);
    source.publish(3).await;
    kept.unsubscribe();
    source.publish(4).await;

    assert_eq!(*log.lock().unwrap(), vec!["kept:3"]);
    assert_eq!(source.subscriber_count(), 0);
}

#[tokio::test]
async fn given_detached_publish_when_awaited_later_then_value_delivered() {
    let (sender, mut received) = mpsc::unbounded_channel();
    let source = EventSource::new("test");
    let _sub = source.subscribe(move |value: String| {
        let sender = sender.clone();
        async move {
            sender
                .send(value)
                .map_err(|e| HandlerError::failed(e.to_string()))
        }
    });

    source.publish_detached("hello".to_string());

    let value = tokio::time::timeout(Duration::from_secs(1), received.recv())
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("hello"));
}

#[test]
fn given_clone_when_subscribing_then_original_sees_subscriber() {
    let source: EventSource<u32> = EventSource::new("test");
    let clone = source.clone();

    let _sub = clone.subscribe(|_| async { Ok::<(), HandlerError>(()) });

    assert_eq!(source.subscriber_count(), 1);
}
