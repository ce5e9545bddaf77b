//! Latest-event delivery and overrun integration tests.
//!
//! Observers run on their own threads over a ChannelConnection; the test
//! thread publishes and inspects what each client received.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use orrery_bus::{BusConfig, BusError, NotificationBus, ObserverExit, PublishOutcome};
use orrery_test_utils::{channel_connection, wait_until};
use serde::Serialize;

// ── Helpers ─────────────────────────────────────────────────────

const WAIT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct Event {
    seq: u32,
}

fn fast_bus() -> Arc<NotificationBus> {
    Arc::new(NotificationBus::new(BusConfig {
        wake_interval: Duration::from_millis(20),
        ..BusConfig::default()
    }))
}

// ── Tests ───────────────────────────────────────────────────────

#[test]
fn double_publish_overruns_and_observer_sees_only_latest() {
    let bus = fast_bus();
    let (mut conn, mut client) = channel_connection();
    // Hold the observer in its first probe so both publishes land before
    // it ever looks at the topic.
    client.pause();
    let observer = {
        let bus = Arc::clone(&bus);
        thread::spawn(move || bus.subscribe("world/1/status-watch", &mut conn))
    };
    wait_until(WAIT, || bus.observer_count("world/1/status-watch") == 1);

    let first = bus.publish("world/1/status-watch", &Event { seq: 1 }).unwrap();
    assert_eq!(
        first,
        PublishOutcome::Delivered {
            counter: 1,
            observers: 1
        }
    );
    let second = bus.publish("world/1/status-watch", &Event { seq: 2 });
    assert_eq!(
        second,
        Err(BusError::Overrun {
            topic: "world/1/status-watch".into(),
            pending: 1
        })
    );

    client.resume();
    assert_eq!(client.recv_timeout(WAIT).as_deref(), Some(r#"{"seq":2}"#));

    client.disconnect();
    assert_eq!(observer.join().unwrap().unwrap(), ObserverExit::Disconnected);
    assert!(client.drain().is_empty(), "latest event delivered exactly once");
    assert!(client.is_closed());
    assert!(bus.topics().is_empty());
}

#[test]
fn acknowledged_publishes_do_not_overrun() {
    let bus = fast_bus();
    let (mut conn, mut client) = channel_connection();
    let observer = {
        let bus = Arc::clone(&bus);
        thread::spawn(move || bus.subscribe("t", &mut conn))
    };
    wait_until(WAIT, || bus.observer_count("t") == 1);

    for seq in 1..=5 {
        bus.publish("t", &Event { seq }).unwrap();
        let got = client.recv_timeout(WAIT).unwrap();
        assert_eq!(got, format!(r#"{{"seq":{seq}}}"#));
    }

    client.disconnect();
    observer.join().unwrap().unwrap();
}

#[test]
fn late_observer_receives_current_event() {
    let bus = fast_bus();
    let (mut first_conn, mut first) = channel_connection();
    let first_observer = {
        let bus = Arc::clone(&bus);
        thread::spawn(move || bus.subscribe("t", &mut first_conn))
    };
    wait_until(WAIT, || bus.observer_count("t") == 1);
    bus.publish("t", &Event { seq: 7 }).unwrap();
    assert!(first.recv_timeout(WAIT).is_some());

    let (mut late_conn, mut late) = channel_connection();
    let late_observer = {
        let bus = Arc::clone(&bus);
        thread::spawn(move || bus.subscribe("t", &mut late_conn))
    };
    assert_eq!(late.recv_timeout(WAIT).as_deref(), Some(r#"{"seq":7}"#));
    assert_eq!(bus.observer_count("t"), 2);

    first.disconnect();
    late.disconnect();
    first_observer.join().unwrap().unwrap();
    late_observer.join().unwrap().unwrap();
}

#[test]
fn inbound_message_ends_passive_watch() {
    let bus = fast_bus();
    let (mut conn, client) = channel_connection();
    let observer = {
        let bus = Arc::clone(&bus);
        thread::spawn(move || bus.subscribe("t", &mut conn))
    };
    wait_until(WAIT, || bus.observer_count("t") == 1);
    client.send("hello");
    assert_eq!(observer.join().unwrap().unwrap(), ObserverExit::PeerMessage);
    assert_eq!(bus.observer_count("t"), 0);
}

#[test]
fn shutdown_disconnects_every_topic() {
    let bus = Arc::new(NotificationBus::new(BusConfig {
        wake_interval: Duration::from_secs(60),
        ..BusConfig::default()
    }));
    let mut clients = Vec::new();
    let mut observers = Vec::new();
    for topic in ["a", "b", "b"] {
        let (mut conn, client) = channel_connection();
        let bus = Arc::clone(&bus);
        clients.push(client);
        observers.push(thread::spawn(move || bus.subscribe(topic, &mut conn)));
    }
    wait_until(WAIT, || {
        bus.observer_count("a") == 1 && bus.observer_count("b") == 2
    });
    assert_eq!(bus.topics(), vec!["a".to_string(), "b".to_string()]);

    bus.shutdown();
    for observer in observers {
        assert_eq!(observer.join().unwrap().unwrap(), ObserverExit::TopicStopped);
    }
    assert!(bus.topics().is_empty());
    assert_eq!(
        bus.publish("a", &Event { seq: 1 }).unwrap(),
        PublishOutcome::NoObservers
    );
}
