use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;

use super::{Broker, BrokerSettings};
use crate::http::request::X_IN_REPLY_TO;
use crate::http::response::{X_REPLY_ID, X_WH_DELAY_SECS, X_WH_FROM};

const CALLER: &str = "192.0.2.10:5000";
const CONSUMER: &str = "127.0.0.1:6000";

fn settings(wait_ms: u64) -> BrokerSettings {
    BrokerSettings {
        long_poll_wait: Duration::from_millis(wait_ms),
        show_debug_info: true,
        ..BrokerSettings::default()
    }
}

fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

fn webhook(body: &'static str) -> Request<Body> {
    Request::post("/webhook/")
        .header("content-type", "application/json")
        .header("x-github-event", "push")
        .body(Body::from(body))
        .unwrap()
}

fn reply(id: &str, body: &'static str) -> Request<Body> {
    Request::post("/reply")
        .header(X_IN_REPLY_TO, id)
        .body(Body::from(body))
        .unwrap()
}

fn spawn_ingress(broker: &Arc<Broker>, body: &'static str) -> tokio::task::JoinHandle<Response> {
    let broker = Arc::clone(broker);
    tokio::spawn(async move { broker.ingress(addr(CALLER), webhook(body)).await })
}

async fn text(res: Response) -> String {
    let body = to_bytes(res.into_body(), 1 << 20).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

fn reply_id(res: &Response) -> String {
    res.headers()[X_REPLY_ID].to_str().unwrap().to_string()
}

#[tokio::test]
async fn webhook_poll_reply_round_trip() {
    let broker = Arc::new(Broker::new(settings(2_000)));
    let caller = spawn_ingress(&broker, r#"{"ref":"main"}"#);

    let delivery = broker.egress(addr(CONSUMER)).await;
    assert_eq!(delivery.status(), StatusCode::OK);
    let id = reply_id(&delivery);
    assert_eq!(id.len(), 36);
    assert_eq!(delivery.headers()["content-type"], "application/json");
    assert_eq!(delivery.headers()["x-whheader-x-github-event"], "push");
    assert_eq!(delivery.headers()[X_WH_FROM], CALLER);
    assert!(delivery.headers().contains_key(X_WH_DELAY_SECS));
    assert_eq!(text(delivery).await, r#"{"ref":"main"}"#);

    let consumer = {
        let broker = Arc::clone(&broker);
        let id = id.clone();
        tokio::spawn(async move { broker.reply(addr(CONSUMER), reply(&id, "thanks")).await })
    };

    let answer = caller.await.unwrap();
    assert_eq!(answer.status(), StatusCode::OK);
    assert_eq!(text(answer).await, "thanks");

    let ack = consumer.await.unwrap();
    assert_eq!(ack.status(), StatusCode::OK);
    assert!(broker.registry().is_empty());
}

#[tokio::test]
async fn unanswered_webhook_times_out_with_try_later() {
    let broker = Arc::new(Broker::new(settings(50)));
    let started = Instant::now();

    let res = broker.ingress(addr(CALLER), webhook("hello")).await;

    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(text(res).await, "Timed out");
    assert!(broker.registry().is_empty());
}

#[tokio::test]
async fn debug_info_off_sends_empty_try_later() {
    let broker = Broker::new(BrokerSettings {
        show_debug_info: false,
        try_later: StatusCode::TOO_MANY_REQUESTS,
        ..settings(20)
    });

    let res = broker.ingress(addr(CALLER), webhook("hello")).await;

    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(text(res).await.is_empty());
}

async fn until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached");
}

#[tokio::test]
async fn overloaded_broker_rejects_immediately() {
    let broker = Arc::new(Broker::new(BrokerSettings {
        max_pending: 1,
        ..settings(2_000)
    }));
    let first = spawn_ingress(&broker, "first");
    until(|| broker.queue().len() == 1).await;

    let started = Instant::now();
    let res = broker.ingress(addr(CALLER), webhook("second")).await;

    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(text(res).await, "Too busy");
    assert_eq!(broker.registry().len(), 1);
    assert_eq!(broker.queue().len(), 1);

    let delivery = broker.egress(addr(CONSUMER)).await;
    let id = reply_id(&delivery);
    assert_eq!(text(delivery).await, "first");

    let consumer = {
        let broker = Arc::clone(&broker);
        tokio::spawn(async move { broker.reply(addr(CONSUMER), reply(&id, "ok")).await })
    };
    let answer = first.await.unwrap();
    assert_eq!(answer.status(), StatusCode::OK);
    assert_eq!(text(answer).await, "ok");
    assert_eq!(consumer.await.unwrap().status(), StatusCode::OK);
}

#[tokio::test]
async fn full_queue_answers_try_later_after_one_wait() {
    let broker = Arc::new(Broker::new(BrokerSettings {
        backlog: 1,
        try_later: StatusCode::TOO_MANY_REQUESTS,
        ..settings(100)
    }));
    let first = spawn_ingress(&broker, "fills the queue");
    until(|| broker.queue().len() == 1).await;

    let started = Instant::now();
    let res = broker.ingress(addr(CALLER), webhook("no room")).await;

    assert!(started.elapsed() >= Duration::from_millis(100));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(text(res).await, "Queue full");

    assert_eq!(first.await.unwrap().status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(broker.registry().is_empty());
}

#[tokio::test]
async fn idle_poll_returns_no_content() {
    let broker = Broker::new(settings(30));

    let res = broker.egress(addr(CONSUMER)).await;

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(text(res).await.is_empty());
}

#[tokio::test]
async fn abandoned_session_is_not_delivered() {
    let broker = Arc::new(Broker::new(settings(50)));

    let res = broker.ingress(addr(CALLER), webhook("stale")).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(broker.queue().len(), 1);

    let poll = broker.egress(addr(CONSUMER)).await;

    assert_eq!(poll.status(), StatusCode::NO_CONTENT);
    assert!(broker.queue().is_empty());
}

#[tokio::test]
async fn reply_to_unknown_session_is_rejected() {
    let broker = Broker::new(settings(50));

    let res = broker
        .reply(addr(CONSUMER), reply("7c9e6679-7425-40de-944b-e07fc1f90ae7", "late"))
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(text(res).await.contains("X-InReplyTo not found"));
}

#[tokio::test]
async fn each_session_goes_to_one_consumer() {
    let broker = Arc::new(Broker::new(settings(500)));
    let first = spawn_ingress(&broker, "one");
    let second = spawn_ingress(&broker, "two");

    let polls: Vec<_> = (0..2)
        .map(|_| {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move { broker.egress(addr(CONSUMER)).await })
        })
        .collect();

    let mut ids = Vec::new();
    let mut bodies = Vec::new();
    for poll in polls {
        let res = poll.await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        ids.push(reply_id(&res));
        bodies.push(text(res).await);
    }
    ids.sort();
    ids.dedup();
    bodies.sort();
    assert_eq!(ids.len(), 2);
    assert_eq!(bodies, ["one", "two"]);

    assert_eq!(
        broker.egress(addr(CONSUMER)).await.status(),
        StatusCode::NO_CONTENT
    );
    first.await.unwrap();
    second.await.unwrap();
}

#[tokio::test]
async fn autoreply_answers_caller_and_still_delivers() {
    let broker = Arc::new(Broker::new(BrokerSettings {
        autoreply: true,
        ..settings(2_000)
    }));
    let started = Instant::now();

    let res = broker.ingress(addr(CALLER), webhook("fire and forget")).await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(res.status(), StatusCode::OK);
    assert!(text(res).await.is_empty());

    let delivery = broker.egress(addr(CONSUMER)).await;
    assert_eq!(delivery.status(), StatusCode::OK);
    assert_eq!(text(delivery).await, "fire and forget");
}

#[tokio::test]
async fn autoreply_rejects_oversized_webhook() {
    let broker = Broker::new(BrokerSettings {
        autoreply: true,
        max_payload: 4,
        ..settings(2_000)
    });

    let res = broker.ingress(addr(CALLER), webhook("far too long")).await;

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(text(res).await.contains("exceeds"));
    assert!(broker.queue().is_empty());
}

#[tokio::test]
async fn oversized_webhook_fails_the_caller() {
    let broker = Arc::new(Broker::new(BrokerSettings {
        max_payload: 4,
        ..settings(2_000)
    }));
    let caller = spawn_ingress(&broker, "far too long");

    let delivery = broker.egress(addr(CONSUMER)).await;
    assert_eq!(delivery.status(), StatusCode::OK);
    assert!(to_bytes(delivery.into_body(), 1 << 20).await.is_err());

    let answer = caller.await.unwrap();
    assert_eq!(answer.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(text(answer).await.contains("delivery to poll client failed"));
}

#[tokio::test]
async fn oversized_reply_reports_failure_to_consumer() {
    let broker = Arc::new(Broker::new(BrokerSettings {
        max_payload: 8,
        ..settings(2_000)
    }));
    let caller = spawn_ingress(&broker, "ping");

    let delivery = broker.egress(addr(CONSUMER)).await;
    let id = reply_id(&delivery);
    text(delivery).await;

    let consumer = {
        let broker = Arc::clone(&broker);
        tokio::spawn(async move {
            broker
                .reply(addr(CONSUMER), reply(&id, "a reply well over eight bytes"))
                .await
        })
    };

    let answer = caller.await.unwrap();
    assert_eq!(answer.status(), StatusCode::OK);
    assert!(to_bytes(answer.into_body(), 1 << 20).await.is_err());

    let ack = consumer.await.unwrap();
    assert_eq!(ack.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(text(ack).await, "Unable to send reply successfully");
}
