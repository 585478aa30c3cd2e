use crate::{
    app,
    callback::{CallbackConfig, CallbackNotifier, CallbackOutcome},
    error::{KitchenError, StoreError},
    lifecycle::{CompletionOutcome, KitchenOrderLifecycle, PrepSettings},
    model::KitchenOrder,
    schedule::{CompletionScheduler, PrepDelay},
    store::{InMemoryKitchenOrderStore, KitchenOrderStore},
};
use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    routing::post,
};
use core::time::Duration;
use galley_core::{KitchenStatus, wire::CALLBACK_SECRET_HEADER};
use serde_json::{Value, json};
use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::{net::TcpListener, runtime::Handle, sync::mpsc};
use uuid::Uuid;

/// Store whose every call can be made to fail on demand.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryKitchenOrderStore,
    failing: AtomicBool,
}

impl FlakyStore {
    fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection reset".into()))
        } else {
            Ok(())
        }
    }
}

impl KitchenOrderStore for FlakyStore {
    fn insert(&self, order: KitchenOrder) -> Result<KitchenOrder, StoreError> {
        self.check()?;
        self.inner.insert(order)
    }

    fn find(&self, id: Uuid) -> Result<Option<KitchenOrder>, StoreError> {
        self.check()?;
        self.inner.find(id)
    }

    fn find_by_source_order(&self, source_order_id: Uuid) -> Result<Vec<KitchenOrder>, StoreError> {
        self.check()?;
        self.inner.find_by_source_order(source_order_id)
    }

    fn update<T, E, F>(&self, id: Uuid, apply: F) -> Result<Option<T>, E>
    where
        F: FnOnce(&mut KitchenOrder) -> Result<T, E>,
        E: From<StoreError>,
    {
        self.check()?;
        self.inner.update(id, apply)
    }

    fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.delete(id)
    }
}

fn lifecycle_with<S: KitchenOrderStore>(
    store: Arc<S>,
    notifier: Option<CallbackNotifier>,
    prep: PrepSettings,
) -> Arc<KitchenOrderLifecycle<S>> {
    Arc::new(KitchenOrderLifecycle::new(
        store,
        Arc::new(CompletionScheduler::with_handle(Handle::current())),
        notifier,
        prep,
    ))
}

fn manual_prep() -> PrepSettings {
    PrepSettings {
        delay: PrepDelay::new(1, 1),
        enabled: false,
    }
}

fn notifier(url_template: String, secret: Option<&str>, timeout: Duration) -> CallbackNotifier {
    CallbackNotifier::new(CallbackConfig {
        url_template,
        secret: secret.map(str::to_owned),
        timeout,
    })
    .unwrap()
}

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// An address nothing is listening on.
async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn ready_template(addr: SocketAddr) -> String {
    format!("http://{addr}/internal/orders/{{orderId}}/kitchen-ready?kitchenOrderId={{kitchenOrderId}}")
}

// ===== Timer =====

#[tokio::test(start_paused = true)]
async fn timer_marks_open_order_ready_within_bounds() {
    let lifecycle = lifecycle_with(
        Arc::new(InMemoryKitchenOrderStore::new()),
        None,
        PrepSettings {
            delay: PrepDelay::new(2, 4),
            enabled: true,
        },
    );
    let order = lifecycle.create(Uuid::new_v4(), "[]".into()).unwrap();

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(lifecycle.find(order.id).unwrap().status, KitchenStatus::Preparing);

    tokio::time::sleep(Duration::from_secs(3)).await;
    let ready = lifecycle.find(order.id).unwrap();
    assert_eq!(ready.status, KitchenStatus::Ready);
    assert!(ready.updated_at.is_some());
    assert_eq!(lifecycle.scheduler().pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_before_timer_makes_timer_a_no_op() {
    let lifecycle = lifecycle_with(
        Arc::new(InMemoryKitchenOrderStore::new()),
        None,
        PrepSettings {
            delay: PrepDelay::new(5, 5),
            enabled: true,
        },
    );
    let order = lifecycle.create(Uuid::new_v4(), "[]".into()).unwrap();
    let cancelled = lifecycle.cancel_order(order.id).unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(lifecycle.scheduler().pending(), 0);
    let after = lifecycle.find(order.id).unwrap();
    assert_eq!(after.status, KitchenStatus::Cancelled);
    assert_eq!(after.updated_at, cancelled.updated_at);
}

#[tokio::test(start_paused = true)]
async fn timer_leaves_settled_orders_alone() {
    let lifecycle = lifecycle_with(
        Arc::new(InMemoryKitchenOrderStore::new()),
        None,
        PrepSettings {
            delay: PrepDelay::new(5, 5),
            enabled: true,
        },
    );
    let order = lifecycle.create(Uuid::new_v4(), "[]".into()).unwrap();
    lifecycle.update_status(order.id, KitchenStatus::Ready).unwrap();
    let served = lifecycle.update_status(order.id, KitchenStatus::Served).unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(lifecycle.find(order.id).unwrap(), served);
}

#[tokio::test(start_paused = true)]
async fn timer_for_deleted_order_stops_silently() {
    let lifecycle = lifecycle_with(
        Arc::new(InMemoryKitchenOrderStore::new()),
        None,
        PrepSettings {
            delay: PrepDelay::new(1, 1),
            enabled: true,
        },
    );
    let order = lifecycle.create(Uuid::new_v4(), "[]".into()).unwrap();
    lifecycle.delete(order.id).unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(lifecycle.scheduler().pending(), 0);
    assert!(lifecycle.store().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn timer_and_cancel_never_both_win() {
    let lifecycle = lifecycle_with(
        Arc::new(InMemoryKitchenOrderStore::new()),
        None,
        manual_prep(),
    );

    for _ in 0..64 {
        let order = lifecycle.create(Uuid::new_v4(), "[]".into()).unwrap();
        let timer = {
            let lifecycle = Arc::clone(&lifecycle);
            tokio::spawn(async move { lifecycle.complete_order(order.id).await })
        };
        let cancel = {
            let lifecycle = Arc::clone(&lifecycle);
            tokio::spawn(async move { lifecycle.cancel_order(order.id) })
        };
        let completion = timer.await.unwrap();
        let cancelled = cancel.await.unwrap();
        let final_status = lifecycle.find(order.id).unwrap().status;

        match cancelled {
            Ok(_) => {
                assert_eq!(completion, CompletionOutcome::Skipped(KitchenStatus::Cancelled));
                assert_eq!(final_status, KitchenStatus::Cancelled);
            }
            Err(err) => {
                assert!(matches!(err, KitchenError::InvalidTransition { .. }));
                assert!(matches!(completion, CompletionOutcome::Ready { .. }));
                assert_eq!(final_status, KitchenStatus::Ready);
            }
        }
    }
}

// ===== Store failures =====

#[tokio::test]
async fn store_failures_propagate_from_create_and_are_swallowed_by_timer() {
    let store = Arc::new(FlakyStore::default());
    let lifecycle = lifecycle_with(Arc::clone(&store), None, manual_prep());

    store.fail(true);
    let err = lifecycle.create(Uuid::new_v4(), "[]".into()).unwrap_err();
    assert!(matches!(err, KitchenError::Store(StoreError::Unavailable(_))));
    assert_eq!(lifecycle.scheduler().pending(), 0);

    store.fail(false);
    let order = lifecycle.create(Uuid::new_v4(), "[]".into()).unwrap();

    store.fail(true);
    let outcome = lifecycle.complete_order(order.id).await;
    assert!(matches!(outcome, CompletionOutcome::Failed(ref msg) if msg.contains("connection reset")));

    store.fail(false);
    assert_eq!(lifecycle.find(order.id).unwrap().status, KitchenStatus::Preparing);
}

// ===== Callback =====

type Captured = (String, Option<String>);

async fn capture_ready(
    State(tx): State<mpsc::UnboundedSender<Captured>>,
    uri: Uri,
    headers: HeaderMap,
) -> StatusCode {
    let secret = headers
        .get(CALLBACK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let _ = tx.send((uri.to_string(), secret));
    StatusCode::OK
}

#[tokio::test]
async fn ready_callback_carries_ids_and_secret() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let addr = serve(
        Router::new()
            .route("/internal/orders/{order_id}/kitchen-ready", post(capture_ready))
            .with_state(tx),
    )
    .await;

    let lifecycle = lifecycle_with(
        Arc::new(InMemoryKitchenOrderStore::new()),
        Some(notifier(ready_template(addr), Some("s3cret"), Duration::from_secs(5))),
        manual_prep(),
    );
    let source = Uuid::new_v4();
    let order = lifecycle.create(source, "[]".into()).unwrap();

    let outcome = lifecycle.complete_order(order.id).await;
    let CompletionOutcome::Ready { callback, .. } = outcome else {
        panic!("expected ready, got {outcome:?}");
    };
    assert_eq!(callback, Some(CallbackOutcome::Delivered(200)));

    let (uri, secret) = rx.recv().await.unwrap();
    assert_eq!(
        uri,
        format!("/internal/orders/{source}/kitchen-ready?kitchenOrderId={}", order.id)
    );
    assert_eq!(secret.as_deref(), Some("s3cret"));
}

#[tokio::test]
async fn rejected_callback_keeps_order_ready() {
    let addr = serve(Router::new().route(
        "/internal/orders/{order_id}/kitchen-ready",
        post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    ))
    .await;
    let lifecycle = lifecycle_with(
        Arc::new(InMemoryKitchenOrderStore::new()),
        Some(notifier(ready_template(addr), None, Duration::from_secs(5))),
        manual_prep(),
    );
    let order = lifecycle.create(Uuid::new_v4(), "[]".into()).unwrap();

    let outcome = lifecycle.complete_order(order.id).await;
    assert!(matches!(
        outcome,
        CompletionOutcome::Ready {
            callback: Some(CallbackOutcome::Rejected(503)),
            ..
        }
    ));
    assert_eq!(lifecycle.find(order.id).unwrap().status, KitchenStatus::Ready);
}

#[tokio::test]
async fn unreachable_callback_target_does_not_roll_back_ready() {
    let addr = dead_addr().await;
    let lifecycle = lifecycle_with(
        Arc::new(InMemoryKitchenOrderStore::new()),
        Some(notifier(ready_template(addr), None, Duration::from_secs(2))),
        manual_prep(),
    );
    let order = lifecycle.create(Uuid::new_v4(), "[]".into()).unwrap();

    let outcome = lifecycle.complete_order(order.id).await;
    assert!(matches!(
        outcome,
        CompletionOutcome::Ready {
            callback: Some(CallbackOutcome::Failed(_)),
            ..
        }
    ));
    assert_eq!(lifecycle.find(order.id).unwrap().status, KitchenStatus::Ready);
}

#[tokio::test]
async fn callback_timeout_does_not_roll_back_ready() {
    let addr = serve(Router::new().route(
        "/internal/orders/{order_id}/kitchen-ready",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK
        }),
    ))
    .await;
    let lifecycle = lifecycle_with(
        Arc::new(InMemoryKitchenOrderStore::new()),
        Some(notifier(ready_template(addr), None, Duration::from_secs(1))),
        manual_prep(),
    );
    let order = lifecycle.create(Uuid::new_v4(), "[]".into()).unwrap();

    let outcome = lifecycle.complete_order(order.id).await;
    assert!(matches!(
        outcome,
        CompletionOutcome::Ready {
            callback: Some(CallbackOutcome::Failed(_)),
            ..
        }
    ));
    assert_eq!(lifecycle.find(order.id).unwrap().status, KitchenStatus::Ready);
}

// ===== HTTP =====

async fn serve_kitchen<S: KitchenOrderStore>(lifecycle: Arc<KitchenOrderLifecycle<S>>) -> String {
    format!("http://{}", serve(app(lifecycle)).await)
}

#[tokio::test]
async fn http_create_then_read_back() {
    let lifecycle = lifecycle_with(
        Arc::new(InMemoryKitchenOrderStore::new()),
        None,
        manual_prep(),
    );
    let base = serve_kitchen(lifecycle).await;
    let client = reqwest::Client::new();
    let source = Uuid::new_v4();

    let res = client
        .post(format!("{base}/orders"))
        .json(&json!({ "sourceOrderId": source, "itemsPayload": "[{\"name\":\"soup\"}]" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let location = res.headers()[reqwest::header::LOCATION]
        .to_str()
        .unwrap()
        .to_owned();
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["status"], "PREPARING");
    assert_eq!(created["sourceOrderId"], source.to_string());
    assert_eq!(location, format!("/orders/{}", created["id"].as_str().unwrap()));

    let fetched: Value = client
        .get(format!("{base}{location}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, created);

    let listed: Value = client
        .get(format!("{base}/orders/by-order/{source}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed, json!([created]));
}

#[tokio::test]
async fn http_create_accepts_legacy_field_names_and_requires_source() {
    let lifecycle = lifecycle_with(
        Arc::new(InMemoryKitchenOrderStore::new()),
        None,
        manual_prep(),
    );
    let base = serve_kitchen(lifecycle).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/orders"))
        .json(&json!({ "orderId": Uuid::new_v4(), "itemsJson": "[]" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);

    let res = client
        .post(format!("{base}/orders"))
        .json(&json!({ "itemsPayload": "[]" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Validation failed");
    assert!(body["errors"]["sourceOrderId"].is_string());
}

#[tokio::test]
async fn http_status_updates_map_errors_to_codes() {
    let lifecycle = lifecycle_with(
        Arc::new(InMemoryKitchenOrderStore::new()),
        None,
        manual_prep(),
    );
    let order = lifecycle.create(Uuid::new_v4(), "[]".into()).unwrap();
    let base = serve_kitchen(lifecycle).await;
    let client = reqwest::Client::new();
    let status_url = format!("{base}/orders/{}/status", order.id);

    let res = client
        .put(&status_url)
        .json(&json!({ "status": "in_progress" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "IN_PROGRESS");
    assert!(body["updatedAt"].is_string());

    let res = client
        .put(&status_url)
        .json(&json!({ "status": "NEW" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("Invalid status transition from IN_PROGRESS to NEW")
    );

    let res = client
        .put(&status_url)
        .json(&json!({ "status": "SIMMERING" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert!(body["errors"]["status"].is_string());

    let res = client
        .put(format!("{base}/orders/{}/status", Uuid::new_v4()))
        .json(&json!({ "status": "READY" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_cancel_then_delete() {
    let lifecycle = lifecycle_with(
        Arc::new(InMemoryKitchenOrderStore::new()),
        None,
        manual_prep(),
    );
    let order = lifecycle.create(Uuid::new_v4(), "[]".into()).unwrap();
    let base = serve_kitchen(Arc::clone(&lifecycle)).await;
    let client = reqwest::Client::new();
    let cancel_url = format!("{base}/orders/{}/cancel", order.id);

    let res = client.post(&cancel_url).send().await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    assert!(res.bytes().await.unwrap().is_empty());

    let res = client.post(&cancel_url).send().await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("already cancelled"));

    let res = client
        .post(format!("{base}/orders/{}/cancel", Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

    let res = client
        .delete(format!("{base}/orders/{}", order.id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NO_CONTENT);
    assert!(lifecycle.store().is_empty());

    let res = client
        .get(format!("{base}/orders/{}", order.id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_store_failure_is_a_generic_500() {
    let store = Arc::new(FlakyStore::default());
    let lifecycle = lifecycle_with(Arc::clone(&store), None, manual_prep());
    let order = lifecycle.create(Uuid::new_v4(), "[]".into()).unwrap();
    let base = serve_kitchen(lifecycle).await;

    store.fail(true);
    let res = reqwest::get(format!("{base}/orders/{}", order.id))
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Internal server error");
    assert!(!body.to_string().contains("connection reset"));
}

#[tokio::test]
async fn http_malformed_requests_get_json_validation_errors() {
    let lifecycle = lifecycle_with(
        Arc::new(InMemoryKitchenOrderStore::new()),
        None,
        manual_prep(),
    );
    let order = lifecycle.create(Uuid::new_v4(), "[]".into()).unwrap();
    let base = serve_kitchen(lifecycle).await;
    let client = reqwest::Client::new();

    let cases = [
        (
            client
                .post(format!("{base}/orders"))
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body("{not json"),
            "body",
        ),
        (
            client
                .put(format!("{base}/orders/{}/status", order.id))
                .json(&json!({ "status": 5 })),
            "body",
        ),
        (
            client.post(format!("{base}/orders")).body("{}"),
            "body",
        ),
        (
            client
                .put(format!("{base}/orders/not-a-uuid/status"))
                .json(&json!({ "status": "READY" })),
            "path",
        ),
        (client.get(format!("{base}/orders/by-order/42")), "path"),
    ];
    for (request, field) in cases {
        let res = request.send().await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(
            res.headers()[reqwest::header::CONTENT_TYPE],
            "application/json"
        );
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], "Validation failed");
        assert!(body["errors"][field].is_string(), "{body}");
    }
}
