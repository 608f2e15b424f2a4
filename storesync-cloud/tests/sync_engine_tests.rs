mod support;

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use storesync_cloud::SyncConfig;
use storesync_cloud::settings;
use storesync_cloud::sync_engine::create_sync_engine;
use storesync_types::{BatchStatus, EntityType, Scope};
use support::{Fixture, REMOTE_STORE};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn mount_batches(fx: &Fixture, remote_id: &str) {
    Mock::given(method("POST"))
        .and(path("/batches"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": remote_id, "status": "pending"})),
        )
        .mount(&fx.server)
        .await;
}

// --- Single store ---

#[tokio::test]
async fn submitted_batch_is_recorded_as_pending_job() {
    let fx = Fixture::start().await;
    fx.configure();
    fx.add_customer(1, "a@x.com", 1);
    fx.add_customer(2, "b@x.com", 1);
    mount_batches(&fx, "remote-1").await;

    let report = fx.sync().sync_customers(1).await.unwrap();

    assert_eq!(report.submitted, 2);
    assert_eq!(report.remote_batch_id.as_deref(), Some("remote-1"));
    let job = fx.batch_jobs.get("remote-1").unwrap().unwrap();
    assert_eq!(job.status, BatchStatus::Pending);
    assert_eq!(job.remote_store_id, REMOTE_STORE);
    assert_eq!(job.magento_store_id, 1);

    let requests = fx.server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["operations"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn nothing_pending_sends_nothing() {
    let fx = Fixture::start().await;
    fx.configure();
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&fx.server)
        .await;

    let report = fx.sync().sync_customers(1).await.unwrap();
    assert_eq!(report.submitted, 0);
    assert_eq!(report.remote_batch_id, None);
}

#[tokio::test]
async fn failed_submission_repends_the_batch() {
    let fx = Fixture::start().await;
    fx.configure();
    fx.add_customer(1, "a@x.com", 1);
    Mock::given(method("POST"))
        .and(path("/batches"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&fx.server)
        .await;

    let err = fx.sync().sync_customers(1).await.unwrap_err();
    assert!(err.is_remote());

    let record = fx.sync_data.get(1, EntityType::Customer, REMOTE_STORE).unwrap().unwrap();
    assert!(record.sync_modified);
    assert!(record.sync_error.unwrap().contains("503"));
    assert!(fx.batch_jobs.list_by_status(BatchStatus::Pending).unwrap().is_empty());
}

#[tokio::test]
async fn missing_api_key_touches_nothing() {
    let fx = Fixture::start().await;
    fx.set(settings::REMOTE_STORE_ID, Scope::DEFAULT, REMOTE_STORE);
    fx.add_customer(1, "a@x.com", 1);

    let err = fx.sync().sync_customers(1).await.unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(fx.sync_data.count(EntityType::Customer, REMOTE_STORE).unwrap(), 0);
}

// --- Multiple stores ---

#[tokio::test]
async fn sync_all_runs_every_store() {
    let fx = Fixture::start().await;
    fx.configure();
    fx.set(settings::REMOTE_STORE_ID, Scope::store(2), "second-store");
    fx.add_customer(1, "a@x.com", 1);
    fx.add_customer(2, "b@x.com", 2);
    mount_batches(&fx, "remote-x").await;

    let results = fx.sync().sync_all(&[1, 2]).await;

    assert_eq!(results.len(), 2);
    let reports: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(reports[0].remote_store_id, REMOTE_STORE);
    assert_eq!(reports[1].remote_store_id, "second-store");
    assert!(reports.iter().all(|r| r.submitted == 1));
}

// --- Engine loop ---

#[tokio::test]
async fn engine_syncs_on_demand_and_stops() {
    let fx = Fixture::start().await;
    fx.configure();
    fx.add_customer(1, "a@x.com", 1);
    mount_batches(&fx, "remote-1").await;

    let config = SyncConfig {
        store_ids: vec![1],
        sync_interval_secs: 3600,
        ..fx.config()
    };
    let (handle, mut engine) = create_sync_engine(Arc::new(fx.sync()), &config);
    let task = tokio::spawn(async move { engine.run().await });

    handle.sync_now().await.unwrap();
    handle.stop().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();

    assert!(fx.batch_jobs.get("remote-1").unwrap().is_some());
    assert!(handle.sync_now().await.is_err());
}

#[tokio::test]
async fn engine_stops_when_handles_drop() {
    let fx = Fixture::start().await;
    let (handle, mut engine) = create_sync_engine(Arc::new(fx.sync()), &fx.config());
    let task = tokio::spawn(async move { engine.run().await });

    drop(handle);
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
}
