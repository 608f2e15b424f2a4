mod support;

use pretty_assertions::assert_eq;
use storesync_cloud::batch::BatchId;
use storesync_cloud::settings;
use storesync_cloud::tracker::OptInCache;
use storesync_types::{EntityType, Scope};
use support::{Fixture, REMOTE_STORE};

// --- Success / update ---

#[tokio::test]
async fn record_success_settles_the_record() {
    let fx = Fixture::start().await;
    let batch = BatchId::now(1, EntityType::Customer);
    fx.tracker()
        .record_success(9, EntityType::Customer, REMOTE_STORE, &batch)
        .unwrap();

    let record = fx.sync_data.get(9, EntityType::Customer, REMOTE_STORE).unwrap().unwrap();
    assert!(record.sync_delta.is_some());
    assert!(!record.sync_modified);
    assert_eq!(record.sync_error, None);
    assert_eq!(record.batch_id.as_deref(), Some(batch.as_str()));
    assert!(!record.is_pending());
}

#[tokio::test]
async fn record_update_flags_existing_record_and_keeps_batch() {
    let fx = Fixture::start().await;
    fx.configure();
    let batch = BatchId::now(1, EntityType::Customer);
    fx.tracker()
        .record_success(9, EntityType::Customer, REMOTE_STORE, &batch)
        .unwrap();

    assert!(fx.tracker().record_update(9, EntityType::Customer, 1).unwrap());

    let record = fx.sync_data.get(9, EntityType::Customer, REMOTE_STORE).unwrap().unwrap();
    assert!(record.sync_modified);
    assert_eq!(record.batch_id.as_deref(), Some(batch.as_str()));
}

#[tokio::test]
async fn record_update_ignores_untracked_entities() {
    let fx = Fixture::start().await;
    fx.configure();

    assert!(!fx.tracker().record_update(9, EntityType::Customer, 1).unwrap());
    assert_eq!(fx.sync_data.get(9, EntityType::Customer, REMOTE_STORE).unwrap(), None);
}

#[tokio::test]
async fn record_update_without_remote_store_is_config_error() {
    let fx = Fixture::start().await;
    let err = fx.tracker().record_update(9, EntityType::Customer, 1).unwrap_err();
    assert!(err.is_configuration());
}

// --- Batch failure ---

#[tokio::test]
async fn batch_failure_repends_only_that_batch() {
    let fx = Fixture::start().await;
    let failed = BatchId::new(1, EntityType::Customer, chrono::Utc::now());
    let other = BatchId::new(2, EntityType::Customer, chrono::Utc::now());
    let tracker = fx.tracker();
    tracker.record_success(1, EntityType::Customer, REMOTE_STORE, &failed).unwrap();
    tracker.record_success(2, EntityType::Customer, REMOTE_STORE, &failed).unwrap();
    tracker.record_success(3, EntityType::Customer, REMOTE_STORE, &other).unwrap();

    assert_eq!(tracker.record_batch_failure(&failed, "HTTP 500").unwrap(), 2);

    let one = fx.sync_data.get(1, EntityType::Customer, REMOTE_STORE).unwrap().unwrap();
    assert!(one.sync_modified);
    assert_eq!(one.sync_error.as_deref(), Some("HTTP 500"));
    assert!(one.is_pending());
    let three = fx.sync_data.get(3, EntityType::Customer, REMOTE_STORE).unwrap().unwrap();
    assert!(!three.sync_modified);
}

// --- Opt-in cache ---

#[tokio::test]
async fn opt_in_is_read_once_per_store() {
    let fx = Fixture::start().await;
    fx.set(settings::CUSTOMERS_OPT_IN, Scope::store(1), "1");

    let mut cache = OptInCache::new();
    assert!(cache.is_opted_in(&fx.settings, 1).unwrap());
    assert!(!cache.is_opted_in(&fx.settings, 2).unwrap());

    // Later config changes are not seen by the same cache.
    fx.set(settings::CUSTOMERS_OPT_IN, Scope::store(1), "0");
    assert!(cache.is_opted_in(&fx.settings, 1).unwrap());
    assert_eq!(cache.len(), 2);

    assert!(!OptInCache::new().is_opted_in(&fx.settings, 1).unwrap());
}

#[tokio::test]
async fn opt_in_falls_back_to_default_scope() {
    let fx = Fixture::start().await;
    fx.set(settings::CUSTOMERS_OPT_IN, Scope::DEFAULT, "1");
    assert!(OptInCache::new().is_opted_in(&fx.settings, 4).unwrap());
}
