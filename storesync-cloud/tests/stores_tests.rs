mod support;

use chrono::Utc;
use pretty_assertions::assert_eq;
use storesync_cloud::settings;
use storesync_types::{BatchJob, BatchStatus, Scope};
use support::{API_KEY, Fixture, LIST_ID, REMOTE_STORE};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn pending_job(id: &str) -> BatchJob {
    BatchJob {
        batch_id: id.into(),
        remote_store_id: REMOTE_STORE.into(),
        magento_store_id: 1,
        status: BatchStatus::Pending,
        created_at: Utc::now(),
        modified_at: Utc::now(),
    }
}

fn store_settings(fx: &Fixture) {
    fx.configure();
    fx.set(settings::STORE_NAME, Scope::DEFAULT, "Main Store");
    fx.set(settings::STORE_EMAIL, Scope::DEFAULT, "owner@ebizmarts.com");
    fx.set(settings::DEFAULT_CURRENCY, Scope::DEFAULT, "EUR");
    fx.set(settings::BASE_URL, Scope::DEFAULT, "https://shop.ebizmarts.com/");
}

// --- Create ---

#[tokio::test]
async fn create_sends_store_from_scope_settings() {
    let fx = Fixture::start().await;
    store_settings(&fx);
    Mock::given(method("POST"))
        .and(path("/ecommerce/stores"))
        .and(body_json(serde_json::json!({
            "id": "new-store",
            "list_id": LIST_ID,
            "name": "Main Store",
            "platform": "Magento",
            "domain": "shop.ebizmarts.com",
            "email_address": "owner@ebizmarts.com",
            "currency_code": "EUR",
            "is_syncing": true
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "new-store"})),
        )
        .expect(1)
        .mount(&fx.server)
        .await;

    let store = fx.stores().create("new-store", None, Scope::DEFAULT).await.unwrap();
    assert_eq!(store.id, "new-store");
}

#[tokio::test]
async fn create_prefers_explicit_list() {
    let fx = Fixture::start().await;
    store_settings(&fx);
    Mock::given(method("POST"))
        .and(path("/ecommerce/stores"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "s", "list_id": "explicit"})),
        )
        .expect(1)
        .mount(&fx.server)
        .await;

    fx.stores()
        .create("s", Some("explicit"), Scope::DEFAULT)
        .await
        .unwrap();
    let requests = fx.server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["list_id"], "explicit");
}

#[tokio::test]
async fn create_with_placeholder_email_never_calls_remote() {
    let fx = Fixture::start().await;
    store_settings(&fx);
    fx.set(settings::STORE_EMAIL, Scope::DEFAULT, "owner@example.com");
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&fx.server)
        .await;

    let err = fx.stores().create("s", None, Scope::DEFAULT).await.unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("General Contact"));
}

#[tokio::test]
async fn create_without_api_key_or_list_is_config_error() {
    let fx = Fixture::start().await;
    let err = fx.stores().create("s", None, Scope::DEFAULT).await.unwrap_err();
    assert!(err.to_string().contains("You must provide a MailChimp API key"));

    fx.set(settings::API_KEY, Scope::DEFAULT, API_KEY);
    let err = fx.stores().create("s", None, Scope::DEFAULT).await.unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("lists configured"));
}

// --- Delete ---

#[tokio::test]
async fn delete_cancels_pending_jobs() {
    let fx = Fixture::start().await;
    fx.configure();
    fx.batch_jobs.insert(&pending_job("b1")).unwrap();
    let mut done = pending_job("b2");
    done.status = BatchStatus::Completed;
    fx.batch_jobs.insert(&done).unwrap();
    Mock::given(method("DELETE"))
        .and(path(format!("/ecommerce/stores/{REMOTE_STORE}")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&fx.server)
        .await;

    let canceled = fx.stores().delete(REMOTE_STORE, Scope::DEFAULT).await.unwrap();

    assert_eq!(canceled, 1);
    assert_eq!(fx.batch_jobs.get("b1").unwrap().unwrap().status, BatchStatus::Canceled);
    assert_eq!(fx.batch_jobs.get("b2").unwrap().unwrap().status, BatchStatus::Completed);
}

#[tokio::test]
async fn delete_cancels_pending_jobs_even_when_remote_fails() {
    let fx = Fixture::start().await;
    fx.configure();
    fx.batch_jobs.insert(&pending_job("b1")).unwrap();
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "title": "Internal Server Error",
            "status": 500,
            "detail": "try later"
        })))
        .mount(&fx.server)
        .await;

    let canceled = fx.stores().delete(REMOTE_STORE, Scope::DEFAULT).await.unwrap();

    assert_eq!(canceled, 1);
    assert!(fx.batch_jobs.list_by_status(BatchStatus::Pending).unwrap().is_empty());
}

// --- Edits ---

#[tokio::test]
async fn modify_name_patches_the_scope_store() {
    let fx = Fixture::start().await;
    fx.configure();
    Mock::given(method("PATCH"))
        .and(path(format!("/ecommerce/stores/{REMOTE_STORE}")))
        .and(body_json(serde_json::json!({"name": "Renamed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": REMOTE_STORE})))
        .expect(1)
        .mount(&fx.server)
        .await;

    fx.stores().modify_name("Renamed", Scope::DEFAULT).await;
}

#[tokio::test]
async fn connected_site_script_url_is_saved() {
    let fx = Fixture::start().await;
    fx.configure();
    Mock::given(method("GET"))
        .and(path(format!("/ecommerce/stores/{REMOTE_STORE}")))
        .and(query_param("fields", "connected_site"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "connected_site": {"site_script": {"url": "https://chimpstatic.com/mcjs.js"}}
        })))
        .mount(&fx.server)
        .await;

    let url = fx.stores().connected_site_script_url(Scope::store(1)).await;

    assert_eq!(url.as_deref(), Some("https://chimpstatic.com/mcjs.js"));
    assert_eq!(
        fx.settings.store().get(settings::JS_URL, Scope::store(1)).unwrap().as_deref(),
        Some("https://chimpstatic.com/mcjs.js")
    );
}

#[tokio::test]
async fn connected_site_failure_yields_none() {
    let fx = Fixture::start().await;
    fx.configure();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "title": "Resource Not Found", "status": 404
        })))
        .mount(&fx.server)
        .await;

    assert_eq!(fx.stores().connected_site_script_url(Scope::DEFAULT).await, None);
}

#[tokio::test]
async fn edit_is_syncing_writes_flag_where_store_id_is_defined() {
    let fx = Fixture::start().await;
    fx.configure();
    Mock::given(method("PATCH"))
        .and(path(format!("/ecommerce/stores/{REMOTE_STORE}")))
        .and(body_json(serde_json::json!({"is_syncing": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": REMOTE_STORE})))
        .expect(1)
        .mount(&fx.server)
        .await;

    fx.stores().edit_is_syncing(false, REMOTE_STORE, 1).await.unwrap();

    let store = fx.settings.store();
    assert_eq!(store.get(settings::IS_SYNCING, Scope::DEFAULT).unwrap().as_deref(), Some("0"));
    assert_eq!(store.get(settings::IS_SYNCING, Scope::store(1)).unwrap(), None);
}

#[tokio::test]
async fn edit_is_syncing_remote_failure_leaves_config_alone() {
    let fx = Fixture::start().await;
    fx.configure();
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "title": "Invalid Resource", "status": 400
        })))
        .mount(&fx.server)
        .await;

    let err = fx.stores().edit_is_syncing(true, REMOTE_STORE, 1).await.unwrap_err();

    assert!(err.is_remote());
    assert_eq!(fx.settings.store().get(settings::IS_SYNCING, Scope::DEFAULT).unwrap(), None);
}
