use chrono::{TimeZone, Timelike, Utc};
use pretty_assertions::assert_eq;
use storesync_cloud::SyncError;
use storesync_cloud::batch::{BatchAssembler, BatchId};
use storesync_cloud::types::CustomerPayload;
use storesync_types::EntityType;

fn payload(id: &str) -> CustomerPayload {
    CustomerPayload {
        id: id.into(),
        email_address: format!("{id}@ebizmarts.com"),
        first_name: String::new(),
        last_name: String::new(),
        opt_in_status: false,
        orders_count: 0,
        total_spent: 0.0,
        address: None,
        company: None,
    }
}

// --- Batch id ---

#[test]
fn batch_id_format() {
    let at = Utc
        .with_ymd_and_hms(2017, 5, 18, 14, 3, 9)
        .unwrap()
        .with_nanosecond(123_456_789)
        .unwrap();
    let id = BatchId::new(1, EntityType::Customer, at);
    assert_eq!(id.as_str(), "storeid-1_CUS_2017-05-18-14-03-09-12345600");
}

#[test]
fn batch_id_pads_small_fractions() {
    let at = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
    let id = BatchId::new(12, EntityType::Order, at);
    assert_eq!(id.to_string(), "storeid-12_ORD_2020-01-02-03-04-05-00000000");
}

// --- Assembly ---

#[test]
fn operation_ids_are_unique_within_a_run() {
    let mut assembler = BatchAssembler::new(BatchId::now(1, EntityType::Customer), "s1");
    let a = assembler.assemble(&payload("a")).unwrap();
    let b = assembler.assemble(&payload("b")).unwrap();
    assert_ne!(a.operation_id, b.operation_id);
    assert!(a.operation_id.starts_with(assembler.batch_id().as_str()));
}

#[test]
fn repeated_payload_id_is_rejected() {
    let mut assembler = BatchAssembler::new(BatchId::now(1, EntityType::Customer), "s1");
    assembler.assemble(&payload("a")).unwrap();

    let err = assembler.assemble(&payload("a")).unwrap_err();
    assert!(matches!(err, SyncError::DuplicateOperation(_)));
}

#[test]
fn failed_serialization_does_not_reserve_the_id() {
    let mut assembler = BatchAssembler::new(BatchId::now(1, EntityType::Customer), "s1");
    let mut broken = payload("a");
    broken.total_spent = f64::INFINITY;

    assert!(matches!(
        assembler.assemble(&broken).unwrap_err(),
        SyncError::Serialization(_)
    ));
    assert!(assembler.assemble(&payload("a")).is_ok());
}
