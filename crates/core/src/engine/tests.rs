use super::*;
use crate::models::{
    Medication, MedicationPatch, NewPrescription, Order, OrderDraft, OrderStatus, Patient,
    Pharmacy, PreparedItems, PrescribedItem, Prescription, StockSummary,
};
use crate::{DispensaryError, DispensaryResult, ErrorKind};
use chrono::{Duration, Utc};
use dispensary_store::{MemoryStore, StoreError, StoreResult};
use dispensary_types::{
    Caller, MedicationId, NonEmptyText, OrderId, PharmacyId, PrescriptionId, Role, UserId,
};
use std::collections::HashMap;
use std::sync::Mutex;

// ============================================================================
// FIXTURES
// ============================================================================

fn prescriber() -> Caller {
    Caller::new("u111", Role::Prescriber)
}

fn patient() -> Caller {
    Caller::new("u222", Role::Patient)
}

fn pharmacist() -> Caller {
    Caller::new("u333", Role::Pharmacist)
}

fn medication(id: &str, name: &str, stock: u32) -> Medication {
    Medication {
        id: MedicationId::from(id),
        name: NonEmptyText::new(name).unwrap(),
        dosage: NonEmptyText::new("500").unwrap(),
        form: NonEmptyText::new("Comprimé").unwrap(),
        manufacturer: None,
        stock_quantity: stock,
    }
}

fn item(id: &str, daily: u32, days: u32) -> PrescribedItem {
    PrescribedItem {
        medication_id: MedicationId::from(id),
        daily_quantity: daily,
        duration_days: days,
    }
}

fn draft(order_id: &str, prescription_id: &str) -> OrderDraft {
    OrderDraft {
        id: OrderId::from(order_id),
        prescription_id: PrescriptionId::from(prescription_id),
        pharmacy_id: PharmacyId::from("ph001"),
        delivery_address: None,
        notes: None,
    }
}

fn prepared(ids: &[&str]) -> PreparedItems {
    ids.iter().map(|id| (MedicationId::from(*id), true)).collect()
}

fn m001() -> MedicationId {
    MedicationId::from("m001")
}

fn c1() -> OrderId {
    OrderId::from("c1")
}

fn registered_patient(id: &str) -> Patient {
    Patient {
        id: UserId::from(id),
        name: NonEmptyText::new("Marie Dupont").unwrap(),
        email: None,
        phone: None,
    }
}

/// Catalog with `m001` at `stock`, pharmacy `ph001` staffed by `u333`, patient `u222`, and
/// prescription `p1` for `u222` needing 2 × 5 = 10 units of `m001`.
async fn setup<S: KeyValueStore>(store: Arc<S>, stock: u32) -> OrderEngine<S> {
    let engine = OrderEngine::new(store, Arc::new(CoreConfig::default()));
    engine
        .register_patient(&prescriber(), registered_patient("u222"))
        .await
        .unwrap();
    engine
        .add_medication(&pharmacist(), medication("m001", "Doliprane", stock))
        .await
        .unwrap();
    engine
        .register_pharmacy(
            &pharmacist(),
            Pharmacy {
                id: PharmacyId::from("ph001"),
                name: NonEmptyText::new("Pharmacie Centrale").unwrap(),
                address: NonEmptyText::new("12 avenue Foch").unwrap(),
                phone: None,
                pharmacist_ids: vec![UserId::from("u333")],
            },
        )
        .await
        .unwrap();
    issue(&engine, "p1", vec![item("m001", 2, 5)]).await;
    engine
}

async fn issue<S: KeyValueStore>(engine: &OrderEngine<S>, id: &str, items: Vec<PrescribedItem>) {
    engine
        .issue_prescription(
            &prescriber(),
            NewPrescription {
                id: PrescriptionId::from(id),
                patient_id: UserId::from("u222"),
                items,
                expiration_date: None,
            },
        )
        .await
        .unwrap();
}

async fn memory_engine(stock: u32) -> OrderEngine<MemoryStore> {
    setup(Arc::new(MemoryStore::new()), stock).await
}

async fn stock_of<S: KeyValueStore>(engine: &OrderEngine<S>, id: &str) -> u32 {
    engine
        .get_medication(&MedicationId::from(id))
        .await
        .unwrap()
        .stock_quantity
}

async fn move_to<S: KeyValueStore>(
    engine: &OrderEngine<S>,
    status: OrderStatus,
) -> DispensaryResult<Vec<Order>> {
    engine
        .update_order_status(&pharmacist(), &c1(), status, None)
        .await
}

/// Creates order `c1` for `p1` and marks `m001` prepared.
async fn prepared_order<S: KeyValueStore>(engine: &OrderEngine<S>) {
    engine.create_order(&patient(), draft("c1", "p1")).await.unwrap();
    engine
        .set_prepared_items(&pharmacist(), &c1(), prepared(&["m001"]))
        .await
        .unwrap();
}

/// Wraps a [`MemoryStore`] and fails writes to chosen keys once their budget is spent.
#[derive(Default)]
struct FaultyStore {
    inner: MemoryStore,
    write_budgets: Mutex<HashMap<String, usize>>,
}

impl FaultyStore {
    /// Allows `successes` more writes to `key`, then fails every later one.
    fn fail_writes_after(&self, key: &str, successes: usize) {
        self.write_budgets
            .lock()
            .unwrap()
            .insert(key.to_owned(), successes);
    }

    fn spend(&self, key: &str) -> StoreResult<()> {
        let mut budgets = self.write_budgets.lock().unwrap();
        match budgets.get_mut(key) {
            Some(0) => Err(StoreError::Io(std::io::Error::other(format!(
                "injected write failure on '{key}'"
            )))),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl KeyValueStore for FaultyStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        self.spend(key)?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.spend(key)?;
        self.inner.remove(key).await
    }

    async fn clear(&self) -> StoreResult<()> {
        self.inner.clear().await
    }
}

// ============================================================================
// ORDER LIFECYCLE
// ============================================================================

#[tokio::test]
async fn ready_deducts_and_return_restores() {
    let engine = memory_engine(100).await;

    let orders = engine.create_order(&patient(), draft("c1", "p1")).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Pending);
    assert!(orders[0].prepared_items.is_empty());
    assert!(engine
        .get_prescription(&PrescriptionId::from("p1"))
        .await
        .unwrap()
        .is_used);
    assert_eq!(stock_of(&engine, "m001").await, 100);

    engine
        .set_prepared_items(&pharmacist(), &c1(), prepared(&["m001"]))
        .await
        .unwrap();
    move_to(&engine, OrderStatus::Ready).await.unwrap();
    assert_eq!(stock_of(&engine, "m001").await, 90);

    let orders = move_to(&engine, OrderStatus::Returned).await.unwrap();
    assert_eq!(orders[0].status, OrderStatus::Returned);
    assert_eq!(stock_of(&engine, "m001").await, 100);
}

#[tokio::test]
async fn insufficient_stock_at_ready_changes_nothing() {
    let engine = memory_engine(100).await;
    prepared_order(&engine).await;
    engine.adjust_stock(&pharmacist(), &m001(), -95).await.unwrap();

    let err = move_to(&engine, OrderStatus::Ready).await.unwrap_err();
    match &err {
        DispensaryError::InsufficientStock {
            medication,
            needed,
            available,
            ..
        } => {
            assert_eq!(medication, &m001());
            assert_eq!(*needed, 10);
            assert_eq!(*available, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(stock_of(&engine, "m001").await, 5);
    assert_eq!(
        engine.get_order(&c1()).await.unwrap().status,
        OrderStatus::Pending
    );
}

#[tokio::test]
async fn ready_requires_every_item_prepared() {
    let engine = memory_engine(100).await;
    engine.create_order(&patient(), draft("c1", "p1")).await.unwrap();

    let err = move_to(&engine, OrderStatus::Ready).await.unwrap_err();
    assert!(matches!(
        err,
        DispensaryError::PreparationIncomplete { ref missing, .. } if missing == &vec![m001()]
    ));
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    assert_eq!(stock_of(&engine, "m001").await, 100);

    // Preparation supplied with the transition itself counts.
    engine
        .update_order_status(&pharmacist(), &c1(), OrderStatus::Ready, Some(prepared(&["m001"])))
        .await
        .unwrap();
    assert_eq!(stock_of(&engine, "m001").await, 90);
}

#[tokio::test]
async fn staying_in_deducted_states_never_deducts_twice() {
    let engine = memory_engine(100).await;
    prepared_order(&engine).await;

    move_to(&engine, OrderStatus::Ready).await.unwrap();
    move_to(&engine, OrderStatus::Collected).await.unwrap();
    move_to(&engine, OrderStatus::Ready).await.unwrap();
    move_to(&engine, OrderStatus::Collected).await.unwrap();
    assert_eq!(stock_of(&engine, "m001").await, 90);

    move_to(&engine, OrderStatus::Returned).await.unwrap();
    assert_eq!(stock_of(&engine, "m001").await, 100);
}

#[tokio::test]
async fn reversal_and_rededuction_are_symmetric() {
    let engine = memory_engine(100).await;
    prepared_order(&engine).await;

    move_to(&engine, OrderStatus::Ready).await.unwrap();
    move_to(&engine, OrderStatus::Pending).await.unwrap();
    assert_eq!(stock_of(&engine, "m001").await, 100);

    move_to(&engine, OrderStatus::InPreparation).await.unwrap();
    move_to(&engine, OrderStatus::Ready).await.unwrap();
    assert_eq!(stock_of(&engine, "m001").await, 90);
}

#[tokio::test]
async fn non_deducting_transitions_leave_stock_alone() {
    let engine = memory_engine(100).await;
    engine.create_order(&patient(), draft("c1", "p1")).await.unwrap();

    move_to(&engine, OrderStatus::InPreparation).await.unwrap();
    move_to(&engine, OrderStatus::Returned).await.unwrap();
    assert_eq!(stock_of(&engine, "m001").await, 100);
}

#[tokio::test]
async fn jumping_straight_to_collected_deducts() {
    let engine = memory_engine(100).await;
    prepared_order(&engine).await;

    move_to(&engine, OrderStatus::Collected).await.unwrap();
    assert_eq!(stock_of(&engine, "m001").await, 90);
}

#[tokio::test]
async fn multi_item_deduction_is_all_or_nothing() {
    let engine = memory_engine(100).await;
    engine
        .add_medication(&pharmacist(), medication("m002", "Amoxicilline", 50))
        .await
        .unwrap();
    issue(&engine, "p2", vec![item("m001", 1, 10), item("m002", 3, 10)]).await;

    engine.create_order(&patient(), draft("c1", "p2")).await.unwrap();
    engine.adjust_stock(&pharmacist(), &MedicationId::from("m002"), -25).await.unwrap();

    let err = engine
        .update_order_status(
            &pharmacist(),
            &c1(),
            OrderStatus::Ready,
            Some(prepared(&["m001", "m002"])),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DispensaryError::InsufficientStock { ref medication, needed: 30, available: 25, .. }
            if medication.as_str() == "m002"
    ));
    assert_eq!(stock_of(&engine, "m001").await, 100);
    assert_eq!(stock_of(&engine, "m002").await, 25);
}

#[tokio::test]
async fn return_with_deleted_medication_changes_nothing() {
    let engine = memory_engine(100).await;
    engine
        .add_medication(&pharmacist(), medication("m002", "Amoxicilline", 50))
        .await
        .unwrap();
    issue(&engine, "p2", vec![item("m001", 1, 10), item("m002", 2, 5)]).await;
    engine.create_order(&patient(), draft("c1", "p2")).await.unwrap();
    engine
        .update_order_status(
            &pharmacist(),
            &c1(),
            OrderStatus::Collected,
            Some(prepared(&["m001", "m002"])),
        )
        .await
        .unwrap();
    assert_eq!(stock_of(&engine, "m001").await, 90);

    engine
        .delete_medication(&pharmacist(), &MedicationId::from("m002"))
        .await
        .unwrap();

    let err = move_to(&engine, OrderStatus::Returned).await.unwrap_err();
    assert!(matches!(
        err,
        DispensaryError::MedicationUnavailable(ref id) if id.as_str() == "m002"
    ));
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    assert_eq!(stock_of(&engine, "m001").await, 90);
    assert_eq!(
        engine.get_order(&c1()).await.unwrap().status,
        OrderStatus::Collected
    );
}

#[tokio::test]
async fn restore_past_stock_ceiling_changes_nothing() {
    let engine = memory_engine(100).await;
    prepared_order(&engine).await;
    move_to(&engine, OrderStatus::Ready).await.unwrap();

    let near_max = u32::MAX - 5;
    engine
        .update_medication(
            &pharmacist(),
            &m001(),
            MedicationPatch {
                stock_quantity: Some(near_max),
                ..MedicationPatch::default()
            },
        )
        .await
        .unwrap();

    let err = move_to(&engine, OrderStatus::Pending).await.unwrap_err();
    assert!(matches!(err, DispensaryError::StockOverflow(ref id) if id == &m001()));
    assert_eq!(stock_of(&engine, "m001").await, near_max);
    assert_eq!(
        engine.get_order(&c1()).await.unwrap().status,
        OrderStatus::Ready
    );
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let engine = memory_engine(100).await;
    let err = move_to(&engine, OrderStatus::Ready).await.unwrap_err();
    assert!(matches!(err, DispensaryError::OrderNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn preparation_is_merged_and_limited_to_prescription() {
    let engine = memory_engine(100).await;
    engine
        .add_medication(&pharmacist(), medication("m002", "Amoxicilline", 50))
        .await
        .unwrap();
    issue(&engine, "p2", vec![item("m001", 1, 1), item("m002", 1, 1)]).await;
    engine.create_order(&patient(), draft("c1", "p2")).await.unwrap();

    engine
        .set_prepared_items(&pharmacist(), &c1(), prepared(&["m001"]))
        .await
        .unwrap();
    let order = engine
        .set_prepared_items(&pharmacist(), &c1(), prepared(&["m002"]))
        .await
        .unwrap();
    assert!(order.is_prepared(&m001()));
    assert!(order.is_prepared(&MedicationId::from("m002")));
    assert_eq!(order.status, OrderStatus::Pending);

    let err = engine
        .set_prepared_items(&pharmacist(), &c1(), prepared(&["m999"]))
        .await
        .unwrap_err();
    assert!(matches!(err, DispensaryError::NotInPrescription(_)));
}

// ============================================================================
// ORDER CREATION
// ============================================================================

#[tokio::test]
async fn prescription_is_single_use() {
    let engine = memory_engine(100).await;
    engine.create_order(&patient(), draft("c1", "p1")).await.unwrap();

    let err = engine
        .create_order(&patient(), draft("c2", "p1"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispensaryError::PrescriptionUsed(_)));
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    assert_eq!(engine.list_orders().await.unwrap().len(), 1);
}

#[tokio::test]
async fn expired_prescription_cannot_be_ordered() {
    let engine = memory_engine(100).await;
    let now = Utc::now();
    engine
        .prescriptions
        .add(Prescription {
            id: PrescriptionId::from("old"),
            patient_id: UserId::from("u222"),
            prescriber_id: UserId::from("u111"),
            issue_date: now - Duration::days(120),
            expiration_date: now - Duration::days(30),
            items: vec![item("m001", 1, 1)],
            is_used: false,
        })
        .await
        .unwrap();

    let err = engine
        .create_order(&patient(), draft("c1", "old"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispensaryError::PrescriptionExpired { .. }));

    let orderable = engine
        .list_orderable_prescriptions(&UserId::from("u222"))
        .await
        .unwrap();
    let ids: Vec<_> = orderable.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["p1"]);
}

#[tokio::test]
async fn used_is_reported_before_expired() {
    let engine = memory_engine(100).await;
    let now = Utc::now();
    engine
        .prescriptions
        .add(Prescription {
            id: PrescriptionId::from("spent"),
            patient_id: UserId::from("u222"),
            prescriber_id: UserId::from("u111"),
            issue_date: now - Duration::days(120),
            expiration_date: now - Duration::days(30),
            items: vec![item("m001", 1, 1)],
            is_used: true,
        })
        .await
        .unwrap();

    let err = engine
        .create_order(&patient(), draft("c1", "spent"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispensaryError::PrescriptionUsed(_)));
}

#[tokio::test]
async fn creation_checks_catalog_then_stock() {
    let engine = memory_engine(100).await;
    let now = Utc::now();
    engine
        .prescriptions
        .add(Prescription {
            id: PrescriptionId::from("p9"),
            patient_id: UserId::from("u222"),
            prescriber_id: UserId::from("u111"),
            issue_date: now,
            expiration_date: now + Duration::days(10),
            items: vec![item("m001", 100, 100), item("m404", 1, 1)],
            is_used: false,
        })
        .await
        .unwrap();

    let err = engine
        .create_order(&patient(), draft("c1", "p9"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispensaryError::MedicationUnavailable(ref id) if id.as_str() == "m404"));

    issue(&engine, "p3", vec![item("m001", 30, 5)]).await;
    let err = engine
        .create_order(&patient(), draft("c1", "p3"))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "insufficient stock for Doliprane (m001): need 150, have 100"
    );
    assert!(!engine
        .get_prescription(&PrescriptionId::from("p3"))
        .await
        .unwrap()
        .is_used);
}

#[tokio::test]
async fn missing_prescription_and_pharmacy_are_not_found() {
    let engine = memory_engine(100).await;

    let err = engine
        .create_order(&patient(), draft("c1", "nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispensaryError::PrescriptionNotFound(_)));

    let mut elsewhere = draft("c1", "p1");
    elsewhere.pharmacy_id = PharmacyId::from("ph404");
    let err = engine.create_order(&patient(), elsewhere).await.unwrap_err();
    assert!(matches!(err, DispensaryError::PharmacyNotFound(_)));
    assert!(!engine
        .get_prescription(&PrescriptionId::from("p1"))
        .await
        .unwrap()
        .is_used);
}

#[tokio::test]
async fn concurrent_creates_yield_one_order() {
    let engine = Arc::new(memory_engine(100).await);

    let first = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.create_order(&patient(), draft("c1", "p1")).await })
    };
    let second = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.create_order(&patient(), draft("c2", "p1")).await })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(DispensaryError::PrescriptionUsed(_)))));
    assert_eq!(engine.list_orders().await.unwrap().len(), 1);
}

// ============================================================================
// ACCESS
// ============================================================================

#[tokio::test]
async fn roles_are_enforced() {
    let engine = memory_engine(100).await;

    let err = engine
        .create_order(&pharmacist(), draft("c1", "p1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let stranger = Caller::new("u999", Role::Patient);
    let err = engine
        .create_order(&stranger, draft("c1", "p1"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispensaryError::NotPrescriptionOwner(_)));

    engine.create_order(&patient(), draft("c1", "p1")).await.unwrap();
    let err = engine
        .update_order_status(&patient(), &c1(), OrderStatus::Ready, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = engine
        .adjust_stock(&prescriber(), &m001(), 10)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(stock_of(&engine, "m001").await, 100);
}

// ============================================================================
// INVENTORY
// ============================================================================

#[tokio::test]
async fn delete_blocked_by_active_prescription() {
    let engine = memory_engine(100).await;

    let err = engine
        .delete_medication(&pharmacist(), &m001())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DispensaryError::MedicationInUsePrescription { count: 1, .. }
    ));
    assert_eq!(err.kind(), ErrorKind::ReferentialBlock);

    issue(&engine, "p2", vec![item("m001", 1, 1)]).await;
    let err = engine
        .delete_medication(&pharmacist(), &m001())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DispensaryError::MedicationInUsePrescription { count: 2, .. }
    ));
}

#[tokio::test]
async fn delete_blocked_until_orders_finish() {
    let engine = memory_engine(100).await;
    prepared_order(&engine).await;

    let err = engine
        .delete_medication(&pharmacist(), &m001())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DispensaryError::MedicationInPendingOrder { count: 1, .. }
    ));

    move_to(&engine, OrderStatus::Collected).await.unwrap();
    let catalog = engine.delete_medication(&pharmacist(), &m001()).await.unwrap();
    assert!(catalog.is_empty());
}

#[tokio::test]
async fn delete_of_unreferenced_medication_succeeds() {
    let engine = memory_engine(100).await;
    engine
        .add_medication(&pharmacist(), medication("m002", "Amoxicilline", 0))
        .await
        .unwrap();

    let catalog = engine
        .delete_medication(&pharmacist(), &MedicationId::from("m002"))
        .await
        .unwrap();
    assert_eq!(catalog.len(), 1);

    let err = engine
        .delete_medication(&pharmacist(), &MedicationId::from("m002"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispensaryError::MedicationNotFound(_)));
}

#[tokio::test]
async fn adjust_stock_clamps_at_zero() {
    let engine = memory_engine(8).await;
    engine.adjust_stock(&pharmacist(), &m001(), -20).await.unwrap();
    assert_eq!(stock_of(&engine, "m001").await, 0);
    engine.adjust_stock(&pharmacist(), &m001(), 7).await.unwrap();
    assert_eq!(stock_of(&engine, "m001").await, 7);
}

#[tokio::test]
async fn stock_summary_uses_configured_bands() {
    let engine = memory_engine(100).await;
    engine
        .add_medication(&pharmacist(), medication("m002", "Amoxicilline", 3))
        .await
        .unwrap();
    engine
        .add_medication(&pharmacist(), medication("m003", "Ventoline", 20))
        .await
        .unwrap();

    assert_eq!(
        engine.stock_summary().await.unwrap(),
        StockSummary {
            low: 1,
            medium: 1,
            good: 1
        }
    );
}

// ============================================================================
// PRESCRIPTIONS AND PHARMACIES
// ============================================================================

#[tokio::test]
async fn issued_prescription_defaults() {
    let engine = memory_engine(100).await;
    let p1 = engine
        .get_prescription(&PrescriptionId::from("p1"))
        .await
        .unwrap();

    assert_eq!(p1.prescriber_id, UserId::from("u111"));
    assert!(!p1.is_used);
    assert_eq!((p1.expiration_date - p1.issue_date).num_days(), 90);

    let by_prescriber = engine
        .list_prescriptions_for_prescriber(&UserId::from("u111"))
        .await
        .unwrap();
    assert_eq!(by_prescriber.len(), 1);
}

#[tokio::test]
async fn issue_validates_items() {
    let engine = memory_engine(100).await;
    let new = |items| NewPrescription {
        id: PrescriptionId::from("p2"),
        patient_id: UserId::from("u222"),
        items,
        expiration_date: None,
    };

    let err = engine
        .issue_prescription(&prescriber(), new(vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = engine
        .issue_prescription(&prescriber(), new(vec![item("m001", 0, 5)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = engine
        .issue_prescription(&prescriber(), new(vec![item("m404", 1, 5)]))
        .await
        .unwrap_err();
    assert!(matches!(err, DispensaryError::MedicationNotFound(_)));

    let err = engine
        .issue_prescription(&patient(), new(vec![item("m001", 1, 5)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let mut dup = new(vec![item("m001", 1, 5)]);
    dup.id = PrescriptionId::from("p1");
    let err = engine
        .issue_prescription(&prescriber(), dup)
        .await
        .unwrap_err();
    assert!(matches!(err, DispensaryError::DuplicateId { .. }));
}

#[tokio::test]
async fn prescriptions_need_a_registered_patient() {
    let engine = memory_engine(100).await;
    let new = NewPrescription {
        id: PrescriptionId::from("p2"),
        patient_id: UserId::from("u404"),
        items: vec![item("m001", 1, 5)],
        expiration_date: None,
    };

    let err = engine
        .issue_prescription(&prescriber(), new.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, DispensaryError::PatientNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = engine
        .register_patient(&pharmacist(), registered_patient("u404"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    engine
        .register_patient(&prescriber(), registered_patient("u404"))
        .await
        .unwrap();
    engine.issue_prescription(&prescriber(), new).await.unwrap();

    assert_eq!(engine.list_patients().await.unwrap().len(), 2);
    assert!(engine.get_patient(&UserId::from("u999")).await.is_err());
}

#[tokio::test]
async fn pharmacist_sees_orders_of_linked_pharmacies() {
    let engine = memory_engine(100).await;
    engine.create_order(&patient(), draft("c1", "p1")).await.unwrap();

    let mine = engine
        .list_orders_for_pharmacist(&UserId::from("u333"))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);

    let none = engine
        .list_orders_for_pharmacist(&UserId::from("u999"))
        .await
        .unwrap();
    assert!(none.is_empty());

    assert_eq!(
        engine
            .list_orders_for_patient(&UserId::from("u222"))
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        engine
            .list_orders_by_status(OrderStatus::Pending)
            .await
            .unwrap()
            .len(),
        1
    );
}

// ============================================================================
// COMPENSATION
// ============================================================================

#[tokio::test]
async fn failed_mark_used_removes_the_order() {
    let store = Arc::new(FaultyStore::default());
    let engine = setup(Arc::clone(&store), 100).await;
    store.fail_writes_after("ordonnances", 0);

    let err = engine
        .create_order(&patient(), draft("c1", "p1"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispensaryError::Store(_)));
    assert!(engine.list_orders().await.unwrap().is_empty());
    assert!(!engine
        .get_prescription(&PrescriptionId::from("p1"))
        .await
        .unwrap()
        .is_used);
}

#[tokio::test]
async fn failed_compensation_reports_both_errors() {
    let store = Arc::new(FaultyStore::default());
    let engine = setup(Arc::clone(&store), 100).await;
    store.fail_writes_after("ordonnances", 0);
    store.fail_writes_after("commandes", 1);

    let err = engine
        .create_order(&patient(), draft("c1", "p1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DispensaryError::RollbackFailed {
            operation: "create order",
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Storage);
}

#[tokio::test]
async fn failed_status_write_restores_stock() {
    let store = Arc::new(FaultyStore::default());
    let engine = setup(Arc::clone(&store), 100).await;
    prepared_order(&engine).await;
    store.fail_writes_after("commandes", 0);

    let err = move_to(&engine, OrderStatus::Ready).await.unwrap_err();
    assert!(matches!(err, DispensaryError::Store(_)));
    assert_eq!(stock_of(&engine, "m001").await, 100);
    assert_eq!(
        engine.get_order(&c1()).await.unwrap().status,
        OrderStatus::Pending
    );
}
