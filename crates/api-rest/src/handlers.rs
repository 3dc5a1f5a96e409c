//! Endpoint handlers.
//!
//! Handlers translate HTTP into engine calls and back; all business rules live in the engine.
//! Every endpoint except `/health` needs a caller identity, and patients only see their own
//! prescriptions, orders and directory entry.

use crate::caller::CallerIdentity;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use dispensary_core::models::{
    Medication, MedicationPatch, NewPrescription, Order, OrderDraft, OrderStatus, Patient,
    Pharmacy, PreparedItems, Prescription, StockLevel, StockSummary,
};
use dispensary_store::KeyValueStore;
use dispensary_types::{Caller, MedicationId, OrderId, PharmacyId, PrescriptionId, Role, UserId};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

pub async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Dispensary REST API is alive".into(),
    })
}

/// Narrows a `?patient=` filter to the caller when the caller is a patient.
fn patient_scope(caller: &Caller, requested: Option<String>) -> ApiResult<Option<String>> {
    if caller.role != Role::Patient {
        return Ok(requested);
    }
    match requested {
        Some(other) if other != caller.id.as_str() => Err(ApiError::forbidden(
            "patients can only view their own records",
        )),
        _ => Ok(Some(caller.id.to_string())),
    }
}

fn ensure_visible(caller: &Caller, patient_id: &UserId) -> ApiResult<()> {
    if caller.role == Role::Patient && &caller.id != patient_id {
        return Err(ApiError::forbidden(
            "patients can only view their own records",
        ));
    }
    Ok(())
}

// ============================================================================
// MEDICATIONS
// ============================================================================

#[derive(Deserialize)]
pub struct MedicationQuery {
    pub search: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationView {
    #[serde(flatten)]
    pub medication: Medication,
    pub stock_level: StockLevel,
}

#[derive(Deserialize)]
pub struct StockAdjustment {
    pub delta: i64,
}

pub async fn list_medications<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: CallerIdentity,
    Query(query): Query<MedicationQuery>,
) -> ApiResult<Json<Vec<MedicationView>>> {
    let engine = &state.engine;
    let medications = match query.search {
        Some(search) => engine.search_medications(&search).await?,
        None => engine.list_medications().await?,
    };
    let views = medications
        .into_iter()
        .map(|medication| MedicationView {
            stock_level: engine.stock_level(&medication),
            medication,
        })
        .collect();
    Ok(Json(views))
}

pub async fn get_medication<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<Json<Medication>> {
    Ok(Json(
        state.engine.get_medication(&MedicationId::from(id)).await?,
    ))
}

pub async fn add_medication<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    CallerIdentity(caller): CallerIdentity,
    Json(medication): Json<Medication>,
) -> ApiResult<(StatusCode, Json<Vec<Medication>>)> {
    let catalog = state.engine.add_medication(&caller, medication).await?;
    Ok((StatusCode::CREATED, Json(catalog)))
}

pub async fn update_medication<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
    Json(patch): Json<MedicationPatch>,
) -> ApiResult<Json<Vec<Medication>>> {
    let catalog = state
        .engine
        .update_medication(&caller, &MedicationId::from(id), patch)
        .await?;
    Ok(Json(catalog))
}

pub async fn delete_medication<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Medication>>> {
    let catalog = state
        .engine
        .delete_medication(&caller, &MedicationId::from(id))
        .await?;
    Ok(Json(catalog))
}

pub async fn adjust_stock<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
    Json(body): Json<StockAdjustment>,
) -> ApiResult<StatusCode> {
    state
        .engine
        .adjust_stock(&caller, &MedicationId::from(id), body.delta)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stock_summary<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: CallerIdentity,
) -> ApiResult<Json<StockSummary>> {
    Ok(Json(state.engine.stock_summary().await?))
}

// ============================================================================
// PRESCRIPTIONS
// ============================================================================

#[derive(Deserialize)]
pub struct PrescriptionQuery {
    pub patient: Option<String>,
    pub prescriber: Option<String>,
    #[serde(default)]
    pub orderable: bool,
}

pub async fn issue_prescription<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    CallerIdentity(caller): CallerIdentity,
    Json(new): Json<NewPrescription>,
) -> ApiResult<(StatusCode, Json<Prescription>)> {
    let prescription = state.engine.issue_prescription(&caller, new).await?;
    Ok((StatusCode::CREATED, Json(prescription)))
}

pub async fn list_prescriptions<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    CallerIdentity(caller): CallerIdentity,
    Query(query): Query<PrescriptionQuery>,
) -> ApiResult<Json<Vec<Prescription>>> {
    let engine = &state.engine;
    let patient = patient_scope(&caller, query.patient)?;
    let prescriptions = match (patient, query.prescriber) {
        (Some(patient), _) if query.orderable => {
            engine
                .list_orderable_prescriptions(&UserId::from(patient))
                .await?
        }
        (Some(patient), _) => {
            engine
                .list_prescriptions_for_patient(&UserId::from(patient))
                .await?
        }
        (None, Some(prescriber)) => {
            engine
                .list_prescriptions_for_prescriber(&UserId::from(prescriber))
                .await?
        }
        (None, None) => {
            return Err(ApiError::bad_request(
                "either 'patient' or 'prescriber' must be given",
            ))
        }
    };
    Ok(Json(prescriptions))
}

pub async fn get_prescription<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<Json<Prescription>> {
    let prescription = state
        .engine
        .get_prescription(&PrescriptionId::from(id))
        .await?;
    ensure_visible(&caller, &prescription.patient_id)?;
    Ok(Json(prescription))
}

// ============================================================================
// PATIENTS
// ============================================================================

pub async fn list_patients<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    CallerIdentity(caller): CallerIdentity,
) -> ApiResult<Json<Vec<Patient>>> {
    if caller.role == Role::Patient {
        return Err(ApiError::forbidden(
            "patients cannot browse the patient directory",
        ));
    }
    Ok(Json(state.engine.list_patients().await?))
}

pub async fn get_patient<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<Json<Patient>> {
    let id = UserId::from(id);
    ensure_visible(&caller, &id)?;
    Ok(Json(state.engine.get_patient(&id).await?))
}

pub async fn register_patient<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    CallerIdentity(caller): CallerIdentity,
    Json(patient): Json<Patient>,
) -> ApiResult<(StatusCode, Json<Vec<Patient>>)> {
    let patients = state.engine.register_patient(&caller, patient).await?;
    Ok((StatusCode::CREATED, Json(patients)))
}

// ============================================================================
// PHARMACIES
// ============================================================================

pub async fn list_pharmacies<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: CallerIdentity,
) -> ApiResult<Json<Vec<Pharmacy>>> {
    Ok(Json(state.engine.list_pharmacies().await?))
}

pub async fn register_pharmacy<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    CallerIdentity(caller): CallerIdentity,
    Json(pharmacy): Json<Pharmacy>,
) -> ApiResult<(StatusCode, Json<Vec<Pharmacy>>)> {
    let pharmacies = state.engine.register_pharmacy(&caller, pharmacy).await?;
    Ok((StatusCode::CREATED, Json(pharmacies)))
}

// ============================================================================
// ORDERS
// ============================================================================

#[derive(Deserialize)]
pub struct OrderQuery {
    pub patient: Option<String>,
    pub pharmacy: Option<String>,
    pub pharmacist: Option<String>,
    pub status: Option<OrderStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: OrderStatus,
    #[serde(default)]
    pub prepared_items: Option<PreparedItems>,
}

pub async fn list_orders<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    CallerIdentity(caller): CallerIdentity,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Json<Vec<Order>>> {
    let engine = &state.engine;
    let mut orders = if let Some(patient) = patient_scope(&caller, query.patient)? {
        engine.list_orders_for_patient(&UserId::from(patient)).await?
    } else if let Some(pharmacy) = query.pharmacy {
        engine
            .list_orders_for_pharmacy(&PharmacyId::from(pharmacy))
            .await?
    } else if let Some(pharmacist) = query.pharmacist {
        engine
            .list_orders_for_pharmacist(&UserId::from(pharmacist))
            .await?
    } else if let Some(status) = query.status {
        engine.list_orders_by_status(status).await?
    } else {
        engine.list_orders().await?
    };
    if let Some(status) = query.status {
        orders.retain(|order| order.status == status);
    }
    Ok(Json(orders))
}

pub async fn get_order<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    let order = state.engine.get_order(&OrderId::from(id)).await?;
    ensure_visible(&caller, &order.patient_id)?;
    Ok(Json(order))
}

pub async fn create_order<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    CallerIdentity(caller): CallerIdentity,
    Json(draft): Json<OrderDraft>,
) -> ApiResult<(StatusCode, Json<Vec<Order>>)> {
    let orders = state.engine.create_order(&caller, draft).await?;
    Ok((StatusCode::CREATED, Json(orders)))
}

pub async fn update_order_status<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
    Json(change): Json<StatusChange>,
) -> ApiResult<Json<Vec<Order>>> {
    let orders = state
        .engine
        .update_order_status(
            &caller,
            &OrderId::from(id),
            change.status,
            change.prepared_items,
        )
        .await?;
    Ok(Json(orders))
}

pub async fn set_prepared_items<S: KeyValueStore + 'static>(
    State(state): State<AppState<S>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
    Json(items): Json<PreparedItems>,
) -> ApiResult<Json<Order>> {
    let order = state
        .engine
        .set_prepared_items(&caller, &OrderId::from(id), items)
        .await?;
    Ok(Json(order))
}
