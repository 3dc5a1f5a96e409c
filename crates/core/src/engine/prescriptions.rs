//! Prescription issuance and views.

use super::OrderEngine;
use crate::access::{require, Capability};
use crate::models::{NewPrescription, Prescription};
use crate::{DispensaryError, DispensaryResult};
use chrono::{Duration, Utc};
use dispensary_store::KeyValueStore;
use dispensary_types::{Caller, PrescriptionId, UserId};

impl<S: KeyValueStore> OrderEngine<S> {
    /// Issues a new prescription on behalf of a prescriber.
    ///
    /// The expiration date defaults to today plus the configured validity.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless the caller is a prescriber
    /// - `PatientNotFound` if the patient is not in the directory
    /// - `InvalidInput` if there are no line items, a quantity or duration is zero, or the
    ///   expiration date is not after the issue date
    /// - `MedicationNotFound` if an item names a medication not in the catalog
    /// - `DuplicateId` if the prescription id is taken
    pub async fn issue_prescription(
        &self,
        caller: &Caller,
        new: NewPrescription,
    ) -> DispensaryResult<Prescription> {
        require(caller, Capability::IssuePrescription)?;
        let _prescriptions = self.locks.prescriptions().await;
        let _inventory = self.locks.inventory().await;

        self.patients.require(&new.patient_id).await?;

        if new.items.is_empty() {
            return Err(DispensaryError::InvalidInput(
                "a prescription needs at least one item".into(),
            ));
        }
        for item in &new.items {
            if item.daily_quantity == 0 || item.duration_days == 0 {
                return Err(DispensaryError::InvalidInput(format!(
                    "daily quantity and duration of '{}' must be positive",
                    item.medication_id
                )));
            }
        }

        let catalog = self.inventory.list().await?;
        if let Some(missing) = new
            .items
            .iter()
            .find(|item| !catalog.iter().any(|m| m.id == item.medication_id))
        {
            return Err(DispensaryError::MedicationNotFound(
                missing.medication_id.clone(),
            ));
        }

        let issue_date = Utc::now();
        let expiration_date = new.expiration_date.unwrap_or_else(|| {
            issue_date + Duration::days(i64::from(self.config.prescription_validity_days()))
        });
        if expiration_date <= issue_date {
            return Err(DispensaryError::InvalidInput(
                "expiration date must be after the issue date".into(),
            ));
        }

        let prescription = Prescription {
            id: new.id,
            patient_id: new.patient_id,
            prescriber_id: caller.id.clone(),
            issue_date,
            expiration_date,
            items: new.items,
            is_used: false,
        };
        self.prescriptions.add(prescription.clone()).await?;

        tracing::info!(
            prescription = %prescription.id,
            patient = %prescription.patient_id,
            items = prescription.items.len(),
            "prescription issued"
        );
        Ok(prescription)
    }

    pub async fn list_prescriptions_for_patient(
        &self,
        patient_id: &UserId,
    ) -> DispensaryResult<Vec<Prescription>> {
        self.prescriptions.by_patient(patient_id).await
    }

    /// Prescriptions of `patient_id` that an order may still be created against.
    pub async fn list_orderable_prescriptions(
        &self,
        patient_id: &UserId,
    ) -> DispensaryResult<Vec<Prescription>> {
        let now = Utc::now();
        let mut prescriptions = self.prescriptions.by_patient(patient_id).await?;
        prescriptions.retain(|p| p.is_active_at(now));
        Ok(prescriptions)
    }

    pub async fn list_prescriptions_for_prescriber(
        &self,
        prescriber_id: &UserId,
    ) -> DispensaryResult<Vec<Prescription>> {
        self.prescriptions.by_prescriber(prescriber_id).await
    }

    pub async fn get_prescription(&self, id: &PrescriptionId) -> DispensaryResult<Prescription> {
        self.prescriptions.require(id).await
    }
}
