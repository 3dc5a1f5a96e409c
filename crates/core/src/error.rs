use chrono::{DateTime, Utc};
use dispensary_store::StoreError;
use dispensary_types::{MedicationId, OrderId, PharmacyId, PrescriptionId, Role, UserId};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum DispensaryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("a {kind} with id '{id}' already exists")]
    DuplicateId { kind: &'static str, id: String },
    #[error("role '{role}' is not allowed to {action}")]
    Forbidden { role: Role, action: &'static str },
    #[error("prescription '{0}' belongs to another patient")]
    NotPrescriptionOwner(PrescriptionId),

    #[error("prescription '{0}' not found")]
    PrescriptionNotFound(PrescriptionId),
    #[error("order '{0}' not found")]
    OrderNotFound(OrderId),
    #[error("medication '{0}' not found")]
    MedicationNotFound(MedicationId),
    #[error("pharmacy '{0}' not found")]
    PharmacyNotFound(PharmacyId),
    #[error("patient '{0}' not found")]
    PatientNotFound(UserId),

    #[error("prescription '{0}' has already been used for an order")]
    PrescriptionUsed(PrescriptionId),
    #[error("prescription '{id}' expired on {expired_at}")]
    PrescriptionExpired {
        id: PrescriptionId,
        expired_at: DateTime<Utc>,
    },
    #[error("medication '{0}' is no longer available in the catalog")]
    MedicationUnavailable(MedicationId),
    #[error("order '{order}' cannot be marked ready: {} item(s) not prepared ({})", missing.len(), join_ids(missing))]
    PreparationIncomplete {
        order: OrderId,
        missing: Vec<MedicationId>,
    },
    #[error("medication '{0}' is not part of the order's prescription")]
    NotInPrescription(MedicationId),
    #[error("restoring stock of medication '{0}' would overflow")]
    StockOverflow(MedicationId),

    #[error("insufficient stock for {name} ({medication}): need {needed}, have {available}")]
    InsufficientStock {
        medication: MedicationId,
        name: String,
        needed: u64,
        available: u32,
    },

    #[error("medication '{medication}' is used in {count} active prescription(s) and cannot be deleted")]
    MedicationInUsePrescription {
        medication: MedicationId,
        count: usize,
    },
    #[error("medication '{medication}' is in {count} order(s) in progress and cannot be deleted")]
    MedicationInPendingOrder {
        medication: MedicationId,
        count: usize,
    },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("{operation} failed and its rollback also failed: cause={cause}; rollback={rollback}")]
    RollbackFailed {
        operation: &'static str,
        #[source]
        cause: Box<DispensaryError>,
        rollback: Box<DispensaryError>,
    },
}

pub type DispensaryResult<T> = std::result::Result<T, DispensaryError>;

/// Coarse classification of a [`DispensaryError`], for callers that surface errors to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced record does not exist.
    NotFound,
    /// A business rule rejected the operation.
    PreconditionFailed,
    /// Needed quantity exceeds available stock.
    InsufficientStock,
    /// A delete was blocked by records still referencing the target.
    ReferentialBlock,
    /// The caller's role lacks the capability, or the record is not theirs.
    Forbidden,
    /// The request itself is malformed.
    InvalidInput,
    /// The store failed.
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::PreconditionFailed => "precondition_failed",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::ReferentialBlock => "referential_block",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DispensaryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispensaryError::InvalidInput(_) | DispensaryError::DuplicateId { .. } => {
                ErrorKind::InvalidInput
            }
            DispensaryError::Forbidden { .. } | DispensaryError::NotPrescriptionOwner(_) => {
                ErrorKind::Forbidden
            }
            DispensaryError::PrescriptionNotFound(_)
            | DispensaryError::OrderNotFound(_)
            | DispensaryError::MedicationNotFound(_)
            | DispensaryError::PharmacyNotFound(_)
            | DispensaryError::PatientNotFound(_) => ErrorKind::NotFound,
            DispensaryError::PrescriptionUsed(_)
            | DispensaryError::PrescriptionExpired { .. }
            | DispensaryError::MedicationUnavailable(_)
            | DispensaryError::PreparationIncomplete { .. }
            | DispensaryError::NotInPrescription(_)
            | DispensaryError::StockOverflow(_) => ErrorKind::PreconditionFailed,
            DispensaryError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            DispensaryError::MedicationInUsePrescription { .. }
            | DispensaryError::MedicationInPendingOrder { .. } => ErrorKind::ReferentialBlock,
            DispensaryError::Store(_) => ErrorKind::Storage,
            DispensaryError::RollbackFailed { .. } => ErrorKind::Storage,
        }
    }
}

fn join_ids(ids: &[MedicationId]) -> String {
    ids.iter()
        .map(MedicationId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
