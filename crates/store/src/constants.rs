//! Persisted layout keys.

/// Maximum length of a store key.
pub const MAX_KEY_LEN: usize = 64;

/// Named collections held in the store. Each is a JSON array of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKey {
    Users,
    Patients,
    Medications,
    Prescriptions,
    Orders,
    Pharmacies,
}

impl CollectionKey {
    pub const ALL: [CollectionKey; 6] = [
        CollectionKey::Users,
        CollectionKey::Patients,
        CollectionKey::Medications,
        CollectionKey::Prescriptions,
        CollectionKey::Orders,
        CollectionKey::Pharmacies,
    ];

    /// The key under which the collection is stored.
    ///
    /// These names are the on-device layout and must not change.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKey::Users => "users",
            CollectionKey::Patients => "patients",
            CollectionKey::Medications => "medicaments",
            CollectionKey::Prescriptions => "ordonnances",
            CollectionKey::Orders => "commandes",
            CollectionKey::Pharmacies => "pharmacies",
        }
    }
}

/// Single-value entries held in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SingletonKey {
    /// The caller currently acting on this device.
    Session,
    /// Set once the collections have been laid out.
    Initialized,
}

impl SingletonKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SingletonKey::Session => "session",
            SingletonKey::Initialized => "initialized",
        }
    }
}
