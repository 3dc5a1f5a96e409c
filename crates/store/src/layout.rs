//! First-use layout and reset of the persisted collections.

use crate::{CollectionKey, KeyValueStore, SingletonKey, StoreResult};

/// Lays out empty collections the first time a store is used.
///
/// Collections that already hold data are left alone. Returns `true` if the store was
/// initialised by this call and `false` if the initialization flag was already set.
pub async fn initialise_layout<S: KeyValueStore>(store: &S) -> StoreResult<bool> {
    let flag_key = SingletonKey::Initialized.as_str();
    if let Some(raw) = store.get(flag_key).await? {
        if raw.trim() == "true" {
            return Ok(false);
        }
    }

    for key in CollectionKey::ALL {
        if store.get(key.as_str()).await?.is_none() {
            store.set(key.as_str(), "[]".to_owned()).await?;
        }
    }
    store.set(flag_key, "true".to_owned()).await?;

    tracing::info!("initialised empty data store layout");
    Ok(true)
}

/// Empties every collection, drops the session and clears the initialization flag.
pub async fn reset_layout<S: KeyValueStore>(store: &S) -> StoreResult<()> {
    store
        .set(SingletonKey::Initialized.as_str(), "false".to_owned())
        .await?;
    for key in CollectionKey::ALL {
        store.set(key.as_str(), "[]".to_owned()).await?;
    }
    store.remove(SingletonKey::Session.as_str()).await?;

    tracing::info!("reset data store layout");
    Ok(())
}
