//! # API REST
//!
//! Local REST adapter for the dispensary engine.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - Caller identity from `x-caller-id` / `x-caller-role` headers, required on every route
//!   but `/health`
//! - Mapping engine errors to HTTP statuses with a JSON `{ error, message }` body
//! - REST-specific concerns (JSON serialization, CORS, request tracing)
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET | `/health` | liveness |
//! | GET, POST | `/medications` | list (`?search=`), add |
//! | GET | `/medications/summary` | stock summary |
//! | GET, PATCH, DELETE | `/medications/:id` | get, update, guarded delete |
//! | POST | `/medications/:id/stock` | clamped stock adjustment |
//! | GET, POST | `/prescriptions` | list (`?patient=&orderable=` or `?prescriber=`), issue |
//! | GET | `/prescriptions/:id` | get |
//! | GET, POST | `/patients` | list, register |
//! | GET | `/patients/:id` | get |
//! | GET, POST | `/pharmacies` | list, register |
//! | GET, POST | `/orders` | list (`?patient=`, `?pharmacy=`, `?pharmacist=`, `?status=`), create |
//! | GET | `/orders/:id` | get |
//! | PUT | `/orders/:id/status` | status transition |
//! | PUT | `/orders/:id/prepared` | merge preparation flags |

#![warn(rust_2018_idioms)]

pub mod caller;
pub mod error;
pub mod handlers;

use anyhow::Context;
use axum::routing::{get, post, put};
use axum::Router;
use dispensary_core::{CoreConfig, OrderEngine};
use dispensary_store::{initialise_layout, FileStore, KeyValueStore};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use caller::{CallerIdentity, CALLER_ID_HEADER, CALLER_ROLE_HEADER};
pub use error::{ApiError, ApiResult, ErrorBody};

/// Application state shared across REST API handlers
pub struct AppState<S> {
    pub engine: Arc<OrderEngine<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

/// Builds the REST router over `engine`.
pub fn router<S: KeyValueStore + 'static>(engine: Arc<OrderEngine<S>>) -> Router {
    use handlers::*;

    Router::new()
        .route("/health", get(health))
        .route(
            "/medications",
            get(list_medications::<S>).post(add_medication::<S>),
        )
        .route("/medications/summary", get(stock_summary::<S>))
        .route(
            "/medications/:id",
            get(get_medication::<S>)
                .patch(update_medication::<S>)
                .delete(delete_medication::<S>),
        )
        .route("/medications/:id/stock", post(adjust_stock::<S>))
        .route(
            "/prescriptions",
            get(list_prescriptions::<S>).post(issue_prescription::<S>),
        )
        .route("/prescriptions/:id", get(get_prescription::<S>))
        .route(
            "/patients",
            get(list_patients::<S>).post(register_patient::<S>),
        )
        .route("/patients/:id", get(get_patient::<S>))
        .route(
            "/pharmacies",
            get(list_pharmacies::<S>).post(register_pharmacy::<S>),
        )
        .route("/orders", get(list_orders::<S>).post(create_order::<S>))
        .route("/orders/:id", get(get_order::<S>))
        .route("/orders/:id/status", put(update_order_status::<S>))
        .route("/orders/:id/prepared", put(set_prepared_items::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { engine })
}

/// Opens the file store under the configured data directory and serves the API on `addr`
/// until the server fails.
///
/// # Errors
///
/// Returns an error if:
/// - the data directory cannot be created or opened,
/// - the store layout cannot be initialised,
/// - the listener cannot bind `addr`,
/// - the HTTP server fails while running.
pub async fn serve(cfg: Arc<CoreConfig>, addr: &str) -> anyhow::Result<()> {
    let store = Arc::new(FileStore::create(cfg.data_dir()).with_context(|| {
        format!("cannot open data directory {}", cfg.data_dir().display())
    })?);
    if initialise_layout(store.as_ref()).await? {
        tracing::info!("initialised empty store in {}", cfg.data_dir().display());
    }

    let app = router(Arc::new(OrderEngine::new(store, cfg)));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("-- Dispensary REST API listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
