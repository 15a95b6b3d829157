// 🌐 HTTP API - thin adapters between axum and the entity store
//
// Handlers parse path/body parameters, run one store operation under the
// store lock, persist the snapshot when a database is configured, and
// translate store errors to status codes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, State,
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put, MethodRouter},
    Json, Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::db;
use crate::entities::{
    today, BudgetSummary, Client, ClientPatch, ContactEntry, Debt, DebtPatch, DebtStatus,
    NewClient, NewDebt, Payment,
};
use crate::error::{StoreError, StoreResult};
use crate::statistics::Statistics;
use crate::store::EntityStore;

// ============================================================================
// STATE
// ============================================================================

/// Shared application state
pub struct AppState {
    store: Mutex<EntityStore>,
    db: Option<Mutex<Connection>>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Memory-only state
    pub fn in_memory(store: EntityStore) -> Self {
        AppState {
            store: Mutex::new(store),
            db: None,
        }
    }

    /// State backed by an open database; the store is loaded from it
    pub fn with_database(mut conn: Connection, seed: bool) -> Result<Self> {
        db::setup_database(&conn)?;
        let mut store = db::load_store(&conn)?;
        if store.is_empty() && seed {
            info!("database empty, loading demo records");
            store = EntityStore::seeded();
            db::save_store(&mut conn, &store)?;
        }

        Ok(AppState {
            store: Mutex::new(store),
            db: Some(Mutex::new(conn)),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        match &config.database_path {
            Some(path) => {
                info!(path = %path.display(), "opening database");
                Self::with_database(db::open_database(path)?, config.seed)
            }
            None => {
                let store = if config.seed {
                    EntityStore::seeded()
                } else {
                    EntityStore::new()
                };
                Ok(Self::in_memory(store))
            }
        }
    }

    fn lock_store(&self) -> MutexGuard<'_, EntityStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T, F>(&self, op: F) -> ApiResult<T>
    where
        F: FnOnce(&EntityStore) -> StoreResult<T>,
    {
        let store = self.lock_store();
        Ok(op(&*store)?)
    }

    /// Run a mutation; if the snapshot cannot be written the store is rolled back
    fn write<T, F>(&self, op: F) -> ApiResult<T>
    where
        F: FnOnce(&mut EntityStore) -> StoreResult<T>,
    {
        let mut store = self.lock_store();
        let Some(db) = &self.db else {
            return Ok(op(&mut *store)?);
        };

        let before = store.clone();
        let value = op(&mut *store)?;

        let mut conn = db.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = db::save_store(&mut *conn, &*store) {
            *store = before;
            return Err(ApiError::Storage(format!("{:#}", err)));
        }
        Ok(value)
    }
}

// ============================================================================
// ERRORS
// ============================================================================

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();
        if status.is_server_error() {
            error!(%status, %detail, "request failed");
        } else {
            debug!(%status, %detail, "request rejected");
        }
        (status, Json(ErrorBody { detail: &detail })).into_response()
    }
}

/// JSON body extractor whose rejections become `ApiError::BadRequest`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Path extractor whose rejections become `ApiError::BadRequest`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);

// Path segments arrive as text: anything that is not an integer is a bad
// request, while an integer no record can carry (negative, too large) is a miss.

fn is_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix(&['-', '+'][..]).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_id(raw: &str, entity: &str) -> ApiResult<u64> {
    if !is_integer(raw) {
        return Err(ApiError::BadRequest(format!(
            "invalid {} id '{}': expected an integer",
            entity, raw
        )));
    }
    raw.parse::<u64>()
        .map_err(|_| ApiError::NotFound(format!("{} {} not found", entity, raw)))
}

fn parse_index(raw: &str, entity: &str) -> ApiResult<i64> {
    if !is_integer(raw) {
        return Err(ApiError::BadRequest(format!(
            "invalid {} index '{}': expected an integer",
            entity, raw
        )));
    }
    raw.parse::<i64>()
        .map_err(|_| ApiError::NotFound(format!("{} at index {} not found", entity, raw)))
}

// ============================================================================
// RESPONSE BODIES
// ============================================================================

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
struct PaymentResponse {
    message: String,
    payment: Payment,
}

#[derive(Serialize)]
struct ContactResponse {
    message: String,
    contact: ContactEntry,
}

#[derive(Serialize)]
struct StatusResponse {
    message: String,
    debt_id: u64,
    status: DebtStatus,
}

#[derive(Debug, Default, Deserialize)]
struct StatusParams {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NoteRequest {
    note: String,
}

fn message(text: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.into(),
    })
}

// ============================================================================
// HANDLERS - GENERAL
// ============================================================================

/// GET /
async fn root() -> Json<MessageResponse> {
    message("Welcome to the FinFit debt management API")
}

/// GET /health
async fn health_check() -> Json<MessageResponse> {
    message("OK")
}

/// GET /statistics/
async fn statistics(State(state): State<SharedState>) -> ApiResult<Json<Statistics>> {
    state.read(|store| Ok(Statistics::collect(store))).map(Json)
}

// ============================================================================
// HANDLERS - CLIENTS
// ============================================================================

/// GET /clients/
async fn list_clients(State(state): State<SharedState>) -> ApiResult<Json<Vec<Client>>> {
    state.read(|store| Ok(store.list_clients())).map(Json)
}

/// POST /clients/
async fn create_client(
    State(state): State<SharedState>,
    AppJson(input): AppJson<NewClient>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    let client = state.write(|store| store.create_client(input))?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// GET /clients/:id
async fn get_client(
    State(state): State<SharedState>,
    AppPath(raw_id): AppPath<String>,
) -> ApiResult<Json<Client>> {
    let id = parse_id(&raw_id, "client")?;
    state.read(|store| store.get_client(id)).map(Json)
}

/// PUT /clients/:id - partial update
async fn update_client(
    State(state): State<SharedState>,
    AppPath(raw_id): AppPath<String>,
    AppJson(patch): AppJson<ClientPatch>,
) -> ApiResult<Json<Client>> {
    let id = parse_id(&raw_id, "client")?;
    state.write(|store| store.update_client(id, patch)).map(Json)
}

/// DELETE /clients/:id
async fn delete_client(
    State(state): State<SharedState>,
    AppPath(raw_id): AppPath<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&raw_id, "client")?;
    state.write(|store| store.delete_client(id))?;
    Ok(message("Client deleted"))
}

/// GET /clients/:id/debts/
async fn client_debts(
    State(state): State<SharedState>,
    AppPath(raw_id): AppPath<String>,
) -> ApiResult<Json<Vec<Debt>>> {
    let id = parse_id(&raw_id, "client")?;
    state.read(|store| store.list_debts_for_client(id)).map(Json)
}

/// POST /clients/:id/notes
async fn add_client_note(
    State(state): State<SharedState>,
    AppPath(raw_id): AppPath<String>,
    AppJson(request): AppJson<NoteRequest>,
) -> ApiResult<Json<Client>> {
    let id = parse_id(&raw_id, "client")?;
    state
        .write(|store| store.append_client_note(id, today(), &request.note))
        .map(Json)
}

/// GET /clients/:id/budget/summary
async fn budget_summary(
    State(state): State<SharedState>,
    AppPath(raw_id): AppPath<String>,
) -> ApiResult<Json<BudgetSummary>> {
    let id = parse_id(&raw_id, "client")?;
    state
        .read(|store| store.client_budget(id).map(|budget| budget.summary()))
        .map(Json)
}

// ============================================================================
// HANDLERS - DEBTS
// ============================================================================

/// GET /debts/
async fn list_debts(State(state): State<SharedState>) -> ApiResult<Json<Vec<Debt>>> {
    state.read(|store| Ok(store.list_debts())).map(Json)
}

/// POST /debts/
async fn create_debt(
    State(state): State<SharedState>,
    AppJson(input): AppJson<NewDebt>,
) -> ApiResult<(StatusCode, Json<Debt>)> {
    let debt = state.write(|store| store.create_debt(input))?;
    Ok((StatusCode::CREATED, Json(debt)))
}

/// GET /debts/:id
async fn get_debt(
    State(state): State<SharedState>,
    AppPath(raw_id): AppPath<String>,
) -> ApiResult<Json<Debt>> {
    let id = parse_id(&raw_id, "debt")?;
    state.read(|store| store.get_debt(id)).map(Json)
}

/// PUT /debts/:id - partial update
async fn update_debt(
    State(state): State<SharedState>,
    AppPath(raw_id): AppPath<String>,
    AppJson(patch): AppJson<DebtPatch>,
) -> ApiResult<Json<Debt>> {
    let id = parse_id(&raw_id, "debt")?;
    state.write(|store| store.update_debt(id, patch)).map(Json)
}

/// DELETE /debts/:id
async fn delete_debt(
    State(state): State<SharedState>,
    AppPath(raw_id): AppPath<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&raw_id, "debt")?;
    state.write(|store| store.delete_debt(id))?;
    Ok(message("Debt deleted"))
}

/// PUT /debts/:id/status/ - status from `?status=` or a `{"status": ..}` body
async fn update_debt_status(
    State(state): State<SharedState>,
    AppPath(raw_id): AppPath<String>,
    query: std::result::Result<Query<StatusParams>, QueryRejection>,
    body: Bytes,
) -> ApiResult<Json<StatusResponse>> {
    let id = parse_id(&raw_id, "debt")?;
    let Query(params) = query?;
    let requested = match params.status {
        Some(status) => status,
        None if !body.is_empty() => serde_json::from_slice::<StatusParams>(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid status body: {}", e)))?
            .status
            .ok_or_else(|| ApiError::BadRequest("missing status".to_string()))?,
        None => return Err(ApiError::BadRequest("missing status".to_string())),
    };

    let debt = state.write(|store| store.update_status(id, &requested))?;
    Ok(Json(StatusResponse {
        message: format!("Status updated to {}", debt.status),
        debt_id: debt.id,
        status: debt.status,
    }))
}

// ============================================================================
// HANDLERS - PAYMENTS & CONTACTS
// ============================================================================

/// POST /debts/:id/payments/
async fn add_payment(
    State(state): State<SharedState>,
    AppPath(raw_id): AppPath<String>,
    AppJson(payment): AppJson<Payment>,
) -> ApiResult<(StatusCode, Json<PaymentResponse>)> {
    let id = parse_id(&raw_id, "debt")?;
    let payment = state.write(|store| store.add_payment(id, payment))?;
    let body = PaymentResponse {
        message: "Payment added".to_string(),
        payment,
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// GET /debts/:id/payments/
async fn list_payments(
    State(state): State<SharedState>,
    AppPath(raw_id): AppPath<String>,
) -> ApiResult<Json<Vec<Payment>>> {
    let id = parse_id(&raw_id, "debt")?;
    state.read(|store| store.list_payments(id)).map(Json)
}

/// DELETE /debts/:id/payments/:index
async fn delete_payment(
    State(state): State<SharedState>,
    AppPath((raw_id, raw_index)): AppPath<(String, String)>,
) -> ApiResult<Json<PaymentResponse>> {
    let id = parse_id(&raw_id, "debt")?;
    let index = parse_index(&raw_index, "payment")?;
    let payment = state.write(|store| store.delete_payment(id, index))?;
    Ok(Json(PaymentResponse {
        message: "Payment deleted".to_string(),
        payment,
    }))
}

/// POST /debts/:id/contacts/
async fn add_contact(
    State(state): State<SharedState>,
    AppPath(raw_id): AppPath<String>,
    AppJson(contact): AppJson<ContactEntry>,
) -> ApiResult<(StatusCode, Json<ContactResponse>)> {
    let id = parse_id(&raw_id, "debt")?;
    let contact = state.write(|store| store.add_contact(id, contact))?;
    let body = ContactResponse {
        message: "Contact added".to_string(),
        contact,
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// GET /debts/:id/contacts/
async fn list_contacts(
    State(state): State<SharedState>,
    AppPath(raw_id): AppPath<String>,
) -> ApiResult<Json<Vec<ContactEntry>>> {
    let id = parse_id(&raw_id, "debt")?;
    state.read(|store| store.list_contacts(id)).map(Json)
}

/// DELETE /debts/:id/contacts/:index
async fn delete_contact(
    State(state): State<SharedState>,
    AppPath((raw_id, raw_index)): AppPath<(String, String)>,
) -> ApiResult<Json<ContactResponse>> {
    let id = parse_id(&raw_id, "debt")?;
    let index = parse_index(&raw_index, "contact")?;
    let contact = state.write(|store| store.delete_contact(id, index))?;
    Ok(Json(ContactResponse {
        message: "Contact deleted".to_string(),
        contact,
    }))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Register `path` and `path/` with the same handlers
fn route_both(
    router: Router<SharedState>,
    path: &str,
    method_router: MethodRouter<SharedState>,
) -> Router<SharedState> {
    router
        .route(path, method_router.clone())
        .route(&format!("{}/", path), method_router)
}

/// Unmatched paths answer with the same `{detail}` body as other errors
async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}

pub fn router(state: SharedState) -> Router {
    let mut api = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check));

    let routes: Vec<(&str, MethodRouter<SharedState>)> = vec![
        ("/clients", get(list_clients).post(create_client)),
        (
            "/clients/:id",
            get(get_client).put(update_client).delete(delete_client),
        ),
        ("/clients/:id/debts", get(client_debts)),
        ("/clients/:id/notes", post(add_client_note)),
        ("/clients/:id/budget/summary", get(budget_summary)),
        ("/debts", get(list_debts).post(create_debt)),
        (
            "/debts/:id",
            get(get_debt).put(update_debt).delete(delete_debt),
        ),
        ("/debts/:id/payments", get(list_payments).post(add_payment)),
        ("/debts/:id/payments/:index", delete(delete_payment)),
        ("/debts/:id/contacts", get(list_contacts).post(add_contact)),
        ("/debts/:id/contacts/:index", delete(delete_contact)),
        ("/debts/:id/status", put(update_debt_status)),
        ("/statistics", get(statistics)),
    ];
    for (path, method_router) in routes {
        api = route_both(api, path, method_router);
    }

    api.fallback(route_not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================
