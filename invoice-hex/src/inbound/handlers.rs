//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use invoice_types::{
    AccountId, AppError, CreateInvoiceRequest, IssueInvoiceRequest, LedgerRepository,
    ListInvoicesQuery, OpenAccountRequest,
};

use crate::InvoiceService;

/// Application state shared across handlers.
pub struct AppState<R: LedgerRepository> {
    pub service: InvoiceService<R>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound { message, .. } => (StatusCode::NOT_FOUND, message.clone()),
            AppError::Conflict { message, .. } => (StatusCode::CONFLICT, message.clone()),
            AppError::InsufficientFunds {
                available,
                requested,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!(
                    "Insufficient funds: available {}, requested {}",
                    available, requested
                ),
            ),
            AppError::Timeout(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16(),
            "reason": self.0.reason()
        });

        (status, Json(body)).into_response()
    }
}

fn parse_account_id(id: &str) -> Result<AccountId, ApiError> {
    id.parse()
        .map_err(|_| ApiError(AppError::BadRequest("Invalid account ID".into())))
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn open_account<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<OpenAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.service.open_account(req).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// Get account by ID.
#[tracing::instrument(skip(state), fields(account_id = %id))]
pub async fn get_account<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = parse_account_id(&id)?;
    let account = state.service.get_account(account_id).await?;
    Ok(Json(account))
}

/// List an account's invoices, optionally filtered by direction.
#[tracing::instrument(skip(state), fields(account_id = %id, direction = ?query.direction))]
pub async fn list_invoices<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = parse_account_id(&id)?;
    let invoices = state
        .service
        .list_invoices(account_id, query.direction)
        .await?;
    Ok(Json(invoices))
}

// ─────────────────────────────────────────────────────────────────────────────
// Invoices
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, req), fields(payer = %req.payer_account_id, receiver = %req.receiver_account_id, amount = req.amount))]
pub async fn create_invoice<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invoice = state.service.create_invoice(req).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

#[tracing::instrument(skip(state, req), fields(receiver = %req.receiver_account_id, amount = req.amount))]
pub async fn issue_invoice<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<IssueInvoiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invoice = state.service.issue_invoice(req).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// Get invoice by ID.
#[tracing::instrument(skip(state), fields(invoice_id = %id))]
pub async fn get_invoice<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let invoice = state.service.get_invoice(&id).await?;
    Ok(Json(invoice))
}

#[tracing::instrument(skip(state), fields(invoice_id = %id))]
pub async fn delete_invoice<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.delete_invoice(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pay an invoice.
#[tracing::instrument(skip(state), fields(invoice_id = %id))]
pub async fn pay_invoice<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state.service.pay_invoice(&id).await?;
    Ok(Json(receipt))
}
