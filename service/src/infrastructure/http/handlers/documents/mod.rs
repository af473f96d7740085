use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use lingkod_common::domain::{ReviewerId, SubmissionId};

use crate::domain::AppState;
use crate::domain::repository::AuditTrail;
use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::handlers::documents::dto::StatusHistoryResponse;
use crate::infrastructure::http::querystring::QueryString;

pub mod dto;

const PROCESSED_DEFAULT_LIMIT: i64 = 50;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryParams {
    pub document_id: Uuid,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedParams {
    pub reviewer_id: Uuid,
    pub limit: Option<i64>,
}

/// `GET /documents/statushistory?documentId=…` — one submission's ledger,
/// newest first.
pub async fn document_status_history<S: AppState>(
    QueryString(params): QueryString<StatusHistoryParams>,
    State(state): State<S>,
) -> Result<ApiSuccess<Vec<StatusHistoryResponse>>, ApiError> {
    let records = state
        .store()
        .records_for_document(SubmissionId(params.document_id))
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        records.iter().map(StatusHistoryResponse::from).collect(),
    ))
}

/// `GET /documents/processed?reviewerId=…` — the slice of the ledger one
/// reviewer produced, newest first.
pub async fn processed_documents<S: AppState>(
    QueryString(params): QueryString<ProcessedParams>,
    State(state): State<S>,
) -> Result<ApiSuccess<Vec<StatusHistoryResponse>>, ApiError> {
    let records = state
        .store()
        .records_by_reviewer(
            ReviewerId(params.reviewer_id),
            params.limit.unwrap_or(PROCESSED_DEFAULT_LIMIT),
        )
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        records.iter().map(StatusHistoryResponse::from).collect(),
    ))
}
