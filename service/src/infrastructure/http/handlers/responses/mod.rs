use std::collections::BTreeMap;

use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::extract::multipart::Field;
use axum::http::{StatusCode, header::CONTENT_TYPE};
use axum::Json;
use uuid::Uuid;

use lingkod_common::domain::actor::{Actor, LguRef};
use lingkod_common::domain::{CitizenId, FormId, SubmissionId};

use crate::domain::AppState;
use crate::domain::engine::{NewSubmission, RevisionCommand, SubmissionContent};
use crate::domain::files::FileUpload;
use crate::domain::history::{
    self, GLOBAL_HISTORY_LIMIT, RECENT_SUBMISSIONS_LIMIT,
};
use crate::domain::repository::{AuditTrail, SubmissionStore};
use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::handlers::responses::dto::{
    CombinedEntryResponse, CreatedResponse, RevisedResponse, SubmissionResponse, UpdateStatusBody,
};

pub mod dto;

/// `POST /responses` — create a submission from a multipart form.
pub async fn create_response<S: AppState>(
    State(state): State<S>,
    multipart: Multipart,
) -> Result<ApiSuccess<CreatedResponse>, ApiError> {
    let mut fields = collect_fields(multipart).await?;
    let citizen_id = fields
        .citizen_id
        .ok_or_else(|| ApiError::BadRequest("citizenId is required".to_string()))?;
    let content = content_from(&mut fields)?;

    let submission = state
        .engine()
        .create(NewSubmission {
            citizen_id: CitizenId(citizen_id),
            content,
            attachments: std::mem::take(&mut fields.attachments),
        })
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::CREATED,
        CreatedResponse {
            message: "Submission received".to_string(),
            response: SubmissionResponse::from(&submission),
        },
    ))
}

/// `PUT /responses/{id}` — reviewer status update. Plain JSON for
/// pending/rejected; multipart with a `signature` part when approving.
pub async fn update_response_status<S: AppState>(
    Path(id): Path<Uuid>,
    State(state): State<S>,
    request: Request,
) -> Result<ApiSuccess<SubmissionResponse>, ApiError> {
    let (body, signature) = parse_update_request(request).await?;
    let command = body.into_command(signature)?;

    let updated = state
        .engine()
        .transition(SubmissionId(id), command)
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        SubmissionResponse::from(&updated),
    ))
}

/// `PUT /responses/revise/{id}` — citizen amends a reviewed submission.
pub async fn revise_response<S: AppState>(
    Path(id): Path<Uuid>,
    State(state): State<S>,
    multipart: Multipart,
) -> Result<ApiSuccess<RevisedResponse>, ApiError> {
    let mut fields = collect_fields(multipart).await?;
    let content = content_from(&mut fields)?;
    let actor = Actor::citizen(fields.updated_by.take().unwrap_or_else(|| "Citizen".to_string()));

    let updated = state
        .engine()
        .revise(
            SubmissionId(id),
            RevisionCommand {
                content,
                attachments: std::mem::take(&mut fields.attachments),
                actor,
            },
        )
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        RevisedResponse {
            message: "Submission revised".to_string(),
            updated_response: SubmissionResponse::from(&updated),
        },
    ))
}

/// `GET /responses/revise/{id}` — fetch the current state for the
/// revision screen.
pub async fn response_for_revision<S: AppState>(
    Path(id): Path<Uuid>,
    State(state): State<S>,
) -> Result<ApiSuccess<SubmissionResponse>, ApiError> {
    find_response(&state, id).await
}

/// `GET /responses/details/{id}` — single submission.
pub async fn response_details<S: AppState>(
    Path(id): Path<Uuid>,
    State(state): State<S>,
) -> Result<ApiSuccess<SubmissionResponse>, ApiError> {
    find_response(&state, id).await
}

/// `GET /responses/{formId}` — all responses submitted against one form.
pub async fn responses_by_form<S: AppState>(
    Path(form_id): Path<Uuid>,
    State(state): State<S>,
) -> Result<ApiSuccess<Vec<SubmissionResponse>>, ApiError> {
    let found = state.store().find_by_form(FormId(form_id)).await?;
    Ok(ApiSuccess::new(
        StatusCode::OK,
        found.iter().map(SubmissionResponse::from).collect(),
    ))
}

/// `GET /responses/citizen/{citizenId}` — the citizen's case list.
pub async fn responses_by_citizen<S: AppState>(
    Path(citizen_id): Path<Uuid>,
    State(state): State<S>,
) -> Result<ApiSuccess<Vec<SubmissionResponse>>, ApiError> {
    let found = state
        .store()
        .find_by_citizen(CitizenId(citizen_id))
        .await?;
    Ok(ApiSuccess::new(
        StatusCode::OK,
        found.iter().map(SubmissionResponse::from).collect(),
    ))
}

/// `GET /responses/history/combined` — the merged operational feed of
/// global ledger records and recent embedded history, capped at one page.
pub async fn combined_history<S: AppState>(
    State(state): State<S>,
) -> Result<ApiSuccess<Vec<CombinedEntryResponse>>, ApiError> {
    let (records, recent) = futures::try_join!(
        state.store().recent_records(GLOBAL_HISTORY_LIMIT),
        state.store().recent(RECENT_SUBMISSIONS_LIMIT),
    )?;

    let merged = history::merge_combined(records, &recent)
        .into_iter()
        .map(CombinedEntryResponse::from)
        .collect();

    Ok(ApiSuccess::new(StatusCode::OK, merged))
}

async fn find_response<S: AppState>(
    state: &S,
    id: Uuid,
) -> Result<ApiSuccess<SubmissionResponse>, ApiError> {
    let found = state
        .store()
        .find(SubmissionId(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Response not found".to_string()))?;
    Ok(ApiSuccess::new(
        StatusCode::OK,
        SubmissionResponse::from(&found),
    ))
}

fn bad_request(error: impl std::fmt::Display) -> ApiError {
    ApiError::BadRequest(error.to_string())
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

async fn parse_update_request(
    request: Request,
) -> Result<(UpdateStatusBody, Option<FileUpload>), ApiError> {
    if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(bad_request)?;
        let mut fields = collect_fields(multipart).await?;
        let body = UpdateStatusBody {
            status: fields
                .status
                .take()
                .ok_or_else(|| ApiError::BadRequest("status is required".to_string()))?,
            updated_by: fields
                .updated_by
                .take()
                .ok_or_else(|| ApiError::BadRequest("updatedBy is required".to_string()))?,
            comments: fields.comments.take(),
            reviewer_id: fields.reviewer_id.take(),
            lgu: fields.lgu.take(),
        };
        Ok((body, fields.signature.take()))
    } else {
        let Json(body) = Json::<UpdateStatusBody>::from_request(request, &())
            .await
            .map_err(bad_request)?;
        Ok((body, None))
    }
}

/// Everything the response endpoints accept as multipart parts. Unknown
/// parts are ignored, matching the tolerant behavior of the upload layer
/// this replaces.
#[derive(Default)]
struct MultipartFields {
    submission_type: Option<String>,
    form_id: Option<Uuid>,
    citizen_id: Option<Uuid>,
    data: Option<BTreeMap<String, serde_json::Value>>,
    updated_by: Option<String>,
    status: Option<String>,
    comments: Option<String>,
    reviewer_id: Option<Uuid>,
    lgu: Option<LguRef>,
    bulk: Option<FileUpload>,
    attachments: Vec<FileUpload>,
    signature: Option<FileUpload>,
}

async fn collect_fields(mut multipart: Multipart) -> Result<MultipartFields, ApiError> {
    let mut fields = MultipartFields::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "submissionType" => fields.submission_type = Some(text(field).await?),
            "formId" => fields.form_id = Some(uuid_text(field).await?),
            "citizenId" => fields.citizen_id = Some(uuid_text(field).await?),
            "data" => {
                let raw = text(field).await?;
                fields.data = Some(
                    serde_json::from_str(&raw)
                        .map_err(|e| ApiError::BadRequest(format!("invalid data payload: {}", e)))?,
                );
            }
            "updatedBy" => fields.updated_by = Some(text(field).await?),
            "status" => fields.status = Some(text(field).await?),
            "comments" => fields.comments = Some(text(field).await?),
            "reviewerId" => fields.reviewer_id = Some(uuid_text(field).await?),
            "lgu" => {
                let raw = text(field).await?;
                fields.lgu = Some(
                    serde_json::from_str(&raw)
                        .map_err(|e| ApiError::BadRequest(format!("invalid lgu payload: {}", e)))?,
                );
            }
            "file" => fields.bulk = Some(file_upload(field).await?),
            "files" => fields.attachments.push(file_upload(field).await?),
            "signature" => fields.signature = Some(file_upload(field).await?),
            _ => {}
        }
    }

    Ok(fields)
}

async fn text(field: Field<'_>) -> Result<String, ApiError> {
    field.text().await.map_err(bad_request)
}

async fn uuid_text(field: Field<'_>) -> Result<Uuid, ApiError> {
    let raw = text(field).await?;
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid id: {}", e)))
}

async fn file_upload(field: Field<'_>) -> Result<FileUpload, ApiError> {
    let file_name = field.file_name().unwrap_or("upload.bin").to_string();
    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field.bytes().await.map_err(bad_request)?.to_vec();
    Ok(FileUpload {
        file_name,
        mime_type,
        bytes,
    })
}

fn content_from(fields: &mut MultipartFields) -> Result<SubmissionContent, ApiError> {
    match fields.submission_type.as_deref() {
        Some("form") => {
            // One policy, enforced at the boundary: form submissions must
            // name their form, bulk uploads may stand alone.
            let form_id = fields.form_id.ok_or_else(|| {
                ApiError::BadRequest("formId is required for form submissions".to_string())
            })?;
            Ok(SubmissionContent::Form {
                form_id: FormId(form_id),
                data: fields.data.take().unwrap_or_default(),
            })
        }
        Some("bulk") => {
            let file = fields.bulk.take().ok_or_else(|| {
                ApiError::BadRequest("a file part is required for bulk submissions".to_string())
            })?;
            Ok(SubmissionContent::Bulk {
                form_id: fields.form_id.map(FormId),
                file,
            })
        }
        Some(other) => Err(ApiError::BadRequest(format!(
            "unknown submissionType `{}`",
            other
        ))),
        None => Err(ApiError::BadRequest("submissionType is required".to_string())),
    }
}
