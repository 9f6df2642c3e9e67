use crate::{
    AppState, backup,
    auth::ApiUser,
    error::AppError,
    guard::{AdminApiUser, AdminUser},
    models::{
        BackupDocument, MeResponse, RestoreRequest, RestoreSummary, STAFF_COLUMNS, WipeRequest,
        WipeSummary,
    },
    pages::{self, BackupTemplate, UnauthorizedTemplate},
};
use axum::{
    Form, Json,
    body::Bytes,
    extract::{Multipart, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::Deserialize;

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

fn attachment(filename: &str) -> String {
    format!("attachment; filename=\"{filename}\"")
}

// --- Pages ---

/// backup_page
///
/// [Admin Page] Renders the Backup & Restore page. Anonymous visitors are
/// redirected to the login page and non-admins to the Access Denied page.
pub async fn backup_page(AdminUser(actor): AdminUser, State(state): State<AppState>) -> Response {
    render_backup_page(&state, actor.id, Ok(None)).await
}

/// Renders the backup page with the outcome of a form submission. Failed
/// submissions keep the status code of the underlying error.
async fn render_backup_page(
    state: &AppState,
    actor: String,
    outcome: Result<Option<String>, AppError>,
) -> Response {
    let (status, notice, error) = match outcome {
        Ok(notice) => (StatusCode::OK, notice, None),
        Err(e) => (e.status(), None, Some(e.to_string())),
    };
    let template = BackupTemplate {
        actor,
        record_count: state.repo.count().await,
        notice,
        error,
    };
    pages::render(status, &template)
}

/// backup_restore_form
///
/// [Admin Form] Restores staff data from the uploaded `file` field. CSV and
/// JSON backups are both accepted.
pub async fn backup_restore_form(
    AdminUser(actor): AdminUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Response {
    let outcome = restore_from_upload(&state, multipart).await.map(|restored| {
        tracing::info!(actor = %actor.id, restored, "staff data restored from upload");
        Some(format!("Data pegawai berhasil diimpor! {restored} data dipulihkan."))
    });
    render_backup_page(&state, actor.id, outcome).await
}

async fn restore_from_upload(state: &AppState, mut multipart: Multipart) -> Result<usize, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            break;
        }
        let request = backup::read_upload(file_name.as_deref(), &bytes)?;
        return backup::restore(&state.repo, request).await;
    }
    Err(AppError::BadRequest("no backup file uploaded".to_string()))
}

/// Fields of the wipe form. An HTML checkbox is only sent when ticked, as `on`.
#[derive(Debug, Deserialize)]
pub struct WipeForm {
    pub confirm: Option<String>,
}

/// backup_wipe_form
///
/// [Admin Form] Deletes all staff data once the confirmation box is ticked.
pub async fn backup_wipe_form(
    AdminUser(actor): AdminUser,
    State(state): State<AppState>,
    Form(form): Form<WipeForm>,
) -> Response {
    let outcome = if form.confirm.as_deref() == Some("on") {
        let removed = state.repo.clear().await;
        tracing::warn!(actor = %actor.id, removed, "all staff data wiped");
        Ok(Some("Semua data pegawai berhasil dihapus!".to_string()))
    } else {
        Err(AppError::BadRequest(
            "wiping staff data must be confirmed".to_string(),
        ))
    };
    render_backup_page(&state, actor.id, outcome).await
}

/// unauthorized_page
///
/// [Public Page] Renders the Access Denied page with a link back to the dashboard.
/// It never requires a session, so a denied visitor can always see it.
pub async fn unauthorized_page(State(state): State<AppState>) -> Response {
    let template = UnauthorizedTemplate {
        dashboard_url: state.config.dashboard_url.clone(),
    };
    pages::render(StatusCode::OK, &template)
}

// --- API ---

/// get_me
///
/// [Authenticated Route] The current actor as resolved from the session.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current actor", body = MeResponse),
        (status = 401, description = "No session")
    )
)]
pub async fn get_me(ApiUser(actor): ApiUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: actor.id,
        roles: actor.roles,
    })
}

/// export_backup
///
/// [Admin Route] Downloads every staff record as a JSON backup document.
#[utoipa::path(
    get,
    path = "/api/backup",
    responses(
        (status = 200, description = "Backup document", body = BackupDocument),
        (status = 401, description = "No session"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No staff data to back up")
    )
)]
pub async fn export_backup(
    AdminApiUser(actor): AdminApiUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let records = backup::records_for_backup(&state.repo).await?;
    tracing::info!(actor = %actor.id, records = records.len(), "staff data exported");

    let document = BackupDocument {
        exported_at: Utc::now(),
        columns: STAFF_COLUMNS.iter().map(|c| c.to_string()).collect(),
        records,
    };
    Ok((
        [(
            header::CONTENT_DISPOSITION,
            attachment(backup::BACKUP_JSON_FILENAME),
        )],
        Json(document),
    ))
}

/// export_backup_csv
///
/// [Admin Route] Downloads every staff record as CSV, one column per
/// `STAFF_COLUMNS` entry.
#[utoipa::path(
    get,
    path = "/api/backup.csv",
    responses(
        (status = 200, description = "CSV backup", content_type = "text/csv", body = String),
        (status = 401, description = "No session"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No staff data to back up")
    )
)]
pub async fn export_backup_csv(
    AdminApiUser(actor): AdminApiUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let records = backup::records_for_backup(&state.repo).await?;
    let body = backup::write_csv(&records)?;
    tracing::info!(actor = %actor.id, records = records.len(), "staff data exported as CSV");

    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                attachment(backup::BACKUP_CSV_FILENAME),
            ),
        ],
        body,
    ))
}

/// staff_template_csv
///
/// [Admin Route] An empty CSV holding only the standard header row.
#[utoipa::path(
    get,
    path = "/api/template.csv",
    responses(
        (status = 200, description = "CSV header template", content_type = "text/csv", body = String),
        (status = 401, description = "No session"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn staff_template_csv(
    AdminApiUser(_actor): AdminApiUser,
) -> Result<impl IntoResponse, AppError> {
    let body = backup::template_csv()?;
    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                attachment(backup::TEMPLATE_CSV_FILENAME),
            ),
        ],
        body,
    ))
}

/// restore_backup
///
/// [Admin Route] Replaces all staff data with the records of a backup document.
/// The document is rejected as a whole if any expected column is missing.
#[utoipa::path(
    post,
    path = "/api/restore",
    request_body = RestoreRequest,
    responses(
        (status = 200, description = "Restored", body = RestoreSummary),
        (status = 401, description = "No session"),
        (status = 403, description = "Not an admin"),
        (status = 422, description = "Missing columns or malformed document")
    )
)]
pub async fn restore_backup(
    AdminApiUser(actor): AdminApiUser,
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<RestoreRequest>, AppError>,
) -> Result<Json<RestoreSummary>, AppError> {
    let restored = backup::restore(&state.repo, payload).await?;
    tracing::info!(actor = %actor.id, restored, "staff data restored");
    Ok(Json(RestoreSummary { restored }))
}

/// restore_backup_csv
///
/// [Admin Route] Same as `restore_backup`, from a CSV body with a header row.
#[utoipa::path(
    post,
    path = "/api/restore.csv",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Restored", body = RestoreSummary),
        (status = 400, description = "Malformed CSV"),
        (status = 401, description = "No session"),
        (status = 403, description = "Not an admin"),
        (status = 422, description = "Missing columns")
    )
)]
pub async fn restore_backup_csv(
    AdminApiUser(actor): AdminApiUser,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RestoreSummary>, AppError> {
    let request = backup::read_csv(&body)?;
    let restored = backup::restore(&state.repo, request).await?;
    tracing::info!(actor = %actor.id, restored, "staff data restored from CSV");
    Ok(Json(RestoreSummary { restored }))
}

/// wipe_data
///
/// [Admin Route] Deletes all staff data. Requires `{"confirm": true}`.
#[utoipa::path(
    post,
    path = "/api/wipe",
    request_body = WipeRequest,
    responses(
        (status = 200, description = "Wiped", body = WipeSummary),
        (status = 400, description = "Not confirmed"),
        (status = 401, description = "No session"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn wipe_data(
    AdminApiUser(actor): AdminApiUser,
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<WipeRequest>, AppError>,
) -> Result<Json<WipeSummary>, AppError> {
    if !payload.confirm {
        return Err(AppError::BadRequest(
            "wiping staff data must be confirmed".to_string(),
        ));
    }

    let removed = state.repo.clear().await;
    tracing::warn!(actor = %actor.id, removed, "all staff data wiped");
    Ok(Json(WipeSummary { removed }))
}
