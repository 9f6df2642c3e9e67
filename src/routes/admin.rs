use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Routes exclusively accessible to users with the 'admin' role. Every handler
/// takes `AdminUser` (pages and forms) or `AdminApiUser` (`/api`) as its first
/// extractor, so the role check runs before the request body is read.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /backup
        // The Backup & Restore page.
        .route("/backup", get(handlers::backup_page))
        .route("/backup.php", get(handlers::backup_page))
        // POST /backup/restore
        // Multipart upload form on the page (CSV or JSON file).
        .route("/backup/restore", post(handlers::backup_restore_form))
        // POST /backup/wipe
        // Wipe form on the page; needs the confirmation checkbox.
        .route("/backup/wipe", post(handlers::backup_wipe_form))
        // GET /api/backup
        // JSON download of every staff record.
        .route("/api/backup", get(handlers::export_backup))
        // GET /api/backup.csv
        // CSV download of every staff record.
        .route("/api/backup.csv", get(handlers::export_backup_csv))
        // GET /api/template.csv
        // Header-only CSV template.
        .route("/api/template.csv", get(handlers::staff_template_csv))
        // POST /api/restore
        // Replaces all staff data from a backup document.
        .route("/api/restore", post(handlers::restore_backup))
        // POST /api/restore.csv
        // Replaces all staff data from a CSV body.
        .route("/api/restore.csv", post(handlers::restore_backup_csv))
        // POST /api/wipe
        // Deletes all staff data after explicit confirmation.
        .route("/api/wipe", post(handlers::wipe_data))
}
