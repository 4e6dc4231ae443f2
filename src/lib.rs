// Public modules
pub mod config;
pub mod domains;
pub mod errors;
pub mod globals;
pub mod types;

// Private modules
mod db_migration;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::ExportConfig;
pub use domains::export::{ExportError, ExportService, ExportStats, ReportKind, ReportRequest};

/// Initialize the library from an explicit configuration.
/// This function must be called before `get_export_service`.
pub async fn initialize(config: &ExportConfig) -> errors::ServiceResult<()> {
    globals::initialize(config).await
}

/// Initialize from `REPORT_*` environment variables (and `.env`)
pub async fn initialize_from_env() -> errors::ServiceResult<ExportConfig> {
    let config = ExportConfig::from_env()?;
    globals::initialize(&config).await?;
    Ok(config)
}

/// Get the shared export service
pub fn get_export_service() -> errors::ServiceResult<std::sync::Arc<ExportService>> {
    globals::get_export_service()
}

/// Get a reference to the SQLite connection pool
/// This is primarily for internal use
pub fn get_db_pool() -> errors::ServiceResult<sqlx::SqlitePool> {
    globals::get_db_pool()
}
