use crate::config::ExportConfig;
use crate::domains::clustering::repository::SqliteClusteringRepository;
use crate::domains::conversation::repository::SqliteConversationRepository;
use crate::domains::export::service::ExportService;
use crate::domains::export::writers::csv_writer::CsvConfig;
use crate::domains::statement::repository::SqliteStatementRepository;
use crate::domains::vote::repository::SqliteVoteRepository;
use crate::errors::{ServiceError, ServiceResult};
use lazy_static::lazy_static;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// Global state definitions
lazy_static! {
    static ref INIT_MUTEX: tokio::sync::Mutex<()> = tokio::sync::Mutex::new(());
    static ref INITIALIZED: AtomicBool = AtomicBool::new(false);

    static ref DB_POOL: Mutex<Option<SqlitePool>> = Mutex::new(None);
    static ref EXPORT_SERVICE: Mutex<Option<Arc<ExportService>>> = Mutex::new(None);
}

pub fn get_db_pool() -> ServiceResult<SqlitePool> {
    DB_POOL
        .lock()
        .map_err(|_| ServiceError::NotInitialized("DB_POOL lock poisoned".to_string()))?
        .clone()
        .ok_or_else(|| ServiceError::NotInitialized("Database pool not initialized".to_string()))
}

pub fn get_export_service() -> ServiceResult<Arc<ExportService>> {
    EXPORT_SERVICE
        .lock()
        .map_err(|_| ServiceError::NotInitialized("EXPORT_SERVICE lock poisoned".to_string()))?
        .clone()
        .ok_or_else(|| ServiceError::NotInitialized("Export service not initialized".to_string()))
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

/// Wire every repository and the export service over `pool`
pub fn build_export_service(pool: &SqlitePool, config: &ExportConfig) -> ExportService {
    let votes = SqliteVoteRepository::new(pool.clone())
        .with_batch_size(config.vote_batch_size)
        .with_channel_capacity(config.channel_capacity)
        .with_query_timeout(config.query_timeout);

    ExportService::new(
        Arc::new(SqliteConversationRepository::new(pool.clone())),
        Arc::new(SqliteStatementRepository::new(pool.clone())),
        Arc::new(SqliteClusteringRepository::new(pool.clone())),
        Arc::new(votes),
    )
    .with_csv_config(CsvConfig {
        include_bom: config.include_bom,
        flush_interval: config.flush_interval,
        ..CsvConfig::default()
    })
    .with_conversation_url_base(config.conversation_url_base.clone())
}

/// Set up logging, the connection pool, migrations and the export service.
/// Calling it again after a successful run is a no-op.
pub async fn initialize(config: &ExportConfig) -> ServiceResult<()> {
    // Acquire the async mutex to ensure single initialization
    let _guard = INIT_MUTEX.lock().await;

    if INITIALIZED.load(Ordering::Acquire) {
        return Ok(());
    }

    let result = initialize_internal(config).await;

    // Mark as initialized only if successful
    if result.is_ok() {
        INITIALIZED.store(true, Ordering::Release);
    }

    result
}

async fn initialize_internal(config: &ExportConfig) -> ServiceResult<()> {
    // Initialize logging first
    if std::env::var("RUST_LOG").is_err() {
        #[cfg(debug_assertions)]
        std::env::set_var("RUST_LOG", "debug");
        #[cfg(not(debug_assertions))]
        std::env::set_var("RUST_LOG", "info");
    }
    let _ = env_logger::try_init();

    config.validate()?;
    log::info!("Starting export engine initialization");
    log::debug!("Database URL: {}", config.database_url);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .idle_timeout(config.idle_timeout)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            log::error!("Database connection failed: {}", e);
            ServiceError::Configuration(format!("Database connection failed: {}", e))
        })?;
    log::debug!("Database connection established");

    crate::db_migration::run_migrations(&pool).await?;

    let service = build_export_service(&pool, config);

    *DB_POOL
        .lock()
        .map_err(|_| ServiceError::NotInitialized("DB_POOL lock poisoned".to_string()))? = Some(pool);
    *EXPORT_SERVICE
        .lock()
        .map_err(|_| ServiceError::NotInitialized("EXPORT_SERVICE lock poisoned".to_string()))? =
        Some(Arc::new(service));

    log::info!("Export engine initialized");
    Ok(())
}
