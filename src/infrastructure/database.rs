//! Pooled SQLite connection

use crate::infrastructure::settings::Settings;
use di::{Ref, inject, injectable};
use log::info;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Mutex;

/// Pool handed to every `DatabaseConnection` created while set. Integration tests use it to
/// point the DI container at an in-memory database.
static TEST_POOL: Mutex<Option<SqlitePool>> = Mutex::new(None);

pub struct DatabaseConnection {
    connection: SqlitePool,
}

#[injectable]
impl DatabaseConnection {
    #[inject]
    pub fn create(settings: Ref<Settings>) -> DatabaseConnection {
        if let Some(pool) = TEST_POOL.lock().ok().and_then(|pool| pool.clone()) {
            return DatabaseConnection { connection: pool };
        }

        let options = SqliteConnectOptions::from_str(&settings.database_url)
            .unwrap_or_else(|e| panic!("invalid DATABASE_URL {:?}: {e}", settings.database_url))
            .create_if_missing(true);

        info!("using database {}", settings.database_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_lazy_with(options);

        DatabaseConnection { connection: pool }
    }
}

impl DatabaseConnection {
    pub fn set_test_pool(pool: SqlitePool) {
        if let Ok(mut slot) = TEST_POOL.lock() {
            *slot = Some(pool);
        }
    }

    pub fn clear_test_pool() {
        if let Ok(mut slot) = TEST_POOL.lock() {
            *slot = None;
        }
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.connection).await
    }
}

impl Deref for DatabaseConnection {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}
