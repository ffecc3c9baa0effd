//! # routesync-db
//!
//! PostgreSQL storage layer for routesync.
//!
//! This crate provides:
//! - Connection pool management
//! - Route and dispatch repositories (upsert-by-natural-key semantics)
//! - Read-only reference mapping lookups
//!
//! ## Example
//!
//! ```rust,ignore
//! use routesync_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/routesync").await?;
//!     let route = db.routes.find_by_key("44800796").await?;
//!     println!("{route:?}");
//!     Ok(())
//! }
//! ```

pub mod dispatches;
pub mod pool;
pub mod reference;
pub mod routes;

// Re-export core types
pub use routesync_core::*;

pub use dispatches::{DispatchRepository, UPSERT_BATCH_SIZE};
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use reference::ReferenceRepository;
pub use routes::RouteRepository;

/// Main database access facade, bundling the repositories.
#[derive(Debug, Clone)]
pub struct Database {
    pool: sqlx::PgPool,
    /// Route repository.
    pub routes: RouteRepository,
    /// Dispatch repository.
    pub dispatches: DispatchRepository,
    /// Read-only reference mappings.
    pub reference: ReferenceRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            routes: RouteRepository::new(pool.clone()),
            dispatches: DispatchRepository::new(pool.clone()),
            reference: ReferenceRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}
