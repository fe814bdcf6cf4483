//! Database layer
//!
//! SQLite is the default backend; MySQL is available for larger deployments.
//! The driver is picked from configuration and hidden behind the
//! `DatabasePool` trait, so repositories only ever see a `DynDatabasePool`.
//!
//! ```ignore
//! use cookbook::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config.database).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
