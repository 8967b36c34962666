//! # tally-db: SQLite Storage for Tally
//!
//! sqlx-backed implementations of the [`CatalogStore`] and [`OrderStore`]
//! traits from tally-core.
//!
//! ## What Lives Where
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  pool.rs        DbConfig, Database (pool + repository factory)          │
//! │  migrations.rs  embedded migrations/sqlite/*.sql                        │
//! │  error.rs       DbError, mapping into StoreError                        │
//! │  repository/                                                            │
//! │  ├── product.rs ProductRepository  (CatalogStore)                       │
//! │  └── order.rs   OrderRepository    (OrderStore)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Guarantees
//! - Stock changes are a single conditional `UPDATE ... WHERE stock + ?1 >= 0`,
//!   so concurrent reservations can't oversell.
//! - An order header and its items are written in one transaction.
//! - Deleting an order cascades to its items.
//!
//! ## Usage
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//! let products = db.products().list(owner_id).await?;
//! ```
//!
//! [`CatalogStore`]: tally_core::CatalogStore
//! [`OrderStore`]: tally_core::OrderStore

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
