//! # tally-engine: Order Lifecycle & Inventory Engine
//!
//! Owner-scoped catalog management and order processing that keeps product
//! stock consistent with the orders holding it.
//!
//! ## Module Organization
//! ```text
//! tally_engine/
//! ├── lib.rs        ◄─── You are here (exports)
//! ├── orders.rs     ◄─── OrderEngine: create / transition / cancel / delete
//! ├── catalog.rs    ◄─── CatalogService: product CRUD & stock adjustment
//! ├── memory.rs     ◄─── InMemoryStore: both store traits, process-local
//! ├── bootstrap.rs  ◄─── Engines: wiring over memory or SQLite
//! ├── config.rs     ◄─── EngineConfig / AppConfig from the environment
//! └── telemetry.rs  ◄─── tracing subscriber setup
//! ```
//!
//! ## Stock Accounting
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_order     stock -= qty   (atomic, never below zero)             │
//! │  cancel_order     stock += qty   (only pending / confirmed orders)      │
//! │  update_status    stock unchanged                                       │
//! │  delete_order     stock unchanged (order must already be cancelled)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use tally_engine::{init_tracing, AppConfig, Engines};
//!
//! init_tracing();
//! let config = AppConfig::from_env()?;
//! let engines = Engines::sqlite(&config).await?;
//!
//! let order = engines.orders.create_order(owner, &lines).await?;
//! engines.orders.cancel_order(order.id, owner).await?;
//! ```

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod memory;
pub mod orders;
pub mod telemetry;

pub use bootstrap::Engines;
pub use catalog::CatalogService;
pub use config::{AppConfig, ConfigError, EngineConfig};
pub use memory::InMemoryStore;
pub use orders::{Cancellation, OrderEngine};
pub use telemetry::init_tracing;
