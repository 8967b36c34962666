//! # Repository Module
//!
//! SQLite implementations of the tally-core store traits.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OrderEngine / CatalogService                                          │
//! │       │                                                                 │
//! │       │  Arc<dyn CatalogStore>, Arc<dyn OrderStore>                    │
//! │       ▼                                                                 │
//! │  ProductRepository                 OrderRepository                     │
//! │  ├── insert / update / delete      ├── insert (header + items, tx)     │
//! │  ├── get_by_id / get_by_code       ├── get_by_id / list                │
//! │  ├── list                          ├── update_status                   │
//! │  └── update_stock (conditional)    └── delete (items cascade)          │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each repository exposes its SQL operations as inherent methods returning
//! [`DbResult`](crate::error::DbResult) and implements the matching trait by
//! converting into [`StoreError`](tally_core::StoreError).

pub mod order;
pub mod product;
