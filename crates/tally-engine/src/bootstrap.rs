//! # Engine Wiring
//!
//! Builds an [`OrderEngine`] and a [`CatalogService`] that share one backend.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Engines::in_memory(config)                                             │
//! │     InMemoryStore ──┬──► CatalogService                                │
//! │                     └──► OrderEngine (catalog + orders)                │
//! │                                                                         │
//! │  Engines::sqlite(&app_config)                                           │
//! │     Database ──┬── products() ──► CatalogService, OrderEngine          │
//! │                └── orders()   ──► OrderEngine                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::info;

use tally_db::{Database, DbResult};

use crate::catalog::CatalogService;
use crate::config::{AppConfig, EngineConfig};
use crate::memory::InMemoryStore;
use crate::orders::OrderEngine;

/// The services of one running instance.
#[derive(Clone)]
pub struct Engines {
    pub orders: OrderEngine,
    pub catalog: CatalogService,
    /// Present for the SQLite backend, so callers can close or health-check it.
    pub database: Option<Database>,
}

impl Engines {
    /// Engines over a fresh, process-local store.
    pub fn in_memory(config: EngineConfig) -> Self {
        let store = InMemoryStore::new();

        Engines {
            orders: OrderEngine::new(Arc::new(store.clone()), Arc::new(store.clone()), config),
            catalog: CatalogService::new(Arc::new(store)),
            database: None,
        }
    }

    /// Engines over the SQLite database described by `config`.
    ///
    /// Opens the pool and runs pending migrations.
    pub async fn sqlite(config: &AppConfig) -> DbResult<Self> {
        let db = Database::new(config.db_config()).await?;

        info!(path = %config.db_path.display(), "SQLite backend ready");

        Ok(Engines {
            orders: OrderEngine::new(
                Arc::new(db.products()),
                Arc::new(db.orders()),
                config.engine.clone(),
            ),
            catalog: CatalogService::new(Arc::new(db.products())),
            database: Some(db),
        })
    }

    /// Closes the database pool, if any.
    pub async fn shutdown(&self) {
        if let Some(db) = &self.database {
            db.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{NewProduct, OrderLine};

    #[tokio::test]
    async fn test_in_memory_engines_share_store() {
        let engines = Engines::in_memory(EngineConfig::default());

        let product = engines
            .catalog
            .create_product(
                1,
                NewProduct {
                    owner_id: 1,
                    code: "SKU-1".to_string(),
                    name: "Widget".to_string(),
                    description: String::new(),
                    price_cents: 250,
                    stock: 3,
                },
            )
            .await
            .unwrap();

        engines
            .orders
            .create_order(1, &[OrderLine::new(product.id, 2)])
            .await
            .unwrap();

        assert_eq!(
            engines.catalog.get_product(product.id, 1).await.unwrap().stock,
            1
        );
        assert!(engines.database.is_none());
        engines.shutdown().await;
    }
}
