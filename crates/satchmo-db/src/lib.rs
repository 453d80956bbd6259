//! # satchmo-db: Storage Layer for Satchmo
//!
//! SQLite persistence for the shop, using sqlx for async access. Pricing
//! and settings resolution stay in `satchmo-core`; this crate loads their
//! inputs and stores their results.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  seed binary / host application                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    satchmo-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────────┐   ┌─────────────────┐   ┌────────────────┐   │   │
//! │  │   │  AppConfig  │   │  OrderService   │   │   Migrations   │   │   │
//! │  │   │ satchmo.toml│   │  (service.rs)   │   │   (embedded)   │   │   │
//! │  │   └─────────────┘   └────────┬────────┘   └────────────────┘   │   │
//! │  │                              ▼                                  │   │
//! │  │   ┌─────────────┐   ┌─────────────────┐                         │   │
//! │  │   │  Database   │◄──│  Repositories   │                         │   │
//! │  │   │  (pool.rs)  │   │ setting/discount│                         │   │
//! │  │   │  SqlitePool │   │ /order          │                         │   │
//! │  │   └─────────────┘   └─────────────────┘                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (platform data dir, or SATCHMO_DB_PATH)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Application config file and environment overrides
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Settings, discount and order repositories
//! - [`service`] - Checkout, recalculation and payments
//!
//! ## Usage
//!
//! ```rust,ignore
//! use satchmo_core::configuration::{register_default_settings, ConfigurationSettings};
//! use satchmo_db::{AppConfig, Database, OrderService};
//!
//! let app = AppConfig::load(None)?;
//! let db = Database::new(app.db_config()).await?;
//!
//! let mut settings = ConfigurationSettings::new();
//! register_default_settings(&mut settings)?;
//! db.settings().hydrate(&mut settings).await?;
//!
//! let placed = OrderService::new(db.clone())
//!     .place_order(&cart, shipping, Some("SPRING"), &settings, today)
//!     .await?;
//! ```

use tracing_subscriber::EnvFilter;

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, DEFAULT_LOG_FILTER};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use service::{OrderService, PlacedOrder};

// Repository re-exports for convenience
pub use repository::discount::DiscountRepository;
pub use repository::order::OrderRepository;
pub use repository::setting::SettingRepository;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over `filter`. Calling it a second time is a no-op.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
