//! # Repository Module
//!
//! Database repositories for the shop.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OrderService / seed binary                                            │
//! │       │                                                                 │
//! │       │  db.discounts().find_active_by_code("SPRING")                  │
//! │       ▼                                                                 │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐      │
//! │  │ SettingRepository│  │DiscountRepository│  │ OrderRepository  │      │
//! │  │ settings         │  │ discounts        │  │ orders + lines   │      │
//! │  └──────────────────┘  └──────────────────┘  └──────────────────┘      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories only move data. Pricing rules stay in `satchmo-core`.
//!
//! ## Available Repositories
//!
//! - [`SettingRepository`](setting::SettingRepository) - Persisted setting overrides
//! - [`DiscountRepository`](discount::DiscountRepository) - Discount codes and usage
//! - [`OrderRepository`](order::OrderRepository) - Orders, tax details, payments

pub mod discount;
pub mod order;
pub mod setting;
