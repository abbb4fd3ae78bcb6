//! Repository implementations for database access.
//!
//! This module provides repository structs for each entity in the system.
//! Repositories follow a consistent pattern and implement the [`Repository`] trait.
//!
//! # Design Pattern
//!
//! Each repository:
//! - Wraps a SQLx connection or transaction
//! - Provides strongly-typed CRUD operations
//! - Handles query construction and parameter binding
//! - Returns domain models from [`crate::db::models`]
//!
//! # Available Repositories
//!
//! - [`Collaborators`]: staff account management and authentication lookups
//! - [`Clients`]: client records and per-commercial ownership
//! - [`Contracts`]: contract amounts and signature state
//! - [`Events`]: event logistics and support assignment
//!
//! # Common Pattern
//!
//! All repositories follow this usage pattern:
//!
//! ```ignore
//! use epicevents::db::handlers::{Clients, Repository};
//!
//! async fn example(pool: &sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut conn = pool.acquire().await?;
//!     let mut repo = Clients::new(&mut conn);
//!
//!     let clients = repo.list(&Default::default()).await?;
//!     Ok(())
//! }
//! ```

pub mod clients;
pub mod collaborators;
pub mod contracts;
pub mod events;
pub mod repository;

pub use clients::Clients;
pub use collaborators::Collaborators;
pub use contracts::Contracts;
pub use events::Events;
pub use repository::Repository;
