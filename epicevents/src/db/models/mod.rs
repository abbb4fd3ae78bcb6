//! Database record models matching table schemas.
//!
//! This module contains struct definitions that directly correspond to database
//! table rows. These models are used by repositories to return query results
//! and accept insertion/update data.
//!
//! # Design Principles
//!
//! - **Schema Mapping**: Each model struct matches a database table schema
//! - **SQLx Integration**: Response models derive `sqlx::FromRow` for query results
//! - **Request/Response Split**: Create and update requests are separate structs,
//!   with `None` meaning "leave unchanged" on updates
//!
//! # Model Categories
//!
//! - [`collaborators`]: staff accounts, the [`collaborators::Role`] department
//!   enum, and password hashes
//! - [`clients`]: clients and their responsible commercial
//! - [`contracts`]: contracts with amounts and signature state
//! - [`events`]: events with dates, logistics, and support assignment

pub mod clients;
pub mod collaborators;
pub mod contracts;
pub mod events;
