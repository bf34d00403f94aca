//! OnAndHome Core - Shared types and domain rules.
//!
//! This crate provides the types and pure rules used across all OnAndHome components:
//! - `server` - Storefront and admin JSON API with WebSocket notifications
//! - `cli` - Command-line tools for migrations, admin users and seed data
//!
//! # Architecture
//!
//! The core crate contains only types and rules - no I/O, no database access,
//! no HTTP clients. The server leans on it for anything that must behave the
//! same for every caller (cart totals, order transitions, notification audiences).
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, emails, roles and statuses
//! - [`cart`] - Cart selection state and total computation
//! - [`order`] - Order numbers, status transitions and summaries
//! - [`catalog`] - Product category tree

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod order;
pub mod types;

pub use types::*;
