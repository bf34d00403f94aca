//! OnAndHome API server library.
//!
//! Storefront and back-office JSON API, STOMP notifications over
//! WebSocket, and the Postgres persistence behind them. Exposed as a
//! library so the router can be exercised in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod services;
pub mod state;
