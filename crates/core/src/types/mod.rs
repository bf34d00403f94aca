//! Core types for OnAndHome.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod notification;
pub mod role;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::Won;
pub use notification::{BulkAudience, NotificationType, RecipientProfile};
pub use role::UserRole;
pub use status::*;
