//! Talent Ops Core - shared types and pure access-control logic.
//!
//! This crate is used by every Talent Ops component:
//! - `client` - HTTP, session, storage and realtime plumbing
//! - `cli` - The `tops` command-line front-end
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no storage. Anything that needs the network or the disk lives in
//! `talent-ops-client`.
//!
//! # Modules
//!
//! - [`types`] - Ids, permissions, roles, users, the API envelope, theme mode
//! - [`registry`] - Role list and current-role permission checks
//! - [`gate`] - Element-level permission requirements and one-way gates
//! - [`realtime`] - Realtime message envelope and built-in notifications
//! - [`route`] - Route table and the authentication guard
//! - [`notice`] - User-facing notices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod gate;
pub mod notice;
pub mod realtime;
pub mod registry;
pub mod route;
pub mod types;

pub use gate::{PermissionBinding, PermissionGate, PermissionRequirement, is_visible};
pub use notice::{Notice, NoticeLevel};
pub use registry::{PermissionRegistry, RoleError};
pub use types::*;
