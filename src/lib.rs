//! Identity and access-control core.
//!
//! Covers the credential lifecycle (registration, email confirmation, login
//! with lockout, password reset), purpose-scoped token issuance and
//! verification, and role-based access provisioning with atomic multi-step
//! writes. Transport, persistence engines, and email rendering live behind
//! the [`store::CredentialStore`] and [`services::Notifier`] seams.

pub mod config;
pub mod dtos;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;
