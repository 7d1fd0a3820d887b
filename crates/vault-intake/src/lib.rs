//! Vault credit application intake.
//!
//! [`schema`] defines the applicant record once; [`relay`] enforces it on the
//! server and forwards valid applications to the upstream evaluation service;
//! [`form`] enforces it again on the client and renders the outcome.

pub mod config;
pub mod error;
pub mod form;
pub mod relay;
pub mod schema;
pub mod telemetry;
