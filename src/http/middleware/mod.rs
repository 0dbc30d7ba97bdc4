//! Request middleware for gated routes.

pub mod attestation;

pub use attestation::attestation_middleware;
