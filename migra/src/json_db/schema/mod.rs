//! Validation des schémas de collections

pub mod validator;

pub use validator::{validate_collection, validate_field};
