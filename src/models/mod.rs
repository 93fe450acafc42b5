//! Data models for the Secret Santa backend.
//!
//! Wire types are camelCase to match the frontend interfaces.

mod assignment;
mod import;
mod member;

pub use assignment::*;
pub use import::*;
pub use member::*;
