//! HTTP request handlers.
//!
//! [`records`] holds the handlers shared by every resource router.

pub mod health;
pub mod records;

pub use health::health_check;
