//! Shared utilities

pub mod error;
pub mod observable;

pub use error::{AppError, AppResult, ErrorResponse};
pub use observable::{Observable, Subscription};
