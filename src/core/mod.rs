//! Core business logic abstractions

pub mod config;
pub mod convert;
pub mod log;
pub mod rates;
pub mod screen;

// Re-export main types for cleaner imports
pub use convert::{ConversionRequest, ConversionResult};
pub use rates::{RateProvider, RateTable};
pub use screen::{Notice, NoticeKind, Screen, Status};
