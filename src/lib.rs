pub mod core;
pub mod dash;
pub mod naming;
pub mod plot;
pub mod query;
pub mod range;
pub mod sync;
pub mod wasm_api;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrendingError {
    #[error("Bin count must be positive")]
    InvalidBinCount,

    #[error("Unknown error bar mode: {0}")]
    UnknownErrorBars(String),

    #[error("Unknown axis: {0}")]
    UnknownAxis(String),

    #[error("Unknown drop zone: {0}")]
    UnknownDropZone(String),

    #[error("Invalid time window: start {start} is after end {end}")]
    InvalidWindow { start: i64, end: i64 },

    #[error("Data reload failed: {0}")]
    Reload(String),
}

pub type Result<T> = std::result::Result<T, error_stack::Report<TrendingError>>;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

pub mod prelude {
    pub use crate::core::*;
    pub use crate::dash::*;
    pub use crate::naming::*;
    pub use crate::plot::*;
    pub use crate::query::*;
    pub use crate::range::*;
    pub use crate::sync::*;
    pub use crate::{Result, TrendingError};
}
