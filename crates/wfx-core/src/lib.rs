//! WFX-Core: Foundation types for windowed feature extraction
//!
//! Recordings, windows, units and the shared error type.

pub mod error;
pub mod recording;
pub mod unit;
pub mod window;

pub use error::{WfxError, WfxResult};
pub use recording::{Event, Recording};
pub use unit::{UnitId, UnitOutcome, UnitStatus};
pub use window::Window;
