//! Report module - run summaries, evaluation tables and JSON export

pub mod evaluation;
pub mod exploration;
pub mod export;
pub mod summary;

pub use evaluation::*;
pub use exploration::*;
pub use export::*;
pub use summary::*;
