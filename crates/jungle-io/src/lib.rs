//! CSV ingestion and JSON prediction artifacts for jungle models.

mod error;
mod reader;
mod writer;

pub use error::IoError;
pub use reader::FrameReader;
pub use writer::{ExperimentName, PredictionWriter};
