pub mod use_cases;

pub use use_cases::conversion_session::{ConversionSession, ConversionSummary, SessionSnapshot};
pub use use_cases::export::{ExportArtifact, ExportFormat};
