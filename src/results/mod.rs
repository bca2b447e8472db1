//! Run result export

mod export;

pub use export::{export, EnvironmentInfo, ExportFormat, ExportedRun};
