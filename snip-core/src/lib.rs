#![forbid(unsafe_code)]

pub mod error;

pub mod checksum;
pub mod grid;

pub mod zip {
    pub mod date;
    pub mod reader;
    pub mod writer;
}

pub mod export {
    pub mod collab;
    pub mod run;
    pub mod summary;
}

// Re-exports: stable API surface
pub use error::{Result, SnipError};
pub use export::collab::{FileDelivery, GuidancePrompt, ItemSink, PermissionGateway, TileStore};
pub use export::run::{ExportEnv, ExportMode, ExportOptions, TileSlice, export};
pub use export::summary::ExportSummary;
pub use grid::{TileRect, partition, validate_grid};
pub use zip::reader::{EntryInfo, list_archive, read_archive};
pub use zip::writer::{ZipEntry, write_archive};
