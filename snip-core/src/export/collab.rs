//! Collaborator seams the orchestrator depends on. The surrounding
//! application (browser host, mini-program runtime, CLI) implements these;
//! the core never touches a canvas, file picker, or permission dialog
//! itself.

use crate::error::Result;

/// Materializes the encoded raster bytes of one rendered tile from the
/// path the renderer left them at. Called once per tile, strictly in
/// partition order.
pub trait TileStore {
    fn read_bytes(&mut self, path: &str) -> Result<Vec<u8>>;
}

/// Persists one tile image to its final destination (photo album, output
/// directory). Album mode only.
pub trait ItemSink {
    fn persist(&mut self, bytes: &[u8], file_name: &str) -> Result<()>;
}

/// Album persistence capability, with the two fallback steps the
/// orchestrator may take when the capability is missing.
pub trait PermissionGateway {
    fn check_granted(&mut self) -> Result<bool>;
    fn request(&mut self) -> Result<()>;
    fn open_settings_and_recheck(&mut self) -> Result<bool>;
}

/// Hands a finished file to the user (download, save dialog). Fire and
/// forget: delivery failures never reach the export summary.
pub trait FileDelivery {
    fn deliver(&mut self, bytes: &[u8], file_name: &str);
}

/// Best-effort user-facing guidance, shown at most once per run.
pub trait GuidancePrompt {
    fn show_guidance(&mut self, title: &str, body: &str);
}
