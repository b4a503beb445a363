use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnipError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A grid parameter that must be a positive integer was not.
    #[error("{name} must be an integer greater than 0 (got {value})")]
    NonPositive { name: &'static str, value: i64 },

    #[error("gap must be zero or greater (got {0})")]
    NegativeGap(i64),

    /// An image dimension beyond the 32-bit pixel range.
    #[error("{name} exceeds the supported maximum of {max} pixels (got {value})")]
    OversizedDimension {
        name: &'static str,
        value: i64,
        max: u32,
    },

    /// Rows, cols, and gap leave no room for the tiles themselves.
    #[error("grid does not fit the image; reduce rows, cols, or gap")]
    GridTooLarge,

    #[error("archive requires at least one entry")]
    EmptyArchive,

    #[error("no tiles to export")]
    NoTiles,

    /// Browser/archive mode produced zero readable tiles.
    #[error("no tile could be archived: {0}")]
    NothingArchived(String),

    /// Album permission remained denied after the request and
    /// settings-reopen fallbacks.
    #[error("album permission was not granted")]
    PermissionDenied,

    /// Per-tile save or read failure reported by a collaborator.
    #[error("save failed: {0}")]
    Persistence(String),

    #[error("Format error: {0}")]
    Format(String),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, SnipError>;
