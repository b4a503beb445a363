use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "snipdev CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ModeArg {
    /// One combined zip download
    Archive,
    /// Per-tile persistence into the output directory
    Album,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the tile rectangles for an image size and grid
    Plan {
        image_width: i64,
        image_height: i64,

        #[arg(long, default_value_t = 3)]
        rows: i64,

        #[arg(long, default_value_t = 3)]
        cols: i64,

        #[arg(long, default_value_t = 0)]
        gap: i64,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Store files into an uncompressed zip
    Pack {
        out: PathBuf,
        inputs: Vec<PathBuf>,
    },

    /// List zip entries
    List { archive: PathBuf },

    /// Extract a stored-only zip to a destination directory
    Extract { archive: PathBuf, dest: PathBuf },

    /// Run an export over pre-rendered tile files (row-major name order)
    Export {
        /// Directory holding one rendered image file per tile
        tiles_dir: PathBuf,

        image_width: i64,
        image_height: i64,

        #[arg(long, default_value_t = 3)]
        rows: i64,

        #[arg(long, default_value_t = 3)]
        cols: i64,

        #[arg(long, default_value_t = 0)]
        gap: i64,

        #[arg(long, value_enum, default_value = "archive")]
        mode: ModeArg,

        /// File name stem for tiles and the combined archive
        #[arg(long)]
        base_name: Option<String>,

        /// Where delivered/persisted files are written
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}
