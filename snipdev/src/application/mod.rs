pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use snip_core::error::Result;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Plan {
            image_width,
            image_height,
            rows,
            cols,
            gap,
            json,
        } => handlers::handle_plan(image_width, image_height, rows, cols, gap, json),

        Commands::Pack { out, inputs } => handlers::handle_pack(out, inputs),

        Commands::List { archive } => handlers::handle_list(archive),

        Commands::Extract { archive, dest } => handlers::handle_extract(archive, dest),

        Commands::Export {
            tiles_dir,
            image_width,
            image_height,
            rows,
            cols,
            gap,
            mode,
            base_name,
            out_dir,
            json,
        } => handlers::handle_export(
            tiles_dir,
            image_width,
            image_height,
            rows,
            cols,
            gap,
            mode,
            base_name,
            out_dir,
            json,
        ),
    }
}
