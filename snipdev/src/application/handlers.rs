use std::fs;
use std::path::{Path, PathBuf};

use snip_core::error::{Result, SnipError};
use snip_core::zip::writer::ZipEntry;
use snip_core::{
    ExportEnv, ExportMode, ExportOptions, FileDelivery, GuidancePrompt, ItemSink,
    PermissionGateway, TileSlice, TileStore, export, list_archive, partition, read_archive,
    write_archive,
};

use crate::presentation::cli::ModeArg;
use time::OffsetDateTime;
use tracing::warn;
use walkdir::WalkDir;

/// Reads rendered tile bytes straight from disk.
struct FsTileStore;

impl TileStore for FsTileStore {
    fn read_bytes(&mut self, path: &str) -> Result<Vec<u8>> {
        Ok(fs::read(path)?)
    }
}

/// Album-mode stand-in: persists each tile into a directory.
struct DirSink {
    dir: PathBuf,
}

impl ItemSink for DirSink {
    fn persist(&mut self, bytes: &[u8], file_name: &str) -> Result<()> {
        Ok(fs::write(self.dir.join(file_name), bytes)?)
    }
}

/// The CLI has no permission dialog to show; saving is always allowed.
struct GrantedGateway;

impl PermissionGateway for GrantedGateway {
    fn check_granted(&mut self) -> Result<bool> {
        Ok(true)
    }

    fn request(&mut self) -> Result<()> {
        Ok(())
    }

    fn open_settings_and_recheck(&mut self) -> Result<bool> {
        Ok(true)
    }
}

struct FsDelivery {
    dir: PathBuf,
}

impl FileDelivery for FsDelivery {
    fn deliver(&mut self, bytes: &[u8], file_name: &str) {
        // fire and forget, matching the download-trigger contract
        if let Err(e) = fs::write(self.dir.join(file_name), bytes) {
            warn!(file_name, error = %e, "delivery failed");
        }
    }
}

struct LogPrompt;

impl GuidancePrompt for LogPrompt {
    fn show_guidance(&mut self, title: &str, body: &str) {
        warn!(title, body, "user guidance");
    }
}

fn mtime_of(path: &Path) -> Option<OffsetDateTime> {
    fs::metadata(path)
        .and_then(|md| md.modified())
        .ok()
        .map(OffsetDateTime::from)
}

fn entry_name(path: &Path, roots: &[PathBuf]) -> String {
    for root in roots {
        if let Ok(rel) = path.strip_prefix(root) {
            if !rel.as_os_str().is_empty() {
                return rel.to_string_lossy().replace('\\', "/");
            }
        }
    }
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn safe_join(root: &Path, rel: &str) -> Result<PathBuf> {
    if Path::new(rel).is_absolute() || rel.contains("../") || rel.contains("..\\") {
        return Err(SnipError::Format(format!("unsafe entry path: {rel}")));
    }
    Ok(root.join(rel))
}

pub fn handle_plan(
    image_width: i64,
    image_height: i64,
    rows: i64,
    cols: i64,
    gap: i64,
    json: bool,
) -> Result<()> {
    let rects = partition(image_width, image_height, rows, cols, gap)?;
    if json {
        let rendered = serde_json::to_string_pretty(&rects)
            .map_err(|e| SnipError::Format(e.to_string()))?;
        println!("{rendered}");
        return Ok(());
    }
    for r in &rects {
        println!(
            "#{:<4} r{} c{}  at ({}, {})  {}x{}",
            r.index, r.row, r.col, r.x, r.y, r.width, r.height
        );
    }
    Ok(())
}

pub fn handle_pack(out: PathBuf, inputs: Vec<PathBuf>) -> Result<()> {
    let mut files: Vec<PathBuf> = Vec::new();
    for input in &inputs {
        if input.is_dir() {
            for e in WalkDir::new(input).follow_links(false) {
                let e = e.map_err(|e| SnipError::Format(e.to_string()))?;
                if e.file_type().is_file() {
                    files.push(e.path().to_path_buf());
                }
            }
        } else {
            files.push(input.clone());
        }
    }
    files.sort();
    if files.is_empty() {
        return Err(SnipError::EmptyArchive);
    }

    let mut entries = Vec::with_capacity(files.len());
    for f in &files {
        entries.push(ZipEntry {
            name: entry_name(f, &inputs),
            data: fs::read(f)?,
            modified: mtime_of(f),
        });
    }

    let buf = write_archive(&entries)?;
    fs::write(&out, &buf)?;
    println!("{}: {} entries, {} bytes", out.display(), entries.len(), buf.len());
    Ok(())
}

pub fn handle_list(archive: PathBuf) -> Result<()> {
    let buf = fs::read(&archive)?;
    for info in list_archive(&buf)? {
        println!(
            "{}  {} bytes  crc={:#010x}  off={}",
            info.name, info.size, info.crc32, info.local_offset
        );
    }
    Ok(())
}

pub fn handle_extract(archive: PathBuf, dest: PathBuf) -> Result<()> {
    let buf = fs::read(&archive)?;
    fs::create_dir_all(&dest)?;
    for (name, data) in read_archive(&buf)? {
        let out = safe_join(&dest, &name)?;
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out, &data)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn handle_export(
    tiles_dir: PathBuf,
    image_width: i64,
    image_height: i64,
    rows: i64,
    cols: i64,
    gap: i64,
    mode: ModeArg,
    base_name: Option<String>,
    out_dir: PathBuf,
    json: bool,
) -> Result<()> {
    let rects = partition(image_width, image_height, rows, cols, gap)?;

    let mut paths: Vec<PathBuf> = fs::read_dir(&tiles_dir)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    if paths.len() != rects.len() {
        return Err(SnipError::Format(format!(
            "expected {} tile files for a {}x{} grid, found {}",
            rects.len(),
            rows,
            cols,
            paths.len()
        )));
    }

    let tiles: Vec<TileSlice> = rects
        .iter()
        .zip(&paths)
        .map(|(r, p)| TileSlice {
            index: r.index,
            row: r.row,
            col: r.col,
            width: r.width,
            height: r.height,
            path: p.to_string_lossy().to_string(),
        })
        .collect();

    fs::create_dir_all(&out_dir)?;
    let opts = ExportOptions {
        mode: match mode {
            ModeArg::Archive => ExportMode::Archive,
            ModeArg::Album => ExportMode::Album,
        },
        base_name,
    };

    let mut store = FsTileStore;
    let mut sink = DirSink {
        dir: out_dir.clone(),
    };
    let mut permissions = GrantedGateway;
    let mut delivery = FsDelivery { dir: out_dir };
    let mut prompt = LogPrompt;

    let summary = export(
        &tiles,
        &opts,
        &mut ExportEnv {
            store: &mut store,
            sink: &mut sink,
            permissions: &mut permissions,
            delivery: &mut delivery,
            prompt: &mut prompt,
        },
    )?;

    if json {
        let rendered = serde_json::to_string_pretty(&summary)
            .map_err(|e| SnipError::Format(e.to_string()))?;
        println!("{rendered}");
    } else {
        println!(
            "exported {}/{} tiles ({} failed{})",
            summary.success_count,
            summary.total,
            summary.failed_count,
            if summary.permission_denied {
                ", permission denied"
            } else {
                ""
            }
        );
        if let Some(msg) = &summary.first_error_message {
            println!("first error: {msg}");
        }
    }
    Ok(())
}
