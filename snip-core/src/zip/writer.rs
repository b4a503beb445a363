//! Stored-only zip encoder: local records, central directory, end record.
//!
//! Every multi-byte field is little-endian. Entries are written in input
//! order with no compression transform, so a conformant reader can seek an
//! entry in constant time from its central-directory offset.

use crate::checksum::crc32;
use crate::error::{Result, SnipError};
use crate::zip::date::{DosDateTime, to_dos_datetime};
use std::io::Write;
use time::OffsetDateTime;
use tracing::debug;

pub const LOCAL_MAGIC: u32 = 0x0403_4b50;
pub const CENTRAL_MAGIC: u32 = 0x0201_4b50;
pub const EOCD_MAGIC: u32 = 0x0605_4b50;

pub const ZIP_VERSION: u16 = 20;
pub const METHOD_STORE: u16 = 0;
/// General-purpose flag bit: entry name is UTF-8.
pub const FLAG_UTF8: u16 = 0x0800;

/// Fallback for blank or whitespace-only entry names.
pub const DEFAULT_ENTRY_NAME: &str = "slice.png";

/// One named payload to store in the archive.
#[derive(Clone, Debug)]
pub struct ZipEntry {
    pub name: String,
    pub data: Vec<u8>,
    /// Entry modification time; defaults to now when `None`.
    pub modified: Option<OffsetDateTime>,
}

fn normalized_name(name: &str) -> &str {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        DEFAULT_ENTRY_NAME
    } else {
        trimmed
    }
}

fn write_local_header(
    mut w: impl Write,
    name: &[u8],
    crc: u32,
    size: u32,
    dt: DosDateTime,
) -> std::io::Result<()> {
    w.write_all(&LOCAL_MAGIC.to_le_bytes())?;
    w.write_all(&ZIP_VERSION.to_le_bytes())?;
    w.write_all(&FLAG_UTF8.to_le_bytes())?;
    w.write_all(&METHOD_STORE.to_le_bytes())?;
    w.write_all(&dt.time.to_le_bytes())?;
    w.write_all(&dt.date.to_le_bytes())?;
    w.write_all(&crc.to_le_bytes())?;
    w.write_all(&size.to_le_bytes())?; // compressed == stored
    w.write_all(&size.to_le_bytes())?; // uncompressed
    w.write_all(&(name.len() as u16).to_le_bytes())?;
    w.write_all(&0u16.to_le_bytes())?; // extra field length
    w.write_all(name)?;
    Ok(())
}

fn write_central_header(
    mut w: impl Write,
    name: &[u8],
    crc: u32,
    size: u32,
    dt: DosDateTime,
    local_offset: u32,
) -> std::io::Result<()> {
    w.write_all(&CENTRAL_MAGIC.to_le_bytes())?;
    w.write_all(&ZIP_VERSION.to_le_bytes())?; // version made by
    w.write_all(&ZIP_VERSION.to_le_bytes())?; // version needed
    w.write_all(&FLAG_UTF8.to_le_bytes())?;
    w.write_all(&METHOD_STORE.to_le_bytes())?;
    w.write_all(&dt.time.to_le_bytes())?;
    w.write_all(&dt.date.to_le_bytes())?;
    w.write_all(&crc.to_le_bytes())?;
    w.write_all(&size.to_le_bytes())?;
    w.write_all(&size.to_le_bytes())?;
    w.write_all(&(name.len() as u16).to_le_bytes())?;
    w.write_all(&0u16.to_le_bytes())?; // extra field length
    w.write_all(&0u16.to_le_bytes())?; // comment length
    w.write_all(&0u16.to_le_bytes())?; // disk number start
    w.write_all(&0u16.to_le_bytes())?; // internal attributes
    w.write_all(&0u32.to_le_bytes())?; // external attributes
    w.write_all(&local_offset.to_le_bytes())?;
    w.write_all(name)?;
    Ok(())
}

fn write_eocd(
    mut w: impl Write,
    entry_count: u16,
    central_size: u32,
    central_offset: u32,
) -> std::io::Result<()> {
    w.write_all(&EOCD_MAGIC.to_le_bytes())?;
    w.write_all(&0u16.to_le_bytes())?; // this disk
    w.write_all(&0u16.to_le_bytes())?; // directory disk
    w.write_all(&entry_count.to_le_bytes())?;
    w.write_all(&entry_count.to_le_bytes())?;
    w.write_all(&central_size.to_le_bytes())?;
    w.write_all(&central_offset.to_le_bytes())?;
    w.write_all(&0u16.to_le_bytes())?; // comment length
    Ok(())
}

/// Serialize `entries` into one complete stored-only zip buffer.
///
/// Fails on an empty entry list and on anything that would overflow the
/// 32-bit size/offset fields (no zip64). The output is either a complete,
/// internally consistent archive or nothing.
pub fn write_archive(entries: &[ZipEntry]) -> Result<Vec<u8>> {
    if entries.is_empty() {
        return Err(SnipError::EmptyArchive);
    }
    let entry_count = u16::try_from(entries.len())
        .map_err(|_| SnipError::Format(format!("too many entries: {}", entries.len())))?;

    let now = OffsetDateTime::now_utc();
    let mut local = Vec::new();
    let mut central = Vec::new();

    for entry in entries {
        let name = normalized_name(&entry.name).as_bytes();
        if name.len() > u16::MAX as usize {
            return Err(SnipError::Format("entry name too long".into()));
        }
        let size = u32::try_from(entry.data.len())
            .map_err(|_| SnipError::Format("entry exceeds 4 GiB stored limit".into()))?;
        // Offset of this entry's local record = total bytes written so far.
        let local_offset = u32::try_from(local.len())
            .map_err(|_| SnipError::Format("archive exceeds 4 GiB offset limit".into()))?;

        let dt = to_dos_datetime(entry.modified.unwrap_or(now));
        let crc = crc32(&entry.data);

        write_local_header(&mut local, name, crc, size, dt)?;
        local.extend_from_slice(&entry.data);
        write_central_header(&mut central, name, crc, size, dt, local_offset)?;
    }

    let central_offset = u32::try_from(local.len())
        .map_err(|_| SnipError::Format("archive exceeds 4 GiB offset limit".into()))?;
    let central_size = u32::try_from(central.len())
        .map_err(|_| SnipError::Format("central directory too large".into()))?;

    let mut out = local;
    out.extend_from_slice(&central);
    write_eocd(&mut out, entry_count, central_size, central_offset)?;

    debug!(
        entries = entries.len(),
        bytes = out.len(),
        "zip archive encoded"
    );
    Ok(out)
}
