//! Minimal stored-only zip reader: central-directory walk plus payload
//! extraction with CRC verification. Counterpart of [`crate::zip::writer`].

use crate::checksum::crc32;
use crate::error::{Result, SnipError};
use crate::zip::writer::{CENTRAL_MAGIC, EOCD_MAGIC, LOCAL_MAGIC, METHOD_STORE};

const EOCD_LEN: usize = 22;
const CENTRAL_LEN: usize = 46;
const LOCAL_LEN: usize = 30;

/// Central-directory view of one entry.
#[derive(Clone, Debug)]
pub struct EntryInfo {
    pub name: String,
    pub size: u64,
    pub crc32: u32,
    pub local_offset: u64,
}

fn fmt_err(msg: &str) -> SnipError {
    SnipError::Format(msg.to_string())
}

fn u16_at(buf: &[u8], off: usize) -> Result<u16> {
    let b: [u8; 2] = buf
        .get(off..off + 2)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| fmt_err("truncated archive"))?;
    Ok(u16::from_le_bytes(b))
}

fn u32_at(buf: &[u8], off: usize) -> Result<u32> {
    let b: [u8; 4] = buf
        .get(off..off + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| fmt_err("truncated archive"))?;
    Ok(u32::from_le_bytes(b))
}

/// Find the end-of-directory record, scanning backwards to tolerate a
/// trailing archive comment.
fn find_eocd(buf: &[u8]) -> Result<usize> {
    if buf.len() < EOCD_LEN {
        return Err(fmt_err("too small to be a zip archive"));
    }
    let mut pos = buf.len() - EOCD_LEN;
    loop {
        if u32_at(buf, pos)? == EOCD_MAGIC {
            return Ok(pos);
        }
        if pos == 0 {
            return Err(fmt_err("end-of-directory record not found"));
        }
        pos -= 1;
    }
}

/// List entries from the central directory without touching payloads.
pub fn list_archive(buf: &[u8]) -> Result<Vec<EntryInfo>> {
    let eocd = find_eocd(buf)?;
    let entry_count = u16_at(buf, eocd + 10)? as usize;
    let mut pos = u32_at(buf, eocd + 16)? as usize;

    let mut entries = Vec::with_capacity(entry_count);
    for _ in 0..entry_count {
        if u32_at(buf, pos)? != CENTRAL_MAGIC {
            return Err(fmt_err("bad central directory record"));
        }
        let method = u16_at(buf, pos + 10)?;
        if method != METHOD_STORE {
            return Err(fmt_err("unsupported compression method"));
        }
        let crc = u32_at(buf, pos + 16)?;
        let size = u32_at(buf, pos + 24)? as u64;
        let name_len = u16_at(buf, pos + 28)? as usize;
        let extra_len = u16_at(buf, pos + 30)? as usize;
        let comment_len = u16_at(buf, pos + 32)? as usize;
        let local_offset = u32_at(buf, pos + 42)? as u64;

        let name_bytes = buf
            .get(pos + CENTRAL_LEN..pos + CENTRAL_LEN + name_len)
            .ok_or_else(|| fmt_err("truncated archive"))?;
        let name = String::from_utf8(name_bytes.to_vec())
            .map_err(|_| fmt_err("entry name is not valid UTF-8"))?;

        entries.push(EntryInfo {
            name,
            size,
            crc32: crc,
            local_offset,
        });
        pos += CENTRAL_LEN + name_len + extra_len + comment_len;
    }
    Ok(entries)
}

/// Read every entry's name and payload, verifying each stored payload
/// against its recorded CRC-32.
pub fn read_archive(buf: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let infos = list_archive(buf)?;
    let mut out = Vec::with_capacity(infos.len());

    for info in infos {
        let pos = info.local_offset as usize;
        if u32_at(buf, pos)? != LOCAL_MAGIC {
            return Err(fmt_err("bad local record"));
        }
        let name_len = u16_at(buf, pos + 26)? as usize;
        let extra_len = u16_at(buf, pos + 28)? as usize;
        let data_start = pos + LOCAL_LEN + name_len + extra_len;
        let data = buf
            .get(data_start..data_start + info.size as usize)
            .ok_or_else(|| fmt_err("truncated archive"))?;

        if crc32(data) != info.crc32 {
            return Err(SnipError::Format(format!(
                "CRC mismatch for {}: expected {:#010x}, got {:#010x}",
                info.name,
                info.crc32,
                crc32(data)
            )));
        }
        out.push((info.name, data.to_vec()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::writer::{ZipEntry, write_archive};

    fn entry(name: &str, data: &[u8]) -> ZipEntry {
        ZipEntry {
            name: name.to_string(),
            data: data.to_vec(),
            modified: None,
        }
    }

    #[test]
    fn round_trip_single_entry() {
        let buf = write_archive(&[entry("a.png", &[1, 2, 3])]).unwrap();
        let entries = read_archive(&buf).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "a.png");
        assert_eq!(entries[0].1, vec![1, 2, 3]);
    }

    #[test]
    fn round_trip_preserves_order() {
        let buf = write_archive(&[
            entry("first.png", b"aaaa"),
            entry("second.png", b"bb"),
            entry("third.png", b""),
        ])
        .unwrap();
        let names: Vec<_> = read_archive(&buf)
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["first.png", "second.png", "third.png"]);
    }

    #[test]
    fn list_reports_sizes_and_offsets() {
        let buf = write_archive(&[entry("x", &[9; 7]), entry("y", &[8; 2])]).unwrap();
        let infos = list_archive(&buf).unwrap();
        assert_eq!(infos[0].size, 7);
        assert_eq!(infos[0].local_offset, 0);
        assert_eq!(infos[1].local_offset, (30 + 1 + 7) as u64);
    }

    #[test]
    fn corrupted_payload_fails_crc() {
        let mut buf = write_archive(&[entry("a.png", &[1, 2, 3])]).unwrap();
        buf[36] ^= 0xff; // flip a payload byte inside the local record
        assert!(matches!(read_archive(&buf), Err(SnipError::Format(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            read_archive(&[0u8; 10]),
            Err(SnipError::Format(_))
        ));
        assert!(matches!(
            read_archive(&[0u8; 64]),
            Err(SnipError::Format(_))
        ));
    }
}
