//! Export orchestration: drive the per-tile loop for one run, classify
//! failures, and either deliver one combined archive or persist tiles
//! individually.
//!
//! Tiles are processed strictly sequentially; one tile's read/persist
//! pipeline finishes before the next begins, so archive entry order and
//! the failure index list always match input order.

use crate::error::{Result, SnipError};
use crate::export::collab::{FileDelivery, GuidancePrompt, ItemSink, PermissionGateway, TileStore};
use crate::export::summary::ExportSummary;
use crate::zip::writer::{ZipEntry, write_archive};
use serde::Serialize;
use tracing::{debug, warn};

/// How the run hands results to the user. Supplied by the caller; the core
/// never inspects its environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportMode {
    /// Collect every tile into one stored zip and deliver it as a single
    /// download (browser hosts).
    Archive,
    /// Persist each tile to the photo album, gated on a persistence
    /// permission (mini-program / native hosts).
    Album,
}

#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub mode: ExportMode,
    /// File name stem; trimmed, defaults to `slice` when blank.
    pub base_name: Option<String>,
}

/// One rendered tile: grid coordinates plus the path the renderer wrote
/// its encoded image to. Produced and consumed within a single run.
#[derive(Clone, Debug, Serialize)]
pub struct TileSlice {
    pub index: usize,
    pub row: u32,
    pub col: u32,
    pub width: u32,
    pub height: u32,
    pub path: String,
}

/// Injected collaborators for one export run (see [`crate::export::collab`]).
pub struct ExportEnv<'a> {
    pub store: &'a mut dyn TileStore,
    pub sink: &'a mut dyn ItemSink,
    pub permissions: &'a mut dyn PermissionGateway,
    pub delivery: &'a mut dyn FileDelivery,
    pub prompt: &'a mut dyn GuidancePrompt,
}

/// Substrings that identify an authorization refusal in collaborator error
/// text, lowercase, covering the hosts' English and Chinese phrasings.
/// Free-text matching is kept for host compatibility; a structured signal
/// would be preferable.
const PERMISSION_MARKERS: &[&str] = &[
    "auth deny",
    "auth denied",
    "authorize:fail",
    "permission denied",
    "not authorized",
    "拒绝",
    "未授权",
    "权限",
];

fn is_permission_denial(message: &str) -> bool {
    let lower = message.to_lowercase();
    PERMISSION_MARKERS.iter().any(|m| lower.contains(m))
}

fn sanitize_base_name(name: Option<&str>) -> String {
    let value = name.unwrap_or("slice").trim();
    if value.is_empty() {
        "slice".to_string()
    } else {
        value.to_string()
    }
}

fn tile_file_name(base: &str, tile: &TileSlice) -> String {
    format!(
        "{base}-r{}-c{}-{}.png",
        tile.row + 1,
        tile.col + 1,
        tile.index + 1
    )
}

/// Run one export over `tiles`, already rendered in partition order.
///
/// Fails up front on an empty tile set; in archive mode, also fails when
/// not a single tile could be read. Every other failure is absorbed into
/// the returned [`ExportSummary`].
pub fn export(
    tiles: &[TileSlice],
    opts: &ExportOptions,
    env: &mut ExportEnv<'_>,
) -> Result<ExportSummary> {
    if tiles.is_empty() {
        return Err(SnipError::NoTiles);
    }
    let base = sanitize_base_name(opts.base_name.as_deref());
    let mut summary = ExportSummary::new(tiles.len());

    match opts.mode {
        ExportMode::Archive => export_archive(tiles, &base, env, &mut summary)?,
        ExportMode::Album => export_album(tiles, &base, env, &mut summary)?,
    }
    Ok(summary)
}

fn export_archive(
    tiles: &[TileSlice],
    base: &str,
    env: &mut ExportEnv<'_>,
    summary: &mut ExportSummary,
) -> Result<()> {
    let mut entries = Vec::with_capacity(tiles.len());

    for tile in tiles {
        match env.store.read_bytes(&tile.path) {
            Ok(data) => {
                debug!(index = tile.index, bytes = data.len(), "tile collected");
                entries.push(ZipEntry {
                    name: tile_file_name(base, tile),
                    data,
                    modified: None,
                });
                summary.record_success();
            }
            Err(e) => {
                warn!(index = tile.index, error = %e, "tile read failed, skipping");
                summary.record_save_failure(tile.index, &e.to_string());
            }
        }
    }

    if entries.is_empty() {
        let first = summary
            .first_error_message
            .clone()
            .unwrap_or_else(|| "no tile could be read".to_string());
        return Err(SnipError::NothingArchived(first));
    }

    let archive = write_archive(&entries)?;
    // Fire and forget: the summary is returned regardless of delivery.
    env.delivery.deliver(&archive, &format!("{base}-all.zip"));
    Ok(())
}

/// Check the album capability, requesting it once and falling back to the
/// settings page before giving up.
fn ensure_album_permission(gateway: &mut dyn PermissionGateway) -> Result<()> {
    if gateway.check_granted()? {
        return Ok(());
    }
    match gateway.request() {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(error = %e, "permission request refused, reopening settings");
            if gateway.open_settings_and_recheck()? {
                Ok(())
            } else {
                Err(SnipError::PermissionDenied)
            }
        }
    }
}

fn export_album(
    tiles: &[TileSlice],
    base: &str,
    env: &mut ExportEnv<'_>,
    summary: &mut ExportSummary,
) -> Result<()> {
    ensure_album_permission(env.permissions)?;

    for (pos, tile) in tiles.iter().enumerate() {
        let file_name = tile_file_name(base, tile);
        let outcome = env
            .store
            .read_bytes(&tile.path)
            .and_then(|bytes| env.sink.persist(&bytes, &file_name));

        match outcome {
            Ok(()) => summary.record_success(),
            Err(e) => {
                let message = e.to_string();
                if is_permission_denial(&message) {
                    warn!(index = tile.index, error = %message, "permission revoked, aborting run");
                    summary
                        .record_permission_failure(tiles[pos..].iter().map(|t| t.index), &message);
                    env.prompt.show_guidance(
                        "Album permission required",
                        "Allow photo album access in settings, then export again.",
                    );
                    break;
                }
                warn!(index = tile.index, error = %message, "tile save failed, continuing");
                summary.record_save_failure(tile.index, &message);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::reader::read_archive;
    use std::collections::HashMap;

    struct MapStore {
        files: HashMap<String, Vec<u8>>,
    }

    impl MapStore {
        fn with(paths: &[(&str, &[u8])]) -> Self {
            Self {
                files: paths
                    .iter()
                    .map(|(p, d)| (p.to_string(), d.to_vec()))
                    .collect(),
            }
        }
    }

    impl TileStore for MapStore {
        fn read_bytes(&mut self, path: &str) -> Result<Vec<u8>> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| SnipError::Persistence(format!("read failed: {path}")))
        }
    }

    #[derive(Default)]
    struct FakeSink {
        calls: usize,
        saved: Vec<String>,
        fail_on_call: HashMap<usize, String>,
    }

    impl ItemSink for FakeSink {
        fn persist(&mut self, _bytes: &[u8], file_name: &str) -> Result<()> {
            let call = self.calls;
            self.calls += 1;
            if let Some(msg) = self.fail_on_call.get(&call) {
                return Err(SnipError::Persistence(msg.clone()));
            }
            self.saved.push(file_name.to_string());
            Ok(())
        }
    }

    struct FakeGateway {
        granted: bool,
        request_ok: bool,
        settings_grant: bool,
        requests: usize,
        reopened: usize,
    }

    impl FakeGateway {
        fn granted() -> Self {
            Self {
                granted: true,
                request_ok: false,
                settings_grant: false,
                requests: 0,
                reopened: 0,
            }
        }

        fn denied(request_ok: bool, settings_grant: bool) -> Self {
            Self {
                granted: false,
                request_ok,
                settings_grant,
                requests: 0,
                reopened: 0,
            }
        }
    }

    impl PermissionGateway for FakeGateway {
        fn check_granted(&mut self) -> Result<bool> {
            Ok(self.granted)
        }

        fn request(&mut self) -> Result<()> {
            self.requests += 1;
            if self.request_ok {
                Ok(())
            } else {
                Err(SnipError::Persistence("authorize:fail auth deny".into()))
            }
        }

        fn open_settings_and_recheck(&mut self) -> Result<bool> {
            self.reopened += 1;
            Ok(self.settings_grant)
        }
    }

    #[derive(Default)]
    struct CapturedDelivery {
        files: Vec<(String, Vec<u8>)>,
    }

    impl FileDelivery for CapturedDelivery {
        fn deliver(&mut self, bytes: &[u8], file_name: &str) {
            self.files.push((file_name.to_string(), bytes.to_vec()));
        }
    }

    #[derive(Default)]
    struct CapturedPrompt {
        shown: Vec<(String, String)>,
    }

    impl GuidancePrompt for CapturedPrompt {
        fn show_guidance(&mut self, title: &str, body: &str) {
            self.shown.push((title.to_string(), body.to_string()));
        }
    }

    struct Fixture {
        store: MapStore,
        sink: FakeSink,
        gateway: FakeGateway,
        delivery: CapturedDelivery,
        prompt: CapturedPrompt,
    }

    impl Fixture {
        fn new(store: MapStore) -> Self {
            Self {
                store,
                sink: FakeSink::default(),
                gateway: FakeGateway::granted(),
                delivery: CapturedDelivery::default(),
                prompt: CapturedPrompt::default(),
            }
        }

        fn run(&mut self, tiles: &[TileSlice], mode: ExportMode) -> Result<ExportSummary> {
            let opts = ExportOptions {
                mode,
                base_name: Some("slice".into()),
            };
            export(
                tiles,
                &opts,
                &mut ExportEnv {
                    store: &mut self.store,
                    sink: &mut self.sink,
                    permissions: &mut self.gateway,
                    delivery: &mut self.delivery,
                    prompt: &mut self.prompt,
                },
            )
        }
    }

    fn row_of_tiles(n: usize) -> Vec<TileSlice> {
        (0..n)
            .map(|i| TileSlice {
                index: i,
                row: 0,
                col: i as u32,
                width: 10,
                height: 10,
                path: format!("t{i}"),
            })
            .collect()
    }

    #[test]
    fn zero_tiles_fails_up_front() {
        let mut fx = Fixture::new(MapStore::with(&[]));
        assert!(matches!(
            fx.run(&[], ExportMode::Archive),
            Err(SnipError::NoTiles)
        ));
        assert!(matches!(
            fx.run(&[], ExportMode::Album),
            Err(SnipError::NoTiles)
        ));
    }

    #[test]
    fn archive_mode_skips_failed_tile_and_zips_the_rest() {
        let tiles = row_of_tiles(3);
        let mut fx = Fixture::new(MapStore::with(&[("t0", b"aaa"), ("t2", b"ccc")]));
        let summary = fx.run(&tiles, ExportMode::Archive).unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.save_failed_count, 1);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.failed_indexes, vec![1]);
        assert!(!summary.permission_denied);

        assert_eq!(fx.delivery.files.len(), 1);
        let (name, bytes) = &fx.delivery.files[0];
        assert_eq!(name, "slice-all.zip");
        let entries = read_archive(bytes).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "slice-r1-c1-1.png");
        assert_eq!(entries[0].1, b"aaa");
        assert_eq!(entries[1].0, "slice-r1-c3-3.png");
    }

    #[test]
    fn archive_mode_with_no_readable_tiles_throws_first_error() {
        let tiles = row_of_tiles(2);
        let mut fx = Fixture::new(MapStore::with(&[]));
        match fx.run(&tiles, ExportMode::Archive) {
            Err(SnipError::NothingArchived(msg)) => assert!(msg.contains("t0")),
            other => panic!("expected NothingArchived, got {other:?}"),
        }
        assert!(fx.delivery.files.is_empty());
    }

    #[test]
    fn archive_base_name_is_sanitized() {
        let tiles = row_of_tiles(1);
        let mut fx = Fixture::new(MapStore::with(&[("t0", b"x")]));
        let opts = ExportOptions {
            mode: ExportMode::Archive,
            base_name: Some("  photo  ".into()),
        };
        export(
            &tiles,
            &opts,
            &mut ExportEnv {
                store: &mut fx.store,
                sink: &mut fx.sink,
                permissions: &mut fx.gateway,
                delivery: &mut fx.delivery,
                prompt: &mut fx.prompt,
            },
        )
        .unwrap();
        assert_eq!(fx.delivery.files[0].0, "photo-all.zip");

        let entries = read_archive(&fx.delivery.files[0].1).unwrap();
        assert_eq!(entries[0].0, "photo-r1-c1-1.png");
    }

    #[test]
    fn album_mode_persists_in_order() {
        let tiles = row_of_tiles(3);
        let mut fx = Fixture::new(MapStore::with(&[("t0", b"a"), ("t1", b"b"), ("t2", b"c")]));
        let summary = fx.run(&tiles, ExportMode::Album).unwrap();

        assert_eq!(summary.success_count, 3);
        assert_eq!(summary.failed_count, 0);
        assert_eq!(
            fx.sink.saved,
            vec!["slice-r1-c1-1.png", "slice-r1-c2-2.png", "slice-r1-c3-3.png"]
        );
    }

    #[test]
    fn album_permission_denial_short_circuits() {
        let tiles = row_of_tiles(4);
        let mut fx = Fixture::new(MapStore::with(&[
            ("t0", b"a"),
            ("t1", b"b"),
            ("t2", b"c"),
            ("t3", b"d"),
        ]));
        fx.sink
            .fail_on_call
            .insert(0, "saveImageToPhotosAlbum:fail auth deny".into());

        let summary = fx.run(&tiles, ExportMode::Album).unwrap();

        assert!(summary.permission_denied);
        assert_eq!(summary.permission_denied_count, 1);
        assert_eq!(summary.success_count, 0);
        assert_eq!(summary.failed_indexes, vec![0, 1, 2, 3]);
        assert_eq!(summary.failed_count, 4);
        // no persist call after the denied tile
        assert_eq!(fx.sink.calls, 1);
        assert_eq!(fx.prompt.shown.len(), 1);
    }

    #[test]
    fn album_localized_denial_is_classified() {
        let tiles = row_of_tiles(2);
        let mut fx = Fixture::new(MapStore::with(&[("t0", b"a"), ("t1", b"b")]));
        fx.sink.fail_on_call.insert(1, "用户拒绝授权".into());

        let summary = fx.run(&tiles, ExportMode::Album).unwrap();
        assert!(summary.permission_denied);
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.failed_indexes, vec![1]);
    }

    #[test]
    fn album_plain_save_failure_continues() {
        let tiles = row_of_tiles(3);
        let mut fx = Fixture::new(MapStore::with(&[("t0", b"a"), ("t1", b"b"), ("t2", b"c")]));
        fx.sink.fail_on_call.insert(1, "disk full".into());

        let summary = fx.run(&tiles, ExportMode::Album).unwrap();

        assert!(!summary.permission_denied);
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.save_failed_count, 1);
        assert_eq!(summary.failed_indexes, vec![1]);
        assert_eq!(summary.first_error_message.as_deref(), Some("disk full"));
        assert_eq!(fx.sink.calls, 3);
        assert!(fx.prompt.shown.is_empty());
    }

    #[test]
    fn album_permission_gate_blocks_before_any_tile() {
        let tiles = row_of_tiles(2);
        let mut fx = Fixture::new(MapStore::with(&[("t0", b"a"), ("t1", b"b")]));
        fx.gateway = FakeGateway::denied(false, false);

        assert!(matches!(
            fx.run(&tiles, ExportMode::Album),
            Err(SnipError::PermissionDenied)
        ));
        assert_eq!(fx.sink.calls, 0);
        assert_eq!(fx.gateway.requests, 1);
        assert_eq!(fx.gateway.reopened, 1);
    }

    #[test]
    fn album_permission_recovered_from_settings() {
        let tiles = row_of_tiles(1);
        let mut fx = Fixture::new(MapStore::with(&[("t0", b"a")]));
        fx.gateway = FakeGateway::denied(false, true);

        let summary = fx.run(&tiles, ExportMode::Album).unwrap();
        assert_eq!(summary.success_count, 1);
        assert_eq!(fx.gateway.reopened, 1);
    }

    #[test]
    fn album_permission_granted_on_request() {
        let tiles = row_of_tiles(1);
        let mut fx = Fixture::new(MapStore::with(&[("t0", b"a")]));
        fx.gateway = FakeGateway::denied(true, false);

        let summary = fx.run(&tiles, ExportMode::Album).unwrap();
        assert_eq!(summary.success_count, 1);
        assert_eq!(fx.gateway.requests, 1);
        assert_eq!(fx.gateway.reopened, 0);
    }

    #[test]
    fn marker_match_is_case_insensitive() {
        assert!(is_permission_denial("Auth Deny by user"));
        assert!(is_permission_denial("PERMISSION DENIED"));
        assert!(is_permission_denial("请先授予相册权限后再导出"));
        assert!(!is_permission_denial("disk full"));
        assert!(!is_permission_denial("network timeout"));
    }
}
