//! Files adapter: each top-level entry under the instance root is one
//! target. Dumps are gzip-compressed tar archives built with `walkdir`;
//! restores unpack into the root. There are no system exclusions and no
//! child processes, so the per-operation timeout does not apply here.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use walkdir::WalkDir;

use super::{create_part_file, finalize_artifact, DumpOutput, EngineAdapter, RestorePayload};
use crate::error::{Result, SavepointError};
use crate::model::EngineKind;
use crate::resolve::ResolvedConnection;

pub struct FilesAdapter;

impl FilesAdapter {
    fn root(&self, conn: &ResolvedConnection) -> Result<PathBuf> {
        conn.root_path.clone().ok_or_else(|| {
            SavepointError::Config("files instance has no root_path configured".to_string())
        })
    }
}

impl EngineAdapter for FilesAdapter {
    fn engine(&self) -> EngineKind {
        EngineKind::Files
    }

    fn system_excludes(&self) -> &'static [&'static str] {
        &[]
    }

    fn test_connection(&self, conn: &ResolvedConnection) -> Result<()> {
        let root = self.root(conn)?;
        if !root.is_dir() {
            return Err(SavepointError::Connection(format!(
                "root path {} is not a readable directory",
                root.display()
            )));
        }
        fs::read_dir(&root)
            .map_err(|e| SavepointError::Connection(format!("{}: {}", root.display(), e)))?;
        Ok(())
    }

    fn list_targets(&self, conn: &ResolvedConnection) -> Result<Vec<String>> {
        let root = self.root(conn)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(&root)
            .map_err(|e| SavepointError::Connection(format!("{}: {}", root.display(), e)))?
        {
            let entry = entry.map_err(SavepointError::Io)?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn dump_target(
        &self,
        conn: &ResolvedConnection,
        target: &str,
        dest: &Path,
        _timeout: Duration,
    ) -> Result<DumpOutput> {
        let root = self.root(conn)?;
        let source = root.join(target);
        if !source.exists() {
            return Err(SavepointError::Adapter(format!(
                "target '{}' does not exist under {}",
                target,
                root.display()
            )));
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(SavepointError::Io)?;
        }
        let part = dest.with_extension("part");

        let file = create_part_file(&part)?;
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let mut raw_bytes: u64 = 0;
        let mut object_count: u64 = 0;

        for entry in WalkDir::new(&source) {
            let entry = entry.map_err(|e| SavepointError::Adapter(format!("walk failed: {}", e)))?;
            let rel = entry
                .path()
                .strip_prefix(&root)
                .expect("walked entries live under the root");
            if rel.as_os_str().is_empty() {
                continue;
            }
            if entry.file_type().is_dir() {
                builder
                    .append_dir(rel, entry.path())
                    .map_err(SavepointError::Io)?;
            } else if entry.file_type().is_file() {
                raw_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
                object_count += 1;
                builder
                    .append_path_with_name(entry.path(), rel)
                    .map_err(SavepointError::Io)?;
            }
            // Symlinks and specials are skipped; a files backup is a
            // content snapshot, not a filesystem image.
        }

        let encoder = builder.into_inner().map_err(SavepointError::Io)?;
        let mut writer = encoder.finish().map_err(SavepointError::Io)?;
        use std::io::Write;
        writer.flush().map_err(SavepointError::Io)?;

        finalize_artifact(&part, dest, raw_bytes, Some(object_count))
    }

    fn restore_target(
        &self,
        conn: &ResolvedConnection,
        payload: RestorePayload<'_>,
        _target: &str,
        _timeout: Duration,
    ) -> Result<()> {
        let archive_path = match payload {
            RestorePayload::Archive(p) => p,
            RestorePayload::Script(_) => {
                return Err(SavepointError::Adapter(
                    "files restore expects an archive, not a SQL script".to_string(),
                ))
            }
        };
        let root = self.root(conn)?;
        fs::create_dir_all(&root).map_err(SavepointError::Io)?;

        let file = File::open(archive_path).map_err(SavepointError::Io)?;
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        archive.unpack(&root).map_err(SavepointError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(root: &Path) -> ResolvedConnection {
        ResolvedConnection {
            host: String::new(),
            port: 0,
            username: String::new(),
            password: String::new(),
            ssl_enabled: false,
            root_path: Some(root.to_path_buf()),
        }
    }

    fn seed_tree(root: &Path) {
        fs::create_dir_all(root.join("photos/2026")).unwrap();
        fs::write(root.join("photos/2026/a.jpg"), b"jpeg-bytes").unwrap();
        fs::write(root.join("photos/index.txt"), b"two photos").unwrap();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("docs/readme.md"), b"# docs").unwrap();
    }

    #[test]
    fn lists_top_level_entries_as_targets() {
        let dir = tempfile::tempdir().unwrap();
        seed_tree(dir.path());

        let adapter = FilesAdapter;
        let targets = adapter.list_targets(&conn(dir.path())).unwrap();
        assert_eq!(targets, vec!["docs", "photos"]);
    }

    #[test]
    fn missing_root_is_a_connection_error() {
        let adapter = FilesAdapter;
        let c = conn(Path::new("/no/such/dir"));
        assert!(matches!(
            adapter.test_connection(&c),
            Err(SavepointError::Connection(_))
        ));
    }

    #[test]
    fn missing_root_path_is_a_config_error() {
        let adapter = FilesAdapter;
        let mut c = conn(Path::new("/tmp"));
        c.root_path = None;
        assert!(matches!(
            adapter.list_targets(&c),
            Err(SavepointError::Config(_))
        ));
    }

    #[test]
    fn dump_and_restore_roundtrip() {
        let src_dir = tempfile::tempdir().unwrap();
        seed_tree(src_dir.path());
        let adapter = FilesAdapter;

        let artifact_dir = tempfile::tempdir().unwrap();
        let dest = artifact_dir.path().join("photos.tar.gz");
        let out = adapter
            .dump_target(
                &conn(src_dir.path()),
                "photos",
                &dest,
                Duration::from_secs(5),
            )
            .unwrap();

        assert!(dest.exists());
        assert_eq!(out.object_count, Some(2));
        assert_eq!(out.raw_bytes, 20);
        assert!(out.size_bytes > 0);
        assert_eq!(out.checksum.len(), 64);

        let restore_dir = tempfile::tempdir().unwrap();
        adapter
            .restore_target(
                &conn(restore_dir.path()),
                RestorePayload::Archive(&dest),
                "photos",
                Duration::from_secs(5),
            )
            .unwrap();

        assert_eq!(
            fs::read(restore_dir.path().join("photos/2026/a.jpg")).unwrap(),
            b"jpeg-bytes"
        );
        assert_eq!(
            fs::read(restore_dir.path().join("photos/index.txt")).unwrap(),
            b"two photos"
        );
    }

    #[test]
    fn dumping_missing_target_fails() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FilesAdapter;
        let dest = dir.path().join("ghost.tar.gz");
        assert!(matches!(
            adapter.dump_target(&conn(dir.path()), "ghost", &dest, Duration::from_secs(5)),
            Err(SavepointError::Adapter(_))
        ));
    }
}
