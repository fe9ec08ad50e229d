//! # Engine Adapters
//!
//! One capability-set implementation per engine. The orchestrators only
//! ever talk to the [`EngineAdapter`] trait; dispatch is by the closed
//! [`EngineKind`] variant via [`adapter_for`], never by runtime probing.
//!
//! Adapters that shell out to native tooling (`mysqldump`, `pg_dump`,
//! `mysql`, `psql`) share the child-process plumbing here: piped stdio,
//! a polling deadline that kills the child on timeout, and gzip
//! streaming of dump output straight to disk with a SHA-256 checksum
//! computed over the final compressed bytes.

use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Result, SavepointError};
use crate::model::EngineKind;
use crate::resolve::ResolvedConnection;

pub mod files;
pub mod mysql;
pub mod postgres;

#[cfg(test)]
pub(crate) mod mock;

/// What a finished dump looks like to the orchestrator.
#[derive(Debug, Clone)]
pub struct DumpOutput {
    /// Final compressed size on disk.
    pub size_bytes: u64,
    /// Uncompressed bytes that went into the encoder.
    pub raw_bytes: u64,
    /// SHA-256 (hex) over the final compressed artifact.
    pub checksum: String,
    /// Entry count for archive dumps, if the engine tracks one.
    pub object_count: Option<u64>,
}

impl DumpOutput {
    pub fn compression_ratio(&self) -> f64 {
        if self.size_bytes == 0 {
            0.0
        } else {
            self.raw_bytes as f64 / self.size_bytes as f64
        }
    }
}

/// What a restore consumes: a rewritten SQL script for the database
/// engines, or the artifact archive itself for the files engine.
pub enum RestorePayload<'a> {
    Script(&'a str),
    Archive(&'a Path),
}

pub trait EngineAdapter {
    fn engine(&self) -> EngineKind;

    /// Schemas this engine never backs up unless explicitly whitelisted.
    fn system_excludes(&self) -> &'static [&'static str];

    fn test_connection(&self, conn: &ResolvedConnection) -> Result<()>;

    /// Schemas for SQL engines; top-level entries for the files engine.
    fn list_targets(&self, conn: &ResolvedConnection) -> Result<Vec<String>>;

    /// Dump one target to `dest`, compressed, within `timeout`.
    fn dump_target(
        &self,
        conn: &ResolvedConnection,
        target: &str,
        dest: &Path,
        timeout: Duration,
    ) -> Result<DumpOutput>;

    fn restore_target(
        &self,
        conn: &ResolvedConnection,
        payload: RestorePayload<'_>,
        target: &str,
        timeout: Duration,
    ) -> Result<()>;
}

pub fn adapter_for(kind: EngineKind) -> Box<dyn EngineAdapter> {
    match kind {
        EngineKind::Mysql => Box::new(mysql::MysqlAdapter),
        EngineKind::Postgresql => Box::new(postgres::PostgresAdapter),
        EngineKind::Files => Box::new(files::FilesAdapter),
    }
}

// ---------------------------------------------------------------------------
// Shared child-process plumbing
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) struct CommandOutput {
    pub stdout: Vec<u8>,
    #[allow(dead_code)]
    pub stderr: String,
}

/// Run a client command to completion, feeding it `stdin_data` if given,
/// subject to `timeout`. A timeout kills the child and fails only this
/// operation.
pub(crate) fn run_with_timeout(
    cmd: &mut Command,
    stdin_data: Option<Vec<u8>>,
    timeout: Duration,
    label: &str,
) -> Result<CommandOutput> {
    cmd.stdin(if stdin_data.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

    let mut child = spawn(cmd, label)?;

    let stdin_handle = stdin_data.map(|data| {
        let mut stdin = child.stdin.take().expect("stdin was piped");
        std::thread::spawn(move || {
            let _ = stdin.write_all(&data);
        })
    });

    let stdout_handle = {
        let mut stdout = child.stdout.take().expect("stdout was piped");
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf);
            buf
        })
    };
    let stderr_handle = {
        let mut stderr = child.stderr.take().expect("stderr was piped");
        std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        })
    };

    let status = wait_with_deadline(&mut child, timeout, label)?;

    if let Some(handle) = stdin_handle {
        let _ = handle.join();
    }
    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();

    if !status.success() {
        return Err(SavepointError::Adapter(format!(
            "{} exited with {}: {}",
            label,
            status,
            stderr.trim()
        )));
    }

    Ok(CommandOutput { stdout, stderr })
}

/// Run a dump command, streaming its stdout through gzip into `dest`.
/// The artifact only appears at `dest` (via rename) once the dump
/// completed and was checksummed; a timeout or failure leaves nothing
/// partially written behind.
pub(crate) fn dump_via_command(
    mut cmd: Command,
    dest: &Path,
    timeout: Duration,
    label: &str,
) -> Result<DumpOutput> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(SavepointError::Io)?;
    }
    let part = dest.with_extension("part");
    let part_file = create_part_file(&part)?;

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = match spawn(&mut cmd, label) {
        Ok(child) => child,
        Err(e) => {
            drop(part_file);
            let _ = fs::remove_file(&part);
            return Err(e);
        }
    };

    let stdout_handle = {
        let mut stdout = child.stdout.take().expect("stdout was piped");
        std::thread::spawn(move || -> std::io::Result<u64> {
            let mut encoder =
                GzEncoder::new(BufWriter::new(part_file), Compression::default());
            let raw = std::io::copy(&mut stdout, &mut encoder)?;
            encoder.finish()?.flush()?;
            Ok(raw)
        })
    };
    let stderr_handle = {
        let mut stderr = child.stderr.take().expect("stderr was piped");
        std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        })
    };

    let status = match wait_with_deadline(&mut child, timeout, label) {
        Ok(status) => status,
        Err(e) => {
            let _ = stdout_handle.join();
            let _ = fs::remove_file(&part);
            return Err(e);
        }
    };

    let raw_bytes = stdout_handle
        .join()
        .map_err(|_| SavepointError::Adapter(format!("{}: writer thread panicked", label)))?
        .map_err(SavepointError::Io)?;
    let stderr = stderr_handle.join().unwrap_or_default();

    if !status.success() {
        let _ = fs::remove_file(&part);
        return Err(SavepointError::Adapter(format!(
            "{} exited with {}: {}",
            label,
            status,
            stderr.trim()
        )));
    }

    finalize_artifact(&part, dest, raw_bytes, None)
}

/// Checksum, restrict, and atomically move a finished `.part` file into
/// place as the final artifact.
pub(crate) fn finalize_artifact(
    part: &Path,
    dest: &Path,
    raw_bytes: u64,
    object_count: Option<u64>,
) -> Result<DumpOutput> {
    let checksum = sha256_file(part)?;
    let size_bytes = fs::metadata(part).map_err(SavepointError::Io)?.len();
    restrict_artifact_permissions(part)?;
    fs::rename(part, dest).map_err(SavepointError::Io)?;

    Ok(DumpOutput {
        size_bytes,
        raw_bytes,
        checksum,
        object_count,
    })
}

/// Create a dump `.part` file with the artifact's final permissions
/// already applied, so the content is never world-readable while the
/// dump is still in flight.
#[cfg(unix)]
pub(crate) fn create_part_file(path: &Path) -> Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o640)
        .open(path)
        .map_err(SavepointError::Io)
}

#[cfg(not(unix))]
pub(crate) fn create_part_file(path: &Path) -> Result<File> {
    File::create(path).map_err(SavepointError::Io)
}

pub(crate) fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(SavepointError::Io)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(SavepointError::Io)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn spawn(cmd: &mut Command, label: &str) -> Result<Child> {
    cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SavepointError::Connection(format!("{}: client binary not found on PATH", label))
        } else {
            SavepointError::Connection(format!("failed to launch {}: {}", label, e))
        }
    })
}

fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
    label: &str,
) -> Result<std::process::ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait().map_err(SavepointError::Io)? {
            Some(status) => return Ok(status),
            None => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SavepointError::Timeout(format!(
                        "{} exceeded {}s and was killed",
                        label,
                        timeout.as_secs()
                    )));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
        }
    }
}

#[cfg(unix)]
pub(crate) fn restrict_artifact_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o640)).map_err(SavepointError::Io)
}

#[cfg(not(unix))]
pub(crate) fn restrict_artifact_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Split client output into non-empty trimmed lines.
pub(crate) fn parse_name_lines(raw: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(raw)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_name_lines_trims_and_drops_blanks() {
        let raw = b"app_prod\n  app_test \n\nmysql\n";
        assert_eq!(
            parse_name_lines(raw),
            vec!["app_prod", "app_test", "mysql"]
        );
    }

    #[test]
    fn sha256_file_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[cfg(unix)]
    #[test]
    fn run_with_timeout_captures_output() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo hello"]);
        let out = run_with_timeout(&mut cmd, None, Duration::from_secs(5), "sh").unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn run_with_timeout_feeds_stdin() {
        let mut cmd = Command::new("cat");
        let out = run_with_timeout(
            &mut cmd,
            Some(b"piped".to_vec()),
            Duration::from_secs(5),
            "cat",
        )
        .unwrap();
        assert_eq!(out.stdout, b"piped");
    }

    #[cfg(unix)]
    #[test]
    fn timed_out_child_is_killed() {
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        let err =
            run_with_timeout(&mut cmd, None, Duration::from_millis(200), "sleep").unwrap_err();
        assert!(matches!(err, SavepointError::Timeout(_)));
    }

    #[cfg(unix)]
    #[test]
    fn failing_child_surfaces_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo broken >&2; exit 3"]);
        let err = run_with_timeout(&mut cmd, None, Duration::from_secs(5), "sh").unwrap_err();
        match err {
            SavepointError::Adapter(msg) => assert!(msg.contains("broken")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn missing_binary_is_a_connection_error() {
        let mut cmd = Command::new("savepoint-no-such-binary");
        let err = run_with_timeout(&mut cmd, None, Duration::from_secs(1), "nope").unwrap_err();
        assert!(matches!(err, SavepointError::Connection(_)));
    }

    #[cfg(unix)]
    #[test]
    fn part_file_is_never_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let part = dir.path().join("out.sql.part");
        let _file = create_part_file(&part).unwrap();

        let mode = fs::metadata(&part).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode & 0o004, 0, "group/other read leaked: {:o}", mode);
        assert!(mode <= 0o640);
    }

    #[cfg(unix)]
    #[test]
    fn dump_via_command_produces_checksummed_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.sql.gz");

        let mut cmd = Command::new("sh");
        cmd.args(["-c", "printf 'CREATE TABLE t (id INT);\\n'"]);
        let out = dump_via_command(cmd, &dest, Duration::from_secs(5), "sh").unwrap();

        assert!(dest.exists());
        assert!(!dest.with_extension("part").exists());
        assert_eq!(out.raw_bytes, 25);
        assert_eq!(out.checksum, sha256_file(&dest).unwrap());

        let blob = fs::read(&dest).unwrap();
        assert_eq!(&blob[..2], &[0x1f, 0x8b]);
    }

    #[cfg(unix)]
    #[test]
    fn dump_timeout_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.sql.gz");

        let mut cmd = Command::new("sh");
        cmd.args(["-c", "sleep 30"]);
        let err = dump_via_command(cmd, &dest, Duration::from_millis(200), "sh").unwrap_err();

        assert!(matches!(err, SavepointError::Timeout(_)));
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
