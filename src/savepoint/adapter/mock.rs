//! Scriptable adapter for orchestrator tests, playing the role an
//! in-memory store plays for storage-layer tests: no servers, no child
//! processes, fully deterministic.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{sha256_file, DumpOutput, EngineAdapter, RestorePayload};
use crate::error::{Result, SavepointError};
use crate::model::EngineKind;
use crate::resolve::ResolvedConnection;

#[derive(Debug, Clone, Copy)]
pub enum MockFailure {
    Timeout,
    DumpError,
    ConnectionRefused,
}

#[derive(Default)]
pub struct MockAdapter {
    pub targets: Vec<String>,
    pub system_excludes: &'static [&'static str],
    pub failures: HashMap<String, MockFailure>,
    pub refuse_connection: bool,
    pub dumped: RefCell<Vec<String>>,
    pub restored: RefCell<Vec<(String, String)>>,
}

impl MockAdapter {
    pub fn with_targets(targets: &[&str]) -> Self {
        Self {
            targets: targets.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_system_excludes(mut self, excludes: &'static [&'static str]) -> Self {
        self.system_excludes = excludes;
        self
    }

    pub fn failing(mut self, target: &str, failure: MockFailure) -> Self {
        self.failures.insert(target.to_string(), failure);
        self
    }

    pub fn refusing_connections(mut self) -> Self {
        self.refuse_connection = true;
        self
    }
}

impl EngineAdapter for MockAdapter {
    fn engine(&self) -> EngineKind {
        EngineKind::Mysql
    }

    fn system_excludes(&self) -> &'static [&'static str] {
        self.system_excludes
    }

    fn test_connection(&self, _conn: &ResolvedConnection) -> Result<()> {
        if self.refuse_connection {
            return Err(SavepointError::Connection(
                "connection refused".to_string(),
            ));
        }
        Ok(())
    }

    fn list_targets(&self, _conn: &ResolvedConnection) -> Result<Vec<String>> {
        if self.refuse_connection {
            return Err(SavepointError::Connection(
                "connection refused".to_string(),
            ));
        }
        Ok(self.targets.clone())
    }

    fn dump_target(
        &self,
        _conn: &ResolvedConnection,
        target: &str,
        dest: &Path,
        timeout: Duration,
    ) -> Result<DumpOutput> {
        match self.failures.get(target) {
            Some(MockFailure::Timeout) => {
                return Err(SavepointError::Timeout(format!(
                    "mysqldump exceeded {}s and was killed",
                    timeout.as_secs()
                )))
            }
            Some(MockFailure::DumpError) => {
                return Err(SavepointError::Adapter(format!(
                    "mysqldump exited with status 2 while dumping '{}'",
                    target
                )))
            }
            Some(MockFailure::ConnectionRefused) => {
                return Err(SavepointError::Connection(
                    "connection refused".to_string(),
                ))
            }
            None => {}
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = format!("-- mock dump of {}\n", target);
        std::fs::write(dest, &body)?;
        self.dumped.borrow_mut().push(target.to_string());

        Ok(DumpOutput {
            size_bytes: body.len() as u64,
            raw_bytes: (body.len() * 3) as u64,
            checksum: sha256_file(dest)?,
            object_count: None,
        })
    }

    fn restore_target(
        &self,
        _conn: &ResolvedConnection,
        payload: RestorePayload<'_>,
        target: &str,
        _timeout: Duration,
    ) -> Result<()> {
        let summary = match payload {
            RestorePayload::Script(s) => s.lines().next().unwrap_or("").to_string(),
            RestorePayload::Archive(p) => PathBuf::from(p).display().to_string(),
        };
        self.restored.borrow_mut().push((target.to_string(), summary));
        Ok(())
    }
}
