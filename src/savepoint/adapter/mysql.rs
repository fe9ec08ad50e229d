//! MySQL adapter: `mysql` client for listing/replay, `mysqldump` for
//! dumps. The password travels via `MYSQL_PWD` so it never appears in
//! the process table.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use super::{
    dump_via_command, parse_name_lines, run_with_timeout, DumpOutput, EngineAdapter,
    RestorePayload,
};
use crate::error::{Result, SavepointError};
use crate::model::EngineKind;
use crate::resolve::ResolvedConnection;

const SYSTEM_SCHEMAS: &[&str] = &["information_schema", "mysql", "performance_schema", "sys"];

pub struct MysqlAdapter;

impl MysqlAdapter {
    fn client(&self, conn: &ResolvedConnection) -> Command {
        let mut cmd = Command::new("mysql");
        self.common_args(&mut cmd, conn);
        cmd
    }

    fn common_args(&self, cmd: &mut Command, conn: &ResolvedConnection) {
        cmd.arg("-h")
            .arg(&conn.host)
            .arg("-P")
            .arg(conn.port.to_string())
            .arg("-u")
            .arg(&conn.username)
            .env("MYSQL_PWD", &conn.password);
        if conn.ssl_enabled {
            cmd.arg("--ssl-mode=REQUIRED");
        }
    }
}

impl EngineAdapter for MysqlAdapter {
    fn engine(&self) -> EngineKind {
        EngineKind::Mysql
    }

    fn system_excludes(&self) -> &'static [&'static str] {
        SYSTEM_SCHEMAS
    }

    fn test_connection(&self, conn: &ResolvedConnection) -> Result<()> {
        let mut cmd = self.client(conn);
        cmd.args(["-N", "-e", "SELECT 1"]);
        run_with_timeout(&mut cmd, None, Duration::from_secs(15), "mysql")
            .map_err(connection_scope)?;
        Ok(())
    }

    fn list_targets(&self, conn: &ResolvedConnection) -> Result<Vec<String>> {
        let mut cmd = self.client(conn);
        cmd.args(["-N", "-e", "SHOW DATABASES"]);
        let out = run_with_timeout(&mut cmd, None, Duration::from_secs(30), "mysql")
            .map_err(connection_scope)?;
        Ok(parse_name_lines(&out.stdout))
    }

    fn dump_target(
        &self,
        conn: &ResolvedConnection,
        target: &str,
        dest: &Path,
        timeout: Duration,
    ) -> Result<DumpOutput> {
        let mut cmd = Command::new("mysqldump");
        self.common_args(&mut cmd, conn);
        cmd.args(["--single-transaction", "--routines", "--triggers", "--databases"])
            .arg(target);
        dump_via_command(cmd, dest, timeout, "mysqldump")
    }

    fn restore_target(
        &self,
        conn: &ResolvedConnection,
        payload: RestorePayload<'_>,
        _target: &str,
        timeout: Duration,
    ) -> Result<()> {
        let script = match payload {
            RestorePayload::Script(s) => s,
            RestorePayload::Archive(_) => {
                return Err(SavepointError::Adapter(
                    "mysql restore expects a SQL script, not an archive".to_string(),
                ))
            }
        };
        let mut cmd = self.client(conn);
        run_with_timeout(&mut cmd, Some(script.as_bytes().to_vec()), timeout, "mysql")?;
        Ok(())
    }
}

/// Listing and connectivity failures are connection errors for exit-code
/// purposes; only in-dump failures stay adapter errors.
fn connection_scope(e: SavepointError) -> SavepointError {
    match e {
        SavepointError::Adapter(msg) => SavepointError::Connection(msg),
        other => other,
    }
}
