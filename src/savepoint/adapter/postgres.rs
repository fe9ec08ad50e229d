//! PostgreSQL adapter: `psql` for catalog listing and script replay,
//! `pg_dump --create` for dumps (the rewrite pass depends on the
//! CREATE DATABASE / `\connect` preamble being present). The password
//! travels via `PGPASSWORD`.

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

const SYSTEM_DATABASES: &[&str] = &["postgres", "template0", "template1"];

/// Maintenance database used for listing and for replaying scripts that
/// create their own target.
const ADMIN_DB: &str = "postgres";

pub struct PostgresAdapter;

impl PostgresAdapter {
    fn psql(&self, conn: &ResolvedConnection, database: &str) -> Command {
        let mut cmd = Command::new("psql");
        self.common_args(&mut cmd, conn);
        cmd.arg("-d").arg(database);
        cmd
    }

    fn common_args(&self, cmd: &mut Command, conn: &ResolvedConnection) {
        cmd.arg("-h")
            .arg(&conn.host)
            .arg("-p")
            .arg(conn.port.to_string())
            .arg("-U")
            .arg(&conn.username)
            .env("PGPASSWORD", &conn.password);
        if conn.ssl_enabled {
            cmd.env("PGSSLMODE", "require");
        }
    }
}

impl EngineAdapter for PostgresAdapter {
    fn engine(&self) -> EngineKind {
        EngineKind::Postgresql
    }

    fn system_excludes(&self) -> &'static [&'static str] {
        SYSTEM_DATABASES
    }

    fn test_connection(&self, conn: &ResolvedConnection) -> Result<()> {
        let mut cmd = self.psql(conn, ADMIN_DB);
        cmd.args(["-Atc", "SELECT 1"]);
        run_with_timeout(&mut cmd, None, Duration::from_secs(15), "psql")
            .map_err(connection_scope)?;
        Ok(())
    }

    fn list_targets(&self, conn: &ResolvedConnection) -> Result<Vec<String>> {
        let mut cmd = self.psql(conn, ADMIN_DB);
        cmd.args([
            "-Atc",
            "SELECT datname FROM pg_database ORDER BY datname",
        ]);
        let out = run_with_timeout(&mut cmd, None, Duration::from_secs(30), "psql")
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
        let mut cmd = Command::new("pg_dump");
        self.common_args(&mut cmd, conn);
        cmd.args(["--create", "--no-owner", "--no-privileges"]).arg(target);
        dump_via_command(cmd, dest, timeout, "pg_dump")
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
                    "postgresql restore expects a SQL script, not an archive".to_string(),
                ))
            }
        };
        let mut cmd = self.psql(conn, ADMIN_DB);
        cmd.args(["-v", "ON_ERROR_STOP=1"]);
        run_with_timeout(&mut cmd, Some(script.as_bytes().to_vec()), timeout, "psql")?;
        Ok(())
    }
}

fn connection_scope(e: SavepointError) -> SavepointError {
    match e {
        SavepointError::Adapter(msg) => SavepointError::Connection(msg),
        other => other,
    }
}
