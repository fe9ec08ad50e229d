//! # Savepoint Architecture
//!
//! Savepoint is a **UI-agnostic backup library**. The CLI binary is one
//! client of the library, not the other way round, and that distinction
//! drives the layering.
//!
//! ## The Three-Layer Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (args.rs, wired by main.rs)                      │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands                                │
//! │  - Loads configuration, opens the vault, selects instances  │
//! │  - Returns structured Result types                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Backup/restore orchestration, retention, vault ops       │
//! │  - Operates on Rust types, returns Rust types               │
//! │  - No terminal I/O whatsoever                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Engine Layer (adapter/)                                    │
//! │  - Abstract EngineAdapter trait                             │
//! │  - MysqlAdapter, PostgresAdapter, FilesAdapter (production) │
//! │  - MockAdapter (testing)                                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Isolation
//!
//! Backup runs never abort wholesale: a failure is scoped to the target
//! or instance that caused it, recorded in the run report, and the rest
//! of the run continues. The exit code distinguishes clean success,
//! partial success, and total failure. See [`commands::backup`].
//!
//! ## Secrets
//!
//! Connection credentials live only in the encrypted vault ([`vault`]),
//! keyed to the local host identity — a copied vault file does not
//! decrypt elsewhere. Instance definitions reference credentials by
//! name; plaintext passwords exist in memory for the duration of a job
//! and are passed to client tools via environment variables, never argv.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade — entry point for all operations
//! - [`commands`]: Orchestration logic for each command
//! - [`adapter`]: Engine capability trait and implementations
//! - [`vault`]: Encrypted credential store
//! - [`model`]: Core data types (`Instance`, `Artifact`, `Credential`)
//! - [`config`]: Tool configuration and the instance registry
//! - [`resolve`]: Instance + credential → live connection parameters
//! - [`filter`]: Whitelist/blacklist target selection
//! - [`rewrite`]: SQL rewrite pass for cross-target restores
//! - [`retention`]: Grandfather-father-son retention planning
//! - [`error`]: Error types and exit-code categories

pub mod adapter;
pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod resolve;
pub mod retention;
pub mod rewrite;
pub mod vault;
