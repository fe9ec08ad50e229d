//! Dump-script rewriting for restores.
//!
//! Replaying a dump against a different target database requires a text
//! rewrite pass before anything reaches the server: schema-qualifying
//! statements must point at the new target, and a handful of constructs
//! that are unsafe to replay verbatim must be neutralized.
//!
//! The pass is a pure text-to-text function driven by an ordered rule
//! table. Precedence is explicit: rules are evaluated per line in table
//! order, and the first matching rule's action settles the line — later
//! rules never re-inspect it. Destructive neutralizations (DROP DATABASE,
//! unsafe roles) sit ahead of renames, which sit ahead of cosmetic clause
//! strips. Lines inside COPY data blocks are never touched.
//!
//! Dropped statements are recorded as warnings, not errors; the only
//! hard failure is a target name that cannot be safely spliced into an
//! identifier position.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, SavepointError};
use crate::model::EngineKind;

#[derive(Debug)]
pub struct RewriteOutcome {
    pub script: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    /// Remove the line and record a warning.
    Drop,
    /// Rewrite the whole line to point the connection at the target.
    Connect,
    /// Rewrite `USE`/`\connect`-style or DDL database identifiers to the target.
    RenameDatabase,
}

struct Rule {
    name: &'static str,
    pattern: &'static Lazy<Regex>,
    action: Action,
}

static DROP_DATABASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*DROP\s+DATABASE\b").unwrap());

// Role names carrying characters that are illegal in an unquoted role
// identifier (commonly '@' from cloud-hosted dumps).
static UNSAFE_ROLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^\s*(CREATE|ALTER)\s+ROLE\s+"?[^"\s;]*[@%]"#).unwrap()
});

static PSQL_CONNECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*\\c(onnect)?\b").unwrap());

static PG_CREATE_DATABASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^(\s*CREATE\s+DATABASE\s+)("[^"]+"|\S+)"#).unwrap()
});

static PG_ALTER_DATABASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^(\s*ALTER\s+DATABASE\s+)("[^"]+"|\S+)"#).unwrap()
});

static MYSQL_USE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*USE\s+").unwrap());

static MYSQL_CREATE_DATABASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\s*CREATE\s+DATABASE\s+(?:/\*![0-9]+\s+IF\s+NOT\s+EXISTS\s*\*/\s*)?)(`[^`]+`|\S+?)(\s|;)")
        .unwrap()
});

// Locale-provider clauses are stripped in place rather than dropping the
// CREATE DATABASE statement, so creation ordering survives.
static LOCALE_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(LOCALE_PROVIDER|ICU_LOCALE|ICU_RULES)\s*=?\s*('[^']*'|[^\s;]+)").unwrap()
});

static COPY_BEGIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*COPY\s.+\sFROM\s+stdin;").unwrap());

static VALID_TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*$").unwrap());

static POSTGRES_RULES: &[Rule] = &[
    Rule {
        name: "drop-database",
        pattern: &DROP_DATABASE,
        action: Action::Drop,
    },
    Rule {
        name: "unsafe-role",
        pattern: &UNSAFE_ROLE,
        action: Action::Drop,
    },
    Rule {
        name: "connect",
        pattern: &PSQL_CONNECT,
        action: Action::Connect,
    },
    Rule {
        name: "create-database",
        pattern: &PG_CREATE_DATABASE,
        action: Action::RenameDatabase,
    },
    Rule {
        name: "alter-database",
        pattern: &PG_ALTER_DATABASE,
        action: Action::RenameDatabase,
    },
];

static MYSQL_RULES: &[Rule] = &[
    Rule {
        name: "drop-database",
        pattern: &DROP_DATABASE,
        action: Action::Drop,
    },
    Rule {
        name: "use",
        pattern: &MYSQL_USE,
        action: Action::Connect,
    },
    Rule {
        name: "create-database",
        pattern: &MYSQL_CREATE_DATABASE,
        action: Action::RenameDatabase,
    },
];

/// Rewrite a dump script so it can be replayed against `target`.
///
/// Pure and idempotent: rewriting an already-rewritten script is a no-op.
pub fn rewrite_script(script: &str, target: &str, engine: EngineKind) -> Result<RewriteOutcome> {
    if !VALID_TARGET.is_match(target) {
        return Err(SavepointError::RestoreRewrite(format!(
            "target name '{}' cannot be used as a database identifier",
            target
        )));
    }

    let rules = match engine {
        EngineKind::Postgresql => POSTGRES_RULES,
        EngineKind::Mysql => MYSQL_RULES,
        EngineKind::Files => {
            return Ok(RewriteOutcome {
                script: script.to_string(),
                warnings: Vec::new(),
            })
        }
    };

    let mut out: Vec<String> = Vec::new();
    let mut warnings = Vec::new();
    let mut in_copy_data = false;

    for (lineno, line) in script.lines().enumerate() {
        if in_copy_data {
            if line == r"\." {
                in_copy_data = false;
            }
            out.push(line.to_string());
            continue;
        }
        if COPY_BEGIN.is_match(line) {
            in_copy_data = true;
            out.push(line.to_string());
            continue;
        }

        match first_matching_rule(rules, line) {
            Some(rule) => match rule.action {
                Action::Drop => {
                    warnings.push(format!(
                        "line {}: dropped unsafe statement ({}): {}",
                        lineno + 1,
                        rule.name,
                        truncate(line)
                    ));
                }
                Action::Connect => match engine {
                    EngineKind::Postgresql => out.push(format!("\\connect \"{}\"", target)),
                    _ => out.push(format!("USE `{}`;", target)),
                },
                Action::RenameDatabase => {
                    out.push(rename_database(line, target, engine));
                }
            },
            None => out.push(line.to_string()),
        }
    }

    reorder_creation_before_connect(&mut out, &mut warnings, engine);

    let mut script = out.join("\n");
    if !script.is_empty() {
        script.push('\n');
    }

    Ok(RewriteOutcome { script, warnings })
}

fn first_matching_rule<'a>(rules: &'a [Rule], line: &str) -> Option<&'a Rule> {
    rules.iter().find(|r| r.pattern.is_match(line))
}

fn rename_database(line: &str, target: &str, engine: EngineKind) -> String {
    match engine {
        EngineKind::Postgresql => {
            let renamed = if PG_CREATE_DATABASE.is_match(line) {
                PG_CREATE_DATABASE
                    .replace(line, format!("${{1}}\"{}\"", target).as_str())
                    .into_owned()
            } else {
                PG_ALTER_DATABASE
                    .replace(line, format!("${{1}}\"{}\"", target).as_str())
                    .into_owned()
            };
            LOCALE_CLAUSE.replace_all(&renamed, "").into_owned()
        }
        _ => MYSQL_CREATE_DATABASE
            .replace(line, format!("${{1}}`{}`${{3}}", target).as_str())
            .into_owned(),
    }
}

/// Database creation must come strictly before the first statement that
/// switches into the target database. pg_dump output already satisfies
/// this; hand-edited or concatenated scripts may not.
fn reorder_creation_before_connect(
    lines: &mut Vec<String>,
    warnings: &mut Vec<String>,
    engine: EngineKind,
) {
    let creation = match engine {
        EngineKind::Postgresql => &PG_CREATE_DATABASE,
        EngineKind::Mysql => &MYSQL_CREATE_DATABASE,
        EngineKind::Files => return,
    };
    let reference = match engine {
        EngineKind::Postgresql => &PSQL_CONNECT,
        _ => &MYSQL_USE,
    };

    let first_ref = lines.iter().position(|l| reference.is_match(l));
    let create_pos = lines.iter().position(|l| creation.is_match(l));

    if let (Some(ref_idx), Some(create_idx)) = (first_ref, create_pos) {
        if create_idx > ref_idx {
            let stmt = lines.remove(create_idx);
            lines.insert(ref_idx, stmt);
            warnings.push(
                "moved database creation ahead of the first connection switch".to_string(),
            );
        }
    }
}

fn truncate(line: &str) -> String {
    const MAX: usize = 80;
    if line.len() <= MAX {
        return line.to_string();
    }
    // Cut on a char boundary; a byte-index slice panics on multibyte
    // identifiers.
    let cut = line
        .char_indices()
        .take_while(|(i, _)| *i <= MAX)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(0);
    format!("{}...", &line[..cut])
}
