use clap::Parser;
use colored::*;
use savepoint::api::{default_home, CmdMessage, MessageLevel, SavepointApi};
use savepoint::commands::config::ConfigUpdate;
use savepoint::config::SavepointPaths;
use savepoint::error::{Result, SavepointError};
use savepoint::model::{EngineKind, Instance};
use std::io::{BufRead, Write};
use std::str::FromStr;

mod args;
use args::{Cli, Commands, InstanceCommands, VaultCommands};

fn main() {
    init_tracing();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            std::process::exit(e.category().exit_code());
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    let home = cli.home.unwrap_or_else(default_home);
    let api = SavepointApi::open(SavepointPaths::new(home))?;

    let result = match cli.command {
        Commands::Vault(cmd) => handle_vault(&api, cmd)?,
        Commands::Instance(cmd) => handle_instance(&api, cmd)?,
        Commands::Backup { instances } => api.backup(&instances)?,
        Commands::Restore {
            artifact,
            instance,
            target,
        } => api.restore(&artifact, instance.as_deref(), target.as_deref())?,
        Commands::RestoreList { instance } => {
            let result = api.restore_list(instance.as_deref())?;
            print_artifacts(&result.artifacts);
            result
        }
        Commands::TestConnection { id } => api.test_connection(&id)?,
        Commands::Prune { dry_run } => api.prune(dry_run)?,
        Commands::Config {
            storage_root,
            daily,
            weekly,
            monthly,
            timeout,
        } => {
            let update = ConfigUpdate {
                storage_root,
                daily,
                weekly,
                monthly,
                dump_timeout_secs: timeout,
            };
            if update_is_empty(&update) {
                api.config_show()?
            } else {
                api.config_set(update)?
            }
        }
    };

    print_messages(&result.messages);
    Ok(result.exit_code())
}

fn update_is_empty(update: &ConfigUpdate) -> bool {
    update.storage_root.is_none()
        && update.daily.is_none()
        && update.weekly.is_none()
        && update.monthly.is_none()
        && update.dump_timeout_secs.is_none()
}

fn handle_vault(api: &SavepointApi, cmd: VaultCommands) -> Result<savepoint::api::CmdResult> {
    match cmd {
        VaultCommands::Set {
            id,
            username,
            password,
            description,
        } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password()?,
            };
            api.vault_set(&id, &username, &password, &description)
        }
        VaultCommands::Get { id, reveal } => api.vault_get(&id, reveal),
        VaultCommands::Remove { id } => api.vault_remove(&id),
        VaultCommands::List => {
            let result = api.vault_list()?;
            print_credentials(&result.credentials);
            Ok(result)
        }
        VaultCommands::Info => api.vault_info(),
    }
}

fn handle_instance(api: &SavepointApi, cmd: InstanceCommands) -> Result<savepoint::api::CmdResult> {
    match cmd {
        InstanceCommands::Add {
            id,
            engine,
            host,
            port,
            credential,
            root_path,
            whitelist,
            blacklist,
            ssl,
        } => {
            let engine = EngineKind::from_str(&engine).map_err(SavepointError::Config)?;
            let port = port.unwrap_or(match engine {
                EngineKind::Mysql => 3306,
                EngineKind::Postgresql => 5432,
                EngineKind::Files => 0,
            });
            api.instance_add(Instance {
                id,
                engine,
                host,
                port,
                credential_name: credential,
                root_path,
                whitelist,
                blacklist,
                ssl_enabled: ssl,
                enabled: true,
            })
        }
        InstanceCommands::List => {
            let result = api.instance_list()?;
            print_instances(&result.instances);
            Ok(result)
        }
        InstanceCommands::Show { id } => {
            let result = api.instance_show(&id)?;
            print_instances(&result.instances);
            Ok(result)
        }
        InstanceCommands::Enable { id } => api.instance_set_enabled(&id, true),
        InstanceCommands::Disable { id } => api.instance_set_enabled(&id, false),
        InstanceCommands::Remove { id } => api.instance_remove(&id),
    }
}

fn prompt_password() -> Result<String> {
    print!("Password: ");
    std::io::stdout().flush().map_err(SavepointError::Io)?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(SavepointError::Io)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

fn print_credentials(credentials: &[savepoint::vault::CredentialSummary]) {
    for cred in credentials {
        let updated = cred.updated_at.format("%Y-%m-%d %H:%M");
        if cred.description.is_empty() {
            println!("  {:<24} updated {}", cred.id.bold(), updated);
        } else {
            println!(
                "  {:<24} updated {}  {}",
                cred.id.bold(),
                updated,
                cred.description.dimmed()
            );
        }
    }
}

fn print_instances(instances: &[Instance]) {
    for instance in instances {
        let state = if instance.enabled {
            "enabled".green()
        } else {
            "disabled".red()
        };
        let location = match instance.engine {
            EngineKind::Files => instance
                .root_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            _ => format!("{}:{}", instance.host, instance.port),
        };
        println!(
            "  {:<16} {:<11} {:<28} {}",
            instance.id.bold(),
            instance.engine.to_string(),
            location,
            state
        );
        if !instance.whitelist.is_empty() {
            println!("    whitelist: {}", instance.whitelist.join(", ").dimmed());
        }
        if !instance.blacklist.is_empty() {
            println!("    blacklist: {}", instance.blacklist.join(", ").dimmed());
        }
    }
}

fn print_artifacts(artifacts: &[savepoint::model::Artifact]) {
    for artifact in artifacts {
        println!(
            "  {}  {:<12} {:<16} {:>10}  {}",
            artifact.created_at.format("%Y-%m-%d %H:%M:%S"),
            artifact.instance_id.bold(),
            artifact.target,
            human_size(artifact.size_bytes),
            artifact.storage_path.display().to_string().dimmed()
        );
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
