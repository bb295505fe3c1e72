//! Registry subcommands.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use jumpgate_terminal::TerminalRegistry;
use jumpgate_terminal::backfill;
use jumpgate_terminal::protocol::TerminalType;
use jumpgate_terminal::storage::{NewTerminal, Terminal};

/// Which terminals `list` shows.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default)]
pub enum ListView {
    /// Every terminal not soft-deleted.
    #[default]
    Undeleted,
    /// Undeleted terminals whose account is enabled.
    Active,
    /// Active terminals with a live heartbeat.
    Alive,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Seed the protocol catalog with every builtin protocol.
    InitProtocols,
    /// Register a new terminal.
    Register {
        name: String,
        /// Terminal type (koko, lion, magnus, ...).
        #[arg(long = "type", default_value = "koko")]
        terminal_type: TerminalType,
        #[arg(long, default_value = "")]
        remote_addr: String,
        #[arg(long, default_value_t = 2222)]
        ssh_port: u16,
        #[arg(long, default_value_t = 5000)]
        http_port: u16,
        #[arg(long, default_value = "default")]
        command_storage: String,
        #[arg(long, default_value = "default")]
        replay_storage: String,
        #[arg(long, default_value = "")]
        comment: String,
        /// Create a linked service account with this username.
        #[arg(long)]
        account: Option<String>,
        /// Assign the type's default protocols right away.
        #[arg(long)]
        default_protocols: bool,
    },
    /// Accept a terminal so it may serve connections.
    Accept { terminal_id: String },
    /// Soft-delete a terminal and remove its service account.
    Delete { terminal_id: String },
    /// Enable the terminal's service account.
    Activate { terminal_id: String },
    /// Disable the terminal's service account.
    Deactivate { terminal_id: String },
    /// Replace a terminal's protocols with its type's defaults.
    ResetProtocols { terminal_id: String },
    /// Record a heartbeat for a terminal.
    Heartbeat { terminal_id: String },
    /// Show a terminal's status, protocols and open sessions.
    Status { terminal_id: String },
    /// Print the runtime configuration a terminal receives.
    Config { terminal_id: String },
    /// List terminals.
    List {
        #[arg(long, value_enum, default_value_t)]
        view: ListView,
    },
    /// Add sftp protocols to linux platforms and their assets.
    BackfillSftp,
}

/// Execute a registry subcommand.
pub async fn run(command: Command, registry: &TerminalRegistry) -> anyhow::Result<()> {
    match command {
        Command::InitProtocols => init_protocols(registry).await,
        Command::Register {
            name,
            terminal_type,
            remote_addr,
            ssh_port,
            http_port,
            command_storage,
            replay_storage,
            comment,
            account,
            default_protocols,
        } => {
            let params = NewTerminal {
                name,
                terminal_type,
                remote_addr,
                ssh_port,
                http_port,
                command_storage,
                replay_storage,
                comment,
            };
            register(registry, &params, account.as_deref(), default_protocols).await
        }
        Command::Accept { terminal_id } => {
            let mut terminal = registry.get(&terminal_id).await?;
            registry.accept(&mut terminal).await?;
            writeln!(io::stdout(), "Accepted {}", terminal.name)?;
            Ok(())
        }
        Command::Delete { terminal_id } => {
            let mut terminal = registry.get(&terminal_id).await?;
            registry.delete(&mut terminal).await?;
            writeln!(io::stdout(), "Deleted {}", terminal.name)?;
            Ok(())
        }
        Command::Activate { terminal_id } => set_active(registry, &terminal_id, true).await,
        Command::Deactivate { terminal_id } => set_active(registry, &terminal_id, false).await,
        Command::ResetProtocols { terminal_id } => {
            let terminal = registry.get(&terminal_id).await?;
            let protocols = registry.reset_protocols_to_default(&terminal).await?;
            let mut out = io::stdout();
            for protocol in protocols {
                writeln!(out, "{protocol}")?;
            }
            Ok(())
        }
        Command::Heartbeat { terminal_id } => {
            let terminal = registry.get(&terminal_id).await?;
            registry.heartbeat(&terminal).await?;
            writeln!(
                io::stdout(),
                "{} alive for {}s",
                terminal.name,
                registry.liveness().ttl().as_secs()
            )?;
            Ok(())
        }
        Command::Status { terminal_id } => status(registry, &terminal_id).await,
        Command::Config { terminal_id } => {
            let terminal = registry.get(&terminal_id).await?;
            let config = registry.config(&terminal).await?;
            writeln!(io::stdout(), "{}", serde_json::to_string_pretty(&config)?)?;
            Ok(())
        }
        Command::List { view } => list(registry, view).await,
        Command::BackfillSftp => {
            let report = backfill::run(registry.database()).await?;
            let mut out = io::stdout();
            writeln!(out, "Platforms given sftp: {}", report.platforms.len())?;
            for name in &report.platforms {
                writeln!(out, "  - {name}")?;
            }
            writeln!(out, "Asset sftp protocols added: {}", report.assets_added)?;
            Ok(())
        }
    }
}

async fn init_protocols(registry: &TerminalRegistry) -> anyhow::Result<()> {
    let protocols = registry.catalog().initialize().await?;
    let mut out = io::stdout();
    for protocol in protocols {
        writeln!(out, "{protocol}")?;
    }
    Ok(())
}

async fn register(
    registry: &TerminalRegistry,
    params: &NewTerminal,
    account: Option<&str>,
    default_protocols: bool,
) -> anyhow::Result<()> {
    let terminal = match account {
        Some(username) => registry.register_with_account(params, username).await?,
        None => registry.register(params).await?,
    };
    if default_protocols {
        registry.reset_protocols_to_default(&terminal).await?;
    }
    writeln!(io::stdout(), "{}", terminal.id)?;
    Ok(())
}

async fn set_active(
    registry: &TerminalRegistry,
    terminal_id: &str,
    active: bool,
) -> anyhow::Result<()> {
    let terminal = registry.get(terminal_id).await?;
    if terminal.account_id.is_none() {
        anyhow::bail!("Terminal {} has no service account", terminal.name);
    }
    registry.set_active(&terminal, active).await?;
    let state = if active { "enabled" } else { "disabled" };
    writeln!(io::stdout(), "{} {state}", terminal.name)?;
    Ok(())
}

async fn status(registry: &TerminalRegistry, terminal_id: &str) -> anyhow::Result<()> {
    let terminal = registry.get(terminal_id).await?;
    let mut out = io::stdout();

    writeln!(out, "{}", registry.status_line(&terminal).await?)?;
    writeln!(out, "  ID:        {}", terminal.id)?;
    writeln!(out, "  Type:      {}", terminal.terminal_type)?;
    writeln!(
        out,
        "  Endpoint:  {} (ssh {}, http {})",
        terminal.remote_addr, terminal.ssh_port, terminal.http_port
    )?;
    writeln!(
        out,
        "  Sessions:  {}",
        registry.online_session_count(&terminal).await?
    )?;
    let protocols: Vec<String> = registry
        .protocols(&terminal)
        .await?
        .iter()
        .map(ToString::to_string)
        .collect();
    writeln!(out, "  Protocols: {}", protocols.join(", "))?;
    Ok(())
}

async fn list(registry: &TerminalRegistry, view: ListView) -> anyhow::Result<()> {
    let terminals: Vec<Terminal> = match view {
        ListView::Undeleted => registry.undeleted().await?,
        ListView::Active => registry.active().await?,
        ListView::Alive => registry.alive().await?,
    };

    let mut out = io::stdout();
    if terminals.is_empty() {
        writeln!(out, "No terminals")?;
        return Ok(());
    }
    writeln!(out, "{:<38} {:<24} {:<12} STATUS", "ID", "NAME", "TYPE")?;
    for terminal in &terminals {
        let label = registry.status_label(terminal).await?;
        writeln!(
            out,
            "{:<38} {:<24} {:<12} {label}",
            terminal.id,
            terminal.name,
            terminal.terminal_type.as_str()
        )?;
    }
    Ok(())
}
