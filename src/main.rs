use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use nsroute::config::Config;
use nsroute::logging::init_tracing;
use nsroute::{naming, FrontVserverSpec, NitroClient, ReferenceLedger, RouteManager, RoutingIntent};

/// Manage host/path routes on a content-switching appliance.
#[derive(Debug, Parser)]
#[command(name = "nsroute", version)]
struct Cli {
    /// Config file (default: ~/.config/nsroute/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a front (content-switching) vserver.
    CreateVserver {
        name: String,
        ip: IpAddr,
        port: u16,
        #[arg(long, default_value = "HTTP")]
        protocol: String,
    },
    /// Route host + path on a front vserver to a backend.
    Provision {
        /// Front vserver name.
        #[arg(long, required_unless_present = "group", conflicts_with = "group")]
        vserver: Option<String>,
        /// Route group; the front vserver name is derived from it.
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        namespace: Option<String>,
        #[arg(long)]
        host: String,
        /// Exact path; omit to match the host only.
        #[arg(long, default_value = "")]
        path: String,
        /// Appliance service name for the backend.
        #[arg(long)]
        service: String,
        /// Backend address as ip:port.
        #[arg(long)]
        backend: SocketAddr,
        #[arg(long)]
        priority: u32,
    },
    /// Remove every route on a front vserver and the vserver itself.
    Decommission { vserver: String },
    /// List front vservers.
    List,
    /// List policies bound to a front vserver.
    Policies { vserver: String },
    /// Show live route counts per service, rebuilt from the appliance.
    Ledger,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    let client = NitroClient::new(&config.appliance).context("Failed to set up appliance client")?;
    let manager =
        RouteManager::new(&client).with_service_type(config.defaults.service_type.clone());

    run(&manager, &config, cli.command)
}

fn run(manager: &RouteManager<'_, NitroClient>, config: &Config, command: Command) -> anyhow::Result<()> {
    match command {
        Command::CreateVserver {
            name,
            ip,
            port,
            protocol,
        } => {
            manager.create_front_vserver(&FrontVserverSpec {
                name: name.clone(),
                ip,
                port,
                protocol,
            })?;
            println!("{}", name);
        }
        Command::Provision {
            vserver,
            group,
            namespace,
            host,
            path,
            service,
            backend,
            priority,
        } => {
            let namespace = namespace.unwrap_or_else(|| config.defaults.namespace.clone());
            let front_vserver = match (vserver, group) {
                (Some(vserver), _) => vserver,
                (None, Some(group)) => naming::cs_vserver_name(&namespace, &group),
                (None, None) => anyhow::bail!("either --vserver or --group is required"),
            };
            let intent = RoutingIntent {
                namespace,
                front_vserver,
                host,
                path,
                service_name: service,
                backend_ip: backend.ip(),
                backend_port: backend.port(),
                priority,
            };

            let mut ledger = reconciled_ledger(manager)?;
            let lb = manager.provision(&intent, &mut ledger)?;
            println!("{}", lb);
        }
        Command::Decommission { vserver } => {
            let mut ledger = reconciled_ledger(manager)?;
            manager.decommission(&vserver, &mut ledger)?;
        }
        Command::List => {
            for name in manager.list_front_vservers()? {
                println!("{}", name);
            }
        }
        Command::Policies { vserver } => {
            for bound in manager.list_bound_policies(&vserver)? {
                println!("{}\t{}", bound.priority, bound.policy);
            }
        }
        Command::Ledger => {
            for (service, count) in reconciled_ledger(manager)?.entries() {
                println!("{}\t{}", count, service);
            }
        }
    }
    Ok(())
}

/// Counts are process-local, so every run starts from the appliance's view.
fn reconciled_ledger(manager: &RouteManager<'_, NitroClient>) -> anyhow::Result<ReferenceLedger> {
    let mut ledger = ReferenceLedger::new();
    manager
        .reconcile_ledger(&mut ledger)
        .context("Failed to rebuild reference counts from the appliance")?;
    Ok(ledger)
}
