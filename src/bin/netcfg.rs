//! netcfg - Netplan Configuration Tool
//!
//! Writes a netplan document for one IPv4 interface (static or DHCP,
//! optionally a VLAN sub-interface), backs up what was there before,
//! validates it with `netplan generate` and applies it.

use clap::{Parser, ValueEnum};
use libnetcfg::*;
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "netcfg")]
#[command(about = "Generate, validate and apply netplan configuration for one interface", long_about = None)]
#[command(version)]
struct Cli {
    /// Static addressing (requires --address and --gateway)
    #[arg(long = "static")]
    use_static: bool,

    /// DHCP addressing
    #[arg(long = "dhcp")]
    use_dhcp: bool,

    /// Interface to configure (e.g. ens3 or ens3.120 for a VLAN)
    #[arg(short, long)]
    interface: Option<String>,

    /// Host address in CIDR notation (e.g. 192.168.100.10/24)
    #[arg(short, long)]
    address: Option<String>,

    /// Default gateway
    #[arg(short, long)]
    gateway: Option<String>,

    /// DNS servers, comma-separated (repeatable)
    #[arg(long)]
    dns: Vec<String>,

    /// Target netplan file (default: first document in the netplan directory)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Print the document without writing or applying it
    #[arg(long, conflicts_with = "validate_only")]
    dry_run: bool,

    /// Write and validate the document without applying it
    #[arg(long)]
    validate_only: bool,

    /// List candidate interfaces and exit
    #[arg(short, long)]
    list_interfaces: bool,

    /// Also consider virtual, container and tunnel interfaces
    #[arg(long)]
    include_all: bool,

    /// Prompt for missing values
    #[arg(long)]
    interactive: bool,

    /// Do not ask for confirmation before writing
    #[arg(short, long)]
    yes: bool,

    /// Configuration file (default: /etc/netcfg/netcfg.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format for --list-interfaces
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    fn run_mode(&self) -> RunMode {
        if self.dry_run {
            RunMode::DryRun
        } else if self.validate_only {
            RunMode::ValidateOnly
        } else {
            RunMode::Apply
        }
    }

    fn request(&self) -> IntentRequest {
        IntentRequest {
            use_static: self.use_static,
            use_dhcp: self.use_dhcp,
            interface: self.interface.clone(),
            address: self.address.clone(),
            gateway: self.gateway.clone(),
            dns: self.dns.clone(),
            target_file: PathBuf::new(),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: &Cli) -> NetcfgResult<()> {
    let mut request = cli.request();
    // Interactive runs may leave the mode to the prompt
    if !cli.list_interfaces && (!cli.interactive || cli.use_static || cli.use_dhcp) {
        intent::resolve_mode(&request)?;
    }

    let config = NetcfgConfig::load_or_default(cli.config.as_deref())?;
    let classifier = InterfaceClassifier::new(
        IpLinkLister::new(config.commands.ip.clone()),
        config.interface_policy()?,
    );

    if cli.list_interfaces {
        return list_interfaces(&classifier, cli).await;
    }

    request.target_file = writer::resolve_target_file(
        &config.paths.netplan_dir,
        &config.paths.default_file,
        cli.file.as_deref(),
    )
    .await?;

    let candidates = if cli.interface.is_none() {
        classifier.list_candidate_interfaces(cli.include_all).await?
    } else {
        Vec::new()
    };
    let default_dns = config.default_dns()?;

    if cli.interactive {
        request = prompt::complete_request(request, &candidates, &default_dns)?;
    }
    let intent = ConfigIntent::from_request(&request, &candidates, &default_dns)?;
    debug!("Configuring {} in {}", intent.interface(), intent.target_file().display());

    let pipeline = Pipeline::new(
        DocumentBuilder::new(config.renderer()).with_policy(classifier.policy().clone()),
        SafeWriter::new(config.write_options()),
        ApplyRunner::new(netplan_backend(&config, intent.target_file()), cli.run_mode()),
    );

    let rendered = pipeline.render(&intent)?;
    print!("{}", rendered);

    if cli.interactive && pipeline.mode() != RunMode::DryRun {
        let question = format!("Write {}?", intent.target_file().display());
        if !prompt::confirm(&question, cli.yes)? {
            eprintln!("Aborted; nothing written");
            return Ok(());
        }
    }

    let outcome = pipeline.commit(&intent, &rendered).await?;
    report(&outcome);
    Ok(())
}

fn netplan_backend(config: &NetcfgConfig, target: &Path) -> NetplanCli {
    let cli = NetplanCli::new(config.commands.netplan.clone());
    match target.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => cli.with_workdir(dir),
        None => cli,
    }
}

async fn list_interfaces<L: LinkLister>(classifier: &InterfaceClassifier<L>, cli: &Cli) -> NetcfgResult<()> {
    let entries = classifier.list_entries(cli.include_all).await?;

    if cli.output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&entries)
            .map_err(|e| NetcfgError::Format(format!("JSON serialization error: {}", e)))?);
        return Ok(());
    }

    println!("{:<16} {:<10} {}", "NAME", "KIND", "VLAN");
    for entry in entries {
        let vlan = match (&entry.vlan_link, &entry.vlan_id) {
            (Some(link), Some(id)) => format!("{} on {}", id, link),
            _ => "-".to_string(),
        };
        println!("{:<16} {:<10} {}", entry.name.to_string(), entry.kind.to_string(), vlan);
    }
    Ok(())
}

fn report(outcome: &Outcome) {
    if let Some(write) = &outcome.write {
        if let Some(backup) = &write.backup {
            eprintln!("Backup: {}", backup.display());
        }
        eprintln!("Wrote {} ({} bytes)", write.target.display(), write.bytes_written);
    }

    match outcome.status {
        ApplyStatus::Skipped => eprintln!("Dry run: nothing written"),
        ApplyStatus::Validated => eprintln!("Configuration validated (not applied)"),
        ApplyStatus::Applied => eprintln!("Configuration applied"),
    }
}
