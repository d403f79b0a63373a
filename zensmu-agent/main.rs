use anyhow::{bail, Context};
use axum::{response::IntoResponse, routing::get, Router};
use clap::{Parser, Subcommand};
use prometheus::{Encoder, TextEncoder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use zensmu::catalog::ScanRange;
use zensmu::common::DEFAULT_DRIVER_ROOT;
use zensmu::config::{DEFAULT_INTERVAL, DEFAULT_LISTEN};
use zensmu::pmtable::{NamedTable, PmTableSnapshot, TelemetrySummary};
use zensmu::{
    CollectorConfig, ExportConfig, MailboxKind, MetricCollector, PmTableMetricExporter, Session,
    SmuMetricExporter, SysfsTransport, SystemReport,
};

type SysfsSession = Session<SysfsTransport>;

#[derive(Parser, Debug)]
#[command(name = "zensmu")]
#[command(about = "AMD Zen System Management Unit access over the ryzen_smu driver")]
struct Args {
    #[arg(long, default_value = DEFAULT_DRIVER_ROOT, help = "ryzen_smu sysfs directory")]
    driver_path: PathBuf,

    #[arg(
        short,
        long,
        help = "Enable verbose logging (shows every SMN and mailbox exchange)"
    )]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show processor, firmware and topology details
    Info,
    /// Maximum boost frequency override
    Fmax {
        #[command(subcommand)]
        action: FmaxAction,
    },
    /// Per-core curve optimizer margins
    Co {
        #[command(subcommand)]
        action: CoAction,
    },
    /// Send a raw command to a driver-known mailbox
    Cmd {
        #[arg(long, value_enum, default_value = "rsmu")]
        mailbox: MailboxKind,
        #[arg(value_parser = parse_u32, help = "Command id (decimal or 0x-prefixed hex)")]
        command: u32,
        #[arg(value_parser = parse_u32, num_args = 0..=6, help = "Up to six argument words")]
        args: Vec<u32>,
    },
    /// Dump the PM table
    PmTable {
        #[arg(long, help = "Decode the named layout and derived telemetry")]
        named: bool,
    },
    /// Raw SMN register access
    Smn {
        #[command(subcommand)]
        action: SmnAction,
    },
    /// Search for undocumented mailboxes, in the platform's ranges unless
    /// a range is given
    Scan {
        #[arg(long, value_parser = parse_u32, requires_all = ["end", "step", "response_offset"])]
        start: Option<u32>,
        #[arg(long, value_parser = parse_u32)]
        end: Option<u32>,
        #[arg(long, value_parser = parse_u32)]
        step: Option<u32>,
        #[arg(long, value_parser = parse_u32)]
        response_offset: Option<u32>,
    },
    /// Show DRAM timings from the memory controller
    Timings,
    /// Write a JSON report of the platform
    Report {
        #[arg(long, help = "Include a mailbox scan (writes arbitrary SMN addresses)")]
        scan: bool,
        #[arg(short, long, help = "Write to a file instead of stdout")]
        output: Option<PathBuf>,
    },
    /// Serve Prometheus metrics
    Serve {
        #[arg(long, default_value = DEFAULT_LISTEN)]
        listen: String,
        #[arg(long, help = "Collection interval in milliseconds")]
        interval_ms: Option<u64>,
        #[arg(
            long = "core",
            help = "Cores to export (ranges and comma-separated lists: --core 0-3,5)"
        )]
        cores: Option<String>,
        #[arg(long, help = "Export every raw PM table entry")]
        raw_entries: bool,
        #[arg(long, help = "Disable PM table metrics")]
        no_pm_table: bool,
        #[arg(long, help = "Disable max frequency and curve optimizer metrics")]
        no_smu: bool,
    },
}

#[derive(Subcommand, Debug)]
enum FmaxAction {
    Get,
    Set { mhz: u32 },
}

#[derive(Subcommand, Debug)]
enum CoAction {
    /// Read one core, or every enabled core
    Get {
        #[arg(long)]
        core: Option<u32>,
    },
    Set {
        #[arg(long)]
        core: u32,
        #[arg(allow_hyphen_values = true)]
        margin: i32,
    },
}

#[derive(Subcommand, Debug)]
enum SmnAction {
    Read {
        #[arg(value_parser = parse_u32)]
        addr: u32,
    },
    Write {
        #[arg(value_parser = parse_u32)]
        addr: u32,
        #[arg(value_parser = parse_u32)]
        value: u32,
    },
    /// Read every word from start to end inclusive
    Range {
        #[arg(value_parser = parse_u32)]
        start: u32,
        #[arg(value_parser = parse_u32)]
        end: u32,
    },
}

fn parse_u32(s: &str) -> std::result::Result<u32, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number {s:?}: {e}"))
}

/// `RUST_LOG` wins when set and valid; otherwise `--verbose` picks the level
fn log_filter(verbose: bool, directives: Option<&str>) -> EnvFilter {
    if let Some(filter) = directives.and_then(|d| EnvFilter::try_new(d).ok()) {
        return filter;
    }
    EnvFilter::new(if verbose { "debug" } else { "info" })
}

fn check_permissions(driver_path: &Path) -> anyhow::Result<()> {
    if !driver_path.exists() {
        bail!(
            "Cannot access {}\n\nThe ryzen_smu kernel module may not be loaded.\nRun: sudo modprobe ryzen_smu",
            driver_path.display()
        );
    }

    if !nix::unistd::geteuid().is_root() {
        tracing::warn!("Not running as root, driver nodes are usually root-only");
    }

    Ok(())
}

fn print_info(session: &SysfsSession) -> anyhow::Result<()> {
    let identity = session.identity();
    println!("CPU:         {}", identity.cpu_name);
    println!("Family:      0x{:X} model 0x{:X}", identity.family, identity.model);
    println!("Codename:    {}", identity.codename);
    println!("SMU:         v{}", identity.firmware_version);
    println!("Interface:   {:?}", identity.interface_version);
    match identity.pm_table {
        Some(info) => println!("PM table:    0x{:06X} ({} bytes)", info.version, info.size),
        None => println!("PM table:    unsupported"),
    }

    let topology = session.topology().context("reading topology fuses")?;
    println!("CCDs:        {}", topology.ccds);
    println!("CCXs:        {}", topology.ccxs);
    println!("Cores/CCX:   {}", topology.cores_per_ccx);
    println!("Cores:       {}", topology.physical_cores);
    println!("SMT:         {}", if topology.smt { "on" } else { "off" });

    let enabled: Vec<String> = (0..topology.physical_cores)
        .filter(|&core| topology.core_enabled(core))
        .map(|core| core.to_string())
        .collect();
    println!("Enabled:     {}", enabled.join(","));
    Ok(())
}

fn print_margins(session: &SysfsSession, core: Option<u32>) -> anyhow::Result<()> {
    let cores = match core {
        Some(core) => vec![core],
        None => {
            let topology = session.topology().context("reading topology fuses")?;
            (0..topology.physical_cores)
                .filter(|&core| topology.core_enabled(core))
                .collect()
        }
    };

    for core in cores {
        match session.get_core_voltage_margin(core) {
            Ok(margin) => println!("Core {core:2}: {margin}"),
            Err(e) => println!("Core {core:2}: {e}"),
        }
    }
    Ok(())
}

fn print_pm_table(session: &SysfsSession, named: bool) -> anyhow::Result<()> {
    let snapshot = session.read_pm_table()?;

    if !named {
        for (index, value) in snapshot.values.iter().enumerate() {
            println!(
                "{index:4}  0x{:04X}  {value}",
                PmTableSnapshot::offset_of(index)
            );
        }
        return Ok(());
    }

    match snapshot.named() {
        Some(NamedTable::Matisse(table)) => {
            let physical_cores = session.topology().context("reading topology fuses")?.physical_cores;
            let summary = TelemetrySummary::from_table(&table, physical_cores);
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        None => bail!("PM table version 0x{:06X} has no named layout", snapshot.version),
    }
}

fn print_timings(session: &SysfsSession) -> anyhow::Result<()> {
    let t = session.memory_timings().context("reading UMC registers")?;
    println!("MEMCLK  {:.0} MHz", t.memory_clock_mhz);
    println!("GDM     {}", if t.gear_down { "on" } else { "off" });
    println!("Cmd     {}", if t.cmd_2t { "2T" } else { "1T" });
    println!("BGS     {}", if t.bank_group_swap { "on" } else { "off" });
    println!("BGS alt {}", if t.bank_group_swap_alt { "on" } else { "off" });
    println!(
        "tCL {}  tRCDRD {}  tRCDWR {}  tRP {}  tRAS {}  tRC {}",
        t.tcl, t.trcdrd, t.trcdwr, t.trp, t.tras, t.trc
    );
    println!(
        "tRRDS {}  tRRDL {}  tFAW {}  tWTRS {}  tWTRL {}  tWR {}",
        t.trrds, t.trrdl, t.tfaw, t.twtrs, t.twtrl, t.twr
    );
    println!("tRTP {}  tCWL {}  tCKE {}", t.trtp, t.tcwl, t.tcke);
    println!(
        "tRDRD SC/SCL/SD/DD {}/{}/{}/{}",
        t.trdrd.sc, t.trdrd.scl, t.trdrd.sd, t.trdrd.dd
    );
    println!(
        "tWRWR SC/SCL/SD/DD {}/{}/{}/{}",
        t.twrwr.sc, t.twrwr.scl, t.twrwr.sd, t.twrwr.dd
    );
    println!("tRDWR {}  tWRRD {}", t.trdwr, t.twrrd);
    println!("tRFC {}  tRFC2 {}  tRFC4 {}", t.trfc, t.trfc2, t.trfc4);
    Ok(())
}

struct AppState {
    pm_table_exporter: Option<Arc<PmTableMetricExporter<SysfsTransport>>>,
    smu_exporter: Option<Arc<SmuMetricExporter<SysfsTransport>>>,
}

async fn metrics_handler(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    zensmu::gather_metrics!(buffer, encoder, state.pm_table_exporter, "PM table");
    zensmu::gather_metrics!(buffer, encoder, state.smu_exporter, "SMU");

    let content_type = encoder.format_type().to_string();
    (
        [("Content-Type", content_type)],
        String::from_utf8(buffer).unwrap_or_default(),
    )
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::warn!("Shutdown triggered by Ctrl+C");
        },
        _ = terminate => {
            tracing::warn!("Shutdown triggered by SIGTERM");
        },
    }

    cancel_token.cancel();
}

#[allow(clippy::too_many_arguments)]
async fn serve(
    session: SysfsSession,
    listen: &str,
    interval_ms: Option<u64>,
    cores: Option<String>,
    raw_entries: bool,
    no_pm_table: bool,
    no_smu: bool,
) -> anyhow::Result<()> {
    let listen = ExportConfig::parse_listen(listen)?;
    let interval = interval_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_INTERVAL);

    let config = match cores {
        Some(list) => ExportConfig::new(ExportConfig::parse_cpu_list(&list)?),
        None => {
            tracing::info!("Auto-detecting cores...");
            ExportConfig::from_topology(&session.topology().context("reading topology fuses")?)
        }
    }
    .with_listen(listen)
    .with_interval(interval)
    .with_raw_entries(raw_entries);

    tracing::info!("Exporting cores: {:?}", config.cores);

    let collector_config = CollectorConfig {
        pm_table: !no_pm_table,
        smu: !no_smu,
    };

    let session = Arc::new(session);
    let collector = MetricCollector::new(config.clone(), collector_config, session)?;

    let state = Arc::new(AppState {
        pm_table_exporter: collector.pm_table_exporter(),
        smu_exporter: collector.smu_exporter(),
    });

    let cancel_token = CancellationToken::new();
    let collection_handle = collector.start(cancel_token.clone());

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    tracing::warn!("Starting HTTP server on {}", config.listen);
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    tracing::info!("Server shutdown complete, waiting for collection loop to finish...");
    if let Err(e) = collection_handle.await {
        tracing::error!("Collection loop failed: {}", e);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.verbose, directives.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    check_permissions(&args.driver_path)?;

    let session = Session::open(&args.driver_path)
        .with_context(|| format!("opening driver at {}", args.driver_path.display()))?;

    match args.command {
        Command::Info => print_info(&session)?,
        Command::Fmax { action } => match action {
            FmaxAction::Get => println!("{} MHz", session.get_max_frequency()?),
            FmaxAction::Set { mhz } => {
                session.set_max_frequency(mhz)?;
                println!("Max frequency set to {mhz} MHz");
            }
        },
        Command::Co { action } => match action {
            CoAction::Get { core } => print_margins(&session, core)?,
            CoAction::Set { core, margin } => {
                session.set_core_voltage_margin(core, margin)?;
                println!("Core {core}: {margin}");
            }
        },
        Command::Cmd {
            mailbox,
            command,
            args,
        } => {
            let mut words = [0u32; 6];
            words[..args.len()].copy_from_slice(&args);
            let reply = session.send_command(mailbox, command, words)?;
            println!("{} 0x{:02X}: {}", mailbox.name(), command, reply.status);
            for (i, word) in reply.args.iter().enumerate() {
                println!("  arg{i}: 0x{word:08X} ({word})");
            }
        }
        Command::PmTable { named } => print_pm_table(&session, named)?,
        Command::Smn { action } => match action {
            SmnAction::Read { addr } => println!("0x{:08X}: 0x{:08X}", addr, session.read_smn(addr)?),
            SmnAction::Write { addr, value } => {
                session.write_smn(addr, value)?;
                println!("0x{addr:08X} <- 0x{value:08X}");
            }
            SmnAction::Range { start, end } => {
                for (addr, result) in session.read_smn_range(start, end) {
                    match result {
                        Ok(value) => println!("0x{addr:08X}: 0x{value:08X}"),
                        Err(e) => println!("0x{addr:08X}: {e}"),
                    }
                }
            }
        },
        Command::Scan {
            start,
            end,
            step,
            response_offset,
        } => {
            let found = match (start, end, step, response_offset) {
                (Some(start), Some(end), Some(step), Some(offset)) => {
                    session.scan_mailbox_range(&ScanRange::new(start, end, step, offset))?
                }
                _ => session.scan_mailboxes()?,
            };
            if found.is_empty() {
                println!("No mailboxes found");
            }
            for mailbox in found {
                println!("{mailbox}");
            }
        }
        Command::Timings => print_timings(&session)?,
        Command::Report { scan, output } => {
            let mailboxes = if scan { session.scan_mailboxes()? } else { Vec::new() };
            let json = SystemReport::collect(&session, mailboxes).to_json()?;
            match output {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{json}"),
            }
        }
        Command::Serve {
            listen,
            interval_ms,
            cores,
            raw_entries,
            no_pm_table,
            no_smu,
        } => {
            serve(
                session,
                &listen,
                interval_ms,
                cores,
                raw_entries,
                no_pm_table,
                no_smu,
            )
            .await?
        }
    }

    Ok(())
}
