use anyhow::Context;
use clap::{Parser, Subcommand};
use iec62056_sim::logging::init_logger_with_default;
use iec62056_sim::{list_ports, log_info, serve, shutdown_on, BufferPolicy, SimulatorConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "iec62056-sim")]
#[command(about = "Simulated IEC 62056-21 meter on a serial port")]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer readout requests on a serial port until Ctrl-C
    Serve {
        port: String,
        /// Opening baud rate
        #[arg(short, long)]
        baudrate: Option<u32>,
        /// Delay between ACK and baud change, in milliseconds
        #[arg(long)]
        settle_ms: Option<u64>,
        /// Clear the raw buffer after every read
        #[arg(long)]
        legacy_buffer: bool,
        /// JSON file with simulator settings
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List serial ports
    ListPorts {
        /// Only list ports that can be opened
        #[arg(long)]
        probe: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger_with_default(&cli.log_level);

    match cli.command {
        Commands::Serve {
            port,
            baudrate,
            settle_ms,
            legacy_buffer,
            config,
        } => {
            let mut sim_config = match config {
                Some(path) => SimulatorConfig::from_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => SimulatorConfig::default(),
            };
            if let Some(baudrate) = baudrate {
                sim_config.initial_baud_rate = baudrate;
            }
            if let Some(settle_ms) = settle_ms {
                sim_config.settle_delay_ms = settle_ms;
            }
            if legacy_buffer {
                sim_config.buffer_policy = BufferPolicy::ClearEachPass;
            }

            let summary = serve(&port, sim_config, shutdown_on(tokio::signal::ctrl_c()))
                .await
                .with_context(|| format!("serving {port}"))?;

            log_info(&format!(
                "Session ended ({:?}): {} identification(s), {} ACK(s), {} OBIS response(s), final baud {:?}",
                summary.end,
                summary.stats.identifications_sent,
                summary.stats.acks_sent,
                summary.stats.obis_responses_sent,
                summary.final_baud_rate,
            ));
        }
        Commands::ListPorts { probe } => {
            let ports = list_ports(probe).context("enumerating serial ports")?;
            log_info(&format!("{} port(s) found", ports.len()));
            for port in ports {
                println!("{port}");
            }
        }
    }

    Ok(())
}
