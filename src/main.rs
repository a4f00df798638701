use clap::{Args, Parser, Subcommand};
use rigscan::actuator::{ActuatorLink, SerialActuator};
use rigscan::naming::session_folder_name;
use rigscan::request::{AxisRange, ScanRequest};
use rigscan::scan::{HardwareDevices, ScanError, Scanner};
use rigscan::session::next_session_id;
use rigscan::types::{ScanOutcome, Session};
use rigscan::{config, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

fn version_string() -> &'static str {
    let on_tag = env!("RIGSCAN_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("RIGSCAN_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once; only called while building the CLI
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

/// Grid and mode of a scan, from flags or a JSON request.
#[derive(Args, Clone)]
struct RequestArgs {
    /// Read the request as JSON from a file, or `-` for stdin
    #[arg(long, value_name = "FILE")]
    request: Option<PathBuf>,

    /// First horizontal position
    #[arg(long, allow_negative_numbers = true, required_unless_present = "request", conflicts_with = "request")]
    h_start: Option<i64>,
    /// Horizontal end (exclusive)
    #[arg(long, allow_negative_numbers = true, required_unless_present = "request", conflicts_with = "request")]
    h_end: Option<i64>,
    /// Number of horizontal positions
    #[arg(long, allow_negative_numbers = true, required_unless_present = "request", conflicts_with = "request")]
    h_steps: Option<i64>,
    /// First vertical position
    #[arg(long, allow_negative_numbers = true, required_unless_present = "request", conflicts_with = "request")]
    v_start: Option<i64>,
    /// Vertical end (exclusive)
    #[arg(long, allow_negative_numbers = true, required_unless_present = "request", conflicts_with = "request")]
    v_end: Option<i64>,
    /// Number of vertical positions
    #[arg(long, allow_negative_numbers = true, required_unless_present = "request", conflicts_with = "request")]
    v_steps: Option<i64>,

    /// Also capture the mirrored position at every node
    #[arg(long, conflicts_with = "request")]
    stereo: bool,
}

impl RequestArgs {
    fn into_request(self) -> Result<ScanRequest, Box<dyn std::error::Error>> {
        if let Some(path) = self.request {
            let text = if path.as_os_str() == "-" {
                std::io::read_to_string(std::io::stdin())?
            } else {
                std::fs::read_to_string(&path)?
            };
            return Ok(ScanRequest::from_json_str(&text)?);
        }

        match (
            self.h_start,
            self.h_end,
            self.h_steps,
            self.v_start,
            self.v_end,
            self.v_steps,
        ) {
            (Some(hs), Some(he), Some(hn), Some(vs), Some(ve), Some(vn)) => Ok(ScanRequest::new(
                AxisRange {
                    start: hs,
                    end: he,
                    step_count: hn,
                },
                AxisRange {
                    start: vs,
                    end: ve,
                    step_count: vn,
                },
                self.stereo,
            )),
            _ => Err("either --request or all six axis flags are required".into()),
        }
    }
}

#[derive(Parser)]
#[command(name = "rigscan")]
#[command(about = "Drive a pan/tilt camera rig through a capture grid")]
#[command(long_about = "\
Drive a pan/tilt camera rig through a capture grid

Each scan homes the rig, visits every (horizontal, vertical) node of the
grid, captures one JPEG per node (two in stereo mode), homes again, and
writes everything into a new numbered session folder:

  <base_dir>/
  ├── Image_set_0/
  ├── Image_set_1/                       # previous scan
  └── Image_set_2/                       # this scan
      ├── Image_2_1_r_0_c_0.jpg          # pair 1, primary
      ├── Image_2_1S_r_180_c_0.jpg       # pair 1, stereo (mirrored)
      └── ...

Axis positions are start + i * (end - start) / steps, truncated toward zero.

Run 'rigscan gen-config' to generate a documented rigscan.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Rig config file (stock defaults when missing)
    #[arg(long, default_value = "rigscan.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a scan on the rig
    Scan {
        #[command(flatten)]
        request: RequestArgs,
        /// Print the outcome as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Show what a scan would do, without touching the rig
    Plan {
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Send the rig to its home position
    Home,
    /// Print a stock rigscan.toml with all options documented
    GenConfig,
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rigscan=info"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Command::Scan { request, json } => {
            let config = config::load_config(&cli.config)?;
            let request = request.into_request()?;

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    if json {
                        continue;
                    }
                    for line in output::format_scan_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let scanner = Scanner::from_config(&config).with_events(tx);
            let result = scanner.run(&request, &HardwareDevices::new(&config));
            drop(scanner);
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;

            match result {
                Ok(outcome) => report(&outcome, json)?,
                Err(err) => {
                    if let ScanError::ActuatorWrite { outcome, .. } = &err {
                        report(outcome, json)?;
                    }
                    return Err(err.into());
                }
            }
        }
        Command::Plan { request } => {
            let config = config::load_config(&cli.config)?;
            let plan = request.into_request()?.plan()?;
            let storage = &config.storage;
            let id = next_session_id(&storage.base_dir, &storage.prefix)?;
            let next = Session {
                id,
                directory: storage
                    .base_dir
                    .join(session_folder_name(&storage.prefix, id)),
            };
            output::print_plan(&plan, &next);
        }
        Command::Home => {
            let config = config::load_config(&cli.config)?;
            let mut actuator = SerialActuator::open(
                &config.serial,
                &config.home,
                config.timing.move_settle(),
            )?;
            actuator.return_home()?;
            println!("==> Rig at home ({})", actuator.home());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn report(outcome: &ScanOutcome, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        output::print_outcome(outcome);
    }
    Ok(())
}
