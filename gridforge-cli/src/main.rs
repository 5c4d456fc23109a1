//! GridForge CLI - compose ESP32/ESP8266 sensor nodes and generate MQTT firmware.

use clap::{Parser, Subcommand, ValueEnum};
use gridforge::config::{DEFAULT_BROKER, DEFAULT_PORT};
use gridforge::identity::resolve_identity;
use gridforge::{
    Catalog, GeneratedFirmware, GridForgeCore, GridForgeError, IdentityData, LocalSigner,
    ModuleCategory, NetworkConfig, PlanReport,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gridforge")]
#[command(about = "ESP32/ESP8266 pin planner and MQTT firmware generator", long_about = None)]
#[command(version)]
struct Cli {
    /// Detailed listings and debug logging (RUST_LOG overrides the level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported boards; with --verbose, their pin tables
    Boards,

    /// List catalog modules; with --verbose, pins and libraries too
    Modules {
        /// Only show modules in this category
        #[arg(short, long, value_enum)]
        category: Option<CategoryArg>,
    },

    /// Assign pins for a set of modules
    Plan {
        /// Board id
        #[arg(short, long, default_value = gridforge::catalog::DEFAULT_BOARD_ID)]
        board: String,

        /// Module id, repeat in attach order
        #[arg(short, long = "module", value_name = "MODULE", required = true)]
        modules: Vec<String>,

        /// Directory of extra module JSON files
        #[arg(long, value_name = "DIR")]
        catalog_dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Assign pins and generate the Arduino sketch
    Generate {
        /// Board id
        #[arg(short, long, default_value = gridforge::catalog::DEFAULT_BOARD_ID)]
        board: String,

        /// Module id, repeat in attach order
        #[arg(short, long = "module", value_name = "MODULE")]
        modules: Vec<String>,

        /// WiFi network name
        #[arg(long, default_value = "")]
        ssid: String,

        /// WiFi password
        #[arg(long, env = "GRIDFORGE_WIFI_PASSWORD", default_value = "", hide_env_values = true)]
        password: String,

        /// MQTT broker host
        #[arg(long, default_value = DEFAULT_BROKER)]
        broker: String,

        /// MQTT broker port
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Device id, also names the output file
        #[arg(long)]
        device_id: Option<String>,

        /// Pre-issued identity token
        #[arg(long, conflicts_with = "identity_secret")]
        identity: Option<String>,

        /// Sign an identity token locally with this secret
        #[arg(long, env = "GRIDFORGE_IDENTITY_SECRET", hide_env_values = true)]
        identity_secret: Option<String>,

        /// Directory of extra module JSON files
        #[arg(long, value_name = "DIR")]
        catalog_dir: Option<PathBuf>,

        /// Write the sketch here; a directory receives the suggested file name
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for tooling
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum CategoryArg {
    Environmental,
    Security,
    Actuator,
    Power,
    Identity,
    Display,
}

impl From<CategoryArg> for ModuleCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Environmental => ModuleCategory::Environmental,
            CategoryArg::Security => ModuleCategory::Security,
            CategoryArg::Actuator => ModuleCategory::Actuator,
            CategoryArg::Power => ModuleCategory::Power,
            CategoryArg::Identity => ModuleCategory::Identity,
            CategoryArg::Display => ModuleCategory::Display,
        }
    }
}

/// Network and identity flags of `generate`.
struct GenerateOptions {
    network: NetworkConfig,
    identity: Option<String>,
    identity_secret: Option<String>,
    output: Option<PathBuf>,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match cli.command {
        Commands::Boards => handle_boards(cli.verbose),
        Commands::Modules { category } => handle_modules(category, cli.verbose),
        Commands::Plan {
            board,
            modules,
            catalog_dir,
            format,
        } => handle_plan(&board, &modules, catalog_dir.as_deref(), format),
        Commands::Generate {
            board,
            modules,
            ssid,
            password,
            broker,
            port,
            device_id,
            identity,
            identity_secret,
            catalog_dir,
            output,
            format,
        } => {
            let mut network = match device_id {
                Some(id) => NetworkConfig::with_device_id(id),
                None => NetworkConfig::default(),
            };
            network.ssid = ssid;
            network.password = password;
            network.broker = broker;
            network.port = port;
            let options = GenerateOptions {
                network,
                identity,
                identity_secret,
                output,
            };
            handle_generate(&board, &modules, catalog_dir.as_deref(), options, format)
        }
    };

    process::exit(exit_code);
}

fn report_error(e: GridForgeError) -> i32 {
    eprintln!("Error: {}", e);
    1
}

fn load_catalog(catalog_dir: Option<&Path>) -> Result<Catalog, GridForgeError> {
    let mut catalog = Catalog::builtin()?;
    if let Some(dir) = catalog_dir {
        tracing::debug!(dir = %dir.display(), "loading user modules");
        for error in catalog.load_user_modules(dir) {
            eprintln!("Warning: {}", error);
        }
    }
    Ok(catalog)
}

fn handle_boards(verbose: bool) -> i32 {
    let catalog = match load_catalog(None) {
        Ok(c) => c,
        Err(e) => return report_error(e),
    };

    println!("Supported boards:\n");
    for board in catalog.boards() {
        println!("  {}", board.id);
        println!("    {} ({} pins)", board.name, board.pins.len());
        println!(
            "    I2C SDA={} SCL={}",
            board.label_for(board.default_i2c.sda),
            board.label_for(board.default_i2c.scl)
        );
        if verbose {
            for pin in &board.pins {
                let caps: Vec<&str> = pin.capabilities.iter().map(|c| c.as_str()).collect();
                let mut line = format!("      {:<5} GPIO{:<3} {}", pin.label, pin.gpio, caps.join(", "));
                if pin.restricted {
                    line.push_str(&format!(
                        "  [restricted: {}]",
                        pin.restriction_reason.as_deref().unwrap_or("unspecified")
                    ));
                }
                println!("{}", line);
            }
        }
        println!();
    }
    0
}

fn handle_modules(category: Option<CategoryArg>, verbose: bool) -> i32 {
    let catalog = match load_catalog(None) {
        Ok(c) => c,
        Err(e) => return report_error(e),
    };

    let modules: Vec<_> = match category {
        Some(cat) => catalog.modules_in_category(cat.into()),
        None => catalog.modules().iter().collect(),
    };

    println!("Available modules:\n");
    for def in modules {
        println!("  {:<16} {} [{}]", def.id, def.name, def.category);
        if verbose {
            println!("    {}", def.description);
            let needs: Vec<&str> = def.requires.iter().map(|c| c.as_str()).collect();
            println!("    Pins:      {}", needs.join(", "));
            if let Some(bus) = def.bus {
                println!("    Bus:       {}", bus);
            }
            if !def.libraries.is_empty() {
                println!("    Libraries: {}", def.libraries.join(", "));
            }
            println!("    Draw:      {} mA", def.power_consumption_ma);
            println!();
        }
    }
    0
}

fn handle_plan(
    board: &str,
    modules: &[String],
    catalog_dir: Option<&Path>,
    format: OutputFormat,
) -> i32 {
    let result = load_catalog(catalog_dir).and_then(|catalog| {
        let project = GridForgeCore::plan(&catalog, board, modules)?;
        Ok(GridForgeCore::report(&catalog, &project))
    });

    match result {
        Ok(report) => {
            match format {
                OutputFormat::Human => output_plan_human(&report),
                OutputFormat::Json => match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => return report_error(e.into()),
                },
            }
            0
        }
        Err(e) => report_error(e),
    }
}

fn output_plan_human(report: &PlanReport) {
    println!("\nBoard: {} ({})", report.board_name, report.board);
    println!("{}", "─".repeat(60));

    if report.modules.is_empty() {
        println!("  No modules");
    }
    for module in &report.modules {
        println!("  {} [{}]", module.name, module.short_id);
        for pin in &module.pins {
            println!("    {:<6} -> {} (GPIO{})", pin.placeholder, pin.label, pin.gpio);
        }
    }

    println!("\n  Estimated draw: {:.1} mA", report.estimated_current_ma);
    if let Some(max) = report.max_current_ma {
        println!("  Board budget:   {} mA", max);
    }
    if report.over_budget() {
        println!("  WARNING: modules exceed the board's current budget");
    }
}

fn handle_generate(
    board: &str,
    modules: &[String],
    catalog_dir: Option<&Path>,
    options: GenerateOptions,
    format: OutputFormat,
) -> i32 {
    match run_generate(board, modules, catalog_dir, options) {
        Ok((report, firmware, written)) => {
            match format {
                OutputFormat::Human => output_generate_human(&report, &firmware, written.as_deref()),
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "filename": firmware.filename,
                        "path": written.as_ref().map(|p| p.display().to_string()),
                        "board": report.board,
                        "allocation": report.modules,
                        "libraries": firmware.libraries,
                        "source": firmware.source,
                    });
                    match serde_json::to_string_pretty(&output) {
                        Ok(json) => println!("{}", json),
                        Err(e) => return report_error(e.into()),
                    }
                }
            }
            0
        }
        Err(e) => report_error(e),
    }
}

fn run_generate(
    board: &str,
    modules: &[String],
    catalog_dir: Option<&Path>,
    options: GenerateOptions,
) -> Result<(PlanReport, GeneratedFirmware, Option<PathBuf>), GridForgeError> {
    let catalog = load_catalog(catalog_dir)?;
    let mut project = GridForgeCore::plan(&catalog, board, modules)?;
    project.network = options.network;
    project.identity = match (options.identity, options.identity_secret) {
        (Some(token), _) => Some(token),
        (None, Some(secret)) => Some(resolve_identity(
            &LocalSigner::new(secret),
            &IdentityData::default(),
        )),
        (None, None) => None,
    };

    let firmware = GridForgeCore::generate(&catalog, &project)?;
    let written = match options.output {
        Some(ref path) => Some(GridForgeCore::write_firmware(&firmware, path)?),
        None => None,
    };
    tracing::debug!(
        board = %project.board().id,
        modules = project.modules().len(),
        bytes = firmware.source.len(),
        "firmware generated"
    );
    Ok((GridForgeCore::report(&catalog, &project), firmware, written))
}

fn output_generate_human(report: &PlanReport, firmware: &GeneratedFirmware, written: Option<&Path>) {
    match written {
        None => print!("{}", firmware.source),
        Some(path) => {
            println!("Wrote {}", path.display());
            println!("Board: {} with {} module(s)", report.board, report.modules.len());
            println!("\nInstall these libraries:");
            for lib in &firmware.libraries {
                println!("  - {} ({})", lib.manager_name, lib.author);
            }
        }
    }
}
