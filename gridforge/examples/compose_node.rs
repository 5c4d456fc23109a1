//! Example: plan a node and print the generated sketch.
//! Run with: cargo run --example compose_node [board-id] [module-id...]

use gridforge::{Catalog, GridForgeCore, GridForgeError, NetworkConfig};

fn main() -> Result<(), GridForgeError> {
    let mut args = std::env::args().skip(1);
    let board = args.next().unwrap_or_else(|| "esp32-devkit-v1".to_string());
    let mut modules: Vec<String> = args.collect();
    if modules.is_empty() {
        modules = vec!["dht22".to_string(), "relay-1ch".to_string()];
    }

    let catalog = Catalog::builtin()?;
    let mut project = GridForgeCore::plan(&catalog, &board, modules.as_slice())?;
    project.network = NetworkConfig {
        ssid: "greenhouse".to_string(),
        password: "changeme".to_string(),
        ..NetworkConfig::with_device_id("greenhouse_node")
    };

    let report = GridForgeCore::report(&catalog, &project);
    eprintln!("Board: {} ({})", report.board_name, report.board);
    for module in &report.modules {
        let pins: Vec<String> = module
            .pins
            .iter()
            .map(|p| format!("{}={}", p.placeholder, p.label))
            .collect();
        eprintln!("  {} [{}] {}", module.name, module.short_id, pins.join(" "));
    }

    let firmware = GridForgeCore::generate(&catalog, &project)?;
    eprintln!("// {}", firmware.filename);
    print!("{}", firmware.source);
    Ok(())
}
