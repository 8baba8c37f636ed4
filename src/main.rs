use anyhow::{Context, Result};
use clap::ArgMatches;
use log::{error, info};

use adam_io::cli::{build_cli, handle_subcommands, needs_module, select_module};
use adam_io::modbus::{ModbusTransport, SimulatedTransport};
use adam_io::{Config, ModuleDriver};

fn init_logging(level: Option<&String>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    builder.init();
}

async fn run<T: ModbusTransport>(
    matches: &ArgMatches,
    config: &Config,
    mut driver: ModuleDriver<T>,
) -> Result<()> {
    driver
        .connect()
        .await
        .with_context(|| format!("Failed to connect to {} module", driver.model()))?;

    let outcome = handle_subcommands(matches, &mut driver, config).await;

    if let Err(e) = driver.disconnect().await {
        error!("Failed to close connection cleanly: {}", e);
    }

    outcome?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    init_logging(matches.get_one::<String>("log_level"));

    info!("🖥️  adam-io v{}", adam_io::VERSION);

    if let Some(init) = matches.subcommand_matches("init-config") {
        let path = init
            .get_one::<String>("path")
            .context("missing configuration path")?;
        Config::default().save_to_file(path)?;
        println!("✅ Wrote default configuration to {}", path);
        return Ok(());
    }

    if !needs_module(&matches) {
        println!("No command given. Try --help for the list of commands.");
        return Ok(());
    }

    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => Config::default(),
    };
    let module = select_module(&matches, &config)?;

    if matches.get_flag("simulate") {
        info!("Using simulated {} '{}'", module.model, module.name);
        let driver = ModuleDriver::new(module.model, SimulatedTransport::for_model(module.model));
        run(&matches, &config, driver).await
    } else {
        info!("Module '{}': {} at {}:{}", module.name, module.model, module.host, module.port);
        let driver = ModuleDriver::from_config(&module)?;
        run(&matches, &config, driver).await
    }
}
