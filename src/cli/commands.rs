use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::info;

use crate::config::{Config, ModuleConfig};
use crate::devices::models::ModelVariant;
use crate::devices::pulse::{self, Edge};
use crate::devices::ModuleDriver;
use crate::modbus::client::ModbusTransport;
use crate::utils::error::ModuleError;

fn parse_state(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "high" => Ok(true),
        "off" | "false" | "0" | "low" => Ok(false),
        other => Err(format!("expected on/off, got '{}'", other)),
    }
}

fn parse_edge(s: &str) -> Result<Edge, ModuleError> {
    s.parse()
}

fn parse_model(s: &str) -> Result<ModelVariant, ModuleError> {
    s.parse()
}

fn index_arg(name: &'static str) -> Arg {
    Arg::new(name)
        .required(true)
        .value_parser(value_parser!(usize))
        .help("Logical signal index (0-based)")
}

fn no_verify_arg() -> Arg {
    Arg::new("no_verify")
        .long("no-verify")
        .action(ArgAction::SetTrue)
        .help("Skip the read-back after each coil write")
}

pub fn build_cli() -> Command {
    Command::new("adam-io")
        .version(crate::VERSION)
        .about("Signal-level control of ADAM-6000 Modbus-TCP I/O modules")
        .arg(Arg::new("config").short('c').long("config").help("Path to TOML configuration file"))
        .arg(Arg::new("module").short('m').long("module").help("Module name from the configuration"))
        .arg(Arg::new("host").long("host").help("Override module host"))
        .arg(
            Arg::new("port")
                .long("port")
                .value_parser(value_parser!(u16))
                .help("Override Modbus TCP port"),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .value_parser(parse_model)
                .help("Override module model (adam6052, adam6060)"),
        )
        .arg(
            Arg::new("simulate")
                .long("simulate")
                .action(ArgAction::SetTrue)
                .help("Use an in-memory module instead of the network"),
        )
        .arg(
            Arg::new("log_level")
                .long("log-level")
                .help("Log filter (trace, debug, info, warn, error)"),
        )
        .subcommand(Command::new("identify").about("Read the module identification code"))
        .subcommand(Command::new("get-do").about("Read a digital output").arg(index_arg("index")))
        .subcommand(
            Command::new("set-do")
                .about("Set a digital output")
                .arg(index_arg("index"))
                .arg(
                    Arg::new("state")
                        .required(true)
                        .value_parser(parse_state)
                        .help("on or off"),
                )
                .arg(no_verify_arg()),
        )
        .subcommand(Command::new("get-di").about("Read a digital input").arg(index_arg("index")))
        .subcommand(
            Command::new("pulse")
                .about("Pulse a digital output")
                .arg(index_arg("index"))
                .arg(
                    Arg::new("polarity")
                        .long("polarity")
                        .value_parser(parse_edge)
                        .default_value("rising")
                        .help("rising or falling"),
                )
                .arg(
                    Arg::new("falling")
                        .long("falling")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("polarity")
                        .help("Shorthand for --polarity falling"),
                )
                .arg(
                    Arg::new("duration")
                        .short('d')
                        .long("duration")
                        .value_parser(value_parser!(f64))
                        .help("Hold time in seconds (defaults to the configured pulse)"),
                )
                .arg(no_verify_arg()),
        )
        .subcommand(Command::new("counter").about("Read a counter").arg(index_arg("index")))
        .subcommand(
            Command::new("frequency")
                .about("Read a frequency input in Hz")
                .arg(index_arg("index")),
        )
        .subcommand(Command::new("gcl-counter").about("Read a GCL counter").arg(index_arg("index")))
        .subcommand(Command::new("clear-gcl").about("Clear a GCL counter").arg(index_arg("index")))
        .subcommand(
            Command::new("status").about("Read every input, output and counter").arg(
                Arg::new("json")
                    .long("json")
                    .action(ArgAction::SetTrue)
                    .help("Print as JSON"),
            ),
        )
        .subcommand(
            Command::new("init-config")
                .about("Write a default configuration file")
                .arg(Arg::new("path").required(true)),
        )
}

/// True when the invocation names a command that needs a module connection.
pub fn needs_module(matches: &ArgMatches) -> bool {
    matches!(matches.subcommand(), Some((name, _)) if name != "init-config")
}

/// Picks the module to talk to and applies command-line overrides.
pub fn select_module(matches: &ArgMatches, config: &Config) -> Result<ModuleConfig, ModuleError> {
    let mut module = match matches.get_one::<String>("module") {
        Some(name) => config
            .get_module_by_name(name)
            .cloned()
            .ok_or_else(|| ModuleError::ConfigError(format!("no module named '{}'", name)))?,
        None => config
            .modules
            .first()
            .cloned()
            .ok_or_else(|| ModuleError::ConfigError("no modules configured".to_string()))?,
    };

    if let Some(host) = matches.get_one::<String>("host") {
        module.host = host.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        module.port = *port;
    }
    if let Some(model) = matches.get_one::<ModelVariant>("model") {
        module.model = *model;
    }
    Ok(module)
}

fn index_of(matches: &ArgMatches) -> Result<usize, ModuleError> {
    matches
        .get_one::<usize>("index")
        .copied()
        .ok_or_else(|| ModuleError::InvalidArgument("missing signal index".to_string()))
}

fn verify_of(matches: &ArgMatches, config: &Config) -> bool {
    config.verify_writes && !matches.get_flag("no_verify")
}

fn polarity_of(matches: &ArgMatches) -> Edge {
    if matches.get_flag("falling") {
        return Edge::Falling;
    }
    matches.get_one::<Edge>("polarity").copied().unwrap_or_default()
}

fn on_off(state: bool) -> &'static str {
    if state {
        "ON"
    } else {
        "off"
    }
}

pub async fn handle_subcommands<T: ModbusTransport>(
    matches: &ArgMatches,
    driver: &mut ModuleDriver<T>,
    config: &Config,
) -> Result<bool, ModuleError> {
    if matches.subcommand_matches("identify").is_some() {
        let name = driver.identify().await?;
        println!("🏷️  {} identifies as '{}'", driver.model(), name);
        if !driver.model().matches_identification(&name) {
            println!(
                "⚠️  Expected '{}' for {}",
                driver.model().model_code(),
                driver.model().description()
            );
        }
        return Ok(true);
    }

    if let Some(matches) = matches.subcommand_matches("get-do") {
        let index = index_of(matches)?;
        let state = driver.get_digital_output(index).await?;
        println!("DO{}: {}", index, on_off(state));
        return Ok(true);
    }

    if let Some(matches) = matches.subcommand_matches("set-do") {
        let index = index_of(matches)?;
        let state = matches
            .get_one::<bool>("state")
            .copied()
            .ok_or_else(|| ModuleError::InvalidArgument("missing output state".to_string()))?;
        let verify = verify_of(matches, config);
        driver.set_digital_output(index, state, verify).await?;
        let suffix = if verify { " (verified)" } else { "" };
        println!("✅ DO{} set {}{}", index, on_off(state), suffix);
        return Ok(true);
    }

    if let Some(matches) = matches.subcommand_matches("get-di") {
        let index = index_of(matches)?;
        let state = driver.get_digital_input(index).await?;
        println!("DI{}: {}", index, on_off(state));
        return Ok(true);
    }

    if let Some(matches) = matches.subcommand_matches("pulse") {
        let index = index_of(matches)?;
        let polarity = polarity_of(matches);
        let duration = match matches.get_one::<f64>("duration") {
            Some(secs) => pulse::duration_from_secs(*secs)?,
            None => config.default_pulse_duration(),
        };
        let verify = verify_of(matches, config);
        info!("Executing {} pulse on DO{} for {:?}", polarity, index, duration);
        driver.pulse_digital_output(index, polarity, verify, duration).await?;
        println!("✅ DO{} pulsed ({} edge, {:?})", index, polarity, duration);
        return Ok(true);
    }

    if let Some(matches) = matches.subcommand_matches("counter") {
        let index = index_of(matches)?;
        println!("Counter {}: {}", index, driver.get_counter(index).await?);
        return Ok(true);
    }

    if let Some(matches) = matches.subcommand_matches("frequency") {
        let index = index_of(matches)?;
        println!("Frequency {}: {:.1} Hz", index, driver.get_frequency(index).await?);
        return Ok(true);
    }

    if let Some(matches) = matches.subcommand_matches("gcl-counter") {
        let index = index_of(matches)?;
        println!("GCL counter {}: {}", index, driver.get_gcl_counter(index).await?);
        return Ok(true);
    }

    if let Some(matches) = matches.subcommand_matches("clear-gcl") {
        let index = index_of(matches)?;
        driver.clear_gcl_counter(index).await?;
        println!("✅ GCL counter {} cleared", index);
        return Ok(true);
    }

    if let Some(matches) = matches.subcommand_matches("status") {
        let snapshot = driver.snapshot().await?;
        if matches.get_flag("json") {
            println!("{}", snapshot.to_json()?);
        } else {
            println!("{}", snapshot);
        }
        return Ok(true);
    }

    Ok(false)
}
