//! Foil self-test CLI
//!
//! Lists and runs the library self tests and writes the default config
//! file.

use anyhow::{Context, Result, bail};
use clap::Parser;
use foil_connection::MongoConnectionManager;
use foil_core::{
    ConfigMap, DEFAULT_CONNECTION, PartialDescriptor, default_config_map, load_connection_config,
    resolve, write_config,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Config file used when `--filename` is not given
const DEFAULT_FILENAME: &str = ".foilmongo";

/// Foil Library Self Test
#[derive(Parser, Debug)]
#[command(name = "foil")]
#[command(version)]
#[command(about = "Foil Library Self Test", long_about = None)]
struct Cli {
    /// Test number to run
    #[arg(short = 'n', long)]
    testnum: Option<usize>,

    /// Generate default config file
    #[arg(short, long)]
    init: bool,

    /// Config filename to use
    #[arg(short, long, default_value = DEFAULT_FILENAME)]
    filename: PathBuf,

    /// List available tests to run
    #[arg(short, long)]
    list: bool,
}

/// Self tests, in `--testnum` order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelfTest {
    InitConfigFile,
    LoadConfigFile,
    ConnectMongoDb,
}

impl SelfTest {
    const ALL: [SelfTest; 3] = [
        SelfTest::InitConfigFile,
        SelfTest::LoadConfigFile,
        SelfTest::ConnectMongoDb,
    ];

    fn from_index(index: usize) -> Result<Self> {
        match Self::ALL.get(index) {
            Some(test) => Ok(*test),
            None => bail!(
                "Requested test num {} is out of range. Num available tests: {}",
                index,
                Self::ALL.len()
            ),
        }
    }

    fn name(self) -> &'static str {
        match self {
            SelfTest::InitConfigFile => "initconfigfile",
            SelfTest::LoadConfigFile => "loadconfigfile",
            SelfTest::ConnectMongoDb => "connectmongodb",
        }
    }

    fn run(self, filename: &Path, out: &mut impl Write) -> Result<()> {
        match self {
            SelfTest::InitConfigFile => init_config_file(filename, out),
            SelfTest::LoadConfigFile => load_config_file(filename, out),
            SelfTest::ConnectMongoDb => connect_mongodb(filename, out),
        }
    }
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let stdout = std::io::stdout();
    if let Err(e) = run(&cli, &mut stdout.lock()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("foil=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    if cli.list {
        writeln!(out, "Available tests:")?;
        for (index, test) in SelfTest::ALL.iter().enumerate() {
            writeln!(out, "{}: {}", index, test.name())?;
        }
        return Ok(());
    }

    if let Some(index) = cli.testnum {
        let test = SelfTest::from_index(index)?;
        tracing::info!(test = test.name(), filename = %cli.filename.display(), "running self test");
        test.run(&cli.filename, out)?;
    }

    if cli.init {
        init_config_file(&cli.filename, out)?;
    }

    Ok(())
}

/// Write the default config template to `filename`
fn init_config_file(filename: &Path, out: &mut impl Write) -> Result<()> {
    let path = write_config(&default_config_map(), filename, false)
        .with_context(|| format!("Could not write config file {}", filename.display()))?;
    writeln!(out, "Config written to {}", path.display())?;
    Ok(())
}

/// Load `filename` and print every section and option
fn load_config_file(filename: &Path, out: &mut impl Write) -> Result<()> {
    let loaded = load_connection_config(Some(filename))
        .context("Config load failed")?
        .context("Config load failed")?;
    writeln!(out, "Config load was successful")?;
    print_sections(&loaded.config, out)
}

fn print_sections(config: &ConfigMap, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Sections:")?;
    for (section, options) in config.iter() {
        writeln!(out, "[{}]", section)?;
        for (option, value) in options {
            writeln!(out, "{}={}", option, value)?;
        }
    }
    Ok(())
}

/// Connect to MongoDB with the settings in `filename`, then disconnect
fn connect_mongodb(filename: &Path, out: &mut impl Write) -> Result<()> {
    let loaded = load_connection_config(Some(filename))
        .with_context(|| format!("Could not load config file {}", filename.display()))?;
    let config = loaded.as_ref().map(|loaded| &loaded.config);
    let descriptor = resolve(config, &PartialDescriptor::new(), &DEFAULT_CONNECTION)
        .context("Could not resolve connection settings")?;

    let mut manager = MongoConnectionManager::mongodb();
    manager
        .connect(&descriptor)
        .with_context(|| format!("Could not connect to {}:{}", descriptor.address, descriptor.port))?;
    writeln!(
        out,
        "Database connection to {}:{} successful",
        descriptor.address, descriptor.port
    )?;
    manager.disconnect();
    Ok(())
}
