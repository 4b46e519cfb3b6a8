//! Command-line interface for sprdmm

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::time::Instant;

use sprdmm::gsp::cmd::{gsp_get_capability_cmd, gsp_trigger_cmd};
use sprdmm::gsp::{BaseCfg, Capability, DriverConfig, BASE_CFG_SIZE, CAPABILITY_SIZE};
use sprdmm::{DeviceNode, Driver, GspFile, UserBuffer};

#[derive(Parser)]
#[command(name = "sprdmm")]
#[command(version = sprdmm::VERSION)]
#[command(about = "Drive the simulated Spreadtrum GSP device", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output verbosity
    #[arg(short, long, value_enum, default_value_t = Verbosity::Normal)]
    verbosity: Verbosity,
}

#[derive(clap::Args)]
struct NodeArgs {
    /// Compatible string of an embedded node
    #[arg(short, long, default_value = "sprd,gsp-r6p0-sharkl3")]
    compatible: String,

    /// Device node JSON file, overrides --compatible
    #[arg(short, long, env = "SPRDMM_NODE")]
    node: Option<String>,

    /// Timing preset
    #[arg(long, value_enum, default_value_t = Preset::Default)]
    preset: Preset,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported compatible strings
    Compatibles,

    /// Probe a device and print its capability
    Capability {
        #[command(flatten)]
        node: NodeArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Submit kcfgs through the trigger ioctl
    Trigger {
        #[command(flatten)]
        node: NodeArgs,

        /// Kcfgs per trigger
        #[arg(long, default_value_t = 1)]
        count: u32,

        /// Layers per kcfg
        #[arg(long, default_value_t = 1)]
        layers: u32,

        /// Number of triggers
        #[arg(long, default_value_t = 1)]
        repeat: u32,

        /// Spread kcfgs over all cores
        #[arg(long)]
        split: bool,

        /// Do not wait for completion
        #[arg(long = "async")]
        is_async: bool,
    },

    /// Trigger, suspend, resume and trigger again
    Cycle {
        #[command(flatten)]
        node: NodeArgs,

        /// Use the runtime PM callbacks instead of system sleep
        #[arg(long)]
        runtime: bool,
    },

    /// Print a JSON status snapshot
    Status {
        #[command(flatten)]
        node: NodeArgs,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Verbosity {
    Minimal,
    Normal,
    Detailed,
    Debug,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Preset {
    Default,
    Quick,
    Debug,
}

impl NodeArgs {
    fn probe(&self) -> Result<Driver> {
        let node = match &self.node {
            Some(path) => DeviceNode::load(path).with_context(|| format!("loading {}", path))?,
            None => sprdmm::builtin_node(&self.compatible)
                .with_context(|| format!("unknown compatible {}", self.compatible))?,
        };
        let config = match self.preset {
            Preset::Default => DriverConfig::default(),
            Preset::Quick => DriverConfig::quick(),
            Preset::Debug => DriverConfig::debug(),
        };
        Ok(Driver::probe(&node, config)?)
    }
}

fn init_logger(verbosity: Verbosity) {
    let level = match verbosity {
        Verbosity::Minimal => LevelFilter::Error,
        Verbosity::Normal => LevelFilter::Warn,
        Verbosity::Detailed => LevelFilter::Info,
        Verbosity::Debug => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn read_capability(file: &GspFile) -> Result<Capability> {
    let mut buf = UserBuffer::zeroed(CAPABILITY_SIZE);
    file.ioctl(gsp_get_capability_cmd(CAPABILITY_SIZE), &mut buf)?;
    Ok(Capability::from_bytes(buf.as_bytes())?)
}

fn kcfg_payload(count: u32, layers: u32, tag: u32) -> UserBuffer {
    let bytes: Vec<u8> = (0..count)
        .flat_map(|i| {
            BaseCfg { layer_num: layers, init: false, size: BASE_CFG_SIZE as u32, tag: tag + i }
                .to_bytes()
        })
        .collect();
    UserBuffer::from_bytes(&bytes)
}

fn trigger(
    file: &GspFile,
    count: u32,
    layers: u32,
    split: bool,
    is_async: bool,
    tag: u32,
) -> Result<()> {
    let mut payload = kcfg_payload(count, layers, tag);
    let cmd = gsp_trigger_cmd(is_async, split, count, BASE_CFG_SIZE);
    file.ioctl(cmd, &mut payload)
        .map_err(|e| anyhow!("trigger failed with {}: {}", e.errno(), e))?;
    Ok(())
}

fn print_capability_text(capa: &Capability) {
    println!("GSP Capability:");
    println!("===============");
    println!("Magic: 0x{:08x}", capa.magic);
    println!("Version: 0x{:04x}", capa.version);
    println!("Cores: {}", capa.core_cnt);
    println!("Kcfgs per trigger: {}", capa.io_cnt);
    println!("Layers: {} ({} video)", capa.max_layer, capa.max_video_layer);
    println!("Max output: {}x{}", capa.max_width, capa.max_height);
    println!("Scaling: up {}x, down 1/{}", capa.scale_up_max, capa.scale_down_max);
    println!("Rotation: {}", if capa.rotation { "yes" } else { "no" });
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbosity);

    match &cli.command {
        Commands::Compatibles => {
            for (compatible, ops) in sprdmm::gsp::GSP_DT_IDS {
                println!("{:<32} {}", compatible, ops.revision());
            }
        }

        Commands::Capability { node, format } => {
            let driver = node.probe()?;
            let capa = read_capability(&driver.open()?)?;
            match format {
                OutputFormat::Text => print_capability_text(&capa),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&capa)?),
            }
            driver.remove()?;
        }

        Commands::Trigger { node, count, layers, repeat, split, is_async } => {
            let driver = node.probe()?;
            let file = driver.open()?;
            let start = Instant::now();
            for round in 0..*repeat {
                trigger(&file, *count, *layers, *split, *is_async, round * *count)?;
            }
            println!(
                "{} trigger(s) of {} kcfg(s) in {:?}",
                repeat,
                count,
                start.elapsed()
            );
            println!("{}", serde_json::to_string_pretty(&driver.device().status())?);
            driver.remove()?;
        }

        Commands::Cycle { node, runtime } => {
            let driver = node.probe()?;
            let file = driver.open()?;
            trigger(&file, 1, 1, false, false, 0)?;
            if *runtime {
                driver.runtime_suspend()?;
            } else {
                driver.pm_suspend()?;
            }
            println!("suspended: {}", driver.device().is_suspend());

            if *runtime {
                // the trigger path resumes on demand
                trigger(&file, 1, 1, false, false, 1)?;
            } else {
                driver.pm_resume()?;
                trigger(&file, 1, 1, false, false, 1)?;
            }
            println!("resumed: {}", !driver.device().is_suspend());
            driver.remove()?;
        }

        Commands::Status { node } => {
            let driver = node.probe()?;
            println!("{}", serde_json::to_string_pretty(&driver.device().status())?);
            driver.remove()?;
        }

        Commands::Version => {
            println!("sprdmm v{}", sprdmm::version());
            println!("User-space Spreadtrum GSP / ISP driver model");
        }
    }

    Ok(())
}
