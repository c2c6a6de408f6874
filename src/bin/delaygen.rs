//! Delay routine generator binary.
//!
//! Prints an assembler listing lasting between `--min` and `--max` cycles,
//! followed by the achieved cycle count. Set `RUST_LOG=debug` to follow the
//! search.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use delaygen::{
    DelayFunctionBuilder, DelayRequest, InstructionCatalog, Resource, SynthesisConfig,
    TargetRegistry,
};

#[derive(Debug, Parser)]
#[command(name = "delaygen", version, about = "Synthesize cycle-exact delay routines")]
struct Cli {
    /// Shortest acceptable duration in cycles
    #[arg(long)]
    min: i64,

    /// Longest acceptable duration in cycles (defaults to --min)
    #[arg(long)]
    max: Option<i64>,

    /// Instruction budget, return instruction included
    #[arg(short, long, default_value_t = 10)]
    budget: u32,

    /// Registers the routine may change, e.g. ABC
    #[arg(short, long, default_value = "")]
    registers: String,

    /// Memory address the routine may use (repeatable)
    #[arg(short, long = "memory", value_name = "ADDRESS")]
    memory: Vec<String>,

    /// Allow the routine to use the stack
    #[arg(short, long)]
    stack: bool,

    /// Target architecture
    #[arg(short, long, default_value = "8085")]
    target: String,

    /// Instruction catalog to use instead of the bundled one
    #[arg(short, long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Omit the return instruction
    #[arg(long)]
    no_return: bool,

    /// Print search statistics to stderr
    #[arg(long)]
    stats: bool,

    /// Estimated flat instruction count above which a register is spilled
    #[arg(long)]
    spill_threshold: Option<u64>,

    /// Budget increments tried before giving up
    #[arg(long)]
    budget_retries: Option<u32>,

    /// Ceiling on search steps
    #[arg(long)]
    step_limit: Option<u64>,

    /// List the catalog and exit
    #[arg(long)]
    list_catalog: bool,
}

impl Cli {
    fn resources(&self) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self
            .registers
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .map(|c| Resource::register(c.to_ascii_uppercase().to_string()))
            .collect();
        resources.extend(self.memory.iter().map(Resource::memory));
        if self.stack {
            resources.push(Resource::stack());
        }
        resources
    }

    fn config(&self) -> SynthesisConfig {
        let defaults = SynthesisConfig::default();
        SynthesisConfig {
            spill_threshold: self.spill_threshold.unwrap_or(defaults.spill_threshold),
            budget_retries: self.budget_retries.unwrap_or(defaults.budget_retries),
            step_limit: self.step_limit.unwrap_or(defaults.step_limit),
        }
    }
}

fn run(cli: &Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let registry = TargetRegistry::with_builtin();
    let target = registry.get(&cli.target)?;
    let catalog = match &cli.catalog {
        Some(path) => InstructionCatalog::from_path(path)?,
        None => InstructionCatalog::parse(target.bundled_catalog())?,
    };

    if cli.list_catalog {
        print!("{}", catalog.describe());
        return Ok(true);
    }

    let mut request = DelayRequest::new(
        cli.min,
        cli.max.unwrap_or(cli.min),
        cli.resources(),
        cli.budget,
    );
    if cli.no_return {
        request = request.without_return();
    }

    let builder = DelayFunctionBuilder::new(&catalog, target).with_config(cli.config());
    let (routine, stats) = builder.build_with_stats(&request)?;
    if cli.stats {
        eprint!("{}", stats);
    }

    match routine {
        Some(routine) => {
            print!("{}", routine);
            println!("; {} cycles, {} instructions", routine.duration(), routine.length());
            Ok(true)
        }
        None => {
            eprintln!(
                "No routine lasts between {} and {} cycles with the given resources",
                request.min, request.max
            );
            Ok(false)
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
