//! CLI surface for modpipe.
//!
//! Three thin commands over the library: `run` drives a backlog through the
//! pipeline, `generate` writes case files, `exp` checks a single value
//! against the reference. Handlers gather data; `render` owns all human
//! formatting, and `--json` serializes the same data instead.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;

use crate::Result;
use crate::arith::reference_pow;
use crate::config::Profile;
use crate::pipeline::{self, StageUnit};
use crate::schedule::KeySchedule;
use crate::source;
use crate::timing::CycleModel;

mod render;

/// Profile file picked up from the working directory when `--profile` is
/// not given.
pub const DEFAULT_PROFILE_FILE: &str = "modpipe.toml";

/// Exit code for a run that completed but disagrees with the reference.
const MISMATCH_EXIT: u8 = 2;

// =============================================================================
// Entry + global options
// =============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "modpipe",
    version,
    about = "Pipelined modular-exponentiation bench model",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Machine-readable JSON output.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Run profile TOML (default: ./modpipe.toml when present).
    #[arg(long, global = true, value_name = "PATH")]
    pub profile: Option<PathBuf>,

    /// Debug output (repeat for more).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a backlog through the pipeline and report correctness.
    Run(RunArgs),

    /// Write a case file of random work items.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Slice-exponentiate one value and compare it to the reference.
    Exp(ExpArgs),
}

// =============================================================================
// Per-command args
// =============================================================================

/// Key material and pipeline shape; unset flags keep the profile values.
#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Public exponent e.
    #[arg(short = 'e', long)]
    pub exponent: Option<u64>,

    /// Modulus n.
    #[arg(short = 'n', long)]
    pub modulus: Option<u64>,

    /// Pipeline depth (number of exponent slices).
    #[arg(short = 's', long)]
    pub stages: Option<u32>,

    /// Exponent register width in bits.
    #[arg(short = 'w', long)]
    pub width: Option<u32>,

    /// Target clock in Hz for the latency projection.
    #[arg(long, value_name = "HZ")]
    pub clock_hz: Option<u64>,
}

impl KeyArgs {
    /// Fold explicit flags over the profile.
    fn apply(&self, profile: &mut Profile) {
        if let Some(exponent) = self.exponent {
            profile.exponent = exponent;
        }
        if let Some(modulus) = self.modulus {
            profile.modulus = modulus;
        }
        if let Some(stages) = self.stages {
            profile.stages = stages;
        }
        if let Some(width) = self.width {
            profile.width = width;
        }
        if let Some(clock_hz) = self.clock_hz {
            profile.clock_hz = clock_hz;
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Case file to run (`M,ID` records). Omit to generate a backlog.
    #[arg(long, value_name = "PATH")]
    pub cases: Option<PathBuf>,

    /// Number of cases to generate when no case file is given.
    #[arg(long, default_value_t = 50, conflicts_with = "cases")]
    pub count: usize,

    /// Smallest generated message value.
    #[arg(long, default_value_t = 100, conflicts_with = "cases")]
    pub min: u64,

    /// Largest generated message value.
    #[arg(long, default_value_t = 200, conflicts_with = "cases")]
    pub max: u64,

    /// Seed for the generated backlog (default: drawn from the OS).
    #[arg(long, conflicts_with = "cases")]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub key: KeyArgs,

    /// Print the per-item stage progression table.
    #[arg(long)]
    pub timeline: bool,

    /// Print the projected hardware latency.
    #[arg(long)]
    pub estimate: bool,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Where to write the case file.
    #[arg(value_name = "PATH")]
    pub out: PathBuf,

    /// Number of cases.
    #[arg(long, default_value_t = 50)]
    pub count: usize,

    /// Smallest message value.
    #[arg(long, default_value_t = 100)]
    pub min: u64,

    /// Largest message value.
    #[arg(long, default_value_t = 200)]
    pub max: u64,

    /// Seed for reproducible files (default: drawn from the OS).
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ExpArgs {
    /// Message value M.
    #[arg(value_name = "M")]
    pub message: u64,

    #[command(flatten)]
    pub key: KeyArgs,
}

// =============================================================================
// Public API
// =============================================================================

/// Parse CLI from raw args (used by bin and the CLI tests).
pub fn parse_from<I, T>(args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::parse_from(args)
}

/// Run the CLI (used by bin).
pub fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Run(args) => {
            let mut profile = resolve_profile(cli.profile.as_deref())?;
            args.key.apply(&mut profile);
            handle_run(profile, args, cli.json)
        }
        Commands::Generate(args) => handle_generate(args, cli.json),
        Commands::Exp(args) => {
            let mut profile = resolve_profile(cli.profile.as_deref())?;
            args.key.apply(&mut profile);
            handle_exp(profile, args, cli.json)
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

fn handle_run(profile: Profile, args: RunArgs, json: bool) -> Result<ExitCode> {
    let schedule = profile.schedule()?;
    let backlog = match &args.cases {
        Some(path) => source::load_cases(path)?,
        None => source::generate_cases(args.count, args.min..=args.max, args.seed)?,
    };
    let item_count = backlog.len();

    let outcome = pipeline::run(&schedule, backlog)?;
    let projection = args
        .estimate
        .then(|| CycleModel::new(profile.clock_hz).project(&schedule, item_count));

    if json {
        let mut body = serde_json::json!({ "report": &outcome.report });
        if args.timeline {
            body["trace"] = serde_json::to_value(&outcome.trace)?;
        }
        if let Some(projection) = &projection {
            body["projection"] = serde_json::to_value(projection)?;
        }
        emit(&serde_json::to_string_pretty(&body)?)?;
    } else {
        let mut out = String::new();
        if args.timeline {
            out.push_str(&render::render_timeline(&outcome.trace, schedule.stage_count()));
            out.push_str("\n\n");
        }
        out.push_str(&render::render_report(&outcome.report));
        if let Some(projection) = &projection {
            out.push_str("\n\n");
            out.push_str(&render::render_projection(projection));
        }
        emit(&out)?;
    }

    if outcome.report.all_matched() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(MISMATCH_EXIT))
    }
}

fn handle_generate(args: GenerateArgs, json: bool) -> Result<ExitCode> {
    let items = source::generate_cases(args.count, args.min..=args.max, args.seed)?;
    source::write_cases(&args.out, &items)?;

    if json {
        emit(&serde_json::to_string_pretty(&serde_json::json!({
            "path": args.out,
            "count": items.len(),
        }))?)?;
    } else {
        emit(&render::render_generated(&args.out, items.len()))?;
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_exp(profile: Profile, args: ExpArgs, json: bool) -> Result<ExitCode> {
    let schedule = profile.schedule()?;
    let sliced = sliced_exp(&schedule, args.message)?;
    let expected = reference_pow(args.message, schedule.exponent(), schedule.modulus());
    let matched = sliced == expected;

    if json {
        emit(&serde_json::to_string_pretty(&serde_json::json!({
            "message": args.message,
            "exponent": schedule.exponent(),
            "modulus": schedule.modulus(),
            "stages": schedule.stage_count(),
            "width": schedule.width(),
            "sliced": sliced,
            "reference": expected,
            "matched": matched,
        }))?)?;
    } else {
        emit(&render::render_exp(args.message, &schedule, sliced, expected))?;
    }

    if matched {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(MISMATCH_EXIT))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Chain the stage units over one message on the calling thread, the same
/// slice walk the pipeline performs per item.
fn sliced_exp(schedule: &KeySchedule, message: u64) -> Result<u64> {
    let mut acc = 1;
    let mut base = message % schedule.modulus();
    for (i, &slice) in schedule.slices().iter().enumerate() {
        let stage = StageUnit::new(i as u32 + 1, slice, schedule.slice_width(), schedule.modulus())?;
        (acc, base) = stage.apply(acc, base);
    }
    Ok(acc)
}

fn resolve_profile(path: Option<&Path>) -> Result<Profile> {
    match path {
        Some(path) => Ok(Profile::load(path)?),
        None => {
            let fallback = Path::new(DEFAULT_PROFILE_FILE);
            if fallback.exists() {
                debug!(path = %fallback.display(), "profile picked up from the working directory");
                Ok(Profile::load(fallback)?)
            } else {
                debug!("no {DEFAULT_PROFILE_FILE} here, using the built-in profile");
                Ok(Profile::default())
            }
        }
    }
}

fn emit(s: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{s}")
        && e.kind() != std::io::ErrorKind::BrokenPipe
    {
        return Err(e.into());
    }
    Ok(())
}
