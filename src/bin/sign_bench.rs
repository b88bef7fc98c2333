use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use log::{error, info};
use sign_bench::dataset::{write_run_meta, OutputLayout};
use sign_bench::fixture::ensure_keypair;
use sign_bench::harness::{BenchRng, BenchmarkPlan, PlanOverrides, Profile};
use sign_bench::pipeline;
use sign_bench::schema::{RunMeta, ToolMeta};
use sign_bench::signer::{ArgStyle, ProcessKeyGenerator, ProcessSigner};
use sign_bench::Result;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Quick,
    Full,
}

impl From<ProfileArg> for Profile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Quick => Profile::Quick,
            ProfileArg::Full => Profile::Full,
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
struct PlanArgs {
    /// JSON file with any of `sizes`, `reps`, `iters`, `warmup`; overrides the profile.
    #[arg(long, value_name = "FILE")]
    plan: Option<PathBuf>,

    /// Payload sizes in bytes, swept in the given order.
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    sizes: Option<Vec<u64>>,

    /// Timed runs per size.
    #[arg(long)]
    reps: Option<u32>,

    /// Signing calls per timed run.
    #[arg(long)]
    iters: Option<u32>,

    /// One untimed signing call per size before the timed runs.
    #[arg(long, conflicts_with = "no_warmup")]
    warmup: bool,

    #[arg(long)]
    no_warmup: bool,
}

impl PlanArgs {
    fn overrides(&self) -> PlanOverrides {
        let warmup = match (self.warmup, self.no_warmup) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        PlanOverrides {
            sizes: self.sizes.clone(),
            reps: self.reps,
            iters: self.iters,
            warmup,
        }
    }

    fn resolve(&self, profile: Profile) -> Result<BenchmarkPlan> {
        let from_file = match &self.plan {
            Some(path) => PlanOverrides::from_file(path)?,
            None => PlanOverrides::default(),
        };
        let plan = profile
            .plan()
            .with_overrides(from_file.merge(self.overrides()));
        plan.validate()?;
        Ok(plan)
    }
}

#[derive(ClapArgs, Debug, Clone)]
struct ToolArgs {
    /// Signing executable.
    #[arg(long, value_name = "PATH", default_value = "./tools/sign_fw_c")]
    signer: PathBuf,

    /// Key-generation executable; only run when a key file is missing.
    #[arg(long, value_name = "PATH", default_value = "./tools/gen_keys_c")]
    keygen: PathBuf,

    /// Argument convention of the signing executable.
    #[arg(long, value_enum, default_value_t = ArgStyle::Flags)]
    arg_style: ArgStyle,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Time, aggregate and plot.
    Run {
        #[command(flatten)]
        plan: PlanArgs,
        #[command(flatten)]
        tools: ToolArgs,
    },

    /// Time only: write the raw dataset.
    Time {
        #[command(flatten)]
        plan: PlanArgs,
        #[command(flatten)]
        tools: ToolArgs,
    },

    /// Rebuild the summary dataset from the raw dataset.
    Aggregate,

    /// Redraw the plots from the summary dataset.
    Plot,

    /// Print the resolved plan as JSON.
    ShowPlan {
        #[command(flatten)]
        plan: PlanArgs,
    },
}

#[derive(Parser, Debug)]
#[command(name = "sign-bench")]
#[command(about = "Payload-size sweep benchmark for an external signing tool")]
struct Args {
    #[arg(long, value_enum, default_value_t = ProfileArg::Quick, global = true)]
    profile: ProfileArg,

    /// Seed for signer versions and payload bytes. Drawn at random if omitted.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Directory for keys, payloads, datasets and plots.
    #[arg(long, value_name = "DIR", default_value = "out", global = true)]
    out_dir: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

fn now_utc() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("unix:{secs}")
}

fn git_sha_short() -> Option<String> {
    std::env::var("GIT_SHA")
        .ok()
        .or_else(|| std::env::var("GITHUB_SHA").ok())
        .map(|s| s.chars().take(12).collect())
}

fn time(
    args: &Args,
    layout: &OutputLayout,
    plan: &BenchmarkPlan,
    tools: &ToolArgs,
) -> Result<()> {
    let profile: Profile = args.profile.into();
    layout.ensure()?;

    let mut keygen = ProcessKeyGenerator::new(&tools.keygen);
    let keys = ensure_keypair(layout, &mut keygen)?;

    let mut rng = match args.seed {
        Some(seed) => BenchRng::new(seed),
        None => BenchRng::from_thread_rng(),
    };
    info!(
        "profile={} seed={} sizes={} reps={} iters={} warmup={}",
        profile.as_str(),
        rng.seed(),
        plan.sizes.len(),
        plan.reps,
        plan.iters,
        plan.warmup
    );

    let meta = RunMeta {
        schema_version: 1,
        bench_version: env!("CARGO_PKG_VERSION").to_string(),
        profile: profile.as_str().to_string(),
        seed: rng.seed(),
        timestamp_utc: now_utc(),
        git_sha: git_sha_short(),
        plan: plan.clone(),
        tools: Some(ToolMeta {
            signer: tools.signer.display().to_string(),
            keygen: tools.keygen.display().to_string(),
            arg_style: tools.arg_style.as_str().to_string(),
            public_key_sha256: keys.fingerprint()?,
        }),
    };
    write_run_meta(&layout.run_meta(), &meta)?;

    let mut signer = ProcessSigner::new(
        &tools.signer,
        &keys.public_key,
        &keys.secret_key,
        tools.arg_style,
    );
    pipeline::run_timing(plan, layout, &mut rng, &mut signer)?;
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let layout = OutputLayout::new(&args.out_dir);
    let profile: Profile = args.profile.into();

    match &args.cmd {
        Command::Run { plan, tools } => {
            let plan = plan.resolve(profile)?;
            time(args, &layout, &plan, tools)?;
            let rows = pipeline::run_aggregate(&layout)?;
            pipeline::run_plots(&layout, &rows)?;
        }
        Command::Time { plan, tools } => {
            let plan = plan.resolve(profile)?;
            time(args, &layout, &plan, tools)?;
        }
        Command::Aggregate => {
            pipeline::run_aggregate(&layout)?;
        }
        Command::Plot => pipeline::run_plots_from_summary(&layout)?,
        Command::ShowPlan { plan } => {
            let plan = plan.resolve(profile)?;
            let json = serde_json::to_string_pretty(&plan)
                .map_err(|e| sign_bench::BenchError::Plan(e.to_string()))?;
            println!("{json}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
