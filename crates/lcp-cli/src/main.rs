use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use lcp_core::{BuildEnv, BuildOptions, MissPolicy, ProjectLayout};
use std::path::PathBuf;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(
    name = "lcp",
    about = "Build, extract and verify LCP content packs",
    version
)]
struct Cli {
    /// Project root containing src/, templates/ and package.json
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Package src/ into build/{name}_{version}.lcp
    Build(BuildArgs),
    /// Unpack the JSON entries of an archive into src/
    Extract(ExtractArgs),
    /// Validate src/ against the JSON schemas
    Verify(VerifyArgs),
    /// Print the resolved name, version and archive file name
    Version(CiArgs),
}

#[derive(ClapArgs, Debug)]
struct CiArgs {
    /// CI mode; only the value "true" enables it
    #[arg(long = "ci", env = "CI", num_args = 0..=1, default_missing_value = "true")]
    ci: Option<String>,
    /// Build counter that replaces the patch version under CI
    #[arg(long, env = "GITHUB_RUN_NUMBER")]
    build_number: Option<String>,
}

impl CiArgs {
    fn env(&self) -> BuildEnv {
        BuildEnv::from_lookup(|key| match key {
            lcp_core::config::CI_VAR => self.ci.clone(),
            lcp_core::config::BUILD_COUNTER_VAR => self.build_number.clone(),
            _ => None,
        })
    }
}

#[derive(ClapArgs, Debug)]
struct BuildArgs {
    /// Run the templating step for operations in templates/template-map.json
    #[arg(long, visible_alias = "tmpl")]
    run_templates: bool,
    /// Fail the build when a replace makes no changes (always on under CI)
    #[arg(long, env = "LCP_STRICT_TEMPLATES")]
    strict_templates: bool,
    #[command(flatten)]
    ci: CiArgs,
}

#[derive(ClapArgs, Debug)]
struct ExtractArgs {
    /// Archive to unpack (defaults to the current build output)
    archive: Option<PathBuf>,
    #[command(flatten)]
    ci: CiArgs,
}

#[derive(ClapArgs, Debug)]
struct VerifyArgs {
    /// Schema directory (defaults to deps/vscode-comp-con-content-authoring/schemas)
    #[arg(long)]
    schemas: Option<PathBuf>,
}

fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    let layout = ProjectLayout::new(&cli.root);
    let res = match cli.cmd {
        Cmd::Build(a) => cmd_build(&layout, a),
        Cmd::Extract(a) => cmd_extract(&layout, a),
        Cmd::Verify(a) => cmd_verify(&layout, a),
        Cmd::Version(a) => cmd_version(&layout, a),
    };
    if let Err(e) = res {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn cmd_build(layout: &ProjectLayout, args: BuildArgs) -> Result<()> {
    let mut env = args.ci.env();
    if args.strict_templates {
        env = env.with_miss_policy(MissPolicy::Fail);
    }
    let opts = BuildOptions {
        run_templates: args.run_templates,
    };
    let out = lcp_core::build_project(layout, &env, &opts).context("build failed")?;
    info!(
        archive = %out.archive_path.display(),
        entries = out.entries,
        "done"
    );
    Ok(())
}

fn cmd_extract(layout: &ProjectLayout, args: ExtractArgs) -> Result<()> {
    let archive = match args.archive {
        Some(p) => p,
        None => {
            let version =
                lcp_core::version::resolve_from_metadata(&layout.metadata_path, &args.ci.env())
                    .context("resolving default archive path")?;
            layout.archive_path(&version.name, &version.version)
        }
    };
    info!(archive = %archive.display(), "using archive");
    let written = lcp_core::extract_file(&archive, &layout.source_dir)
        .with_context(|| format!("extracting {}", archive.display()))?;
    for name in &written {
        info!(file = %name, "written");
    }
    info!("done");
    Ok(())
}

fn cmd_verify(layout: &ProjectLayout, args: VerifyArgs) -> Result<()> {
    let schema_dir = args.schemas.unwrap_or_else(|| layout.schema_dir.clone());
    let report = lcp_core::verify_dir(&layout.source_dir, &schema_dir).with_context(|| {
        format!(
            "verifying {} (did you forget to run 'git submodule init'?)",
            layout.source_dir.display()
        )
    })?;
    info!(
        valid = report.valid.len(),
        skipped = report.skipped.len(),
        "done"
    );
    Ok(())
}

fn cmd_version(layout: &ProjectLayout, args: CiArgs) -> Result<()> {
    let version = lcp_core::version::resolve_from_metadata(&layout.metadata_path, &args.env())
        .context("resolving version")?;
    println!("{}\t{}", version, version.archive_filename());
    Ok(())
}
