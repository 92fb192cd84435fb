use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use kiln_artifact::MemoryStore;
use kiln_bundle::{ApplyOutcome, ChangeBundle, ChangeBundleApplier};
use kiln_core::KilnConfig;
use kiln_verify::VerificationCoordinator;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use walkdir::{DirEntry, WalkDir};

const SKIPPED_DIRS: &[&str] = &["target", "node_modules"];

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Command::new("kiln")
        .version(kiln_core::VERSION)
        .about("Apply and verify change bundles against a source tree")
        .arg_required_else_help(true)
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("parse")
                .about("Parse a change bundle and print its entries as JSON")
                .arg(
                    Arg::new("bundle")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Bundle file"),
                ),
        )
        .subcommand(
            Command::new("apply")
                .about("Apply a change bundle to a directory loaded in memory")
                .arg(
                    Arg::new("root")
                        .long("root")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory to load"),
                )
                .arg(
                    Arg::new("bundle")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Bundle file"),
                )
                .arg(
                    Arg::new("verify")
                        .long("verify")
                        .help("Verification command, e.g. full or lint:src/ui/theme.js"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("write")
                        .long("write")
                        .action(ArgAction::SetTrue)
                        .help("Write the result back to the directory on success"),
                ),
        );

    let matches = cli.get_matches();
    init_tracing(matches.get_flag("json-logs"));

    match matches.subcommand() {
        Some(("parse", args)) => parse(args).map(|()| ExitCode::SUCCESS),
        Some(("apply", args)) => apply(args).await,
        _ => Ok(ExitCode::SUCCESS),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn parse(args: &ArgMatches) -> Result<()> {
    let Some(path) = args.get_one::<PathBuf>("bundle") else {
        bail!("missing bundle path");
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let bundle = ChangeBundle::parse(&text)?;
    if bundle.skipped() > 0 {
        tracing::warn!(skipped = bundle.skipped(), "blocks without a path were skipped");
    }
    println!("{}", serde_json::to_string_pretty(bundle.entries())?);
    Ok(())
}

async fn apply(args: &ArgMatches) -> Result<ExitCode> {
    let (Some(root), Some(bundle_path)) = (
        args.get_one::<PathBuf>("root"),
        args.get_one::<PathBuf>("bundle"),
    ) else {
        bail!("missing --root or bundle path");
    };
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => KilnConfig::load(path)?,
        None => KilnConfig::new(),
    };
    let verify = args
        .get_one::<String>("verify")
        .cloned()
        .or_else(|| config.cycle.verify_command.clone());

    let outcome = apply_to_tree(
        root,
        bundle_path,
        verify.as_deref(),
        &config,
        args.get_flag("write"),
    )
    .await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(exit_code(&outcome))
}

/// Apply `bundle_path` to an in-memory copy of `root`
///
/// With `write`, a successful result is written back to `root`.
async fn apply_to_tree(
    root: &Path,
    bundle_path: &Path,
    verify: Option<&str>,
    config: &KilnConfig,
    write: bool,
) -> Result<ApplyOutcome> {
    let before = load_tree(root)?;
    tracing::info!(root = %root.display(), files = before.len(), "tree loaded");
    let store = Arc::new(MemoryStore::with_files(before.clone()));

    let verifier = Arc::new(VerificationCoordinator::with_snapshot_worker(
        store.clone(),
        config.verification.clone(),
    ));
    verifier.init().await?;
    let applier = ChangeBundleApplier::new(store.clone()).with_verifier(verifier.clone());

    let text = std::fs::read_to_string(bundle_path)
        .with_context(|| format!("reading {}", bundle_path.display()))?;
    let source = bundle_path.to_string_lossy();
    let result = applier.apply_text(&source, &text, verify).await;
    verifier.terminate();

    let outcome = result?;
    if write && outcome.success {
        write_back(root, &before, &store.files())?;
    }
    Ok(outcome)
}

fn exit_code(outcome: &ApplyOutcome) -> ExitCode {
    if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Load every UTF-8 file under `root`, keyed by `/`-separated relative path
fn load_tree(root: &Path) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped(e));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root)?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        match std::fs::read_to_string(entry.path()) {
            Ok(content) => {
                files.insert(key, content);
            }
            Err(e) => tracing::debug!(path = %key, error = %e, "skipping unreadable file"),
        }
    }
    Ok(files)
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && SKIPPED_DIRS.iter().any(|d| name == *d))
}

fn write_back(
    root: &Path,
    before: &BTreeMap<String, String>,
    after: &BTreeMap<String, String>,
) -> Result<()> {
    for (path, content) in after {
        if before.get(path) == Some(content) {
            continue;
        }
        let target = root.join(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, content).with_context(|| format!("writing {path}"))?;
        tracing::info!(%path, "written");
    }
    for path in before.keys().filter(|p| !after.contains_key(*p)) {
        std::fs::remove_file(root.join(path)).with_context(|| format!("removing {path}"))?;
        tracing::info!(%path, "removed");
    }
    Ok(())
}
