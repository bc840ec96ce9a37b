use anyhow::Context;
use dlsync::{
    cache::{self, CachePolicy, SnapshotCache},
    diff::DiffEngine,
    loc::inst,
    normalize::Normalizer,
    report::{self, Report},
    snapshot::SnapshotBuilder,
    storage::DirEntries,
    transfer::{self, TransferPlan},
};
use inquire::Text;

use crate::utils;

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Name of the instance
    instance_name: Option<String>,

    /// Use the cached remote snapshot instead of listing the store
    #[clap(long, short = 'c')]
    cached: bool,

    /// Do not ask for confirmation
    #[clap(long, short = 'y')]
    yes: bool,

    /// Dry run only collects and prints the operations
    /// that would be performed on a regular run.
    #[clap(long, short = 'd')]
    dry_run: bool,
}

pub async fn main(args: Args) -> anyhow::Result<()> {
    let instance_name = utils::instance_name(args.instance_name.clone())?;
    let config = utils::load_config(&instance_name).await?;
    let ignore = config.ignore_patterns()?;

    let local = utils::local_storage(&config)?;
    let remote = utils::remote_storage(&config)?;

    let local_snapshot = SnapshotBuilder::new(&local)
        .ignore(&ignore)
        .build()
        .await
        .context("Failed to capture the local directory")?;

    let remote_cache = SnapshotCache::new(inst::remote_cache_file(&instance_name)?);
    let policy = if args.cached {
        CachePolicy::PreferCache
    } else {
        CachePolicy::Refresh
    };
    let remote_snapshot = cache::snapshot(&remote, &ignore, &remote_cache, policy)
        .await
        .context("Failed to capture the remote store")?;

    let local_tree = Normalizer::local(config.case_sensitive).normalize(&local_snapshot)?;
    let remote_tree =
        Normalizer::remote(remote.root(), config.case_sensitive).normalize(&remote_snapshot)?;

    let actions = DiffEngine::new()
        .with_mtime_tolerance(config.mtime_tolerance())
        .diff(&local_tree, &remote_tree)?;

    let report = Report::new(&actions);
    report::save_action_list(&actions, &inst::action_list_file(&instance_name)?).await?;
    println!();
    report.print_out();

    if report.is_empty() {
        println!("Everything is up to date.");
        return Ok(());
    }
    if args.dry_run {
        println!("DRY RUN: nothing changed");
        return Ok(());
    }

    if !args.yes {
        let question = format!(
            "Are you sure you want these {} files to be changed?",
            report.len()
        );
        let answer = Text::new(&question).prompt()?;
        if !accepts(&answer) {
            println!("Aborted.");
            return Ok(());
        }
    }

    let plan = TransferPlan::new(&actions, local.root_dir(), remote.root());
    let stats = transfer::execute(&plan, &transfer::DryRun).await?;
    println!(
        "{} files uploaded, {} files downloaded ({:#.2})",
        stats.uploaded,
        stats.downloaded,
        report::adjusted_byte(stats.bytes)
    );

    let remote_state = SnapshotBuilder::new(&remote).ignore(&ignore).build().await?;
    SnapshotCache::new(inst::remote_state_file(&instance_name)?)
        .save(&remote_state)
        .await?;
    remote_cache.save(&remote_state).await?;

    let local_state = SnapshotBuilder::new(&local).ignore(&ignore).build().await?;
    SnapshotCache::new(inst::local_state_file(&instance_name)?)
        .save(&local_state)
        .await?;

    println!("Sync complete!");
    Ok(())
}

/// Whether a confirmation answer is positive
fn accepts(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "yes" | "y")
}
