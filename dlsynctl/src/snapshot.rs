use std::io::Write;

use anyhow::Context;
use camino::Utf8PathBuf;
use dlsync::{cache::SnapshotCache, snapshot::SnapshotBuilder, storage::DirEntries, Snapshot};

use crate::utils;

#[derive(clap::Args)]
pub struct Args {
    /// Name of the instance
    instance_name: Option<String>,

    /// Capture the local directory
    #[clap(long, conflicts_with = "remote", required_unless_present = "remote")]
    local: bool,

    /// Capture the remote store folder
    #[clap(long)]
    remote: bool,

    /// File to write the snapshot to (stdout if not specified)
    #[clap(long, short = 'o')]
    output: Option<Utf8PathBuf>,
}

pub async fn main(args: Args) -> anyhow::Result<()> {
    let instance_name = utils::instance_name(args.instance_name)?;
    let config = utils::load_config(&instance_name).await?;
    let ignore = config.ignore_patterns()?;

    let snapshot = if args.local {
        let local = utils::local_storage(&config)?;
        capture(&local, &ignore).await?
    } else {
        let remote = utils::remote_storage(&config)?;
        capture(&remote, &ignore).await?
    };

    match args.output {
        Some(output) => SnapshotCache::new(output).save(&snapshot).await?,
        None => {
            let json = serde_json::to_string_pretty(&snapshot)?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

async fn capture<S>(storage: &S, ignore: &dlsync::config::PatternList) -> anyhow::Result<Snapshot>
where
    S: DirEntries + Sync,
{
    SnapshotBuilder::new(storage)
        .ignore(ignore)
        .build()
        .await
        .with_context(|| format!("Failed to capture {}", storage.root()))
}
