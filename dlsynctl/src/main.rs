use std::process::ExitCode;

use clap::Parser;

mod new;
mod snapshot;
mod sync;
mod utils;

#[derive(Parser)]
#[command(name = "dlsynctl")]
#[command(author, version, about, long_about=None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create a new synchronization instance
    New(new::Args),
    /// Capture the local or remote tree of an instance
    Snapshot(snapshot::Args),
    /// Compare both sides of an instance and transfer the differences
    Sync(sync::Args),
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let res = match cli.command {
        Commands::New(args) => new::main(args),
        Commands::Snapshot(args) => run(snapshot::main(args)),
        Commands::Sync(args) => run(sync::main(args)),
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::debug!("{err:?}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run<F>(fut: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = anyhow::Result<()>>,
{
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(fut)
}
