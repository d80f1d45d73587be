use clap::Parser;
use mongo_harness::ExitReporter;
use mongo_harness::ReplicaSet;
use mongo_harness::Result;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Starts a throwaway mongod replica set and keeps it up until interrupted.
#[derive(Parser, Debug)]
#[command(name = "mongo-harness", version, about)]
struct Cli {
    /// Number of replica set members
    #[arg(short = 'n', long = "nodes", default_value_t = 3)]
    nodes: usize,
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut set = ReplicaSet::new(cli.nodes, ExitReporter::shared()).await;
    for addr in set.addrs() {
        println!("{addr}");
    }
    println!("{}", set.uri());

    info!("Replica set started. Waiting for CTRL+C signal...");
    wait_for_shutdown().await?;

    set.stop().await;
    println!("Exiting program.");
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }
    info!("Stopping replica set..");
    Ok(())
}
