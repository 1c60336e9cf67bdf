//! killtrack: chat-driven boss kill count and pet drop tracker.
//! Single-process binary: poll loop, record store and report commands.

use clap::Parser;

mod cli;
mod cmd_export;
mod cmd_show;
mod poll_loop;
mod status;

fn init_tracing() {
    let filter = std::env::var("KILLTRACK_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    init_tracing();

    let store_path = args.store.unwrap_or_else(cli::default_store_path);
    let command = args.command.unwrap_or(cli::Command::Show);

    match command {
        cli::Command::Run(opts) => {
            tracing::info!("killtrack starting");
            poll_loop::run_tracker(opts, &store_path).await?;
        }
        cli::Command::Show => {
            cmd_show::cmd_show(&store_path);
        }
        cli::Command::Export(opts) => {
            cmd_export::cmd_export(&store_path, &opts)?;
        }
        cli::Command::Clear => {
            let mut pipeline =
                killtrack_core::Pipeline::new(killtrack_core::JsonFileStore::new(&store_path));
            pipeline.clear_all().map_err(|e| {
                anyhow::anyhow!("failed to clear {}: {e}", store_path.display())
            })?;
            let status = status::Status::Cleared;
            tracing::info!(path = %store_path.display(), "{status}");
            println!("{status}");
        }
    }

    Ok(())
}
