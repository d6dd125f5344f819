#![expect(
    clippy::multiple_crate_versions,
    reason = "transitive dependency duplication"
)]

use clap::{Args, Parser, Subcommand};
use eyre::Context as _;
use tracing_subscriber::prelude::*;

mod amm;
mod amount;
mod balances;
mod cli_output;
mod commands;
mod config;
mod doctor;
mod engine;
mod errors;
mod node;
mod package;
mod pair;
mod paths;
mod quote;
mod registry;

#[derive(Parser, Debug)]
#[command(name = "swapdeck", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct RpcArgs {
    /// JSON-RPC endpoint (http(s) or ws(s)); defaults to the active entry in config.json.
    #[arg(long)]
    rpc: Option<String>,

    /// Emit JSON to stdout (machine-readable).
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show native and watched token balances for an address.
    Balances {
        /// Address to inspect; defaults to the active wallet in config.json.
        #[arg(long)]
        address: Option<String>,

        #[command(flatten)]
        common: RpcArgs,
    },

    /// Quote a swap against the Uniswap V2 pool for the pair.
    Quote {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        /// Exact input amount (forward quote).
        #[arg(long, conflicts_with = "amount_out", required_unless_present = "amount_out")]
        amount_in: Option<String>,

        /// Desired output amount (reverse quote).
        #[arg(long)]
        amount_out: Option<String>,

        #[command(flatten)]
        common: RpcArgs,
    },

    /// Build an unsigned transaction descriptor for out-of-band signing.
    Package {
        #[command(subcommand)]
        cmd: PackageCommand,
    },

    /// Print resolved paths (useful for debugging).
    Paths,

    /// Print a quick self-diagnostic report.
    Doctor {
        /// Emit JSON to stdout (machine-readable).
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum PackageCommand {
    /// Native transfer as an EIP-681 URI.
    Transfer {
        #[arg(long)]
        to: String,

        /// Amount in ETH, e.g. `0.25`.
        #[arg(long)]
        amount: String,

        /// Sender; defaults to the active wallet in config.json.
        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        chain_id: Option<u64>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Router swap as a readable JSON description.
    Swap {
        #[arg(long)]
        from_token: String,

        #[arg(long)]
        to_token: String,

        #[arg(long)]
        amount_in: String,

        /// Minimum acceptable output, in the destination token's units.
        #[arg(long)]
        min_out: String,

        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        chain_id: Option<u64>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn init_logging(
    paths: &paths::SwapdeckPaths,
    to_file: bool,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let stderr_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_filter(env_filter.clone());

    let (file_layer, guard) = if to_file {
        let file_name = paths
            .log_file
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(paths::LOG_FILE_NAME);
        let file_appender = tracing_appender::rolling::never(&paths.data_dir, file_name);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_filter(env_filter);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let paths = paths::SwapdeckPaths::discover()?;
    let cfg = config::SwapdeckConfig::load(&paths.config_file());
    let logger = cfg.as_ref().is_ok_and(|c| c.logger);
    if logger {
        paths.ensure_data_dir()?;
    }
    let _log_guard = init_logging(&paths, logger);

    match cli.cmd {
        Command::Paths => {
            let s = serde_json::to_string(&serde_json::json!({
              "config_dir": paths.config_dir,
              "data_dir": paths.data_dir,
              "config_file": paths.config_file(),
              "log_file": paths.log_file,
            }))
            .context("serialize paths")?;
            cli_output::stdout_writeln(&s)
        }
        Command::Doctor { json } => doctor::run(json).await.context("doctor failed"),
        Command::Balances { address, common } => {
            let cfg = cfg?;
            commands::balances(
                &cfg,
                address.as_deref(),
                common.rpc.as_deref(),
                common.json,
            )
            .await
        }
        Command::Quote {
            from,
            to,
            amount_in,
            amount_out,
            common,
        } => {
            let cfg = cfg?;
            let amount = match (amount_in.as_deref(), amount_out.as_deref()) {
                (Some(a), _) => commands::QuoteAmount::In(a),
                (None, Some(a)) => commands::QuoteAmount::Out(a),
                (None, None) => eyre::bail!("pass --amount-in or --amount-out"),
            };
            commands::quote(&cfg, &from, &to, amount, common.rpc.as_deref(), common.json).await
        }
        Command::Package { cmd } => {
            let cfg = cfg?;
            match cmd {
                PackageCommand::Transfer {
                    to,
                    amount,
                    from,
                    chain_id,
                    json,
                } => {
                    commands::transfer(&cfg, from.as_deref(), &to, &amount, chain_id, json).await
                }
                PackageCommand::Swap {
                    from_token,
                    to_token,
                    amount_in,
                    min_out,
                    from,
                    chain_id,
                    json,
                } => commands::swap(
                    &cfg,
                    &commands::SwapArgs {
                        from: from.as_deref(),
                        from_token: &from_token,
                        to_token: &to_token,
                        amount_in: &amount_in,
                        min_out: &min_out,
                        chain_id,
                    },
                    json,
                )
                .await,
            }
        }
    }
}
