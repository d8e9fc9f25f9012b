//! cardano-healthcheck entry point
//!
//! Exits with 0 when the node is healthy and non-zero otherwise.

use cardano_healthcheck_cli::{init_tracing, run, HealthcheckCli};
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = HealthcheckCli::parse();
    init_tracing(cli.log_format)?;

    let exit_code = run(cli).await;
    std::process::exit(exit_code.into());
}
