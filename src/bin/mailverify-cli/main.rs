mod args;
mod input;
mod logger;
mod output;

use anyhow::{Context, Result};
use mailverify_lib::{Cancellation, Progress, Row, Verdict, Verifier, merge_verdict};
use serde_json::Value;
use tracing::{info, warn};

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_cli_logger(cli.verbose);

    let options = cli.verify_options()?;
    let field = options.batch.address_field.clone();
    let verifier = Verifier::system(options).context("initialise system DNS resolver")?;

    let rows = match &cli.cmd {
        Commands::Verify { email } => {
            let verdict = verifier.verify_one(email).await;
            vec![verdict_row(&verdict, &field)]
        }
        Commands::Batch { .. } => {
            let rows = input::load(&cli.cmd, &field)?;
            let cancel = Cancellation::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, cancelling batch");
                    trigger.cancel();
                }
            });
            let observer = |p: Progress| {
                info!(
                    completed = p.completed,
                    total = p.total,
                    "progress {:.0}%",
                    p.fraction() * 100.0
                );
            };
            verifier
                .verify_batch(rows, &observer, &cancel)
                .await
                .context("batch verification")?
        }
    };

    output::write_reports(&rows, &cli.format, cli.out.as_deref(), &field)?;

    // codes de sortie : 0 tout valide, 2 au moins un invalide, 1 fatal
    if output::any_invalid(&rows) {
        std::process::exit(2);
    }
    Ok(())
}

fn verdict_row(verdict: &Verdict, field: &str) -> Row {
    let mut row = Row::new();
    row.insert(field.to_string(), Value::String(verdict.email.clone()));
    merge_verdict(row, verdict)
}
