//! `gpuwatch watch`: bring the reader up, tick until interrupted.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use gpuwatch_core::{PassOutcome, Reader};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::config;
use crate::console::ConsoleSink;
use crate::error::CliError;

pub async fn handle(args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if args.tick == 0 {
        return Err(CliError::Validation {
            field: "--tick".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let reader_config = config::resolve(global, args)?;
    let endpoint = reader_config.endpoint.clone();
    if !endpoint.is_standalone() {
        warn!("embedded engine has no hardware backend; nothing will be printed");
    }
    let mut reader =
        Reader::initialize(reader_config, ConsoleSink::new(std::io::stdout())).await?;
    info!(
        %endpoint,
        devices = ?reader.devices(),
        fields = reader.fields().len(),
        "watching"
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(args.tick));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut passes: u64 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = reader.process().await;
                if let PassOutcome::Delivered { samples, skipped } = outcome {
                    debug!(samples, skipped, "pass complete");
                }
                passes += 1;
                if args.count.is_some_and(|n| passes >= n) {
                    break;
                }
            }
            _ = &mut shutdown => {
                info!(passes, "interrupted");
                break;
            }
        }
    }

    let recoveries = reader.recoveries();
    reader.shutdown().finish()?;
    debug!(passes, recoveries, "done");
    Ok(())
}
