//! Run - wire input, stage and component printers together

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use sluice_config::Config;
use sluice_pipeline::{SinkHandle, StageBuilder};
use tokio::sync::mpsc;

use crate::input;
use crate::output;

/// Route the input through the configured stage until it is exhausted
pub async fn run(config: Config, input_path: &str) -> Result<()> {
    let mut sinks = HashMap::new();
    let mut printers = Vec::new();
    for component in config.enabled_components() {
        let (handle, rx) = SinkHandle::channel(component.name.clone(), config.stage.channel_size);
        sinks.insert(component.name.clone(), handle);
        printers.push(tokio::spawn(output::print_component(component.name.clone(), rx)));
    }

    let stage = StageBuilder::from_config(&config, sinks)
        .context("failed to build stage")?
        .build()
        .context("failed to build stage")?;
    let stage = Arc::new(stage);

    let (senders, receivers): (Vec<_>, Vec<_>) = (0..config.stage.workers)
        .map(|_| mpsc::channel(config.stage.channel_size))
        .unzip();
    let workers = Arc::clone(&stage).run_sharded(receivers);

    let reader = input::open(input_path).await?;
    let read = input::forward(reader, config.stage.batch_size, &senders).await;

    // Close the input so workers drain and stop, even if reading failed
    drop(senders);
    for worker in workers {
        worker.await.context("stage worker panicked")?;
    }
    let records = read?;

    let stage_metrics = stage.metrics().snapshot();
    let router_metrics = stage.router_metrics().snapshot();

    // Dropping the stage drops the sink handles, which ends the printers
    drop(stage);
    let mut printed = 0;
    for printer in printers {
        printed += printer.await.context("printer task panicked")??;
    }

    tracing::info!(
        records,
        batches = stage_metrics.batches_received,
        deliveries = router_metrics.component_deliveries,
        printed,
        unrouted_events = stage_metrics.unrouted_events,
        unrouted_raw = router_metrics.unrouted_raw,
        failed_batches = stage_metrics.batches_failed,
        "input routed"
    );
    eprintln!(
        "routed {} records: {} unrouted events, {} unrouted raw records",
        records, stage_metrics.unrouted_events, router_metrics.unrouted_raw
    );

    Ok(())
}
