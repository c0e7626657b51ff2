use std::sync::Arc;

use tokio::sync::mpsc;

use error::AppError;
use model::{RestoreBatch, RestoreState};
use pipeline::{RestoreEvent, RestorePipeline};
use settings::Settings;

pub mod error;
pub mod fsops;
pub mod metadata;
pub mod model;
pub mod path;
pub mod pipeline;
pub mod settings;
pub mod trashroots;

pub async fn run(settings: Settings) -> Result<RestoreState, AppError> {
    let roots = trashroots::enabled_trash_roots(&settings)?;
    tracing::debug!("enabled trash roots: {:?}", roots);

    let items = settings
        .items
        .iter()
        .map(std::path::absolute)
        .collect::<Result<Vec<_>, _>>()?;

    let pipeline = Arc::new(RestorePipeline::new(items, roots, settings.base_path));

    let canceller = pipeline.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let (sender, mut receiver) = mpsc::unbounded_channel();
    let executor = pipeline.clone();
    let execution = tokio::spawn(async move { executor.execute(sender).await });

    while let Some(event) = receiver.recv().await {
        match event {
            RestoreEvent::Progress(batch) => print_last_outcome(&batch),
            RestoreEvent::Complete(batch) => {
                print_last_outcome(&batch);
                print_summary(&batch);

                return Ok(batch.state);
            }
        }
    }

    if let Ok(Err(error)) = execution.await {
        return Err(error);
    }

    Err(AppError::RestoreIncomplete)
}

fn print_last_outcome(batch: &RestoreBatch) {
    let output = match batch.outputs.last() {
        Some(it) => it,
        None => return,
    };

    let index = batch.outputs.len() - 1;
    let location = match batch.items.get(index) {
        Some(item) => item.location.display().to_string(),
        None => return,
    };

    match (&output.error, &output.destination) {
        (None, Some(destination)) => println!("{} -> {}", location, destination.display()),
        (Some(error), _) => println!("{}: {}", location, error),
        (None, None) => println!("{}", location),
    }
}

fn print_summary(batch: &RestoreBatch) {
    let failed = batch
        .items
        .iter()
        .filter(|item| item.error.is_some())
        .count();

    println!(
        "restored {} of {} entries",
        batch.items.len() - failed,
        batch.items.len()
    );
}
