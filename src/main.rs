use color_eyre::{eyre::eyre, Result};
use debounced_input::config::Config;
use debounced_input::input::{DebouncedInputController, InputEvent, Validator};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Lines starting with this character skip the debounce delay
const IMMEDIATE_PREFIX: char = '!';

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())
        .await
        .map_err(|e| eyre!("Failed to load config: {}", e))?;
    info!(
        "Debouncing stdin with {:?}, {} validation rule(s)",
        config.debounce,
        config.validation.rules.len()
    );

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<InputEvent<String>>();
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!(
                "{}\t{}\t{}",
                event.emitted_at.to_rfc3339(),
                event.field,
                event.value
            );
        }
        debug!("Event printer finished");
    });

    let mut controller = DebouncedInputController::new(
        "stdin",
        String::new(),
        config.validation.build(),
        event_tx,
        config.debounce.settings(),
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let (candidate, immediate) = match line.strip_prefix(IMMEDIATE_PREFIX) {
            Some(rest) => (rest.to_string(), true),
            None => (line, false),
        };

        controller.request_update(candidate, immediate)?;
        if controller.validator().has_error() {
            warn!(
                "Input rejected by {:?}",
                controller.validator().failing_rules()
            );
        }
    }

    // Let the last delayed update fire before shutting down
    controller.settled().await;
    drop(controller);

    printer
        .await
        .map_err(|e| eyre!("Event printer panicked: {}", e))?;

    info!("Input closed");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .pretty()
        .init();
}
