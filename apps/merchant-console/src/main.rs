mod cli;
mod config;
mod console;
mod logging;

use std::process::ExitCode;

use clap::Parser;
use merchant_api::MerchantApi;
use merchant_core::NotificationCenter;
use merchant_platform::LocalSessionStore;
use tracing::{error, info};

use cli::{Cli, Command};
use config::ConsoleConfig;
use console::{Console, ConsoleError, drain_shown, render_notification};

const NOTIFICATION_BUFFER: usize = 64;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    info!("starting merchant-console");

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "merchant-console failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<String, ConsoleError> {
    let config = ConsoleConfig::from_env()?;
    let session = LocalSessionStore::new(open_store(&config));
    let cookies = session.cookies()?;
    let api = MerchantApi::connect(config.api_base_url.clone(), &cookies)?;
    info!(base_url = %config.api_base_url, "backend configured");

    let notifications = NotificationCenter::new(NOTIFICATION_BUFFER, config.notify_duration);
    let mut shown = notifications.subscribe();
    let console = Console::new(api, session, notifications, config.order_page_size);

    let result = console.run(command).await;
    for notification in drain_shown(&mut shown) {
        eprintln!("{}", render_notification(&notification));
    }
    Ok(serde_json::to_string_pretty(&result?)?)
}

#[cfg(not(feature = "os-keyring"))]
fn open_store(config: &ConsoleConfig) -> merchant_platform::FileKeyValueStore {
    let store = merchant_platform::FileKeyValueStore::new(config.session_path());
    tracing::debug!(path = %store.path().display(), "using file session store");
    store
}

#[cfg(feature = "os-keyring")]
fn open_store(_config: &ConsoleConfig) -> merchant_platform::OsKeyringStore {
    tracing::debug!("using OS keyring session store");
    merchant_platform::OsKeyringStore::new("merchant-console")
}
