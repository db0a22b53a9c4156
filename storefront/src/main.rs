//! Storefront entry-point: resolves a session against the REST API and
//! prints access decisions.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::io;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{WrapErr, eyre};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use storefront::config::StorefrontSettings;
use storefront::domain::SessionStore;
use storefront::inbound::cli::{Cli, run};
use storefront::outbound::http::HttpStorefrontApi;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let settings = StorefrontSettings::from_environment()?.overridden_by(cli.settings_overrides());
    let locale = settings.locale()?;
    let api = HttpStorefrontApi::new(settings.base_url()?, settings.request_timeout())
        .wrap_err("failed to build the HTTP client")?;
    info!(base_url = %api.base_url(), %locale, "storefront client ready");

    let store = SessionStore::new(Arc::new(api));
    let mut stdout = io::stdout().lock();
    run(&cli, &store, locale, &mut stdout)
        .await
        .map_err(|error| eyre!(error.user_message(locale)))
}
