//! Configuration check command.

use std::path::Path;

use console::style;

use wistia_extract::config::Settings;

use crate::cli::icons::{info, success};

/// Print the resolved settings. Secrets are redacted.
pub async fn cmd_check_config(settings: &Settings, source: Option<&Path>) -> anyhow::Result<()> {
    match source {
        Some(path) => println!("{} Config file: {}", info(), path.display()),
        None => println!("{} No config file found, using defaults", info()),
    }

    // Building the clients also validates the proxy URL and TLS setup.
    let pipeline = settings.build_pipeline()?;

    println!("  {} {:?}", style("strategy:").bold(), pipeline.fetcher().strategy());
    println!(
        "  {} {}s",
        style("timeout:").bold(),
        settings.request_timeout.as_secs()
    );
    println!("  {} {}", style("user agent:").bold(), settings.user_agent);
    println!(
        "  {} {}",
        style("login url:").bold(),
        settings
            .login
            .url
            .as_deref()
            .unwrap_or("<target origin>/login")
    );
    println!(
        "  {} {}[email], {}[password], {}",
        style("login fields:").bold(),
        settings.login.scope,
        settings.login.scope,
        settings.login.token_field
    );
    println!(
        "  {} {}",
        style("require credentials:").bold(),
        settings.require_credentials
    );
    println!(
        "  {} {}",
        style("contextual fallback:").bold(),
        settings.contextual_fallback
    );
    println!(
        "  {} {}",
        style("cors methods:").bold(),
        settings.cors.allow_methods.join(", ")
    );

    println!("{} Configuration is valid", success());
    Ok(())
}
