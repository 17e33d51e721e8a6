//! One-shot extraction command.

use wistia_extract::config::Settings;
use wistia_extract::pipeline::ExtractRequest;

use crate::cli::icons::{error, info, success, warn};

/// Run the pipeline once and print the JSON result on stdout.
pub async fn cmd_extract(
    settings: &Settings,
    url: &str,
    email: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    let request = ExtractRequest {
        url: Some(url.to_string()),
        email,
        password,
    };
    request.validate(settings.require_credentials)?;

    let pipeline = settings.build_pipeline()?;
    eprintln!(
        "{} Extracting from {} ({} strategy)",
        info(),
        url,
        settings.strategy
    );

    let result = match pipeline.run(&request).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{} {}", error(), e);
            return Err(e.into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    match result.wistia_id {
        Some(ref id) => eprintln!("{} Wistia ID: {}", success(), id),
        None => eprintln!("{} {}", warn(), result.message),
    }

    Ok(())
}
