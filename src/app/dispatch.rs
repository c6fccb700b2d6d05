use crate::app::status::render_status;
use crate::cli::{Cli, Commands};
use anyhow::{Context, Result};
use designlens::audit::Auditor;
use designlens::capture::ScreenshotService;
use designlens::config::Config;
use designlens::media::ImagePayload;
use designlens::ui::{self, style};
use designlens::{gateway, llm};
use std::path::{Path, PathBuf};
use std::sync::Arc;

async fn read_image(path: &Path) -> Result<ImagePayload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path.file_name().and_then(|n| n.to_str());
    Ok(ImagePayload::from_upload(bytes, None, file_name))
}

async fn capture_page(config: &Config, url: &str) -> Result<ImagePayload> {
    let service = ScreenshotService::from_config(&config.capture);
    match service.capture(url).await {
        Ok(image) => Ok(image),
        Err(e) => {
            tracing::error!(kind = e.kind(), "Screenshot failed: {e}");
            let hint = retry_hint(e.public_message());
            Err(anyhow::Error::new(e).context(hint))
        }
    }
}

fn retry_hint(message: &str) -> String {
    format!("{message}. Re-run the command to retry.")
}

async fn run_audit(
    config: &Config,
    path: Option<PathBuf>,
    url: Option<String>,
    json: bool,
) -> Result<()> {
    let image = match (path, url) {
        (Some(path), _) => read_image(&path).await?,
        (None, Some(url)) => {
            println!("› Capturing {}", style::url(&url));
            capture_page(config, &url).await?
        }
        (None, None) => anyhow::bail!("Provide an image path or --url"),
    };

    if !config.has_api_key() {
        anyhow::bail!("GOOGLE_API_KEY is not set. Export it and re-run the command.");
    }

    let provider: Arc<dyn llm::Provider> = Arc::from(llm::create_provider(config));
    let auditor =
        Auditor::new(provider, config.provider.model.clone()).with_timeout(config.audit_budget());

    match auditor.audit(Some(image)).await {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", ui::render(&report));
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(kind = e.kind(), "Audit failed: {e}");
            eprintln!("{}", style::error(retry_hint(e.public_message())));
            Err(anyhow::Error::new(e))
        }
    }
}

async fn run_screenshot(config: &Config, url: &str, output: &Path) -> Result<()> {
    let image = capture_page(config, url).await?;
    tokio::fs::write(output, image.bytes())
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "{} {} ({} bytes, {})",
        style::success("✓ Saved"),
        output.display(),
        image.len(),
        image.mime_type()
    );
    Ok(())
}

pub async fn dispatch(cli: Cli, mut config: Config) -> Result<()> {
    match cli.command {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(host) = host {
                config.gateway.host = host;
            }
            gateway::run_gateway(config).await
        }
        Commands::Audit { path, url, json } => run_audit(&config, path, url, json).await,
        Commands::Screenshot { url, output } => run_screenshot(&config, &url, &output).await,
        Commands::Status => {
            println!("{}", render_status(&config));
            Ok(())
        }
    }
}
