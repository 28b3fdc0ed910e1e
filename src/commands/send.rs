use anyhow::{Context, Result, ensure};
use log::{debug, warn};
use reqwest::Method;
use std::io::Read;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::{
    config::RetrierConfig,
    delivery::{DeliveryContext, RequestTemplate},
};

/// What to send and where, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub url: String,
    pub method: String,
    /// Raw `NAME:VALUE` pairs.
    pub headers: Vec<String>,
    pub content_type: Option<String>,
    pub data: Option<String>,
    /// Payload file, `-` for stdin.
    pub data_file: Option<PathBuf>,
}

/// Delivers one payload, cancelling on Ctrl-C.
#[tracing::instrument(skip(config, options))]
pub async fn send(config: &RetrierConfig, options: &SendOptions) -> Result<()> {
    let retrier = config.build()?;
    let template = request_template(options)?;
    let payload = read_payload(options)?;
    debug!(
        "Sending {} bytes to {} {}",
        payload.len(),
        template.method(),
        template.url()
    );

    let ctx = DeliveryContext::with_token(CancellationToken::new());
    let interrupt = ctx.token().clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling delivery");
            interrupt.cancel();
        }
    });

    let result = retrier.request_retry(&ctx, &payload, &template).await;
    watcher.abort();
    result?;

    println!("Delivered {} bytes to {}", payload.len(), options.url);
    Ok(())
}

fn request_template(options: &SendOptions) -> Result<RequestTemplate> {
    let method = Method::from_bytes(options.method.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {}", options.method))?;

    let mut template = RequestTemplate::new(method, &options.url)?;
    if let Some(content_type) = &options.content_type {
        template = template.header("Content-Type", content_type)?;
    }
    for raw in &options.headers {
        let (name, value) = parse_header(raw)?;
        template = template.header(name, value)?;
    }
    Ok(template)
}

fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("Invalid header {:?}, expected NAME:VALUE", raw))?;
    let name = name.trim();
    ensure!(!name.is_empty(), "Invalid header {:?}, name is empty", raw);
    Ok((name, value.trim()))
}

fn read_payload(options: &SendOptions) -> Result<Vec<u8>> {
    if let Some(data) = &options.data {
        return Ok(data.clone().into_bytes());
    }

    match &options.data_file {
        Some(path) if path.as_os_str() == "-" => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read payload from stdin")?;
            Ok(buf)
        }
        Some(path) => {
            std::fs::read(path).with_context(|| format!("Failed to read payload file {:?}", path))
        }
        None => Ok(Vec::new()),
    }
}
