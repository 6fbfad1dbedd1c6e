//! Fetch command - serve one request through the cache

use crate::cli::args::FetchArgs;
use crate::cli::engine::{absolute_url, resolve_origin, Engine};
use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use crate::intercept::Intercept;
use crate::store::Response;
use crate::transport::{FetchOptions, Request};
use console::style;
use std::io::{self, Write};
use tracing::debug;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> CacheResult<()> {
    let origin = resolve_origin(config, Some(&args.url))?;
    let request = Request::new(
        args.method.to_ascii_uppercase(),
        absolute_url(&origin, &args.url),
    );

    let engine = Engine::open(config, origin).await?;
    engine.coordinator.resume().await?;

    let (response, source) = match engine.coordinator.on_fetch(&request).await? {
        Intercept::Response(response, source) => (response, source.to_string()),
        Intercept::PassThrough => {
            debug!("{} is not cached, fetching directly", request.url);
            let response = engine
                .ctx
                .transport
                .fetch(&request, FetchOptions::default())
                .await?;
            (response, "passthrough".to_string())
        }
    };

    let status = if response.is_ok() {
        style(response.status.to_string()).green()
    } else {
        style(response.status.to_string()).red()
    };
    eprintln!("{} {}", status, summary(&request, &response, &source));

    match args.output {
        Some(path) => tokio::fs::write(&path, &response.body)
            .await
            .map_err(|e| CacheError::io(format!("writing {}", path.display()), e))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(&response.body)
                .map_err(|e| CacheError::io("writing response body", e))?;
            stdout
                .flush()
                .map_err(|e| CacheError::io("writing response body", e))?;
        }
    }

    Ok(())
}

/// One-line description of a served response
fn summary(request: &Request, response: &Response, source: &str) -> String {
    let content_type = response
        .header("content-type")
        .unwrap_or("unknown type");
    format!(
        "{} {} ({}, {}, {} bytes)",
        request.method,
        request.url,
        source,
        content_type,
        response.body.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_includes_content_type() {
        let request = Request::get("https://app.test/main.js");
        let response =
            Response::new(200, "x=1").with_header("Content-Type", "text/javascript");

        assert_eq!(
            summary(&request, &response, "cache"),
            "GET https://app.test/main.js (cache, text/javascript, 3 bytes)"
        );
        assert!(summary(&request, &Response::new(200, ""), "network").contains("unknown type"));
    }
}
