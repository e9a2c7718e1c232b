//! Switchback demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                      SWITCHBACK                      │
//!                  │                                                      │
//!  Client Request  │  ┌─────────┐    ┌─────────────┐    ┌─────────────┐   │
//!  ────────────────┼─▶│  http   │───▶│ RequestView │───▶│  dispatch   │   │
//!                  │  │ server  │    │  (request)  │    │ route chain │   │
//!                  │  └─────────┘    └─────────────┘    └──────┬──────┘   │
//!                  │                                           │ fault    │
//!                  │                                           ▼          │
//!                  │                                    ┌─────────────┐   │
//!                  │                                    │ error chain │   │
//!                  │                                    │ + default   │   │
//!                  │                                    └──────┬──────┘   │
//!  Client Response │  ┌─────────┐    ┌──────────────┐          │          │
//!  ◀───────────────┼──│ render  │◀───│ ResponseSink │◀─────────┘          │
//!                  │  └─────────┘    └──────────────┘                     │
//!                  │                                                      │
//!                  │  config · observability · lifecycle                  │
//!                  └──────────────────────────────────────────────────────┘
//! ```

use std::path::Path;

use serde_json::json;
use switchback::config::{load_config, ServerConfig};
use switchback::observability::{logging, metrics};
use switchback::{App, HandlerError, HandlerResult, Next, Reply, RequestView, ResponseSink};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::var("SWITCHBACK_CONFIG") {
        Ok(path) => load_config(Path::new(&path))?,
        Err(_) => ServerConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("switchback v0.1.0 starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        handler_timeout_secs = config.timeouts.handler_secs,
        match_policy = ?config.routing.match_policy,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut app = App::with_config(config);
    app.get("/health", |_req, _res, _next| async { Ok(Reply::value(json!({ "status": "ok" }))) })
        .get("/users/:id", |req: RequestView, _res, _next| async move {
            Ok(Reply::value(json!({ "id": req.param("id") })))
        })
        .post("/echo", echo)
        .get("/fail", |_req, _res, _next| async { Err(HandlerError::msg("requested failure")) })
        .on_error(|err: std::sync::Arc<HandlerError>, _req, res: ResponseSink, next: Next| async move {
            tracing::debug!(error = %err, "Custom error handler");
            res.send(json!({ "error": err.message() }));
            next.advance();
            Ok(Reply::NoValue)
        });

    app.serve().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn echo(req: RequestView, res: ResponseSink, _next: Next) -> HandlerResult {
    let body = req.body()?.cloned().unwrap_or(json!(null));
    res.status(201);
    Ok(Reply::value(body))
}
