//! Request logging middleware
//!
//! Wraps the remaining chain, then emits one structured event per request
//! with the method, full path, status, latency and client IP. Paths in
//! `skip_paths` (health checks, probes) produce no event.

use std::collections::HashSet;
use std::time::Instant;

use crate::chain::{handler, Handler};
use crate::context::Context;

#[derive(Debug, Clone, Default)]
pub struct LoggerConfig {
    /// Request paths that are not logged.
    pub skip_paths: Vec<String>,
}

/// Request logger with the default configuration.
pub fn logger() -> Handler {
    logger_with_config(LoggerConfig::default())
}

/// Request logger skipping the configured paths.
pub fn logger_with_config(config: LoggerConfig) -> Handler {
    let skip: HashSet<String> = config.skip_paths.into_iter().collect();
    handler(move |ctx: &mut Context| {
        let start = Instant::now();
        // capture before the chain runs; handlers may not keep these intact
        let path = ctx.request_path().to_string();
        let query = ctx.raw_query().map(str::to_string);

        ctx.next();

        if skip.contains(&path) {
            return;
        }

        let full_path = match query {
            Some(query) => format!("{path}?{query}"),
            None => path,
        };
        let client_ip = ctx
            .client_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_default();
        tracing::info!(
            method = %ctx.method(),
            path = %full_path,
            status = ctx.response().status.as_u16(),
            latency = ?start.elapsed(),
            client_ip = %client_ip,
            "request"
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::HandlerChain;
    use crate::context::ContextSeed;
    use crate::response::StatusCode;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_logger_runs_rest_of_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = log.clone();

        let mut ctx = Context::new();
        ctx.init(ContextSeed {
            method: "GET".to_string(),
            path: "/ping".to_string(),
            raw_query: Some("verbose=1".to_string()),
            ..ContextSeed::default()
        });
        ctx.set_handlers(HandlerChain::of([
            logger(),
            handler(move |c| {
                l.lock().push("handler");
                c.string(StatusCode::OK, "pong");
            }),
        ]));
        ctx.next();

        assert_eq!(*log.lock(), vec!["handler"]);
        assert_eq!(ctx.response().status, StatusCode::OK);
    }

    #[test]
    fn test_logger_with_skip_paths_still_dispatches() {
        let ran = Arc::new(Mutex::new(false));
        let r = ran.clone();

        let mut ctx = Context::new();
        ctx.init(ContextSeed {
            method: "GET".to_string(),
            path: "/healthz".to_string(),
            ..ContextSeed::default()
        });
        ctx.set_handlers(HandlerChain::of([
            logger_with_config(LoggerConfig {
                skip_paths: vec!["/healthz".to_string()],
            }),
            handler(move |_| *r.lock() = true),
        ]));
        ctx.next();

        assert!(*ran.lock());
    }
}
