//! strata demo server.
//!
//! Serves a small set of routes that exercise parameters, JSON replies,
//! global and router-level middleware, a mounted sub-router and the optional
//! cache.
//!
//! ```text
//! GET /hello                         text, reads global middleware state
//! GET /hello/json                    JSON reply
//! GET /hello/:id                     "Hello {id}!", 500 for id = error
//! GET /users/:userId/posts/:postId   two params
//! GET /some/router/hello             mounted router with its own middleware
//! GET /some/router/sleep             slow JSON reply
//! GET /cache/hits                    per-process hit counter (cache enabled)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use strata::cache::Cache;
use strata::config::{load_config, parse_size, ServerConfig};
use strata::http::app::DEFAULT_BODY_LIMIT;
use strata::lifecycle::wait_for_signal;
use strata::middleware::CacheMiddleware;
use strata::observability::{logging::init_tracing, metrics::init_metrics};
use strata::{from_fn, App, AppOptions, Error, HttpServer, Reply, Router, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "strata", version, about = "Demo server for the strata router")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    init_tracing(&config.logging)?;
    tracing::info!("strata v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_path = %config.app.base_path,
        request_timeout_secs = config.timeouts.request_secs,
        cache = config.cache.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(err) = init_metrics(addr) {
                    tracing::error!(error = %err, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let cache = config.cache.as_ref().map(Cache::from_config).transpose()?;
    let router = build_routes(&config, cache);
    let options = AppOptions {
        logging_enabled: config.logging.enabled,
        body_limit: parse_size(&config.app.body_limit).unwrap_or(DEFAULT_BODY_LIMIT),
        trust_proxy: config.app.trust_proxy,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(
        App::with_options(router, options),
        Duration::from_secs(config.timeouts.request_secs),
    );

    let shutdown = Shutdown::new();
    let stopped = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, stopped).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_routes(config: &ServerConfig, cache: Option<Cache>) -> Router {
    let mut app = Router::new(&config.app.base_path);
    if let Some(name) = &config.app.name {
        app = app.with_name(name);
    }

    app.use_middleware(from_fn(|ctx, next| {
        Box::pin(async move {
            ctx.logger().info("Global middleware");
            ctx.state_mut().set("testData", "test");
            next.run(ctx).await
        })
    }));

    let cache_enabled = cache.is_some();
    if let Some(cache) = cache {
        app.use_middleware(Arc::new(CacheMiddleware::new(cache)));
    }

    app.get("/hello", |ctx| {
        Box::pin(async move {
            let data = ctx
                .state()
                .get("testData")
                .and_then(Value::as_str)
                .unwrap_or("none")
                .to_owned();
            ctx.logger().info(format!("State: {}", data));
            Ok(ctx.text("Hello World!"))
        })
    })
    .get("/hello/json", |ctx| {
        Box::pin(async move { ctx.json(&json!({ "message": "Hello World!" })) })
    })
    .get("/hello/:id", |ctx| {
        Box::pin(async move {
            let id = ctx.param("id").unwrap_or_default().to_owned();
            ctx.logger().debug("Starting to process request...");
            ctx.logger().info(format!("Processing request for ID: {}", id));

            if id == "error" {
                ctx.logger().error("Invalid ID provided");
                return Err(Error::msg("Invalid ID"));
            }

            Ok(ctx.text(format!("Hello {}!", id)))
        })
    })
    .get("/users/:userId/posts/:postId", |ctx| {
        Box::pin(async move {
            let user = ctx.param("userId").unwrap_or_default();
            let post = ctx.param("postId").unwrap_or_default();
            ctx.logger().info("Looking up post for user");
            Ok(ctx.text(format!("User {}, Post {}", user, post)))
        })
    });

    if cache_enabled {
        app.get("/cache/hits", |ctx| {
            Box::pin(async move {
                let cache = ctx
                    .state()
                    .typed::<Cache>()
                    .cloned()
                    .ok_or_else(|| Error::msg("cache middleware not installed"))?;
                let hits = cache.get::<u64>("hits").await?.unwrap_or(0) + 1;
                cache.set("hits", &hits).await?;
                ctx.json(&json!({ "hits": hits }))
            })
        });
    }

    let mut some_router = Router::new("/some/router");
    some_router.use_middleware(from_fn(|ctx, next| {
        Box::pin(async move {
            ctx.logger().info("Some Router Middleware");
            next.run(ctx).await
        })
    }));
    some_router
        .get("/hello", |_ctx| {
            Box::pin(async { Ok(Reply::text("Hello from Some Router!")) })
        })
        .get("/sleep", |ctx| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                ctx.json(&json!({ "message": "Hello from Some Router!" }))
            })
        });

    app.route(&some_router);
    app
}
