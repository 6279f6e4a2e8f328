//! S3 Bucket Provisioner
//!
//! Kubernetes dynamic provisioner that backs each claim with a versioned S3
//! bucket mounted through a FlexVolume driver.
//!
//! ```text
//! PersistentVolumeClaim ──▶ render name ──▶ CreateBucket ──▶ PutBucketVersioning
//!                                                                   │
//!                          PersistentVolume (Retain, FlexVolume) ◀──┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use s3_bucket_provisioner::backends::S3Config;
use s3_bucket_provisioner::config::{DEFAULT_FLEX_DRIVER, DEFAULT_FLEX_FS_TYPE};
use s3_bucket_provisioner::controller::{self, ControllerContext};
use s3_bucket_provisioner::provisioner::DEFAULT_NAME_TEMPLATE;
use s3_bucket_provisioner::{
    BackendConfig, BackendFactory, BackendKind, Error, MountConfig, ProvisionMetrics,
    ProvisionWorkflow, ProvisionerConfig, Result, DEFAULT_PROVISIONER_NAME,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// S3 Bucket Provisioner - versioned S3 buckets as Kubernetes volumes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Region to create buckets in
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Bucket name template
    #[arg(long, env = "S3_BUCKET_NAME_FORMAT", default_value = DEFAULT_NAME_TEMPLATE)]
    name_format: String,

    /// Custom S3 endpoint for S3-compatible stores
    #[arg(long, env = "S3_ENDPOINT")]
    s3_endpoint: Option<String>,

    /// Provisioner name matched against StorageClass.provisioner
    #[arg(long, env = "PROVISIONER_NAME", default_value = DEFAULT_PROVISIONER_NAME)]
    provisioner_name: String,

    /// Object store backend (s3, memory)
    #[arg(long, env = "OBJECT_STORE_BACKEND", default_value = "s3")]
    backend: String,

    /// Skip S3 bucket name validation of rendered names
    #[arg(long, env = "SKIP_NAME_VALIDATION")]
    skip_name_validation: bool,

    /// FlexVolume driver placed on provisioned volumes
    #[arg(long, env = "FLEX_DRIVER", default_value = DEFAULT_FLEX_DRIVER)]
    flex_driver: String,

    /// Filesystem type placed on provisioned volumes
    #[arg(long, env = "FLEX_FS_TYPE", default_value = DEFAULT_FLEX_FS_TYPE)]
    flex_fs_type: String,

    /// Health server bind address
    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8081")]
    health_addr: String,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    info!("Starting S3 Bucket Provisioner");
    info!("  Version: {}", s3_bucket_provisioner::VERSION);
    info!("  Provisioner: {}", args.provisioner_name);
    info!("  Backend: {}", args.backend);

    // Configuration errors are fatal here, before anything is watched
    let config = ProvisionerConfig::new(args.region.as_deref(), Some(args.name_format.as_str()))?
        .with_name_validation(!args.skip_name_validation)
        .with_mount(MountConfig {
            driver: args.flex_driver.clone(),
            fs_type: args.flex_fs_type.clone(),
        });
    info!("  Region: {}", config.region);
    info!("  Name template: {}", config.name_template);

    let backend_kind: BackendKind = args.backend.parse()?;
    let backend = BackendFactory::create(BackendConfig {
        kind: backend_kind,
        s3: S3Config {
            region: config.region.clone(),
            endpoint: args.s3_endpoint.clone(),
        },
    })
    .await;

    let metrics = ProvisionMetrics::new()?;
    metrics.register(prometheus::default_registry())?;

    let workflow = Arc::new(ProvisionWorkflow::new(config, backend).with_metrics(metrics));

    // Readiness follows the object store; the first check is non-fatal
    let ready = Arc::new(AtomicBool::new(check_store(&workflow).await));
    if !ready.load(Ordering::Relaxed) {
        warn!("Object store not reachable yet; continuing");
    }

    {
        let workflow = workflow.clone();
        let ready = ready.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEALTH_CHECK_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                ready.store(check_store(&workflow).await, Ordering::Relaxed);
            }
        });
    }

    // Start health server
    let health_addr = args.health_addr.clone();
    let health_ready = ready.clone();
    tokio::spawn(async move {
        if let Err(e) = run_health_server(&health_addr, health_ready).await {
            error!("Health server error: {}", e);
        }
    });

    // Start metrics server
    let metrics_addr = args.metrics_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(&metrics_addr).await {
            error!("Metrics server error: {}", e);
        }
    });

    let client = kube::Client::try_default().await?;
    let ctx = ControllerContext::new(client, workflow, args.provisioner_name.clone());

    controller::run(ctx).await?;

    info!("Provisioner shutdown complete");
    Ok(())
}

/// Interval between object store health checks
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

async fn check_store(workflow: &ProvisionWorkflow) -> bool {
    match workflow.health_check().await {
        Ok(true) => {
            debug!("Object store reachable");
            true
        }
        Ok(false) => false,
        Err(e) => {
            warn!("Object store health check error: {}", e);
            false
        }
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in [
        "hyper=warn",
        "kube=info",
        "aws_config=warn",
        "aws_smithy_runtime=warn",
    ] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

// =============================================================================
// Health Server
// =============================================================================

fn text_response(status: hyper::StatusCode, body: hyper::Body) -> hyper::Response<hyper::Body> {
    let mut response = hyper::Response::new(body);
    *response.status_mut() = status;
    response
}

fn probe_response(path: &str, ready: bool) -> hyper::Response<hyper::Body> {
    use hyper::{Body, StatusCode};

    match path {
        "/healthz" | "/livez" => text_response(StatusCode::OK, Body::from("ok")),
        "/readyz" if ready => text_response(StatusCode::OK, Body::from("ok")),
        "/readyz" => text_response(
            StatusCode::SERVICE_UNAVAILABLE,
            Body::from("object store unreachable"),
        ),
        _ => text_response(StatusCode::NOT_FOUND, Body::from("not found")),
    }
}

async fn run_health_server(addr: &str, ready: Arc<AtomicBool>) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Server};

    let make_svc = make_service_fn(move |_conn| {
        let ready = ready.clone();
        async move {
            Ok::<_, std::convert::Infallible>(service_fn(move |req: Request<Body>| {
                let response = probe_response(req.uri().path(), ready.load(Ordering::Relaxed));
                async move { Ok::<_, std::convert::Infallible>(response) }
            }))
        }
    });

    let addr: SocketAddr = addr.parse().map_err(|e| {
        Error::Configuration(format!("Invalid health server address: {}", e))
    })?;

    info!("Health server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Health server error: {}", e)))?;

    Ok(())
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: &str) -> Result<()> {
    use hyper::header::{HeaderValue, CONTENT_TYPE};
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Server, StatusCode};
    use prometheus::{Encoder, TextEncoder};

    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, std::convert::Infallible>(service_fn(|req: Request<Body>| async move {
            let response = match req.uri().path() {
                "/metrics" => {
                    let encoder = TextEncoder::new();
                    let metric_families = prometheus::gather();
                    let mut buffer = Vec::new();
                    match encoder.encode(&metric_families, &mut buffer) {
                        Ok(()) => {
                            let mut response = text_response(StatusCode::OK, Body::from(buffer));
                            if let Ok(value) = HeaderValue::from_str(encoder.format_type()) {
                                response.headers_mut().insert(CONTENT_TYPE, value);
                            }
                            response
                        }
                        Err(e) => text_response(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Body::from(e.to_string()),
                        ),
                    }
                }
                _ => text_response(StatusCode::NOT_FOUND, Body::from("not found")),
            };
            Ok::<_, std::convert::Infallible>(response)
        }))
    });

    let addr: SocketAddr = addr.parse().map_err(|e| {
        Error::Configuration(format!("Invalid metrics server address: {}", e))
    })?;

    info!("Metrics server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Metrics server error: {}", e)))?;

    Ok(())
}
