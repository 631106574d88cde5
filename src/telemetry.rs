use std::sync::Mutex;
use std::time::Instant;

use anyhow::Context;
use once_cell::sync::Lazy;
use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::{Protocol, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::{
    SCHEMA_URL,
    attribute::{SERVICE_NAME, SERVICE_VERSION},
    resource::DEPLOYMENT_ENVIRONMENT_NAME,
};
use rocket::{
    Data, Orbit, Request, Response, Rocket,
    fairing::{Fairing, Info, Kind},
};
use tonic::metadata::{MetadataKey, MetadataMap, MetadataValue};
use tracing::{field::Empty, info, info_span, warn};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{OtlpConfig, otlp_from_env};

static TELEMETRY_GUARD: Lazy<Mutex<Option<OtelGuard>>> = Lazy::new(|| Mutex::new(None));

pub struct TelemetryFairing;

#[rocket::async_trait]
impl Fairing for TelemetryFairing {
    fn info(&self) -> Info {
        Info {
            name: "OpenTelemetry",
            kind: Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        let method = request.method().to_string();
        let uri = request.uri().to_string();

        let start_time = Instant::now();

        let span = info_span!(
            "http_request",
            otel.name = format!("{} {}", method, uri),
            http.method = method,
            http.uri = uri,
            http.route = request.route().map(|r| r.uri.to_string()),
            http.status_code = Empty,
            http.duration_ms = Empty,
        );

        request.local_cache(|| (span, start_time));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let (span, start_time) = request.local_cache(|| {
            let span = info_span!("http_request");
            (span, Instant::now())
        });

        let duration = start_time.elapsed();

        span.record("http.status_code", response.status().code);
        span.record("http.duration_ms", duration.as_millis() as i64);

        let _entered = span.enter();
        info!(
            "Completed request in {}ms with status {}",
            duration.as_millis(),
            response.status().code
        );
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        shutdown_telemetry();
    }
}

fn deployment_environment() -> String {
    dotenvy::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string())
}

fn resource() -> Resource {
    Resource::builder()
        .with_schema_url(
            [
                KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")),
                KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
                KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, deployment_environment()),
            ],
            SCHEMA_URL,
        )
        .build()
}

fn init_tracer_provider(config: &OtlpConfig) -> anyhow::Result<SdkTracerProvider> {
    let mut metadata = MetadataMap::new();
    if let Some((name, value)) = &config.header {
        let key = MetadataKey::from_bytes(name.as_bytes())
            .with_context(|| format!("Invalid OTLP header name: {}", name))?;
        let value: MetadataValue<_> = value
            .parse()
            .context("Invalid OTLP header value")?;
        metadata.insert(key, value);
    }

    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.endpoint.clone())
        .with_protocol(Protocol::Grpc)
        .with_metadata(metadata);

    if config.endpoint.starts_with("https://") {
        builder =
            builder.with_tls_config(tonic::transport::ClientTlsConfig::new().with_native_roots());
    }

    let exporter = builder
        .build()
        .context("Failed to build OTLP span exporter")?;

    Ok(SdkTracerProvider::builder()
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource())
        .with_batch_exporter(exporter)
        .build())
}

pub struct OtelGuard {
    tracer_provider: SdkTracerProvider,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Err(err) = self.tracer_provider.shutdown() {
            eprintln!("Failed to shut down tracer provider: {:?}", err);
        }
    }
}

/// Installs the global subscriber: env filter and fmt output, plus OTLP
/// export when `OTLP_ENDPOINT` is set.
pub fn init_tracing() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let tracer_provider = otlp_from_env()
        .map(|config| init_tracer_provider(&config))
        .transpose()?;
    let otel_layer = tracer_provider
        .as_ref()
        .map(|provider| OpenTelemetryLayer::new(provider.tracer(env!("CARGO_PKG_NAME"))));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    match tracer_provider {
        Some(tracer_provider) => {
            info!("Exporting spans over OTLP");
            if let Ok(mut guard) = TELEMETRY_GUARD.lock() {
                *guard = Some(OtelGuard { tracer_provider });
            }
        }
        None => info!("OTLP_ENDPOINT not set; spans are only logged"),
    }

    Ok(())
}

pub fn shutdown_telemetry() {
    match TELEMETRY_GUARD.lock() {
        Ok(mut guard) => {
            if guard.take().is_some() {
                info!("Telemetry shut down");
            }
        }
        Err(err) => warn!("Telemetry guard poisoned: {}", err),
    }
}
