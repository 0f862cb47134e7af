//! OTLP export pipeline built on the OpenTelemetry SDK.
//!
//! Start-up happens in two stages, mirroring the two fatal failure kinds:
//! client construction (reach the collector, build the gRPC exporter) and
//! pipeline startup (periodic reader plus meter provider on the Tokio
//! runtime). Anything that goes wrong after that, such as a failed export
//! or a collector-side rejection, is only logged by the SDK.

use crate::{
    error::{ReproError, Result},
    recorder::OtelRecorder,
    selector::AggregatorSelector,
};
use opentelemetry::metrics::MeterProvider;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{MetricExporter, WithExportConfig};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider, Temporality};
use opentelemetry_sdk::{runtime, Resource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

pub const DEFAULT_ENDPOINT: &str = "localhost:55680";
pub const DEFAULT_COLLECT_PERIOD: Duration = Duration::from_secs(2);
pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_SERVICE_NAME: &str = "dupts";

const METER_NAME: &str = "dupts";

/// Collector address. The transport is always insecure gRPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = ReproError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let authority = match s.split_once("://") {
            Some(("http", rest)) => rest,
            Some((scheme, _)) => {
                return Err(ReproError::InvalidConfig(format!(
                    "Unsupported scheme '{}' in endpoint '{}': only insecure http is used",
                    scheme, s
                )))
            }
            None => s,
        };
        let authority = authority.trim_end_matches('/');

        let (host, port) = authority.rsplit_once(':').ok_or_else(|| {
            ReproError::InvalidConfig(format!("Endpoint '{}' must be host:port", s))
        })?;
        if host.is_empty() {
            return Err(ReproError::InvalidConfig(format!(
                "Endpoint '{}' has an empty host",
                s
            )));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| ReproError::InvalidConfig(format!("Invalid port in '{}': {}", s, e)))?;

        Ok(Self::new(host, port))
    }
}

impl TryFrom<String> for Endpoint {
    type Error = ReproError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new("localhost", 55680)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub endpoint: Endpoint,
    pub collect_period: Duration,
    pub export_timeout: Duration,
    pub connect_timeout: Duration,
    pub service_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            collect_period: DEFAULT_COLLECT_PERIOD,
            export_timeout: DEFAULT_EXPORT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.collect_period.is_zero() {
            return Err(ReproError::InvalidConfig(
                "Collect period must be > 0".to_string(),
            ));
        }
        if self.export_timeout.is_zero() {
            return Err(ReproError::InvalidConfig(
                "Export timeout must be > 0".to_string(),
            ));
        }
        if self.service_name.is_empty() {
            return Err(ReproError::InvalidConfig(
                "Service name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A running metrics pipeline: exporter, periodic reader and meter provider.
pub struct Pipeline {
    provider: SdkMeterProvider,
}

impl Pipeline {
    pub async fn start(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;

        let exporter = build_exporter(config).await?;
        let provider = build_provider(config, exporter)?;

        info!(
            "Metrics pipeline started (endpoint: {}, collect period: {:?})",
            config.endpoint, config.collect_period
        );

        Ok(Self { provider })
    }

    pub fn recorder(&self, name: impl Into<String>, selector: AggregatorSelector) -> OtelRecorder {
        let meter = self.provider.meter(METER_NAME);
        OtelRecorder::register(&meter, name, selector)
    }

    /// Flushes what is left and stops the background reader, giving up after
    /// `deadline`. Returns whether shutdown completed in time. Export errors
    /// are reported but never fail the run.
    ///
    /// The SDK shutdown blocks until the final export returns, so it runs on
    /// its own thread; past the deadline that thread is left behind and the
    /// connection goes away with the process.
    pub async fn shutdown(self, deadline: Duration) -> bool {
        debug!("Shutting down metrics pipeline (deadline: {:?})", deadline);

        let (tx, rx) = oneshot::channel();
        let provider = self.provider;
        std::thread::spawn(move || {
            let _ = tx.send(provider.shutdown().map_err(|e| e.to_string()));
        });

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(Ok(()))) => true,
            Ok(Ok(Err(e))) => {
                warn!("Metrics pipeline shutdown reported an error: {}", e);
                true
            }
            Ok(Err(_)) => {
                warn!("Metrics pipeline shutdown thread exited without a result");
                true
            }
            Err(_) => {
                warn!(
                    "Metrics pipeline shutdown did not finish within {:?}; dropping pending export",
                    deadline
                );
                false
            }
        }
    }
}

/// Fails fast when nothing listens at the collector address, since the gRPC
/// channel itself connects lazily.
pub async fn probe(endpoint: &Endpoint, timeout: Duration) -> Result<()> {
    let address = endpoint.to_string();
    match tokio::time::timeout(timeout, TcpStream::connect(&address)).await {
        Ok(Ok(_)) => {
            debug!("Collector reachable at {}", address);
            Ok(())
        }
        Ok(Err(e)) => Err(ReproError::ClientConstruction(format!(
            "cannot connect to collector at {}: {}",
            address, e
        ))),
        Err(_) => Err(ReproError::ClientConstruction(format!(
            "timed out after {:?} connecting to collector at {}",
            timeout, address
        ))),
    }
}

async fn build_exporter(config: &PipelineConfig) -> Result<MetricExporter> {
    probe(&config.endpoint, config.connect_timeout).await?;

    MetricExporter::builder()
        .with_temporality(Temporality::Delta)
        .with_tonic()
        .with_endpoint(config.endpoint.url())
        .with_timeout(config.export_timeout)
        .build()
        .map_err(|e| ReproError::ClientConstruction(e.to_string()))
}

fn build_provider(config: &PipelineConfig, exporter: MetricExporter) -> Result<SdkMeterProvider> {
    ensure_runtime()?;

    let reader = PeriodicReader::builder(exporter, runtime::Tokio)
        .with_interval(config.collect_period)
        .with_timeout(config.export_timeout)
        .build();

    let resource = Resource::new([KeyValue::new(
        "service.name",
        config.service_name.clone(),
    )]);

    Ok(SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(resource)
        .build())
}

/// The periodic reader spawns its collection task on the current runtime.
fn ensure_runtime() -> Result<()> {
    tokio::runtime::Handle::try_current()
        .map(|_| ())
        .map_err(|e| ReproError::PipelineStart(format!("no Tokio runtime available: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parse() {
        let endpoint: Endpoint = "localhost:55680".parse().unwrap();
        assert_eq!(endpoint, Endpoint::default());
        assert_eq!(endpoint.url(), "http://localhost:55680");

        let endpoint: Endpoint = "http://127.0.0.1:4317/".parse().unwrap();
        assert_eq!(endpoint.host, "127.0.0.1");
        assert_eq!(endpoint.port, 4317);
    }

    #[test]
    fn test_endpoint_parse_errors() {
        assert!("localhost".parse::<Endpoint>().is_err());
        assert!(":4317".parse::<Endpoint>().is_err());
        assert!("localhost:notaport".parse::<Endpoint>().is_err());

        let err = "https://collector:4317".parse::<Endpoint>().unwrap_err();
        assert!(err.to_string().contains("https"));
    }

    #[test]
    fn test_config_validation() {
        assert!(PipelineConfig::default().validate().is_ok());

        let config = PipelineConfig {
            collect_period: Duration::ZERO,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ensure_runtime_outside_tokio() {
        let err = ensure_runtime().unwrap_err();
        assert!(matches!(err, ReproError::PipelineStart(_)));
    }

    #[tokio::test]
    async fn test_reachability_check_connects() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let endpoint = Endpoint::new("127.0.0.1", port);
        assert!(probe(&endpoint, Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shutdown_gives_up_on_silent_collector() {
        // Accepts TCP but never answers, so the final export hangs.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let config = PipelineConfig {
            endpoint: Endpoint::new("127.0.0.1", port),
            export_timeout: Duration::from_secs(10),
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::start(&config).await.unwrap();
        let recorder = pipeline.recorder("test.dummy.one", AggregatorSelector::Exact);
        crate::recorder::Recorder::record(
            &recorder,
            &crate::Measurement::new(100).with_attribute("rpc.method", "Hello"),
        );

        let start = std::time::Instant::now();
        let completed = pipeline.shutdown(Duration::from_millis(300)).await;

        assert!(!completed);
        assert!(start.elapsed() < Duration::from_secs(3));
        drop(listener);
    }

    #[tokio::test]
    async fn test_start_unreachable_is_client_construction_failure() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let config = PipelineConfig {
            endpoint: Endpoint::new("127.0.0.1", port),
            connect_timeout: Duration::from_secs(1),
            ..PipelineConfig::default()
        };

        match Pipeline::start(&config).await {
            Err(ReproError::ClientConstruction(msg)) => {
                assert!(msg.contains(&port.to_string()));
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("pipeline started against a closed port"),
        }
    }
}
