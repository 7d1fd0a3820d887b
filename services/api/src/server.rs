use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use vault_intake::config::{AppConfig, EvaluationMode};
use vault_intake::error::AppError;
use vault_intake::relay::EvaluationRelay;
use vault_intake::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::from_env()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if args.simulate {
        config.mode = EvaluationMode::Simulated;
    }
    config.ensure_credentials()?;

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let addr = config.server.socket_addr()?;
    let environment = config.environment;
    let config = Arc::new(config);
    let relay = Arc::new(EvaluationRelay::new(config.clone())?);

    let app = with_operational_routes(relay)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?environment,
        %addr,
        mode = config.mode.label(),
        upstream = %config.upstream.base_url,
        "evaluation relay ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
