use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryCaseBackend};
use crate::routes::with_case_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use casecheck::cases::CaseDeskService;
use casecheck::config::AppConfig;
use casecheck::error::AppError;
use casecheck::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let backend = Arc::new(InMemoryCaseBackend::seeded());
    let case_service = Arc::new(CaseDeskService::new(backend, config.backend.clone()));

    let app = with_case_routes(case_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        api_base_url = %config.backend.api_base_url,
        "case desk ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
