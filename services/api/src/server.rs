use crate::cli::ServeArgs;
use crate::infra::{build_service, AppState};
use crate::routes::with_eligibility_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use loan_bre::config::AppConfig;
use loan_bre::error::AppError;
use loan_bre::telemetry;
use loan_bre::workflows::eligibility::{
    AdminRolePolicy, BatchRecompute, EligibilityApi, RecomputeQueue,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::runtime::Handle;
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

    let service = build_service(&config.engine);
    let api = Arc::new(EligibilityApi {
        service: service.clone(),
        queue: RecomputeQueue::new(service.clone(), config.engine.trigger, Handle::current()),
        batch: BatchRecompute::new(service, Arc::new(AdminRolePolicy), config.engine.batch),
    });

    let app = with_eligibility_routes(api)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "loan recommendation engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
