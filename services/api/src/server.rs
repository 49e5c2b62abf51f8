use crate::cli::ServeArgs;
use crate::infra::{build_service, seed_organization, AppState};
use crate::routes::with_qualification_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use qualify::config::AppConfig;
use qualify::error::AppError;
use qualify::telemetry;
use qualify::{ActorId, OrganizationId};
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

    let service = build_service(&config.scoring);
    let system = ActorId::new("system");
    for organization in args.seed_orgs.drain(..) {
        let organization_id = OrganizationId::new(organization);
        let version = seed_organization(&service, &organization_id, &system)?;
        info!(organization = %organization_id, version, "seeded default rubric");
    }

    let sweeper = service
        .cache()
        .spawn_sweeper(config.scoring.sweep_interval);

    let app = with_qualification_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        cache_ttl_secs = config.scoring.cache_ttl.as_secs(),
        cache_max_entries = config.scoring.cache_max_entries,
        "qualification service ready"
    );

    let served = axum::serve(listener, app).await;
    sweeper.abort();
    served?;
    Ok(())
}
