use crate::cli::ServeArgs;
use crate::infra::{validation_config, AppState, InMemorySessionStore};
use crate::routes::with_intake_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use citizenship_intake::config::AppConfig;
use citizenship_intake::error::AppError;
use citizenship_intake::telemetry;
use citizenship_intake::workflows::intake::{
    GoogleInputTools, IntakeService, IntakeValidator, LoggingSink,
};
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

    let intake_service = Arc::new(IntakeService::new(
        Arc::new(InMemorySessionStore::new(config.intake.session_idle_timeout)),
        Arc::new(LoggingSink),
        Arc::new(GoogleInputTools::new(
            config.intake.transliteration_url.clone(),
        )),
        IntakeValidator::new(validation_config(&config.intake)),
    ));

    let app = with_intake_routes(intake_service, config.intake.max_upload_bytes)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        transliteration = %config.intake.transliteration_url,
        "citizenship intake service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
