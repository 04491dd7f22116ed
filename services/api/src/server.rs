use crate::cli::ServeArgs;
use crate::infra::{open_store, AppState, Services};
use crate::routes::{api_router, with_operational_routes};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use consultancy::config::AppConfig;
use consultancy::error::AppError;
use consultancy::profile::{PdfRenderer, ProfileRenderer};
use consultancy::storage::{DiskFileStore, FileStore};
use consultancy::telemetry;
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

    let store = open_store(config.storage.data_file.as_deref())?;
    let services = Services::new(&store, config.enum_policy, config.income_rates);
    let files: Arc<dyn FileStore> = Arc::new(DiskFileStore::new(config.storage.upload_dir.clone()));
    let renderer: Arc<dyn ProfileRenderer> = Arc::new(PdfRenderer);

    let app = with_operational_routes(api_router(&services, files, renderer))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        uploads = %config.storage.upload_dir.display(),
        policy = ?config.enum_policy,
        "consultancy back office ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
