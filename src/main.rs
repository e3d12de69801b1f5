use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use otp_relay::mailer::build_mailer;
use otp_relay::openapi::ApiDoc;
use otp_relay::store::InMemoryOtpStore;
use otp_relay::{config, AppConfig, AppState, OtpService};

async fn render_metrics(handle: web::Data<PrometheusHandle>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(handle.render())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env automatically only in debug builds; deployments set variables externally.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    let cfg = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            eprintln!("Set RESEND_API_KEY and FROM_EMAIL (a .env file is picked up in debug builds)");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping OTP relay");
    info!("Sender: {}", cfg.sender());
    info!("OTP lifetime: {}s", cfg.otp_ttl.as_secs());

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("metrics recorder not installed: {e}");
            None
        }
    };

    let mailer = match build_mailer(&cfg) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Failed to initialise mailer: {e}");
            std::process::exit(1);
        }
    };
    let store = Arc::new(InMemoryOtpStore::new());
    let state = AppState { otp: OtpService::new(store, mailer, cfg.sender(), cfg.otp_ttl) };
    let openapi = ApiDoc::openapi();

    let server = HttpServer::new(move || {
        let mut app = App::new()
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()));
        if let Some(handle) = metrics.clone() {
            app = app
                .app_data(web::Data::new(handle))
                .route("/metrics", web::get().to(render_metrics));
        }
        app
    })
    .bind((cfg.bind_addr.as_str(), cfg.port))?;

    info!("Listening on http://{}:{}", cfg.bind_addr, cfg.port);

    server.run().await
}
