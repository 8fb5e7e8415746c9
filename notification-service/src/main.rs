use axum::{
    Router,
    routing::{get, post, put},
};
use notification_service::{
    api::{
        handler::{notification, recipient, shift},
        state::NotificationAppState,
    },
    config::NotificationConfig,
    domain::{dispatcher::Dispatcher, recipient::RecipientService},
    infrastructure::client::HttpBackendClient,
};
use std::{env, net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        shift::classify,
        recipient::find_all,
        recipient::find_active,
        recipient::create,
        recipient::set_selection,
        recipient::set_permanent,
        recipient::batch_update,
        notification::dispatch,
        notification::dispatch_async,
        notification::manual,
    ),
    tags(
        (name = "Shifts", description = "Shift duration and journey classification"),
        (name = "Recipients", description = "Notification recipient administration"),
        (name = "Notifications", description = "Change notification dispatch"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    let _guard = shared::telemetry::init_telemetry("notification-service");

    let port = env::var("SERVER_PORT").unwrap_or_else(|_| "8082".to_string());
    let config_path = env::var("NOTIFICATION_CONFIG_PATH")
        .unwrap_or_else(|_| "notification.toml".to_string());
    let config =
        NotificationConfig::load(&config_path).expect("Failed to load notification config");
    let timezone = config.timezone();

    let cancel = CancellationToken::new();
    let backend =
        Arc::new(HttpBackendClient::new(&config.backend).with_cancellation(cancel.clone()));

    let dispatcher = Arc::new(Dispatcher::new(
        backend.clone(),
        backend.clone(),
        backend.clone(),
        timezone,
    ));
    let recipient_service = Arc::new(RecipientService::new(backend));

    let state = Arc::new(NotificationAppState {
        dispatcher: dispatcher.clone(),
        recipient_service,
        timezone,
    });

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(10)
        .key_extractor(SmartIpKeyExtractor)
        .use_headers()
        .finish()
        .expect("Failed to build governor config");

    let app = Router::new()
        .route(
            "/headpat",
            get(|| async {
                axum::Json(shared::responses::HeadpatResponse {
                    message: "nyaa~! all systems operational, senpai! (=^-w-^=)",
                })
            }),
        )
        .route("/api/v1/shifts/classify", post(shift::classify))
        .route(
            "/api/v1/recipients",
            get(recipient::find_all).post(recipient::create),
        )
        .route("/api/v1/recipients/active", get(recipient::find_active))
        .route("/api/v1/recipients/batch", put(recipient::batch_update))
        .route(
            "/api/v1/recipients/{id}/selection",
            put(recipient::set_selection),
        )
        .route(
            "/api/v1/recipients/{id}/permanent",
            put(recipient::set_permanent),
        )
        .route("/api/v1/notifications/dispatch", post(notification::dispatch))
        .route(
            "/api/v1/notifications/dispatch/async",
            post(notification::dispatch_async),
        )
        .route("/api/v1/notifications/manual", post(notification::manual))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Rate limiting (per-IP, 2 req/s with burst of 10)
        .layer(GovernorLayer::new(governor_conf))
        .layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(tower_http::LatencyUnit::Millis),
                ),
        )
        .with_state(state);

    tracing::info!(%timezone, backend = %config.backend.base_url, "notification-service listening on 0.0.0.0:{port}");

    let listener = TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("Failed to bind");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shared::shutdown::shutdown_signal())
    .await
    .expect("Oppsie! Server crashed!");

    // Server stopped accepting new requests; let spawned dispatches drain
    shared::shutdown::drain_tasks(
        dispatcher.task_tracker(),
        &cancel,
        shared::shutdown::DEFAULT_SHUTDOWN_TIMEOUT,
    )
    .await;
    tracing::info!("notification-service shut down");
}
