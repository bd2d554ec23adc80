use std::sync::Arc;

use clap::Parser;
use greenroute::{
    config::Config, create_router, engine::EmissionEngine, geocoding::NominatimGeocoder,
    http::build_client, routing::GoogleRoutesClient, AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "greenroute=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    if config.google_api_key.is_empty() {
        tracing::warn!("GOOGLE_API_KEY is not set, route requests will fail");
    }

    let factors = config.load_factor_table().expect("load emission factor table");
    let http = build_client(config.request_timeout(), &config.contact_email)
        .expect("build http client");
    let router = GoogleRoutesClient::new(http.clone(), &config.routes_url, &config.google_api_key);
    let geocoder = NominatimGeocoder::new(http, &config.nominatim_url, config.geocode_cache_size);

    let engine = EmissionEngine::new(
        Arc::new(factors),
        Arc::new(router),
        Arc::new(geocoder),
        config.engine_settings(),
    );
    tracing::info!("engine settings: {:?}", engine.settings());

    let state = AppState {
        engine: Arc::new(engine),
    };
    let app = create_router(state);

    tracing::info!("starting greenroute on http://{}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .expect("bind listener");
    axum::serve(listener, app).await.expect("serve");
}
