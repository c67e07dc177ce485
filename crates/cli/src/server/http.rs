//! Debug/DoH HTTP endpoint: cache dump, config reload, and an optional
//! wire-format DNS-over-HTTPS handler.

use axum::body::Bytes;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use hickory_proto::op::Message;
use horizon_dns_domain::Config;
use horizon_dns_infrastructure::dns::edns;
use horizon_dns_infrastructure::dns::server::SharedDispatcher;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, info, warn};

const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

#[derive(Clone)]
pub struct AppState {
    pub runtime: SharedDispatcher,
    pub config_path: Arc<str>,
    pub doh_enabled: bool,
}

pub async fn serve(address: &str, state: AppState) -> anyhow::Result<()> {
    let mut router = Router::new()
        .route("/cache", get(dump_cache))
        .route("/reload", post(reload));

    if state.doh_enabled {
        router = router.route("/dns-query", post(serve_doh));
        info!("DNS-over-HTTPS endpoint enabled");
    }

    let listener = tokio::net::TcpListener::bind(address).await?;
    info!(address = %address, "HTTP listener ready");
    axum::serve(
        listener,
        router
            .with_state(state)
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

#[derive(Deserialize)]
struct DumpParams {
    /// `nobody=false` includes the rendered answer bodies.
    nobody: Option<bool>,
}

#[derive(Serialize)]
struct DumpResponse {
    length: usize,
    capacity: usize,
    body: HashMap<String, Vec<String>>,
}

async fn dump_cache(State(state): State<AppState>, Query(params): Query<DumpParams>) -> Response {
    let dispatcher = state.runtime.load_full();
    if dispatcher.cache.capacity() == 0 {
        return (StatusCode::BAD_REQUEST, "cache not enabled").into_response();
    }

    let include_body = !params.nobody.unwrap_or(true);
    let (body, length) = dispatcher.cache.dump(include_body);
    axum::Json(DumpResponse {
        length,
        capacity: dispatcher.cache.capacity(),
        body,
    })
    .into_response()
}

/// Rebuild the runtime snapshot from the config file and swap it in. The
/// old snapshot keeps serving queries already in flight.
async fn reload(State(state): State<AppState>) -> Response {
    let rebuilt = Config::load(&state.config_path)
        .map_err(anyhow::Error::from)
        .and_then(|config| crate::bootstrap::runtime::build_dispatcher(&config));

    match rebuilt {
        Ok(dispatcher) => {
            state.runtime.store(Arc::new(dispatcher));
            info!("Configuration reloaded");
            "Reloaded".into_response()
        }
        Err(e) => {
            warn!(error = %e, "Reload failed, keeping the running snapshot");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("reload failed: {e:#}")).into_response()
        }
    }
}

async fn serve_doh(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query = match Message::from_vec(&body) {
        Ok(message) => message,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let dispatcher = state.runtime.load_full();

    if let Some(question) = query.queries().first() {
        if dispatcher
            .reject_qtypes
            .contains(&u16::from(question.query_type()))
        {
            debug!(name = %question.name(), "Rejected DoH question type");
            return (StatusCode::FORBIDDEN, "Rejected").into_response();
        }
    }

    // A local proxy in front of us hides the real client; trust its
    // X-Forwarded-For only when the connection itself is from a reserved
    // network.
    let mut inbound_ip = peer.ip().to_string();
    if edns::is_reserved(peer.ip()) {
        if let Some(forwarded) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.parse::<IpAddr>().is_ok())
        {
            inbound_ip = forwarded.to_string();
        }
    }

    match dispatcher.exchange(&query, &inbound_ip).await {
        Some(response) => match response.to_vec() {
            Ok(wire) => (
                [(header::CONTENT_TYPE, DNS_MESSAGE_CONTENT_TYPE)],
                wire,
            )
                .into_response(),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        },
        None => (StatusCode::INTERNAL_SERVER_ERROR, "No response").into_response(),
    }
}
