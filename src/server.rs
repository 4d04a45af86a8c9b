//! HTTP surface for the app

use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
  extract::{rejection::JsonRejection, State},
  http::{header, HeaderValue, Method, StatusCode},
  response::{IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};
use log::{error, info, warn};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::request::{ErrorBody, GenerateBody, GenerateResponse, ModeInfo, ModesResponse};
use crate::StudioClient;

#[derive(Clone)]
struct AppState
{   client: Arc<StudioClient>
}

/// Routes plus CORS; state is the shared orchestrator.
/// The CORS layer answers every OPTIONS request with 200 itself.
pub fn router(client: Arc<StudioClient>) -> Router
{   let cors = cors_layer(&client.config().server.allowed_origins);
    Router::new()
      .route(
        "/api/generate",
        post(generate).fallback(method_not_allowed)
      )
      .route("/api/modes", get(modes))
      .route("/health", get(health))
      .layer(cors)
      .with_state(AppState { client })
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer
{   let origin = if allowed_origins.is_empty()
    {   AllowOrigin::any()
    } else
    {   let origins: Vec<HeaderValue> = allowed_origins
          .iter()
          .filter_map(|o| match HeaderValue::from_str(o)
          {   Ok(v) => Some(v)
            , Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", o);
                None
              }
          })
          .collect();
        AllowOrigin::list(origins)
    };
    CorsLayer::new()
      .allow_origin(origin)
      .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
      .allow_headers([header::CONTENT_TYPE])
}

/// Bind and serve until Ctrl-C
pub async fn serve(client: Arc<StudioClient>, addr: SocketAddr)
  -> std::io::Result<()>
{   let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("mstar-studio listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(client))
      .with_graceful_shutdown(shutdown_signal())
      .await
}

async fn shutdown_signal()
{   if let Err(e) = tokio::signal::ctrl_c().await
    {   error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Dropped with the connection if the caller goes away, which
/// cancels the in-flight backend call with it.
async fn generate(
  State(state): State<AppState>
, payload: Result<Json<GenerateBody>, JsonRejection>
) -> Response
{   let Json(body) = match payload
    {   Ok(body) => body
      , Err(rejection) => {
          warn!("Rejected generate body: {}", rejection.body_text());
          return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::message("Invalid request body"))
          ).into_response();
        }
    };

    if let Err(e) = state.client.ensure_ready()
    {   return error_response(&e);
    }
    let default_language = state.client.config().default_language;
    let request = match body.into_request(default_language)
    {   Ok(request) => request
      , Err(e) => return error_response(&e)
    };

    match state.client.generate(&request).await
    {   Ok(result) => {
          (StatusCode::OK, Json(GenerateResponse::from(result))).into_response()
        }
      , Err(e) => error_response(&e)
    }
}

fn error_response(e: &crate::error::Error) -> Response
{   match e.kind()
    {   crate::ErrorKind::Configuration => error!("Generate failed: {}", e)
      , _ => warn!("Generate failed: {}", e)
    }
    let status = StatusCode::from_u16(e.status_code())
      .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorBody::from(e))).into_response()
}

async fn method_not_allowed() -> impl IntoResponse
{   (
      StatusCode::METHOD_NOT_ALLOWED,
      Json(ErrorBody::message("Method not allowed")),
    )
}

async fn modes(State(state): State<AppState>) -> Json<ModesResponse>
{   let config = state.client.config();
    Json(ModesResponse
    {   modes: crate::Mode::ALL
          .iter()
          .map(|m| ModeInfo
          {   name: m.wire_name().to_string()
            , item_count: config.count_for(*m)
          })
          .collect()
      , languages: crate::Language::ALL
          .iter()
          .map(|l| l.wire_name().to_string())
          .collect()
      , default_language: config.default_language.wire_name().to_string()
    })
}

async fn health(State(state): State<AppState>) -> impl IntoResponse
{   Json(json!({
      "status": "ok",
      "backends": state.client.backends().len(),
    }))
}
