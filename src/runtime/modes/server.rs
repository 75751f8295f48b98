//! Server mode
//!
//! Builds the actix-web application (CORS, rate limiting, timing, routes)
//! and runs it until actix receives a stop signal, then shuts down the
//! background tasks.

use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError};
use actix_web::dev::ServiceRequest;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{App, HttpResponse, HttpResponseBuilder, HttpServer, ResponseError, web};
use anyhow::{Result, anyhow};
use governor::NotUntil;
use governor::clock::{Clock, DefaultClock, QuantaInstant};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::middleware::TimingMiddleware;
use crate::api::services::AppStartTime;
use crate::config::{ServerConfig, StaticConfig};
use crate::errors::StashError;
use crate::runtime::lifetime::{prepare_startup, shutdown_background_tasks};

/// 按客户端 IP 限流，超限时返回统一的 JSON 错误
#[derive(Clone, Copy, Debug)]
pub struct ClientIpKeyExtractor;

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> Result<Self::Key, Self::KeyExtractionError> {
        req.connection_info()
            .realip_remote_addr()
            .map(str::to_string)
            .ok_or_else(|| SimpleKeyExtractionError::new("Unable to extract client IP"))
    }

    fn exceed_rate_limit_response(
        &self,
        negative: &NotUntil<QuantaInstant>,
        mut response: HttpResponseBuilder,
    ) -> HttpResponse {
        let wait_secs = negative.wait_time_from(DefaultClock::default().now()).as_secs();
        debug!(wait_secs, "Rate limit exceeded");
        let err = StashError::rate_limited(format!(
            "rate limit exceeded, retry in {}s",
            wait_secs
        ));
        response
            .insert_header((CONTENT_TYPE, "application/json; charset=utf-8"))
            .json(serde_json::json!({ "error": err.message(), "code": err.code() }))
    }
}

/// Build CORS middleware from `server.allowed_origins`
///
/// 空列表只允许同源；包含 `*` 时允许任意来源
fn build_cors_middleware(config: &ServerConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_any_header()
        .max_age(3600);

    if config.allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_any_origin();
    } else {
        for origin in &config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

/// JSON 请求体上限：留出转义和字段名的余量，超长笔记交给服务层拒绝
fn json_limit(max_note_bytes: usize) -> usize {
    max_note_bytes.saturating_mul(4).saturating_add(64 * 1024)
}

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(config: &StaticConfig) -> Result<()> {
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    let mut startup = prepare_startup(config).await.map_err(|e| {
        tracing::error!("Server startup failed: {:#}", e);
        e
    })?;
    startup.start_sweeper(Duration::from_secs(config.tasks.sweep_interval_secs.max(1)));

    let content_service = web::Data::new(startup.content_service.clone());
    let url_service = web::Data::new(startup.url_service.clone());
    let database = web::Data::new(startup.database.clone());
    let app_start_time = web::Data::new(app_start_time);

    let governor_config = GovernorConfigBuilder::default()
        .requests_per_second(config.security.rate_limit_per_sec.max(1))
        .burst_size(config.security.rate_limit_burst.max(1))
        .key_extractor(ClientIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("Invalid rate limit configuration"))?;

    if config.security.admin_secret.is_empty() {
        info!("Admin API is disabled (security.admin_secret not set)");
    } else {
        info!("Admin API available at /api/admin");
    }

    let server_config = config.server.clone();
    let admin_secret = config.security.admin_secret.clone();
    let json_limit = json_limit(config.storage.max_note_bytes);
    let cpu_count = server_config.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let cors_config = server_config.clone();
    let server = HttpServer::new(move || {
        let json_config = web::JsonConfig::default()
            .limit(json_limit)
            .error_handler(|err, _req| StashError::bad_request(err.to_string()).into());

        App::new()
            .wrap(Governor::new(&governor_config))
            .wrap(build_cors_middleware(&cors_config))
            .wrap(TimingMiddleware)
            .app_data(content_service.clone())
            .app_data(url_service.clone())
            .app_data(database.clone())
            .app_data(app_start_time.clone())
            .app_data(json_config)
            .configure(|cfg| crate::api::configure(cfg, &admin_secret))
            .default_service(web::to(|| async {
                StashError::not_found("route not found").error_response()
            }))
    })
    .keep_alive(Duration::from_secs(30))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", server_config.host, server_config.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server.bind(&bind_address)?.run();

    // actix 自行处理 SIGINT / SIGTERM 并优雅停止
    let result = server.await;
    warn!("HTTP server stopped, shutting down background tasks");

    shutdown_background_tasks(startup.tasks, startup.database).await;
    result.map_err(Into::into)
}
