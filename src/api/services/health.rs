use actix_web::{HttpResponse, Responder, web};
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{error, trace};

use crate::storage::Database;

/// 应用启动时间
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

/// Health Service
///
/// 直接探测数据库连接，不经过业务服务层
pub struct HealthService;

impl HealthService {
    /// 服务说明
    pub async fn root() -> impl Responder {
        HttpResponse::Ok().json(json!({
            "message": "stashlink api",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "/health",
                "upload": "POST /api/upload",
                "note": "POST /api/note",
                "content": "GET /api/content/{id}",
                "shorten": "POST /api/shorten",
                "redirect": "GET /s/{code}",
            },
        }))
    }

    pub async fn health_check(
        db: web::Data<Database>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        let database = match tokio::time::timeout(Duration::from_secs(5), db.ping()).await {
            Ok(Ok(())) => "healthy",
            Ok(Err(e)) => {
                error!("Database health check failed: {}", e);
                "unhealthy"
            }
            Err(_) => {
                error!("Database health check timeout");
                "unhealthy"
            }
        };

        let now = chrono::Utc::now();
        let uptime = (now - app_start_time.start_datetime).num_seconds().max(0);
        let healthy = database == "healthy";

        let body = json!({
            "status": if healthy { "ok" } else { "unhealthy" },
            "timestamp": now.to_rfc3339(),
            "uptime": uptime,
            "checks": { "database": database },
            "responseTimeMs": start_time.elapsed().as_millis() as u64,
        });

        if healthy {
            HttpResponse::Ok().json(body)
        } else {
            HttpResponse::ServiceUnavailable().json(body)
        }
    }
}

/// Health 路由配置
pub fn health_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(HealthService::root))
        .route("/health", web::get().to(HealthService::health_check))
        .route("/health", web::head().to(HealthService::health_check));
}
