//! HTTP API
//!
//! - `services`：各端点处理函数及路由注册
//! - `middleware`：管理认证与请求计时
//! - `error`：`StashError` 的 HTTP 渲染

pub mod error;
pub mod middleware;
pub mod services;

use actix_web::web;

use services::{admin_routes, content_routes, health_routes, redirect_routes, url_routes};

/// 注册全部路由
///
/// 需要的 app data：`ContentService`、`UrlService`、`Database`、`AppStartTime`
pub fn configure(cfg: &mut web::ServiceConfig, admin_secret: &str) {
    cfg.configure(health_routes)
        .configure(redirect_routes)
        .service(
            web::scope("/api")
                .configure(|cfg| admin_routes(cfg, admin_secret))
                .configure(content_routes)
                .configure(url_routes),
        );
}
