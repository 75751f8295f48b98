use actix_service::{Service, Transform};
use actix_web::{
    Error, ResponseError,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{trace, warn};

use crate::errors::StashError;

pub const ADMIN_SECRET_HEADER: &str = "X-Admin-Secret";

/// Admin authentication middleware
///
/// 请求头 `X-Admin-Secret` 与配置的密钥做常量时间比较。
/// 未配置密钥时整个管理端点关闭（403）。
#[derive(Clone)]
pub struct AdminAuth {
    secret: Arc<str>,
}

impl AdminAuth {
    pub fn new(secret: impl AsRef<str>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminAuthMiddleware {
            service: Rc::new(service),
            secret: self.secret.clone(),
        }))
    }
}

pub struct AdminAuthMiddleware<S> {
    service: Rc<S>,
    secret: Arc<str>,
}

impl<S> AdminAuthMiddleware<S> {
    fn reject<B>(req: ServiceRequest, err: StashError) -> ServiceResponse<EitherBody<B>> {
        req.into_response(err.error_response().map_into_right_body())
    }

    fn secret_matches(provided: &str, expected: &str) -> bool {
        provided.as_bytes().ct_eq(expected.as_bytes()).into()
    }
}

impl<S, B> Service<ServiceRequest> for AdminAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let secret = self.secret.clone();

        Box::pin(async move {
            if secret.is_empty() {
                return Ok(Self::reject(
                    req,
                    StashError::forbidden("admin endpoint disabled"),
                ));
            }

            let provided = req
                .headers()
                .get(ADMIN_SECRET_HEADER)
                .and_then(|h| h.to_str().ok())
                .unwrap_or("");

            if !Self::secret_matches(provided, &secret) {
                let ip = req
                    .connection_info()
                    .realip_remote_addr()
                    .unwrap_or("unknown")
                    .to_string();
                warn!(ip = %ip, path = %req.path(), "Unauthorized admin access attempt");
                return Ok(Self::reject(req, StashError::unauthorized("unauthorized")));
            }

            trace!(path = %req.path(), "Admin request authorized");
            let res = srv.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, http::StatusCode, test, web};

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().body("ok")
    }

    #[actix_rt::test]
    async fn test_admin_auth() {
        let app = test::init_service(
            App::new().service(
                web::scope("/admin")
                    .wrap(AdminAuth::new("s3cret"))
                    .route("/ping", web::get().to(ok)),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/admin/ping").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/admin/ping")
            .insert_header((ADMIN_SECRET_HEADER, "wrong"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/admin/ping")
            .insert_header((ADMIN_SECRET_HEADER, "s3cret"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_rt::test]
    async fn test_empty_secret_disables_admin() {
        let app = test::init_service(
            App::new().service(
                web::scope("/admin")
                    .wrap(AdminAuth::new(""))
                    .route("/ping", web::get().to(ok)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/admin/ping")
            .insert_header((ADMIN_SECRET_HEADER, ""))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "admin endpoint disabled");
        assert_eq!(json["code"], "FORBIDDEN");
    }
}
