pub mod admin;
pub mod content;
pub mod health;
pub mod url;

pub use admin::admin_routes;
pub use content::content_routes;
pub use health::{AppStartTime, HealthService, health_routes};
pub use url::{redirect_routes, url_routes};
