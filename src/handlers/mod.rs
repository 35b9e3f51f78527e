pub mod health;
pub mod stock;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::config)
        .service(web::scope("/api/v1").configure(stock::config))
        // 兼容旧版前端的路由前缀
        .service(web::scope("/api").configure(stock::config));
}
