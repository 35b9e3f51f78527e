use actix_web::{web, HttpResponse, Result};
use serde::{Deserialize, Serialize};

use crate::models::ApiResponse;

/// 健康检查载荷
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
}

pub async fn health_check() -> Result<HttpResponse> {
    let response = ApiResponse::success(HealthStatus {
        status: "healthy".to_string(),
        service: "equilibrio-backend".to_string(),
    });
    Ok(HttpResponse::Ok().json(response))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试健康检查返回 200 且带服务名
    #[actix_web::test]
    async fn test_health_check() {
        let response = health_check().await.unwrap();
        assert_eq!(response.status(), actix_web::http::StatusCode::OK);
    }

    /// 测试健康载荷的 JSON 字段
    #[test]
    fn test_health_payload_fields() {
        let payload = HealthStatus {
            status: "healthy".to_string(),
            service: "equilibrio-backend".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "equilibrio-backend");
    }
}
