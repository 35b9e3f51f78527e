//! 股票接口处理器
//!
//! 只做参数绑定、默认值填充和状态码映射，业务逻辑全部在服务层

use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;

use crate::error::ServiceError;
use crate::models::{
    ApiResponse, IndicatorRequest, SectorList, StockListQuery, StockListResponse,
};
use crate::services::indicators;
use crate::services::market_data::MarketDataService;

/// 按错误类型映射 HTTP 状态码
fn error_response(err: &ServiceError) -> HttpResponse {
    let body = ApiResponse::<serde_json::Value>::error(err.to_string());
    match err {
        ServiceError::NotFound(_) => HttpResponse::NotFound().json(body),
        ServiceError::InvalidRequest(_) => HttpResponse::BadRequest().json(body),
        ServiceError::SourceUnavailable(_) => HttpResponse::BadGateway().json(body),
        ServiceError::CacheUnavailable(_) => HttpResponse::InternalServerError().json(body),
    }
}

pub async fn get_stocks(
    service: web::Data<MarketDataService>,
    query: web::Query<StockListQuery>,
) -> Result<HttpResponse> {
    let req = query.into_inner().into_request();

    match service.get_stocks(&req).await {
        Ok((stocks, total)) => {
            let total_pages = total.div_ceil(req.page_size);
            let response = StockListResponse {
                stocks,
                total,
                page: req.page,
                page_size: req.page_size,
                total_pages,
            };
            Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn get_stock(
    service: web::Data<MarketDataService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let symbol = path.into_inner();

    match service.get_stock(&symbol).await {
        Ok(stock) => Ok(HttpResponse::Ok().json(ApiResponse::success(stock))),
        Err(e) => Ok(error_response(&e)),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    pub days: Option<usize>,
}

pub async fn get_stock_chart(
    service: web::Data<MarketDataService>,
    path: web::Path<String>,
    query: web::Query<ChartQuery>,
) -> Result<HttpResponse> {
    let symbol = path.into_inner();

    // 天数非法时回退到默认 90 天
    let days = match query.days {
        Some(d) if (1..=365).contains(&d) => d,
        _ => 90,
    };

    match service.get_stock_chart(&symbol, days).await {
        Ok(chart) => Ok(HttpResponse::Ok().json(ApiResponse::success(chart))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn get_sectors(service: web::Data<MarketDataService>) -> Result<HttpResponse> {
    let sectors = SectorList {
        sectors: service.get_sectors(),
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(sectors)))
}

/// 导出当前筛选结果为 CSV（不分页，上限 10000 条）
pub async fn export_stocks(
    service: web::Data<MarketDataService>,
    query: web::Query<StockListQuery>,
) -> Result<HttpResponse> {
    let mut req = query.into_inner().into_request();
    req.page = 1;
    req.page_size = 10_000;

    match service.get_stocks(&req).await {
        Ok((stocks, _)) => {
            let mut csv = String::from("Symbol,Name,Price,Change%,RSI,Trend,Signal,Equilibrium,Sector\n");
            for stock in &stocks {
                csv.push_str(&format!(
                    "{},{},{:.2},{:.2},{:.1},{},{},{:.1}%,{}\n",
                    stock.symbol,
                    stock.name,
                    stock.price,
                    stock.change_percent,
                    stock.rsi,
                    stock.trend.as_str(),
                    stock.signal.as_str(),
                    stock.price_to_equilibrium,
                    stock.sector,
                ));
            }

            Ok(HttpResponse::Ok()
                .content_type("text/csv")
                .insert_header(("Content-Disposition", "attachment; filename=stocks.csv"))
                .body(csv))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn calculate_indicators(body: web::Json<IndicatorRequest>) -> Result<HttpResponse> {
    let req = body.into_inner();
    let period = match req.period {
        Some(p) if p > 0 => p,
        _ => 200,
    };

    let result = indicators::synthesize_indicators(&req.symbol, period);
    Ok(HttpResponse::Ok().json(ApiResponse::success(result)))
}

pub async fn refresh_data(service: web::Data<MarketDataService>) -> Result<HttpResponse> {
    match service.refresh_all().await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success("Data refreshed successfully"))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/stocks", web::get().to(get_stocks))
        .route("/stocks/{symbol}", web::get().to(get_stock))
        .route("/stocks/{symbol}/chart", web::get().to(get_stock_chart))
        .route("/sectors", web::get().to(get_sectors))
        .route("/export", web::get().to(export_stocks))
        .route("/indicators", web::post().to(calculate_indicators))
        .route("/refresh", web::post().to(refresh_data));
}
