use super::AppState;
use crate::api::BarWindow;
use crate::backtest::{run_universe, BacktestConfig, BacktestEngine, BacktestResult, UniverseReport};
use crate::data::{normalize, BarSeries, FrameRow, IndicatorFrame, Interval};
use crate::scanner::{ScanReport, Screener};
use crate::strategy::{create_strategy, describe, Strategy, STRATEGY_NAMES};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// Default history for daily charts
const DAILY_RANGE: &str = "1y";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Upstream(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Upstream(e) => {
                warn!("Upstream failure: {:#}", e);
                (StatusCode::BAD_GATEWAY, format!("{:#}", e))
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct BarsQuery {
    symbol: Option<String>,
    interval: Option<String>,
    range: Option<String>,
    /// Daily history in whole years, sent as explicit dates
    years: Option<u32>,
    /// Only return the last `rows` rows
    rows: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BacktestQuery {
    symbol: Option<String>,
    strategy: Option<String>,
    years: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UniverseQuery {
    strategy: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ScanQuery {
    symbols: Option<String>,
    interval: Option<String>,
    strategy: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StrategyInfo {
    name: &'static str,
    description: &'static str,
}

/// Candle for Lightweight Charts, time in unix seconds
#[derive(Debug, Serialize)]
pub struct ChartCandle {
    time: i64,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
}

#[derive(Debug, Serialize)]
pub struct BarsResponse {
    symbol: String,
    interval: Interval,
    candles: Vec<ChartCandle>,
}

#[derive(Debug, Serialize)]
pub struct IndicatorsResponse {
    symbol: String,
    interval: Interval,
    from: Option<DateTime<Utc>>,
    rows: Vec<FrameRow>,
}

fn symbol_param(symbol: Option<&str>) -> Result<String, ApiError> {
    symbol
        .map(normalize)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing 'symbol' parameter".to_string()))
}

fn interval_param(interval: Option<&str>, default: &str) -> Result<Interval, ApiError> {
    interval
        .unwrap_or(default)
        .parse()
        .map_err(|e: anyhow::Error| ApiError::BadRequest(e.to_string()))
}

fn strategy_param(
    state: &AppState,
    name: Option<&str>,
    default: &str,
) -> Result<Box<dyn Strategy>, ApiError> {
    let name = name.unwrap_or(default);
    create_strategy(name, &state.config.strategy)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown strategy '{}'", name)))
}

/// Window for a chart request. Year spans go out as a date window since
/// the chart API only knows a few fixed multi-year ranges.
fn chart_window(
    interval: Interval,
    range: Option<String>,
    years: Option<u32>,
    intraday_range: &str,
    today: NaiveDate,
) -> BarWindow {
    if let Some(range) = range {
        return BarWindow::Range(range);
    }
    match years {
        Some(years) if !interval.is_intraday() => BarWindow::last_years(years, today),
        _ if interval.is_intraday() => BarWindow::Range(intraday_range.to_string()),
        _ => BarWindow::Range(DAILY_RANGE.to_string()),
    }
}

async fn fetch_series(
    state: &AppState,
    symbol: &str,
    interval: Interval,
    range: Option<String>,
    years: Option<u32>,
) -> Result<BarSeries, ApiError> {
    let window = chart_window(
        interval,
        range,
        years,
        &state.config.scanner.range,
        Utc::now().date_naive(),
    );

    state
        .provider
        .fetch_bars(symbol, interval, &window)
        .await
        .map_err(ApiError::Upstream)
}

async fn universe_symbols(state: &AppState, limit: Option<usize>) -> Result<Vec<String>, ApiError> {
    let mut symbols = state.symbols().await.map_err(ApiError::Upstream)?;
    if let Some(limit) = limit.or(state.config.universe.limit) {
        symbols.truncate(limit);
    }
    Ok(symbols)
}

pub async fn list_strategies() -> Json<Vec<StrategyInfo>> {
    Json(
        STRATEGY_NAMES
            .iter()
            .map(|&name| StrategyInfo {
                name,
                description: describe(name),
            })
            .collect(),
    )
}

pub async fn list_symbols(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.symbols().await.map_err(ApiError::Upstream)?))
}

pub async fn get_bars(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BarsQuery>,
) -> Result<Json<BarsResponse>, ApiError> {
    let symbol = symbol_param(query.symbol.as_deref())?;
    let interval = interval_param(query.interval.as_deref(), "1d")?;
    let series = fetch_series(&state, &symbol, interval, query.range, query.years).await?;

    let candles = series
        .candles
        .iter()
        .map(|c| ChartCandle {
            time: c.timestamp.timestamp(),
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
        })
        .collect();

    Ok(Json(BarsResponse {
        symbol: series.symbol,
        interval,
        candles,
    }))
}

pub async fn get_indicators(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BarsQuery>,
) -> Result<Json<IndicatorsResponse>, ApiError> {
    let symbol = symbol_param(query.symbol.as_deref())?;
    let interval = interval_param(query.interval.as_deref(), "1d")?;
    let series = fetch_series(&state, &symbol, interval, query.range, query.years).await?;

    let frame = IndicatorFrame::compute(&series, &state.config.indicators);
    let rows = match query.rows {
        Some(n) => frame.tail(n),
        None => frame.rows(),
    };

    Ok(Json(IndicatorsResponse {
        symbol: series.symbol,
        interval,
        from: rows.first().map(|r| r.time),
        rows,
    }))
}

pub async fn run_backtest(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BacktestQuery>,
) -> Result<Json<BacktestResult>, ApiError> {
    let symbol = symbol_param(query.symbol.as_deref())?;
    let strategy = strategy_param(
        &state,
        query.strategy.as_deref(),
        &state.config.backtest.default_strategy,
    )?;

    let years = query.years.unwrap_or(state.config.backtest.history_years);
    if years == 0 {
        return Err(ApiError::BadRequest("'years' must be at least 1".to_string()));
    }

    let config = BacktestConfig::last_years(years, Utc::now().date_naive())
        .with_max_hold_bars(state.config.backtest.max_hold_bars);
    let engine = BacktestEngine::new(config, strategy, state.config.indicators.clone());

    let result = engine
        .run(state.provider.as_ref(), &symbol)
        .await
        .map_err(ApiError::Upstream)?;

    Ok(Json(result))
}

pub async fn run_universe_backtest(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UniverseQuery>,
) -> Result<Json<UniverseReport>, ApiError> {
    let strategy = strategy_param(
        &state,
        query.strategy.as_deref(),
        &state.config.backtest.default_strategy,
    )?;
    let symbols = universe_symbols(&state, query.limit).await?;

    let config = BacktestConfig::last_years(state.config.backtest.history_years, Utc::now().date_naive())
        .with_max_hold_bars(state.config.backtest.max_hold_bars);
    let engine = BacktestEngine::new(config, strategy, state.config.indicators.clone());

    let report = run_universe(&engine, state.provider.as_ref(), &symbols).await;
    Ok(Json(report))
}

pub async fn run_scan(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScanQuery>,
) -> Result<Json<ScanReport>, ApiError> {
    let strategy = strategy_param(
        &state,
        query.strategy.as_deref(),
        &state.config.scanner.default_strategy,
    )?;
    let interval = interval_param(query.interval.as_deref(), &state.config.scanner.interval)?;

    let requested: Vec<String> = query
        .symbols
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(normalize)
        .filter(|s| !s.is_empty())
        .collect();
    let symbols = if requested.is_empty() {
        universe_symbols(&state, None).await?
    } else {
        requested
    };

    let screener = Screener::new(&state.config.scanner, strategy, state.config.indicators.clone())
        .map_err(|e| ApiError::BadRequest(format!("{:#}", e)))?
        .with_interval(interval);

    Ok(Json(screener.run(state.provider.as_ref(), &symbols).await))
}
