//! API route definitions.

use super::error::ApiError;
use super::state::AppState;
use crate::analysis::aggregator::aggregate;
use crate::analysis::correlation::correlate;
use crate::analysis::hexgrid::MAX_RESOLUTION;
use crate::analysis::runner::{build_report, ticket_anomalies};
use crate::analysis::towers::{find_tower, status_distribution, TowerDetail, TowerFilter, TowerStats};
use crate::analysis::trend::{forecast, ForecastSummary, MAX_HORIZON};
use crate::dataset::source::{DatasetKind, Origin};
use crate::dataset::Field;
use crate::detect::{classify, severity_score};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

type ApiResult = Result<Json<Value>, ApiError>;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/report", get(report))
        .route("/forecast", get(forecast_tickets))
        .route("/anomalies", get(anomalies))
        .route("/correlation", get(correlation))
        .route("/regions", get(regions))
        .route("/severity", get(severity))
        .route("/towers", get(towers))
        .route("/towers/{id}", get(tower))
}

fn meta(source: Origin) -> Value {
    json!({
        "source": source,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "primary_source": state.source.primary_name()
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn report(State(state): State<AppState>) -> ApiResult {
    let (towers, series) = tokio::try_join!(
        state.load(DatasetKind::Towers),
        state.load(DatasetKind::TicketSeries)
    )?;
    let report = build_report(&towers.dataset, &series.dataset, &state.analytics)?;

    // sample wins if either half came from it
    let source = if towers.origin == Origin::Sample || series.origin == Origin::Sample {
        Origin::Sample
    } else {
        Origin::Warehouse
    };
    Ok(Json(json!({ "data": report, "meta": meta(source) })))
}

#[derive(Debug, Deserialize)]
struct ForecastParams {
    window: Option<usize>,
    horizon: Option<usize>,
}

async fn forecast_tickets(
    State(state): State<AppState>,
    params: Result<Query<ForecastParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params?;
    let window = params.window.unwrap_or(state.analytics.forecast_window);
    let horizon = params.horizon.unwrap_or(state.analytics.forecast_horizon);
    if horizon == 0 || horizon > MAX_HORIZON {
        return Err(ApiError::BadRequest(format!(
            "horizon must be between 1 and {} days, got {}",
            MAX_HORIZON, horizon
        )));
    }

    let series = state.load(DatasetKind::TicketSeries).await?;
    let history = series.dataset.series(Field::TicketCount);
    let predicted = forecast(&history, window, horizon)?;
    let summary = ForecastSummary::from_forecast(&history, &predicted, state.analytics.recent_days);

    Ok(Json(json!({
        "data": { "forecast": predicted, "summary": summary },
        "meta": meta(series.origin)
    })))
}

#[derive(Debug, Deserialize)]
struct AnomalyParams {
    threshold: Option<f64>,
}

async fn anomalies(
    State(state): State<AppState>,
    params: Result<Query<AnomalyParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params?;
    let threshold = params.threshold.unwrap_or(state.analytics.anomaly_threshold);
    if !(threshold.is_finite() && threshold > 0.0) {
        return Err(ApiError::BadRequest(format!(
            "threshold must be a positive number, got {}",
            threshold
        )));
    }

    let series = state.load(DatasetKind::TicketSeries).await?;
    let flagged = ticket_anomalies(&series.dataset.series(Field::TicketCount), threshold);
    let mut meta = meta(series.origin);
    meta["threshold"] = json!(threshold);
    meta["total"] = json!(flagged.len());

    Ok(Json(json!({ "data": flagged, "meta": meta })))
}

#[derive(Debug, Deserialize)]
struct CorrelationParams {
    a: Option<String>,
    b: Option<String>,
}

fn parse_field(raw: Option<&str>, default: Field) -> Result<Field, ApiError> {
    raw.map_or(Ok(default), |s| s.parse().map_err(ApiError::BadRequest))
}

async fn correlation(
    State(state): State<AppState>,
    params: Result<Query<CorrelationParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params?;
    let a = parse_field(params.a.as_deref(), Field::FailureRate)?;
    let b = parse_field(params.b.as_deref(), Field::TicketCount)?;

    let towers = state.load(DatasetKind::Towers).await?;
    let result = correlate(&towers.dataset, a, b);

    Ok(Json(json!({
        "data": {
            "a": a,
            "b": b,
            "coefficient": result.coefficient,
            "p_value": result.p_value,
            "pairs": result.pairs,
            "significant": result.is_significant(0.05)
        },
        "meta": meta(towers.origin)
    })))
}

#[derive(Debug, Deserialize)]
struct RegionParams {
    resolution: Option<u8>,
}

async fn regions(
    State(state): State<AppState>,
    params: Result<Query<RegionParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params?;
    let resolution = params.resolution.unwrap_or(state.analytics.hex_resolution);
    if resolution > MAX_RESOLUTION {
        return Err(ApiError::BadRequest(format!(
            "resolution must be at most {}",
            MAX_RESOLUTION
        )));
    }

    let towers = state.load(DatasetKind::Towers).await?;
    let cells: Vec<_> = aggregate(&towers.dataset, Field::Latitude, Field::Longitude, resolution)
        .into_values()
        .collect();
    let mut meta = meta(towers.origin);
    meta["resolution"] = json!(resolution);
    meta["total"] = json!(cells.len());

    Ok(Json(json!({ "data": cells, "meta": meta })))
}

#[derive(Debug, Deserialize)]
struct SeverityParams {
    failure_rate: f64,
    ticket_count: i64,
}

async fn severity(params: Result<Query<SeverityParams>, QueryRejection>) -> ApiResult {
    let Query(params) = params?;
    let level = classify(params.failure_rate, params.ticket_count);
    Ok(Json(json!({
        "data": {
            "severity": level,
            "score": severity_score(params.failure_rate, params.ticket_count),
            "color": level.color()
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    })))
}

async fn towers(
    State(state): State<AppState>,
    filter: Result<Query<TowerFilter>, QueryRejection>,
) -> ApiResult {
    let Query(filter) = filter?;
    let towers = state.load(DatasetKind::Towers).await?;
    let today = chrono::Utc::now().date_naive();

    let matched = filter.apply(&towers.dataset);
    let rows: Vec<TowerDetail> = matched.iter().map(|r| TowerDetail::new(r, today)).collect();
    let mut meta = meta(towers.origin);
    meta["total"] = json!(rows.len());
    meta["stats"] = json!(TowerStats::from_dataset(&matched));
    meta["status_distribution"] = json!(status_distribution(&matched));

    Ok(Json(json!({ "data": rows, "meta": meta })))
}

async fn tower(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let towers = state.load(DatasetKind::Towers).await?;
    let row = find_tower(&towers.dataset, &id)
        .ok_or_else(|| ApiError::NotFound(format!("no tower with id {}", id)))?;
    let detail = TowerDetail::new(row, chrono::Utc::now().date_naive());

    Ok(Json(json!({ "data": detail, "meta": meta(towers.origin) })))
}
