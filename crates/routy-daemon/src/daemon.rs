//! Routy Daemon HTTP service

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use validator::Validate;

use routy_core::util::parse_timestamp;
use routy_core::{EdgeInfo, Location, Order, RoutePlan, RoutyError, Vehicle};
use routy_forecast::{
    DepartureQuery, OptimalDeparture, TrafficInfo, TravelTimePrediction,
    DEFAULT_FORECAST_HOURS, DEFAULT_SEARCH_WINDOW_HOURS,
};
use routy_rl::TrainingRecord;

use crate::config::Config;
use crate::planner::{AgentStatus, PathInfo, Planner, PlannerStats};
use crate::validation::{
    validate_location, validate_orders, validate_timestamp, ValidatedJson, DEFAULT_BODY_LIMIT,
};

/// Threshold used by the congested-routes endpoint when none is given
pub const DEFAULT_CONGESTION_THRESHOLD: f64 = 0.5;

/// Shared daemon state for API handlers
#[derive(Clone)]
pub struct DaemonState {
    pub config: Arc<Config>,
    pub planner: Arc<Mutex<Planner>>,
}

impl DaemonState {
    pub fn new(config: Config, planner: Planner) -> Self {
        Self {
            config: Arc::new(config),
            planner: Arc::new(Mutex::new(planner)),
        }
    }

    /// Run `f` against the planner on the blocking pool. Congestion lookups
    /// and training may block for a while.
    async fn with_planner<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Planner) -> routy_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let planner = Arc::clone(&self.planner);
        tokio::task::spawn_blocking(move || {
            let mut guard = planner.blocking_lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| {
            error!("Planner task failed: {}", e);
            ApiError::internal(format!("planner task failed: {e}"))
        })?
        .map_err(ApiError::from)
    }
}

/// Main Routy Daemon
pub struct RoutyDaemon {
    config: Config,
    state: DaemonState,
    shutdown: tokio::sync::broadcast::Sender<()>,
}

impl RoutyDaemon {
    /// Create a new daemon. The planner is built on the blocking pool since
    /// the live traffic client is a blocking HTTP client.
    pub async fn new(config: Config) -> Result<Self> {
        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

        let planner_config = config.clone();
        let planner = tokio::task::spawn_blocking(move || Planner::from_config(&planner_config))
            .await
            .context("Planner construction panicked")??;

        Ok(Self {
            state: DaemonState::new(config.clone(), planner),
            config,
            shutdown: shutdown_tx,
        })
    }

    pub fn state(&self) -> DaemonState {
        self.state.clone()
    }

    /// Run the daemon main loop
    pub async fn run(&self) -> Result<()> {
        info!("Routy Daemon running on {}", self.config.daemon.bind_address);

        let addr: std::net::SocketAddr = self
            .config
            .daemon
            .bind_address
            .parse()
            .with_context(|| format!("Invalid bind address {}", self.config.daemon.bind_address))?;

        let app = create_router(self.state.clone());
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let mut shutdown_rx = self.shutdown.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Graceful shutdown
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down daemon...");
        let _ = self.shutdown.send(());

        // Wait for any in-flight planner call
        let planner = self.state.planner.lock().await;
        let stats = planner.stats();
        info!(
            "Daemon shutdown complete ({} routes optimized, {} orders)",
            stats.total_routes_optimized, stats.total_orders_processed
        );
        Ok(())
    }
}

/// Create the API router with state
pub fn create_router(state: DaemonState) -> Router {
    let cors = cors_layer(&state.config.daemon.allowed_origins);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/route/optimize", post(optimize_route))
        .route("/api/v1/route/:route_id", get(get_route))
        .route("/api/v1/stats", get(get_stats))
        .route("/api/v1/travel/predict", post(predict_travel))
        .route("/api/v1/travel/optimal-departure", post(optimal_departure))
        .route("/api/v1/travel/forecast", get(hourly_forecast))
        .route("/api/v1/travel/traffic", get(traffic_info))
        .route("/api/v1/network/edges", get(list_edges).post(add_edge))
        .route("/api/v1/network/congested", get(congested_edges))
        .route("/api/v1/network/path", get(shortest_path))
        .route("/api/v1/network/traffic", post(update_traffic))
        .route("/api/v1/agent/train", post(train_agent))
        .route("/api/v1/agent/history", get(training_history))
        .route("/api/v1/agent/status", get(agent_status))
        // Applied innermost-first so the stack matches ServiceBuilder order
        // (trace -> cors -> body limit); each Router::layer boxes the body.
        .layer(RequestBodyLimitLayer::new(DEFAULT_BODY_LIMIT))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

// ---- errors ----

/// Error body shared by every failing endpoint
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub error_type: &'static str,
}

impl ApiError {
    fn internal(message: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
            error_type: "internal_error",
        }
    }
}

impl From<RoutyError> for ApiError {
    fn from(err: RoutyError) -> Self {
        let status = match &err {
            RoutyError::NotFound(_) => StatusCode::NOT_FOUND,
            RoutyError::NoPath { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RoutyError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RoutyError::DimensionMismatch { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
            error_type: err.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.message,
            "error_type": self.error_type
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

fn parse_optional_time(value: Option<&str>) -> routy_core::Result<Option<chrono::NaiveDateTime>> {
    value.map(parse_timestamp).transpose()
}

// ---- request / response types ----

/// Orders to sequence, either as a bare array or wrapped in `{"orders": [..]}`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(from = "OrdersBody")]
pub struct OptimizeRouteRequest {
    #[validate(length(min = 1, max = 1000), custom(function = "validate_orders"))]
    pub orders: Vec<Order>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OrdersBody {
    Bare(Vec<Order>),
    Wrapped { orders: Vec<Order> },
}

impl From<OrdersBody> for OptimizeRouteRequest {
    fn from(body: OrdersBody) -> Self {
        match body {
            OrdersBody::Bare(orders) | OrdersBody::Wrapped { orders } => Self { orders },
        }
    }
}

/// Stored plan as served by the route lookup
#[derive(Debug, Clone, Serialize)]
pub struct RouteDetails {
    #[serde(flatten)]
    pub plan: RoutePlan,
    pub status: &'static str,
    pub current_position: Option<Location>,
}

impl From<RoutePlan> for RouteDetails {
    fn from(plan: RoutePlan) -> Self {
        let current_position = plan.stops.first().cloned();
        Self {
            plan,
            status: "active",
            current_position,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PredictTravelRequest {
    #[validate(custom(function = "validate_location"))]
    pub start: String,
    #[validate(custom(function = "validate_location"))]
    pub end: String,
    #[validate(custom(function = "validate_timestamp"))]
    pub departure_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OptimalDepartureRequest {
    #[validate(custom(function = "validate_location"))]
    pub start: String,
    #[validate(custom(function = "validate_location"))]
    pub end: String,
    #[validate(custom(function = "validate_timestamp"))]
    pub earliest_departure: Option<String>,
    #[validate(custom(function = "validate_timestamp"))]
    pub latest_arrival: Option<String>,
    #[validate(range(min = 1, max = 48))]
    pub hours_window: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutePairQuery {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastQuery {
    pub start: String,
    pub end: String,
    pub hours: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastResponse {
    pub start: Location,
    pub end: Location,
    pub hours: u32,
    pub forecast: Vec<TravelTimePrediction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CongestedQuery {
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddEdgeRequest {
    #[validate(custom(function = "validate_location"))]
    pub start: String,
    #[validate(custom(function = "validate_location"))]
    pub end: String,
    #[validate(range(exclusive_min = 0.0))]
    pub travel_time: f64,
}

/// Without endpoints every edge is refreshed from the live source
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTrafficRequest {
    #[validate(custom(function = "validate_location"))]
    pub start: Option<String>,
    #[validate(custom(function = "validate_location"))]
    pub end: Option<String>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub delay_factor: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateTrafficResponse {
    pub updated_edges: usize,
    pub delay_factor: f64,
    pub source: String,
    pub edges: Vec<EdgeInfo>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TrainRequest {
    #[validate(range(min = 1))]
    pub episodes: Option<u32>,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub learning_rate: Option<f64>,
    #[validate(length(min = 1, max = 1000), custom(function = "validate_orders"))]
    pub orders: Option<Vec<Order>>,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
}

// ---- handlers ----

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "Routy API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn optimize_route(
    State(state): State<DaemonState>,
    ValidatedJson(request): ValidatedJson<OptimizeRouteRequest>,
) -> ApiResult<RoutePlan> {
    let plan = state
        .with_planner(move |p| p.optimize_route(&request.orders))
        .await?;
    Ok(Json(plan))
}

async fn get_route(
    State(state): State<DaemonState>,
    Path(route_id): Path<String>,
) -> ApiResult<RouteDetails> {
    let plan = state.with_planner(move |p| p.route(&route_id)).await?;
    Ok(Json(plan.into()))
}

async fn get_stats(State(state): State<DaemonState>) -> ApiResult<PlannerStats> {
    let stats = state.with_planner(|p| Ok(p.stats())).await?;
    Ok(Json(stats))
}

async fn predict_travel(
    State(state): State<DaemonState>,
    ValidatedJson(request): ValidatedJson<PredictTravelRequest>,
) -> ApiResult<TravelTimePrediction> {
    let departure = parse_optional_time(request.departure_time.as_deref())?;
    let prediction = state
        .with_planner(move |p| p.predict_travel(&request.start, &request.end, departure))
        .await?;
    Ok(Json(prediction))
}

async fn optimal_departure(
    State(state): State<DaemonState>,
    ValidatedJson(request): ValidatedJson<OptimalDepartureRequest>,
) -> ApiResult<OptimalDeparture> {
    let mut query = DepartureQuery::new(request.start, request.end)
        .window(request.hours_window.unwrap_or(DEFAULT_SEARCH_WINDOW_HOURS));
    if let Some(earliest) = parse_optional_time(request.earliest_departure.as_deref())? {
        query = query.earliest(earliest);
    }
    if let Some(latest) = parse_optional_time(request.latest_arrival.as_deref())? {
        query = query.latest_arrival(latest);
    }

    let result = state
        .with_planner(move |p| p.optimal_departure(&query))
        .await?;
    Ok(Json(result))
}

async fn hourly_forecast(
    State(state): State<DaemonState>,
    Query(query): Query<ForecastQuery>,
) -> ApiResult<ForecastResponse> {
    let hours = query.hours.unwrap_or(DEFAULT_FORECAST_HOURS);
    let (start, end) = (query.start.clone(), query.end.clone());
    let forecast = state
        .with_planner(move |p| p.hourly_forecast(&start, &end, hours))
        .await?;
    Ok(Json(ForecastResponse {
        start: query.start,
        end: query.end,
        hours,
        forecast,
    }))
}

async fn traffic_info(
    State(state): State<DaemonState>,
    Query(query): Query<RoutePairQuery>,
) -> ApiResult<TrafficInfo> {
    let info = state
        .with_planner(move |p| Ok(p.traffic_info(&query.start, &query.end)))
        .await?;
    Ok(Json(info))
}

async fn list_edges(State(state): State<DaemonState>) -> ApiResult<Value> {
    let edges = state.with_planner(|p| Ok(p.edges())).await?;
    Ok(Json(json!({ "count": edges.len(), "edges": edges })))
}

async fn congested_edges(
    State(state): State<DaemonState>,
    Query(query): Query<CongestedQuery>,
) -> ApiResult<Value> {
    let threshold = query.threshold.unwrap_or(DEFAULT_CONGESTION_THRESHOLD);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(RoutyError::InvalidInput(format!(
            "threshold must be between 0 and 1, got {threshold}"
        ))
        .into());
    }
    let edges = state.with_planner(move |p| Ok(p.congested(threshold))).await?;
    Ok(Json(json!({
        "threshold": threshold,
        "count": edges.len(),
        "edges": edges
    })))
}

async fn shortest_path(
    State(state): State<DaemonState>,
    Query(query): Query<RoutePairQuery>,
) -> ApiResult<PathInfo> {
    let info = state
        .with_planner(move |p| p.path(&query.start, &query.end))
        .await?;
    Ok(Json(info))
}

async fn add_edge(
    State(state): State<DaemonState>,
    ValidatedJson(request): ValidatedJson<AddEdgeRequest>,
) -> std::result::Result<(StatusCode, Json<EdgeInfo>), ApiError> {
    let edge = state
        .with_planner(move |p| p.add_edge(&request.start, &request.end, request.travel_time))
        .await?;
    info!("Edge added: {} <-> {} ({} min)", edge.start, edge.end, edge.base_weight);
    Ok((StatusCode::CREATED, Json(edge)))
}

async fn update_traffic(
    State(state): State<DaemonState>,
    ValidatedJson(request): ValidatedJson<UpdateTrafficRequest>,
) -> ApiResult<UpdateTrafficResponse> {
    let response = state
        .with_planner(move |p| match (request.start, request.end, request.delay_factor) {
            (Some(start), Some(end), Some(delay)) => {
                let edge = p.set_edge_traffic(&start, &end, delay)?;
                Ok(UpdateTrafficResponse {
                    updated_edges: 1,
                    delay_factor: edge.delay_factor,
                    source: "manual".to_string(),
                    edges: vec![edge],
                })
            }
            (None, None, None) => {
                let delay = p.refresh_traffic();
                let edges = p.edges();
                Ok(UpdateTrafficResponse {
                    updated_edges: edges.len(),
                    delay_factor: delay,
                    source: p.source_name().to_string(),
                    edges,
                })
            }
            _ => Err(RoutyError::InvalidInput(
                "give start, end and delay_factor together, or none of them".to_string(),
            )),
        })
        .await?;
    Ok(Json(response))
}

async fn train_agent(
    State(state): State<DaemonState>,
    ValidatedJson(request): ValidatedJson<TrainRequest>,
) -> ApiResult<TrainingRecord> {
    let record = state
        .with_planner(move |p| {
            p.train(
                request.episodes,
                request.learning_rate,
                request.orders,
                request.vehicles,
            )
        })
        .await?;
    Ok(Json(record))
}

async fn training_history(State(state): State<DaemonState>) -> ApiResult<Value> {
    let history = state.with_planner(|p| Ok(p.training_history())).await?;
    Ok(Json(json!({ "count": history.len(), "history": history })))
}

async fn agent_status(State(state): State<DaemonState>) -> ApiResult<Value> {
    let (status, source): (AgentStatus, String) = state
        .with_planner(|p| Ok((p.agent_status(), p.source_name().to_string())))
        .await?;
    Ok(Json(json!({
        "agent": status,
        "traffic_source": source
    })))
}
