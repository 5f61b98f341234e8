use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use destination_ranker::config::AppConfig;
use destination_ranker::error::AppError;
use destination_ranker::ranking::{
    export_csv_to_path, CacheTtls, CatalogError, CircuitBreakerConfig, DestinationCatalog,
    DestinationScoreResult, HistorySnapshot, InMemoryCache, InMemoryHistoryStore, MetricResolver,
    RankingService, StaticQuoteProvider, TracingSink,
};
use destination_ranker::telemetry;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

type Service = RankingService<StaticQuoteProvider, InMemoryCache, InMemoryHistoryStore>;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
    service: Arc<Service>,
}

#[derive(Parser, Debug)]
#[command(
    name = "Destination Ranker",
    about = "Rank travel destinations by blending live market data against long-run baselines",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one ranking cycle and print the result
    Rank(RankArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
    /// Override the configured catalog file
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Optional current-quote JSON document standing in for live providers
    #[arg(long)]
    quotes: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RankArgs {
    /// Override the configured catalog file
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Optional current-quote JSON document standing in for live providers
    #[arg(long)]
    quotes: Option<PathBuf>,
    /// Evaluation date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
    /// Write the ranking to a CSV file
    #[arg(long)]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Rank(args) => run_rank(args).await,
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn build_service(
    catalog_path: &std::path::Path,
    quotes_path: Option<&std::path::Path>,
) -> Result<Arc<Service>, AppError> {
    let catalog = Arc::new(DestinationCatalog::from_path(catalog_path)?);
    // No quote document means every market metric degrades to its baseline.
    let provider = match quotes_path {
        Some(path) => StaticQuoteProvider::from_path(path)?,
        None => StaticQuoteProvider::default(),
    };
    let events = Arc::new(TracingSink);
    let resolver = Arc::new(MetricResolver::new(
        Arc::new(provider),
        Arc::new(InMemoryCache::default()),
        CacheTtls::default(),
        CircuitBreakerConfig::default(),
        events.clone(),
    ));
    let service = RankingService::new(
        catalog,
        resolver,
        Arc::new(InMemoryHistoryStore::default()),
        events,
    )
    .map_err(CatalogError::Weights)?;
    Ok(Arc::new(service))
}

async fn run_rank(args: RankArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let catalog_path = args.catalog.unwrap_or(config.ranker.catalog_path);
    let service = build_service(&catalog_path, args.quotes.as_deref())?;

    let now = match args.date {
        Some(date) => date
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or_else(Utc::now),
        None => Utc::now(),
    };

    let results = service.run_cycle(now).await;
    print!("{}", render_rankings(&results));

    if let Some(path) = args.export {
        export_csv_to_path(&results, &path)?;
        println!("\nExported {} rows to {}", results.len(), path.display());
    }

    Ok(())
}

fn render_rankings(results: &[DestinationScoreResult]) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "Destination ranking ({} scored)", results.len());
    for (index, result) in results.iter().enumerate() {
        let badges = result
            .badges
            .iter()
            .map(|badge| badge.label())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "{:>2}. {:<20} {:>5.1}  change {:>+6.1}%  confidence {:?}",
            index + 1,
            result.name,
            result.final_score,
            result.overall_change_pct,
            result.data_quality.confidence
        );
        for (metric, sub) in &result.sub_scores {
            let _ = writeln!(
                out,
                "      {:<16} {:>5.1} {}",
                metric.label(),
                sub.blended,
                sub.trend.arrow()
            );
        }
        if !badges.is_empty() {
            let _ = writeln!(out, "      badges: {badges}");
        }
    }
    out
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(catalog) = args.catalog.take() {
        config.ranker.catalog_path = catalog;
    }

    telemetry::init(&config.telemetry)?;

    let service = build_service(&config.ranker.catalog_path, args.quotes.as_deref())?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
        service,
    };

    let app = api_router(state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "destination ranker ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/rankings", get(rankings_endpoint))
        .route("/api/v1/rankings/:key/history", get(history_endpoint))
        .route("/api/v1/breakers", get(breakers_endpoint))
        .with_state(state)
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn rankings_endpoint(State(state): State<AppState>) -> Json<Vec<DestinationScoreResult>> {
    let results = state.service.run_cycle(Utc::now()).await;
    Json(results)
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_history_days")]
    days: i64,
}

fn default_history_days() -> i64 {
    30
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    destination: String,
    since: NaiveDate,
    snapshots: Vec<HistorySnapshot>,
}

async fn history_endpoint(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let key = key.as_str().into();
    if state.service.catalog().get(&key).is_none() {
        let body = Json(json!({ "error": format!("unknown destination '{key}'") }));
        return Ok((StatusCode::NOT_FOUND, body).into_response());
    }

    let days = query.days.clamp(1, 3650);
    let since = history_window_start(Utc::now(), days);
    let snapshots = state.service.history_since(&key, since)?;
    let body = Json(HistoryResponse {
        destination: key.to_string(),
        since,
        snapshots,
    });
    Ok((StatusCode::OK, body).into_response())
}

fn history_window_start(now: DateTime<Utc>, days: i64) -> NaiveDate {
    now.date_naive() - Duration::days(days)
}

async fn breakers_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "breakers": state.service.circuit_statuses() }))
}
