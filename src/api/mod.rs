use axum::{
    Router,
    extract::{
        Json, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    BondModel, CatalogError, RankedBond, Scenario, TAX_RATE, default_catalog, exclusion_list,
    load_catalog, rank_bonds,
};

const DEFAULT_INVESTMENT: f64 = 100_000.0;
const DEFAULT_HORIZON_MONTHS: u32 = 12;
const DEFAULT_INFLATION_RATE: f64 = 4.5;
const DEFAULT_REFERENCE_RATE: f64 = 5.75;
const MAX_HORIZON_MONTHS: u32 = 1_200;

#[derive(Parser, Debug)]
#[command(
    name = "bonds",
    about = "Compare treasury bond returns (fixed, reference-rate and inflation-linked)",
    after_help = "Run `bonds serve [port] [catalog.json]` to start the HTTP API instead."
)]
struct Cli {
    #[arg(
        long,
        default_value_t = DEFAULT_INVESTMENT,
        help = "Amount invested, in currency units"
    )]
    investment: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_HORIZON_MONTHS,
        help = "Holding horizon in months"
    )]
    months: u32,
    #[arg(
        long,
        allow_negative_numbers = true,
        default_value_t = DEFAULT_INFLATION_RATE,
        help = "Assumed annual inflation in percent"
    )]
    inflation_rate: f64,
    #[arg(
        long,
        allow_negative_numbers = true,
        default_value_t = DEFAULT_REFERENCE_RATE,
        help = "Assumed central-bank reference rate in percent"
    )]
    reference_rate: f64,
    #[arg(long, help = "Reinvest the proceeds at every maturity until the horizon")]
    auto_reinvest: bool,
    #[arg(long, help = "Leave out bonds reserved for family benefit recipients")]
    exclude_family: bool,
    #[arg(long, value_name = "NAME", help = "Bond name to leave out; repeatable")]
    exclude: Vec<String>,
    #[arg(
        long,
        value_name = "PATH",
        help = "JSON catalog to use instead of the built-in offer"
    )]
    catalog: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    investment: Option<f64>,
    #[serde(alias = "monthsToWithdraw")]
    months: Option<u32>,
    #[serde(alias = "inflationRate")]
    inflation: Option<f64>,
    #[serde(alias = "nbpRate")]
    reference_rate: Option<f64>,
    auto_reinvest: Option<bool>,
    #[serde(alias = "excludeFamilyBonds")]
    exclude_family: Option<bool>,
    exclude: Option<String>,
}

#[derive(Debug)]
struct ApiRequest {
    scenario: Scenario,
    excluded: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    scenario: Scenario,
    excluded: Vec<String>,
    results: Vec<RankedBond>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Clone)]
struct AppState {
    catalog: Arc<Vec<BondModel>>,
}

fn build_scenario(cli: &Cli) -> Result<Scenario, String> {
    if !cli.investment.is_finite() || cli.investment <= 0.0 {
        return Err("--investment must be > 0".to_string());
    }

    if cli.months > MAX_HORIZON_MONTHS {
        return Err(format!("--months must be <= {MAX_HORIZON_MONTHS}"));
    }

    for (name, rate) in [
        ("--inflation-rate", cli.inflation_rate),
        ("--reference-rate", cli.reference_rate),
    ] {
        if !rate.is_finite() || rate <= -100.0 {
            return Err(format!("{name} must be > -100"));
        }
    }

    Ok(Scenario {
        investment: cli.investment,
        horizon_months: cli.months,
        inflation_rate: cli.inflation_rate,
        reference_rate: cli.reference_rate,
        auto_reinvest: cli.auto_reinvest,
        tax_rate: TAX_RATE,
    })
}

fn build_request(cli: &Cli) -> Result<ApiRequest, String> {
    Ok(ApiRequest {
        scenario: build_scenario(cli)?,
        excluded: exclusion_list(cli.exclude_family, &cli.exclude),
    })
}

pub fn resolve_catalog(path: Option<&Path>) -> Result<Vec<BondModel>, CatalogError> {
    let catalog = match path {
        Some(path) => load_catalog(path)?,
        None => default_catalog()?,
    };
    let source = path.map_or_else(|| "built-in".to_string(), |p| p.display().to_string());
    info!(bonds = catalog.len(), %source, "catalog loaded");
    Ok(catalog)
}

pub fn run_cli() -> Result<(), String> {
    let cli = Cli::parse();
    let catalog = resolve_catalog(cli.catalog.as_deref()).map_err(|e| e.to_string())?;
    let request = build_request(&cli)?;
    let results = rank_bonds(&catalog, &request.scenario, &request.excluded);
    let response = build_simulate_response(request, results);
    let json = serde_json::to_string_pretty(&response)
        .map_err(|e| format!("Failed to serialize results: {e}"))?;
    println!("{json}");
    Ok(())
}

pub fn router(catalog: Vec<BondModel>) -> Router {
    let state = AppState {
        catalog: Arc::new(catalog),
    };
    Router::new()
        .route("/api/bonds", get(bonds_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(port: u16, catalog: Vec<BondModel>) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(catalog);

    let listener = TcpListener::bind(addr).await?;
    info!("Bond calculator HTTP API listening on http://{addr}");
    info!("Local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

async fn bonds_handler(State(state): State<AppState>) -> Response {
    json_response(StatusCode::OK, state.catalog.as_slice())
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(
    State(state): State<AppState>,
    payload: Result<Query<SimulatePayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => simulate_handler_impl(&state, payload).await,
        Err(rejection) => malformed_payload(&rejection.body_text()),
    }
}

async fn simulate_post_handler(
    State(state): State<AppState>,
    payload: Result<Json<SimulatePayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => simulate_handler_impl(&state, payload).await,
        Err(rejection) => malformed_payload(&rejection.body_text()),
    }
}

fn malformed_payload(msg: &str) -> Response {
    warn!(error = %msg, "malformed simulate payload");
    error_response(StatusCode::BAD_REQUEST, msg)
}

async fn simulate_handler_impl(state: &AppState, payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(error = %msg, "rejected simulate request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    let results = rank_bonds(&state.catalog, &request.scenario, &request.excluded);
    debug!(
        bonds = results.len(),
        months = request.scenario.horizon_months,
        auto_reinvest = request.scenario.auto_reinvest,
        "simulated scenario"
    );
    json_response(StatusCode::OK, build_simulate_response(request, results))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.investment {
        cli.investment = v;
    }
    if let Some(v) = payload.months {
        cli.months = v;
    }
    if let Some(v) = payload.inflation {
        cli.inflation_rate = v;
    }
    if let Some(v) = payload.reference_rate {
        cli.reference_rate = v;
    }
    if let Some(v) = payload.auto_reinvest {
        cli.auto_reinvest = v;
    }
    if let Some(v) = payload.exclude_family {
        cli.exclude_family = v;
    }
    if let Some(v) = payload.exclude {
        cli.exclude = v.split(',').map(str::to_string).collect();
    }

    build_request(&cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        investment: DEFAULT_INVESTMENT,
        months: DEFAULT_HORIZON_MONTHS,
        inflation_rate: DEFAULT_INFLATION_RATE,
        reference_rate: DEFAULT_REFERENCE_RATE,
        auto_reinvest: false,
        exclude_family: false,
        exclude: Vec::new(),
        catalog: None,
    }
}

fn build_simulate_response(request: ApiRequest, results: Vec<RankedBond>) -> SimulateResponse {
    SimulateResponse {
        scenario: request.scenario,
        excluded: request.excluded,
        results,
    }
}
