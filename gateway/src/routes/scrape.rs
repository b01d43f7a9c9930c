//! Scrape endpoint handlers.
//!
//! Every handler answers `200 OK` with the text exposition format. A
//! scrape that could not collect anything (bad address, no data) still
//! answers `200` with whatever body the engine produced, possibly
//! empty; the failure detail goes to the log, not the caller. Each
//! request runs under a span carrying a fresh request id.

use std::future::Future;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::Instrument;
use uuid::Uuid;

use exporter::{EXPOSITION_CONTENT_TYPE, scrape};

use crate::state::SharedState;

/// Query string for the per-address endpoints.
#[derive(Deserialize)]
pub struct AddressQuery {
    pub address: String,
}

async fn respond<F>(endpoint: &'static str, collect: F) -> Response
where
    F: Future<Output = String>,
{
    let request_id = Uuid::new_v4();
    let started = Instant::now();
    let body = collect
        .instrument(tracing::info_span!("scrape", %request_id, endpoint))
        .await;
    tracing::info!(
        %request_id,
        endpoint,
        elapsed_seconds = started.elapsed().as_secs_f64(),
        "request processed"
    );
    ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body).into_response()
}

/// `GET /metrics` -- the combined scrape.
pub async fn single(State(state): State<SharedState>) -> Response {
    respond("single", scrape::single(&state.client, &state.config)).await
}

/// `GET /metrics/general`
pub async fn general(State(state): State<SharedState>) -> Response {
    respond("general", scrape::general(&state.client, &state.config)).await
}

/// `GET /metrics/validator?address=...`
pub async fn validator(
    State(state): State<SharedState>,
    Query(query): Query<AddressQuery>,
) -> Response {
    respond(
        "validator",
        scrape::validator(&state.client, &state.config, &query.address),
    )
    .await
}

/// `GET /metrics/validators`
pub async fn validators(State(state): State<SharedState>) -> Response {
    respond(
        "validators",
        scrape::validators(&state.client, &state.config),
    )
    .await
}

/// `GET /metrics/wallet?address=...`
pub async fn wallet(
    State(state): State<SharedState>,
    Query(query): Query<AddressQuery>,
) -> Response {
    respond(
        "wallet",
        scrape::wallet(&state.client, &state.config, &query.address),
    )
    .await
}

/// `GET /metrics/delegator?address=...`
pub async fn delegator(
    State(state): State<SharedState>,
    Query(query): Query<AddressQuery>,
) -> Response {
    respond(
        "delegator",
        scrape::delegator(&state.client, &state.config, &query.address),
    )
    .await
}

/// `GET /metrics/params`
pub async fn params(State(state): State<SharedState>) -> Response {
    respond("params", scrape::params(&state.client, &state.config)).await
}

/// `GET /metrics/proposals`
pub async fn proposals(State(state): State<SharedState>) -> Response {
    respond("proposals", scrape::proposals(&state.client, &state.config)).await
}

/// `GET /metrics/upgrade`
pub async fn upgrade(State(state): State<SharedState>) -> Response {
    respond("upgrade", scrape::upgrade(&state.client, &state.config)).await
}

/// `GET /metrics/oracle?address=...`
pub async fn oracle(
    State(state): State<SharedState>,
    Query(query): Query<AddressQuery>,
) -> Response {
    respond(
        "oracle",
        scrape::oracle(&state.client, &state.config, &query.address),
    )
    .await
}
