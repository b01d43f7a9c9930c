use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::state::SharedState;

/// Liveness response, carrying the chain this process resolved its
/// configuration against at startup.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub chain_id: String,
}

/// `GET /health`
///
/// Answers from local state only; the node is not queried. The chain id
/// lets an operator confirm which network a running instance scrapes.
pub async fn health(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            chain_id: state.config.chain_id.clone(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_serializes_status_and_chain_id() {
        let response = HealthResponse {
            status: "ok",
            chain_id: "testchain-1".to_string(),
        };
        let json = serde_json::to_value(&response).expect("serializes");
        assert_eq!(json["status"], "ok");
        assert_eq!(json["chain_id"], "testchain-1");
    }
}
