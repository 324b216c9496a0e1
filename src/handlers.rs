use crate::client::SupplyValue;
use crate::{error::ApiError, state::CommonState};
use axum::{extract::State, http::HeaderMap, Json};
use axum_macros::debug_handler;

#[debug_handler]
pub async fn get_total_supply(
    _headers: HeaderMap,
    State(state): State<CommonState>,
) -> Result<Json<SupplyValue>, ApiError> {
    let supply = state.client.get_total_supply().await.map_err(|e| {
        tracing::error!("Failed to get total supply: {}", e);
        ApiError::TotalSupply
    })?;

    Ok(Json(supply))
}

#[debug_handler]
pub async fn get_circulating_supply(
    _headers: HeaderMap,
    State(state): State<CommonState>,
) -> Result<Json<SupplyValue>, ApiError> {
    let supply = state.client.get_circulating_supply().await.map_err(|e| {
        tracing::error!("Failed to get circulating supply: {}", e);
        ApiError::CirculatingSupply
    })?;

    Ok(Json(supply))
}
