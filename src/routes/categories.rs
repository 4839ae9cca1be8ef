use axum::{extract::State, Json};

use crate::{error::AppResult, state::AppState, types::Category};

pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.engine.categories().await?))
}
