use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::db::{charities, crises};
use crate::error::AppResult;
use crate::extract::{PathParam, QueryParams};
use crate::models::Charity;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct ListCharitiesQuery {
    pub crisis_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CharityList {
    pub charities: Vec<Charity>,
}

/// GET /api/charities
pub async fn list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListCharitiesQuery>,
) -> AppResult<Json<CharityList>> {
    let conn = state.db.get()?;
    let charities = charities::list_charities(&conn, query.crisis_id)?;
    Ok(Json(CharityList { charities }))
}

/// GET /api/charities/by-crisis/{crisis_id}
pub async fn by_crisis(
    State(state): State<AppState>,
    PathParam(crisis_id): PathParam<i64>,
) -> AppResult<Json<CharityList>> {
    let conn = state.db.get()?;
    crises::get_crisis(&conn, crisis_id)?;
    let charities = charities::list_charities(&conn, Some(crisis_id))?;
    Ok(Json(CharityList { charities }))
}
