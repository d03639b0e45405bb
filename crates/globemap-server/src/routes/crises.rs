use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::db::crises::{self, CrisisFilter};
use crate::error::AppResult;
use crate::extract::{PathParam, QueryParams};
use crate::models::{Category, Crisis, Severity};
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct ListCrisesQuery {
    pub q: Option<String>,
    pub category: Option<Category>,
    pub severity: Option<Severity>,
}

#[derive(Debug, Serialize)]
pub struct CrisisList {
    pub crises: Vec<Crisis>,
    pub total: usize,
}

/// GET /api/crises
pub async fn list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListCrisesQuery>,
) -> AppResult<Json<CrisisList>> {
    let filter = CrisisFilter {
        text: query.q,
        category: query.category,
        severity: query.severity,
    };

    let conn = state.db.get()?;
    let crises = crises::search_crises(&conn, &filter)?;

    Ok(Json(CrisisList {
        total: crises.len(),
        crises,
    }))
}

/// GET /api/crises/{id}
pub async fn get(State(state): State<AppState>, PathParam(id): PathParam<i64>) -> AppResult<Json<Crisis>> {
    let conn = state.db.get()?;
    Ok(Json(crises::get_crisis(&conn, id)?))
}
