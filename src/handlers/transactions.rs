use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::AppError;
use crate::schemas::{ErrorResponse, TransactionListResponse, TransactionSchema, LIST_SUCCESS_CODE};
use crate::services::transaction_engine::ListQuery;
use crate::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListTransactionsParams {
    /// Exact reference number.
    pub reference_number: Option<String>,
    /// Exact merchant id.
    pub customer_id: Option<String>,
    /// Canonical status or a gateway status label.
    pub status: Option<String>,
    /// Inclusive lower bound, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`.
    pub end_date: Option<String>,
    /// Case-insensitive substring over the identifiers.
    pub search: Option<String>,
    /// 1-based page. Unparseable values fall back to 1.
    pub page: Option<String>,
    /// Page size, at most 100. Unparseable values fall back to 10.
    pub limit: Option<String>,
}

impl From<ListTransactionsParams> for ListQuery {
    fn from(params: ListTransactionsParams) -> Self {
        ListQuery {
            reference_number: params.reference_number,
            customer_id: params.customer_id,
            status: params.status,
            start_date: params.start_date,
            end_date: params.end_date,
            search: params.search,
            page: lenient_int(params.page),
            limit: lenient_int(params.limit),
        }
    }
}

fn lenient_int(raw: Option<String>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse().ok())
}

#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    params(ListTransactionsParams),
    responses(
        (status = 200, description = "One page of transactions, newest first", body = TransactionListResponse),
        (status = 400, description = "Invalid status or date", body = ErrorResponse)
    ),
    tag = "Transactions"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(params): Query<ListTransactionsParams>,
) -> Result<Json<TransactionListResponse>, AppError> {
    let page = state.engine.list(params.into()).await?;

    Ok(Json(TransactionListResponse {
        response_code: LIST_SUCCESS_CODE.to_string(),
        response_message: "Success".to_string(),
        data: page.records.iter().map(TransactionSchema::from).collect(),
        pagination: page.pagination,
    }))
}
