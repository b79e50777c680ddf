//! Cash drawer and bank balances.

use axum::extract::{Path, State};
use axum::Json;
use depot_core::CashAccount;
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub account: CashAccount,
    pub balance_cents: i64,
}

pub async fn balance(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> ApiResult<Json<BalanceResponse>> {
    let account: CashAccount = account.parse()?;
    let balance = state.warehouse.cash().balance(account).await?;
    Ok(Json(BalanceResponse {
        account,
        balance_cents: balance.cents(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DepotConfig;
    use depot_core::{CashDirection, CashTransaction, Money};
    use depot_store::Warehouse;

    #[tokio::test]
    async fn test_balance_sums_account() {
        let warehouse = Warehouse::memory();
        let cash = warehouse.cash();
        cash.records()
            .create(CashTransaction::new(CashAccount::Bank, CashDirection::Deposit, Money::from_cents(10_000)))
            .await
            .unwrap();
        cash.records()
            .create(CashTransaction::new(CashAccount::Bank, CashDirection::Withdrawal, Money::from_cents(2_500)))
            .await
            .unwrap();
        let state = AppState::new(warehouse, DepotConfig::default());

        let Json(response) = balance(State(state.clone()), Path("bank".to_string())).await.unwrap();
        assert_eq!(response.balance_cents, 7_500);

        let err = balance(State(state), Path("vault".to_string())).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);
    }
}
