//! Cash drawer and bank account balances.

use depot_core::{account_balance, CashAccount, CashTransaction, Money};

use super::Repository;
use crate::backend::StoreBackend;
use crate::error::StoreResult;

#[derive(Debug, Clone)]
pub struct CashRepository {
    transactions: Repository<CashTransaction>,
}

impl CashRepository {
    pub fn new(backend: StoreBackend) -> Self {
        CashRepository {
            transactions: Repository::new(backend),
        }
    }

    pub fn records(&self) -> &Repository<CashTransaction> {
        &self.transactions
    }

    /// Deposits minus withdrawals over every live transaction of `account`.
    pub async fn balance(&self, account: CashAccount) -> StoreResult<Money> {
        let transactions = self.transactions.list(false).await?;
        Ok(account_balance(account, &transactions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use depot_core::{CashDirection, Entity};

    #[tokio::test]
    async fn test_balance_ignores_archived_and_other_account() {
        let cash = CashRepository::new(StoreBackend::Memory(MemoryBackend::ephemeral()));
        let records = cash.records();

        records
            .create(CashTransaction::new(CashAccount::Cash, CashDirection::Deposit, Money::from_cents(50_000)))
            .await
            .unwrap();
        records
            .create(CashTransaction::new(CashAccount::Cash, CashDirection::Withdrawal, Money::from_cents(12_000)))
            .await
            .unwrap();
        let stray = records
            .create(CashTransaction::new(CashAccount::Cash, CashDirection::Withdrawal, Money::from_cents(999)))
            .await
            .unwrap();
        records
            .create(CashTransaction::new(CashAccount::Bank, CashDirection::Deposit, Money::from_cents(1_000)))
            .await
            .unwrap();
        records.archive(stray.id()).await.unwrap();

        assert_eq!(cash.balance(CashAccount::Cash).await.unwrap().cents(), 38_000);
        assert_eq!(cash.balance(CashAccount::Bank).await.unwrap().cents(), 1_000);
    }
}
