use super::ids::UserId;
use super::money::{Amount, Balance};
use crate::error::MarketplaceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who a wallet belongs to. The platform wallet is a single distinguished row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum WalletOwner {
    Client(UserId),
    Vendor(UserId),
    Admin,
}

impl WalletOwner {
    /// Fixed key of the platform wallet.
    pub const ADMIN_KEY: &'static str = "admin";

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Client(_) => "client",
            Self::Vendor(_) => "vendor",
            Self::Admin => Self::ADMIN_KEY,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Client(id) | Self::Vendor(id) => Some(*id),
            Self::Admin => None,
        }
    }

    /// Storage key: `client:<uuid>`, `vendor:<uuid>` or `admin`.
    pub fn storage_key(&self) -> String {
        match self.user_id() {
            Some(id) => format!("{}:{}", self.kind(), id),
            None => Self::ADMIN_KEY.to_string(),
        }
    }
}

impl fmt::Display for WalletOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// A client, vendor or platform wallet.
///
/// `balance` always equals `total_deposits - total_withdrawals`; every mutation
/// goes through [`Wallet::credit`] or [`Wallet::debit`], and a debit never
/// takes the balance below zero.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Wallet {
    pub owner: WalletOwner,
    pub balance: Balance,
    pub total_deposits: Balance,
    pub total_withdrawals: Balance,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(owner: WalletOwner) -> Self {
        Self {
            owner,
            balance: Balance::ZERO,
            total_deposits: Balance::ZERO,
            total_withdrawals: Balance::ZERO,
            updated_at: Utc::now(),
        }
    }

    pub fn credit(&mut self, amount: Amount) {
        self.balance += amount.into();
        self.total_deposits += amount.into();
        self.updated_at = Utc::now();
    }

    pub fn debit(&mut self, amount: Amount) -> Result<(), MarketplaceError> {
        if !self.balance.covers(amount) {
            return Err(MarketplaceError::FailedPrecondition(format!(
                "{} wallet balance {} does not cover {}",
                self.owner.kind(),
                self.balance,
                amount
            )));
        }
        self.balance -= amount.into();
        self.total_withdrawals += amount.into();
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amount(value: rust_decimal::Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    #[test]
    fn test_wallet_credit() {
        let mut wallet = Wallet::new(WalletOwner::Admin);
        wallet.credit(amount(dec!(10.0)));
        assert_eq!(wallet.balance, Balance::new(dec!(10.0)));
        assert_eq!(wallet.total_deposits, Balance::new(dec!(10.0)));
        assert_eq!(wallet.total_withdrawals, Balance::ZERO);
    }

    #[test]
    fn test_wallet_debit_success() {
        let mut wallet = Wallet::new(WalletOwner::Admin);
        wallet.credit(amount(dec!(10.0)));

        wallet.debit(amount(dec!(4.0))).unwrap();
        assert_eq!(wallet.balance, Balance::new(dec!(6.0)));
        assert_eq!(wallet.total_withdrawals, Balance::new(dec!(4.0)));
        assert_eq!(wallet.balance, wallet.total_deposits - wallet.total_withdrawals);
    }

    #[test]
    fn test_wallet_debit_insufficient() {
        let mut wallet = Wallet::new(WalletOwner::Admin);
        wallet.credit(amount(dec!(10.0)));

        let result = wallet.debit(amount(dec!(20.0)));
        assert!(matches!(result, Err(MarketplaceError::FailedPrecondition(_))));
        assert_eq!(wallet.balance, Balance::new(dec!(10.0)));
        assert_eq!(wallet.total_withdrawals, Balance::ZERO);
    }

    #[test]
    fn test_wallet_owner_keys() {
        let id = UserId::new();
        assert_eq!(WalletOwner::Admin.storage_key(), "admin");
        assert_eq!(WalletOwner::Client(id).storage_key(), format!("client:{id}"));
        assert_eq!(WalletOwner::Vendor(id).user_id(), Some(id));
    }
}
