use crate::domain::wallet::Wallet;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct WalletRow {
    owner: &'static str,
    owner_id: String,
    balance: String,
    total_deposits: String,
    total_withdrawals: String,
}

impl From<&Wallet> for WalletRow {
    fn from(wallet: &Wallet) -> Self {
        Self {
            owner: wallet.owner.kind(),
            owner_id: wallet
                .owner
                .user_id()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            balance: wallet.balance.to_string(),
            total_deposits: wallet.total_deposits.to_string(),
            total_withdrawals: wallet.total_withdrawals.to_string(),
        }
    }
}

/// Writes wallet snapshots as `owner,owner_id,balance,total_deposits,total_withdrawals`.
pub struct WalletWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> WalletWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_wallets<'a>(&mut self, wallets: impl IntoIterator<Item = &'a Wallet>) -> Result<()> {
        let mut wrote_any = false;
        for wallet in wallets {
            self.writer.serialize(WalletRow::from(wallet))?;
            wrote_any = true;
        }
        if !wrote_any {
            self.writer.write_record([
                "owner",
                "owner_id",
                "balance",
                "total_deposits",
                "total_withdrawals",
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
