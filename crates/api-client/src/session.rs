// In crates/api-client/src/session.rs

use crate::{ApiClient, Result};

/// A connection to the exchange that is held for the lifetime of the bot.
///
/// Opening verifies connectivity and, for signed access, the account. The
/// session is released exactly once: by [`BrokerSession::close`] or, failing
/// that, when it is dropped.
#[derive(Debug)]
pub struct BrokerSession {
    client: ApiClient,
    released: bool,
}

impl BrokerSession {
    /// Opens a session. With `verify_account` the signed account endpoint
    /// must answer too, and the balance is logged.
    pub async fn open(client: ApiClient, verify_account: bool) -> Result<Self> {
        client.ping().await?;

        if verify_account {
            let account = client.get_account().await?;
            tracing::info!(
                balance = %account.total_wallet_balance,
                can_trade = account.can_trade,
                "Broker session opened."
            );
            if !account.can_trade {
                tracing::warn!("Account is not permitted to trade. Orders will be rejected by the exchange.");
            }
        } else {
            tracing::info!("Broker session opened (market data only).");
        }

        Ok(Self {
            client,
            released: false,
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Releases the session.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            tracing::info!("Broker session closed.");
        }
    }
}

impl Drop for BrokerSession {
    fn drop(&mut self) {
        self.release();
    }
}
