//! Credit ledger collaborator.
//!
//! The ledger is the sole authority on balances: the engine never reads
//! then writes a balance itself, it only requests atomic deduct/refund
//! operations and trusts their return values. [`RestLedger`] talks to the
//! ledger service's RPC endpoints; tests substitute an in-memory fake.

use async_trait::async_trait;
use serde::Deserialize;

use airwave_core::types::{Credits, RefundReason};

/// Errors from the ledger layer.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The request never produced a ledger response (network, DNS, TLS).
    /// No response means no acknowledged operation.
    #[error("Ledger request failed: {0}")]
    Transport(String),

    /// The ledger answered with a non-success status.
    #[error("Ledger rejected the operation: {0}")]
    Rejected(String),
}

/// Outcome of an atomic deduction attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct DeductOutcome {
    pub success: bool,
    pub new_balance: Credits,
    pub error_message: Option<String>,
}

/// Atomic balance operations. Implementations must be safe to call once
/// per terminal outcome (the engine never double-refunds a hold).
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Atomically deduct `amount` from the user's balance. A refused
    /// deduction is an `Ok` with `success == false`, not an error.
    async fn deduct(&self, user_id: &str, amount: Credits) -> Result<DeductOutcome, LedgerError>;

    /// Atomically return `amount` to the user's balance, tagged with the
    /// failure reason and audit metadata.
    async fn refund(
        &self,
        user_id: &str,
        amount: Credits,
        reason: RefundReason,
        metadata: serde_json::Value,
    ) -> Result<(), LedgerError>;

    /// Record a transaction attempt that moved no money (e.g. a refused
    /// deduction) for audit purposes.
    async fn log_attempt(
        &self,
        user_id: &str,
        amount: Credits,
        description: &str,
        metadata: serde_json::Value,
    ) -> Result<(), LedgerError>;
}

// ---------------------------------------------------------------------------
// REST implementation
// ---------------------------------------------------------------------------

/// Ledger client over the credit service's REST RPC endpoints.
pub struct RestLedger {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestLedger {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, LedgerError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(LedgerError::Rejected(format!("{status}: {body}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl CreditLedger for RestLedger {
    async fn deduct(&self, user_id: &str, amount: Credits) -> Result<DeductOutcome, LedgerError> {
        let body = serde_json::json!({ "user_id": user_id, "amount": amount });
        let response = self.post_json("/rpc/deduct_credits", &body).await?;
        response
            .json::<DeductOutcome>()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))
    }

    async fn refund(
        &self,
        user_id: &str,
        amount: Credits,
        reason: RefundReason,
        metadata: serde_json::Value,
    ) -> Result<(), LedgerError> {
        let body = serde_json::json!({
            "user_id": user_id,
            "amount": amount,
            "reason": reason.as_str(),
            "metadata": metadata,
        });
        self.post_json("/rpc/refund_credits", &body).await?;
        Ok(())
    }

    async fn log_attempt(
        &self,
        user_id: &str,
        amount: Credits,
        description: &str,
        metadata: serde_json::Value,
    ) -> Result<(), LedgerError> {
        let body = serde_json::json!({
            "user_id": user_id,
            "amount": amount,
            "status": "failed",
            "description": description,
            "metadata": metadata,
        });
        self.post_json("/transactions", &body).await?;
        Ok(())
    }
}
