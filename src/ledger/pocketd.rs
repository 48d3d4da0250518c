//! `pocketd` command-line backed ledger client.
//!
//! Every call runs one `pocketd` child process with a bounded wait. A child
//! that outlives its timeout is killed when its future is dropped.

use super::payload::{
    AddressEncodings, ApplicationResponse, BankBalancesResponse, Coin, CommissionResponse,
    RewardEntry, RewardsResponse, SupplierListResponse, SupplierResponse, ValidatorResponse,
};
use super::{LedgerClient, QueryError};
use crate::address::Address;
use crate::config::LedgerConfig;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument};

const SUPPLIER_PAGE_LIMIT: &str = "--page-limit=100000";

#[derive(Debug, Clone)]
pub struct PocketdClient {
    binary: String,
    node_url: String,
    query_timeout: Duration,
    supplier_query_timeout: Duration,
}

impl PocketdClient {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            node_url: config.node_url.clone(),
            query_timeout: Duration::from_secs(config.query_timeout_secs),
            supplier_query_timeout: Duration::from_secs(config.supplier_query_timeout_secs),
        }
    }

    async fn run(
        &self,
        call: &'static str,
        args: &[&str],
        limit: Duration,
    ) -> Result<String, QueryError> {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running {} {}", self.binary, args.join(" "));
        let output = match timeout(limit, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(QueryError::Spawn {
                    program: self.binary.clone(),
                    message: e.to_string(),
                })
            }
            Err(_) => return Err(QueryError::Timeout { call, after: limit }),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(QueryError::CommandFailed {
                code: output.status.code(),
                stderr: if stderr.is_empty() {
                    "Unknown error".to_string()
                } else {
                    stderr
                },
            });
        }

        String::from_utf8(output.stdout).map_err(|e| QueryError::invalid(call, e.to_string()))
    }

    async fn query<T: DeserializeOwned>(
        &self,
        call: &'static str,
        args: &[&str],
        limit: Duration,
    ) -> Result<T, QueryError> {
        let mut full_args = vec!["query"];
        full_args.extend_from_slice(args);
        full_args.extend_from_slice(&["--node", self.node_url.as_str(), "--output", "json"]);

        let stdout = self.run(call, &full_args, limit).await?;
        serde_json::from_str(&stdout).map_err(|e| QueryError::invalid(call, e.to_string()))
    }
}

/// Lookups of absent actors exit non-zero with a "not found" message.
fn is_not_found(error: &QueryError) -> bool {
    match error {
        QueryError::CommandFailed { stderr, .. } => {
            let stderr = stderr.to_ascii_lowercase();
            stderr.contains("not found") || stderr.contains("notfound")
        }
        _ => false,
    }
}

fn absent_on_not_found<T: Default>(result: Result<T, QueryError>) -> Result<T, QueryError> {
    match result {
        Err(e) if is_not_found(&e) => Ok(T::default()),
        other => other,
    }
}

#[async_trait]
impl LedgerClient for PocketdClient {
    #[instrument(skip(self))]
    async fn liquid_balance(&self, address: &Address) -> Result<Vec<Coin>, QueryError> {
        let response: BankBalancesResponse = self
            .query(
                "bank balance",
                &["bank", "balances", address.as_str()],
                self.query_timeout,
            )
            .await?;
        Ok(response.balances)
    }

    #[instrument(skip(self))]
    async fn application_stake(&self, address: &Address) -> Result<Option<Coin>, QueryError> {
        let response: Result<ApplicationResponse, _> = self
            .query(
                "application",
                &["application", "show-application", address.as_str()],
                self.query_timeout,
            )
            .await;
        absent_on_not_found(response.map(|r| r.application.and_then(|a| a.stake)))
    }

    #[instrument(skip(self))]
    async fn supplier_stake(&self, address: &Address) -> Result<Option<Coin>, QueryError> {
        let response: Result<SupplierResponse, _> = self
            .query(
                "supplier",
                &["supplier", "show-supplier", address.as_str()],
                self.query_timeout,
            )
            .await;
        absent_on_not_found(response.map(|r| r.supplier.and_then(|s| s.stake)))
    }

    #[instrument(skip(self))]
    async fn validator_tokens(&self, operator: &Address) -> Result<Option<String>, QueryError> {
        let response: Result<ValidatorResponse, _> = self
            .query(
                "validator stake",
                &["staking", "validator", operator.as_str()],
                self.query_timeout,
            )
            .await;
        absent_on_not_found(response.map(|r| r.validator.and_then(|v| v.tokens)))
    }

    #[instrument(skip(self))]
    async fn validator_commission(&self, operator: &Address) -> Result<Vec<String>, QueryError> {
        let response: Result<CommissionResponse, _> = self
            .query(
                "validator commission",
                &["distribution", "commission", operator.as_str()],
                self.query_timeout,
            )
            .await;
        absent_on_not_found(response.map(|r| r.commission.unwrap_or_default().commission))
    }

    #[instrument(skip(self))]
    async fn delegator_rewards(&self, address: &Address) -> Result<Vec<RewardEntry>, QueryError> {
        let response: Result<RewardsResponse, _> = self
            .query(
                "delegator rewards",
                &["distribution", "rewards", address.as_str()],
                self.query_timeout,
            )
            .await;
        absent_on_not_found(response.map(|r| r.rewards))
    }

    #[instrument(skip(self))]
    async fn account_address(&self, operator: &Address) -> Result<Address, QueryError> {
        let stdout = self
            .run(
                "address conversion",
                &["debug", "addr", operator.as_str()],
                self.query_timeout,
            )
            .await?;
        AddressEncodings::parse(&stdout)
            .account_address()
            .ok_or_else(|| {
                QueryError::invalid(
                    "address conversion",
                    "Could not find Bech32 Acc address in output",
                )
            })
    }

    #[instrument(skip(self))]
    async fn suppliers_for_owner(&self, owner: &Address) -> Result<Vec<Address>, QueryError> {
        let response: SupplierListResponse = self
            .query(
                "supplier list",
                &[
                    "supplier",
                    "list-suppliers",
                    "--owner-address",
                    owner.as_str(),
                    "--grpc-insecure=false",
                    SUPPLIER_PAGE_LIMIT,
                    "--page-count-total",
                ],
                self.supplier_query_timeout,
            )
            .await?;

        let mut operators: Vec<Address> = response
            .supplier
            .into_iter()
            .filter_map(|s| s.operator_address)
            .map(Address::from)
            .collect();
        operators.sort();
        operators.dedup();
        Ok(operators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(binary: &str, timeout_secs: u64) -> PocketdClient {
        let config = LedgerConfig {
            binary: binary.to_string(),
            query_timeout_secs: timeout_secs,
            ..LedgerConfig::default()
        };
        PocketdClient::new(&config)
    }

    #[test]
    fn test_not_found_classification() {
        let missing = QueryError::CommandFailed {
            code: Some(1),
            stderr: "rpc error: code = NotFound desc = application not found".into(),
        };
        assert!(is_not_found(&missing));
        assert_eq!(absent_on_not_found::<Option<Coin>>(Err(missing)), Ok(None));

        let refused = QueryError::CommandFailed {
            code: Some(1),
            stderr: "connection refused".into(),
        };
        assert!(!is_not_found(&refused));
        assert!(absent_on_not_found::<Vec<String>>(Err(refused)).is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let client = client_for("/nonexistent/pocketd-binary", 5);
        let result = client.liquid_balance(&Address::from("pokt1x")).await;
        assert!(matches!(result, Err(QueryError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_command_failure() {
        // `false` ignores its arguments and exits 1 without output.
        let client = client_for("false", 5);
        let result = client.liquid_balance(&Address::from("pokt1x")).await;
        assert!(matches!(
            result,
            Err(QueryError::CommandFailed { code: Some(1), ref stderr }) if stderr == "Unknown error"
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unexpected_output_is_invalid_response() {
        // `echo` prints its arguments, which is not JSON.
        let client = client_for("echo", 5);
        let result = client.validator_commission(&Address::from("poktvaloper1x")).await;
        assert!(matches!(result, Err(QueryError::InvalidResponse { .. })));

        let result = client.account_address(&Address::from("poktvaloper1x")).await;
        assert!(matches!(result, Err(QueryError::InvalidResponse { .. })));
    }
}
