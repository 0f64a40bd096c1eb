//! Identity selection for uploads.
//!
//! A request may name a workspace account to upload into. The account is only
//! impersonated when impersonation is enabled and the address belongs to the
//! configured domain. Every other outcome uses the default client, so identity
//! selection never fails a request.

use camdrive_core::models::UploadWarning;
use camdrive_storage::{ClientFactory, DriveClient};
use std::sync::Arc;
use std::time::Duration;

use super::types::ResolvedClient;

/// Basic address shape check applied before impersonating an account.
pub fn is_valid_account(email: &str) -> bool {
    let Some(at) = email.find('@') else {
        return false;
    };
    email.len() > 5
        && at > 0
        && !email.ends_with('@')
        && email[at + 1..].contains('.')
}

/// `email` is a valid address whose domain is exactly `domain`.
pub fn is_account_in_domain(email: &str, domain: &str) -> bool {
    is_valid_account(email) && email.ends_with(&format!("@{}", domain.to_lowercase()))
}

pub struct IdentityResolver {
    factory: Arc<dyn ClientFactory>,
    default_client: Arc<dyn DriveClient>,
    impersonation_enabled: bool,
    domain: Option<String>,
    call_timeout: Duration,
}

impl IdentityResolver {
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        default_client: Arc<dyn DriveClient>,
        impersonation_enabled: bool,
        domain: Option<String>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            factory,
            default_client,
            impersonation_enabled,
            domain: domain.map(|d| d.to_lowercase()),
            call_timeout,
        }
    }

    pub fn default_client(&self) -> &Arc<dyn DriveClient> {
        &self.default_client
    }

    fn fallback(&self, reason: String) -> ResolvedClient {
        ResolvedClient {
            client: self.default_client.clone(),
            warning: Some(UploadWarning::IdentityFallback { reason }),
        }
    }

    /// Pick the client for an upload targeting `target_account`.
    pub async fn resolve_client(&self, target_account: Option<&str>) -> ResolvedClient {
        let requested = target_account.map(str::trim).filter(|a| !a.is_empty());

        let account = match requested {
            Some(account) if self.impersonation_enabled => account.to_lowercase(),
            _ => {
                return ResolvedClient {
                    client: self.default_client.clone(),
                    warning: None,
                }
            }
        };

        let domain = match self.domain.as_deref() {
            Some(domain) => domain,
            None => {
                tracing::warn!(account = %account, "No impersonation domain configured, using default identity");
                return self.fallback("no impersonation domain configured".to_string());
            }
        };

        if !is_valid_account(&account) {
            tracing::warn!(account = %account, "Invalid account address, using default identity");
            return self.fallback(format!("invalid account address: {}", account));
        }

        if !is_account_in_domain(&account, domain) {
            tracing::warn!(
                account = %account,
                domain = %domain,
                "Account outside impersonation domain, using default identity"
            );
            return self.fallback(format!("{} is not in domain {}", account, domain));
        }

        let build = self.factory.build_impersonated_client(&account);
        match tokio::time::timeout(self.call_timeout, build).await {
            Ok(Ok(client)) => {
                tracing::info!(account = %account, "Impersonating account for upload");
                ResolvedClient {
                    client,
                    warning: None,
                }
            }
            Ok(Err(e)) => {
                tracing::error!(
                    error = %e,
                    account = %account,
                    "Failed to create impersonated client, using default identity"
                );
                self.fallback(format!("impersonation of {} failed: {}", account, e))
            }
            Err(_) => {
                tracing::error!(
                    account = %account,
                    timeout_secs = self.call_timeout.as_secs(),
                    "Impersonation timed out, using default identity"
                );
                self.fallback(format!(
                    "impersonation of {} timed out after {}s",
                    account,
                    self.call_timeout.as_secs()
                ))
            }
        }
    }
}
