//! Credential resolution for marketplace accounts.
//!
//! An account reference maps to a stored bearer token plus the seller id it
//! belongs to. Resolution is the one step that can abort an entire batch:
//! without a valid credential no order can be enriched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use std::time::Duration;

use crate::entities::{marketplace_accounts, prelude::*};

/// Bearer token plus the seller identity it authenticates.
#[derive(Debug, Clone)]
pub struct Credential {
    pub access_token: String,
    pub seller_id: String,
}

/// Cache entry carrying the token expiry it was resolved with. The expiry is
/// re-checked on every hit so a token that lapses mid-TTL is never served.
#[derive(Debug, Clone)]
struct CachedCredential {
    credential: Credential,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedCredential {
    fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |t| t > now)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("no account found for reference '{0}'")]
    NotFound(String),
    #[error("account '{0}' is disabled")]
    Disabled(String),
    #[error("stored token for account '{0}' has expired")]
    Expired(String),
    #[error("account lookup failed: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Resolves an opaque account reference into a [`Credential`].
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn resolve(&self, account_ref: &str) -> Result<Credential, CredentialError>;
}

/// Database-backed resolver with a short-lived cache so one batch does not
/// hit the accounts table once per trigger.
pub struct StoredCredentials {
    db: DatabaseConnection,
    cache: Arc<Cache<String, CachedCredential>>,
}

impl StoredCredentials {
    pub fn new(db: DatabaseConnection) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300))
            .build();

        Self {
            db,
            cache: Arc::new(cache),
        }
    }

    async fn lookup(&self, account_ref: &str) -> Result<CachedCredential, CredentialError> {
        let account = MarketplaceAccounts::find()
            .filter(marketplace_accounts::Column::AccountRef.eq(account_ref))
            .one(&self.db)
            .await?
            .ok_or_else(|| CredentialError::NotFound(account_ref.to_string()))?;

        if !account.active {
            return Err(CredentialError::Disabled(account_ref.to_string()));
        }

        if let Some(expires_at) = account.token_expires_at {
            if expires_at < Utc::now() {
                return Err(CredentialError::Expired(account_ref.to_string()));
            }
        }

        Ok(CachedCredential {
            credential: Credential {
                access_token: account.access_token,
                seller_id: account.seller_id,
            },
            expires_at: account.token_expires_at.map(|t| t.with_timezone(&Utc)),
        })
    }
}

#[async_trait]
impl CredentialSource for StoredCredentials {
    async fn resolve(&self, account_ref: &str) -> Result<Credential, CredentialError> {
        if let Some(entry) = self.cache.get(account_ref).await {
            if entry.is_current(Utc::now()) {
                tracing::debug!(account = account_ref, "Credential cache hit");
                return Ok(entry.credential);
            }
            // Token lapsed mid-TTL; drop the entry and re-resolve from the
            // database, which may hold a refreshed token.
            self.cache.invalidate(account_ref).await;
        }

        let entry = self.lookup(account_ref).await?;
        self.cache
            .insert(account_ref.to_string(), entry.clone())
            .await;

        Ok(entry.credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(expires_at: Option<DateTime<Utc>>) -> CachedCredential {
        CachedCredential {
            credential: Credential {
                access_token: "token".to_string(),
                seller_id: "22".to_string(),
            },
            expires_at,
        }
    }

    #[test]
    fn test_cache_hit_rechecks_token_expiry() {
        let now = Utc::now();

        // Token that lapsed one second ago must not be served.
        assert!(!entry(Some(now - chrono::Duration::seconds(1))).is_current(now));

        // Near-expiry token is still valid until the instant it lapses.
        assert!(entry(Some(now + chrono::Duration::seconds(1))).is_current(now));

        // Accounts without an expiry never go stale.
        assert!(entry(None).is_current(now));
    }

    #[test]
    fn test_credential_error_display() {
        let err = CredentialError::NotFound("acct-1".to_string());
        assert!(err.to_string().contains("acct-1"));

        let err = CredentialError::Expired("acct-2".to_string());
        assert!(err.to_string().contains("expired"));
    }
}
