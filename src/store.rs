//! SQLite persistence for cached decryption keys and issued passkeys.
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! `tokio::task::spawn_blocking`. The connection is shared behind a
//! mutex; every query is short, so contention stays negligible.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{GatewayError, Result};
use crate::passkey::Tier;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS keys (
    pssh            TEXT PRIMARY KEY,
    decryption_key  TEXT NOT NULL,
    created_at      INTEGER NOT NULL DEFAULT (unixepoch())
);

CREATE TABLE IF NOT EXISTS passkeys (
    passkey     TEXT PRIMARY KEY,
    tier        TEXT NOT NULL,
    revoked     INTEGER NOT NULL DEFAULT 0,
    created_at  INTEGER NOT NULL DEFAULT (unixepoch())
);
";

/// A cached decryption-key record, keyed by the PSSH it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub pssh: String,
    pub decryption_key: String,
}

/// An issued passkey and its standing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasskeyRecord {
    pub tier: Tier,
    pub revoked: bool,
}

/// Handle to the gateway database. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Store {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database for tests.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Store {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking query off the async runtime.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| GatewayError::Store(format!("connection mutex poisoned: {e}")))?;
            f(&conn)
        })
        .await
        .map_err(|e| GatewayError::Store(format!("database task failed: {e}")))?
    }

    /// Cache a decryption key for a PSSH, overwriting any previous entry.
    pub async fn insert_key(&self, pssh: String, decryption_key: String) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO keys (pssh, decryption_key) VALUES (?1, ?2)
                 ON CONFLICT (pssh) DO UPDATE SET decryption_key = excluded.decryption_key",
                params![pssh, decryption_key],
            )?;
            Ok(())
        })
        .await
    }

    /// Look up a cached key by PSSH.
    pub async fn get_key(&self, pssh: String) -> Result<KeyRecord> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT pssh, decryption_key FROM keys WHERE pssh = ?1",
                params![pssh],
                |row| {
                    Ok(KeyRecord {
                        pssh: row.get(0)?,
                        decryption_key: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or(GatewayError::NotFound("no key found for the given pssh"))
        })
        .await
    }

    /// Record a newly issued passkey.
    pub async fn insert_passkey(&self, passkey: String, tier: Tier) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO passkeys (passkey, tier) VALUES (?1, ?2)",
                params![passkey, tier.as_str()],
            )?;
            Ok(())
        })
        .await
    }

    /// Look up a passkey. Unknown passkeys are a [`GatewayError::NotFound`].
    pub async fn get_passkey(&self, passkey: String) -> Result<PasskeyRecord> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT tier, revoked FROM passkeys WHERE passkey = ?1",
                params![passkey],
                |row| {
                    let tier: String = row.get(0)?;
                    let revoked: i64 = row.get(1)?;
                    Ok((tier, revoked))
                },
            )
            .optional()?
            .map(|(tier, revoked)| PasskeyRecord {
                tier: Tier::parse(&tier),
                revoked: revoked != 0,
            })
            .ok_or(GatewayError::NotFound("passkey not found"))
        })
        .await
    }

    /// Revoke an active passkey. Revoking an unknown or already revoked
    /// passkey is an error, so callers can tell the two outcomes apart.
    pub async fn revoke_passkey(&self, passkey: String) -> Result<()> {
        self.with_conn(move |conn| {
            let rows = conn.execute(
                "UPDATE passkeys SET revoked = 1 WHERE passkey = ?1 AND revoked = 0",
                params![passkey],
            )?;
            if rows == 0 {
                return Err(GatewayError::NotFound("passkey not found"));
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn key_cache_overwrites_on_conflict() {
        let store = Store::open_memory().unwrap();
        store
            .insert_key("pssh-a".into(), "aa:bb".into())
            .await
            .unwrap();
        store
            .insert_key("pssh-a".into(), "cc:dd".into())
            .await
            .unwrap();

        let record = store.get_key("pssh-a".into()).await.unwrap();
        assert_eq!(record.pssh, "pssh-a");
        assert_eq!(record.decryption_key, "cc:dd");
    }

    #[tokio::test]
    async fn key_miss_is_not_found() {
        let store = Store::open_memory().unwrap();
        let err = store.get_key("absent".into()).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn passkey_lifecycle() {
        let store = Store::open_memory().unwrap();
        store
            .insert_passkey("TOKEN".into(), Tier::Superuser)
            .await
            .unwrap();

        let record = store.get_passkey("TOKEN".into()).await.unwrap();
        assert_eq!(record.tier, Tier::Superuser);
        assert!(!record.revoked);

        store.revoke_passkey("TOKEN".into()).await.unwrap();
        let record = store.get_passkey("TOKEN".into()).await.unwrap();
        assert!(record.revoked);
    }

    #[tokio::test]
    async fn revoke_is_not_idempotent() {
        let store = Store::open_memory().unwrap();
        store
            .insert_passkey("TOKEN".into(), Tier::Standard)
            .await
            .unwrap();

        store.revoke_passkey("TOKEN".into()).await.unwrap();
        let err = store.revoke_passkey("TOKEN".into()).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));

        let err = store.revoke_passkey("NEVER-ISSUED".into()).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_passkey_insert_fails() {
        let store = Store::open_memory().unwrap();
        store
            .insert_passkey("TOKEN".into(), Tier::Standard)
            .await
            .unwrap();
        let err = store
            .insert_passkey("TOKEN".into(), Tier::Standard)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Store(_)));
    }
}
