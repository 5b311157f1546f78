//! Database types and global state

use std::path::Path;
use std::sync::{Mutex, OnceLock};

use heed::types::{Bytes, Str, U64};
use heed::{Database, Env, EnvOpenOptions, RoTxn};
use serde::de::DeserializeOwned;

use crate::error::{GateError, Result};

// Database type aliases
pub type DbById = Database<U64<byteorder::BigEndian>, Str>;
pub type DbByPair = Database<Bytes, Str>;
pub type DbLink = Database<Bytes, U64<byteorder::BigEndian>>;
pub type DbIndex = Database<Str, U64<byteorder::BigEndian>>;

/// Create a 16-byte key from two u64 values (tenant first, so a tenant's
/// rows share a prefix)
#[inline]
pub fn key(a: u64, b: u64) -> [u8; 16] {
    let mut k = [0u8; 16];
    k[..8].copy_from_slice(&a.to_be_bytes());
    k[8..].copy_from_slice(&b.to_be_bytes());
    k
}

#[inline]
pub(crate) fn key_tail(k: &[u8]) -> Option<u64> {
    let tail: [u8; 8] = k.get(8..16)?.try_into().ok()?;
    Some(u64::from_be_bytes(tail))
}

pub(crate) fn decode<T: DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

/// All database handles
pub struct Dbs {
    /// tenant id -> Tenant
    pub tenants: DbById,
    /// slug -> tenant id
    pub slugs: DbIndex,
    /// (tenant, role id) -> Role
    pub roles: DbByPair,
    /// (tenant, user id) -> role id
    pub members: DbLink,
    /// tenant id -> Subscription
    pub subs: DbById,
    /// tier -> SubscriptionPlan
    pub plans: Database<Str, Str>,
    pub meta: Database<Str, Str>,
}

// Global state
pub static ENV: OnceLock<Env> = OnceLock::new();
pub static DBS: OnceLock<Dbs> = OnceLock::new();
pub static TEST_LOCK: Mutex<()> = Mutex::new(());
pub static INIT_PATH: OnceLock<String> = OnceLock::new();

/// Get the database handles, or error if not initialized
#[inline]
pub fn dbs() -> Result<&'static Dbs> {
    DBS.get().ok_or(GateError::NotInitialized)
}

/// Get the environment, or error if not initialized
#[inline]
pub fn env() -> Result<&'static Env> {
    ENV.get().ok_or(GateError::NotInitialized)
}

/// Execute a read-only operation
#[inline]
pub fn read<T, F: FnOnce(&Dbs, &RoTxn) -> Result<T>>(f: F) -> Result<T> {
    f(dbs()?, &env()?.read_txn()?)
}

/// Initialize the database
pub fn init(path: &str) -> Result<()> {
    if let Some(p) = INIT_PATH.get() {
        return if p == path {
            Ok(())
        } else {
            Err(GateError::AlreadyInitialized(p.clone()))
        };
    }
    std::fs::create_dir_all(path)?;
    // SAFETY: LMDB requires no other processes access this path concurrently during open.
    let e = unsafe {
        EnvOpenOptions::new()
            .map_size(1 << 30)
            .max_dbs(7)
            .open(Path::new(path))?
    };
    let mut tx = e.write_txn()?;
    let d = Dbs {
        tenants: e.create_database(&mut tx, Some("tenants"))?,
        slugs: e.create_database(&mut tx, Some("slugs"))?,
        roles: e.create_database(&mut tx, Some("roles"))?,
        members: e.create_database(&mut tx, Some("members"))?,
        subs: e.create_database(&mut tx, Some("subs"))?,
        plans: e.create_database(&mut tx, Some("plans"))?,
        meta: e.create_database(&mut tx, Some("meta"))?,
    };
    tx.commit()?;
    let _ = (ENV.set(e), DBS.set(d), INIT_PATH.set(path.to_string()));
    tracing::info!(path, "store opened");
    Ok(())
}

/// Clear all databases (for testing)
pub fn clear_all() -> Result<()> {
    crate::tx::transact(|tx| {
        let d = tx.dbs();
        d.tenants.clear(tx.tx())?;
        d.slugs.clear(tx.tx())?;
        d.roles.clear(tx.tx())?;
        d.members.clear(tx.tx())?;
        d.subs.clear(tx.tx())?;
        d.plans.clear(tx.tx())?;
        d.meta.clear(tx.tx())?;
        Ok(())
    })
}

/// Get the test lock (for single-threaded tests)
pub fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(|p| p.into_inner())
}
