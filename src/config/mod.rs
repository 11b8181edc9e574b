//! Configuration management for cryptpool
//!
//! Settings are layered with figment: embedded defaults, then a user or
//! working-directory config file (TOML, JSON or YAML), then `CRYPTPOOL_*`
//! environment variables.

mod core;

pub use core::{CryptpoolConfig, ENV_PREFIX, WORKER_KEY_VAR};

use crate::key::{FileKey, KeyProvider, StaticKey};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which isolation strategy runs the workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IsolationKind {
    Process,
    Thread,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Raw key material; takes precedence over `key_file`
    #[serde(default, deserialize_with = "raw_key")]
    pub key: Option<String>,

    pub key_file: PathBuf,

    /// 0 = one worker per CPU
    pub max_workers: usize,

    pub isolation: IsolationKind,

    pub fail_on_task_error: bool,
}

impl Settings {
    pub fn key_provider(&self) -> Box<dyn KeyProvider> {
        match &self.key {
            Some(raw) => Box::new(StaticKey::new(raw.clone())),
            None => Box::new(FileKey::new(self.key_file.clone())),
        }
    }
}

/// Accept the key as text or as an integer.
///
/// Environment values are typed by figment, so `CRYPTPOOL_KEY=42` arrives as
/// an integer while `key = "42"` in a file arrives as a string. Floats are
/// rejected: `1.0` would otherwise come back as `"1"` and pass as a valid key.
fn raw_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawKey>::deserialize(deserializer).map(|key| key.map(|k| k.0))
}

struct RawKey(String);

impl<'de> Deserialize<'de> for RawKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RawKeyVisitor)
    }
}

struct RawKeyVisitor;

impl Visitor<'_> for RawKeyVisitor {
    type Value = RawKey;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a key as a string or integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RawKey, E> {
        Ok(RawKey(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RawKey, E> {
        Ok(RawKey(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RawKey, E> {
        Ok(RawKey(v.to_string()))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<RawKey, E> {
        Ok(RawKey(v.to_string()))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<RawKey, E> {
        Ok(RawKey(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<RawKey, E> {
        Err(E::invalid_type(de::Unexpected::Float(v), &self))
    }
}
