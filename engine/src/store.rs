use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use swap_primitives::error::{SwapError, SwapResult};

/// Persisted per-swap state, written once the HODL invoice exists and read
/// only by the USER to settle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HodlRecord {
    pub payment_hash: String,
    pub preimage: String,
    pub amount_msat: u64,
    pub expiry_sec: u64,
    pub invoice: String,
    pub payment_secret: String,
    pub created_at_ms: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    records: HashMap<String, HodlRecord>,
}

/// A single local JSON file, keyed by payment hash, with atomic
/// write-temp-then-rename persistence.
pub struct HodlStore {
    path: PathBuf,
}

impl HodlStore {
    pub fn new(override_path: Option<&str>) -> SwapResult<Self> {
        let path = match override_path {
            Some(p) => PathBuf::from(p),
            None => {
                let home = dirs::home_dir().ok_or_else(|| {
                    SwapError::StoreError("could not determine home directory".into())
                })?;
                home.join(".thunder-swap").join("hodl_store.json")
            }
        };
        Ok(Self { path })
    }

    fn read_file(&self) -> SwapResult<StoreFile> {
        if !self.path.exists() {
            return Ok(StoreFile::default());
        }
        let contents = fs::read_to_string(&self.path)
            .map_err(|e| SwapError::StoreError(format!("reading {}: {e}", self.path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| SwapError::StoreError(format!("parsing {}: {e}", self.path.display())))
    }

    /// Appends or replaces the record keyed by its payment hash. Writes
    /// atomically: serialize to a sibling temp file, then rename over the
    /// real path, so a crash mid-write never leaves a corrupt store.
    pub fn put(&self, record: HodlRecord) -> SwapResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SwapError::StoreError(format!("creating {}: {e}", parent.display())))?;
        }

        let mut file = self.read_file()?;
        file.records.insert(record.payment_hash.clone(), record);

        let serialized = serde_json::to_string_pretty(&file)
            .map_err(|e| SwapError::StoreError(format!("serializing hodl store: {e}")))?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serialized)
            .map_err(|e| SwapError::StoreError(format!("writing {}: {e}", tmp_path.display())))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| SwapError::StoreError(format!("renaming into {}: {e}", self.path.display())))?;
        Ok(())
    }

    pub fn get(&self, payment_hash: &str) -> SwapResult<Option<HodlRecord>> {
        let file = self.read_file()?;
        Ok(file.records.get(payment_hash).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> HodlRecord {
        HodlRecord {
            payment_hash: "aa".repeat(32),
            preimage: "bb".repeat(32),
            amount_msat: 20_000_000,
            expiry_sec: 86_400,
            invoice: "lnbcrt1...".into(),
            payment_secret: "secret".into(),
            created_at_ms: 1,
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = std::env::temp_dir().join(format!("hodl-store-test-{}", std::process::id()));
        let path = dir.join("hodl_store.json");
        let store = HodlStore::new(Some(path.to_str().unwrap())).unwrap();
        let record = sample_record();
        store.put(record.clone()).unwrap();

        let fetched = store.get(&record.payment_hash).unwrap().unwrap();
        assert_eq!(fetched.invoice, record.invoice);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_record_returns_none() {
        let dir = std::env::temp_dir().join(format!("hodl-store-test-missing-{}", std::process::id()));
        let path = dir.join("hodl_store.json");
        let store = HodlStore::new(Some(path.to_str().unwrap())).unwrap();
        assert!(store.get(&"00".repeat(32)).unwrap().is_none());
        let _ = fs::remove_dir_all(&dir);
    }
}
