//! Testing utilities for the lootbox workspace
//!
//! In-memory doubles for the storage and chain seams, plus on-disk fixtures.

#![allow(missing_docs)]

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use lootbox_core::{
    ChainError, Confirmation, ContentStore, MintContract, NamedBlob, PipelineConfig, PipelineDeps,
    RunRequest, StoreError,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const RECIPIENT_HANDLE: &str = "aoth";

/// Gas charged per confirmed mint
pub const GAS_PER_MINT: u64 = 90_000;

/// Wei per gas unit
pub const GAS_PRICE_WEI: u64 = 1_000_000_000;

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn recipient_address() -> Address {
    addr(0xA0)
}

pub fn owner_address() -> Address {
    addr(0x0E)
}

/// Config with one recipient (`aoth`) and path-style `ipfs://` URIs
pub fn test_config() -> PipelineConfig {
    let mut config = PipelineConfig::new();
    config
        .recipients
        .insert(RECIPIENT_HANDLE.to_string(), recipient_address());
    config
}

pub fn deps(store: &Arc<MemoryStore>, contract: &Arc<FakeContract>) -> PipelineDeps {
    PipelineDeps {
        store: store.clone(),
        contract: contract.clone(),
    }
}

// ---------------------------------------------------------------------------
// Storage double
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPut {
    pub label: String,
    pub files: Vec<NamedBlob>,
    pub wrap_in_directory: bool,
}

impl RecordedPut {
    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn file(&self, name: &str) -> Option<&NamedBlob> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// In-memory content store
///
/// Returns scripted roots in order, then roots derived from the batch content.
#[derive(Debug, Default)]
pub struct MemoryStore {
    roots: Mutex<VecDeque<String>>,
    puts: Mutex<Vec<RecordedPut>>,
    fail_on_call: Option<usize>,
    remove_after_call: Option<(usize, PathBuf)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roots<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roots: Mutex::new(roots.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Fail the `n`th put (0-based)
    #[must_use]
    pub fn failing_on_call(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    /// Delete `dir` once the `n`th put (0-based) has been accepted
    #[must_use]
    pub fn removing_dir_after_call(mut self, n: usize, dir: impl Into<PathBuf>) -> Self {
        self.remove_after_call = Some((n, dir.into()));
        self
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.puts.lock().clone()
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().len()
    }
}

/// Deterministic stand-in for a content identifier
pub fn fake_cid(files: &[NamedBlob]) -> String {
    let mut hasher = blake3::Hasher::new();
    for file in files {
        hasher.update(file.name.as_bytes());
        hasher.update(&[0]);
        hasher.update(&file.bytes);
    }
    format!("bafk{}", hex::encode(&hasher.finalize().as_bytes()[..16]))
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn put(
        &self,
        label: &str,
        files: Vec<NamedBlob>,
        wrap_in_directory: bool,
    ) -> Result<String, StoreError> {
        let mut puts = self.puts.lock();
        if self.fail_on_call == Some(puts.len()) {
            return Err(StoreError::Rejected {
                status: 503,
                body: format!("{label} upload refused"),
            });
        }
        let root = self
            .roots
            .lock()
            .pop_front()
            .unwrap_or_else(|| fake_cid(&files));
        puts.push(RecordedPut {
            label: label.to_string(),
            files,
            wrap_in_directory,
        });
        if let Some((n, dir)) = &self.remove_after_call {
            if *n + 1 == puts.len() {
                std::fs::remove_dir_all(dir).unwrap();
            }
        }
        Ok(root)
    }
}

// ---------------------------------------------------------------------------
// Chain double
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedMint {
    pub recipient: Address,
    pub token_uri: String,
    pub tx: TxHash,
}

#[derive(Debug, Default)]
struct ChainState {
    tokens: HashMap<Address, U256>,
    native: HashMap<Address, U256>,
    submitted: Vec<SubmittedMint>,
    confirmed: Vec<TxHash>,
}

/// In-memory token contract
///
/// A confirmed mint adds one token to the recipient and charges the owner
/// `GAS_PER_MINT * GAS_PRICE_WEI`.
#[derive(Debug)]
pub struct FakeContract {
    owner: Address,
    state: Mutex<ChainState>,
    fail_submit_at: Option<usize>,
    revert_at: Option<usize>,
    balances_unavailable: bool,
}

impl Default for FakeContract {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeContract {
    pub fn new() -> Self {
        let mut state = ChainState::default();
        state
            .native
            .insert(owner_address(), U256::from(10u64).pow(U256::from(18u64)));
        Self {
            owner: owner_address(),
            state: Mutex::new(state),
            fail_submit_at: None,
            revert_at: None,
            balances_unavailable: false,
        }
    }

    #[must_use]
    pub fn with_token_balance(self, holder: Address, amount: u64) -> Self {
        self.state.lock().tokens.insert(holder, U256::from(amount));
        self
    }

    /// Reject the `n`th submission (0-based)
    #[must_use]
    pub fn failing_submit_at(mut self, n: usize) -> Self {
        self.fail_submit_at = Some(n);
        self
    }

    /// Revert the `n`th submitted mint (0-based) when confirmed
    #[must_use]
    pub fn reverting_at(mut self, n: usize) -> Self {
        self.revert_at = Some(n);
        self
    }

    /// Every balance query fails
    #[must_use]
    pub fn without_balances(mut self) -> Self {
        self.balances_unavailable = true;
        self
    }

    pub fn submitted(&self) -> Vec<SubmittedMint> {
        self.state.lock().submitted.clone()
    }

    pub fn confirmed(&self) -> Vec<TxHash> {
        self.state.lock().confirmed.clone()
    }

    pub fn tokens_of(&self, holder: Address) -> U256 {
        self.state
            .lock()
            .tokens
            .get(&holder)
            .copied()
            .unwrap_or_default()
    }
}

fn tx_hash(n: usize) -> TxHash {
    TxHash::left_padding_from(&(n as u64 + 1).to_be_bytes())
}

#[async_trait]
impl MintContract for FakeContract {
    fn owner(&self) -> Address {
        self.owner
    }

    async fn token_balance(&self, holder: Address) -> Result<U256, ChainError> {
        if self.balances_unavailable {
            return Err(ChainError::Rpc("balanceOf unavailable".to_string()));
        }
        Ok(self.tokens_of(holder))
    }

    async fn native_balance(&self, holder: Address) -> Result<U256, ChainError> {
        if self.balances_unavailable {
            return Err(ChainError::Rpc("eth_getBalance unavailable".to_string()));
        }
        Ok(self
            .state
            .lock()
            .native
            .get(&holder)
            .copied()
            .unwrap_or_default())
    }

    async fn submit_mint(&self, recipient: Address, token_uri: &str) -> Result<TxHash, ChainError> {
        let mut state = self.state.lock();
        let index = state.submitted.len();
        if self.fail_submit_at == Some(index) {
            return Err(ChainError::Rejected("nonce too low".to_string()));
        }
        let tx = tx_hash(index);
        state.submitted.push(SubmittedMint {
            recipient,
            token_uri: token_uri.to_string(),
            tx,
        });
        Ok(tx)
    }

    async fn confirm(&self, tx: TxHash) -> Result<Confirmation, ChainError> {
        let mut state = self.state.lock();
        let (index, recipient) = state
            .submitted
            .iter()
            .enumerate()
            .find(|(_, m)| m.tx == tx)
            .map(|(i, m)| (i, m.recipient))
            .ok_or_else(|| ChainError::Rpc(format!("unknown transaction {tx}")))?;

        let cost = U256::from(GAS_PER_MINT) * U256::from(GAS_PRICE_WEI);
        let owner = self.owner;
        let funds = state.native.entry(owner).or_default();
        *funds = funds.saturating_sub(cost);

        if self.revert_at == Some(index) {
            return Err(ChainError::Reverted { tx });
        }

        *state.tokens.entry(recipient).or_default() += U256::from(1u64);
        state.confirmed.push(tx);
        Ok(Confirmation {
            block_number: Some(100 + index as u64),
            gas_used: GAS_PER_MINT,
        })
    }
}

// ---------------------------------------------------------------------------
// On-disk fixtures
// ---------------------------------------------------------------------------

/// Asset and metadata directories in temporary storage
#[derive(Debug)]
pub struct LootFixture {
    assets: TempDir,
    metadata: TempDir,
}

impl Default for LootFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl LootFixture {
    pub fn new() -> Self {
        Self {
            assets: tempfile::tempdir().unwrap(),
            metadata: tempfile::tempdir().unwrap(),
        }
    }

    /// One `<id>.gif` and `<id>.json` per ID, named `Item <id>`
    pub fn with_tokens(ids: &[&str]) -> Self {
        let fixture = Self::new();
        for id in ids {
            fixture.write_asset(id);
            fixture.write_metadata(id, &format!(r#"{{"name":"Item {id}"}}"#));
        }
        fixture
    }

    pub fn write_asset(&self, id: &str) -> PathBuf {
        let path = self.assets.path().join(format!("{id}.gif"));
        std::fs::write(&path, format!("GIF89a-{id}")).unwrap();
        path
    }

    pub fn write_metadata(&self, id: &str, json: &str) -> PathBuf {
        let path = self.metadata.path().join(format!("{id}.json"));
        std::fs::write(&path, json).unwrap();
        path
    }

    pub fn read_metadata(&self, id: &str) -> String {
        std::fs::read_to_string(self.metadata.path().join(format!("{id}.json"))).unwrap()
    }

    pub fn asset_dir(&self) -> &Path {
        self.assets.path()
    }

    pub fn metadata_dir(&self) -> &Path {
        self.metadata.path()
    }

    pub fn request(&self, handle: &str) -> RunRequest {
        RunRequest::new(handle, self.asset_dir(), self.metadata_dir())
    }
}
