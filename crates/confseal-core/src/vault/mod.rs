//! External secret vaults behind `${vault.PATH/KEY}` markers
//!
//! - `SecretVault` trait: `get(path, key)` against any backend
//! - `MemoryVault`: In-memory, for tests and fixtures
//! - `HttpVault`: KV v1/v2 secrets engine over HTTP
//! - `KeychainVault`: OS keychain
//! - `ChainVault`: Ordered fallback across backends
//! - `DisabledVault`: No vault configured

mod traits;
mod memory;
mod http;
mod keychain;
mod chain;

pub use traits::{DisabledVault, SecretVault, VaultError, VaultResult};
pub use memory::MemoryVault;
pub use http::{HttpVault, KvVersion};
pub use keychain::KeychainVault;
pub use chain::ChainVault;
