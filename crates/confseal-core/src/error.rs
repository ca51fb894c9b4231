//! Crate-wide error type
//!
//! Each module keeps its own error enum; `Error` wraps them for callers that
//! drive several modules at once (`ConfigService`, the server).

use thiserror::Error;

use crate::cipher::CipherError;
use crate::export::ExportError;
use crate::redact::PatternError;
use crate::settings::SettingsError;
use crate::sources::{RegistryError, SourceError};
use crate::vault::VaultError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

pub type Result<T> = std::result::Result<T, Error>;
