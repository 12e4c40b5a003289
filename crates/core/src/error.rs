//! Error Types for Shade
//!
//! `UtxoError` is the structured error every note operation returns: a stable
//! code, the function that raised it and a human-readable message. Caller bugs
//! (malformed construction) and missing prerequisites (no index, view-only
//! account) are both reported through it. A ciphertext that is not addressed
//! to an account is not an error; see `DecryptedUtxo`.

use std::fmt;

use thiserror::Error;

/// Stable error codes for note operations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UtxoErrorCode {
    InvalidAssetOrAmountsLength,
    ExceededMaxAssets,
    NegativeAmount,
    AmountOverflow,
    AppDataFromBytesFunctionUndefined,
    InvalidAppData,
    AssetNotFound,
    IndexNotProvided,
    AccountHasNoPrivkey,
    InvalidBytes,
    InvalidPubkey,
    EncryptionFailed,
}

impl UtxoErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidAssetOrAmountsLength => "INVALID_ASSET_OR_AMOUNTS_LENGTH",
            Self::ExceededMaxAssets => "EXCEEDED_MAX_ASSETS",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::AppDataFromBytesFunctionUndefined => "APP_DATA_FROM_BYTES_FUNCTION_UNDEFINED",
            Self::InvalidAppData => "INVALID_APP_DATA",
            Self::AssetNotFound => "ASSET_NOT_FOUND",
            Self::IndexNotProvided => "INDEX_NOT_PROVIDED",
            Self::AccountHasNoPrivkey => "ACCOUNT_HAS_NO_PRIVKEY",
            Self::InvalidBytes => "INVALID_BYTES",
            Self::InvalidPubkey => "INVALID_PUBKEY",
            Self::EncryptionFailed => "ENCRYPTION_FAILED",
        }
    }
}

impl fmt::Display for UtxoErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure of a note or account operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code} in {function_name}: {message}")]
pub struct UtxoError {
    code: UtxoErrorCode,
    function_name: &'static str,
    message: String,
}

impl UtxoError {
    pub fn new(code: UtxoErrorCode, function_name: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            function_name,
            message: message.into(),
        }
    }

    pub fn code(&self) -> UtxoErrorCode {
        self.code
    }

    pub fn function_name(&self) -> &'static str {
        self.function_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Top-level error type for the Shade SDK
#[derive(Error, Debug)]
pub enum ShadeError {
    /// Note or account operation error
    #[error("Utxo error: {0}")]
    Utxo(#[from] UtxoError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for Shade operations
pub type ShadeResult<T> = Result<T, ShadeError>;

/// Input validation for note construction
pub mod validation {
    use super::*;
    use crate::constants::{N_ASSETS, UTXO_APP_DATA_MAX_BYTES};

    const FN_BUILD: &str = "build";

    /// Validate that assets and amounts line up and fit in a note
    pub fn validate_assets_and_amounts(assets: usize, amounts: usize) -> Result<(), UtxoError> {
        if assets != amounts {
            return Err(UtxoError::new(
                UtxoErrorCode::InvalidAssetOrAmountsLength,
                FN_BUILD,
                format!("Length missmatch assets: {} != amounts: {}", assets, amounts),
            ));
        }

        if assets > N_ASSETS {
            return Err(UtxoError::new(
                UtxoErrorCode::ExceededMaxAssets,
                FN_BUILD,
                format!("assets.length {} > N_ASSETS {}", assets, N_ASSETS),
            ));
        }

        Ok(())
    }

    /// Validate a single amount and narrow it to the wire width
    pub fn validate_amount(index: usize, amount: i128) -> Result<u64, UtxoError> {
        if amount < 0 {
            return Err(UtxoError::new(
                UtxoErrorCode::NegativeAmount,
                FN_BUILD,
                format!("amount cannot be negative, amounts[{}] = {}", index, amount),
            ));
        }

        u64::try_from(amount).map_err(|_| {
            UtxoError::new(
                UtxoErrorCode::AmountOverflow,
                FN_BUILD,
                format!("amount exceeds u64::MAX, amounts[{}] = {}", index, amount),
            )
        })
    }

    /// Validate the size of an application payload
    pub fn validate_app_data_len(function_name: &'static str, len: usize) -> Result<(), UtxoError> {
        if len > UTXO_APP_DATA_MAX_BYTES {
            return Err(UtxoError::new(
                UtxoErrorCode::InvalidAppData,
                function_name,
                format!("app data is {} bytes, max {}", len, UTXO_APP_DATA_MAX_BYTES),
            ));
        }
        Ok(())
    }
}
