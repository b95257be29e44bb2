use thiserror::Error;

use crate::types::EntryKey;

pub type Result<T> = std::result::Result<T, LotteryError>;

#[derive(Error, Debug)]
pub enum LotteryError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Engine is paused")]
    Paused,

    #[error("Price oracle error: {0}")]
    Oracle(String),

    #[error("Boost provider error: {0}")]
    Boost(String),

    #[error("Randomness provider error: {0}")]
    Randomness(String),

    #[error("Callback from unexpected source: got {got}, expected {expected}")]
    UnauthorizedCallback { got: String, expected: String },

    #[error("Unknown entry: {0}")]
    UnknownEntry(EntryKey),

    #[error("Entry already fulfilled: {0}")]
    AlreadyFulfilled(EntryKey),

    #[error("Insufficient reserve liquidity: need {need}, have {available}")]
    InsufficientLiquidity { need: u128, available: u128 },

    #[error("Token error: {0}")]
    Token(String),

    #[error("Share vault error: {0}")]
    ShareVault(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LotteryError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn oracle(msg: impl Into<String>) -> Self {
        Self::Oracle(msg.into())
    }

    pub fn boost(msg: impl Into<String>) -> Self {
        Self::Boost(msg.into())
    }

    pub fn randomness(msg: impl Into<String>) -> Self {
        Self::Randomness(msg.into())
    }

    pub fn token(msg: impl Into<String>) -> Self {
        Self::Token(msg.into())
    }

    pub fn share_vault(msg: impl Into<String>) -> Self {
        Self::ShareVault(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
