use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Denomination errors
    #[error("Invalid denomination: {0}")]
    InvalidDenomination(String),

    #[error("Denomination set must not be empty")]
    EmptyDenominationSet,

    // Ledger errors
    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: u64, requested: u64 },

    #[error("Amount overflow: {current} + {added}")]
    AmountOverflow { current: u64, added: u64 },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
