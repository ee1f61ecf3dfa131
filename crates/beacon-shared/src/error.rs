use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("invalid format {input:?}: expected {expected}")]
    InvalidFormat {
        input: String,
        expected: &'static str,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid role {0:?}: expected user or admin")]
    InvalidRole(String),

    #[error("invalid username {0:?}: allowed are 1-64 characters of letters, digits and -_.+@")]
    InvalidUsername(String),

    #[error("invalid tier code {0:?}: allowed are 1-64 characters of letters, digits, - and _")]
    InvalidTierCode(String),

    #[error("invalid tier id {0:?}")]
    InvalidTierId(String),

    #[error("stripe price id must not be empty")]
    EmptyPriceId,

    #[error("{field} {value} is out of range: at most {max}")]
    LimitOutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },
}
