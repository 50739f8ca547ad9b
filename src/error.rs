use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Invalid site URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Site URL has no host: {0}")]
    MissingHost(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },

    #[error("Section [{0}] is not a table")]
    NotATable(String),
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Invalid address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("No recipients to notify")]
    NoRecipients,

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("Failed to set up SMTP transport: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),
}
