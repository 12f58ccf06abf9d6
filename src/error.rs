use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to fetch usb.ids data: {0}")]
    FetchFailed(String),

    #[error("Device on line {line} appears before any vendor: {text:?}")]
    OrphanDevice { line: usize, text: String },

    #[error("Malformed line {line}: {text:?}")]
    MalformedLine { line: usize, text: String },

    #[error("No vendor/device entries found in usb.ids data")]
    EmptyRegistry,

    #[error("Failed to update the usb.ids store: {0}")]
    StoreUpdateFailed(String),

    #[error("SQLite error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
