// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod codec;
mod relayer;
mod sdk;

pub use codec::{decode_clear_values, encode_clear_values};
pub use relayer::RelayerClient;
pub use sdk::*;

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum FheError {
    #[error("FHE SDK has not been initialized")]
    NotInitialized,
    #[error("Relayer request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Relayer responded with {status}: {body}")]
    Relayer { status: u16, body: String },
    #[error("Clear values were not encoded correctly")]
    BadEncoding,
    #[error("{0}")]
    Sdk(String),
}

/// Result that returns a type T or a FheError
pub type Result<T> = std::result::Result<T, FheError>;
