// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transport abstraction for exchanging encoded messages with a bank

use async_trait::async_trait;

/// Message transport (eg. HTTPS for PIN/TAN, TCP for key file users)
///
/// One request is answered by exactly one response.
#[async_trait]
pub trait Transport: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send an encoded message
    async fn send(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receive the next response message
    async fn receive(&mut self) -> Result<Vec<u8>, Self::Error>;
}
