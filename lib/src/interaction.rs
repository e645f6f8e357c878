// Copyright (c) 2022-2023 The MobileCoin Foundation

use async_trait::async_trait;

/// Choices offered when a response lacks the expected signature
pub const UNSIGNED_CHOICES: [&str; 3] = ["Accept once", "Accept always", "Abort"];

/// User interaction
#[async_trait]
pub trait Interaction: Send + Sync {
    /// Prompt for a TAN, `None` aborts
    ///
    /// `challenge` is the challenge text, `hhd` structured challenge data
    /// for optical / chip TAN generators.
    async fn input_tan(&self, challenge: Option<&str>, hhd: Option<&[u8]>) -> Option<String>;

    /// Ask the user to pick one of `choices`, `None` aborts
    async fn confirm(&self, title: &str, text: &str, choices: &[&str]) -> Option<usize>;
}
