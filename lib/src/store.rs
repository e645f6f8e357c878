// Copyright (c) 2022-2023 The MobileCoin Foundation

use hbci_core::user::User;

/// Persistent user configuration
///
/// Users are locked before persisted state is modified and unlocked after.
pub trait ConfigStore: Send + Sync {
    fn lock_user(&self, user: &User) -> anyhow::Result<()>;

    fn save_user(&self, user: &User) -> anyhow::Result<()>;

    fn unlock_user(&self, user: &User) -> anyhow::Result<()>;
}
