//! Tenant ownership of persisted records.

use crate::id::AccountId;

/// A record that belongs to exactly one account (the tenant boundary).
pub trait Owned {
    fn account_id(&self) -> AccountId;

    fn is_owned_by(&self, account_id: AccountId) -> bool {
        self.account_id() == account_id
    }
}
