use fatoura_auth::Role;
use fatoura_core::AccountId;

/// Account context for a request.
///
/// This is immutable and must be present for all account-scoped routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AccountContext {
    account_id: AccountId,
}

impl AccountContext {
    pub fn new(account_id: AccountId) -> Self {
        Self { account_id }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }
}

/// Principal context for a request (authenticated identity + roles).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    account_id: AccountId,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(account_id: AccountId, roles: Vec<Role>) -> Self {
        Self { account_id, roles }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}
