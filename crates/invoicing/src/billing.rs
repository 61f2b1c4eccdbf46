//! Credit gate for invoice writes.
//!
//! Creating an invoice costs one credit. The first edit of an invoice is
//! free; every later edit costs one credit. The decision is pure: callers
//! hold the account lock and apply [`BillingDecision::settle`] themselves.

use fatoura_accounts::Account;
use fatoura_core::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceOperation {
    Create,
    /// Update of an invoice whose current edit count is `edit_count`.
    Update { edit_count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingDecision {
    /// Whether one credit must be consumed.
    pub charge: bool,
    /// Edit count the invoice carries after the write.
    pub new_edit_count: u32,
}

pub fn decide(account: &Account, operation: InvoiceOperation) -> DomainResult<BillingDecision> {
    let decision = match operation {
        InvoiceOperation::Create => BillingDecision {
            charge: true,
            new_edit_count: 0,
        },
        InvoiceOperation::Update { edit_count } => BillingDecision {
            charge: edit_count > 0,
            new_edit_count: edit_count
                .checked_add(1)
                .ok_or_else(|| DomainError::validation("edit count overflow"))?,
        },
    };

    if decision.charge && !account.has_credit() {
        return Err(DomainError::InsufficientCredits);
    }
    Ok(decision)
}

impl BillingDecision {
    /// Consume the credit if this decision charges one.
    pub fn settle(&self, account: &mut Account) -> DomainResult<()> {
        if self.charge {
            account.consume_credit()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fatoura_accounts::{AdminGeneralSettings, NewAccount};
    use fatoura_core::AccountId;
    use proptest::prelude::*;

    fn account(credits: u32) -> Account {
        let mut general = AdminGeneralSettings::default();
        general.registration.initial_credits = credits;
        Account::provision(
            AccountId::new(),
            NewAccount {
                name: "Salma Idrissi".to_string(),
                email: "salma@idrissi.ma".to_string(),
                phone: None,
                company_name: "Idrissi Design".to_string(),
            },
            &general,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn create_charges_one_credit() {
        let mut acc = account(2);
        let d = decide(&acc, InvoiceOperation::Create).unwrap();
        assert_eq!(d, BillingDecision { charge: true, new_edit_count: 0 });
        d.settle(&mut acc).unwrap();
        assert_eq!(acc.credits, 1);
    }

    #[test]
    fn create_without_credit_is_refused() {
        let acc = account(0);
        assert_eq!(
            decide(&acc, InvoiceOperation::Create),
            Err(DomainError::InsufficientCredits)
        );
    }

    #[test]
    fn first_edit_is_free_even_at_zero_credits() {
        let mut acc = account(0);
        let d = decide(&acc, InvoiceOperation::Update { edit_count: 0 }).unwrap();
        assert!(!d.charge);
        assert_eq!(d.new_edit_count, 1);
        d.settle(&mut acc).unwrap();
        assert_eq!(acc.credits, 0);
    }

    #[test]
    fn later_edits_cost_a_credit() {
        let mut acc = account(1);
        let d = decide(&acc, InvoiceOperation::Update { edit_count: 1 }).unwrap();
        assert!(d.charge);
        assert_eq!(d.new_edit_count, 2);
        d.settle(&mut acc).unwrap();
        assert_eq!(acc.credits, 0);

        assert_eq!(
            decide(&account(0), InvoiceOperation::Update { edit_count: 4 }),
            Err(DomainError::InsufficientCredits)
        );
    }

    proptest! {
        #[test]
        fn edit_count_always_advances_by_one(credits in 0u32..5, edit_count in 0u32..1_000) {
            let mut acc = account(credits);
            match decide(&acc, InvoiceOperation::Update { edit_count }) {
                Ok(d) => {
                    prop_assert_eq!(d.new_edit_count, edit_count + 1);
                    prop_assert_eq!(d.charge, edit_count > 0);
                    d.settle(&mut acc).unwrap();
                    prop_assert_eq!(credits - acc.credits, u32::from(d.charge));
                }
                Err(e) => {
                    prop_assert_eq!(e, DomainError::InsufficientCredits);
                    prop_assert!(edit_count > 0 && credits == 0);
                }
            }
        }
    }
}
