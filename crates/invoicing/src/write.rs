//! Write planning: turns a submitted draft into the invoice to persist.
//!
//! Checks run in a fixed order: field validation, client ownership, invoice
//! number uniqueness, then the credit gate. The first failure wins and nothing
//! is mutated; the store supplies the facts it looked up under its lock.

use chrono::{DateTime, Utc};
use tracing::debug;

use fatoura_accounts::Account;
use fatoura_core::{DomainError, DomainResult, InvoiceId};

use crate::billing::{BillingDecision, InvoiceOperation, decide};
use crate::invoice::{Invoice, InvoiceDraft, InvoiceStatus};
use crate::pricing::{InvoiceTotals, compute_totals};

/// Facts the store looked up for the draft, inside its transactional unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteFacts {
    /// The draft's client exists and belongs to the account.
    pub client_exists: bool,
    /// Another invoice of the account already uses the draft's number.
    pub number_taken: bool,
    pub now: DateTime<Utc>,
}

/// A planned write: the invoice to store and the credit outcome to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceWrite {
    pub invoice: Invoice,
    pub decision: BillingDecision,
}

pub fn plan_create(
    account: &Account,
    id: InvoiceId,
    draft: InvoiceDraft,
    facts: &WriteFacts,
) -> DomainResult<InvoiceWrite> {
    let (draft, totals) = price_draft(account, draft)?;
    check_references(&draft, facts)?;
    let decision = decide(account, InvoiceOperation::Create)?;

    let invoice = build(account, id, draft, totals, decision, facts.now, facts.now);
    Ok(InvoiceWrite { invoice, decision })
}

/// Plan an update of `existing`; the result keeps its id and creation time.
pub fn plan_update(
    account: &Account,
    existing: &Invoice,
    draft: InvoiceDraft,
    facts: &WriteFacts,
) -> DomainResult<InvoiceWrite> {
    if existing.account_id != account.id {
        return Err(DomainError::not_found("invoice"));
    }
    let (mut draft, totals) = price_draft(account, draft)?;
    check_references(&draft, facts)?;
    // A paid invoice re-saved without a date keeps the one it was paid on.
    if draft.status == InvoiceStatus::Paid && draft.payment_date.is_none() {
        draft.payment_date = existing.payment_date;
    }
    let decision = decide(
        account,
        InvoiceOperation::Update {
            edit_count: existing.edit_count,
        },
    )?;

    let invoice = build(
        account,
        existing.id,
        draft,
        totals,
        decision,
        existing.created_at,
        facts.now,
    );
    Ok(InvoiceWrite { invoice, decision })
}

fn price_draft(account: &Account, draft: InvoiceDraft) -> DomainResult<(InvoiceDraft, InvoiceTotals)> {
    let draft = draft.validated()?;
    let totals = compute_totals(&draft.items, account.is_tax_exempt())?;

    let submitted = (draft.sub_total, draft.tax_amount, draft.total);
    if submitted != (None, None, None)
        && submitted != (Some(totals.sub_total), Some(totals.tax_amount), Some(totals.total))
    {
        debug!(
            invoice_number = %draft.invoice_number,
            submitted_sub_total = ?draft.sub_total,
            submitted_tax_amount = ?draft.tax_amount,
            submitted_total = ?draft.total,
            sub_total = %totals.sub_total,
            tax_amount = %totals.tax_amount,
            total = %totals.total,
            "submitted totals differ from computed totals; using computed"
        );
    }
    Ok((draft, totals))
}

fn check_references(draft: &InvoiceDraft, facts: &WriteFacts) -> DomainResult<()> {
    if !facts.client_exists {
        return Err(DomainError::not_found("client"));
    }
    if facts.number_taken {
        return Err(DomainError::duplicate_number(draft.invoice_number.clone()));
    }
    Ok(())
}

fn build(
    account: &Account,
    id: InvoiceId,
    draft: InvoiceDraft,
    totals: InvoiceTotals,
    decision: BillingDecision,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Invoice {
    let payment_date = match (draft.status, draft.payment_date) {
        (InvoiceStatus::Paid, None) => Some(now.date_naive()),
        (_, submitted) => submitted,
    };

    Invoice {
        id,
        account_id: account.id,
        invoice_number: draft.invoice_number,
        client_id: draft.client_id,
        items: draft.items,
        issue_date: draft.issue_date,
        due_date: draft.due_date,
        status: draft.status,
        currency: draft
            .currency
            .unwrap_or(account.settings.default_currency),
        notes: draft.notes,
        sub_total: totals.sub_total,
        tax_amount: totals.tax_amount,
        total: totals.total,
        edit_count: decision.new_edit_count,
        payment_date,
        created_at,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fatoura_accounts::{AdminGeneralSettings, BusinessType, NewAccount};
    use fatoura_core::{AccountId, ClientId, Currency};
    use rust_decimal_macros::dec;

    use crate::invoice::InvoiceItem;

    fn account(credits: u32) -> Account {
        let mut general = AdminGeneralSettings::default();
        general.registration.initial_credits = credits;
        Account::provision(
            AccountId::new(),
            NewAccount {
                name: "Karim Benali".to_string(),
                email: "karim@benali.ma".to_string(),
                phone: None,
                company_name: "Benali Travaux".to_string(),
            },
            &general,
            Utc::now(),
        )
        .unwrap()
    }

    fn draft() -> InvoiceDraft {
        InvoiceDraft {
            invoice_number: " INV-2026-001 ".to_string(),
            client_id: ClientId::new(),
            items: vec![
                InvoiceItem {
                    description: "Pose carrelage".to_string(),
                    quantity: dec!(2),
                    unit_price: dec!(100),
                    tax_rate_percent: dec!(20),
                },
                InvoiceItem {
                    description: "Déplacement".to_string(),
                    quantity: dec!(1),
                    unit_price: dec!(50),
                    tax_rate_percent: dec!(0),
                },
            ],
            issue_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2026, 5, 31).unwrap(),
            status: InvoiceStatus::Sent,
            currency: None,
            notes: None,
            payment_date: None,
            sub_total: Some(dec!(1)),
            tax_amount: Some(dec!(1)),
            total: Some(dec!(2)),
        }
    }

    fn facts() -> WriteFacts {
        WriteFacts {
            client_exists: true,
            number_taken: false,
            now: Utc::now(),
        }
    }

    #[test]
    fn create_recomputes_totals_and_ignores_submitted_ones() {
        let acc = account(1);
        let write = plan_create(&acc, InvoiceId::new(), draft(), &facts()).unwrap();
        assert_eq!(write.invoice.invoice_number, "INV-2026-001");
        assert_eq!(write.invoice.sub_total, dec!(250));
        assert_eq!(write.invoice.tax_amount, dec!(40));
        assert_eq!(write.invoice.total, dec!(290));
        assert_eq!(write.invoice.edit_count, 0);
        assert_eq!(write.invoice.currency, Currency::Mad);
        assert!(write.decision.charge);
    }

    #[test]
    fn auto_entrepreneur_invoice_has_no_tax() {
        let mut acc = account(1);
        acc.settings.business_type = BusinessType::AutoEntrepreneur;
        let write = plan_create(&acc, InvoiceId::new(), draft(), &facts()).unwrap();
        assert_eq!(write.invoice.tax_amount, dec!(0));
        assert_eq!(write.invoice.total, dec!(250));
    }

    #[test]
    fn checks_run_in_order() {
        // Validation beats everything else.
        let mut bad = draft();
        bad.items.clear();
        let no_facts = WriteFacts {
            client_exists: false,
            number_taken: true,
            now: Utc::now(),
        };
        assert!(matches!(
            plan_create(&account(0), InvoiceId::new(), bad, &no_facts),
            Err(DomainError::Validation(_))
        ));

        // Missing client beats duplicate number and credits.
        assert_eq!(
            plan_create(&account(0), InvoiceId::new(), draft(), &no_facts),
            Err(DomainError::NotFound("client"))
        );

        // Duplicate number beats credits.
        let taken = WriteFacts {
            number_taken: true,
            ..facts()
        };
        assert_eq!(
            plan_create(&account(0), InvoiceId::new(), draft(), &taken),
            Err(DomainError::DuplicateInvoiceNumber("INV-2026-001".to_string()))
        );

        assert_eq!(
            plan_create(&account(0), InvoiceId::new(), draft(), &facts()),
            Err(DomainError::InsufficientCredits)
        );
    }

    #[test]
    fn update_keeps_identity_and_advances_edit_count() {
        let acc = account(1);
        let created = plan_create(&acc, InvoiceId::new(), draft(), &facts())
            .unwrap()
            .invoice;

        let first = plan_update(&acc, &created, draft(), &facts()).unwrap();
        assert_eq!(first.invoice.id, created.id);
        assert_eq!(first.invoice.created_at, created.created_at);
        assert_eq!(first.invoice.edit_count, 1);
        assert!(!first.decision.charge);

        let second = plan_update(&acc, &first.invoice, draft(), &facts()).unwrap();
        assert_eq!(second.invoice.edit_count, 2);
        assert!(second.decision.charge);
    }

    #[test]
    fn update_of_foreign_invoice_is_not_found() {
        let owner = account(1);
        let created = plan_create(&owner, InvoiceId::new(), draft(), &facts())
            .unwrap()
            .invoice;
        assert_eq!(
            plan_update(&account(5), &created, draft(), &facts()),
            Err(DomainError::NotFound("invoice"))
        );
    }

    #[test]
    fn paid_without_payment_date_is_stamped_with_today() {
        let mut d = draft();
        d.status = InvoiceStatus::Paid;
        let f = facts();
        let write = plan_create(&account(1), InvoiceId::new(), d, &f).unwrap();
        assert_eq!(write.invoice.payment_date, Some(f.now.date_naive()));
    }

    #[test]
    fn re_editing_a_paid_invoice_keeps_its_payment_date() {
        let acc = account(3);
        let paid_on = NaiveDate::from_ymd_opt(2026, 5, 20).unwrap();
        let mut d = draft();
        d.status = InvoiceStatus::Paid;
        d.payment_date = Some(paid_on);
        let created = plan_create(&acc, InvoiceId::new(), d, &facts()).unwrap().invoice;

        let mut resubmitted = draft();
        resubmitted.status = InvoiceStatus::Paid;
        let edited = plan_update(&acc, &created, resubmitted, &facts()).unwrap();
        assert_eq!(edited.invoice.payment_date, Some(paid_on));

        // An explicit date still wins.
        let corrected_on = NaiveDate::from_ymd_opt(2026, 5, 22).unwrap();
        let mut corrected = draft();
        corrected.status = InvoiceStatus::Paid;
        corrected.payment_date = Some(corrected_on);
        let edited = plan_update(&acc, &edited.invoice, corrected, &facts()).unwrap();
        assert_eq!(edited.invoice.payment_date, Some(corrected_on));
    }
}
