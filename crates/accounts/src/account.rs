use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fatoura_core::validation::{optional_email, optional_text, required_text};
use fatoura_core::{AccountId, DomainError, DomainResult};

use crate::settings::{AdminGeneralSettings, CompanySettings};

/// Largest credit balance an account may hold; balances are stored as a
/// signed 32-bit column.
pub const MAX_CREDITS: u32 = i32::MAX as u32;

/// Input for provisioning a new account from the back-office.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub company_name: String,
}

/// A business using the platform.
///
/// `credits` is the prepaid balance spent by billable invoice operations; it
/// never goes below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub credits: u32,
    pub settings: CompanySettings,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create an account using the platform's registration and invoice defaults.
    pub fn provision(
        id: AccountId,
        new: NewAccount,
        general: &AdminGeneralSettings,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if !general.registration.allow_registration {
            return Err(DomainError::conflict("registration is closed"));
        }

        let name = required_text("name", &new.name, 255)?;
        let email = optional_email("email", Some(&new.email))?
            .ok_or_else(|| DomainError::validation("email is required"))?;
        let phone = optional_text("phone", new.phone.as_deref(), Some(20))?;

        let mut settings = CompanySettings::for_company(new.company_name, &general.default_invoice);
        settings.email = Some(email.clone());
        settings.phone = phone.clone();

        Ok(Self {
            id,
            name,
            email,
            phone,
            credits: general.registration.initial_credits,
            settings: settings.validated()?,
            created_at: now,
        })
    }

    /// Change the account holder's display name.
    pub fn rename(&mut self, name: &str) -> DomainResult<()> {
        self.name = required_text("name", name, 255)?;
        Ok(())
    }

    pub fn is_tax_exempt(&self) -> bool {
        self.settings.is_tax_exempt()
    }

    pub fn has_credit(&self) -> bool {
        self.credits > 0
    }

    /// Spend one credit, refusing at zero.
    pub fn consume_credit(&mut self) -> DomainResult<()> {
        self.credits = self
            .credits
            .checked_sub(1)
            .ok_or(DomainError::InsufficientCredits)?;
        Ok(())
    }

    /// Add `amount` credits and return the new balance.
    pub fn grant_credits(&mut self, amount: u32) -> DomainResult<u32> {
        if amount < 1 {
            return Err(DomainError::validation("amount must be at least 1"));
        }
        self.credits = self
            .credits
            .checked_add(amount)
            .filter(|balance| *balance <= MAX_CREDITS)
            .ok_or_else(|| {
                DomainError::validation(format!("credit balance must not exceed {MAX_CREDITS}"))
            })?;
        Ok(self.credits)
    }
}
