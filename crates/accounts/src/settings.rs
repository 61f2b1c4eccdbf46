use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fatoura_core::validation::{optional_email, optional_text, percent, required_text};
use fatoura_core::{Currency, DomainError, DomainResult};

use crate::account::MAX_CREDITS;

/// Key under which [`AdminGeneralSettings`] is stored in the global settings map.
pub const ADMIN_GENERAL_SETTINGS_KEY: &str = "admin_general_settings";

const DEFAULT_INVOICE_PREFIX: &str = "INV-{YEAR}-";

/// Legal form of the business. Auto-entrepreneurs do not charge TVA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusinessType {
    #[default]
    Company,
    AutoEntrepreneur,
}

impl BusinessType {
    pub fn is_tax_exempt(self) -> bool {
        self == BusinessType::AutoEntrepreneur
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoEntrepreneurType {
    Services,
    Commercial,
    Industrial,
    Artisanal,
}

/// Per-account company profile printed on invoices.
///
/// ICE/IF/RC are Moroccan registration identifiers and are kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySettings {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub ice: Option<String>,
    #[serde(default)]
    pub iff: Option<String>,
    #[serde(default)]
    pub rc: Option<String>,
    pub default_tax_rate: Decimal,
    pub default_currency: Currency,
    pub business_type: BusinessType,
    #[serde(default)]
    pub auto_entrepreneur_type: Option<AutoEntrepreneurType>,
    pub invoice_number_prefix: String,
    #[serde(default)]
    pub default_notes: Option<String>,
}

impl CompanySettings {
    /// Fresh settings for a newly provisioned company.
    pub fn for_company(name: impl Into<String>, defaults: &DefaultInvoiceSettings) -> Self {
        Self {
            name: name.into(),
            email: None,
            phone: None,
            address: None,
            ice: None,
            iff: None,
            rc: None,
            default_tax_rate: defaults.tax_rate,
            default_currency: defaults.currency,
            business_type: BusinessType::Company,
            auto_entrepreneur_type: None,
            invoice_number_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
            default_notes: None,
        }
    }

    pub fn is_tax_exempt(&self) -> bool {
        self.business_type.is_tax_exempt()
    }

    /// Normalize and validate every field.
    pub fn validated(self) -> DomainResult<Self> {
        let auto_entrepreneur_type = match self.business_type {
            BusinessType::AutoEntrepreneur => self.auto_entrepreneur_type,
            // The sub-type only means something for auto-entrepreneurs.
            BusinessType::Company => None,
        };

        Ok(Self {
            name: required_text("name", &self.name, 255)?,
            email: optional_email("email", self.email.as_deref())?,
            phone: optional_text("phone", self.phone.as_deref(), Some(20))?,
            address: optional_text("address", self.address.as_deref(), None)?,
            ice: optional_text("ice", self.ice.as_deref(), Some(50))?,
            iff: optional_text("iff", self.iff.as_deref(), Some(50))?,
            rc: optional_text("rc", self.rc.as_deref(), Some(100))?,
            default_tax_rate: percent("default_tax_rate", self.default_tax_rate)?,
            default_currency: self.default_currency,
            business_type: self.business_type,
            auto_entrepreneur_type,
            invoice_number_prefix: required_text(
                "invoice_number_prefix",
                &self.invoice_number_prefix,
                50,
            )?,
            default_notes: optional_text("default_notes", self.default_notes.as_deref(), None)?,
        })
    }
}

/// Partial update of [`CompanySettings`]; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySettingsPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub ice: Option<String>,
    pub iff: Option<String>,
    pub rc: Option<String>,
    pub default_tax_rate: Option<Decimal>,
    pub default_currency: Option<Currency>,
    pub business_type: Option<BusinessType>,
    pub auto_entrepreneur_type: Option<AutoEntrepreneurType>,
    pub invoice_number_prefix: Option<String>,
    pub default_notes: Option<String>,
}

impl CompanySettingsPatch {
    /// Merge onto `current` and validate the result.
    pub fn apply(self, current: &CompanySettings) -> DomainResult<CompanySettings> {
        let current = current.clone();
        CompanySettings {
            name: self.name.unwrap_or(current.name),
            email: self.email.or(current.email),
            phone: self.phone.or(current.phone),
            address: self.address.or(current.address),
            ice: self.ice.or(current.ice),
            iff: self.iff.or(current.iff),
            rc: self.rc.or(current.rc),
            default_tax_rate: self.default_tax_rate.unwrap_or(current.default_tax_rate),
            default_currency: self.default_currency.unwrap_or(current.default_currency),
            business_type: self.business_type.unwrap_or(current.business_type),
            auto_entrepreneur_type: self.auto_entrepreneur_type.or(current.auto_entrepreneur_type),
            invoice_number_prefix: self
                .invoice_number_prefix
                .unwrap_or(current.invoice_number_prefix),
            default_notes: self.default_notes.or(current.default_notes),
        }
        .validated()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSettings {
    pub allow_registration: bool,
    pub initial_credits: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultInvoiceSettings {
    pub currency: Currency,
    pub tax_rate: Decimal,
}

/// Platform-wide settings edited from the back-office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminGeneralSettings {
    pub registration: RegistrationSettings,
    pub default_invoice: DefaultInvoiceSettings,
}

impl Default for AdminGeneralSettings {
    fn default() -> Self {
        Self {
            registration: RegistrationSettings {
                allow_registration: true,
                initial_credits: 5,
            },
            default_invoice: DefaultInvoiceSettings {
                currency: Currency::Mad,
                tax_rate: Decimal::from(20),
            },
        }
    }
}

impl AdminGeneralSettings {
    pub fn validated(self) -> DomainResult<Self> {
        percent("defaultInvoice.taxRate", self.default_invoice.tax_rate)?;
        if self.registration.initial_credits > MAX_CREDITS {
            return Err(DomainError::validation(format!(
                "registration.initialCredits must not exceed {MAX_CREDITS}"
            )));
        }
        Ok(self)
    }
}
