//! Accounts domain module.
//!
//! An account is one business on the platform: it owns clients and invoices,
//! holds the credit balance that pays for invoice operations, and carries the
//! company settings that drive invoicing defaults (including tax exemption).

pub mod account;
pub mod settings;

pub use account::{Account, MAX_CREDITS, NewAccount};
pub use settings::{
    ADMIN_GENERAL_SETTINGS_KEY, AdminGeneralSettings, AutoEntrepreneurType, BusinessType,
    CompanySettings, CompanySettingsPatch, DefaultInvoiceSettings, RegistrationSettings,
};
