use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fatoura_core::validation::{optional_email, optional_text, required_text};
use fatoura_core::{AccountId, ClientId, DomainResult, Owned};

/// Client fields as submitted on create/update.
///
/// `cin` is the national identity card number, `ice` the company identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetails {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub cin: Option<String>,
    #[serde(default)]
    pub ice: Option<String>,
}

impl ClientDetails {
    /// Trim every field and enforce length/format rules.
    pub fn validated(self) -> DomainResult<Self> {
        Ok(Self {
            name: required_text("name", &self.name, 255)?,
            email: optional_email("email", self.email.as_deref())?,
            phone: optional_text("phone", self.phone.as_deref(), Some(20))?,
            address: optional_text("address", self.address.as_deref(), None)?,
            cin: optional_text("cin", self.cin.as_deref(), Some(50))?,
            ice: optional_text("ice", self.ice.as_deref(), Some(50))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    pub account_id: AccountId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub cin: Option<String>,
    pub ice: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn create(
        id: ClientId,
        account_id: AccountId,
        details: ClientDetails,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let d = details.validated()?;
        Ok(Self {
            id,
            account_id,
            name: d.name,
            email: d.email,
            phone: d.phone,
            address: d.address,
            cin: d.cin,
            ice: d.ice,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace all editable fields. On error `self` is untouched.
    pub fn update(&mut self, details: ClientDetails, now: DateTime<Utc>) -> DomainResult<()> {
        let d = details.validated()?;
        self.name = d.name;
        self.email = d.email;
        self.phone = d.phone;
        self.address = d.address;
        self.cin = d.cin;
        self.ice = d.ice;
        self.updated_at = now;
        Ok(())
    }
}

impl Owned for Client {
    fn account_id(&self) -> AccountId {
        self.account_id
    }
}
