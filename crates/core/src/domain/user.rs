use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Trims and lowercases before checking for a `local@domain.tld` shape.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let normalized = raw.trim().to_ascii_lowercase();
        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(DomainError::InvalidEmail(raw.to_owned()));
        };

        let domain_ok = domain
            .rsplit_once('.')
            .map(|(host, tld)| !host.is_empty() && tld.len() >= 2)
            .unwrap_or(false);
        if local.is_empty() || !domain_ok || normalized.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidEmail(raw.to_owned()));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email_address: EmailAddress,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub client_slug: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: impl Into<String>, email_address: EmailAddress) -> Self {
        Self {
            id: UserId(id.into()),
            email_address,
            first_name: None,
            last_name: None,
            client_slug: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_client_slug(mut self, client_slug: impl Into<String>) -> Self {
        self.client_slug = Some(client_slug.into());
        self
    }

    pub fn with_name(
        mut self,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        self.first_name = Some(first_name.into());
        self.last_name = Some(last_name.into());
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn belongs_to(&self, tenant: &str) -> bool {
        self.client_slug.as_deref() == Some(tenant)
    }

    pub fn full_name(&self) -> String {
        let parts = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>();

        if parts.is_empty() {
            self.email_address.to_string()
        } else {
            parts.join(" ")
        }
    }
}
