use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer, ser::SerializeStruct};

use casebridge_core::{DomainError, DomainResult, Entity, OAuthProviderId, required_text};

use crate::REDACTED;

/// A configured OAuth login provider (e.g. Google, Microsoft).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProvider {
    pub id: OAuthProviderId,
    /// Stable slug used in callback URLs (e.g. "google").
    pub provider_id: String,
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Serialize for OAuthProvider {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("OAuthProvider", 9)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("provider_id", &self.provider_id)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("client_id", &self.client_id)?;
        s.serialize_field("client_secret", REDACTED)?;
        s.serialize_field("scopes", &self.scopes)?;
        s.serialize_field("is_enabled", &self.is_enabled)?;
        s.serialize_field("created_at", &self.created_at)?;
        s.serialize_field("updated_at", &self.updated_at)?;
        s.end()
    }
}

impl Entity for OAuthProvider {
    type Id = OAuthProviderId;
    const NAME: &'static str = "oauth provider";

    fn id(&self) -> &OAuthProviderId {
        &self.id
    }
}

/// What the login screen is allowed to know about a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicProvider {
    pub provider_id: String,
    pub name: String,
}

impl From<&OAuthProvider> for PublicProvider {
    fn from(p: &OAuthProvider) -> Self {
        Self {
            provider_id: p.provider_id.clone(),
            name: p.name.clone(),
        }
    }
}

/// Lowercase slug of ASCII letters, digits, `-` and `_`.
fn parse_slug(raw: Option<&str>) -> DomainResult<String> {
    let slug = required_text(raw, "provider_id")?.to_lowercase();
    if slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(slug)
    } else {
        Err(DomainError::validation(
            "provider_id may only contain letters, digits, '-' and '_'",
        ))
    }
}

pub fn normalize_scopes(scopes: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(scopes.len());
    for scope in scopes.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !out.iter().any(|s| s == scope) {
            out.push(scope.to_string());
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOAuthProvider {
    pub provider_id: String,
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    pub is_enabled: bool,
}

impl NewOAuthProvider {
    pub fn new(
        provider_id: Option<&str>,
        name: Option<&str>,
        client_id: Option<&str>,
        client_secret: Option<&str>,
        scopes: Option<&[String]>,
        is_enabled: Option<bool>,
    ) -> DomainResult<Self> {
        Ok(Self {
            provider_id: parse_slug(provider_id)?,
            name: required_text(name, "name")?,
            client_id: required_text(client_id, "client_id")?,
            client_secret: required_text(client_secret, "client_secret")?,
            scopes: scopes.map(normalize_scopes).unwrap_or_default(),
            is_enabled: is_enabled.unwrap_or(false),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuthProviderPatch {
    pub name: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scopes: Option<Vec<String>>,
    pub is_enabled: Option<bool>,
}

impl OAuthProviderPatch {
    /// The redaction placeholder echoed back by a form means "keep the secret".
    pub fn new(
        name: Option<&str>,
        client_id: Option<&str>,
        client_secret: Option<&str>,
        scopes: Option<&[String]>,
        is_enabled: Option<bool>,
    ) -> DomainResult<Self> {
        Ok(Self {
            name: name.map(|v| required_text(Some(v), "name")).transpose()?,
            client_id: client_id
                .map(|v| required_text(Some(v), "client_id"))
                .transpose()?,
            client_secret: client_secret
                .filter(|v| *v != REDACTED)
                .map(|v| required_text(Some(v), "client_secret"))
                .transpose()?,
            scopes: scopes.map(normalize_scopes),
            is_enabled,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
