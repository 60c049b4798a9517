use crate::error::ExecError;
use serde::Deserialize;
use std::fmt;

/// AWS account id, used to address the account's ECR registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountId(String);

impl AccountId {
    /// Accepts a non-empty string of ASCII digits (surrounding whitespace ignored).
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let id = raw.trim();
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdentityError::Malformed {
                detail: format!("account id {id:?} is not numeric"),
            });
        }
        Ok(Self(id.to_owned()))
    }

    /// Extracts the `Account` field of `aws sts get-caller-identity --output json`.
    pub fn from_caller_identity(json: &str) -> Result<Self, IdentityError> {
        #[derive(Deserialize)]
        struct CallerIdentity {
            #[serde(rename = "Account")]
            account: String,
        }

        let identity: CallerIdentity =
            serde_json::from_str(json).map_err(|e| IdentityError::Malformed {
                detail: e.to_string(),
            })?;
        Self::parse(&identity.account)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("error retrieving AWS account ID: {source}")]
    Query { source: ExecError },

    #[error("error retrieving AWS account ID: {detail}")]
    Malformed { detail: String },
}
