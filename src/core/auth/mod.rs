use serde::{Deserialize, Serialize};

/// A game profile owned by the account. Accounts without a purchase carry none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub name: String,
}

/// Credentials returned by the login flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_token: String,
    #[serde(default)]
    pub selected_profile: Option<Profile>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, profile: Option<Profile>) -> Self {
        Self {
            access_token: access_token.into(),
            selected_profile: profile,
        }
    }
}
