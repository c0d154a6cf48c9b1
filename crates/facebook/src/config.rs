use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Configuration for a single Facebook page.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FacebookAccountConfig {
    /// Graph API base URL including the version segment.
    pub graph_url: String,

    /// Page access token used for the Send API.
    #[serde(serialize_with = "serialize_secret")]
    pub page_access_token: Secret<String>,

    /// App secret for `X-Hub-Signature-256` verification. Unsigned callbacks
    /// are accepted when unset.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub app_secret: Option<Secret<String>>,

    /// Token expected in the webhook subscription handshake.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub verification_token: Option<Secret<String>>,
}

impl std::fmt::Debug for FacebookAccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacebookAccountConfig")
            .field("graph_url", &self.graph_url)
            .field("page_access_token", &"[REDACTED]")
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[REDACTED]"))
            .field(
                "verification_token",
                &self.verification_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for FacebookAccountConfig {
    fn default() -> Self {
        Self {
            graph_url: "https://graph.facebook.com/v2.6".into(),
            page_access_token: Secret::new(String::new()),
            app_secret: None,
            verification_token: None,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
