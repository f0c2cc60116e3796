//! OAuth code exchange against Microsoft and Google. The rest of the app
//! only ever sees a [`ProviderIdentity`]; tokens from the provider are not
//! retained.

use lazy_static::lazy_static;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::OauthConfig;

lazy_static! {
    static ref HTTP: reqwest::Client = reqwest::Client::new();
}

const SCOPE: &str = "openid email profile";
const MICROSOFT_USERINFO: &str = "https://graph.microsoft.com/oidc/userinfo";
const GOOGLE_AUTHORIZE: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Microsoft,
    Google,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Microsoft => "microsoft",
            Provider::Google => "google",
        }
    }

    pub fn parse(s: &str) -> Option<Provider> {
        match s {
            "microsoft" => Some(Provider::Microsoft),
            "google" => Some(Provider::Google),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum OauthError {
    #[error("provider is not configured")]
    NotConfigured,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token exchange failed with status {status}")]
    Exchange { status: u16 },

    #[error("userinfo response had no email")]
    MissingEmail,
}

/// What we need back from the provider to sign a user in.
#[derive(Debug, Deserialize)]
pub struct ProviderIdentity {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

struct ProviderEndpoints<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    authorize: String,
    token: String,
    userinfo: &'static str,
}

fn endpoints(provider: Provider, cfg: &OauthConfig) -> Result<ProviderEndpoints<'_>, OauthError> {
    match provider {
        Provider::Microsoft => {
            if cfg.microsoft_client_id.is_empty() {
                return Err(OauthError::NotConfigured);
            }
            Ok(ProviderEndpoints {
                client_id: &cfg.microsoft_client_id,
                client_secret: &cfg.microsoft_client_secret,
                authorize: format!(
                    "https://login.microsoftonline.com/{}/oauth2/v2.0/authorize",
                    cfg.microsoft_tenant
                ),
                token: format!(
                    "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                    cfg.microsoft_tenant
                ),
                userinfo: MICROSOFT_USERINFO,
            })
        }
        Provider::Google => {
            if cfg.google_client_id.is_empty() {
                return Err(OauthError::NotConfigured);
            }
            Ok(ProviderEndpoints {
                client_id: &cfg.google_client_id,
                client_secret: &cfg.google_client_secret,
                authorize: GOOGLE_AUTHORIZE.to_string(),
                token: GOOGLE_TOKEN.to_string(),
                userinfo: GOOGLE_USERINFO,
            })
        }
    }
}

fn redirect_uri(provider: Provider, cfg: &OauthConfig) -> String {
    format!(
        "{}/api/v1/auth/callback/{}",
        cfg.public_base_url.trim_end_matches('/'),
        provider.as_str()
    )
}

/// Build the provider's authorize URL for a login redirect.
pub fn authorize_url(
    provider: Provider,
    cfg: &OauthConfig,
    state_token: &str,
) -> Result<String, OauthError> {
    let ep = endpoints(provider, cfg)?;
    Ok(format!(
        "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}",
        ep.authorize,
        urlencoding::encode(ep.client_id),
        urlencoding::encode(&redirect_uri(provider, cfg)),
        urlencoding::encode(SCOPE),
        urlencoding::encode(state_token),
    ))
}

/// Exchange the callback `code` for tokens and fetch the user's identity.
pub async fn fetch_identity(
    provider: Provider,
    cfg: &OauthConfig,
    code: &str,
) -> Result<ProviderIdentity, OauthError> {
    let ep = endpoints(provider, cfg)?;
    let redirect = redirect_uri(provider, cfg);

    let resp = HTTP
        .post(&ep.token)
        .form(&[
            ("client_id", ep.client_id),
            ("client_secret", ep.client_secret),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect.as_str()),
        ])
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(OauthError::Exchange {
            status: resp.status().as_u16(),
        });
    }
    let token: TokenResponse = resp.json().await?;
    debug!(provider = provider.as_str(), "token exchange complete");

    let identity: ProviderIdentity = HTTP
        .get(ep.userinfo)
        .bearer_auth(&token.access_token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if identity.email.trim().is_empty() {
        return Err(OauthError::MissingEmail);
    }
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oauth_config() -> OauthConfig {
        OauthConfig {
            microsoft_client_id: "ms-client".into(),
            microsoft_client_secret: "ms-secret".into(),
            microsoft_tenant: "contoso".into(),
            google_client_id: "g-client".into(),
            google_client_secret: "g-secret".into(),
            public_base_url: "https://clock.example.com/".into(),
        }
    }

    #[test]
    fn provider_parse_round_trips() {
        assert_eq!(Provider::parse("microsoft"), Some(Provider::Microsoft));
        assert_eq!(Provider::parse("google"), Some(Provider::Google));
        assert_eq!(Provider::parse("github"), None);
    }

    #[test]
    fn microsoft_authorize_url_is_tenant_scoped() {
        let url = authorize_url(Provider::Microsoft, &oauth_config(), "st").unwrap();
        assert!(url.starts_with("https://login.microsoftonline.com/contoso/oauth2/v2.0/authorize?"));
        assert!(url.contains("client_id=ms-client"));
        assert!(url.contains("state=st"));
        assert!(url.contains(
            "redirect_uri=https%3A%2F%2Fclock.example.com%2Fapi%2Fv1%2Fauth%2Fcallback%2Fmicrosoft"
        ));
        assert!(url.contains("scope=openid%20email%20profile"));
    }

    #[test]
    fn unconfigured_provider_is_an_error() {
        let mut cfg = oauth_config();
        cfg.google_client_id.clear();
        assert!(matches!(
            authorize_url(Provider::Google, &cfg, "st"),
            Err(OauthError::NotConfigured)
        ));
    }
}
