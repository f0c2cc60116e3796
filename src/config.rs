use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OauthConfig {
    pub microsoft_client_id: String,
    pub microsoft_client_secret: String,
    pub microsoft_tenant: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    /// Externally visible base URL; provider callbacks are registered
    /// against it.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub oauth: OauthConfig,
    /// Emails granted the admin flag at login. Lowercased.
    pub admin_emails: Vec<String>,
    /// Email domains allowed to sign in; empty list allows any domain.
    pub allowed_domains: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "timeclock".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "timeclock-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let oauth = OauthConfig {
            microsoft_client_id: std::env::var("MICROSOFT_CLIENT_ID").unwrap_or_default(),
            microsoft_client_secret: std::env::var("MICROSOFT_CLIENT_SECRET").unwrap_or_default(),
            microsoft_tenant: std::env::var("MICROSOFT_TENANT_ID")
                .unwrap_or_else(|_| "common".into()),
            google_client_id: std::env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            google_client_secret: std::env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            oauth,
            admin_emails: env_list("ADMIN_EMAILS"),
            allowed_domains: env_list("ALLOWED_DOMAINS"),
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|e| e == email)
    }

    /// Empty allow-list means every domain may sign in.
    pub fn is_domain_allowed(&self, email: &str) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }
        let domain = email.rsplit('@').next().unwrap_or_default();
        self.allowed_domains.iter().any(|d| d == domain)
    }
}

fn env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(admin_emails: Vec<String>, allowed_domains: Vec<String>) -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/test".into(),
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            oauth: OauthConfig {
                microsoft_client_id: String::new(),
                microsoft_client_secret: String::new(),
                microsoft_tenant: "common".into(),
                google_client_id: String::new(),
                google_client_secret: String::new(),
                public_base_url: "http://localhost:8080".into(),
            },
            admin_emails,
            allowed_domains,
        }
    }

    #[test]
    fn admin_flag_comes_from_allow_list() {
        let cfg = config_with(vec!["boss@x.com".into()], vec![]);
        assert!(cfg.is_admin_email("boss@x.com"));
        assert!(!cfg.is_admin_email("worker@x.com"));
    }

    #[test]
    fn empty_domain_list_allows_everyone() {
        let cfg = config_with(vec![], vec![]);
        assert!(cfg.is_domain_allowed("anyone@anywhere.org"));
    }

    #[test]
    fn domain_list_rejects_outsiders() {
        let cfg = config_with(vec![], vec!["x.com".into()]);
        assert!(cfg.is_domain_allowed("worker@x.com"));
        assert!(!cfg.is_domain_allowed("worker@y.com"));
    }
}
