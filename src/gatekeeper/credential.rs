use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;

use crate::config::SessionConfig;

/// Session tokens as carried by the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionCredential {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl SessionCredential {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// What the outgoing response must do to the client's session cookies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CredentialChange {
    #[default]
    Keep,
    Refresh(SessionCredential),
    Clear,
}

/// Cookie names and attributes for the session credential
#[derive(Debug, Clone)]
pub struct SessionCookies {
    access_name: String,
    refresh_name: String,
    refresh_max_age: time::Duration,
    secure: bool,
}

impl SessionCookies {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            access_name: config.access_cookie.clone(),
            refresh_name: config.refresh_cookie.clone(),
            refresh_max_age: time::Duration::seconds(config.refresh_ttl_secs as i64),
            secure: config.secure_cookies,
        }
    }

    pub fn access_name(&self) -> &str {
        &self.access_name
    }

    pub fn refresh_name(&self) -> &str {
        &self.refresh_name
    }

    pub fn read(&self, jar: &CookieJar) -> SessionCredential {
        let value = |name: &str| {
            jar.get(name)
                .map(|cookie| cookie.value().to_string())
                .filter(|value| !value.is_empty())
        };

        SessionCredential {
            access_token: value(&self.access_name),
            refresh_token: value(&self.refresh_name),
        }
    }

    pub fn apply(&self, jar: CookieJar, change: &CredentialChange) -> CookieJar {
        match change {
            CredentialChange::Keep => jar,
            CredentialChange::Refresh(credential) => self.write(jar, credential),
            CredentialChange::Clear => self.clear(jar),
        }
    }

    pub fn write(&self, mut jar: CookieJar, credential: &SessionCredential) -> CookieJar {
        if let Some(access) = &credential.access_token {
            jar = jar.add(self.cookie(&self.access_name, access.clone()));
        }
        if let Some(refresh) = &credential.refresh_token {
            let mut cookie = self.cookie(&self.refresh_name, refresh.clone());
            cookie.set_max_age(self.refresh_max_age);
            jar = jar.add(cookie);
        }
        jar
    }

    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build((self.access_name.clone(), "")).path("/"))
            .remove(Cookie::build((self.refresh_name.clone(), "")).path("/"))
    }

    /// `Cookie` header value for the forwarded request, with the session pair
    /// swapped for rotated tokens or dropped when the session was cleared.
    /// Other cookies pass through untouched.
    pub fn outbound_header(&self, incoming: &HeaderMap, change: &CredentialChange) -> Option<String> {
        let mut pairs: Vec<String> = incoming
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .filter(|pair| matches!(change, CredentialChange::Keep) || !self.is_session_pair(pair))
            .map(str::to_string)
            .collect();

        if let CredentialChange::Refresh(credential) = change {
            if let Some(access) = &credential.access_token {
                pairs.push(format!("{}={}", self.access_name, access));
            }
            if let Some(refresh) = &credential.refresh_token {
                pairs.push(format!("{}={}", self.refresh_name, refresh));
            }
        }

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    fn is_session_pair(&self, pair: &str) -> bool {
        let name = pair.split_once('=').map_or(pair, |(name, _)| name).trim();
        name == self.access_name || name == self.refresh_name
    }

    fn cookie(&self, name: &str, value: String) -> Cookie<'static> {
        Cookie::build((name.to_string(), value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .build()
    }
}
