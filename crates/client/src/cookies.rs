//! Cookie jar mirrored into durable storage.
//!
//! The API keeps its refresh credential in an http-only cookie. A browser
//! keeps that cookie across reloads; [`PersistentCookieJar`] does the same
//! for this client by writing every change through to [`Storage`] under the
//! `cookies` key.
//!
//! Cookie semantics (`Expires`, `Max-Age`, `Path`, `Domain`, `Secure`) come
//! from [`cookie_store`], the same store behind reqwest's own jar. Only
//! persistent, unexpired cookies are written to storage, and expired ones
//! are skipped when the record is read back.

use std::sync::Arc;

use cookie_store::{CookieStore, RawCookie};
use parking_lot::RwLock;
use reqwest::header::HeaderValue;
use url::Url;

use crate::storage::{COOKIES_KEY, Storage};

/// A [`reqwest::cookie::CookieStore`] that survives restarts.
///
/// The jar only accepts cookies from the API host.
pub struct PersistentCookieJar {
    host: Option<String>,
    storage: Arc<dyn Storage>,
    store: RwLock<CookieStore>,
}

impl PersistentCookieJar {
    /// Restore the jar for `api_base` from durable storage.
    ///
    /// A corrupt record is logged and discarded.
    #[must_use]
    pub fn load(storage: Arc<dyn Storage>, api_base: &Url) -> Self {
        let store = match storage.get(COOKIES_KEY) {
            Ok(Some(raw)) => cookie_store::serde::json::load(raw.as_bytes()).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Discarding unreadable cookie record");
                CookieStore::default()
            }),
            Ok(None) => CookieStore::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cookie record");
                CookieStore::default()
            }
        };

        Self {
            host: api_base.host_str().map(str::to_owned),
            storage,
            store: RwLock::new(store),
        }
    }

    /// Value of the unexpired cookie called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.store
            .read()
            .iter_unexpired()
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_owned())
    }

    /// Whether the jar holds no unexpired cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.read().iter_unexpired().next().is_none()
    }

    /// Drop every cookie, in memory and in durable storage.
    pub fn clear(&self) {
        self.store.write().clear();
        if let Err(e) = self.storage.remove(COOKIES_KEY) {
            tracing::warn!(error = %e, "Failed to erase cookie record");
        }
    }

    fn serves(&self, url: &Url) -> bool {
        self.host.as_deref() == url.host_str()
    }

    fn persist(&self, store: &CookieStore) {
        let result = if store.iter_unexpired().any(cookie_store::Cookie::is_persistent) {
            let mut buf = Vec::new();
            if let Err(e) = cookie_store::serde::json::save(store, &mut buf) {
                tracing::warn!(error = %e, "Failed to serialize cookies");
                return;
            }
            self.storage
                .set(COOKIES_KEY, &String::from_utf8_lossy(&buf))
        } else {
            self.storage.remove(COOKIES_KEY)
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist cookies");
        }
    }
}

impl reqwest::cookie::CookieStore for PersistentCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        if !self.serves(url) {
            return;
        }

        let parsed: Vec<RawCookie<'static>> = cookie_headers
            .filter_map(|header| header.to_str().ok())
            .filter_map(|raw| RawCookie::parse(raw).ok().map(RawCookie::into_owned))
            .collect();
        if parsed.is_empty() {
            return;
        }

        let mut store = self.store.write();
        store.store_response_cookies(parsed.into_iter(), url);
        self.persist(&store);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        if !self.serves(url) {
            return None;
        }
        let header = self
            .store
            .read()
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::cookie::CookieStore as _;

    use super::*;
    use crate::storage::MemoryStorage;

    fn api() -> Url {
        Url::parse("http://books.example.com/api/v1/users/login").unwrap()
    }

    fn set(jar: &PersistentCookieJar, url: &Url, raw: &str) {
        let header = HeaderValue::from_str(raw).unwrap();
        jar.set_cookies(&mut std::iter::once(&header), url);
    }

    const REFRESH: &str = "refresh_token=abc; HttpOnly; Path=/; Max-Age=604800; SameSite=lax";

    #[test]
    fn test_cookies_survive_reload() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let jar = PersistentCookieJar::load(storage.clone(), &api());
        set(&jar, &api(), REFRESH);

        let reloaded = PersistentCookieJar::load(storage, &api());
        assert_eq!(reloaded.get("refresh_token").as_deref(), Some("abc"));
        assert_eq!(
            reloaded.cookies(&api()).unwrap().to_str().unwrap(),
            "refresh_token=abc"
        );
    }

    #[test]
    fn test_session_cookie_is_not_persisted() {
        let storage = Arc::new(MemoryStorage::new());
        let jar = PersistentCookieJar::load(storage.clone(), &api());
        set(&jar, &api(), "theme=dark; Path=/");

        assert_eq!(jar.get("theme").as_deref(), Some("dark"));
        assert!(storage.get(COOKIES_KEY).unwrap().is_none());
    }

    #[test]
    fn test_only_serves_api_host() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let jar = PersistentCookieJar::load(storage, &api());
        let other = Url::parse("http://tracker.example.com/").unwrap();

        set(&jar, &other, "id=1; Max-Age=60");
        assert!(jar.is_empty());

        set(&jar, &api(), REFRESH);
        assert!(jar.cookies(&other).is_none());
    }

    #[test]
    fn test_clear_erases_record() {
        let storage = Arc::new(MemoryStorage::new());
        let jar = PersistentCookieJar::load(storage.clone(), &api());
        set(&jar, &api(), REFRESH);
        assert!(storage.get(COOKIES_KEY).unwrap().is_some());

        jar.clear();
        assert!(jar.is_empty());
        assert!(storage.get(COOKIES_KEY).unwrap().is_none());
    }

    #[test]
    fn test_zero_max_age_removes_cookie() {
        let storage = Arc::new(MemoryStorage::new());
        let jar = PersistentCookieJar::load(storage.clone(), &api());
        set(&jar, &api(), REFRESH);
        set(&jar, &api(), "refresh_token=\"\"; Max-Age=0; Path=/");

        assert!(jar.get("refresh_token").is_none());
        assert!(jar.cookies(&api()).is_none());
        assert!(storage.get(COOKIES_KEY).unwrap().is_none());
    }

    #[test]
    fn test_past_expires_removes_cookie() {
        let storage = Arc::new(MemoryStorage::new());
        let jar = PersistentCookieJar::load(storage.clone(), &api());
        set(&jar, &api(), REFRESH);
        set(
            &jar,
            &api(),
            "refresh_token=abc; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/",
        );

        assert!(jar.get("refresh_token").is_none());
        assert!(jar.cookies(&api()).is_none());
        assert!(storage.get(COOKIES_KEY).unwrap().is_none());
    }

    #[test]
    fn test_secure_cookie_is_not_sent_over_http() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let jar = PersistentCookieJar::load(storage, &api());
        set(&jar, &api(), "refresh_token=abc; Secure; Path=/; Max-Age=60");

        assert!(jar.cookies(&api()).is_none());
    }

    #[test]
    fn test_corrupt_record_is_discarded() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(COOKIES_KEY, "{not json").unwrap();

        let jar = PersistentCookieJar::load(storage, &api());
        assert!(jar.is_empty());
    }
}
