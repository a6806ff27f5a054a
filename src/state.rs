//! Process-wide settings as explicit, observable cells with key/value
//! persistence.

use crate::dates::DateRange;
use crate::locale::{Locale, Theme};
use crate::navigation::{LOGIN_URL, ROOT_URL};
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "     state";

pub const KEY_LOCALE: &str = "locale";
pub const KEY_THEME: &str = "theme";
pub const KEY_AUTHENTICATED: &str = "isAuthenticated";
pub const KEY_TOKEN: &str = "token";
pub const KEY_DATE_RANGE: &str = "dateRange";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Box<dyn FnMut(&T)>;

/// A single writable value; every `set` replaces it and notifies subscribers
/// in subscription order.
pub struct Observable<T> {
    value: T,
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T> Observable<T> {
    pub const fn new(value: T) -> Self {
        Self {
            value,
            next_id: 0,
            subscribers: Vec::new(),
        }
    }

    pub const fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        for (_, callback) in &mut self.subscribers {
            callback(&self.value);
        }
    }

    pub fn update(&mut self, change: impl FnOnce(&mut T)) {
        change(&mut self.value);
        for (_, callback) in &mut self.subscribers {
            callback(&self.value);
        }
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }
}

impl<T: Copy> Observable<T> {
    pub const fn value(&self) -> T {
        self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.value)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Flat JSON object on disk, one entry per key.
#[derive(Debug, Clone)]
pub struct KeyValueStore {
    path: PathBuf,
}

impl KeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file, missing key and malformed value all read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = match self.read_all() {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!(target: LOG_TARGET, "ignoring settings file: {err:#}");
                return None;
            }
        };
        let value = entries.get(key)?.clone();
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                log::warn!(target: LOG_TARGET, "ignoring malformed setting '{key}': {err}");
                None
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let mut entries = self.read_all().unwrap_or_default();
        let value = serde_json::to_value(value)
            .with_context(|| format!("failed to serialize setting '{key}'"))?;
        entries.insert(key.to_string(), value);
        self.write_all(&entries)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.read_all().unwrap_or_default();
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {}", self.path.display()))
    }

    fn write_all(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(entries).context("failed to encode settings")?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        log::debug!(target: LOG_TARGET, "saved settings to {}", self.path.display());
        Ok(())
    }
}

/// Login flag plus bearer token; not a security boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub token: Option<String>,
}

impl Session {
    pub fn login(&mut self, token: impl Into<String>) {
        self.authenticated = true;
        self.token = Some(token.into());
    }

    pub fn logout(&mut self) {
        self.authenticated = false;
        self.token = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Render(String),
    Redirect(String),
}

/// Sends unauthenticated visitors of any page but the login page to it.
pub fn guard_route(path: &str, session: &Session) -> RouteDecision {
    if session.authenticated {
        if path == LOGIN_URL {
            return RouteDecision::Redirect(ROOT_URL.to_string());
        }
        return RouteDecision::Render(path.to_string());
    }
    if path == LOGIN_URL {
        RouteDecision::Render(path.to_string())
    } else {
        RouteDecision::Redirect(LOGIN_URL.to_string())
    }
}

#[derive(Debug)]
pub struct Settings {
    pub locale: Observable<Locale>,
    pub theme: Observable<Theme>,
    pub session: Observable<Session>,
    pub date_range: Observable<Option<DateRange>>,
}

impl Settings {
    pub fn new(locale: Locale, theme: Theme) -> Self {
        Self {
            locale: Observable::new(locale),
            theme: Observable::new(theme),
            session: Observable::new(Session::default()),
            date_range: Observable::new(None),
        }
    }

    pub fn load(store: &KeyValueStore) -> Self {
        let mut settings = Self::new(
            store.get(KEY_LOCALE).unwrap_or_default(),
            store.get(KEY_THEME).unwrap_or_default(),
        );
        let session = Session {
            authenticated: store.get(KEY_AUTHENTICATED).unwrap_or(false),
            token: store.get(KEY_TOKEN),
        };
        settings.session = Observable::new(session);
        settings.date_range = Observable::new(store.get(KEY_DATE_RANGE));
        log::debug!(
            target: LOG_TARGET,
            "loaded settings: locale={} theme={} authenticated={}",
            settings.locale.get(),
            settings.theme.get(),
            settings.session.get().authenticated
        );
        settings
    }

    /// Writes each cell back to `store` whenever it changes.
    pub fn persist_changes(&mut self, store: &KeyValueStore) {
        let target = store.clone();
        self.locale.subscribe(move |locale| report(target.set(KEY_LOCALE, locale)));
        let target = store.clone();
        self.theme.subscribe(move |theme| report(target.set(KEY_THEME, theme)));
        let target = store.clone();
        self.session.subscribe(move |session| {
            report(target.set(KEY_AUTHENTICATED, &session.authenticated));
            match &session.token {
                Some(token) => report(target.set(KEY_TOKEN, token)),
                None => report(target.remove(KEY_TOKEN)),
            }
        });
        let target = store.clone();
        self.date_range.subscribe(move |range| match range {
            Some(range) => report(target.set(KEY_DATE_RANGE, range)),
            None => report(target.remove(KEY_DATE_RANGE)),
        });
    }
}

fn report(result: Result<()>) {
    if let Err(err) = result {
        log::warn!(target: LOG_TARGET, "failed to persist setting: {err:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn temp_store(name: &str) -> KeyValueStore {
        let path = std::env::temp_dir()
            .join(format!("metricdash-state-{}-{name}", std::process::id()))
            .join("settings.json");
        let _ = fs::remove_file(&path);
        KeyValueStore::new(path)
    }

    #[test]
    fn observable_notifies_in_order_until_unsubscribed() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut cell = Observable::new(Locale::En);

        let log_a = Rc::clone(&seen);
        let a = cell.subscribe(move |locale| log_a.borrow_mut().push(format!("a:{locale}")));
        let log_b = Rc::clone(&seen);
        cell.subscribe(move |locale| log_b.borrow_mut().push(format!("b:{locale}")));

        cell.set(Locale::Zh);
        assert!(cell.unsubscribe(a));
        assert!(!cell.unsubscribe(a));
        cell.set(Locale::En);

        assert_eq!(*seen.borrow(), vec!["a:zh", "b:zh", "b:en"]);
        assert_eq!(cell.value(), Locale::En);
    }

    #[test]
    fn store_round_trips_and_tolerates_garbage() {
        let store = temp_store("roundtrip");
        assert_eq!(store.get::<Locale>(KEY_LOCALE), None);

        store.set(KEY_LOCALE, &Locale::Zh).unwrap();
        store.set(KEY_THEME, &Theme::Dark).unwrap();
        assert_eq!(store.get::<Locale>(KEY_LOCALE), Some(Locale::Zh));
        assert_eq!(store.get::<Theme>(KEY_THEME), Some(Theme::Dark));

        store.set(KEY_LOCALE, "klingon").unwrap();
        assert_eq!(store.get::<Locale>(KEY_LOCALE), None);

        fs::write(store.path(), "not json").unwrap();
        assert_eq!(store.get::<Theme>(KEY_THEME), None);
    }

    #[test]
    fn settings_persist_on_change() {
        let store = temp_store("persist");
        let mut settings = Settings::load(&store);
        assert_eq!(settings.locale.value(), Locale::default());
        settings.persist_changes(&store);

        settings.locale.set(Locale::Zh);
        settings.session.update(|session| session.login("abc"));
        let range = DateRange::parse("2025-01-01", "2025-01-07").unwrap();
        settings.date_range.set(Some(range));

        let reloaded = Settings::load(&store);
        assert_eq!(reloaded.locale.value(), Locale::Zh);
        assert!(reloaded.session.get().authenticated);
        assert_eq!(reloaded.session.get().token.as_deref(), Some("abc"));
        assert_eq!(reloaded.date_range.value(), Some(range));

        settings.session.update(Session::logout);
        let reloaded = Settings::load(&store);
        assert!(!reloaded.session.get().authenticated);
        assert_eq!(reloaded.session.get().token, None);
    }

    #[test]
    fn guard_redirects_anonymous_visitors() {
        let mut session = Session::default();
        assert_eq!(
            guard_route("/statistics", &session),
            RouteDecision::Redirect("/login".into())
        );
        assert_eq!(guard_route("/login", &session), RouteDecision::Render("/login".into()));

        session.login("token");
        assert_eq!(
            guard_route("/statistics", &session),
            RouteDecision::Render("/statistics".into())
        );
        assert_eq!(guard_route("/login", &session), RouteDecision::Redirect("/".into()));
    }
}
