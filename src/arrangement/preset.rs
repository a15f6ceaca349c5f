//! Named presets: canned member lists selected by `DEFAULT!key`.
//!
//! Presets are stored as spec text and parsed when applied. A process-wide
//! table guarded by a `parking_lot::RwLock` serves every [`ParseContext`]
//! without its own table. It is meant to be populated at startup; mutating it
//! while layouts are being built is not coordinated with them.
//!
//! [`ParseContext`]: super::ParseContext

use log::{error, warn};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

/// Canonical preset key.
pub const DEFAULT_PRESET: &str = "DEFAULT";

/// Key of the nxlog-compatible preset.
pub const NXLOG_PRESET: &str = "nxlog";

const DEFAULT_SPEC: &str =
    "date:date;level:level;appname:appname;logger:logger;thread:thread;ndc:ndc;message:message;exception:exception";

const NXLOG_SPEC: &str = "EventTime%utcdate:%Y-%m-%d %H:%M:%S;Hostname:hostname;Severity:level;\
     SourceName:appname;Logger:logger;Thread:thread;Ndc:ndc;Message:message;Exception:exception";

/// Ordered table of preset spec strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresetTable {
    entries: Vec<(String, String)>,
    default_key: String,
}

impl Default for PresetTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl PresetTable {
    /// An empty table whose default key is [`DEFAULT_PRESET`].
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            default_key: DEFAULT_PRESET.to_owned(),
        }
    }

    /// The `DEFAULT` and `nxlog` presets.
    pub fn standard() -> Self {
        Self::new()
            .with(DEFAULT_PRESET, DEFAULT_SPEC)
            .with(NXLOG_PRESET, NXLOG_SPEC)
    }

    /// Insert or replace the preset `key`, keeping its original position.
    pub fn insert(&mut self, key: impl Into<String>, spec: impl Into<String>) {
        let key = key.into();
        let spec = spec.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = spec,
            None => self.entries.push((key, spec)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, spec: impl Into<String>) -> Self {
        self.insert(key, spec);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entry(key).map(|(_, spec)| spec)
    }

    fn entry(&self, key: &str) -> Option<(&str, &str)> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(k, spec)| (k.as_str(), spec.as_str()))
    }

    /// Key used by `DEFAULT!` without an option.
    pub fn default_key(&self) -> &str {
        &self.default_key
    }

    pub fn set_default_key(&mut self, key: impl Into<String>) {
        self.default_key = key.into();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve `key` (or the default key) to a preset, returning the key
    /// actually used and its spec.
    ///
    /// A missing key falls back to [`DEFAULT_PRESET`] and then to the first
    /// preset in the table, warning each time. An empty table logs an error
    /// and yields `None`.
    pub fn resolve(&self, key: Option<&str>) -> Option<(&str, &str)> {
        let requested = key.unwrap_or(self.default_key.as_str());
        if let Some(found) = self.entry(requested) {
            return Some(found);
        }
        if let Some(found) = self.entry(DEFAULT_PRESET) {
            warn!("JsonLayout: preset '{requested}' not found, using '{DEFAULT_PRESET}'");
            return Some(found);
        }
        match self.entries.first() {
            Some((first, spec)) => {
                warn!("JsonLayout: preset '{requested}' not found, using '{first}'");
                Some((first.as_str(), spec.as_str()))
            }
            None => {
                error!("JsonLayout: preset table is empty, '{requested}' applies nothing");
                None
            }
        }
    }
}

static PRESETS: Lazy<RwLock<PresetTable>> = Lazy::new(|| RwLock::new(PresetTable::standard()));

/// Add or replace a preset in the process-wide table.
pub fn register_preset(key: impl Into<String>, spec: impl Into<String>) {
    PRESETS.write().insert(key, spec);
}

/// Change the key `DEFAULT!` resolves to in the process-wide table.
pub fn set_default_preset(key: impl Into<String>) {
    PRESETS.write().set_default_key(key);
}

/// Restore the process-wide table to the standard presets.
pub fn reset_presets() {
    *PRESETS.write() = PresetTable::standard();
}

/// Snapshot of the process-wide table.
pub fn global_presets() -> PresetTable {
    PRESETS.read().clone()
}

/// Resolve against the process-wide table. The lock is released before the
/// caller parses the returned spec, which may itself reference presets.
pub(crate) fn resolve_global(key: Option<&str>) -> Option<String> {
    let table = PRESETS.read();
    table.resolve(key).map(|(_, spec)| spec.to_owned())
}
