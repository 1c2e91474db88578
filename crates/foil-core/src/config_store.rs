//! INI config file loading, saving and typed access
//!
//! A config file is held in memory as a [`ConfigMap`]: section name to option
//! name to string value. Nothing is typed at load time; callers ask for a
//! string, integer or boolean when they read a value.
//!
//! ```ini
//! [MongoServer]
//! address = localhost
//! port = 27017
//! ```

use crate::{FoilError, Result};
use configparser::ini::Ini;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Filename used by a [`ConfigStore`] created with `Default`
pub const DEFAULT_CONFIG_FILENAME: &str = ".config";

/// Section whose options are inherited by every other section
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Inline comments are disabled: `#` and `;` inside a value are kept
const NO_INLINE_COMMENTS: &[char] = &[];

/// Literals accepted as `true` by [`str_to_bool`]
pub const TRUE_LITERALS: [&str; 9] = ["TRUE", "True", "true", "1", "Y", "y", "YES", "Yes", "yes"];

/// Literals recognised as an explicit `false`
pub const FALSE_LITERALS: [&str; 9] = ["FALSE", "False", "false", "0", "N", "n", "NO", "No", "no"];

/// How a string literal reads as a boolean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolLiteral {
    True,
    False,
    /// Neither a true nor a false literal. Still reads as `false`.
    Unrecognized,
}

impl BoolLiteral {
    pub fn classify(value: &str) -> Self {
        let trimmed = value.trim();
        if TRUE_LITERALS.contains(&trimmed) {
            BoolLiteral::True
        } else if FALSE_LITERALS.contains(&trimmed) {
            BoolLiteral::False
        } else {
            BoolLiteral::Unrecognized
        }
    }

    pub fn as_bool(self) -> bool {
        matches!(self, BoolLiteral::True)
    }
}

/// Convert a string to a bool.
///
/// Returns `true` only for one of [`TRUE_LITERALS`] after trimming
/// surrounding whitespace. Anything else, including the empty string, is
/// `false`.
pub fn str_to_bool(value: &str) -> bool {
    BoolLiteral::classify(value).as_bool()
}

/// Type to coerce a config value into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Int,
    Bool,
}

/// A config value after coercion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Bool(bool),
}

/// In-memory contents of an INI file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigMap {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from nested section/option pairs.
    ///
    /// Values are stored through `ToString`, so integers and booleans can be
    /// passed directly.
    pub fn from_sections<S, I, K, V>(sections: impl IntoIterator<Item = (S, I)>) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        let mut map = Self::new();
        for (section, options) in sections {
            let section = section.into();
            map.sections.entry(section.clone()).or_default();
            for (option, value) in options {
                map.insert(section.as_str(), option.as_ref(), value.to_string());
            }
        }
        map
    }

    /// Set an option. Option names are stored lowercase.
    ///
    /// A [`DEFAULT_SECTION`] can be held in memory, but [`write_config`]
    /// refuses it: on reload its options would be folded into every other
    /// section.
    pub fn insert(
        &mut self,
        section: impl Into<String>,
        option: &str,
        value: impl Into<String>,
    ) -> Option<String> {
        self.sections
            .entry(section.into())
            .or_default()
            .insert(option.to_lowercase(), value.into())
    }

    /// Number of sections
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn section(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.sections.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, String>)> {
        self.sections.iter().map(|(name, options)| (name.as_str(), options))
    }

    pub fn contains(&self, section: &str, option: &str) -> bool {
        self.sections
            .get(section)
            .is_some_and(|options| options.contains_key(option))
    }

    /// Raw string value of an option
    pub fn get(&self, section: &str, option: &str) -> Result<&str> {
        self.sections
            .get(section)
            .and_then(|options| options.get(option))
            .map(String::as_str)
            .ok_or_else(|| FoilError::KeyNotFound {
                section: section.to_string(),
                option: option.to_string(),
            })
    }

    /// Value parsed as a base-10 integer
    pub fn get_int(&self, section: &str, option: &str) -> Result<i64> {
        let value = self.get(section, option)?;
        value.trim().parse::<i64>().map_err(|e| FoilError::Parse {
            context: format!("{}:{}", section, option),
            message: format!("'{}' is not a base-10 integer ({})", value, e),
        })
    }

    /// Value read as a boolean, see [`str_to_bool`]
    pub fn get_bool(&self, section: &str, option: &str) -> Result<bool> {
        let value = self.get(section, option)?;
        let literal = BoolLiteral::classify(value);
        if literal == BoolLiteral::Unrecognized {
            tracing::warn!(
                section = %section,
                option = %option,
                value = %value,
                "unrecognized boolean literal, reading as false"
            );
        }
        Ok(literal.as_bool())
    }

    /// Look up a value and coerce it to `as_type`
    pub fn get_as(&self, section: &str, option: &str, as_type: ValueType) -> Result<ConfigValue> {
        match as_type {
            ValueType::String => self
                .get(section, option)
                .map(|v| ConfigValue::String(v.to_string())),
            ValueType::Int => self.get_int(section, option).map(ConfigValue::Int),
            ValueType::Bool => self.get_bool(section, option).map(ConfigValue::Bool),
        }
    }

    /// Render the map as INI text
    pub fn to_ini_string(&self) -> String {
        let mut ini = ini_parser();
        let target = ini.get_mut_map();
        for (section, options) in &self.sections {
            target.insert(
                section.clone(),
                options
                    .iter()
                    .map(|(option, value)| (option.clone(), Some(value.clone())))
                    .collect(),
            );
        }
        ini.writes()
    }
}

fn ini_parser() -> Ini {
    let mut ini = Ini::new_cs();
    ini.set_default_section(DEFAULT_SECTION);
    ini.set_inline_comment_symbols(Some(NO_INLINE_COMMENTS));
    ini
}

/// Parse INI text into a [`ConfigMap`].
///
/// `origin` names the source in error messages. Only lines starting with
/// `;` or `#` are comments; values keep those characters as written.
/// Options of a `[DEFAULT]` section are copied into every other section that
/// does not set them, and `[DEFAULT]` itself is not kept as a section. Text
/// with no sections is an error.
pub fn parse_config(content: &str, origin: &str) -> Result<ConfigMap> {
    let mut ini = ini_parser();
    let parsed = ini.read(content.to_string()).map_err(|message| FoilError::Parse {
        context: origin.to_string(),
        message,
    })?;

    let defaults = parsed.get(DEFAULT_SECTION).cloned().unwrap_or_default();

    let mut map = ConfigMap::new();
    for (section, options) in &parsed {
        if section == DEFAULT_SECTION {
            continue;
        }
        map.sections.entry(section.clone()).or_default();
        for (option, value) in defaults.iter().chain(options.iter()) {
            if value.is_none() {
                tracing::debug!(section = %section, option = %option, "option has no value");
            }
            map.insert(section.as_str(), option, value.clone().unwrap_or_default());
        }
    }

    if map.is_empty() {
        return Err(FoilError::Parse {
            context: origin.to_string(),
            message: "no sections found".to_string(),
        });
    }

    Ok(map)
}

/// Expand a leading `~` to the user's home directory
pub fn expand_path(path: impl AsRef<Path>) -> PathBuf {
    let raw = path.as_ref().to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

/// Load an INI file from `path` (tilde-expanded)
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_config(path: impl AsRef<Path>) -> Result<ConfigMap> {
    let path = expand_path(path);
    if !path.exists() {
        return Err(FoilError::NotFound { path });
    }

    let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => FoilError::Parse {
            context: path.display().to_string(),
            message: e.to_string(),
        },
        _ => FoilError::io(&path, e),
    })?;
    let map = parse_config(&content, &path.display().to_string())?;

    tracing::debug!(sections = map.len(), "config file loaded");
    Ok(map)
}

/// Write `map` to `path` (tilde-expanded) as INI text.
///
/// Never creates directories. An existing file is only replaced when
/// `overwrite` is set. A map holding a [`DEFAULT_SECTION`] is refused before
/// anything is touched. Returns the expanded path that was written.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display(), overwrite))]
pub fn write_config(
    map: &ConfigMap,
    path: impl AsRef<Path>,
    overwrite: bool,
) -> Result<PathBuf> {
    if map.section(DEFAULT_SECTION).is_some() {
        return Err(FoilError::ReservedSection {
            section: DEFAULT_SECTION.to_string(),
        });
    }

    let path = expand_path(path);
    if path.is_dir() {
        return Err(FoilError::PathIsDirectory { path });
    }

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if !parent.is_dir() {
        return Err(FoilError::MissingParentDirectory {
            path: parent.to_path_buf(),
        });
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let mut file = options.open(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            FoilError::AlreadyExists { path: path.clone() }
        } else {
            FoilError::io(&path, e)
        }
    })?;
    file.write_all(map.to_ini_string().as_bytes())
        .map_err(|e| FoilError::io(&path, e))?;

    tracing::info!(sections = map.len(), "config file written");
    Ok(path)
}

/// A config map together with the file it came from
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: ConfigMap,
}

/// Try each candidate in order and return the first that loads
pub fn discover_config<P: AsRef<Path>>(candidates: &[P]) -> Option<LoadedConfig> {
    for candidate in candidates {
        let candidate = candidate.as_ref();
        match load_config(candidate) {
            Ok(config) => {
                return Some(LoadedConfig {
                    path: expand_path(candidate),
                    config,
                });
            }
            Err(e) => {
                tracing::debug!(path = %candidate.display(), error = %e, "config candidate skipped");
            }
        }
    }
    None
}

/// A config file location with load and write helpers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    path: Option<PathBuf>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A store with no file; every operation needs an explicit path
    pub fn without_path() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load from `path`, or from the store's own path when `None`.
    ///
    /// On success the store remembers the expanded path it loaded from.
    pub fn load(&mut self, path: Option<&Path>) -> Result<ConfigMap> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| self.path.clone())
            .ok_or(FoilError::NoPathProvided)?;
        let map = load_config(&path)?;
        self.path = Some(expand_path(&path));
        Ok(map)
    }

    /// Write to `path`, or to the store's own path when `None`
    pub fn write(&self, map: &ConfigMap, path: Option<&Path>, overwrite: bool) -> Result<PathBuf> {
        let path = path
            .or(self.path.as_deref())
            .ok_or(FoilError::NoPathProvided)?;
        write_config(map, path, overwrite)
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_FILENAME)
    }
}

#[cfg(test)]
mod tests;
