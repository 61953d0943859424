//! Runtime flags that tune how `srcset` resolves source sets.
//!
//! Flags are declared as `static` [`Config`]s next to the code that reads them, registered into
//! a [`ConfigSetBuilder`], and shared as a cheaply cloneable [`ConfigSet`]. Updating a value
//! through one clone is visible through every other clone.
//!
//! These are _not_ for describing source sets themselves, that is what build files are for.

use std::any::Any;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use compact_str::CompactString;
use srcset_ore::assert_none;

/// A single configuration flag with a default value.
pub struct Config<V: ConfigValue> {
    name: &'static str,
    desc: &'static str,
    default: V,
}

impl<V: ConfigValue> Config<V> {
    /// Declare a new [`Config`].
    pub const fn new(name: &'static str, desc: &'static str, default: V) -> Self {
        Config {
            name,
            desc,
            default,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn desc(&self) -> &'static str {
        self.desc
    }

    /// Read the current value of this [`Config`] from `set`.
    ///
    /// # Panics
    /// * If this [`Config`] was never registered with `set`.
    pub fn read(&self, set: &ConfigSet) -> V::Stored {
        set.slot::<V::Stored>(self.name).get()
    }
}

/// Types a [`Config`] can be declared with.
///
/// The declared type only has to be usable in a `static`, what actually lives in a
/// [`ConfigSet`] is the owned [`ConfigValue::Stored`].
pub trait ConfigValue {
    type Stored: Clone + fmt::Debug + fmt::Display + Send + Sync + 'static;

    fn to_stored(&self) -> Self::Stored;

    /// Parse a value from a string, e.g. an environment variable.
    fn parse(raw: &str) -> Result<Self::Stored, anyhow::Error>;
}

impl ConfigValue for bool {
    type Stored = bool;

    fn to_stored(&self) -> bool {
        *self
    }

    /// Anything other than a falsey value, see [`srcset_ore::env::parse_truthy`], is `true`.
    fn parse(raw: &str) -> Result<bool, anyhow::Error> {
        Ok(srcset_ore::env::parse_truthy(OsStr::new(raw.trim())))
    }
}

impl ConfigValue for u64 {
    type Stored = u64;

    fn to_stored(&self) -> u64 {
        *self
    }

    fn parse(raw: &str) -> Result<u64, anyhow::Error> {
        Ok(raw.trim().parse()?)
    }
}

impl ConfigValue for &'static str {
    type Stored = CompactString;

    fn to_stored(&self) -> CompactString {
        CompactString::new(self)
    }

    fn parse(raw: &str) -> Result<CompactString, anyhow::Error> {
        Ok(CompactString::new(raw))
    }
}

/// Storage for a single registered [`Config`].
#[derive(Debug)]
struct Slot<T> {
    value: RwLock<T>,
    parse: fn(&str) -> Result<T, anyhow::Error>,
}

impl<T: Clone> Slot<T> {
    fn get(&self) -> T {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, value: T) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

/// A [`Slot`] with its value type erased, so configs of every type can live in one map.
trait AnySlot: fmt::Debug + Send + Sync {
    fn set_parsed(&self, raw: &str) -> Result<(), anyhow::Error>;
    fn render(&self) -> String;
    fn as_any(&self) -> &dyn Any;
}

impl<T> AnySlot for Slot<T>
where
    T: Clone + fmt::Debug + fmt::Display + Send + Sync + 'static,
{
    fn set_parsed(&self, raw: &str) -> Result<(), anyhow::Error> {
        // Parse before taking the lock so a bad value leaves the old one in place.
        let value = (self.parse)(raw)?;
        self.set(value);
        Ok(())
    }

    fn render(&self) -> String {
        self.get().to_string()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Clone, Debug)]
struct Entry {
    slot: Arc<dyn AnySlot>,
    desc: &'static str,
}

/// A thread-safe shareable set of [`Config`]s.
#[derive(Clone, Debug)]
pub struct ConfigSet {
    configs: Arc<BTreeMap<&'static str, Entry>>,
}

impl ConfigSet {
    /// Returns a new [`ConfigSetBuilder`].
    pub fn builder() -> ConfigSetBuilder {
        ConfigSetBuilder::default()
    }

    fn slot<T: 'static>(&self, name: &str) -> &Slot<T> {
        let Some(entry) = self.configs.get(name) else {
            panic!("tried to access unregistered config '{name}'");
        };
        match entry.slot.as_any().downcast_ref::<Slot<T>>() {
            Some(slot) => slot,
            None => panic!("config '{name}' accessed as the wrong type"),
        }
    }

    /// Names of every registered [`Config`], sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.configs.keys().copied()
    }

    /// Set `config` to `value`.
    ///
    /// # Panics
    /// * If `config` was not registered with the original [`ConfigSetBuilder`].
    pub fn update<V: ConfigValue>(&self, config: &'static Config<V>, value: V) {
        self.slot::<V::Stored>(config.name).set(value.to_stored());
    }

    /// Parse `value` and set the [`Config`] named `name` to it.
    ///
    /// # Errors
    ///
    /// * If no config named `name` exists in this set.
    /// * If `value` cannot be parsed as the type of the config.
    pub fn try_update(&self, name: &str, value: &str) -> Result<(), anyhow::Error> {
        let entry = self
            .configs
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("no config named '{name}'"))?;
        entry
            .slot
            .set_parsed(value)
            .map_err(|err| anyhow::anyhow!("invalid value '{value}' for config '{name}': {err}"))
    }

    /// Override configs from environment variables named `{prefix}_{NAME}`, returning how many
    /// were overridden.
    ///
    /// # Errors
    ///
    /// * If a variable is set but isn't UTF-8 or cannot be parsed for its config.
    pub fn apply_env(&self, prefix: &str) -> Result<usize, anyhow::Error> {
        let mut applied = 0;
        for name in self.configs.keys() {
            let key = srcset_ore::env::env_key(prefix, name);
            let Some(raw) = std::env::var_os(&key) else {
                continue;
            };
            let raw = raw
                .into_string()
                .map_err(|raw| anyhow::anyhow!("non UTF-8 value for {key}: {raw:?}"))?;
            self.try_update(name, &raw)?;

            tracing::debug!(%key, config = %name, "config overridden from environment");
            applied += 1;
        }
        Ok(applied)
    }
}

impl fmt::Display for ConfigSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, entry) in self.configs.iter() {
            writeln!(f, "{name} = {}", entry.slot.render())?;
            writeln!(f, "    {}", entry.desc)?;
        }
        Ok(())
    }
}

/// A builder for a [`ConfigSet`].
#[derive(Default, Debug)]
pub struct ConfigSetBuilder {
    configs: BTreeMap<&'static str, Entry>,
}

impl ConfigSetBuilder {
    /// Register `config` with its default value.
    ///
    /// # Panics
    /// * If a config with the same name was already registered.
    pub fn register<V: ConfigValue>(&mut self, config: &'static Config<V>) -> &mut Self {
        let slot = Slot {
            value: RwLock::new(config.default.to_stored()),
            parse: V::parse,
        };
        let entry = Entry {
            slot: Arc::new(slot),
            desc: config.desc,
        };
        let prev = self.configs.insert(config.name, entry);
        assert_none!(prev, "config '{}' registered more than once", config.name);
        self
    }

    /// Consumes this [`ConfigSetBuilder`] constructing a [`ConfigSet`].
    pub fn build(self) -> ConfigSet {
        ConfigSet {
            configs: Arc::new(self.configs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static FOLLOW: Config<bool> = Config::new("test_follow", "Follow links.", false);
    static THREADS: Config<u64> = Config::new("test_threads", "Worker threads.", 4);
    static FILENAME: Config<&'static str> =
        Config::new("test_filename", "Build file name.", "BUILD.srcset.toml");

    fn test_set() -> ConfigSet {
        let mut builder = ConfigSet::builder();
        builder
            .register(&FOLLOW)
            .register(&THREADS)
            .register(&FILENAME);
        builder.build()
    }

    #[test]
    fn smoketest_read() {
        let set = test_set();
        assert!(!FOLLOW.read(&set));
        assert_eq!(THREADS.read(&set), 4);
        assert_eq!(FILENAME.read(&set), "BUILD.srcset.toml");
        assert_eq!(
            set.names().collect::<Vec<_>>(),
            ["test_filename", "test_follow", "test_threads"]
        );
    }

    #[test]
    fn updates_are_shared_between_clones() {
        let set = test_set();
        let other = set.clone();

        set.update(&FOLLOW, true);
        set.update(&FILENAME, "srcs.toml");
        assert!(FOLLOW.read(&other));
        assert_eq!(FILENAME.read(&other), "srcs.toml");
    }

    #[test]
    fn smoketest_parse() {
        let set = test_set();
        set.try_update("test_threads", " 16 ").unwrap();
        assert_eq!(THREADS.read(&set), 16);

        set.try_update("test_follow", "on").unwrap();
        assert!(FOLLOW.read(&set));
        set.try_update("test_follow", "FALSE").unwrap();
        assert!(!FOLLOW.read(&set));

        assert!(set.try_update("test_threads", "many").is_err());
        assert!(set.try_update("nope", "1").is_err());
        // A failed parse leaves the previous value.
        assert_eq!(THREADS.read(&set), 16);
    }

    #[test]
    fn env_overrides() {
        let set = test_set();
        // SAFETY: only this test touches these variables.
        unsafe {
            std::env::set_var("SRCSET_CFG_TEST_TEST_FOLLOW", "yes");
            std::env::set_var("SRCSET_CFG_TEST_TEST_THREADS", "2");
        }
        let applied = set.apply_env("SRCSET_CFG_TEST").unwrap();
        assert_eq!(applied, 2);
        assert!(FOLLOW.read(&set));
        assert_eq!(THREADS.read(&set), 2);
        assert_eq!(FILENAME.read(&set), "BUILD.srcset.toml");
    }

    #[test]
    #[should_panic(expected = "registered more than once")]
    fn duplicate_registration() {
        let mut builder = ConfigSet::builder();
        builder.register(&FOLLOW).register(&FOLLOW);
    }

    #[test]
    #[should_panic(expected = "unregistered config 'test_threads'")]
    fn read_unregistered() {
        let mut builder = ConfigSet::builder();
        builder.register(&FOLLOW);
        THREADS.read(&builder.build());
    }

    #[test]
    fn display_lists_everything() {
        let rendered = test_set().to_string();
        assert!(rendered.contains("test_threads = 4\n"), "{rendered}");
        assert!(rendered.contains("    Build file name.\n"), "{rendered}");
    }
}
