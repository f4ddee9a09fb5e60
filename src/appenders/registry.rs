//! Named write-target factories
//!
//! Configuration names a writer (`Console`, `File`, `Async`, ...) and gives
//! it arguments; the registry maps that name to a factory producing the
//! appender. Names are case-insensitive.

use super::buffered::{BufferedAppender, DEFAULT_BUFFER_SIZE};
use super::console::ConsoleAppender;
use super::file::FileAppender;
use crate::config::{parse_bool, Configuration, KEY_DELIMITER};
use crate::core::{
    Appender, LoggerError, OutputFormat, OverflowPolicy, Result, TimestampFormat,
};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Builds an appender from its arguments. The registry is passed along so
/// wrappers can build the writers they wrap.
pub type SinkFactory =
    Arc<dyn Fn(&SinkArgs, &SinkRegistry) -> Result<Box<dyn Appender>> + Send + Sync>;

/// Arguments of one writer, with the full key path kept for error messages
#[derive(Debug, Clone, Default)]
pub struct SinkArgs {
    key: String,
    values: Configuration,
}

impl SinkArgs {
    pub fn new(key: impl Into<String>, values: Configuration) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }

    /// Full configuration key of argument `name`
    pub fn key_for(&self, name: &str) -> String {
        format!("{}{}{}", self.key, KEY_DELIMITER, name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name)
    }

    /// Value of the first present argument among `names`
    pub fn require_any(&self, names: &[&str]) -> Result<&str> {
        names
            .iter()
            .find_map(|name| self.get(name))
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                LoggerError::config(
                    self.key_for(names.first().copied().unwrap_or_default()),
                    format!("required argument missing (one of: {})", names.join(", ")),
                )
            })
    }

    pub fn parse<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.get(name)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| LoggerError::config(self.key_for(name), e.to_string()))
            })
            .transpose()
    }

    pub fn flag(&self, name: &str) -> Result<Option<bool>> {
        self.get(name)
            .map(|raw| {
                parse_bool(raw).ok_or_else(|| {
                    LoggerError::config(self.key_for(name), format!("'{}' is not a boolean", raw))
                })
            })
            .transpose()
    }

    /// Nested writer descriptions under argument `name`
    pub fn writer_specs(&self, name: &str) -> Result<Vec<SinkSpec>> {
        parse_writer_specs(&self.values, name).map(|specs| {
            specs
                .into_iter()
                .map(|spec| spec.rebased(&self.key))
                .collect()
        })
    }

    pub fn values(&self) -> &Configuration {
        &self.values
    }
}

/// One writer: its registered name and its arguments
#[derive(Debug, Clone)]
pub struct SinkSpec {
    pub name: String,
    /// Configuration key of the writer, e.g. `logging:writeTo:0`
    pub key: String,
    pub args: SinkArgs,
}

impl SinkSpec {
    pub fn new(name: impl Into<String>, key: impl Into<String>, args: Configuration) -> Self {
        let key = key.into();
        Self {
            name: name.into(),
            args: SinkArgs::new(format!("{}{}Args", key, KEY_DELIMITER), args),
            key,
        }
    }

    fn rebased(self, parent: &str) -> Self {
        let key = format!("{}{}{}", parent, KEY_DELIMITER, self.key);
        let args = SinkArgs::new(format!("{}{}Args", key, KEY_DELIMITER), self.args.values);
        Self {
            name: self.name,
            key,
            args,
        }
    }
}

/// Read the writer(s) described at `prefix`.
///
/// Accepted shapes:
/// - `<prefix>:Name` with `<prefix>:Args:*`
/// - `<prefix> = <name>` with `<prefix>:Args:*`
/// - `<prefix>:<i>:Name` with `<prefix>:<i>:Args:*`, in index order
pub fn parse_writer_specs(config: &Configuration, prefix: &str) -> Result<Vec<SinkSpec>> {
    let args_key = |base: &str| format!("{}{}Args", base, KEY_DELIMITER);
    let name_key = |base: &str| format!("{}{}Name", base, KEY_DELIMITER);

    if let Some(name) = config.get(&name_key(prefix)) {
        return Ok(vec![SinkSpec::new(
            name,
            prefix,
            config.section(&args_key(prefix)),
        )]);
    }
    if let Some(name) = config.get(prefix).filter(|n| !n.trim().is_empty()) {
        return Ok(vec![SinkSpec::new(
            name,
            prefix,
            config.section(&args_key(prefix)),
        )]);
    }

    let mut indexed = Vec::new();
    for child in config.child_names(prefix) {
        match child.parse::<usize>() {
            Ok(index) => indexed.push((index, child)),
            Err(_) => {
                return Err(LoggerError::config(
                    name_key(prefix),
                    format!("write target name missing (found '{}' instead)", child),
                ))
            }
        }
    }
    if indexed.is_empty() {
        return Err(LoggerError::config(
            name_key(prefix),
            "no write target configured",
        ));
    }
    indexed.sort_by_key(|(index, _)| *index);

    indexed
        .into_iter()
        .map(|(_, child)| {
            let base = format!("{}{}{}", prefix, KEY_DELIMITER, child);
            let name = config
                .get(&name_key(&base))
                .filter(|n| !n.trim().is_empty())
                .ok_or_else(|| LoggerError::config(name_key(&base), "write target name missing"))?;
            Ok(SinkSpec::new(name, base.clone(), config.section(&args_key(&base))))
        })
        .collect()
}

#[derive(Clone)]
pub struct SinkRegistry {
    /// lowercased name → (name as registered, factory)
    factories: BTreeMap<String, (String, SinkFactory)>,
}

impl SinkRegistry {
    /// A registry with no write targets
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// `Console`, `File`, `RollingFile`, `JsonFile` and `Async`
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("Console", |args, _| build_console(args));
        registry.register("File", |args, _| build_file(args, OutputFormat::Text));
        registry.register("RollingFile", |args, _| build_file(args, OutputFormat::Text));
        registry.register("JsonFile", |args, _| build_file(args, OutputFormat::Json));
        registry.register("Async", build_async);
        registry
    }

    /// Register a factory; an existing registration with the same name is
    /// replaced.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&SinkArgs, &SinkRegistry) -> Result<Box<dyn Appender>> + Send + Sync + 'static,
    {
        let name = name.into();
        self.factories
            .insert(name.to_ascii_lowercase(), (name, Arc::new(factory)));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.trim().to_ascii_lowercase())
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.values().map(|(name, _)| name.as_str()).collect()
    }

    pub fn build(&self, spec: &SinkSpec) -> Result<Box<dyn Appender>> {
        let (_, factory) = self
            .factories
            .get(&spec.name.trim().to_ascii_lowercase())
            .ok_or_else(|| {
                LoggerError::config(
                    format!("{}{}Name", spec.key, KEY_DELIMITER),
                    format!(
                        "unknown write target '{}' (registered: {})",
                        spec.name,
                        self.names().join(", ")
                    ),
                )
            })?;
        factory(&spec.args, self)
    }

    /// Build every writer; the first failure aborts and drops what was built
    pub fn build_all(&self, specs: &[SinkSpec]) -> Result<Vec<Box<dyn Appender>>> {
        specs.iter().map(|spec| self.build(spec)).collect()
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkRegistry")
            .field("names", &self.names())
            .finish()
    }
}

fn build_console(args: &SinkArgs) -> Result<Box<dyn Appender>> {
    let mut appender = match args.flag("colors")? {
        Some(colors) => ConsoleAppender::with_colors(colors),
        None => ConsoleAppender::new(),
    };
    if let Some(format) = args.parse::<OutputFormat>("outputFormat")? {
        appender = appender.with_output_format(format);
    }
    if let Some(format) = args.parse::<TimestampFormat>("timestampFormat")? {
        appender = appender.with_timestamp_format(format);
    }
    Ok(Box::new(appender))
}

fn build_file(args: &SinkArgs, default_format: OutputFormat) -> Result<Box<dyn Appender>> {
    let path = args.require_any(&["path", "pathFormat"])?;
    let format = args
        .parse::<OutputFormat>("outputFormat")?
        .unwrap_or(default_format);

    let mut appender = FileAppender::new(path)?.with_output_format(format);
    if let Some(ts) = args.parse::<TimestampFormat>("timestampFormat")? {
        appender = appender.with_timestamp_format(ts);
    }
    Ok(Box::new(appender))
}

fn build_async(args: &SinkArgs, registry: &SinkRegistry) -> Result<Box<dyn Appender>> {
    let specs = args.writer_specs("configure")?;
    let inner = registry.build_all(&specs)?;
    let capacity = args
        .parse::<usize>("bufferSize")?
        .unwrap_or(DEFAULT_BUFFER_SIZE);
    let policy = args
        .parse::<OverflowPolicy>("overflowPolicy")?
        .unwrap_or_default();

    Ok(Box::new(BufferedAppender::with_config(
        inner, capacity, policy, None,
    )?))
}
