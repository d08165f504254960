// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # ETL Configuration
//!
//! Loads the INI run configuration into an immutable, validated snapshot.
//! The file layout:
//!
//! ```ini
//! [source.1]
//! name = xbond_feed
//! type = jsonl
//! connectionString = data/xbond_20250101.jsonl
//! primaryKeyField = quote_id
//! credentials.username = reader
//! credentials.password = secret
//!
//! [target.1]
//! name = dolphin
//! type = dolphindb
//! connectionString = mem://local
//! dataType = XbondQuote
//!
//! [transform.1]
//! sourceType = XbondTrade
//! unmappedFieldPolicy = drop
//!
//! [validation]
//! completeness = true
//!
//! [loader]
//! connection.url = mem://local
//! connection.username = etl
//! connection.password = secret
//! sort.fields = receive_time,symbol
//! max.memory.mb = 256
//! temporary.table.prefix = tmp_
//! target.table.mappings = XbondQuote:xbond_quote,XbondTrade:xbond_trade
//!
//! [logging]
//! logLevel = info
//! logFilePath = logs/etl.log
//! ```
//!
//! Numbered blocks (`[source.N]`, `[target.N]`, `[transform.N]`) are read for
//! consecutive `N` starting at 1. Validation failures here surface before any
//! day runs, as configuration errors.

use config::{Config, File, FileFormat, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use marketdata_etl_domain::{EtlError, SortMemoryLimit, UnmappedFieldPolicy};

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid pattern"));

/// Default per-record byte estimate for the sort memory heuristic.
pub const DEFAULT_RECORD_BYTES_ESTIMATE: u64 = 500;

/// Credentials attached to a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
}

/// One configured source feed.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub name: String,
    pub source_type: String,
    pub connection_string: String,
    pub primary_key_field: Option<String>,
    pub credentials: Credentials,
}

/// One configured load target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetConfig {
    pub name: String,
    pub target_type: String,
    pub connection_string: String,
    pub batch_size: Option<u64>,
    pub data_type: Option<String>,
}

/// One configured transform block.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformConfig {
    pub source_type: String,
    pub unmapped_field_policy: UnmappedFieldPolicy,
    /// Identity entries only; custom remapping is rejected at load
    pub field_mapping: BTreeMap<String, String>,
    /// Parsed but not applied; transformation is 1:1 in this engine version
    pub filter: BTreeMap<String, String>,
}

/// Validation rule toggles.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationConfig {
    pub completeness: bool,
    pub quality: bool,
    pub consistency: bool,
    pub completeness_rules: Vec<String>,
    pub quality_rules: Vec<String>,
    pub consistency_rules: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            completeness: true,
            quality: false,
            consistency: false,
            completeness_rules: Vec::new(),
            quality_rules: Vec::new(),
            consistency_rules: Vec::new(),
        }
    }
}

/// `dataType → physical table` pair, in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMapping {
    pub data_type: String,
    pub table_name: String,
}

/// The `[loader]` block.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    pub connection_url: String,
    pub username: String,
    pub password: String,
    pub sort_fields: Vec<String>,
    pub max_sort_memory: SortMemoryLimit,
    pub record_bytes_estimate: u64,
    pub temporary_table_prefix: String,
    pub table_mappings: Vec<TableMapping>,
}

impl LoaderConfig {
    /// Physical table for a target data type.
    pub fn table_for(&self, data_type: &str) -> Option<&str> {
        self.table_mappings
            .iter()
            .find(|m| m.data_type == data_type)
            .map(|m| m.table_name.as_str())
    }

    /// Connection description with the password masked, for diagnostics.
    pub fn masked_connection(&self) -> String {
        if self.username.is_empty() {
            self.connection_url.clone()
        } else {
            format!("{} (user={}, password=***)", self.connection_url, self.username)
        }
    }
}

/// The `[logging]` block.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub log_file_path: Option<PathBuf>,
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_file_path: None,
            log_level: "info".to_string(),
        }
    }
}

/// Immutable configuration snapshot for one run.
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub sources: Vec<SourceConfig>,
    pub targets: Vec<TargetConfig>,
    pub transforms: Vec<TransformConfig>,
    pub validation: ValidationConfig,
    pub loader: LoaderConfig,
    pub logging: LoggingConfig,
}

impl EtlConfig {
    /// Loads and validates the INI file at `path`.
    pub fn from_file(path: &Path) -> Result<Self, EtlError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| EtlError::invalid_config(format!("non-UTF8 config path: {}", path.display())))?;
        let parsed = Config::builder()
            .add_source(File::new(path_str, FileFormat::Ini))
            .build()
            .map_err(|e| EtlError::invalid_config(format!("cannot read {}: {}", path.display(), e)))?;
        let root: HashMap<String, Value> = parsed
            .try_deserialize()
            .map_err(|e| EtlError::invalid_config(format!("cannot parse {}: {}", path.display(), e)))?;
        Self::from_root(&root)
    }

    fn from_root(root: &HashMap<String, Value>) -> Result<Self, EtlError> {
        let sources = numbered_sections(root, "source")
            .into_iter()
            .enumerate()
            .map(|(i, s)| parse_source(&format!("source.{}", i + 1), &s))
            .collect::<Result<Vec<_>, _>>()?;
        let targets = numbered_sections(root, "target")
            .into_iter()
            .enumerate()
            .map(|(i, s)| parse_target(&format!("target.{}", i + 1), &s))
            .collect::<Result<Vec<_>, _>>()?;
        let transforms = numbered_sections(root, "transform")
            .into_iter()
            .enumerate()
            .map(|(i, s)| parse_transform(&format!("transform.{}", i + 1), &s))
            .collect::<Result<Vec<_>, _>>()?;

        let validation = match section(root, "validation") {
            Some(s) => parse_validation(&s)?,
            None => ValidationConfig::default(),
        };
        let loader = parse_loader(
            &section(root, "loader")
                .ok_or_else(|| EtlError::invalid_config("missing required [loader] section"))?,
        )?;
        let logging = match section(root, "logging") {
            Some(s) => parse_logging(&s)?,
            None => LoggingConfig::default(),
        };

        let config = Self {
            sources,
            targets,
            transforms,
            validation,
            loader,
            logging,
        };
        config.validate()?;
        Ok(config)
    }

    /// Cross-section validation run once at load.
    fn validate(&self) -> Result<(), EtlError> {
        if self.sources.is_empty() {
            return Err(EtlError::invalid_config("at least one [source.N] block is required"));
        }
        if self.targets.is_empty() {
            return Err(EtlError::invalid_config("at least one [target.N] block is required"));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !NAME_PATTERN.is_match(&source.name) {
                return Err(EtlError::invalid_config(format!(
                    "source name '{}' must match [A-Za-z0-9_]+",
                    source.name
                )));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(EtlError::invalid_config(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
        }

        if self.loader.sort_fields.is_empty() {
            return Err(EtlError::invalid_config("[loader] sort.fields must name at least one field"));
        }
        if self.loader.table_mappings.is_empty() {
            return Err(EtlError::invalid_config(
                "[loader] target.table.mappings must name at least one dataType:table pair",
            ));
        }
        Ok(())
    }

    /// Per-source-type unmapped-field policies declared by transform blocks.
    pub fn unmapped_policies(&self) -> BTreeMap<String, UnmappedFieldPolicy> {
        self.transforms
            .iter()
            .map(|t| (t.source_type.clone(), t.unmapped_field_policy))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Section access
//
// The INI reader may surface `[source.1]` either as a flat root key
// ("source.1") or nested under "source"; property keys like
// `connection.url` have the same ambiguity inside a section, and key casing
// may be normalized. The helpers below accept every shape so the loader does
// not depend on parser internals.
// ---------------------------------------------------------------------------

fn get_ci(map: &HashMap<String, Value>, key: &str) -> Option<Value> {
    if let Some(value) = map.get(key) {
        return Some(value.clone());
    }
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.clone())
}

#[derive(Debug, Clone)]
struct Section {
    entries: HashMap<String, Value>,
}

impl Section {
    fn get_value(&self, key: &str) -> Option<Value> {
        if let Some(value) = get_ci(&self.entries, key) {
            return Some(value);
        }
        // Dotted-path walk through nested tables
        let mut parts = key.split('.');
        let first = parts.next()?;
        let mut current = get_ci(&self.entries, first)?;
        for part in parts {
            let table: HashMap<String, Value> = current.into_table().ok()?.into_iter().collect();
            current = get_ci(&table, part)?;
        }
        Some(current)
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.get_value(key).and_then(|v| v.into_string().ok())
    }

    fn require_string(&self, section_name: &str, key: &str) -> Result<String, EtlError> {
        self.get_string(key).ok_or_else(|| {
            EtlError::invalid_config(format!("[{}] is missing required key '{}'", section_name, key))
        })
    }

    fn get_u64(&self, section_name: &str, key: &str) -> Result<Option<u64>, EtlError> {
        match self.get_string(key) {
            None => Ok(None),
            Some(text) => text.trim().parse::<u64>().map(Some).map_err(|_| {
                EtlError::invalid_config(format!(
                    "[{}] key '{}' must be a non-negative integer, got '{}'",
                    section_name, key, text
                ))
            }),
        }
    }

    fn get_bool(&self, section_name: &str, key: &str) -> Result<Option<bool>, EtlError> {
        match self.get_string(key) {
            None => Ok(None),
            Some(text) => match text.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                other => Err(EtlError::invalid_config(format!(
                    "[{}] key '{}' must be a boolean, got '{}'",
                    section_name, key, other
                ))),
            },
        }
    }

    /// CSV value split on commas, trimmed, empties dropped.
    fn get_csv(&self, key: &str) -> Vec<String> {
        self.get_string(key)
            .map(|text| {
                text.split(',')
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All entries coerced to strings, for mapping/filter blocks.
    fn string_entries(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.clone().into_string().ok().map(|s| (k.clone(), s)))
            .collect()
    }
}

fn section(root: &HashMap<String, Value>, name: &str) -> Option<Section> {
    // Flat section key first, then a dotted-path walk for nested layouts
    let value = if let Some(value) = get_ci(root, name) {
        value
    } else {
        let mut parts = name.split('.');
        let first = parts.next()?;
        let mut current = get_ci(root, first)?;
        for part in parts {
            let table: HashMap<String, Value> = current.into_table().ok()?.into_iter().collect();
            current = get_ci(&table, part)?;
        }
        current
    };
    value.into_table().ok().map(|entries| Section {
        entries: entries.into_iter().collect(),
    })
}

/// Collects `[<prefix>.1]`, `[<prefix>.2]`, ... until the first gap.
fn numbered_sections(root: &HashMap<String, Value>, prefix: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    for index in 1.. {
        match section(root, &format!("{}.{}", prefix, index)) {
            Some(s) => sections.push(s),
            None => break,
        }
    }
    sections
}

// ---------------------------------------------------------------------------
// Block parsers
// ---------------------------------------------------------------------------

fn parse_source(name: &str, s: &Section) -> Result<SourceConfig, EtlError> {
    Ok(SourceConfig {
        name: s.require_string(name, "name")?,
        source_type: s.require_string(name, "type")?,
        connection_string: s.require_string(name, "connectionString")?,
        primary_key_field: s.get_string("primaryKeyField"),
        credentials: Credentials {
            username: s.get_string("credentials.username"),
            password: s.get_string("credentials.password"),
            token: s.get_string("credentials.token"),
        },
    })
}

fn parse_target(name: &str, s: &Section) -> Result<TargetConfig, EtlError> {
    Ok(TargetConfig {
        name: s.require_string(name, "name")?,
        target_type: s.require_string(name, "type")?,
        connection_string: s.require_string(name, "connectionString")?,
        batch_size: s.get_u64(name, "batchSize")?,
        data_type: s.get_string("dataType"),
    })
}

fn parse_transform(name: &str, s: &Section) -> Result<TransformConfig, EtlError> {
    let policy = match s.get_string("unmappedFieldPolicy").as_deref() {
        None | Some("drop") => UnmappedFieldPolicy::Drop,
        Some("warn") => UnmappedFieldPolicy::Warn,
        Some(other) => {
            return Err(EtlError::invalid_config(format!(
                "[{}] unmappedFieldPolicy must be 'drop' or 'warn', got '{}'",
                name, other
            )));
        }
    };

    let field_mapping = s
        .get_value("fieldMapping")
        .and_then(|v| v.into_table().ok())
        .map(|entries| {
            Section {
                entries: entries.into_iter().collect(),
            }
            .string_entries()
        })
        .unwrap_or_default();
    for (from, to) in &field_mapping {
        if from != to {
            return Err(EtlError::invalid_config(format!(
                "[{}] fieldMapping '{} = {}': custom remapping is not supported; fields map by name",
                name, from, to
            )));
        }
    }

    let filter = s
        .get_value("filter")
        .and_then(|v| v.into_table().ok())
        .map(|entries| {
            Section {
                entries: entries.into_iter().collect(),
            }
            .string_entries()
        })
        .unwrap_or_default();

    Ok(TransformConfig {
        source_type: s.require_string(name, "sourceType")?,
        unmapped_field_policy: policy,
        field_mapping,
        filter,
    })
}

fn parse_validation(s: &Section) -> Result<ValidationConfig, EtlError> {
    let defaults = ValidationConfig::default();
    Ok(ValidationConfig {
        completeness: s.get_bool("validation", "completeness")?.unwrap_or(defaults.completeness),
        quality: s.get_bool("validation", "quality")?.unwrap_or(defaults.quality),
        consistency: s.get_bool("validation", "consistency")?.unwrap_or(defaults.consistency),
        completeness_rules: s.get_csv("completenessRules"),
        quality_rules: s.get_csv("qualityRules"),
        consistency_rules: s.get_csv("consistencyRules"),
    })
}

fn parse_loader(s: &Section) -> Result<LoaderConfig, EtlError> {
    let max_memory_mb = s.get_u64("loader", "max.memory.mb")?.unwrap_or(SortMemoryLimit::DEFAULT_MB);
    let record_bytes_estimate = s
        .get_u64("loader", "record.bytes.estimate")?
        .unwrap_or(DEFAULT_RECORD_BYTES_ESTIMATE);
    if record_bytes_estimate == 0 {
        return Err(EtlError::invalid_config("[loader] record.bytes.estimate must be at least 1"));
    }

    let table_mappings = s
        .get_csv("target.table.mappings")
        .into_iter()
        .map(|pair| {
            pair.split_once(':')
                .map(|(data_type, table)| TableMapping {
                    data_type: data_type.trim().to_string(),
                    table_name: table.trim().to_string(),
                })
                .ok_or_else(|| {
                    EtlError::invalid_config(format!(
                        "[loader] target.table.mappings entry '{}' must be dataType:tableName",
                        pair
                    ))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LoaderConfig {
        connection_url: s.require_string("loader", "connection.url")?,
        username: s.get_string("connection.username").unwrap_or_default(),
        password: s.get_string("connection.password").unwrap_or_default(),
        sort_fields: s.get_csv("sort.fields"),
        max_sort_memory: SortMemoryLimit::from_mb(max_memory_mb)?,
        record_bytes_estimate,
        temporary_table_prefix: s.get_string("temporary.table.prefix").unwrap_or_else(|| "tmp_".to_string()),
        table_mappings,
    })
}

fn parse_logging(s: &Section) -> Result<LoggingConfig, EtlError> {
    Ok(LoggingConfig {
        log_file_path: s.get_string("logFilePath").map(PathBuf::from),
        log_level: s.get_string("logLevel").unwrap_or_else(|| "info".to_string()),
    })
}
