use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::{CONFIG_FILE_NAME, DEFAULT_PILL, DEFAULT_SCAN_INTERVAL_SECS};
use crate::pills::{Pill, PillCatalog, PillSetting, TriggerMap};
use crate::utils::yaml::{load_document_file, load_document_str, Yaml, YamlExt};

#[derive(Debug, Clone)]
pub struct Config {
    pub scan_interval: Duration,
    pub triggers: TriggerMap,
    pub pills: PillCatalog,
    pub blacklist: HashSet<String>,
}

impl Config {
    /// Rejects what would make the daemon misbehave, and reports what it merely ignores.
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval.is_zero() {
            bail!("scan_interval must be greater than zero");
        }
        if self.triggers.is_empty() {
            bail!("triggers must not be empty");
        }
        if self.pills.is_empty() {
            bail!("pills must not be empty");
        }
        if !self.pills.has_default() {
            bail!("pills must define a '{}' pill", DEFAULT_PILL);
        }

        for pill in self.pills.iter() {
            for setting in &pill.settings {
                if let PillSetting::Unknown { key, .. } = setting {
                    warn!("Unknown setting '{}' in pill '{}' will be ignored", key, pill.name);
                }
            }
            match pill.nice() {
                Some(_) if pill.name == DEFAULT_PILL => {
                    warn!("The '{}' pill can't set a nice value, ignoring it", DEFAULT_PILL);
                }
                Some(Err(e)) => {
                    return Err(e).with_context(|| format!("Invalid pill '{}'", pill.name));
                }
                _ => {}
            }
        }

        for (substring, pill) in self.triggers.iter() {
            if !self.pills.contains(pill) {
                warn!(
                    "Trigger '{}' refers to undefined pill '{}' and will be ignored",
                    substring, pill
                );
            }
        }

        Ok(())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .context("Couldn't determine the user configuration directory")
    }

    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::default_path(),
        }
    }

    /// Loads and validates the configuration at `path`, after checking that nobody else
    /// can rewrite it.
    pub fn load(path: &Path) -> Result<Config> {
        Self::check_permissions(path)?;
        let doc = load_document_file(path)?;
        let config = Self::from_document(&doc)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        debug!(
            "Loaded {} triggers and {} pills from {}",
            config.triggers.len(),
            config.pills.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn load_str(raw: &str) -> Result<Config> {
        Self::from_document(&load_document_str(raw)?)
    }

    fn from_document(doc: &Yaml) -> Result<Config> {
        let scan_interval = match doc.optional("scan_interval") {
            Some(value) => value.to_u64().context("Invalid scan_interval")?,
            None => DEFAULT_SCAN_INTERVAL_SECS,
        };

        let config = Config {
            scan_interval: Duration::from_secs(scan_interval),
            triggers: Self::parse_triggers(doc.required("triggers")?)?,
            pills: Self::parse_pills(doc.required("pills")?)?,
            blacklist: Self::parse_blacklist(doc)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn parse_triggers(yaml: &Yaml) -> Result<TriggerMap> {
        let mut triggers = TriggerMap::default();
        for (substring, pill) in yaml.entries().context("Invalid triggers")? {
            let pill = pill
                .to_scalar()
                .with_context(|| format!("Invalid pill name for trigger '{}'", substring))?;
            if substring.trim().is_empty() || pill.trim().is_empty() {
                bail!("Triggers must have a non-empty substring and pill name");
            }
            triggers.insert(substring, pill);
        }
        Ok(triggers)
    }

    fn parse_pills(yaml: &Yaml) -> Result<PillCatalog> {
        let mut pills = PillCatalog::default();
        for (name, body) in yaml.entries().context("Invalid pills")? {
            if name.trim().is_empty() {
                bail!("Pill names must not be empty");
            }
            let entries = body
                .entries()
                .with_context(|| format!("Pill '{}' must be a mapping", name))?;
            if entries.is_empty() {
                bail!("Pill '{}' must declare at least one setting", name);
            }
            let pairs = entries
                .into_iter()
                .map(|(key, value)| {
                    let value = value.to_scalar().with_context(|| {
                        format!("Invalid value for '{}' in pill '{}'", key, name)
                    })?;
                    if key.trim().is_empty() || value.trim().is_empty() {
                        bail!("Empty setting in pill '{}'", name);
                    }
                    Ok((key, value))
                })
                .collect::<Result<Vec<_>>>()?;
            let pill = Pill::from_pairs(name.as_str(), &pairs)
                .with_context(|| format!("Invalid pill '{}'", name))?;
            pills.insert(pill);
        }
        Ok(pills)
    }

    fn parse_blacklist(doc: &Yaml) -> Result<HashSet<String>> {
        let Some(entries) = doc.optional_vec("blacklist")? else {
            return Ok(HashSet::new());
        };
        entries
            .iter()
            .map(|entry| entry.to_scalar().context("Invalid blacklist entry"))
            .collect()
    }

    /// The file must belong to the current user and must not be world-writable.
    pub fn check_permissions(path: &Path) -> Result<()> {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Config file {} not found", path.display()))?;

        if metadata.permissions().mode() & 0o002 != 0 {
            bail!(
                "Config file {} is world-writable, refusing to load it",
                path.display()
            );
        }

        let uid = nix::unistd::Uid::current().as_raw();
        if metadata.uid() != uid {
            bail!(
                "Config file {} is owned by uid {}, expected {}",
                path.display(),
                metadata.uid(),
                uid
            );
        }

        Ok(())
    }
}
