use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::Path;
use yaml_rust2::YamlLoader;
// re-export Yaml for convenience
pub use yaml_rust2::Yaml;

pub fn load_document_file<P: AsRef<Path>>(path: P) -> Result<Yaml> {
    let yaml_str = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
    load_document_str(&yaml_str)
}

pub fn load_document_str(yaml_str: &str) -> Result<Yaml> {
    let docs = YamlLoader::load_from_str(yaml_str)?;
    let doc = docs.into_iter().next().ok_or(anyhow!("Empty yaml file"))?;
    if doc.as_hash().is_none() {
        bail!("Expected top-level element to be a hash");
    }
    Ok(doc)
}

pub trait YamlExt: Sized {
    fn required(&self, key: &'static str) -> Result<&Yaml>;

    fn optional(&self, key: &'static str) -> Option<&Yaml>;

    fn optional_vec(&self, key: &'static str) -> Result<Option<&Vec<Self>>>;

    /// Renders a string, integer, real or boolean scalar as text.
    fn to_scalar(&self) -> Result<String>;

    fn to_u64(&self) -> Result<u64>;

    /// Entries of a hash as `(scalar key, value)` pairs, in declaration order.
    fn entries(&self) -> Result<Vec<(String, &Self)>>;
}

impl YamlExt for Yaml {
    fn required(&self, key: &'static str) -> Result<&Yaml> {
        let value = &self[key];
        if value.is_badvalue() {
            bail!("Missing key {}", key)
        } else {
            Ok(value)
        }
    }

    fn optional(&self, key: &'static str) -> Option<&Yaml> {
        let value = &self[key];
        if value.is_badvalue() || value.is_null() {
            None
        } else {
            Some(value)
        }
    }

    fn optional_vec(&self, key: &'static str) -> Result<Option<&Vec<Self>>> {
        match &self[key] {
            Yaml::Array(v) => Ok(Some(v)),
            Yaml::BadValue | Yaml::Null => Ok(None),
            _ => bail!("Expected {} to be an array", key),
        }
    }

    fn to_scalar(&self) -> Result<String> {
        match self {
            Yaml::String(s) => Ok(s.clone()),
            Yaml::Integer(i) => Ok(i.to_string()),
            Yaml::Real(r) => Ok(r.clone()),
            Yaml::Boolean(b) => Ok(b.to_string()),
            _ => bail!("Expected a scalar value"),
        }
    }

    fn to_u64(&self) -> Result<u64> {
        match self {
            Yaml::Integer(i) => u64::try_from(*i).map_err(|_| anyhow!("Expected a positive number")),
            _ => bail!("Expected a number"),
        }
    }

    fn entries(&self) -> Result<Vec<(String, &Self)>> {
        let hash = self.as_hash().ok_or(anyhow!("Expected a mapping"))?;
        hash.iter()
            .map(|(key, value)| Ok((key.to_scalar()?, value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_entries_keep_declaration_order() {
        let doc = load_document_str("triggers:\n  zeta: a\n  alpha: b\n  mid.exe: c\n").unwrap();
        let keys: Vec<String> = doc
            .required("triggers")
            .unwrap()
            .entries()
            .unwrap()
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid.exe"]);
    }

    #[rstest]
    #[case::string("value: \"-10\"", "-10")]
    #[case::integer("value: -10", "-10")]
    #[case::boolean("value: true", "true")]
    fn test_scalars_render_as_text(#[case] yaml: &str, #[case] expected: &str) {
        let doc = load_document_str(yaml).unwrap();
        assert_eq!(doc.required("value").unwrap().to_scalar().unwrap(), expected);
    }

    #[test]
    fn test_missing_and_null_keys_are_optional() {
        let doc = load_document_str("blacklist:\nother: 1\n").unwrap();
        assert!(doc.optional("blacklist").is_none());
        assert!(doc.optional_vec("blacklist").unwrap().is_none());
        assert!(doc.optional("absent").is_none());
        assert!(doc.required("absent").is_err());
    }

    #[test]
    fn test_top_level_must_be_a_mapping() {
        assert!(load_document_str("- a\n- b\n").is_err());
        assert!(load_document_str("").is_err());
    }

    #[test]
    fn test_negative_number_is_not_u64() {
        let doc = load_document_str("scan_interval: -3").unwrap();
        assert!(doc.required("scan_interval").unwrap().to_u64().is_err());
    }
}
