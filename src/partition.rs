/*!
 * Partition table and bucket naming
 *
 * A partition names one field of the record, an optional required value,
 * and the rule that turns a bucket key into an output file name:
 *
 * - `fixed`: one file, `<stem>`, for the single accepted value
 * - `numbered`: one file per key, `<stem><key>`
 * - `siblings`: the key selects one of a short list of names
 *
 * File names are `<base>-<stem>.<suffix>`, or `<stem>.<suffix>` when the
 * base is empty.
 */

use crate::error::{CollateError, Result};
use collate_core_demux::{ClassifierConfig, DemuxError};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;

/// Rule turning a bucket key into a file stem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingRule {
    /// Single file for the filtered value
    Fixed { stem: String },
    /// Stem followed by the decimal key
    Numbered { stem: String },
    /// Key indexes into this list of names
    Siblings { names: Vec<String> },
}

/// One named partition request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    pub name: String,
    /// Leading tokens skipped before the key token
    pub field: usize,
    /// Only records with this key are kept
    #[serde(default)]
    pub filter: Option<u64>,
    pub naming: NamingRule,
}

impl PartitionDescriptor {
    fn new(name: &str, field: usize, filter: Option<u64>, naming: NamingRule) -> Self {
        Self {
            name: name.to_string(),
            field,
            filter,
            naming,
        }
    }

    fn fixed(name: &str, field: usize, value: u64) -> Self {
        Self::new(
            name,
            field,
            Some(value),
            NamingRule::Fixed {
                stem: name.to_string(),
            },
        )
    }

    fn numbered(name: &str, field: usize, stem: &str) -> Self {
        Self::new(
            name,
            field,
            None,
            NamingRule::Numbered {
                stem: stem.to_string(),
            },
        )
    }

    fn siblings(name: &str, field: usize, names: &[&str]) -> Self {
        Self::new(
            name,
            field,
            None,
            NamingRule::Siblings {
                names: names.iter().map(|n| n.to_string()).collect(),
            },
        )
    }

    /// Classifier settings for this partition
    pub fn classifier_config(&self, marker: u8) -> ClassifierConfig {
        ClassifierConfig {
            marker,
            field: self.field,
            filter: self.filter,
        }
    }

    /// File stem for `key`, or a message describing why there is none
    pub fn stem_for(&self, key: u64) -> std::result::Result<Cow<'_, str>, String> {
        match &self.naming {
            NamingRule::Fixed { stem } => match self.filter {
                Some(value) if value == key => Ok(Cow::Borrowed(stem.as_str())),
                _ => Err(format!(
                    "Partition {} has no output for value {}",
                    self.name, key
                )),
            },
            NamingRule::Numbered { stem } => Ok(Cow::Owned(format!("{}{}", stem, key))),
            NamingRule::Siblings { names } => usize::try_from(key)
                .ok()
                .and_then(|i| names.get(i))
                .map(|n| Cow::Borrowed(n.as_str()))
                .ok_or_else(|| {
                    format!(
                        "Position value out of expected range in data: partition {}, possible range 0-{}, value {}",
                        self.name,
                        names.len().saturating_sub(1),
                        key
                    )
                }),
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(CollateError::Config(format!(
                "Invalid partition entry {}: {}",
                self.name, reason
            )))
        };

        if self.name.is_empty() {
            return Err(CollateError::Config(
                "Partition entry with an empty name".to_string(),
            ));
        }

        match &self.naming {
            NamingRule::Fixed { stem } => {
                if self.filter.is_none() {
                    return invalid("a fixed name needs a filter value");
                }
                check_stem(&self.name, stem)?;
            }
            NamingRule::Numbered { stem } => check_stem(&self.name, stem)?,
            NamingRule::Siblings { names } => {
                if names.is_empty() {
                    return invalid("sibling list is empty");
                }
                if self.filter.is_some() {
                    return invalid("sibling names cannot be combined with a filter value");
                }
                let mut seen = HashSet::new();
                for name in names {
                    check_stem(&self.name, name)?;
                    if !seen.insert(name.as_str()) {
                        return invalid(&format!("sibling name {} appears more than once", name));
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_stem(partition: &str, stem: &str) -> Result<()> {
    if stem.is_empty() || stem.contains(['/', '\\']) {
        return Err(CollateError::Config(format!(
            "Invalid partition entry {}: bad file name stem '{}'",
            partition, stem
        )));
    }
    Ok(())
}

/// Validated list of partition descriptors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionTable {
    descriptors: Vec<PartitionDescriptor>,
}

impl PartitionTable {
    /// Validate and build a table
    pub fn new(descriptors: Vec<PartitionDescriptor>) -> Result<Self> {
        let mut names = HashSet::new();
        for descriptor in &descriptors {
            descriptor.validate()?;
            if !names.insert(descriptor.name.as_str()) {
                return Err(CollateError::Config(format!(
                    "Partition {} is defined more than once",
                    descriptor.name
                )));
            }
        }
        Ok(Self { descriptors })
    }

    /// Built-in table for encoder trace records
    ///
    /// Field layout: frame type, plane, qindex, (unused), four mode fields,
    /// block shape, pixel count, transform type, transform size, eob count.
    pub fn builtin() -> Self {
        use PartitionDescriptor as D;
        Self {
            descriptors: vec![
                D::fixed("inter", 0, 1),
                D::fixed("intra", 0, 0),
                D::siblings("frametype", 0, &["inter", "intra"]),
                D::fixed("Y", 1, 0),
                D::fixed("U", 1, 1),
                D::fixed("V", 1, 2),
                D::siblings("plane", 1, &["Y", "U", "V"]),
                D::numbered("qi", 2, "qi"),
                D::numbered("mode", 4, "mode"),
                D::numbered("modeB", 5, "modeB"),
                D::numbered("modeC", 6, "modeC"),
                D::numbered("modeD", 7, "modeD"),
                D::numbered("blockshape", 8, "blockshape"),
                D::numbered("pixels", 9, "pixels"),
                D::numbered("N", 9, "pixels"),
                D::numbered("txtype", 10, "txtype"),
                D::numbered("txsize", 11, "txsize"),
                D::numbered("L", 11, "txsize"),
                D::numbered("eobcount", 12, "eobcount"),
            ],
        }
    }

    /// Look up a partition by name
    pub fn get(&self, name: &str) -> Result<&PartitionDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| CollateError::UnknownPartition(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartitionDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for PartitionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Resolves bucket keys of one partition to output file names
#[derive(Debug, Clone)]
pub struct OutputNamer {
    descriptor: PartitionDescriptor,
    base: String,
    suffix: String,
}

impl OutputNamer {
    pub fn new(descriptor: PartitionDescriptor, base: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            descriptor,
            base: base.into(),
            suffix: suffix.into(),
        }
    }

    /// Output file name for `key`
    pub fn file_name(&self, key: u64) -> std::result::Result<String, DemuxError> {
        let stem = self.descriptor.stem_for(key).map_err(DemuxError::Naming)?;
        let mut name = String::with_capacity(self.base.len() + stem.len() + self.suffix.len() + 2);
        if !self.base.is_empty() {
            name.push_str(&self.base);
            name.push('-');
        }
        name.push_str(&stem);
        if !self.suffix.is_empty() {
            name.push('.');
            name.push_str(&self.suffix);
        }
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn namer(partition: &str, base: &str) -> OutputNamer {
        let table = PartitionTable::builtin();
        OutputNamer::new(table.get(partition).unwrap().clone(), base, "m")
    }

    #[test]
    fn test_builtin_table_is_valid() {
        let table = PartitionTable::builtin();
        assert_eq!(table.len(), 19);
        assert!(PartitionTable::new(table.descriptors.clone()).is_ok());
    }

    #[test]
    fn test_lookup() {
        let table = PartitionTable::builtin();
        let qi = table.get("qi").unwrap();
        assert_eq!(qi.field, 2);
        assert_eq!(qi.filter, None);
        assert!(matches!(
            table.get("nonsense"),
            Err(CollateError::UnknownPartition(name)) if name == "nonsense"
        ));
    }

    #[test]
    fn test_fixed_naming() {
        let n = namer("intra", "trace");
        assert_eq!(n.file_name(0).unwrap(), "trace-intra.m");
        assert!(n.file_name(1).is_err());
    }

    #[test]
    fn test_numbered_naming() {
        assert_eq!(namer("qi", "").file_name(42).unwrap(), "qi42.m");
        assert_eq!(namer("qi", "clip").file_name(7).unwrap(), "clip-qi7.m");
    }

    #[test]
    fn test_alias_uses_target_stem() {
        assert_eq!(namer("N", "").file_name(64).unwrap(), "pixels64.m");
        assert_eq!(namer("L", "").file_name(2).unwrap(), "txsize2.m");
    }

    #[test]
    fn test_sibling_naming() {
        let n = namer("plane", "");
        assert_eq!(n.file_name(0).unwrap(), "Y.m");
        assert_eq!(n.file_name(2).unwrap(), "V.m");
        let err = n.file_name(3).unwrap_err();
        assert!(err.to_string().contains("possible range 0-2"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_empty_suffix() {
        let table = PartitionTable::builtin();
        let n = OutputNamer::new(table.get("qi").unwrap().clone(), "", "");
        assert_eq!(n.file_name(3).unwrap(), "qi3");
    }

    #[test]
    fn test_duplicate_siblings_rejected() {
        let d = PartitionDescriptor::siblings("dup", 0, &["a", "b", "a"]);
        let err = PartitionTable::new(vec![d]).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_invalid_descriptors_rejected() {
        let fixed_without_filter = PartitionDescriptor::new(
            "f",
            0,
            None,
            NamingRule::Fixed { stem: "f".into() },
        );
        assert!(PartitionTable::new(vec![fixed_without_filter]).is_err());

        let mut filtered_siblings = PartitionDescriptor::siblings("s", 0, &["a", "b"]);
        filtered_siblings.filter = Some(1);
        assert!(PartitionTable::new(vec![filtered_siblings]).is_err());

        let empty_siblings = PartitionDescriptor::siblings("e", 0, &[]);
        assert!(PartitionTable::new(vec![empty_siblings]).is_err());

        let bad_stem = PartitionDescriptor::numbered("p", 0, "../up");
        assert!(PartitionTable::new(vec![bad_stem]).is_err());
    }

    #[test]
    fn test_duplicate_partition_names_rejected() {
        let a = PartitionDescriptor::numbered("qi", 2, "qi");
        let b = PartitionDescriptor::numbered("qi", 3, "other");
        assert!(PartitionTable::new(vec![a, b]).is_err());
    }

    #[test]
    fn test_classifier_config() {
        let table = PartitionTable::builtin();
        let config = table.get("inter").unwrap().classifier_config(b'#');
        assert_eq!(config.field, 0);
        assert_eq!(config.filter, Some(1));
        assert_eq!(config.marker, b'#');
    }

    #[test]
    fn test_descriptor_from_toml() {
        let toml_str = r#"
name = "plane"
field = 1
naming = { siblings = { names = ["Y", "U", "V"] } }
"#;
        let d: PartitionDescriptor = toml::from_str(toml_str).unwrap();
        assert_eq!(d, PartitionTable::builtin().get("plane").unwrap().clone());
    }
}
