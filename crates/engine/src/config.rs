use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::error::{Result, ZoneError};
use crate::model::RatioPair;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration. Every section is optional; an empty document yields
/// the defaults for the usual zone tables (`ZONE`, `Old_Z_6973` lookup
/// columns, `BC_`/`EMP_` ratio pairs).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZoneConfig {
    #[serde(default)]
    pub zones: ZoneFieldConfig,
    #[serde(default)]
    pub lookup: LookupColumns,
    #[serde(default)]
    pub ratios: RatioConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Zones + Lookup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ZoneFieldConfig {
    /// Column holding the zone ID in the coarse and fine tables.
    pub field: String,
}

impl Default for ZoneFieldConfig {
    fn default() -> Self {
        Self { field: "ZONE".into() }
    }
}

/// Column names of the correspondence CSV.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LookupColumns {
    pub old_coarse: String,
    pub fine: String,
    pub new_coarse: String,
}

impl Default for LookupColumns {
    fn default() -> Self {
        Self {
            old_coarse: "Old_Z_6973".into(),
            fine: "Z_20825".into(),
            new_coarse: "New_Z_6973".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Ratios
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatioConfig {
    pub count_prefix: String,
    pub total_prefix: String,
    /// Pair every `count_prefix` field of the coarse schema automatically.
    pub infer: bool,
    /// Pairs declared by hand, resolved before inferred ones.
    pub pairs: Vec<RatioPairConfig>,
}

impl Default for RatioConfig {
    fn default() -> Self {
        Self {
            count_prefix: "BC_".into(),
            total_prefix: "EMP_".into(),
            infer: true,
            pairs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatioPairConfig {
    pub code: String,
    pub count_field: String,
    pub total_field: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Distribute coarse zones on the rayon pool.
    pub parallel: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ZoneConfig {
    pub fn from_toml(input: &str) -> Result<Self> {
        let config: ZoneConfig =
            toml::from_str(input).map_err(|e| ZoneError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.zones.field.trim().is_empty() {
            return Err(ZoneError::ConfigValidation("zones.field must not be empty".into()));
        }

        let cols = [&self.lookup.old_coarse, &self.lookup.fine, &self.lookup.new_coarse];
        if cols.iter().any(|c| c.trim().is_empty()) {
            return Err(ZoneError::ConfigValidation("lookup column names must not be empty".into()));
        }
        if cols[0] == cols[1] || cols[0] == cols[2] || cols[1] == cols[2] {
            return Err(ZoneError::ConfigValidation(
                "lookup columns old_coarse, fine and new_coarse must be distinct".into(),
            ));
        }

        let ratios = &self.ratios;
        if ratios.infer {
            if ratios.count_prefix.is_empty() || ratios.total_prefix.is_empty() {
                return Err(ZoneError::ConfigValidation(
                    "ratios.count_prefix and ratios.total_prefix must not be empty when infer = true".into(),
                ));
            }
            if ratios.count_prefix == ratios.total_prefix {
                return Err(ZoneError::ConfigValidation(format!(
                    "ratios.count_prefix and ratios.total_prefix are both '{}'",
                    ratios.count_prefix
                )));
            }
        }

        let mut codes = HashSet::new();
        for pair in &ratios.pairs {
            if pair.code.is_empty() {
                return Err(ZoneError::ConfigValidation("ratio pair with empty code".into()));
            }
            if !codes.insert(pair.code.as_str()) {
                return Err(ZoneError::ConfigValidation(format!(
                    "ratio pair '{}' declared twice",
                    pair.code
                )));
            }
            if pair.count_field == pair.total_field {
                return Err(ZoneError::ConfigValidation(format!(
                    "ratio pair '{}': count_field and total_field are both '{}'",
                    pair.code, pair.count_field
                )));
            }
            if pair.count_field == self.zones.field || pair.total_field == self.zones.field {
                return Err(ZoneError::ConfigValidation(format!(
                    "ratio pair '{}' uses the zone field",
                    pair.code
                )));
            }
        }
        ensure_disjoint(
            ratios
                .pairs
                .iter()
                .map(|p| (p.code.as_str(), p.count_field.as_str(), p.total_field.as_str())),
        )?;

        Ok(())
    }

    /// Typed ratio pairs for a coarse schema: declared pairs first, then
    /// (with `infer`) one pair per `count_prefix` field not already declared.
    pub fn resolve_pairs(&self, schema: &[String]) -> Result<Vec<RatioPair>> {
        let has = |field: &str| schema.iter().any(|f| f == field);
        let mut pairs: Vec<RatioPair> = Vec::new();

        for declared in &self.ratios.pairs {
            for field in [&declared.count_field, &declared.total_field] {
                if !has(field.as_str()) {
                    return Err(ZoneError::UnpairedField {
                        code: declared.code.clone(),
                        field: field.clone(),
                    });
                }
            }
            pairs.push(RatioPair {
                code: declared.code.clone(),
                count_field: declared.count_field.clone(),
                total_field: declared.total_field.clone(),
            });
        }

        let inferred = if self.ratios.infer { schema } else { &[] };
        for field in inferred {
            let Some(code) = field.strip_prefix(&self.ratios.count_prefix) else {
                continue;
            };
            if pairs.iter().any(|p| &p.count_field == field) {
                continue;
            }
            if code.is_empty() {
                return Err(ZoneError::ConfigValidation(format!(
                    "field '{field}' has an empty ratio code"
                )));
            }
            if pairs.iter().any(|p| p.code == code) {
                return Err(ZoneError::ConfigValidation(format!(
                    "inferred ratio code '{code}' from '{field}' clashes with a declared pair"
                )));
            }
            let total_field = format!("{}{code}", self.ratios.total_prefix);
            if !has(total_field.as_str()) {
                return Err(ZoneError::UnpairedField {
                    code: code.to_string(),
                    field: total_field,
                });
            }
            pairs.push(RatioPair {
                code: code.to_string(),
                count_field: field.clone(),
                total_field,
            });
        }

        ensure_disjoint(
            pairs
                .iter()
                .map(|p| (p.code.as_str(), p.count_field.as_str(), p.total_field.as_str())),
        )?;
        Ok(pairs)
    }
}

/// Each field may fill one slot of one pair. A shared field would be skipped
/// by distribution and then overwritten by whichever ratio is derived last.
fn ensure_disjoint<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> Result<()> {
    let mut owner: HashMap<&str, &str> = HashMap::new();
    for (code, count_field, total_field) in pairs {
        for field in [count_field, total_field] {
            if let Some(other) = owner.insert(field, code) {
                return Err(ZoneError::ConfigValidation(format!(
                    "field '{field}' is used by ratio pairs '{other}' and '{code}'"
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
