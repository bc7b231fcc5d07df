//! Record schemas and boundary validation
//!
//! Every master-data module declares its shape once as a [`RecordSchema`]:
//! which fields exist, their kinds (including enum domains), which are
//! required, which are privileged, and which only the numbering engine may
//! touch. Payloads are validated against the schema at the boundary, before
//! anything reaches the registry, so type surprises surface as a single
//! typed `Validation` error instead of deep-in-the-stack coercion failures.

use chrono::DateTime;
use masterdata_core::error::{Error, Result};
use masterdata_core::value::Value;
use std::collections::BTreeMap;

/// Field kind, checked against provided values
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// UTF-8 string
    Str,
    /// 64-bit integer
    Int,
    /// 64-bit float
    Float,
    /// Boolean
    Bool,
    /// RFC 3339 timestamp carried as a string
    Timestamp,
    /// String restricted to a fixed domain
    Enumerated(Vec<String>),
}

/// One field declaration
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Attribute name
    pub name: String,
    /// Expected kind
    pub kind: FieldKind,
    /// Must be present and non-null
    pub required: bool,
    /// Mutable only by an elevated caller or the record's creator
    pub privileged: bool,
    /// Owned by the numbering engine; silently stripped from generic updates
    pub engine_managed: bool,
}

impl FieldSpec {
    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            privileged: false,
            engine_managed: false,
        }
    }

    /// Declare a string field
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Str)
    }

    /// Declare an integer field
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Int)
    }

    /// Declare a float field
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    /// Declare a boolean field
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    /// Declare a timestamp field (RFC 3339 string)
    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Timestamp)
    }

    /// Declare an enumerated field with its allowed values
    pub fn enumerated(name: impl Into<String>, allowed: &[&str]) -> Self {
        Self::new(
            name,
            FieldKind::Enumerated(allowed.iter().map(|s| s.to_string()).collect()),
        )
    }

    /// Mark the field required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the field privileged
    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    /// Mark the field engine-managed
    pub fn engine_managed(mut self) -> Self {
        self.engine_managed = true;
        self
    }
}

/// Shape of one master-data module
#[derive(Debug, Clone)]
pub struct RecordSchema {
    /// Collection name, also the key prefix for this module's records
    pub collection: String,
    /// Declared fields
    pub fields: Vec<FieldSpec>,
    /// Whether `get` emits READ audit entries (the series module does;
    /// most modules do not)
    pub audit_reads: bool,
}

impl RecordSchema {
    /// Start a schema for a collection
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            fields: Vec::new(),
            audit_reads: false,
        }
    }

    /// Add a field declaration
    pub fn with_field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Toggle READ auditing for this module
    pub fn with_audit_reads(mut self, audit_reads: bool) -> Self {
        self.audit_reads = audit_reads;
        self
    }

    /// Look up a field declaration
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate a complete attribute map (create, or post-merge on update)
    ///
    /// Rejects unknown fields, missing/null required fields, kind
    /// mismatches, and enum domain violations.
    pub fn validate_full(&self, attributes: &BTreeMap<String, Value>) -> Result<()> {
        self.validate_patch(attributes)?;
        for spec in &self.fields {
            if spec.required {
                match attributes.get(&spec.name) {
                    None | Some(Value::Null) => {
                        return Err(Error::validation(
                            spec.name.as_str(),
                            format!("{} is required", display_name(&spec.name)),
                        ));
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Validate only the fields present in a patch
    pub fn validate_patch(&self, attributes: &BTreeMap<String, Value>) -> Result<()> {
        for (name, value) in attributes {
            let spec = self.field(name).ok_or_else(|| {
                Error::validation(name.as_str(), format!("Unknown field '{}'", name))
            })?;
            if value.is_null() {
                // Null clears an optional field; required-ness is checked
                // against the full map, not the patch.
                continue;
            }
            check_kind(spec, value)?;
        }
        Ok(())
    }
}

fn check_kind(spec: &FieldSpec, value: &Value) -> Result<()> {
    let name = display_name(&spec.name);
    match &spec.kind {
        FieldKind::Str => {
            if value.as_str().is_none() {
                return Err(Error::validation(
                    spec.name.as_str(),
                    format!("{} must be text", name),
                ));
            }
        }
        FieldKind::Int => {
            if value.as_int().is_none() {
                return Err(Error::validation(
                    spec.name.as_str(),
                    format!("{} must be a whole number", name),
                ));
            }
        }
        FieldKind::Float => {
            if value.as_float().is_none() && value.as_int().is_none() {
                return Err(Error::validation(
                    spec.name.as_str(),
                    format!("{} must be a number", name),
                ));
            }
        }
        FieldKind::Bool => {
            if value.as_bool().is_none() {
                return Err(Error::validation(
                    spec.name.as_str(),
                    format!("{} must be true or false", name),
                ));
            }
        }
        FieldKind::Timestamp => {
            let ok = value
                .as_str()
                .map(|s| DateTime::parse_from_rfc3339(s).is_ok())
                .unwrap_or(false);
            if !ok {
                return Err(Error::validation(
                    spec.name.as_str(),
                    format!("{} must be a valid timestamp", name),
                ));
            }
        }
        FieldKind::Enumerated(allowed) => {
            let ok = value.as_str().map(|s| allowed.iter().any(|a| a == s));
            if ok != Some(true) {
                return Err(Error::validation(
                    spec.name.as_str(),
                    format!("{} must be one of: {}", name, allowed.join(", ")),
                ));
            }
        }
    }
    Ok(())
}

/// Turn a snake_case field name into its display form
///
/// `end_number` → `End Number`, matching the labels the admin screens use
/// in their validation messages.
pub fn display_name(field: &str) -> String {
    field
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> RecordSchema {
        RecordSchema::new("series")
            .with_field(FieldSpec::string("prefix").required())
            .with_field(FieldSpec::string("suffix"))
            .with_field(FieldSpec::int("end_number").required())
            .with_field(FieldSpec::boolean("is_active"))
            .with_field(
                FieldSpec::enumerated("reset_frequency", &["none", "daily", "monthly", "yearly"])
                    .required(),
            )
            .with_field(FieldSpec::timestamp("last_reset_at"))
            .with_field(FieldSpec::string("role").privileged())
    }

    fn valid_attrs() -> BTreeMap<String, Value> {
        let mut attrs = BTreeMap::new();
        attrs.insert("prefix".to_string(), Value::String("INV-".into()));
        attrs.insert("end_number".to_string(), Value::Int(100));
        attrs.insert("reset_frequency".to_string(), Value::String("none".into()));
        attrs
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("end_number"), "End Number");
        assert_eq!(display_name("prefix"), "Prefix");
        assert_eq!(display_name("is_active"), "Is Active");
    }

    #[test]
    fn test_valid_full_map_passes() {
        assert!(schema().validate_full(&valid_attrs()).is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let mut attrs = valid_attrs();
        attrs.remove("end_number");
        let err = schema().validate_full(&attrs).unwrap_err();
        assert_eq!(err.to_string(), "End Number is required");
    }

    #[test]
    fn test_null_required_field_counts_as_missing() {
        let mut attrs = valid_attrs();
        attrs.insert("prefix".to_string(), Value::Null);
        let err = schema().validate_full(&attrs).unwrap_err();
        assert_eq!(err.to_string(), "Prefix is required");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut attrs = valid_attrs();
        attrs.insert("color".to_string(), Value::String("blue".into()));
        let err = schema().validate_full(&attrs).unwrap_err();
        assert!(err.to_string().contains("Unknown field 'color'"));
    }

    #[test]
    fn test_kind_mismatch() {
        let mut attrs = valid_attrs();
        attrs.insert("end_number".to_string(), Value::String("100".into()));
        let err = schema().validate_full(&attrs).unwrap_err();
        assert_eq!(err.to_string(), "End Number must be a whole number");
    }

    #[test]
    fn test_enum_domain_violation() {
        let mut attrs = valid_attrs();
        attrs.insert(
            "reset_frequency".to_string(),
            Value::String("hourly".into()),
        );
        let err = schema().validate_full(&attrs).unwrap_err();
        assert!(err
            .to_string()
            .contains("Reset Frequency must be one of: none, daily, monthly, yearly"));
    }

    #[test]
    fn test_timestamp_kind() {
        let mut attrs = valid_attrs();
        attrs.insert(
            "last_reset_at".to_string(),
            Value::String("2026-08-06T08:30:00Z".into()),
        );
        assert!(schema().validate_full(&attrs).is_ok());

        attrs.insert("last_reset_at".to_string(), Value::String("yesterday".into()));
        let err = schema().validate_full(&attrs).unwrap_err();
        assert!(err.to_string().contains("valid timestamp"));
    }

    #[test]
    fn test_patch_skips_required_check() {
        // A patch touching only one field must not demand the others
        let mut patch = BTreeMap::new();
        patch.insert("suffix".to_string(), Value::String("-IN".into()));
        assert!(schema().validate_patch(&patch).is_ok());
    }

    #[test]
    fn test_patch_null_clears_optional_field() {
        let mut patch = BTreeMap::new();
        patch.insert("suffix".to_string(), Value::Null);
        assert!(schema().validate_patch(&patch).is_ok());
    }

    #[test]
    fn test_field_lookup_and_flags() {
        let s = schema();
        assert!(s.field("role").unwrap().privileged);
        assert!(!s.field("prefix").unwrap().privileged);
        assert!(s.field("nonexistent").is_none());
    }

    #[test]
    fn test_float_kind_accepts_int() {
        let s = RecordSchema::new("m").with_field(FieldSpec::float("weight"));
        let mut attrs = BTreeMap::new();
        attrs.insert("weight".to_string(), Value::Int(3));
        assert!(s.validate_patch(&attrs).is_ok());
        attrs.insert("weight".to_string(), Value::Float(3.5));
        assert!(s.validate_patch(&attrs).is_ok());
    }
}
