//! Settings editor: form layout, population from `config/get`, serialisation
//! for `config/set`

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat configuration as returned by `config/get`
///
/// Multi-valued entries are JSON arrays encoded as strings, e.g. `["a","b"]`.
pub type ConfigRecord = BTreeMap<String, String>;

/// Serialised form as posted to `config/set`
pub type FormData = Map<String, Value>;

/// Kind of input a settings field is edited with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    /// Select filled from `control/pdbBranches`
    PdbBranch,
    /// Select filled from `control/puiBranches`
    PuiBranch,
    Select(Vec<String>),
    /// Group of checkboxes, one per option; serialised as a JSON array
    Checkboxes(Vec<String>),
}

/// One named field of the settings form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub kind: FieldKind,
}

impl FormField {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// State of the settings form
#[derive(Debug, Clone, Default)]
pub struct SettingsForm {
    fields: Vec<FormField>,
    values: BTreeMap<String, String>,
    checked: BTreeMap<String, BTreeSet<String>>,
    pdb_branches: Vec<String>,
    pui_branches: Vec<String>,
}

impl SettingsForm {
    pub fn new(fields: Vec<FormField>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Replace the branch lists offered by the branch selects
    pub fn set_branches(&mut self, pdb: Vec<String>, pui: Vec<String>) {
        self.pdb_branches = pdb;
        self.pui_branches = pui;
    }

    pub fn pdb_branches(&self) -> &[String] {
        &self.pdb_branches
    }

    pub fn pui_branches(&self) -> &[String] {
        &self.pui_branches
    }

    /// Options offered by a select or checkbox field
    pub fn options(&self, name: &str) -> Vec<String> {
        match self.field(name).map(|f| &f.kind) {
            Some(FieldKind::PdbBranch) => self.pdb_branches.clone(),
            Some(FieldKind::PuiBranch) => self.pui_branches.clone(),
            Some(FieldKind::Select(options)) | Some(FieldKind::Checkboxes(options)) => {
                options.clone()
            }
            Some(FieldKind::Text) | None => Vec::new(),
        }
    }

    /// Fill the form from the server's current configuration
    ///
    /// Array-valued entries check every checkbox carrying one of the values,
    /// whichever group it belongs to. Scalars set the field of the same name.
    /// Entries without a matching field are ignored.
    pub fn populate(&mut self, record: &ConfigRecord) {
        for (key, value) in record {
            if let Some(items) = parse_array(value) {
                for item in items {
                    self.check_value(&item);
                }
                continue;
            }

            match self.field(key).map(|f| &f.kind) {
                Some(FieldKind::Checkboxes(_)) | None => {
                    tracing::trace!("No input for configuration key '{}'", key);
                }
                Some(_) => {
                    self.values.insert(key.clone(), value.clone());
                }
            }
        }
    }

    fn check_value(&mut self, item: &str) {
        for field in &self.fields {
            if let FieldKind::Checkboxes(options) = &field.kind {
                if options.iter().any(|o| o == item) {
                    self.checked
                        .entry(field.name.clone())
                        .or_default()
                        .insert(item.to_string());
                }
            }
        }
    }

    /// Current value of a scalar field
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Set a scalar field; returns false if there is no such scalar field
    pub fn set_value(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.field(name).map(|f| &f.kind) {
            Some(FieldKind::Checkboxes(_)) | None => false,
            Some(_) => {
                self.values.insert(name.to_string(), value.into());
                true
            }
        }
    }

    pub fn is_checked(&self, group: &str, option: &str) -> bool {
        self.checked
            .get(group)
            .is_some_and(|set| set.contains(option))
    }

    /// Check or uncheck one checkbox; returns false if it does not exist
    pub fn toggle(&mut self, group: &str, option: &str, checked: bool) -> bool {
        let exists = matches!(
            self.field(group).map(|f| &f.kind),
            Some(FieldKind::Checkboxes(options)) if options.iter().any(|o| o == option)
        );
        if !exists {
            return false;
        }
        let set = self.checked.entry(group.to_string()).or_default();
        if checked {
            set.insert(option.to_string());
        } else {
            set.remove(option);
        }
        true
    }

    /// Serialise the visible form for `config/set`
    pub fn to_form_data(&self) -> FormData {
        let mut data = Map::new();
        for field in &self.fields {
            let value = match &field.kind {
                FieldKind::Checkboxes(options) => Value::Array(
                    options
                        .iter()
                        .filter(|o| self.is_checked(&field.name, o))
                        .map(|o| Value::String(o.clone()))
                        .collect(),
                ),
                _ => Value::String(self.values.get(&field.name).cloned().unwrap_or_default()),
            };
            data.insert(field.name.clone(), value);
        }
        data
    }
}

/// Parse `["a","b"]`-style values; `None` for anything that is not a
/// bracketed JSON array of scalars
pub fn parse_array(value: &str) -> Option<Vec<String>> {
    let trimmed = value.trim();
    if !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
        return None;
    }
    let items: Vec<Value> = serde_json::from_str(trimmed).ok()?;
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .collect()
}

/// Build form data from `key=value` pairs, e.g. from the command line
///
/// Values in array syntax are sent as JSON arrays.
pub fn form_data_from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> FormData {
    let mut data = Map::new();
    for (key, value) in pairs {
        let value = match parse_array(value) {
            Some(items) => Value::Array(items.into_iter().map(Value::String).collect()),
            None => Value::String(value.to_string()),
        };
        data.insert(key.to_string(), value);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> SettingsForm {
        SettingsForm::new(vec![
            FormField::new("pcrtl.pdbms.branch", FieldKind::PdbBranch),
            FormField::new("pcrtl.java.heap", FieldKind::Text),
            FormField::new(
                "pcrtl.features",
                FieldKind::Checkboxes(vec!["a".into(), "b".into(), "c".into()]),
            ),
        ])
    }

    fn record(entries: &[(&str, &str)]) -> ConfigRecord {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn array_value_checks_matching_checkboxes() {
        let mut form = form();
        form.populate(&record(&[("pcrtl.features", r#"["a","b"]"#)]));

        assert!(form.is_checked("pcrtl.features", "a"));
        assert!(form.is_checked("pcrtl.features", "b"));
        assert!(!form.is_checked("pcrtl.features", "c"));
    }

    #[test]
    fn array_values_match_by_value_not_key() {
        let mut form = form();
        form.populate(&record(&[("some.other.key", r#"["c"]"#)]));
        assert!(form.is_checked("pcrtl.features", "c"));
    }

    #[test]
    fn scalar_populates_named_field() {
        let mut form = form();
        form.populate(&record(&[
            ("pcrtl.java.heap", "4g"),
            ("pcrtl.pdbms.branch", "master"),
        ]));

        assert_eq!(form.value("pcrtl.java.heap"), Some("4g"));
        assert_eq!(form.value("pcrtl.pdbms.branch"), Some("master"));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut form = form();
        form.populate(&record(&[("pcrtl.unknown", "x")]));
        assert_eq!(form.value("pcrtl.unknown"), None);
    }

    #[test]
    fn malformed_array_is_treated_as_scalar() {
        let mut form = form();
        form.populate(&record(&[("pcrtl.java.heap", "[not json]")]));
        assert_eq!(form.value("pcrtl.java.heap"), Some("[not json]"));
    }

    #[test]
    fn branch_options_come_from_lists() {
        let mut form = form();
        form.set_branches(vec!["master".into(), "dev".into()], vec!["ui".into()]);
        assert_eq!(form.options("pcrtl.pdbms.branch"), vec!["master", "dev"]);
        assert_eq!(form.pui_branches(), ["ui".to_string()]);
        assert!(form.options("pcrtl.java.heap").is_empty());
    }

    #[test]
    fn set_value_and_toggle() {
        let mut form = form();
        assert!(form.set_value("pcrtl.java.heap", "2g"));
        assert!(!form.set_value("pcrtl.features", "a"));
        assert!(!form.set_value("missing", "x"));

        assert!(form.toggle("pcrtl.features", "b", true));
        assert!(form.is_checked("pcrtl.features", "b"));
        assert!(form.toggle("pcrtl.features", "b", false));
        assert!(!form.is_checked("pcrtl.features", "b"));
        assert!(!form.toggle("pcrtl.features", "z", true));
    }

    #[test]
    fn form_data_contains_every_field() {
        let mut form = form();
        form.populate(&record(&[
            ("pcrtl.java.heap", "4g"),
            ("pcrtl.features", r#"["c","a"]"#),
        ]));

        let data = form.to_form_data();
        assert_eq!(data["pcrtl.java.heap"], Value::String("4g".into()));
        assert_eq!(data["pcrtl.pdbms.branch"], Value::String(String::new()));
        assert_eq!(data["pcrtl.features"], serde_json::json!(["a", "c"]));
    }

    #[test]
    fn parse_array_accepts_scalars_only() {
        assert_eq!(
            parse_array(r#"["a", 1, true]"#),
            Some(vec!["a".to_string(), "1".to_string(), "true".to_string()])
        );
        assert_eq!(parse_array(r#"[{"a":1}]"#), None);
        assert_eq!(parse_array("plain"), None);
        assert_eq!(parse_array("[]"), Some(vec![]));
    }

    #[test]
    fn pairs_become_form_data() {
        let data = form_data_from_pairs([("pcrtl.java.heap", "8g"), ("list", r#"["x"]"#)]);
        assert_eq!(data["pcrtl.java.heap"], Value::String("8g".into()));
        assert_eq!(data["list"], serde_json::json!(["x"]));
    }
}
