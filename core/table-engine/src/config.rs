//! FILENAME: core/table-engine/src/config.rs
//! Resolution and layout options.

use serde::{Deserialize, Serialize};

use xbrl_model::ROLE_CODE_LABEL;

/// Options controlling how a table is resolved and laid out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    /// Label language.
    pub lang: String,

    /// Extra label roles attached to header cells (documentation, codes).
    pub label_roles: Vec<String>,

    /// Data-entry mode: number of entry placeholder partitions appended to
    /// each open aspect node. `None` disables entry placeholders.
    pub entry_rows: Option<usize>,

    /// Check that rule nodes bind existing, non-dimension concepts and
    /// members of explicit dimensions.
    pub validate_concepts: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            lang: "en".to_string(),
            label_roles: Vec::new(),
            entry_rows: None,
            validate_concepts: true,
        }
    }
}

impl TableOptions {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Extra label roles with code roles moved last.
    pub fn ordered_label_roles(&self) -> Vec<&str> {
        let (codes, others): (Vec<&str>, Vec<&str>) = self
            .label_roles
            .iter()
            .map(String::as_str)
            .partition(|role| *role == ROLE_CODE_LABEL);
        others.into_iter().chain(codes).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xbrl_model::ROLE_DOCUMENTATION;

    #[test]
    fn test_partial_json_uses_defaults() {
        let options = TableOptions::from_json(r#"{"entry_rows": 2}"#).unwrap();
        assert_eq!(options.entry_rows, Some(2));
        assert_eq!(options.lang, "en");
        assert!(options.validate_concepts);
    }

    #[test]
    fn test_code_roles_last() {
        let options = TableOptions {
            label_roles: vec![ROLE_CODE_LABEL.to_string(), ROLE_DOCUMENTATION.to_string()],
            ..TableOptions::default()
        };
        assert_eq!(options.ordered_label_roles(), vec![ROLE_DOCUMENTATION, ROLE_CODE_LABEL]);
    }
}
