use serde_json::{Map, Value};

/// An open document as read from the store.
pub type Fields = Map<String, Value>;

pub const POWER_DETAIL_FIELD: &str = "powerDetail";
pub const DATE_FIELD: &str = "date";
pub const DESC_FIELD: &str = "desc";

const KEY_SEPARATOR: &str = "_";
const MISSING_KEY_PART: &str = "null";

/// A document classified once, when it is read.
///
/// Documents carrying a `powerDetail` list are primary readings. Everything else
/// sharing their `date` and `desc` is a fragment that only contributes fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Primary { fields: Fields, detail: Vec<Value> },
    Supplemental { fields: Fields },
}

impl Record {
    /// Classifies a document. The `powerDetail` list of a primary record is moved
    /// out of its fields, so primaries never expose it again.
    pub fn classify(mut fields: Fields) -> Record {
        if !matches!(fields.get(POWER_DETAIL_FIELD), Some(Value::Array(_))) {
            return Record::Supplemental { fields };
        }

        match fields.shift_remove(POWER_DETAIL_FIELD) {
            Some(Value::Array(detail)) => Record::Primary { fields, detail },
            _ => Record::Primary {
                fields,
                detail: Vec::new(),
            },
        }
    }

    pub fn fields(&self) -> &Fields {
        match self {
            Record::Primary { fields, .. } | Record::Supplemental { fields } => fields,
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, Record::Primary { .. })
    }

    pub fn identity_key(&self) -> String {
        identity_key(self.fields())
    }
}

/// `date` and `desc` joined with `_`. Absent or null parts become `null`, so two
/// records missing the same parts share a key.
pub fn identity_key(fields: &Fields) -> String {
    format!(
        "{}{}{}",
        key_part(fields.get(DATE_FIELD)),
        KEY_SEPARATOR,
        key_part(fields.get(DESC_FIELD))
    )
}

fn key_part(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => MISSING_KEY_PART.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_list_power_detail_is_primary() {
        let record = Record::classify(fields(json!({
            "date": "2024-05-01",
            "desc": "line 1",
            "powerDetail": [{"t": "00:00", "p": 1.5}],
            "total": 3
        })));

        match record {
            Record::Primary { fields, detail } => {
                assert_eq!(detail.len(), 1);
                assert!(!fields.contains_key(POWER_DETAIL_FIELD));
                let keys: Vec<&String> = fields.keys().collect();
                assert_eq!(keys, vec!["date", "desc", "total"]);
            }
            other => panic!("Expected a primary record, got {:?}", other),
        }
    }

    #[test]
    fn test_non_list_power_detail_is_supplemental() {
        for detail in [json!({"p": 1}), json!("[]"), json!(null)] {
            let record = Record::classify(fields(json!({
                "date": "2024-05-01",
                "desc": "line 1",
                "powerDetail": detail
            })));

            assert!(!record.is_primary());
            assert!(record.fields().contains_key(POWER_DETAIL_FIELD));
        }
    }

    #[test]
    fn test_missing_power_detail_is_supplemental() {
        let record = Record::classify(fields(json!({"date": "2024-05-01", "ia": 3})));

        assert!(!record.is_primary());
    }

    #[test]
    fn test_identity_key() {
        let record = Record::classify(fields(json!({"date": "2024-05-01", "desc": "line 1"})));

        assert_eq!(record.identity_key(), "2024-05-01_line 1");
    }

    #[test]
    fn test_identity_key_with_missing_parts_collides() {
        let no_desc = fields(json!({"date": "2024-05-01"}));
        let null_desc = fields(json!({"date": "2024-05-01", "desc": null}));

        assert_eq!(identity_key(&no_desc), "2024-05-01_null");
        assert_eq!(identity_key(&no_desc), identity_key(&null_desc));
        assert_eq!(identity_key(&Fields::new()), "null_null");
    }

    #[test]
    fn test_identity_key_with_non_string_parts() {
        let record = fields(json!({"date": {"$date": "2024-05-01T00:00:00Z"}, "desc": 12}));

        assert_eq!(
            identity_key(&record),
            r#"{"$date":"2024-05-01T00:00:00Z"}_12"#
        );
    }
}
