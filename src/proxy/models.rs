//! Model list payload served on `/v1/models`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelList {
    pub data: Vec<ModelEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_id: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub display_name: String,
    pub created_at: String,
}

impl ModelList {
    /// One entry per name, in the given order, all stamped with `created`.
    pub fn from_names(names: &[String], created: DateTime<Utc>) -> Self {
        let created_at = created.to_rfc3339_opts(SecondsFormat::Secs, true);
        let data: Vec<ModelEntry> = names
            .iter()
            .map(|name| ModelEntry {
                id: name.clone(),
                kind: "model".to_string(),
                display_name: name.clone(),
                created_at: created_at.clone(),
            })
            .collect();

        Self {
            first_id: data.first().map(|m| m.id.clone()),
            last_id: data.last().map(|m| m.id.clone()),
            data,
            has_more: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_list_from_names() {
        let created = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let list = ModelList::from_names(&["haiku".into(), "sonnet".into()], created);

        assert_eq!(list.data.len(), 2);
        assert_eq!(list.first_id.as_deref(), Some("haiku"));
        assert_eq!(list.last_id.as_deref(), Some("sonnet"));
        assert!(!list.has_more);
        assert_eq!(list.data[1].kind, "model");
        assert_eq!(list.data[1].created_at, "2026-01-02T03:04:05Z");
    }

    #[test]
    fn test_empty_list_omits_ids() {
        let list = ModelList::from_names(&[], Utc::now());
        let json = serde_json::to_value(&list).unwrap();
        assert!(json.get("first_id").is_none());
        assert!(json.get("last_id").is_none());
        assert_eq!(json["has_more"], false);
        assert_eq!(json["data"], serde_json::json!([]));
    }
}
