use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A full page row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PageRecord {
    pub id: i64,
    pub name: String,
    pub content: String,
}

/// Result of looking a page up by name. Absence is a normal outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLookup {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
}

impl PageLookup {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn found(id: i64, raw_content: String) -> Self {
        Self {
            found: true,
            id: Some(id),
            raw_content: Some(raw_content),
        }
    }
}

/// Result of looking a page up by id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageByIdLookup {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl PageByIdLookup {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn into_record(self) -> Option<PageRecord> {
        match (self.found, self.id, self.name, self.content) {
            (true, Some(id), Some(name), Some(content)) => Some(PageRecord { id, name, content }),
            _ => None,
        }
    }
}

impl From<PageRecord> for PageByIdLookup {
    fn from(record: PageRecord) -> Self {
        Self {
            found: true,
            id: Some(record.id),
            name: Some(record.name),
            content: Some(record.content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_lookup_serializes_only_found_flag() {
        let value = serde_json::to_value(PageLookup::missing()).unwrap();
        assert_eq!(value, serde_json::json!({ "found": false }));
    }

    #[test]
    fn found_lookup_uses_camel_case() {
        let value = serde_json::to_value(PageLookup::found(3, "# Hi".into())).unwrap();
        assert_eq!(value["rawContent"], "# Hi");
        assert_eq!(value["id"], 3);
    }

    #[test]
    fn by_id_lookup_round_trips_into_record() {
        let record = PageRecord { id: 7, name: "Home".into(), content: "x".into() };
        let lookup = PageByIdLookup::from(record.clone());
        assert_eq!(lookup.into_record(), Some(record));
        assert_eq!(PageByIdLookup::missing().into_record(), None);
    }
}
