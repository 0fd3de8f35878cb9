// File: ./src/model/adapter.rs
// Handles conversion between backend JSON payloads and the local model
use crate::model::item::{Alert, Checklist, ChecklistItem, ItemStatus, default_category};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value, json};

/// Ids arrive as numbers from SQL-backed servers and as strings from the mock one.
pub fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Flask's jsonify renders datetimes as RFC 2822 ("Mon, 01 Jan 2024 10:00:00 GMT")
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // isoformat() of a naive UTC datetime
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Accepts both a bare JSON array and `{ "<key>": [...] }`.
pub fn unwrap_list<'a>(body: &'a Value, key: &str) -> &'a [Value] {
    match body {
        Value::Array(list) => list,
        Value::Object(map) => map
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

/// Accepts both a bare object and `{ "<key>": {...} }`.
pub fn unwrap_object<'a>(body: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    let map = body.as_object()?;
    match map.get(key) {
        Some(Value::Object(inner)) => Some(inner),
        _ => Some(map),
    }
}

/// The server-assigned id of a freshly created resource.
///
/// Seen shapes: `{"item": {"id": 7}}`, `{"item_id": 7}`, `{"checklist_id": 7}`
/// and a bare `{"id": 7}`.
pub fn created_id(body: &Value, wrapper: &str, id_key: &str) -> Option<String> {
    if let Some(id) = body
        .get(wrapper)
        .and_then(|inner| inner.get("id"))
        .and_then(id_from_value)
    {
        return Some(id);
    }
    body.get(id_key)
        .and_then(id_from_value)
        .or_else(|| body.get("id").and_then(id_from_value))
}

/// Error message carried by a non-success response, if any.
pub fn error_message(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| map.get(*k).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn assignee_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Object(obj) => obj
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| obj.get("id").and_then(id_from_value)),
        other => id_from_value(other),
    }
}

impl ChecklistItem {
    pub fn from_api(value: &Value, checklist_id: Option<&str>) -> Result<Self, String> {
        let map = value.as_object().ok_or("Item is not an object")?;
        let id = map
            .get("id")
            .and_then(id_from_value)
            .ok_or("Item without id")?;

        let status = match map.get("status").and_then(Value::as_str) {
            Some(s) => ItemStatus::parse(s),
            // Older servers only track a checkbox
            None => match map.get("checked").and_then(Value::as_bool) {
                Some(true) => ItemStatus::Packed,
                _ => ItemStatus::ToPack,
            },
        };

        Ok(ChecklistItem {
            id,
            name: text_field(map, &["title", "text", "name"]).unwrap_or_else(|| "Unnamed Item".to_string()),
            description: text_field(map, &["description"]).unwrap_or_default(),
            category: text_field(map, &["category"]).unwrap_or_else(default_category),
            assignee: map
                .get("assigned_to")
                .or_else(|| map.get("assignedTo"))
                .and_then(assignee_from_value),
            status,
            checklist_id: map
                .get("checklist_id")
                .and_then(id_from_value)
                .or_else(|| checklist_id.map(str::to_string)),
        })
    }

    /// Body for `POST /api/checklist-items`.
    ///
    /// Both `title` and `text` are sent since server variants disagree on the name.
    pub fn to_api_create(&self) -> Value {
        let mut body = json!({
            "title": self.name,
            "text": self.name,
            "status": self.status.as_str(),
            "description": self.description,
            "category": self.category,
        });
        if let Some(cid) = &self.checklist_id {
            body["checklist_id"] = cid
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::from(cid.as_str()));
        }
        if let Some(who) = &self.assignee {
            body["assigned_to"] = Value::from(who.as_str());
        }
        body
    }

    /// Body for `PUT /api/checklist-items/{id}` carrying only what changed.
    pub fn to_api_diff(&self, before: &ChecklistItem) -> Value {
        let mut body = Map::new();
        if self.name != before.name {
            body.insert("title".into(), Value::from(self.name.as_str()));
        }
        if self.status != before.status {
            body.insert("status".into(), Value::from(self.status.as_str()));
        }
        if self.description != before.description {
            body.insert("description".into(), Value::from(self.description.as_str()));
        }
        if self.category != before.category {
            body.insert("category".into(), Value::from(self.category.as_str()));
        }
        if self.assignee != before.assignee {
            body.insert(
                "assigned_to".into(),
                self.assignee.as_deref().map(Value::from).unwrap_or(Value::Null),
            );
        }
        Value::Object(body)
    }
}

impl Checklist {
    pub fn from_api(value: &Value) -> Result<Self, String> {
        let map = value.as_object().ok_or("Checklist is not an object")?;
        let id = map
            .get("id")
            .and_then(id_from_value)
            .ok_or("Checklist without id")?;
        Ok(Checklist {
            title: text_field(map, &["title", "name"]).unwrap_or_else(|| format!("Checklist {}", id)),
            id,
            created_at: map.get("created_at").and_then(parse_timestamp),
        })
    }
}

impl Alert {
    pub fn from_api(value: &Value) -> Result<Self, String> {
        let map = value.as_object().ok_or("Alert is not an object")?;
        let id = map
            .get("id")
            .and_then(id_from_value)
            .ok_or("Alert without id")?;
        let checklist = match map.get("checklist") {
            Some(Value::Object(c)) => text_field(c, &["name", "title"]),
            _ => map.get("checklist_id").and_then(id_from_value),
        };
        Ok(Alert {
            id,
            kind: text_field(map, &["type", "kind"]).unwrap_or_else(|| "update".to_string()),
            message: text_field(map, &["message"]).unwrap_or_default(),
            read: map.get("read").and_then(Value::as_bool).unwrap_or(false),
            created_at: map.get("created_at").and_then(parse_timestamp),
            checklist,
        })
    }
}
