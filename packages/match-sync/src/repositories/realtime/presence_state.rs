use std::collections::BTreeMap;

use serde_json::Value;

use crate::models::match_record::parse_timestamp;
use crate::models::presence::PresenceRecord;

#[derive(Debug, Clone, PartialEq)]
struct Meta {
    phx_ref: Option<String>,
    record: PresenceRecord,
}

/// Announced clients on one presence channel, rebuilt from `presence_state`
/// and `presence_diff` frames.
#[derive(Debug, Clone, Default)]
pub struct PresenceState {
    members: BTreeMap<String, Vec<Meta>>,
}

impl PresenceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full state: replaces everything known so far.
    pub fn apply_state(&mut self, payload: &Value) {
        self.members.clear();
        if let Some(entries) = payload.as_object() {
            for (key, entry) in entries {
                let metas = parse_metas(key, entry);
                if !metas.is_empty() {
                    self.members.insert(key.clone(), metas);
                }
            }
        }
    }

    /// Incremental update: joins first, then leaves.
    pub fn apply_diff(&mut self, payload: &Value) {
        if let Some(joins) = payload.get("joins").and_then(Value::as_object) {
            for (key, entry) in joins {
                let current = self.members.entry(key.clone()).or_default();
                for meta in parse_metas(key, entry) {
                    let known = meta.phx_ref.is_some()
                        && current.iter().any(|m| m.phx_ref == meta.phx_ref);
                    if !known {
                        current.push(meta);
                    }
                }
            }
        }

        if let Some(leaves) = payload.get("leaves").and_then(Value::as_object) {
            for (key, entry) in leaves {
                let leaving: Vec<Option<String>> = parse_metas(key, entry)
                    .into_iter()
                    .map(|m| m.phx_ref)
                    .collect();
                if let Some(current) = self.members.get_mut(key) {
                    current.retain(|m| !leaving.contains(&m.phx_ref));
                    if current.is_empty() {
                        self.members.remove(key);
                    }
                }
            }
        }
    }

    pub fn records(&self) -> Vec<PresenceRecord> {
        self.members
            .values()
            .flatten()
            .map(|meta| meta.record.clone())
            .collect()
    }
}

fn parse_metas(key: &str, entry: &Value) -> Vec<Meta> {
    entry
        .get("metas")
        .and_then(Value::as_array)
        .map(|metas| {
            metas
                .iter()
                .map(|meta| Meta {
                    phx_ref: meta
                        .get("phx_ref")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    record: PresenceRecord {
                        user_id: meta
                            .get("user_id")
                            .and_then(Value::as_str)
                            .unwrap_or(key)
                            .to_string(),
                        online_at: meta
                            .get("online_at")
                            .and_then(Value::as_str)
                            .and_then(parse_timestamp),
                    },
                })
                .collect()
        })
        .unwrap_or_default()
}
