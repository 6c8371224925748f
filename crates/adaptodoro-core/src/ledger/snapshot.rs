//! Durable snapshot format of the progress ledger.
//!
//! ```text
//! {
//!   "history": [ { "reason", "result", "datetime",
//!                  "plannedDuration", "actualDuration", "expGained" } ],
//!   "totalWorkTime": int,
//!   "totalExp": int,
//!   "level": int
//! }
//! ```
//!
//! Restoring is lenient: a broken field falls back to its default without
//! discarding the rest of the record. Only an unparsable or non-object
//! record yields an empty ledger.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::progress::{HistoryEntry, ProgressLedger};

/// Key that records from the first web release kept their history under.
const LEGACY_HISTORY_KEY: &str = "reasonHistory";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub history: Vec<HistoryEntry>,
    pub total_work_time: u64,
    pub total_exp: u64,
    pub level: u64,
}

impl From<&ProgressLedger> for LedgerSnapshot {
    fn from(ledger: &ProgressLedger) -> Self {
        Self {
            history: ledger.history().to_vec(),
            total_work_time: ledger.total_work_minutes(),
            total_exp: ledger.total_exp(),
            level: ledger.level(),
        }
    }
}

/// Outcome of a lenient restore.
#[derive(Debug, Clone)]
pub struct Restored {
    pub ledger: ProgressLedger,
    /// One line per field that had to be defaulted or dropped.
    pub issues: Vec<String>,
}

impl Restored {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Serialize the full ledger into one JSON record.
pub fn encode(ledger: &ProgressLedger) -> Result<String, serde_json::Error> {
    serde_json::to_string(&LedgerSnapshot::from(ledger))
}

/// Rebuild a ledger from a stored record, recovering what can be recovered.
pub fn decode(raw: &str) -> Restored {
    let mut issues = Vec::new();
    let root = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            issues.push(format!("snapshot is not an object (got {})", type_name(&other)));
            return Restored {
                ledger: ProgressLedger::new(),
                issues,
            };
        }
        Err(e) => {
            issues.push(format!("snapshot is not valid JSON: {e}"));
            return Restored {
                ledger: ProgressLedger::new(),
                issues,
            };
        }
    };

    let stored_history = match (root.get("history"), root.get(LEGACY_HISTORY_KEY)) {
        (Some(items), _) => Some(("history", items)),
        (None, Some(items)) => {
            issues.push(format!("history read from legacy key {LEGACY_HISTORY_KEY}"));
            Some((LEGACY_HISTORY_KEY, items))
        }
        (None, None) => {
            issues.push("history missing".to_string());
            None
        }
    };
    let history = match stored_history {
        None => Vec::new(),
        Some((_, Value::Array(items))) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match item {
                Value::Object(fields) => Some(read_entry(i, fields, &mut issues)),
                other => {
                    issues.push(format!("history[{i}] dropped: {}", type_name(other)));
                    None
                }
            })
            .collect(),
        Some((key, other)) => {
            issues.push(format!("{key} is {}, expected array", type_name(other)));
            Vec::new()
        }
    };
    let total_work_time = read_u64(&root, "totalWorkTime", "totalWorkTime", &mut issues);
    let total_exp = read_u64(&root, "totalExp", "totalExp", &mut issues);

    Restored {
        ledger: ProgressLedger::from_parts(history, total_work_time, total_exp),
        issues,
    }
}

fn read_entry(index: usize, fields: &Map<String, Value>, issues: &mut Vec<String>) -> HistoryEntry {
    let field = |key: &str| format!("history[{index}].{key}");
    HistoryEntry {
        reason: read_string(fields, "reason", &field("reason"), issues),
        result: read_string(fields, "result", &field("result"), issues),
        recorded_at: read_string(fields, "datetime", &field("datetime"), issues),
        planned_minutes: read_u64(fields, "plannedDuration", &field("plannedDuration"), issues),
        actual_minutes: read_u64(fields, "actualDuration", &field("actualDuration"), issues),
        exp_gained: read_u64(fields, "expGained", &field("expGained"), issues),
    }
}

fn read_string(map: &Map<String, Value>, key: &str, path: &str, issues: &mut Vec<String>) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        None => {
            issues.push(format!("{path} missing"));
            String::new()
        }
        Some(other) => {
            issues.push(format!("{path} is {}, expected string", type_name(other)));
            String::new()
        }
    }
}

/// Non-negative integer. Integral floats such as `7.0` are accepted.
fn read_u64(map: &Map<String, Value>, key: &str, path: &str, issues: &mut Vec<String>) -> u64 {
    let value = match map.get(key) {
        Some(v) => v,
        None => {
            issues.push(format!("{path} missing"));
            return 0;
        }
    };
    if let Some(n) = value.as_u64() {
        return n;
    }
    match value.as_f64() {
        Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 => f as u64,
        _ => {
            issues.push(format!("{path} is not a non-negative integer: {value}"));
            0
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
