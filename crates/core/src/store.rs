use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::Status;

const FRAMEWORKS_KEY: &str = "frameworks";
const STATUSES_KEY: &str = "statuses";

/// Recorded statuses for one framework plus any keys the file carried that we do not model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameworkEntry {
    pub statuses: BTreeMap<String, Status>,
    extra: Map<String, Value>,
}

/// In-memory assessment: framework id -> control name -> status.
///
/// Absent controls are implicitly `missing`. Unknown top-level and per-framework keys are
/// carried through `load`/`save` untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusStore {
    frameworks: BTreeMap<String, FrameworkEntry>,
    extra: Map<String, Value>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from persisted JSON bytes.
    ///
    /// Never fails: absent input, unparseable JSON, a non-object document, or a missing
    /// `frameworks` key all produce an empty store.
    pub fn load(bytes: Option<&[u8]>) -> Self {
        let Some(bytes) = bytes else {
            return Self::default();
        };
        let Ok(Value::Object(mut root)) = serde_json::from_slice::<Value>(bytes) else {
            return Self::default();
        };

        let frameworks_value = root.remove(FRAMEWORKS_KEY);
        let mut store = Self {
            frameworks: BTreeMap::new(),
            extra: root,
        };

        let Some(Value::Object(frameworks)) = frameworks_value else {
            return store;
        };

        for (framework, entry) in frameworks {
            store
                .frameworks
                .insert(framework, parse_framework_entry(entry));
        }
        store
    }

    /// Serializes every framework held in memory as pretty-printed JSON.
    pub fn save(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(&self.to_value())
    }

    pub fn to_value(&self) -> Value {
        let mut root = self.extra.clone();
        let frameworks = self
            .frameworks
            .iter()
            .map(|(framework, entry)| {
                let mut object = entry.extra.clone();
                let statuses = entry
                    .statuses
                    .iter()
                    .map(|(control, status)| {
                        (control.clone(), Value::String(status.as_str().to_string()))
                    })
                    .collect::<Map<_, _>>();
                object.insert(STATUSES_KEY.to_string(), Value::Object(statuses));
                (framework.clone(), Value::Object(object))
            })
            .collect::<Map<_, _>>();
        root.insert(FRAMEWORKS_KEY.to_string(), Value::Object(frameworks));
        Value::Object(root)
    }

    pub fn get(&self, framework: &str, control: &str) -> Status {
        self.frameworks
            .get(framework)
            .and_then(|entry| entry.statuses.get(control))
            .copied()
            .unwrap_or_default()
    }

    /// Records a status, normalizing the raw value. Unrecognized values are stored as `missing`.
    pub fn set(&mut self, framework: &str, control: &str, raw_status: &str) -> Status {
        let status = Status::normalize(raw_status);
        self.set_status(framework, control, status);
        status
    }

    pub fn set_status(&mut self, framework: &str, control: &str, status: Status) {
        self.ensure_framework(framework)
            .statuses
            .insert(control.to_string(), status);
    }

    /// Returns the entry for `framework`, creating an empty one if needed.
    pub fn ensure_framework(&mut self, framework: &str) -> &mut FrameworkEntry {
        self.frameworks.entry(framework.to_string()).or_default()
    }

    /// Applies every recorded status of `other` on top of this store.
    pub fn merge(&mut self, other: &StatusStore) {
        for (framework, entry) in &other.frameworks {
            let target = self.ensure_framework(framework);
            for (control, status) in &entry.statuses {
                target.statuses.insert(control.clone(), *status);
            }
        }
    }

    pub fn frameworks(&self) -> impl Iterator<Item = &str> {
        self.frameworks.keys().map(String::as_str)
    }

    pub fn statuses(&self, framework: &str) -> Option<&BTreeMap<String, Status>> {
        self.frameworks.get(framework).map(|entry| &entry.statuses)
    }

    pub fn has_framework(&self, framework: &str) -> bool {
        self.frameworks.contains_key(framework)
    }

    pub fn is_empty(&self) -> bool {
        self.frameworks.is_empty()
    }
}

fn parse_framework_entry(value: Value) -> FrameworkEntry {
    let Value::Object(mut object) = value else {
        return FrameworkEntry::default();
    };

    let statuses = match object.remove(STATUSES_KEY) {
        Some(Value::Object(raw)) => raw
            .into_iter()
            .map(|(control, status)| {
                let status = status.as_str().map(Status::normalize).unwrap_or_default();
                (control, status)
            })
            .collect(),
        _ => BTreeMap::new(),
    };

    FrameworkEntry {
        statuses,
        extra: object,
    }
}
