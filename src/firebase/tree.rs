//! Local mirror of the subscribed `machines` subtree.
//!
//! The REST stream only reports raw writes (`put`/`patch` at some path). The
//! mirror applies them and reports which direct children were added or
//! changed, the same `child_added` / `child_changed` view the Firebase SDKs
//! give. Removed children are dropped silently.

use serde_json::{Map, Value};

use crate::sync::event::ChangeEvent;

#[derive(Debug, Default)]
pub struct MachineTree {
    children: Map<String, Value>,
}

impl MachineTree {
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    #[must_use]
    pub fn get(&self, machine_id: &str) -> Option<&Value> {
        self.children.get(machine_id)
    }

    /// Apply a `put` event.
    pub fn apply_put(&mut self, path: &str, data: Value) -> Vec<ChangeEvent> {
        let segments = split_path(path);
        let data = normalize(data);

        match segments.split_first() {
            None => self.replace_all(data),
            Some((key, rest)) => self
                .update_child(key, |child| set_at(child, rest, data))
                .into_iter()
                .collect(),
        }
    }

    /// Apply a `patch` event. Each key of `data` is written below `path`.
    pub fn apply_patch(&mut self, path: &str, data: Value) -> Vec<ChangeEvent> {
        let Value::Object(entries) = normalize(data) else {
            return Vec::new();
        };
        let segments = split_path(path);

        match segments.split_first() {
            None => entries
                .into_iter()
                .filter_map(|(key, value)| self.update_child(&key, |child| *child = value))
                .collect(),
            Some((key, rest)) => self
                .update_child(key, |child| {
                    for (field, value) in entries {
                        let mut target: Vec<&str> = rest.to_vec();
                        target.push(&field);
                        set_at(child, &target, value);
                    }
                })
                .into_iter()
                .collect(),
        }
    }

    /// A `put` at the root: full snapshot, diffed against what we had.
    fn replace_all(&mut self, data: Value) -> Vec<ChangeEvent> {
        let incoming = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let mut events = Vec::new();
        let mut next = Map::new();

        for (key, mut value) in incoming {
            prune(&mut value);
            if is_empty(&value) {
                continue;
            }

            match self.children.get(&key) {
                None => events.push(ChangeEvent::added(key.clone(), &value)),
                Some(previous) if *previous != value => {
                    events.push(ChangeEvent::changed(key.clone(), &value));
                }
                Some(_) => {}
            }
            next.insert(key, value);
        }

        self.children = next;
        events
    }

    fn update_child(
        &mut self,
        key: &str,
        mutate: impl FnOnce(&mut Value),
    ) -> Option<ChangeEvent> {
        let before = self.children.get(key).cloned();
        let mut after = before.clone().unwrap_or(Value::Null);
        mutate(&mut after);
        prune(&mut after);

        if is_empty(&after) {
            self.children.remove(key);
            return None;
        }

        let event = match &before {
            None => ChangeEvent::added(key, &after),
            Some(previous) if *previous == after => return None,
            Some(_) => ChangeEvent::changed(key, &after),
        };
        self.children.insert(key.to_string(), after);
        Some(event)
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Write `value` at `segments` below `target`, creating objects on the way.
fn set_at(target: &mut Value, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    if let Value::Object(map) = target {
        let slot = map.entry((*head).to_string()).or_insert(Value::Null);
        set_at(slot, rest, value);
        if is_empty(slot) {
            map.remove(*head);
        }
    }
}

/// Firebase has no empty objects: a null leaf deletes it, and a parent with no
/// children left disappears too.
fn prune(value: &mut Value) {
    if let Value::Object(map) = value {
        for child in map.values_mut() {
            prune(child);
        }
        map.retain(|_, child| !is_empty(child));
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Firebase serializes objects with small integer keys as arrays; turn them
/// back into keyed objects.
fn normalize(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Object(
            items
                .into_iter()
                .enumerate()
                .filter(|(_, item)| !item.is_null())
                .map(|(index, item)| (index.to_string(), normalize(item)))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| (key, normalize(item)))
                .collect(),
        ),
        other => other,
    }
}
