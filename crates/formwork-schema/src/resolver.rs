//! `$ref` reference resolution against a definition dictionary.
//!
//! Refs use the form `#/definition/<dot.path>`. Resolution is recursive (refs
//! may chain), memoized per call, and cycle-safe: the first node revisited
//! while still being resolved is returned raw, so callers must tolerate
//! receiving either a fully resolved value or a `{$ref}` stub.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::paths::extract;

const REF_KEY: &str = "$ref";
const REF_PREFIX: &str = "#/definition/";

/// Integer identity for one addressable definition entry.
///
/// Definition paths are the only way a JSON tree can reference itself, so
/// interning each addressable path at table build time gives cycle detection
/// plain integer keys instead of object identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefId(usize);

/// The definition dictionary with every addressable dot-path interned.
#[derive(Debug, Clone, Default)]
pub struct DefinitionTable {
    root: Value,
    index: HashMap<String, DefId>,
}

impl DefinitionTable {
    /// Build a table from the raw `definition` value. Anything that is not an
    /// object yields an empty table, which makes resolution a no-op.
    pub fn new(definition: Value) -> Self {
        let mut index = HashMap::new();
        if let Value::Object(map) = &definition {
            let mut prefix = String::new();
            index_paths(map, &mut prefix, &mut index);
        }
        Self {
            root: definition,
            index,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Look up a dot-path, returning its interned id and value. Absent paths
    /// and explicit nulls are both misses.
    fn lookup(&self, path: &str) -> Option<(DefId, &Value)> {
        let id = *self.index.get(path)?;
        let value = extract(&self.root, path)?;
        if value.is_null() {
            return None;
        }
        Some((id, value))
    }
}

fn index_paths(map: &serde_json::Map<String, Value>, prefix: &mut String, index: &mut HashMap<String, DefId>) {
    for (key, value) in map {
        let saved = prefix.len();
        if !prefix.is_empty() {
            prefix.push('.');
        }
        prefix.push_str(key);

        let id = DefId(index.len());
        index.insert(prefix.clone(), id);
        if let Value::Object(inner) = value {
            index_paths(inner, prefix, index);
        }
        prefix.truncate(saved);
    }
}

/// Per-call resolution state. Never shared across calls: concurrent
/// resolutions of unrelated trees each carry their own session.
#[derive(Default)]
struct Session {
    cache: HashMap<DefId, Value>,
    visiting: HashSet<DefId>,
}

/// Resolve every `$ref` in `node` against `table`, returning a new tree.
///
/// Fast path: an empty table or a scalar node is returned unchanged.
/// Unresolvable refs come back as the original `{$ref}` stub, which callers
/// treat as "no source".
pub fn resolve_refs(node: &Value, table: &DefinitionTable) -> Value {
    if table.is_empty() {
        return node.clone();
    }
    let mut session = Session::default();
    resolve(node, table, &mut session)
}

fn resolve(node: &Value, table: &DefinitionTable, session: &mut Session) -> Value {
    match node {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve(item, table, session))
                .collect(),
        ),
        Value::Object(map) => {
            if let Some(Value::String(ref_str)) = map.get(REF_KEY) {
                return resolve_ref(ref_str, node, table, session);
            }
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), resolve(value, table, session));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn resolve_ref(
    ref_str: &str,
    original: &Value,
    table: &DefinitionTable,
    session: &mut Session,
) -> Value {
    let path = ref_str.strip_prefix(REF_PREFIX).unwrap_or(ref_str);

    let Some((id, target)) = table.lookup(path) else {
        debug!(reference = ref_str, "unresolved $ref, keeping stub");
        return original.clone();
    };

    // Revisiting a definition that is still mid-resolution is a cycle: hand
    // back the raw target without recursing further.
    if session.visiting.contains(&id) {
        debug!(reference = ref_str, "cyclic $ref, returning raw target");
        return target.clone();
    }
    if let Some(cached) = session.cache.get(&id) {
        return cached.clone();
    }

    session.visiting.insert(id);
    let target = target.clone();
    let resolved = resolve(&target, table, session);
    session.visiting.remove(&id);
    session.cache.insert(id, resolved.clone());
    resolved
}
