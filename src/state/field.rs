use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::state::data_model::{Row, RowId};
use crate::state::error::{AccessorError, FieldPathError};

/// Diff keys of virtual fields carry this prefix, which no path may start with.
pub const ACCESSOR_KEY_PREFIX: char = '@';

/// A dot-delimited address into a row, split into segments once at parse time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self, FieldPathError> {
        if path.is_empty() {
            return Err(FieldPathError::Empty);
        }
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(FieldPathError::EmptySegment(path.to_string()));
        }
        if path.starts_with(ACCESSOR_KEY_PREFIX) {
            return Err(FieldPathError::Reserved(path.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Reads the addressed value; a missing intermediate or leaf reads as `None`.
    pub fn get<'a>(&self, row: &'a Row) -> Option<&'a Value> {
        let (first, rest) = self.segments.split_first()?;
        let mut current = row.get(first)?;
        for segment in rest {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Writes `value` at the path, creating intermediate objects as needed.
    /// A non-object intermediate is replaced by an object.
    pub fn set(&self, row: &mut Row, value: Value) {
        let Some((last, parents)) = self.segments.split_last() else {
            return;
        };
        let Some((first, middle)) = parents.split_first() else {
            row.insert(last.clone(), value);
            return;
        };

        let mut current = row
            .entry(first.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        for segment in middle {
            current = descend(current, segment);
        }
        match current {
            Value::Array(items) => {
                if let Some(slot) = last.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                    *slot = value;
                }
            }
            other => {
                if !other.is_object() {
                    *other = Value::Object(Map::new());
                }
                if let Value::Object(map) = other {
                    map.insert(last.clone(), value);
                }
            }
        }
    }

    /// Deletes the addressed leaf and then any parent object left empty, which
    /// undoes the intermediates `set` creates. Array slots are never removed.
    pub fn remove(&self, row: &mut Row) -> Option<Value> {
        let (first, rest) = self.segments.split_first()?;
        if rest.is_empty() {
            return row.remove(first);
        }
        let parent = row.get_mut(first)?;
        let removed = remove_in(parent, rest);
        if removed.is_some() && is_empty_object(parent) {
            row.remove(first);
        }
        removed
    }
}

fn remove_in(value: &mut Value, segments: &[String]) -> Option<Value> {
    let (first, rest) = segments.split_first()?;
    let Value::Object(map) = value else {
        return None;
    };
    if rest.is_empty() {
        return map.remove(first);
    }
    let child = map.get_mut(first)?;
    let removed = remove_in(child, rest);
    if removed.is_some() && is_empty_object(child) {
        map.remove(first);
    }
    removed
}

fn is_empty_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}

fn descend<'a>(value: &'a mut Value, segment: &str) -> &'a mut Value {
    let index = match value {
        Value::Array(items) => segment.parse::<usize>().ok().filter(|i| *i < items.len()),
        _ => None,
    };
    if index.is_none() && !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match (value, index) {
        (Value::Array(items), Some(idx)) => &mut items[idx],
        (Value::Object(map), _) => map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new())),
        _ => unreachable!("non-indexable intermediates are coerced to objects"),
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl std::str::FromStr for FieldPath {
    type Err = FieldPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

pub type Getter = dyn Fn(&Row) -> Result<Value, AccessorError> + Send + Sync;
pub type Setter = dyn Fn(&mut Row, &Value) -> Result<(), AccessorError> + Send + Sync;

/// A virtual field whose displayed value is assembled from other row data.
/// The setter writes the natural representation; the getter reads it back.
#[derive(Clone)]
pub struct CustomAccessor {
    name: String,
    get: Arc<Getter>,
    set: Arc<Setter>,
}

impl CustomAccessor {
    pub fn new<G, S>(name: impl Into<String>, get: G, set: S) -> Self
    where
        G: Fn(&Row) -> Result<Value, AccessorError> + Send + Sync + 'static,
        S: Fn(&mut Row, &Value) -> Result<(), AccessorError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, row: &Row) -> Result<Value, AccessorError> {
        (self.get)(row)
    }

    pub fn set(&self, row: &mut Row, value: &Value) -> Result<(), AccessorError> {
        (self.set)(row, value)
    }
}

impl fmt::Debug for CustomAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomAccessor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for CustomAccessor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// An editable cell target: a literal path or a named virtual field.
#[derive(Clone, Debug, PartialEq)]
pub enum Field {
    Path(FieldPath),
    Accessor(CustomAccessor),
}

impl Field {
    pub fn path(path: &str) -> Result<Self, FieldPathError> {
        FieldPath::parse(path).map(Self::Path)
    }

    /// The key this field is tracked under in a row diff.
    pub fn key(&self) -> String {
        match self {
            Self::Path(path) => path.to_string(),
            Self::Accessor(accessor) => format!("{ACCESSOR_KEY_PREFIX}{}", accessor.name()),
        }
    }

    /// Display read: a missing path reads as `null`.
    pub fn read(&self, row: &Row) -> Result<Value, AccessorError> {
        match self {
            Self::Path(path) => Ok(path.get(row).cloned().unwrap_or(Value::Null)),
            Self::Accessor(accessor) => accessor.get(row),
        }
    }

    pub fn write(&self, row: &mut Row, value: &Value) -> Result<(), AccessorError> {
        match self {
            Self::Path(path) => {
                path.set(row, value.clone());
                Ok(())
            }
            Self::Accessor(accessor) => accessor.set(row, value),
        }
    }

    /// Like `read`, but a missing path is `None` rather than `null`.
    pub fn lookup(&self, row: &Row) -> Result<Option<Value>, AccessorError> {
        match self {
            Self::Path(path) => Ok(path.get(row).cloned()),
            Self::Accessor(accessor) => accessor.get(row).map(Some),
        }
    }

    /// Writes `value`, or removes the path when `value` is `None`. Virtual
    /// fields always hold a value, so clearing one is a no-op.
    pub fn assign(&self, row: &mut Row, value: Option<&Value>) -> Result<(), AccessorError> {
        match (self, value) {
            (_, Some(value)) => self.write(row, value),
            (Self::Path(path), None) => {
                path.remove(row);
                Ok(())
            }
            (Self::Accessor(_), None) => Ok(()),
        }
    }
}

/// A single cell-level change notification from the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct CellChange {
    pub row_id: RowId,
    pub field: Field,
    pub new_value: Value,
    /// `None` when the field did not exist before the edit.
    pub old_value: Option<Value>,
}

impl CellChange {
    pub fn new(
        row_id: impl Into<RowId>,
        field: Field,
        new_value: Value,
        old_value: impl Into<Option<Value>>,
    ) -> Self {
        Self {
            row_id: row_id.into(),
            field,
            new_value,
            old_value: old_value.into(),
        }
    }
}
