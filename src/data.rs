use crate::error::{PlotError, Result};
use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value as Json;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

// =============================================================================
// Values
// =============================================================================

/// A single nullable cell. NaN is a valid numeric value that stats treat as missing.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Num(f64),
    Str(String),
    Bool(bool),
}

impl Value {
    pub fn from_json(value: &Json) -> Option<Self> {
        match value {
            Json::Null => Some(Value::Null),
            Json::Number(n) => n.as_f64().map(Value::Num),
            Json::String(s) => Some(Value::Str(s.clone())),
            Json::Bool(b) => Some(Value::Bool(*b)),
            _ => None,
        }
    }

    /// Numeric view; NaN counts as missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Num(n) if !n.is_nan() => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Num(n) => n.is_nan(),
            _ => false,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Num(_) => 0,
            Value::Bool(_) => 1,
            Value::Str(_) => 2,
            Value::Null => 3,
        }
    }

    /// Natural ordering used for sorted discrete domains: numbers, then booleans,
    /// then strings, with missing values last.
    pub fn cmp_natural(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Num(a), Value::Num(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.total_cmp(b),
            },
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Num(a), Value::Num(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Num(n) => {
                let bits = if n.is_nan() {
                    f64::NAN.to_bits()
                } else if *n == 0.0 {
                    0u64
                } else {
                    n.to_bits()
                };
                bits.hash(state);
            }
            Value::Str(s) => s.hash(state),
            Value::Bool(b) => b.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Num(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Value::Num(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Option<f64>> for Value {
    fn from(n: Option<f64>) -> Self {
        n.map(Value::Num).unwrap_or(Value::Null)
    }
}

// =============================================================================
// Variables
// =============================================================================

/// Semantic kind of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VarKind {
    Continuous,
    Discrete,
    DateTime,
    Date,
    Time,
}

impl VarKind {
    pub fn is_discrete(&self) -> bool {
        matches!(self, VarKind::Discrete)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, VarKind::DateTime | VarKind::Date | VarKind::Time)
    }
}

/// Where a variable came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VarSource {
    Origin,
    Stat,
    Transform,
}

/// Returns true for names of the form `..name..`
pub fn is_stat_var(name: &str) -> bool {
    name.len() > 4 && name.starts_with("..") && name.ends_with("..")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: VarKind,
    pub source: VarSource,
    pub format: Option<String>,
    pub values: Vec<Value>,
}

impl Column {
    /// Origin column with kind inferred from the values
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        let kind = infer_kind(&values);
        let name = name.into();
        let source = if is_stat_var(&name) { VarSource::Stat } else { VarSource::Origin };
        Self { name, kind, source, format: None, values }
    }

    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        let mut col = Self::new(name, values.into_iter().map(Value::Num).collect());
        col.kind = VarKind::Continuous;
        col
    }

    pub fn discrete(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(name, values).with_kind(VarKind::Discrete)
    }

    pub fn with_kind(mut self, kind: VarKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_source(mut self, source: VarSource) -> Self {
        self.source = source;
        self
    }

    pub fn renamed(&self, name: impl Into<String>) -> Self {
        let mut col = self.clone();
        col.name = name.into();
        col
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_numeric(&self) -> bool {
        self.values
            .iter()
            .all(|v| matches!(v, Value::Num(_) | Value::Null))
    }
}

fn infer_kind(values: &[Value]) -> VarKind {
    let numeric = values
        .iter()
        .all(|v| matches!(v, Value::Num(_) | Value::Null));
    if numeric {
        VarKind::Continuous
    } else {
        VarKind::Discrete
    }
}

// =============================================================================
// DataFrame
// =============================================================================

/// Immutable columnar table. All columns have the same length; every
/// transformation returns a new frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataFrame {
    columns: IndexMap<String, Column>,
    row_count: usize,
}

impl DataFrame {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let mut frame = DataFrame::empty();
        for column in columns {
            frame.push(column)?;
        }
        Ok(frame)
    }

    fn push(&mut self, column: Column) -> Result<()> {
        if self.columns.is_empty() {
            self.row_count = column.len();
        } else if column.len() != self.row_count {
            return Err(PlotError::Frame(format!(
                "Variable '{}' has {} values, expected {}",
                column.name,
                column.len(),
                self.row_count
            )));
        }
        self.columns.insert(column.name.clone(), column);
        Ok(())
    }

    /// Build a frame from JSON: either an object of column arrays or an
    /// array of row objects.
    pub fn from_json(value: &Json) -> Result<Self> {
        match value {
            Json::Object(map) => {
                let mut columns = Vec::with_capacity(map.len());
                for (name, series) in map {
                    let items = series.as_array().ok_or_else(|| {
                        PlotError::Frame(format!("Variable '{}' must be a list of values", name))
                    })?;
                    columns.push(Column::new(name.clone(), json_values(name, items)?));
                }
                Self::from_columns(columns)
            }
            Json::Array(rows) => {
                let mut names: Vec<String> = Vec::new();
                for row in rows {
                    let obj = row.as_object().ok_or_else(|| {
                        PlotError::Frame("Items in array must be objects".to_string())
                    })?;
                    for key in obj.keys() {
                        if !names.contains(key) {
                            names.push(key.clone());
                        }
                    }
                }
                let mut columns = Vec::with_capacity(names.len());
                for name in &names {
                    let items: Vec<Json> = rows
                        .iter()
                        .map(|row| row.get(name).cloned().unwrap_or(Json::Null))
                        .collect();
                    columns.push(Column::new(name.clone(), json_values(name, &items)?));
                }
                Self::from_columns(columns)
            }
            Json::Null => Ok(Self::empty()),
            _ => Err(PlotError::Frame(
                "Data must be a map of variable lists or a list of records".to_string(),
            )),
        }
    }

    /// Read a CSV table. Columns whose non-empty cells all parse as numbers
    /// become continuous; everything else stays textual.
    pub fn from_csv<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| PlotError::Frame(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in rdr.records() {
            let record = record
                .map_err(|e| PlotError::Frame(format!("Failed to read CSV record: {}", e)))?;
            for (idx, cell) in cells.iter_mut().enumerate() {
                cell.push(record.get(idx).unwrap_or("").trim().to_string());
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| {
                let numeric = raw.iter().all(|s| s.is_empty() || s.parse::<f64>().is_ok());
                let values = raw
                    .into_iter()
                    .map(|s| {
                        if s.is_empty() {
                            Value::Null
                        } else if numeric {
                            s.parse::<f64>().map(Value::Num).unwrap_or(Value::Null)
                        } else {
                            Value::Str(s)
                        }
                    })
                    .collect();
                Column::new(name, values)
            })
            .collect();
        Self::from_columns(columns)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// A frame without variables
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn has(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn get(&self, name: &str) -> Result<&Column> {
        self.columns.get(name).ok_or_else(|| {
            PlotError::Frame(format!(
                "Undefined variable: '{}'. Variables in data frame: [{}]",
                name,
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    pub fn kind(&self, name: &str) -> Option<VarKind> {
        self.columns.get(name).map(|c| c.kind)
    }

    /// Numeric series; non-numeric and NaN cells become `None`.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        Ok(self.get(name)?.values.iter().map(Value::as_f64).collect())
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        self.columns.get(name).map(Column::is_numeric).unwrap_or(false)
    }

    /// Finite (min, max) of a numeric variable
    pub fn range(&self, name: &str) -> Option<(f64, f64)> {
        let col = self.columns.get(name)?;
        let mut range: Option<(f64, f64)> = None;
        for v in col.values.iter().filter_map(Value::as_f64).filter(|v| v.is_finite()) {
            range = Some(match range {
                None => (v, v),
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
            });
        }
        range
    }

    /// Distinct non-null values in order of first appearance
    pub fn distinct_values(&self, name: &str) -> Vec<Value> {
        match self.columns.get(name) {
            Some(col) => distinct(&col.values),
            None => Vec::new(),
        }
    }

    pub fn with_column(&self, column: Column) -> Result<DataFrame> {
        let mut frame = self.clone();
        if frame.columns.contains_key(&column.name) {
            if column.len() != frame.row_count {
                return Err(PlotError::Frame(format!(
                    "Variable '{}' has {} values, expected {}",
                    column.name,
                    column.len(),
                    frame.row_count
                )));
            }
            frame.columns.insert(column.name.clone(), column);
            return Ok(frame);
        }
        frame.push(column)?;
        Ok(frame)
    }

    pub fn with_kind(&self, name: &str, kind: VarKind) -> Result<DataFrame> {
        let column = self.get(name)?.clone().with_kind(kind);
        self.with_column(column)
    }

    pub fn with_format(&self, name: &str, format: &str) -> Result<DataFrame> {
        let mut column = self.get(name)?.clone();
        column.format = Some(format.to_string());
        self.with_column(column)
    }

    pub fn select_rows(&self, indices: &[usize]) -> DataFrame {
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| {
                let values = indices
                    .iter()
                    .map(|&i| col.values.get(i).cloned().unwrap_or(Value::Null))
                    .collect();
                (name.clone(), Column { values, ..col.clone() })
            })
            .collect();
        DataFrame { columns, row_count: indices.len() }
    }

    /// Keep only the named variables, in frame order
    pub fn select_columns<S: AsRef<str>>(&self, names: &[S]) -> DataFrame {
        let keep: Vec<&str> = names.iter().map(|s| s.as_ref()).collect();
        let columns: IndexMap<String, Column> = self
            .columns
            .iter()
            .filter(|(name, _)| keep.contains(&name.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let row_count = if columns.is_empty() { 0 } else { self.row_count };
        DataFrame { columns, row_count }
    }

    pub fn drop_columns<S: AsRef<str>>(&self, names: &[S]) -> DataFrame {
        let drop: Vec<&str> = names.iter().map(|s| s.as_ref()).collect();
        let keep: Vec<String> = self
            .names()
            .filter(|n| !drop.contains(n))
            .map(str::to_string)
            .collect();
        self.select_columns(&keep)
    }

    /// Columns of `other` replace same-named columns of `self` and extend it otherwise.
    pub fn append_replace(&self, other: &DataFrame) -> Result<DataFrame> {
        if self.is_empty() {
            return Ok(other.clone());
        }
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.row_count != other.row_count {
            return Err(PlotError::Frame(format!(
                "Can't merge data frames with {} and {} rows",
                self.row_count, other.row_count
            )));
        }
        let mut frame = self.clone();
        for col in other.columns.values() {
            frame = frame.with_column(col.clone())?;
        }
        Ok(frame)
    }

    /// Stack frames row-wise. Columns are the union in first-seen order and
    /// missing cells are null.
    pub fn concat(frames: &[DataFrame]) -> DataFrame {
        let mut templates: IndexMap<String, Column> = IndexMap::new();
        for frame in frames {
            for col in frame.columns.values() {
                templates.entry(col.name.clone()).or_insert_with(|| Column {
                    values: Vec::new(),
                    ..col.clone()
                });
            }
        }
        let row_count: usize = frames.iter().map(|f| f.row_count).sum();
        for (name, template) in templates.iter_mut() {
            for frame in frames {
                match frame.columns.get(name) {
                    Some(col) => template.values.extend(col.values.iter().cloned()),
                    None => template
                        .values
                        .extend(std::iter::repeat(Value::Null).take(frame.row_count)),
                }
            }
        }
        let row_count = if templates.is_empty() { 0 } else { row_count };
        DataFrame { columns: templates, row_count }
    }

    /// Partition row indices by the values of `vars`, in order of first appearance.
    /// Unknown variables are ignored; no variables yields one group with all rows.
    pub fn group_indices(&self, vars: &[String]) -> Vec<(Vec<Value>, Vec<usize>)> {
        let cols: Vec<&Column> = vars.iter().filter_map(|v| self.columns.get(v)).collect();
        let mut order: Vec<Vec<Value>> = Vec::new();
        let mut groups: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
        for row in 0..self.row_count {
            let key: Vec<Value> = cols.iter().map(|c| c.values[row].clone()).collect();
            let entry = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                Vec::new()
            });
            entry.push(row);
        }
        order
            .into_iter()
            .map(|key| {
                let rows = groups.remove(&key).unwrap_or_default();
                (key, rows)
            })
            .collect()
    }
}

/// Distinct non-null values, first-seen order
pub fn distinct(values: &[Value]) -> Vec<Value> {
    let mut seen = std::collections::HashSet::new();
    values
        .iter()
        .filter(|v| !v.is_null())
        .filter(|v| seen.insert((*v).clone()))
        .cloned()
        .collect()
}

fn json_values(name: &str, items: &[Json]) -> Result<Vec<Value>> {
    items
        .iter()
        .map(|item| {
            Value::from_json(item).ok_or_else(|| {
                PlotError::Frame(format!("Unsupported value type for variable '{}'", name))
            })
        })
        .collect()
}

impl Serialize for DataFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, col) in &self.columns {
            map.serialize_entry(name, &col.values)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_data() -> DataFrame {
        DataFrame::from_json(&json!({
            "time": ["Lunch", "Lunch", "Dinner", "Dinner", "Dinner"],
            "tip": [1.0, 2.5, 3.0, null, 4.0],
        }))
        .unwrap()
    }

    #[test]
    fn test_from_json_columns() {
        let df = make_data();
        assert_eq!(df.row_count(), 5);
        assert_eq!(df.kind("time"), Some(VarKind::Discrete));
        assert_eq!(df.kind("tip"), Some(VarKind::Continuous));
        assert_eq!(df.names().collect::<Vec<_>>(), vec!["time", "tip"]);
    }

    #[test]
    fn test_from_json_records() {
        let df = DataFrame::from_json(&json!([
            {"a": 1, "b": "x"},
            {"a": 2},
        ]))
        .unwrap();
        assert_eq!(df.row_count(), 2);
        assert_eq!(df.get("b").unwrap().values, vec![Value::from("x"), Value::Null]);
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let res = DataFrame::from_json(&json!({"a": [1, 2], "b": [1]}));
        assert!(matches!(res, Err(PlotError::Frame(_))));
    }

    #[test]
    fn test_nested_value_rejected() {
        let res = DataFrame::from_json(&json!({"a": [[1], [2]]}));
        assert!(res.is_err());
    }

    #[test]
    fn test_distinct_first_seen() {
        let df = make_data();
        assert_eq!(
            df.distinct_values("time"),
            vec![Value::from("Lunch"), Value::from("Dinner")]
        );
    }

    #[test]
    fn test_range_skips_nulls() {
        let df = make_data();
        assert_eq!(df.range("tip"), Some((1.0, 4.0)));
        assert_eq!(df.range("time"), None);
    }

    #[test]
    fn test_select_and_drop() {
        let df = make_data();
        let rows = df.select_rows(&[0, 2]);
        assert_eq!(rows.row_count(), 2);
        assert_eq!(rows.get("tip").unwrap().values, vec![Value::Num(1.0), Value::Num(3.0)]);

        let dropped = df.drop_columns(&["tip"]);
        assert!(!dropped.has("tip"));
        assert_eq!(dropped.row_count(), 5);

        let none = df.select_columns::<&str>(&[]);
        assert!(none.is_empty());
        assert_eq!(none.row_count(), 0);
    }

    #[test]
    fn test_append_replace() {
        let df = make_data();
        let other = DataFrame::from_columns(vec![Column::numeric("tip", vec![0.0; 5])]).unwrap();
        let merged = df.append_replace(&other).unwrap();
        assert_eq!(merged.get("tip").unwrap().values[1], Value::Num(0.0));
        assert!(merged.has("time"));

        let short = DataFrame::from_columns(vec![Column::numeric("z", vec![1.0])]).unwrap();
        assert!(df.append_replace(&short).is_err());
    }

    #[test]
    fn test_concat_fills_missing() {
        let a = DataFrame::from_columns(vec![Column::numeric("x", vec![1.0])]).unwrap();
        let b = DataFrame::from_columns(vec![Column::numeric("y", vec![2.0, 3.0])]).unwrap();
        let c = DataFrame::concat(&[a, b]);
        assert_eq!(c.row_count(), 3);
        assert_eq!(c.get("x").unwrap().values, vec![Value::Num(1.0), Value::Null, Value::Null]);
    }

    #[test]
    fn test_group_indices() {
        let df = make_data();
        let groups = df.group_indices(&["time".to_string()]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, vec![Value::from("Lunch")]);
        assert_eq!(groups[1].1, vec![2, 3, 4]);

        let all = df.group_indices(&[]);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].1.len(), 5);
    }

    #[test]
    fn test_from_csv() {
        let csv = "name,score\na,1\nb,\nc,2.5\n";
        let df = DataFrame::from_csv(csv.as_bytes()).unwrap();
        assert_eq!(df.kind("name"), Some(VarKind::Discrete));
        assert_eq!(df.kind("score"), Some(VarKind::Continuous));
        assert_eq!(df.get("score").unwrap().values[1], Value::Null);
    }

    #[test]
    fn test_value_nan_equality() {
        assert_eq!(Value::Num(f64::NAN), Value::Num(f64::NAN));
        assert!(Value::Num(f64::NAN).is_null());
        assert_eq!(Value::Num(-0.0), Value::Num(0.0));
    }

    #[test]
    fn test_natural_order() {
        let mut values = vec![Value::from("b"), Value::Null, Value::Num(2.0), Value::from("a"), Value::Num(1.0)];
        values.sort_by(|a, b| a.cmp_natural(b));
        assert_eq!(
            values,
            vec![Value::Num(1.0), Value::Num(2.0), Value::from("a"), Value::from("b"), Value::Null]
        );
    }

    #[test]
    fn test_serialize_as_column_map() {
        let df = DataFrame::from_columns(vec![Column::numeric("x", vec![1.0, 2.0])]).unwrap();
        assert_eq!(serde_json::to_value(&df).unwrap(), json!({"x": [1.0, 2.0]}));
    }

    #[test]
    fn test_display_integral_number() {
        assert_eq!(Value::Num(3.0).to_string(), "3");
        assert_eq!(Value::Num(2.5).to_string(), "2.5");
    }
}
