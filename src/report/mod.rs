//! Grouped, ranked tables over ledger records.
//!
//! [`aggregate()`] is the whole algorithm: key every entry, sum the values per
//! key, rank descending (ties keep first-seen order), and put a `<total>` row
//! on top. [`ReportConfig`] picks the key and value for ledger records, and
//! [`ReportOverride`] is the partial version a caller layers over a default.

use std::{fmt, sync::Arc};

use hashbrown::HashMap;
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Deserialize, Serialize, Serializer,
};

use crate::alloc::meta::AllocRecord;

/// Key of the synthetic first row.
pub const TOTAL_KEY: &str = "<total>";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub key: String,
    pub value: u64,
}

/// A ranked table. `rows[0]` is always the `<total>` row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    key_label: String,
    value_label: String,
    rows: Vec<Row>,
}

/// Group `entries` by `get_key`, summing `get_value`, and rank the groups.
///
/// Sums saturate at `u64::MAX` rather than wrapping.
pub fn aggregate<T, I, K, V>(
    entries: I,
    key_label: impl Into<String>,
    value_label: impl Into<String>,
    mut get_key: K,
    mut get_value: V,
) -> Table
where
    I: IntoIterator<Item = T>,
    K: FnMut(&T) -> String,
    V: FnMut(&T) -> u64,
{
    // key -> index into `groups`, which stays in first-seen order
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Row> = Vec::new();
    let mut total = 0u64;

    for entry in entries {
        let key = get_key(&entry);
        let value = get_value(&entry);
        total = total.saturating_add(value);
        match index.get(&key).copied() {
            Some(i) => groups[i].value = groups[i].value.saturating_add(value),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Row { key, value });
            }
        }
    }

    // `sort_by` is stable, which is what keeps ties in first-seen order
    groups.sort_by(|a, b| b.value.cmp(&a.value));

    let mut rows = Vec::with_capacity(groups.len() + 1);
    rows.push(Row {
        key: TOTAL_KEY.to_owned(),
        value: total,
    });
    rows.extend(groups);

    Table {
        key_label: key_label.into(),
        value_label: value_label.into(),
        rows,
    }
}

impl Table {
    pub fn key_label(&self) -> &str {
        &self.key_label
    }

    pub fn value_label(&self) -> &str {
        &self.value_label
    }

    /// Every row, `<total>` first.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The ranked groups, without the `<total>` row.
    pub fn groups(&self) -> &[Row] {
        &self.rows[1..]
    }

    pub fn total(&self) -> u64 {
        self.rows[0].value
    }

    /// Value of the group keyed `key`, if there is one.
    pub fn get(&self, key: &str) -> Option<u64> {
        self.groups()
            .iter()
            .find(|row| row.key == key)
            .map(|row| row.value)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("tables only contain strings and integers")
    }
}

/// Same shape as `console.table`: an array of `{ <keyLabel>: key,
/// <valueLabel>: value }` objects.
impl Serialize for Table {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        struct RowRef<'a>(&'a Table, &'a Row);

        impl Serialize for RowRef<'_> {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry(&self.0.key_label, &self.1.key)?;
                map.serialize_entry(&self.0.value_label, &self.1.value)?;
                map.end()
            }
        }

        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&RowRef(self, row))?;
        }
        seq.end()
    }
}

/// Renders an `(index)` column plus the two labelled columns. Multi-line keys
/// (provenance strings usually are) take as many lines as they need.
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const INDEX: &str = "(index)";

        let index_width = INDEX.len().max(self.rows.len().to_string().len());
        let key_width = self
            .rows
            .iter()
            .flat_map(|row| row.key.lines())
            .map(|line| line.chars().count())
            .chain([self.key_label.chars().count()])
            .max()
            .unwrap_or(0);
        let value_width = self
            .rows
            .iter()
            .map(|row| row.value.to_string().len())
            .chain([self.value_label.chars().count()])
            .max()
            .unwrap_or(0);

        let rule = format!(
            "+{}+{}+{}+",
            "-".repeat(index_width + 2),
            "-".repeat(key_width + 2),
            "-".repeat(value_width + 2)
        );

        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "| {INDEX:<index_width$} | {:<key_width$} | {:<value_width$} |",
            self.key_label, self.value_label
        )?;
        writeln!(f, "{rule}")?;
        for (i, row) in self.rows.iter().enumerate() {
            let mut lines = row.key.lines();
            let first = lines.next().unwrap_or("");
            writeln!(
                f,
                "| {i:<index_width$} | {first:<key_width$} | {:>value_width$} |",
                row.value
            )?;
            for line in lines {
                writeln!(
                    f,
                    "| {:<index_width$} | {line:<key_width$} | {:<value_width$} |",
                    "", ""
                )?;
            }
        }
        write!(f, "{rule}")
    }
}

/// A function from a record to a group key.
pub type KeyFn = Arc<dyn Fn(&dyn AllocRecord) -> String + Send + Sync>;
/// A function from a record to the value summed within its group.
pub type ValueFn = Arc<dyn Fn(&dyn AllocRecord) -> u64 + Send + Sync>;

/// What to group records by.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySelector {
    /// The provenance string
    #[default]
    Stack,
    /// The address, as `0x…`
    Pointer,
    Size,
    Align,
    #[serde(skip)]
    Custom(KeyFn),
}

impl KeySelector {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&dyn AllocRecord) -> String + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    pub fn key_of(&self, record: &dyn AllocRecord) -> String {
        match self {
            Self::Stack => record.stack().to_owned(),
            Self::Pointer => format!("{:#x}", record.pointer()),
            Self::Size => record.size().to_string(),
            Self::Align => record.align().to_string(),
            Self::Custom(f) => f(record),
        }
    }
}

impl fmt::Debug for KeySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stack => write!(f, "Stack"),
            Self::Pointer => write!(f, "Pointer"),
            Self::Size => write!(f, "Size"),
            Self::Align => write!(f, "Align"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// What each record contributes to its group.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSelector {
    /// 1 per record
    #[default]
    Count,
    /// Requested bytes
    Size,
    Align,
    #[serde(skip)]
    Custom(ValueFn),
}

impl ValueSelector {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&dyn AllocRecord) -> u64 + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    pub fn value_of(&self, record: &dyn AllocRecord) -> u64 {
        match self {
            Self::Count => 1,
            Self::Size => record.size() as u64,
            Self::Align => record.align() as u64,
            Self::Custom(f) => f(record),
        }
    }
}

impl fmt::Debug for ValueSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count => write!(f, "Count"),
            Self::Size => write!(f, "Size"),
            Self::Align => write!(f, "Align"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Labels plus key/value selection for a ledger report.
#[derive(Clone, Debug)]
pub struct ReportConfig {
    pub key_label: String,
    pub value_label: String,
    pub key: KeySelector,
    pub value: ValueSelector,
}

impl ReportConfig {
    /// Live allocations per call site. This counts allocations; ask for
    /// [`ValueSelector::Size`] if you want bytes.
    pub fn live_allocations() -> Self {
        Self {
            key_label: "Live Allocations".to_owned(),
            value_label: "Count".to_owned(),
            key: KeySelector::Stack,
            value: ValueSelector::Count,
        }
    }

    /// Invalid frees per call site.
    pub fn invalid_frees() -> Self {
        Self {
            key_label: "Invalid Free".to_owned(),
            value_label: "Count".to_owned(),
            key: KeySelector::Stack,
            value: ValueSelector::Count,
        }
    }

    /// `self`, with every field `over` sets replaced.
    pub fn merged(self, over: ReportOverride) -> Self {
        Self {
            key_label: over.key_label.unwrap_or(self.key_label),
            value_label: over.value_label.unwrap_or(self.value_label),
            key: over.key.unwrap_or(self.key),
            value: over.value.unwrap_or(self.value),
        }
    }

    pub fn aggregate<'a, R, I>(&self, records: I) -> Table
    where
        R: AllocRecord + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        aggregate(
            records,
            self.key_label.clone(),
            self.value_label.clone(),
            |record| self.key.key_of(*record),
            |record| self.value.value_of(*record),
        )
    }
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ReportOverrideError {
    #[error("report override is not valid JSON: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("report override must be a JSON object")]
    NotAnObject,
}

/// A partial [`ReportConfig`]. Unset fields fall back to the defaults of
/// whichever report it is applied to.
#[derive(Clone, Debug, Default)]
pub struct ReportOverride {
    pub key_label: Option<String>,
    pub value_label: Option<String>,
    pub key: Option<KeySelector>,
    pub value: Option<ValueSelector>,
}

impl ReportOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_label(mut self, label: impl Into<String>) -> Self {
        self.key_label = Some(label.into());
        self
    }

    pub fn value_label(mut self, label: impl Into<String>) -> Self {
        self.value_label = Some(label.into());
        self
    }

    pub fn key(mut self, key: KeySelector) -> Self {
        self.key = Some(key);
        self
    }

    pub fn value(mut self, value: ValueSelector) -> Self {
        self.value = Some(value);
        self
    }

    /// Parse `{"keyLabel": …, "valueLabel": …, "getKey": …, "getValue": …}`.
    ///
    /// Unknown keys are ignored, and so are known keys holding something
    /// unusable (with a warning). Only input that isn't a JSON object at all
    /// is an error.
    pub fn from_json(json: &str) -> Result<Self, ReportOverrideError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let serde_json::Value::Object(mut fields) = value else {
            return Err(ReportOverrideError::NotAnObject);
        };

        fn take<T>(fields: &mut serde_json::Map<String, serde_json::Value>, name: &str) -> Option<T>
        where
            T: for<'de> Deserialize<'de>,
        {
            let raw = fields.remove(name)?;
            match serde_json::from_value(raw) {
                Ok(v) => Some(v),
                Err(e) => {
                    log::warn!("ignoring report override field `{name}`: {e}");
                    None
                }
            }
        }

        Ok(Self {
            key_label: take(&mut fields, "keyLabel"),
            value_label: take(&mut fields, "valueLabel"),
            key: take(&mut fields, "getKey"),
            value: take(&mut fields, "getValue"),
        })
    }
}
