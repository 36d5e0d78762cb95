//! Symbol-keyed merge of per-tab table records.

use crate::table::Record;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Column that identifies a row across tabs.
pub const SYMBOL_FIELD: &str = "Symbol";

/// Enrichment key for quote lookups.
pub const QUOTE_KEY: &str = "yahooFinanceData";

/// Enrichment key for related articles.
pub const NEWS_KEY: &str = "news";

/// Everything known about one symbol.
///
/// Serializes flat: `{"symbol": "AAPL", "summary_Price": "150", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioEntry {
    pub symbol: String,
    #[serde(flatten)]
    pub fields: IndexMap<String, Value>,
}

impl PortfolioEntry {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            fields: IndexMap::new(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Text value of a field, if it holds a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Number of fields besides `symbol`.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// Merged entries keyed by symbol, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortfolioData {
    entries: IndexMap<String, PortfolioEntry>,
}

impl PortfolioData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&PortfolioEntry> {
        self.entries.get(symbol)
    }

    pub fn get_mut(&mut self, symbol: &str) -> Option<&mut PortfolioEntry> {
        self.entries.get_mut(symbol)
    }

    pub fn symbols(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PortfolioEntry)> {
        self.entries.iter()
    }

    /// Existing entry for `symbol`, or a fresh one seeded with the symbol.
    pub fn entry(&mut self, symbol: &str) -> &mut PortfolioEntry {
        self.entries
            .entry(symbol.to_string())
            .or_insert_with(|| PortfolioEntry::new(symbol))
    }

    /// Attach enrichment data to a known symbol. Unknown symbols are ignored.
    pub fn attach(&mut self, symbol: &str, key: &str, value: Value) -> bool {
        match self.entries.get_mut(symbol) {
            Some(entry) => {
                entry.set(key, value);
                true
            }
            None => false,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// What one tab contributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Rows handed to the merge.
    pub rows: usize,
    /// Rows with a usable symbol.
    pub merged: usize,
    /// Rows without a symbol, silently dropped.
    pub dropped: usize,
}

/// Field name a tab's column is stored under.
pub fn prefixed_field(tab: &str, field: &str) -> String {
    format!("{}_{}", tab.to_lowercase(), field)
}

/// Builds [`PortfolioData`] one tab at a time.
#[derive(Debug, Default)]
pub struct TableMerger {
    data: PortfolioData,
}

impl TableMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tab's rows into the running result.
    ///
    /// Rows without a non-empty `Symbol` are dropped. A symbol seen twice in
    /// the same tab keeps the later row's values for that tab's fields.
    pub fn merge_tab(&mut self, tab: &str, records: &[Record]) -> MergeStats {
        let mut stats = MergeStats {
            rows: records.len(),
            ..Default::default()
        };

        for record in records {
            let symbol = match record.get(SYMBOL_FIELD) {
                Some(s) if !s.is_empty() => s,
                _ => {
                    stats.dropped += 1;
                    continue;
                }
            };

            let entry = self.data.entry(symbol);
            for (field, value) in record {
                if field == SYMBOL_FIELD {
                    continue;
                }
                entry.set(prefixed_field(tab, field), Value::String(value.clone()));
            }
            stats.merged += 1;
        }

        debug!(
            tab,
            rows = stats.rows,
            merged = stats.merged,
            dropped = stats.dropped,
            "merged tab"
        );
        stats
    }

    pub fn data(&self) -> &PortfolioData {
        &self.data
    }

    pub fn finish(self) -> PortfolioData {
        self.data
    }
}

/// Merge tabs in the order given.
pub fn merge_tabs<'a, I>(tabs: I) -> PortfolioData
where
    I: IntoIterator<Item = (&'a str, &'a [Record])>,
{
    let mut merger = TableMerger::new();
    for (tab, records) in tabs {
        merger.merge_tab(tab, records);
    }
    merger.finish()
}

/// Placeholder stored where enrichment data could not be fetched.
pub fn error_placeholder(message: impl std::fmt::Display) -> Value {
    serde_json::json!({ "error": message.to_string() })
}
