//! Rendered table extraction.
//!
//! Works over any element that is a `<table>` or carries `role="table"`, so
//! div-based grids built from ARIA roles are read the same way as markup
//! tables. Nothing here fails: missing headers fall back to positional names
//! and ragged rows keep whatever cells they have.

use crate::dom::DomNode;
use indexmap::IndexMap;
use serde::Serialize;

/// One extracted row: field name → cell text, in column order.
pub type Record = IndexMap<String, String>;

/// Header labels and cell text of one table, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Read one table element. Rows with no data cells are skipped.
    pub fn from_node(table: &DomNode) -> Self {
        let headers = table
            .descendants_where(|n| n.is_tag_or_role("th", "columnheader"))
            .into_iter()
            .map(|cell| cell.text_content())
            .collect();

        let rows = table
            .descendants_where(|n| n.is_tag_or_role("tr", "row"))
            .into_iter()
            .map(|row| {
                row.descendants_where(|n| n.is_tag_or_role("td", "cell"))
                    .into_iter()
                    .map(|cell| cell.text_content())
                    .collect::<Vec<_>>()
            })
            .filter(|cells| !cells.is_empty())
            .collect();

        Self { headers, rows }
    }

    /// Field name for column `index`: the header label, or `column_<index>`
    /// when the header is missing or blank.
    pub fn field_name(&self, index: usize) -> String {
        match self.headers.get(index) {
            Some(label) if !label.is_empty() => label.clone(),
            _ => format!("column_{}", index),
        }
    }

    /// Map every row onto the headers positionally.
    ///
    /// Duplicate labels collapse into one field; the later cell wins.
    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|cells| {
                let mut record = Record::new();
                for (index, cell) in cells.iter().enumerate() {
                    record.insert(self.field_name(index), cell.clone());
                }
                record
            })
            .filter(|record| !record.is_empty())
            .collect()
    }
}

pub fn is_table(node: &DomNode) -> bool {
    node.is_tag_or_role("table", "table")
}

/// Table elements at or under `root`, in document order.
fn table_nodes(root: &DomNode) -> Vec<&DomNode> {
    let mut nodes = Vec::new();
    if is_table(root) {
        nodes.push(root);
    }
    nodes.extend(root.descendants_where(is_table));
    nodes
}

/// Every table at or under `root`, nested ones included, in document order.
pub fn extract_tables(root: &DomNode) -> Vec<Table> {
    table_nodes(root).into_iter().map(Table::from_node).collect()
}

/// Records of every table under `root`, concatenated in table order.
pub fn extract_records(root: &DomNode) -> Vec<Record> {
    extract_tables(root)
        .iter()
        .flat_map(Table::records)
        .collect()
}

/// Number of table elements under `root`. Used as a readiness signal.
pub fn count_tables(root: &DomNode) -> usize {
    table_nodes(root).len()
}
