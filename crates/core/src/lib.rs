pub mod dom;
pub mod table;
pub mod merge;
pub mod cookies;
pub mod locate;
pub mod artifact;
pub mod config;
#[cfg(feature = "fetch")]
pub mod fetch;
#[cfg(feature = "fetch")]
pub mod enrich;
#[cfg(feature = "fetch")]
pub mod workflow;

use table::Record;

/// Parse an HTML string and extract the records of every table in it.
/// This is the primary entry point for folio-core.
pub fn extract(html: &str) -> Vec<Record> {
    let dom_tree = dom::parse_html(html);
    table::extract_records(&dom_tree)
}
