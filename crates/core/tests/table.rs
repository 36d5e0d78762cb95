//! Tests for table extraction.

use folio_core::dom::parse_html;
use folio_core::table::{self, Record, Table};
use pretty_assertions::assert_eq;

fn record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_single_row_maps_headers() {
    let records = folio_core::extract(
        r#"
    <table>
        <thead><tr><th>Symbol</th><th>Price</th></tr></thead>
        <tbody><tr><td>AAPL</td><td>150</td></tr></tbody>
    </table>
    "#,
    );

    assert_eq!(records, vec![record(&[("Symbol", "AAPL"), ("Price", "150")])]);
}

#[test]
fn test_header_row_produces_no_record() {
    let dom = parse_html(
        "<table><tr><th>Symbol</th><th>Price</th></tr><tr><td>MSFT</td><td>410</td></tr></table>",
    );
    let tables = table::extract_tables(&dom);
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].headers, vec!["Symbol", "Price"]);
    assert_eq!(tables[0].rows, vec![vec!["MSFT".to_string(), "410".to_string()]]);
}

#[test]
fn test_short_row_maps_only_present_cells() {
    let records = folio_core::extract(
        "<table><tr><th>Symbol</th><th>Price</th><th>Change</th></tr>\
         <tr><td>AAPL</td></tr></table>",
    );
    assert_eq!(records, vec![record(&[("Symbol", "AAPL")])]);
}

#[test]
fn test_long_row_synthesizes_column_names() {
    let records = folio_core::extract(
        "<table><tr><th>Symbol</th></tr><tr><td>AAPL</td><td>150</td><td>+1.2%</td></tr></table>",
    );
    assert_eq!(
        records,
        vec![record(&[("Symbol", "AAPL"), ("column_1", "150"), ("column_2", "+1.2%")])]
    );
}

#[test]
fn test_blank_header_synthesizes_column_name() {
    let records = folio_core::extract(
        "<table><tr><th></th><th>Symbol</th></tr><tr><td>x</td><td>VOO</td></tr></table>",
    );
    assert_eq!(records, vec![record(&[("column_0", "x"), ("Symbol", "VOO")])]);
}

#[test]
fn test_row_without_cells_is_skipped() {
    let dom = parse_html(
        "<table><tr><th>Symbol</th><th>Price</th></tr><tr></tr><tr><td>AAPL</td><td>1</td></tr></table>",
    );
    let tables = table::extract_tables(&dom);
    assert_eq!(tables[0].rows.len(), 1);
    assert_eq!(tables[0].records().len(), 1);
}

#[test]
fn test_no_headers_at_all() {
    let records = folio_core::extract("<table><tr><td>a</td><td>b</td></tr></table>");
    assert_eq!(records, vec![record(&[("column_0", "a"), ("column_1", "b")])]);
}

#[test]
fn test_cell_text_is_trimmed_and_joined() {
    let records = folio_core::extract(
        "<table><tr><th>\n  <span>Sym</span><span>bol</span>\n</th></tr>\
         <tr><td>  <a href=\"/quote/AAPL\">AAPL</a>\n</td></tr></table>",
    );
    assert_eq!(records, vec![record(&[("Symbol", "AAPL")])]);
}

#[test]
fn test_duplicate_headers_keep_later_cell() {
    let records = folio_core::extract(
        "<table><tr><th>Symbol</th><th>Value</th><th>Value</th></tr>\
         <tr><td>AAPL</td><td>1</td><td>2</td></tr></table>",
    );
    assert_eq!(records, vec![record(&[("Symbol", "AAPL"), ("Value", "2")])]);
}

#[test]
fn test_aria_grid_is_read_like_a_table() {
    let html = r#"
    <div role="table">
        <div role="row">
            <span role="columnheader">Symbol</span>
            <span role="columnheader">Shares</span>
        </div>
        <div role="row">
            <span role="cell">NVDA</span>
            <span role="cell">12</span>
        </div>
    </div>
    "#;
    let records = folio_core::extract(html);
    assert_eq!(records, vec![record(&[("Symbol", "NVDA"), ("Shares", "12")])]);
}

#[test]
fn test_multiple_tables_concatenate_in_order() {
    let html = r#"
    <table><tr><th>Symbol</th></tr><tr><td>A</td></tr></table>
    <p>between</p>
    <table><tr><th>Symbol</th></tr><tr><td>B</td></tr><tr><td>C</td></tr></table>
    "#;
    let symbols: Vec<String> = folio_core::extract(html)
        .into_iter()
        .map(|r| r["Symbol"].clone())
        .collect();
    assert_eq!(symbols, vec!["A", "B", "C"]);
}

#[test]
fn test_no_tables_yields_nothing() {
    assert!(folio_core::extract("<p>Nothing here</p>").is_empty());
    assert!(folio_core::extract("").is_empty());
    assert_eq!(table::count_tables(&parse_html("<div></div>")), 0);
}

#[test]
fn test_empty_table_value() {
    let t = Table::default();
    assert!(t.records().is_empty());
}
