use roxmltree::Document;
use sheetpack_model::{CellRef, CellValue, Range, Workbook};
use sheetpack_xlsx::{load_from_bytes, write_to_vec, SpreadsheetDocument};

fn a1(s: &str) -> CellRef {
    CellRef::from_a1(s).unwrap()
}

#[test]
fn chain_lists_every_formula_cell_grouped_by_sheet() {
    let mut wb = Workbook::new();
    let first = wb.add_sheet("First");
    let second = wb.add_sheet("Second");
    wb.sheet_mut(first)
        .unwrap()
        .set_formula(a1("A1"), Some("1+1".to_string()));
    wb.sheet_mut(second)
        .unwrap()
        .set_formula(a1("B2"), Some("A1*3".to_string()));
    wb.sheet_mut(second)
        .unwrap()
        .set_value(a1("C3"), CellValue::Number(9.0));

    let bytes = write_to_vec(&SpreadsheetDocument::new(wb)).unwrap();
    let doc = load_from_bytes(&bytes).unwrap();
    let chain = doc.package().part("xl/calcChain.xml").expect("chain part");
    let chain = Document::parse(std::str::from_utf8(chain).unwrap()).unwrap();

    let entries: Vec<(String, String)> = chain
        .descendants()
        .filter(|n| n.has_tag_name("c"))
        .map(|c| {
            (
                c.attribute("r").unwrap_or_default().to_string(),
                c.attribute("i").unwrap_or_default().to_string(),
            )
        })
        .collect();
    assert_eq!(
        entries,
        [
            ("A1".to_string(), "1".to_string()),
            ("B2".to_string(), "2".to_string())
        ]
    );
}

#[test]
fn array_anchor_is_flagged_and_followed_by_child_marker() {
    let mut wb = Workbook::new();
    let ws_id = wb.add_sheet("Sheet1");
    wb.sheet_mut(ws_id)
        .unwrap()
        .set_array_formula(Range::from_a1("A1:B2").unwrap(), "A1:B2*2");

    let bytes = write_to_vec(&SpreadsheetDocument::new(wb)).unwrap();
    let doc = load_from_bytes(&bytes).unwrap();
    let chain = doc.package().part("xl/calcChain.xml").expect("chain part");
    let chain_xml = std::str::from_utf8(chain).unwrap();
    let chain = Document::parse(chain_xml).unwrap();

    let entries: Vec<_> = chain
        .descendants()
        .filter(|n| n.has_tag_name("c"))
        .collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].attribute("a"), Some("1"));
    assert_eq!(entries[0].attribute("s"), None);
    assert_eq!(entries[1].attribute("s"), Some("1"));
    assert_eq!(entries[1].attribute("a"), None);
}

#[test]
fn removing_every_formula_purges_the_chain() {
    let mut wb = Workbook::new();
    let ws_id = wb.add_sheet("Sheet1");
    wb.sheet_mut(ws_id)
        .unwrap()
        .set_formula(a1("A1"), Some("2*2".to_string()));

    let bytes = write_to_vec(&SpreadsheetDocument::new(wb)).unwrap();
    let mut doc = load_from_bytes(&bytes).unwrap();
    assert!(doc.package().contains("xl/calcChain.xml"));

    let ws_id = doc.workbook.sheet_by_name("Sheet1").unwrap().id;
    doc.workbook
        .sheet_mut(ws_id)
        .unwrap()
        .set_formula(a1("A1"), None);

    let bytes = write_to_vec(&doc).unwrap();
    let reloaded = load_from_bytes(&bytes).unwrap();
    assert!(
        !reloaded.package().contains("xl/calcChain.xml"),
        "an empty chain means no part at all"
    );

    // The relationship and content-type entries must go with it.
    let rels = reloaded
        .package()
        .part("xl/_rels/workbook.xml.rels")
        .unwrap();
    assert!(!std::str::from_utf8(rels).unwrap().contains("calcChain"));
    let types = reloaded.package().part("[Content_Types].xml").unwrap();
    assert!(!std::str::from_utf8(types).unwrap().contains("calcChain"));
}
