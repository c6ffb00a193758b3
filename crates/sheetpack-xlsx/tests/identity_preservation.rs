use sheetpack_model::{CellRef, CellValue, Workbook};
use sheetpack_xlsx::{load_from_bytes, write_to_vec, SpreadsheetDocument};

fn a1(s: &str) -> CellRef {
    CellRef::from_a1(s).unwrap()
}

fn three_sheet_package() -> Vec<u8> {
    let mut wb = Workbook::new();
    for name in ["Alpha", "Beta", "Gamma"] {
        let ws_id = wb.add_sheet(name);
        wb.sheet_mut(ws_id)
            .unwrap()
            .set_value(a1("A1"), CellValue::Text(name.to_string()));
    }
    write_to_vec(&SpreadsheetDocument::new(wb)).unwrap()
}

#[test]
fn unmodified_save_preserves_relationship_ids() {
    let original = three_sheet_package();
    let doc = load_from_bytes(&original).unwrap();
    let before: Vec<(String, String)> = doc
        .meta()
        .sheets
        .iter()
        .map(|m| (m.relationship_id.clone(), m.path.clone()))
        .collect();

    let resaved = write_to_vec(&doc).unwrap();
    let reloaded = load_from_bytes(&resaved).unwrap();
    let after: Vec<(String, String)> = reloaded
        .meta()
        .sheets
        .iter()
        .map(|m| (m.relationship_id.clone(), m.path.clone()))
        .collect();

    assert_eq!(before, after);
}

#[test]
fn sheet_ids_survive_edits_to_other_sheets() {
    let original = three_sheet_package();
    let mut doc = load_from_bytes(&original).unwrap();

    let beta_id = doc.workbook.sheet_by_name("Beta").unwrap().id;
    doc.workbook
        .sheet_mut(beta_id)
        .unwrap()
        .set_value(a1("Z9"), CellValue::Number(99.0));

    let before: Vec<u32> = doc.meta().sheets.iter().map(|m| m.sheet_id).collect();
    let resaved = write_to_vec(&doc).unwrap();
    let reloaded = load_from_bytes(&resaved).unwrap();
    let after: Vec<u32> = reloaded.meta().sheets.iter().map(|m| m.sheet_id).collect();
    assert_eq!(before, after);
}

#[test]
fn new_sheets_get_fresh_non_colliding_ids() {
    let original = three_sheet_package();
    let mut doc = load_from_bytes(&original).unwrap();

    let existing: Vec<String> = doc
        .meta()
        .sheets
        .iter()
        .map(|m| m.relationship_id.clone())
        .collect();

    let added = doc.add_sheet("Delta");
    doc.workbook
        .sheet_mut(added)
        .unwrap()
        .set_value(a1("A1"), CellValue::Number(4.0));

    let resaved = write_to_vec(&doc).unwrap();
    let reloaded = load_from_bytes(&resaved).unwrap();

    assert_eq!(reloaded.meta().sheets.len(), 4);
    let delta = reloaded
        .meta()
        .sheets
        .iter()
        .find(|m| {
            reloaded
                .workbook
                .sheet(m.worksheet_id)
                .is_some_and(|s| s.name == "Delta")
        })
        .expect("new sheet present");
    assert!(
        !existing.contains(&delta.relationship_id),
        "fresh ids must not collide with preserved ones"
    );

    // Surviving sheets keep their ids even after the addition.
    for (idx, rel_id) in existing.iter().enumerate() {
        assert_eq!(&reloaded.meta().sheets[idx].relationship_id, rel_id);
    }
}

#[test]
fn untouched_parts_are_preserved_byte_for_byte() {
    let original = three_sheet_package();
    let mut doc = load_from_bytes(&original).unwrap();

    let alpha = doc.workbook.sheet_by_name("Alpha").unwrap().id;
    doc.workbook
        .sheet_mut(alpha)
        .unwrap()
        .set_value(a1("B1"), CellValue::Number(1.0));

    let resaved = write_to_vec(&doc).unwrap();
    let reloaded = load_from_bytes(&resaved).unwrap();

    // Sheets that were not edited keep identical worksheet XML.
    let beta_meta = doc
        .meta()
        .sheets
        .iter()
        .find(|m| doc.workbook.sheet(m.worksheet_id).unwrap().name == "Beta")
        .unwrap();
    assert_eq!(
        doc.package().part(&beta_meta.path),
        reloaded.package().part(&beta_meta.path)
    );
}
