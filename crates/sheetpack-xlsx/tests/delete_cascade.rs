use sheetpack_model::{CellRef, CellValue, DefinedName, DefinedNameScope, Workbook};
use sheetpack_xlsx::{load_from_bytes, write_to_vec, SpreadsheetDocument};

fn a1(s: &str) -> CellRef {
    CellRef::from_a1(s).unwrap()
}

fn two_sheet_package() -> Vec<u8> {
    let mut wb = Workbook::new();
    let data = wb.add_sheet("Data");
    let calc = wb.add_sheet("Calc");
    wb.sheet_mut(data)
        .unwrap()
        .set_value(a1("A1"), CellValue::Number(1.0));
    wb.sheet_mut(data)
        .unwrap()
        .set_formula(a1("B1"), Some("A1*2".to_string()));
    wb.sheet_mut(calc)
        .unwrap()
        .set_value(a1("A1"), CellValue::Number(2.0));
    wb.defined_names.push(DefinedName {
        name: "source".to_string(),
        formula: "Data!$A$1".to_string(),
        scope: DefinedNameScope::Workbook,
    });
    wb.defined_names.push(DefinedName {
        name: "kept".to_string(),
        formula: "Calc!$A$1".to_string(),
        scope: DefinedNameScope::Workbook,
    });
    write_to_vec(&SpreadsheetDocument::new(wb)).unwrap()
}

#[test]
fn deleting_a_sheet_removes_its_part_and_references() {
    let bytes = two_sheet_package();
    let mut doc = load_from_bytes(&bytes).unwrap();

    let data_id = doc.workbook.sheet_by_name("Data").unwrap().id;
    let data_path = doc
        .meta()
        .sheets
        .iter()
        .find(|m| m.worksheet_id == data_id)
        .unwrap()
        .path
        .clone();
    let data_rel = doc
        .meta()
        .sheets
        .iter()
        .find(|m| m.worksheet_id == data_id)
        .unwrap()
        .relationship_id
        .clone();

    doc.delete_sheet(data_id).unwrap();
    let resaved = write_to_vec(&doc).unwrap();
    let reloaded = load_from_bytes(&resaved).unwrap();

    // Part gone.
    assert!(!reloaded.package().contains(&data_path));

    // No workbook entry, no relationship, no content-type override.
    let workbook_xml =
        std::str::from_utf8(reloaded.package().part("xl/workbook.xml").unwrap()).unwrap();
    assert!(!workbook_xml.contains(r#"name="Data""#));

    let rels =
        std::str::from_utf8(reloaded.package().part("xl/_rels/workbook.xml.rels").unwrap())
            .unwrap();
    assert!(!rels.contains(&format!(r#"Id="{data_rel}""#)));

    let types =
        std::str::from_utf8(reloaded.package().part("[Content_Types].xml").unwrap()).unwrap();
    assert!(!types.contains(&data_path));

    // Calculation-chain entries for the sheet are gone (no formulas remain).
    assert!(!reloaded.package().contains("xl/calcChain.xml"));

    // Defined names scoped to or referencing the sheet are gone; others stay.
    let names: Vec<&str> = reloaded
        .workbook
        .defined_names
        .iter()
        .map(|n| n.name.as_str())
        .collect();
    assert_eq!(names, ["kept"]);

    // The surviving sheet is intact.
    let calc = reloaded.workbook.sheet_by_name("Calc").unwrap();
    assert_eq!(calc.cell(a1("A1")).unwrap().value, CellValue::Number(2.0));
}

#[test]
fn surviving_sheet_keeps_its_relationship_id_after_a_delete() {
    let bytes = two_sheet_package();
    let mut doc = load_from_bytes(&bytes).unwrap();

    let calc_rel = doc
        .meta()
        .sheets
        .iter()
        .find(|m| doc.workbook.sheet(m.worksheet_id).unwrap().name == "Calc")
        .unwrap()
        .relationship_id
        .clone();

    let data_id = doc.workbook.sheet_by_name("Data").unwrap().id;
    doc.delete_sheet(data_id).unwrap();

    let resaved = write_to_vec(&doc).unwrap();
    let reloaded = load_from_bytes(&resaved).unwrap();
    let calc_meta = reloaded
        .meta()
        .sheets
        .iter()
        .find(|m| reloaded.workbook.sheet(m.worksheet_id).unwrap().name == "Calc")
        .unwrap();
    assert_eq!(calc_meta.relationship_id, calc_rel);
}
