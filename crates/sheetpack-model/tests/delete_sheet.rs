use sheetpack_model::{DefinedName, DefinedNameScope, Workbook};

#[test]
fn delete_sheet_drops_names_that_reference_it() {
    let mut wb = Workbook::new();
    let data = wb.add_sheet("Data");
    let calc = wb.add_sheet("Calc");

    wb.defined_names.push(DefinedName {
        name: "source".to_string(),
        formula: "Data!$A$1:$B$4".to_string(),
        scope: DefinedNameScope::Workbook,
    });
    wb.defined_names.push(DefinedName {
        name: "result".to_string(),
        formula: "Calc!$A$1".to_string(),
        scope: DefinedNameScope::Workbook,
    });
    wb.defined_names.push(DefinedName {
        name: "scratch".to_string(),
        formula: "Data!$Z$9".to_string(),
        scope: DefinedNameScope::Sheet(data),
    });

    wb.delete_sheet(data).unwrap();

    let remaining: Vec<&str> = wb.defined_names.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(remaining, ["result"]);
    assert!(wb.sheet(calc).is_some());
    assert!(wb.sheet_by_name("Data").is_none());
}

#[test]
fn sheet_ids_are_not_reused_after_delete() {
    let mut wb = Workbook::new();
    let first = wb.add_sheet("One");
    wb.delete_sheet(first).unwrap();
    let second = wb.add_sheet("Two");
    assert_ne!(first, second);
}
