use proptest::prelude::*;
use sheetpack_model::{CellRef, CellValue, Workbook};
use sheetpack_xlsx::{load_from_bytes, write_to_vec, SpreadsheetDocument};

fn roundtrip_single_cell(value: CellValue) -> CellValue {
    let mut wb = Workbook::new();
    let ws_id = wb.add_sheet("Sheet1");
    wb.sheet_mut(ws_id)
        .unwrap()
        .set_value(CellRef::new(0, 0), value);

    let bytes = write_to_vec(&SpreadsheetDocument::new(wb)).unwrap();
    let loaded = load_from_bytes(&bytes).unwrap();
    loaded
        .workbook
        .sheet_by_name("Sheet1")
        .unwrap()
        .cell(CellRef::new(0, 0))
        .map(|c| c.value.clone())
        .unwrap_or(CellValue::Empty)
}

proptest! {
    #[test]
    fn finite_numbers_roundtrip_exactly(n in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
        prop_assert_eq!(roundtrip_single_cell(CellValue::Number(n)), CellValue::Number(n));
    }

    #[test]
    fn text_with_markup_characters_roundtrips(
        s in "[a-zA-Z0-9 <>&\"'#;=]{1,24}"
    ) {
        // Leading/trailing spaces exercise the whitespace-preservation flag.
        prop_assert_eq!(
            roundtrip_single_cell(CellValue::Text(s.clone())),
            CellValue::Text(s)
        );
    }

    #[test]
    fn booleans_roundtrip(b in any::<bool>()) {
        prop_assert_eq!(roundtrip_single_cell(CellValue::Boolean(b)), CellValue::Boolean(b));
    }
}
