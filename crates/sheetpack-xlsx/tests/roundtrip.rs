use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use sheetpack_model::{
    CellRef, CellValue, Color, ErrorValue, Fill, FillPattern, Font, NumberFormat, Style, Workbook,
};
use sheetpack_xlsx::{load_from_bytes, write_to_vec, SpreadsheetDocument};

fn a1(s: &str) -> CellRef {
    CellRef::from_a1(s).unwrap()
}

#[test]
fn values_and_types_survive_a_round_trip() {
    let mut wb = Workbook::new();
    let ws_id = wb.add_sheet("Data");

    let date_style = wb.intern_style(Style {
        number_format: Some(NumberFormat::Custom("yyyy-mm-dd".to_string())),
        ..Default::default()
    });
    let duration_style = wb.intern_style(Style {
        number_format: Some(NumberFormat::Custom("[h]:mm:ss".to_string())),
        ..Default::default()
    });

    let moment = NaiveDate::from_ymd_opt(2021, 7, 14)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    let elapsed = chrono::Duration::hours(26) + chrono::Duration::minutes(15);

    let ws = wb.sheet_mut(ws_id).unwrap();
    ws.set_value(a1("A1"), CellValue::Number(42.5));
    ws.set_value(a1("A2"), CellValue::Boolean(true));
    ws.set_value(a1("A3"), CellValue::Text("plain".to_string()));
    ws.set_value(a1("A4"), CellValue::Error(ErrorValue::Div0));
    ws.set_value(a1("A5"), CellValue::DateTime(moment));
    ws.set_style_id(a1("A5"), date_style);
    ws.set_value(a1("A6"), CellValue::Duration(elapsed));
    ws.set_style_id(a1("A6"), duration_style);
    ws.set_value(a1("A7"), CellValue::Text("  padded  ".to_string()));
    ws.set_value(a1("A8"), CellValue::Text("inline".to_string()));
    ws.set_share_string(a1("A8"), false);

    let bytes = write_to_vec(&SpreadsheetDocument::new(wb)).unwrap();
    let loaded = load_from_bytes(&bytes).unwrap();
    let sheet = loaded.workbook.sheet_by_name("Data").unwrap();

    assert_eq!(sheet.cell(a1("A1")).unwrap().value, CellValue::Number(42.5));
    assert_eq!(
        sheet.cell(a1("A2")).unwrap().value,
        CellValue::Boolean(true)
    );
    assert_eq!(
        sheet.cell(a1("A3")).unwrap().value,
        CellValue::Text("plain".to_string())
    );
    assert_eq!(
        sheet.cell(a1("A4")).unwrap().value,
        CellValue::Error(ErrorValue::Div0)
    );
    assert_eq!(
        sheet.cell(a1("A5")).unwrap().value,
        CellValue::DateTime(moment),
        "date cells are reconstructed from the format-driven inference"
    );
    assert_eq!(
        sheet.cell(a1("A6")).unwrap().value,
        CellValue::Duration(elapsed)
    );
    assert_eq!(
        sheet.cell(a1("A7")).unwrap().value,
        CellValue::Text("  padded  ".to_string()),
        "significant whitespace must survive via xml:space"
    );

    let inline = sheet.cell(a1("A8")).unwrap();
    assert_eq!(inline.value, CellValue::Text("inline".to_string()));
    assert!(!inline.share_string, "inline cells stay inline");
}

#[test]
fn resolved_styles_survive_a_round_trip() {
    let mut wb = Workbook::new();
    let ws_id = wb.add_sheet("Styled");

    let style = Style {
        font: Some(Font {
            bold: true,
            color: Some(Color::Argb(0xFF336699)),
            ..Default::default()
        }),
        fill: Some(Fill {
            pattern: FillPattern::Solid,
            fg_color: Some(Color::Argb(0xFFFFFF00)),
            bg_color: None,
        }),
        number_format: Some(NumberFormat::Custom("0.000".to_string())),
        ..Default::default()
    };
    let style_id = wb.intern_style(style.clone());
    let ws = wb.sheet_mut(ws_id).unwrap();
    ws.set_value(a1("B2"), CellValue::Number(1.25));
    ws.set_style_id(a1("B2"), style_id);
    // Two cells, one style: dedup must hold across the round trip.
    ws.set_value(a1("B3"), CellValue::Number(2.5));
    ws.set_style_id(a1("B3"), style_id);

    let bytes = write_to_vec(&SpreadsheetDocument::new(wb)).unwrap();
    let loaded = load_from_bytes(&bytes).unwrap();
    let sheet = loaded.workbook.sheet_by_name("Styled").unwrap();

    let b2 = sheet.cell(a1("B2")).unwrap();
    let b3 = sheet.cell(a1("B3")).unwrap();
    assert_eq!(
        b2.style_id, b3.style_id,
        "structurally equal styles intern to one id"
    );
    assert_eq!(loaded.workbook.styles.get(b2.style_id), Some(&style));
}

#[test]
fn date_system_1904_round_trips_the_same_instant() {
    let moment = NaiveDate::from_ymd_opt(2020, 2, 29)
        .unwrap()
        .and_hms_opt(18, 0, 0)
        .unwrap();

    for date_system in [
        sheetpack_model::DateSystem::Excel1900,
        sheetpack_model::DateSystem::Excel1904,
    ] {
        let mut wb = Workbook::new();
        wb.date_system = date_system;
        let ws_id = wb.add_sheet("Dates");
        let style = wb.intern_style(Style {
            number_format: Some(NumberFormat::Custom("yyyy-mm-dd hh:mm".to_string())),
            ..Default::default()
        });
        let ws = wb.sheet_mut(ws_id).unwrap();
        ws.set_value(a1("A1"), CellValue::DateTime(moment));
        ws.set_style_id(a1("A1"), style);

        let bytes = write_to_vec(&SpreadsheetDocument::new(wb)).unwrap();
        let loaded = load_from_bytes(&bytes).unwrap();
        assert_eq!(loaded.workbook.date_system, date_system);
        let sheet = loaded.workbook.sheet_by_name("Dates").unwrap();
        assert_eq!(
            sheet.cell(a1("A1")).unwrap().value,
            CellValue::DateTime(moment),
            "the 1904 shift must be applied exactly once per direction"
        );
    }
}

#[test]
fn second_save_is_stable() {
    let mut wb = Workbook::new();
    let ws_id = wb.add_sheet("Data");
    let ws = wb.sheet_mut(ws_id).unwrap();
    ws.set_value(a1("A1"), CellValue::Text("Hello".to_string()));
    ws.set_value(a1("B1"), CellValue::Number(7.0));
    ws.set_formula(a1("C1"), Some("A1&B1".to_string()));

    let first = write_to_vec(&SpreadsheetDocument::new(wb)).unwrap();
    let doc = load_from_bytes(&first).unwrap();
    let second = write_to_vec(&doc).unwrap();
    let reloaded = load_from_bytes(&second).unwrap();

    let sheet = reloaded.workbook.sheet_by_name("Data").unwrap();
    assert_eq!(
        sheet.cell(a1("A1")).unwrap().value,
        CellValue::Text("Hello".to_string())
    );
    assert_eq!(sheet.formula(a1("C1")), Some("A1&B1"));
}
