use pretty_assertions::assert_eq;
use sheetpack_model::{Color, Font, NumberFormat, Style, StyleTable};

#[test]
fn style_table_intern_deduplicates() {
    let mut table = StyleTable::new();

    let style = Style {
        font: Some(Font {
            bold: true,
            color: Some(Color::new_argb(0xFFFF0000)),
            ..Default::default()
        }),
        number_format: Some(NumberFormat::Custom("0%".to_string())),
        ..Default::default()
    };

    let a = table.intern(style.clone());
    let b = table.intern(style);
    assert_eq!(a, b, "identical styles should reuse the same id");
}

#[test]
fn default_style_is_always_id_zero() {
    let mut table = StyleTable::new();
    assert_eq!(table.intern(Style::default()), 0);
    assert_eq!(table.len(), 1);
}

#[test]
fn structurally_different_styles_get_distinct_ids() {
    let mut table = StyleTable::new();
    let bold = table.intern(Style {
        font: Some(Font {
            bold: true,
            ..Default::default()
        }),
        ..Default::default()
    });
    let italic = table.intern(Style {
        font: Some(Font {
            italic: true,
            ..Default::default()
        }),
        ..Default::default()
    });
    assert_ne!(bold, italic);
}
