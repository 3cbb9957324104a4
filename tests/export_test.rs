// ==========================================
// ExportWriter 集成测试
// ==========================================
// 测试目标: 导出后经 TabularReader 读回，值保持一致
//           日期字段按日历日期比较；形似数字/布尔的文本不被改写
// ==========================================


use chrono::NaiveDate;
use doc_mapper::mapper::parse_date;
use doc_mapper::{
    ColumnDefinition, ContentBinding, ExportWriter, FieldValue, MappedRecord, TabularReader,
};
use tempfile::TempDir;
use test_helpers::{export_map, InvoiceLine};

fn records() -> Vec<InvoiceLine> {
    vec![
        InvoiceLine {
            supplier: Some("ACME".to_string()),
            amount: Some(10.5),
            quantity: 3,
            delivery_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            reference: None,
        },
        InvoiceLine {
            supplier: Some("Globex".to_string()),
            amount: Some(20.0),
            quantity: 1,
            delivery_date: NaiveDate::from_ymd_opt(2023, 12, 31),
            reference: None,
        },
        InvoiceLine {
            supplier: Some("Initech".to_string()),
            amount: None,
            quantity: 0,
            delivery_date: None,
            reference: None,
        },
    ]
}

#[test]
fn test_export_then_read_back() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out").join("export.xlsx");
    let map = export_map();
    let records = records();

    ExportWriter::default()
        .export_to_file(&map, &records, &output)
        .unwrap();

    let grid = TabularReader.read(&output, &map.sheet_name, None).unwrap();

    // 表头按列号升序
    assert_eq!(
        grid.row(0).unwrap(),
        &["Supplier", "Amount", "Qty", "Delivery"]
    );
    assert_eq!(grid.row_count(), records.len() + 1);

    let schema = InvoiceLine::schema();
    for (i, record) in records.iter().enumerate() {
        for (col, binding) in map.sorted_bindings().into_iter().enumerate() {
            let descriptor = schema.by_system_key(&binding.column.system_key).unwrap();
            let expected = record.get_field(&descriptor.property).unwrap();
            let actual = grid.get(i + 1, col).unwrap();

            match expected {
                FieldValue::Date(date) => {
                    assert_eq!(parse_date(actual), Some(date), "row {} col {}", i + 1, col);
                }
                other => assert_eq!(actual, other.to_string(), "row {} col {}", i + 1, col),
            }
        }
    }
}

#[test]
fn test_export_empty_record_set() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("empty.xlsx");
    let map = export_map();

    ExportWriter::default()
        .export_to_file::<InvoiceLine>(&map, &[], &output)
        .unwrap();

    let grid = TabularReader.read(&output, &map.sheet_name, None).unwrap();
    assert_eq!(grid.row_count(), 1);
    assert_eq!(grid.get(0, 3), Some("Delivery"));
}

#[test]
fn test_text_that_looks_numeric_is_kept_verbatim() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("references.xlsx");
    let map = export_map()
        .with_binding(ContentBinding::tabular(ColumnDefinition::new("Reference", "REF"), 5));

    let references = ["00123", "TRUE", "1e3", "12.50"];
    let records: Vec<InvoiceLine> = references
        .iter()
        .map(|r| InvoiceLine {
            supplier: Some("ACME".to_string()),
            reference: Some(r.to_string()),
            ..Default::default()
        })
        .collect();

    ExportWriter::default()
        .export_to_file(&map, &records, &output)
        .unwrap();

    let grid = TabularReader.read(&output, &map.sheet_name, None).unwrap();
    assert_eq!(grid.get(0, 4), Some("Reference"));
    let exported: Vec<&str> = (1..=references.len())
        .map(|row| grid.get(row, 4).unwrap())
        .collect();
    assert_eq!(exported, references);
}
