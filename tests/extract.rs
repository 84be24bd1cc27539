use isp_workbook_parser::error::Bound;
use isp_workbook_parser::extract::{ExtractOptions, extract, extract_all, extract_raw_region, extract_with};
use isp_workbook_parser::io::source::MemoryWorkbook;
use isp_workbook_parser::locator::{SkipRows, TableLocator};
use isp_workbook_parser::model::{CellValue, Value};
use isp_workbook_parser::sanitise::Sanitiser;
use isp_workbook_parser::WorkbookError;
use pretty_assertions::assert_eq;

fn s(value: &str) -> CellValue {
    CellValue::String(value.to_string())
}

fn n(value: f64) -> CellValue {
    CellValue::Float(value)
}

const E: CellValue = CellValue::Empty;

/// Title in B1, header in row 3, three generators, a blank row and a note.
fn generators() -> MemoryWorkbook {
    MemoryWorkbook::new()
        .with_sheet(
            "Generators",
            vec![
                vec![E, s("Existing generators")],
                vec![],
                vec![E, s("Generator"), s("Capacity"), s("Share")],
                vec![E, s("Bayswater"), n(2640.0), n(0.5)],
                vec![E, s("Eraring"), n(2880.0), n(0.25)],
                vec![E, s("Liddell"), s("-"), n(0.75)],
                vec![],
                vec![E, s("Notes:"), s("Capacity in MW")],
            ],
        )
        .with_number_format("Generators", 4, 4, "0%")
        .with_number_format("Generators", 5, 4, "0%")
        .with_number_format("Generators", 6, 4, "0.00%")
}

fn generator_locator(end_row: u32) -> TableLocator {
    TableLocator::new("existing_generators", "Generators", 3, end_row, "B:D")
        .expect("valid locator")
}

fn close(actual: &Value, expected: f64) -> bool {
    actual
        .as_f64()
        .is_some_and(|value| (value - expected).abs() < 1e-9)
}

#[test]
fn checked_extraction_returns_typed_columns() {
    let mut workbook = generators();
    let table = extract(&mut workbook, &generator_locator(6), true).expect("table extracted");

    assert_eq!(table.name, "existing_generators");
    assert_eq!(table.column_names(), ["Generator", "Capacity", "Share"]);
    assert_eq!(table.height(), 3);
    assert_eq!(
        table.column("Generator").expect("generator column").values,
        vec![
            Value::Text("Bayswater".into()),
            Value::Text("Eraring".into()),
            Value::Text("Liddell".into()),
        ]
    );
    assert_eq!(
        table.column("Capacity").expect("capacity column").values,
        vec![Value::Integer(2640), Value::Integer(2880), Value::Null]
    );
    let share = &table.column("Share").expect("share column").values;
    assert_eq!(share, &vec![Value::Float(50.0), Value::Float(25.0), Value::Float(75.0)]);
}

#[test]
fn percentages_are_rescaled_only_where_formatted() {
    let mut workbook = MemoryWorkbook::new()
        .with_sheet(
            "Mixed",
            vec![
                vec![s("Item"), s("Value")],
                vec![s("loss factor"), n(0.456914)],
                vec![s("plant count"), n(12.0)],
            ],
        )
        .with_number_format("Mixed", 2, 2, "0.00%");
    let locator = TableLocator::new("mixed", "Mixed", 1, 3, "A:B").expect("valid locator");
    let table = extract(&mut workbook, &locator, false).expect("table extracted");
    let values = &table.column("Value").expect("value column").values;
    assert!(close(&values[0], 45.6914), "got {:?}", values[0]);
    assert!(close(&values[1], 12.0), "got {:?}", values[1]);
}

#[test]
fn percentages_around_a_skipped_range_stay_on_their_rows() {
    let mut workbook = MemoryWorkbook::new()
        .with_sheet(
            "Losses",
            vec![
                vec![s("Item"), s("Value")],
                vec![s("transmission"), n(0.1)],
                vec![s("Subtotal"), n(0.9)],
                vec![s("Subtotal"), n(0.8)],
                vec![s("plant count"), n(0.2)],
                vec![s("distribution"), n(0.3)],
            ],
        )
        .with_number_format("Losses", 2, 2, "0%")
        .with_number_format("Losses", 3, 2, "0%")
        .with_number_format("Losses", 4, 2, "0%")
        .with_number_format("Losses", 6, 2, "0.0%");
    let locator = TableLocator::new("losses", "Losses", 1, 6, "A:B")
        .and_then(|locator| locator.with_skip_rows(SkipRows::Range { start: 3, end: 4 }))
        .expect("valid locator");

    let table = extract(&mut workbook, &locator, false).expect("table extracted");
    assert_eq!(
        table.column("Item").expect("item column").values,
        vec![
            Value::Text("transmission".into()),
            Value::Text("plant count".into()),
            Value::Text("distribution".into()),
        ]
    );
    let values = &table.column("Value").expect("value column").values;
    assert!(close(&values[0], 10.0), "got {:?}", values[0]);
    assert!(close(&values[1], 0.2), "got {:?}", values[1]);
    assert!(close(&values[2], 30.0), "got {:?}", values[2]);
}

#[test]
fn single_header_tables_keep_blank_cells_empty() {
    let mut workbook = MemoryWorkbook::new().with_sheet(
        "Units",
        vec![
            vec![s("Generator"), s("Capacity")],
            vec![s("Bayswater"), n(2640.0)],
            vec![s("Eraring"), E],
        ],
    );
    let locator = TableLocator::new("units", "Units", 1, 3, "A:B").expect("valid locator");
    assert!(locator.forward_fill_values());

    let table = extract(&mut workbook, &locator, false).expect("table extracted");
    assert_eq!(
        table.column("Capacity").expect("capacity column").values,
        vec![Value::Integer(2640), Value::Null]
    );
}

#[test]
fn skipped_rows_are_excluded_from_the_body() {
    let fuels = [
        "Black coal", "Brown coal", "Gas", "Hydro", "Wind", "Solar", "Battery", "Biomass", "Diesel",
    ];
    let mut rows: Vec<Vec<CellValue>> = vec![vec![]; 6];
    rows.push(vec![E, s("Fuel"), s("Value")]);
    rows.push(vec![E, s("Coal"), n(1.0)]);
    rows.push(vec![E, s("Coal"), n(2.0)]);
    for (index, fuel) in fuels.iter().enumerate() {
        rows.push(vec![E, s(fuel), n(index as f64)]);
    }
    rows.push(vec![E, s("Coal"), n(99.0)]);
    let mut workbook = MemoryWorkbook::new().with_sheet("Fuels", rows);

    let locator = TableLocator::new("fuels", "Fuels", 7, 19, "B:C")
        .and_then(|locator| locator.with_skip_rows(vec![8_u32, 9, 19]))
        .expect("valid locator");
    let table = extract(&mut workbook, &locator, false).expect("table extracted");

    assert_eq!(table.height(), 9);
    let names = &table.column("Fuel").expect("fuel column").values;
    assert!(!names.contains(&Value::Text("Coal".into())));
    assert_eq!(names[0], Value::Text("Black coal".into()));
}

#[test]
fn merged_columns_fill_down_and_values_fill_across() {
    let mut workbook = MemoryWorkbook::new().with_sheet(
        "Regions",
        vec![
            vec![s("Region"), s("Generator"), s("Output"), E],
            vec![E, E, s("2024"), s("2025")],
            vec![s("NSW"), s("Bayswater"), n(1.0), E],
            vec![E, s("Eraring"), n(2.0), n(3.0)],
            vec![s("QLD"), s("Callide"), n(5.0), n(4.0)],
        ],
    );
    let locator = TableLocator::new("regions", "Regions", vec![1_u32, 2], 5, "A:D")
        .and_then(|locator| locator.with_merged_columns(["A"]))
        .expect("valid locator");

    let table = extract(&mut workbook, &locator, false).expect("table extracted");
    assert_eq!(
        table.column("Region").expect("region column").values,
        vec![
            Value::Text("NSW".into()),
            Value::Text("NSW".into()),
            Value::Text("QLD".into()),
        ]
    );
    assert_eq!(
        table.column("Output_2025").expect("2025 column").values,
        vec![Value::Integer(1), Value::Integer(3), Value::Integer(4)]
    );
    assert_eq!(
        table.column("Output_2024").expect("2024 column").values,
        vec![Value::Integer(1), Value::Integer(2), Value::Integer(5)]
    );

    let locator = locator.with_forward_fill_values(false);
    let table = extract(&mut workbook, &locator, false).expect("table extracted");
    assert_eq!(
        table.column("Output_2025").expect("2025 column").values,
        vec![Value::Null, Value::Integer(3), Value::Integer(4)]
    );
}

#[test]
fn multi_row_headers_are_joined() {
    let mut workbook = MemoryWorkbook::new().with_sheet(
        "Ratings",
        vec![
            vec![],
            vec![E, s("Name"), s("Rating (MW)"), E],
            vec![E, E, s("Summer"), s("Winter")],
            vec![E, s("Unit 1"), n(660.0), n(680.0)],
        ],
    );
    let locator =
        TableLocator::new("ratings", "Ratings", vec![2_u32, 3], 4, "B:D").expect("valid locator");
    let table = extract(&mut workbook, &locator, true).expect("table extracted");
    assert_eq!(
        table.column_names(),
        ["Name", "Rating (MW)_Summer", "Rating (MW)_Winter"]
    );
    assert_eq!(table.height(), 1);
}

#[test]
fn custom_sanitiser_is_used_for_headers_and_values() {
    let mut workbook = MemoryWorkbook::new().with_sheet(
        "Plants",
        vec![vec![s("Plant kind")], vec![s("Batery")]],
    );
    let locator = TableLocator::new("plants", "Plants", 1, 2, "A:A").expect("valid locator");
    let options = ExtractOptions::default()
        .with_sanitiser(Sanitiser::default().with_correction("Batery", "Battery"));
    let table = extract_with(&mut workbook, &locator, &options).expect("table extracted");
    assert_eq!(
        table.column("Plant kind").expect("kind column").values,
        vec![Value::Text("Battery".into())]
    );
}

#[test]
fn raw_regions_are_read_without_casting() {
    let mut workbook = generators();
    let region =
        extract_raw_region(&mut workbook, "Generators", 4..=5, "B:C").expect("region read");
    assert_eq!(region.first_row, 4);
    assert_eq!(
        region.rows,
        vec![vec![s("Bayswater"), n(2640.0)], vec![s("Eraring"), n(2880.0)]]
    );
    assert!(matches!(
        extract_raw_region(&mut workbook, "Generators", 4..=5, "D:B"),
        Err(WorkbookError::InvalidColumn(_))
    ));
}

#[test]
fn regions_past_the_sheet_fail_with_the_table_name() {
    let mut workbook = generators();
    for checks in [true, false] {
        let error = extract(&mut workbook, &generator_locator(20), checks)
            .expect_err("region is out of bounds");
        match error {
            WorkbookError::RegionOutOfBounds {
                table,
                bound,
                requested,
                limit,
            } => {
                assert_eq!(table, "existing_generators");
                assert_eq!(bound, Bound::EndRow);
                assert_eq!(requested, 20);
                assert_eq!(limit, 8);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn unknown_sheets_are_reported() {
    let mut workbook = generators();
    let locator =
        TableLocator::new("missing", "Nowhere", 1, 2, "A:B").expect("valid locator");
    assert!(matches!(
        extract(&mut workbook, &locator, false),
        Err(WorkbookError::SheetNotFound { sheet }) if sheet == "Nowhere"
    ));
}

#[test]
fn extract_all_keeps_going_after_a_failure() {
    let mut workbook = generators();
    let locators = [generator_locator(5), generator_locator(6)];
    let results = extract_all(&mut workbook, &locators, true);
    assert_eq!(results.len(), 2);
    assert!(matches!(results[0].1, Err(WorkbookError::DataOverrun { .. })));
    assert!(results[1].1.is_ok());
}
