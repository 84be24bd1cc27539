use std::fs;

use isp_workbook_parser::WorkbookError;
use isp_workbook_parser::config::{
    ConfigSource, load_config_dir, load_yaml, parse_yaml, resolve_sheet_names,
};
use isp_workbook_parser::io::source::MemoryWorkbook;
use isp_workbook_parser::locator::{HeaderRows, SkipRows, TableLocator};
use isp_workbook_parser::model::CellValue;
use isp_workbook_parser::parser::{Parser, TableSelection, suggest_table_name};
use isp_workbook_parser::version::detect_version;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

const GENERATOR_CONFIG: &str = r#"
existing_generator_summary:
  sheet_name: existing generators
  header_rows: 3
  end_row: 5
  column_range: "B:C"
existing_generator_ratings:
  sheet_name: Existing Generators
  header_rows: [2, 3]
  end_row: 5
  column_range: "B:C"
  skip_rows:
    start: 4
    end: 4
  columns_with_merged_rows: B
  forward_fill_values: false
"#;

const COST_CONFIG: &str = r#"
build_costs:
  sheet_name: Build costs
  header_rows: 1
  end_row: 4
  column_range: "A:B"
"#;

fn s(value: &str) -> CellValue {
    CellValue::String(value.to_string())
}

fn n(value: f64) -> CellValue {
    CellValue::Float(value)
}

const E: CellValue = CellValue::Empty;

fn workbook(version: f64) -> MemoryWorkbook {
    MemoryWorkbook::new()
        .with_sheet(
            "Change Log",
            vec![
                vec![s("Date"), s("Version")],
                vec![s("2023-12-01"), n(5.2)],
                vec![s("2024-08-01"), n(version)],
            ],
        )
        .with_sheet(
            "Existing Generators",
            vec![
                vec![],
                vec![],
                vec![E, s("Generator"), s("Capacity")],
                vec![E, s("Bayswater"), n(2640.0)],
                vec![E, s("Eraring"), n(2880.0)],
            ],
        )
        .with_sheet(
            "Build costs",
            vec![
                vec![s("Technology"), s("Cost")],
                vec![s("Wind"), n(2.5)],
                vec![s("Solar"), n(1.5)],
                vec![s("Notes:"), E],
            ],
        )
}

#[test]
fn locators_load_from_yaml() {
    let configs = parse_yaml(GENERATOR_CONFIG).expect("config parsed");
    assert_eq!(configs.len(), 2);

    let summary = &configs["existing_generator_summary"];
    assert_eq!(summary.header_rows(), &HeaderRows::Single(3));
    assert!(summary.forward_fill_values());

    let ratings = &configs["existing_generator_ratings"];
    assert_eq!(ratings.header_rows(), &HeaderRows::Multi(vec![2, 3]));
    assert_eq!(ratings.skip_rows(), Some(&SkipRows::Range { start: 4, end: 4 }));
    assert_eq!(ratings.columns_with_merged_rows(), ["B"]);
    assert!(!ratings.forward_fill_values());
    assert_eq!(ratings.skipped_data_indices().into_iter().collect::<Vec<_>>(), vec![0]);

    let round_trip = TableLocator::from_record(ratings.name(), ratings.to_record())
        .expect("record rebuilds");
    assert_eq!(&round_trip, ratings);
}

#[test]
fn empty_config_files_load_as_empty_maps() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("empty.yaml");
    fs::write(&path, "# nothing configured yet\n").expect("file written");
    assert!(load_yaml(&path).expect("empty file loads").is_empty());
}

#[test]
fn invalid_records_are_rejected() {
    let unknown_field = "t:\n  sheet_name: S\n  header_rows: 1\n  end_row: 2\n  column_range: A:B\n  colour: red\n";
    assert!(matches!(parse_yaml(unknown_field), Err(WorkbookError::Yaml(_))));

    let gap = "t:\n  sheet_name: S\n  header_rows: [1, 3]\n  end_row: 5\n  column_range: A:B\n";
    assert!(matches!(
        parse_yaml(gap),
        Err(WorkbookError::InvalidLocator { table, .. }) if table == "t"
    ));
}

#[test]
fn locator_construction_validates_its_fields() {
    assert!(TableLocator::new("t", "S", 0_u32, 5, "A:B").is_err());
    assert!(TableLocator::new("t", "S", vec![3_u32, 2], 5, "A:B").is_err());
    assert!(TableLocator::new("t", "S", Vec::<u32>::new(), 5, "A:B").is_err());
    assert!(TableLocator::new("t", "S", 4_u32, 3, "A:B").is_err());
    assert!(TableLocator::new("t", "S", 1_u32, 5, "C:A").is_err());
    assert!(TableLocator::new("t", "S", 1_u32, 5, "A-B").is_err());

    let locator = TableLocator::new("t", "S", 2_u32, 6, "B:D").expect("valid locator");
    assert!(locator.clone().with_skip_rows(2_u32).is_err());
    assert!(locator.clone().with_skip_rows(7_u32).is_err());
    assert!(locator.clone().with_skip_rows(vec![3_u32, 6]).is_ok());
    assert!(locator.clone().with_merged_columns(["E"]).is_err());
    assert!(locator.clone().with_merged_columns(["1"]).is_err());
    let merged = locator.with_merged_columns(["c"]).expect("column inside range");
    assert_eq!(merged.columns_with_merged_rows(), ["C"]);
    assert_eq!(merged.merged_column_offsets(), vec![1]);
    assert_eq!(merged.data_row_count(), 4);
}

#[test]
fn skip_row_ranges_are_checked_against_the_body_before_expanding() {
    let locator = TableLocator::new("t", "S", 2_u32, 6, "B:D").expect("valid locator");
    let runaway = locator.clone().with_skip_rows(SkipRows::Range {
        start: 4,
        end: 4_000_000_000,
    });
    assert!(matches!(
        runaway,
        Err(WorkbookError::InvalidLocator { reason, .. }) if reason.contains("4000000000")
    ));
    assert!(
        locator
            .clone()
            .with_skip_rows(SkipRows::Range { start: 2, end: 4 })
            .is_err()
    );
    let ranged = locator
        .with_skip_rows(SkipRows::Range { start: 3, end: 5 })
        .expect("range inside the body");
    assert_eq!(
        ranged.skipped_data_indices().into_iter().collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}

#[test]
fn config_directories_merge_files_and_reject_duplicates() {
    let dir = tempdir().expect("temporary directory");
    fs::write(dir.path().join("a_generators.yaml"), GENERATOR_CONFIG).expect("file written");
    fs::write(dir.path().join("b_costs.yml"), COST_CONFIG).expect("file written");
    fs::write(dir.path().join("README.md"), "not a config").expect("file written");

    let configs = load_config_dir(dir.path()).expect("directory loaded");
    assert_eq!(
        configs.keys().map(String::as_str).collect::<Vec<_>>(),
        ["build_costs", "existing_generator_ratings", "existing_generator_summary"]
    );

    fs::write(dir.path().join("c_again.yaml"), COST_CONFIG).expect("file written");
    assert!(matches!(
        load_config_dir(dir.path()),
        Err(WorkbookError::InvalidConfig(_))
    ));

    let file = dir.path().join("b_costs.yml");
    assert!(matches!(
        load_config_dir(&file),
        Err(WorkbookError::NotADirectory(_))
    ));
}

#[test]
fn sheet_names_resolve_case_insensitively() {
    let configs = parse_yaml(GENERATOR_CONFIG).expect("config parsed");
    let sheets = vec!["Change Log".to_string(), "Existing Generators".to_string()];
    let resolved = resolve_sheet_names(configs.clone(), &sheets).expect("sheets resolved");
    assert!(
        resolved
            .values()
            .all(|locator| locator.sheet_name() == "Existing Generators")
    );

    assert!(matches!(
        resolve_sheet_names(configs.clone(), &["Other".to_string()]),
        Err(WorkbookError::SheetNotFound { .. })
    ));
    let ambiguous = vec![
        "Existing Generators".to_string(),
        "EXISTING GENERATORS".to_string(),
    ];
    assert!(matches!(
        resolve_sheet_names(configs, &ambiguous),
        Err(WorkbookError::InvalidConfig(_))
    ));
}

#[test]
fn version_is_read_from_the_change_log() {
    assert_eq!(detect_version(&mut workbook(6.0)).expect("version"), "6.0");
    assert_eq!(detect_version(&mut workbook(5.25)).expect("version"), "5.25");
    assert!(matches!(
        detect_version(&mut MemoryWorkbook::new()),
        Err(WorkbookError::SheetNotFound { .. })
    ));
}

#[test]
fn versioned_config_roots_need_a_matching_directory() {
    let root = tempdir().expect("temporary directory");
    fs::create_dir(root.path().join("6.0")).expect("directory created");
    let source = ConfigSource::Versioned(root.path().to_path_buf());
    assert_eq!(
        source.resolve("6.0").expect("supported version"),
        root.path().join("6.0")
    );
    assert!(matches!(
        source.resolve("7.0"),
        Err(WorkbookError::UnsupportedVersion(version)) if version == "7.0"
    ));
}

#[test]
fn unknown_table_names_get_a_suggestion() {
    let names = vec![
        "build_costs".to_string(),
        "existing_generator_summary".to_string(),
    ];
    assert_eq!(
        suggest_table_name("build_cost", &names),
        Some("build_costs".to_string())
    );
    assert_eq!(
        suggest_table_name("Existing_Generator_Sumary", &names),
        Some("existing_generator_summary".to_string())
    );
    assert_eq!(suggest_table_name("zzz", &names), None);

    let tied = vec!["costs_a".to_string(), "costs_b".to_string()];
    assert_eq!(
        suggest_table_name("costs_c", &tied),
        Some("costs_a".to_string())
    );
}

#[test]
fn parser_lists_extracts_and_saves_tables() {
    let root = tempdir().expect("temporary directory");
    let version_dir = root.path().join("6.0");
    fs::create_dir(&version_dir).expect("directory created");
    fs::write(version_dir.join("generators.yaml"), GENERATOR_CONFIG).expect("file written");
    fs::write(version_dir.join("costs.yaml"), COST_CONFIG).expect("file written");

    let mut parser = Parser::new(
        workbook(6.0),
        ConfigSource::Versioned(root.path().to_path_buf()),
    )
    .expect("parser ready");
    assert_eq!(parser.version(), "6.0");
    assert_eq!(parser.config_path(), version_dir.as_path());

    let by_sheet = parser.table_names_by_sheet();
    assert_eq!(by_sheet["Build costs"], vec!["build_costs".to_string()]);
    assert_eq!(
        by_sheet["Existing Generators"],
        vec![
            "existing_generator_ratings".to_string(),
            "existing_generator_summary".to_string()
        ]
    );

    let summary = parser
        .get_table("existing_generator_summary", true)
        .expect("summary extracted");
    assert_eq!(summary.column_names(), ["Generator", "Capacity"]);
    assert_eq!(summary.height(), 2);

    match parser.get_table("existing_generator_sumary", true) {
        Err(WorkbookError::UnknownTable { suggestion, .. }) => {
            assert_eq!(suggestion.as_deref(), Some("existing_generator_summary"));
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let out = tempdir().expect("temporary directory");
    let written = parser
        .save_tables(
            out.path(),
            &TableSelection::Named(vec!["existing_generator_summary".to_string()]),
            true,
        )
        .expect("table saved");
    assert_eq!(written, vec![out.path().join("existing_generator_summary.csv")]);
    let csv = fs::read_to_string(&written[0])
        .expect("csv read")
        .replace("\r\n", "\n");
    assert_eq!(csv, "Generator,Capacity\nBayswater,2640\nEraring,2880\n");

    // build_costs runs into its notes row under checks; the others still save.
    let error = parser
        .save_tables(out.path(), &TableSelection::All, true)
        .expect_err("one table fails");
    match error {
        WorkbookError::TablesFailed { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, "build_costs");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(out.path().join("existing_generator_ratings.csv").exists());
    assert!(!out.path().join("build_costs.csv").exists());

    let not_a_dir = out.path().join("existing_generator_summary.csv");
    assert!(matches!(
        parser.save_tables(&not_a_dir, &TableSelection::All, false),
        Err(WorkbookError::NotADirectory(_))
    ));
}
