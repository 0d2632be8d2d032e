use data_sweeper::data::cleaner::{self, CleaningOptions};
use data_sweeper::data::export::{self, ExportFormat};
use data_sweeper::data::loader;
use data_sweeper::data::model::{Column, Table, UploadedFile, Value};
use data_sweeper::data::select::{self, ColumnSelection};
use data_sweeper::pipeline::{self, BatchOptions, BatchSummary, Reporter, SkipReason, Silent};
use data_sweeper::SweepError;

fn people() -> Table {
    Table::new(vec![
        Column::new(
            "Name",
            vec![
                Value::String("John".into()),
                Value::String("Alice".into()),
                Value::String("John".into()),
                Value::Null,
            ],
        ),
        Column::new(
            "Age",
            vec![
                Value::Integer(32),
                Value::Integer(28),
                Value::Integer(32),
                Value::Integer(40),
            ],
        ),
        Column::new(
            "Salary",
            vec![
                Value::Float(55000.5),
                Value::Null,
                Value::Float(55000.5),
                Value::Float(61000.25),
            ],
        ),
        Column::new(
            "Active",
            vec![
                Value::Bool(true),
                Value::Bool(false),
                Value::Bool(true),
                Value::Bool(true),
            ],
        ),
    ])
    .unwrap()
}

#[test]
fn selecting_all_columns_is_identity() {
    let table = people();
    let selected = select::select_columns(table.clone(), &ColumnSelection::all(&table)).unwrap();
    assert_eq!(selected, table);
}

#[test]
fn selection_preserves_row_count() {
    let table = people();
    for names in [vec![], vec!["Age"], vec!["Salary", "Name"]] {
        let selected =
            select::select_columns(table.clone(), &ColumnSelection::new(names)).unwrap();
        assert_eq!(selected.n_rows(), table.n_rows());
    }
}

#[test]
fn unknown_column_returns_no_table() {
    let result = select::select_columns(people(), &ColumnSelection::new(["Foo"]));
    assert_eq!(result, Err(SweepError::UnknownColumn("Foo".to_string())));
}

#[test]
fn deduplication_twice_removes_nothing_more() {
    let options = CleaningOptions {
        remove_duplicates: true,
        fill_missing_numeric: false,
    };
    let (once, first) = cleaner::clean(people(), options);
    let (twice, second) = cleaner::clean(once.clone(), options);
    assert_eq!(first.duplicates_removed, 1);
    assert_eq!(second.duplicates_removed, 0);
    assert_eq!(once, twice);
}

#[test]
fn mean_fill_uses_non_missing_values() {
    let table = loader::load_csv(b"k,v\na,10\nb,\nc,20\nd,30\n").unwrap();
    let (cleaned, _) = cleaner::clean(
        table,
        CleaningOptions {
            remove_duplicates: false,
            fill_missing_numeric: true,
        },
    );
    assert_eq!(cleaned.column("v").unwrap().values()[1], Value::Float(20.0));
}

#[test]
fn csv_round_trip_keeps_columns_rows_and_values() {
    let table = people();
    let result = export::export(&table, ExportFormat::Csv, "x.csv").unwrap();
    assert_eq!(result.file_name, "x.csv");
    let reloaded = loader::load(&UploadedFile::new(result.file_name, result.buffer)).unwrap();
    assert_eq!(reloaded, table);
}

#[test]
fn excel_round_trip_keeps_columns_rows_and_values() {
    let table = people();
    let result = export::export(&table, ExportFormat::Excel, "people.csv").unwrap();
    assert_eq!(result.file_name, "people.xlsx");
    let reloaded = loader::load(&UploadedFile::new(result.file_name, result.buffer)).unwrap();
    assert_eq!(reloaded.column_names(), table.column_names());
    assert_eq!(reloaded.n_rows(), table.n_rows());
    assert_eq!(reloaded, table);
}

#[test]
fn txt_upload_is_unsupported() {
    let err = loader::load(&UploadedFile::new("report.txt", b"a\n1\n".to_vec())).unwrap_err();
    assert_eq!(
        err,
        SweepError::UnsupportedFormat {
            extension: ".txt".to_string()
        }
    );
}

#[derive(Default)]
struct Events {
    warnings: Vec<String>,
    downloads: Vec<String>,
    completed: usize,
}

impl Reporter for Events {
    fn skipped(&mut self, skipped: &pipeline::SkippedFile) {
        self.warnings.push(skipped.file_name.clone());
    }

    fn exported(&mut self, result: &export::ExportResult) {
        self.downloads.push(result.file_name.clone());
    }

    fn completed(&mut self, _summary: &BatchSummary) {
        self.completed += 1;
    }
}

#[test]
fn empty_file_in_the_middle_is_skipped() {
    let files = vec![
        UploadedFile::new("one.csv", b"a,b\n1,2\n".to_vec()),
        UploadedFile::new("two.csv", b"a,b\n".to_vec()),
        UploadedFile::new("three.csv", b"a,b\n3,4\n".to_vec()),
    ];
    let mut events = Events::default();
    let summary = pipeline::run_batch(&files, &BatchOptions::default(), &mut events);

    assert_eq!(summary.exported.len(), 2);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].reason, SkipReason::Empty);
    assert_eq!(events.warnings, vec!["two.csv"]);
    assert_eq!(events.downloads, vec!["one.csv", "three.csv"]);
    assert_eq!(events.completed, 1);
}

#[test]
fn failures_never_abort_the_batch() {
    let files = vec![
        UploadedFile::new("notes.txt", b"hello".to_vec()),
        UploadedFile::new("broken.xlsx", b"garbage".to_vec()),
        UploadedFile::new("ok.csv", b"n\n1\n2\n".to_vec()),
    ];
    let options = BatchOptions {
        format: ExportFormat::Excel,
        ..BatchOptions::default()
    };
    let summary = pipeline::run_batch(&files, &options, &mut Silent);
    assert_eq!(summary.skipped.len(), 2);
    assert!(matches!(
        summary.skipped[0].reason,
        SkipReason::Error(SweepError::UnsupportedFormat { .. })
    ));
    assert!(matches!(
        summary.skipped[1].reason,
        SkipReason::Error(SweepError::LoadFailure(_))
    ));
    assert_eq!(summary.exported.len(), 1);
    assert_eq!(summary.exported[0].file_name, "ok.xlsx");
    assert_eq!(
        summary.exported[0].media_type,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
}

#[test]
fn text_cells_are_exported_exactly_as_read() {
    let table = loader::load_csv(b"code\n007\n1e3\nTRUE\n 5\nA12\n").unwrap();
    let result = export::export(&table, ExportFormat::Csv, "x.csv").unwrap();
    assert_eq!(
        String::from_utf8(result.buffer).unwrap(),
        "code\n007\n1e3\nTRUE\n 5\nA12\n"
    );
}

#[test]
fn export_failure_skips_only_that_file() {
    // A cell longer than a spreadsheet allows cannot be written to .xlsx.
    let long_cell = format!("name\n{}\n", "x".repeat(40_000));
    let files = vec![
        UploadedFile::new("long.csv", long_cell.into_bytes()),
        UploadedFile::new("short.csv", b"name\nann\n".to_vec()),
    ];
    let options = BatchOptions {
        format: ExportFormat::Excel,
        ..BatchOptions::default()
    };
    let mut events = Events::default();
    let summary = pipeline::run_batch(&files, &options, &mut events);

    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].file_name, "long.csv");
    assert!(matches!(
        summary.skipped[0].reason,
        SkipReason::Error(SweepError::ExportFailure(_))
    ));
    assert_eq!(events.downloads, vec!["short.xlsx"]);
    assert_eq!(summary.exported.len(), 1);
    assert_eq!(summary.exported[0].file_name, "short.xlsx");
}

#[test]
fn workbook_without_cells_is_skipped_as_empty() {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    workbook.add_worksheet();
    let buffer = workbook.save_to_buffer().unwrap();

    let file = UploadedFile::new("blank.xlsx", buffer);
    let table = loader::load(&file).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.n_columns(), 0);

    let files = vec![file, UploadedFile::new("ok.csv", b"a\n1\n".to_vec())];
    let summary = pipeline::run_batch(&files, &BatchOptions::default(), &mut Silent);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].file_name, "blank.xlsx");
    assert_eq!(summary.skipped[0].reason, SkipReason::Empty);
    assert_eq!(summary.exported.len(), 1);
}
