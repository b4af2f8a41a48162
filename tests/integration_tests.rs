use osha_lux::aggregate::sector::UnknownSector;
use osha_lux::classifier::{Category, RuleSet};
use osha_lux::error::PipelineError;
use osha_lux::input::read_filtered;
use osha_lux::output::{
    FILTERED_RECORDS, PENALTIES_CHART, SUMMARY_BY_SECTOR, SUMMARY_BY_TAG, SUMMARY_BY_YEAR,
    SUMMARY_BY_YEAR_SECTOR, SUMMARY_BY_YEAR_TAG, SUMMARY_FOCUS_SECTORS, VIOLATIONS_CHART,
};
use osha_lux::pipeline::{
    self, AggregateOptions, ClassifyOptions, PlotOptions, RunOptions,
};
use osha_lux::plot::{HEIGHT, WIDTH, YearWindow};
use osha_lux::records::{InspectionColumnNames, ViolationColumnNames};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};

const VIOLATIONS: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/osha_violation_sample.csv"
);
const INSPECTIONS: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/osha_inspection_sample.csv"
);

fn classify_options(inputs: &[&str], output_dir: &Path) -> ClassifyOptions {
    ClassifyOptions {
        inputs: inputs.iter().map(|s| s.to_string()).collect(),
        excludes: Vec::new(),
        columns: ViolationColumnNames::default(),
        rules: RuleSet::default(),
        output_dir: output_dir.to_path_buf(),
    }
}

fn run_options(output_dir: &Path) -> RunOptions {
    RunOptions {
        classify: classify_options(&[VIOLATIONS], output_dir),
        inspections: vec![INSPECTIONS.to_string()],
        inspection_columns: InspectionColumnNames::default(),
        unknown_sector: UnknownSector::Bucket,
        window: YearWindow::default(),
    }
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).expect("output file should exist")
}

fn png_size(path: &Path) -> (u32, u32) {
    let file = fs::File::open(path).expect("chart should exist");
    let reader = png::Decoder::new(std::io::BufReader::new(file))
        .read_info()
        .expect("chart should be a valid PNG");
    (reader.info().width, reader.info().height)
}

#[test]
fn test_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    pipeline::run(&run_options(dir.path())).expect("pipeline should succeed");

    assert_eq!(
        read(dir.path(), SUMMARY_BY_YEAR),
        "year,n_violations,total_penalty\n\
         2010,2,3700.00\n\
         2011,1,0.00\n\
         2012,3,4450.50\n"
    );

    assert_eq!(
        read(dir.path(), SUMMARY_BY_TAG),
        "category,n_records\n\
         explicit_low_light,2\n\
         code_based,2\n\
         egress_lighting,1\n\
         visibility_hazard,1\n"
    );

    assert_eq!(
        read(dir.path(), SUMMARY_BY_YEAR_SECTOR),
        "year,sector_code,sector,n_violations,total_penalty\n\
         2010,54,Office / Professional / Admin,1,1200.00\n\
         2010,61,Education,1,2500.00\n\
         2011,23,Construction,1,0.00\n\
         2012,49,Transportation & warehousing,1,1000.50\n\
         2012,54,Office / Professional / Admin,1,450.00\n\
         2012,unknown,Unknown,1,3000.00\n"
    );

    assert_eq!(
        read(dir.path(), SUMMARY_BY_SECTOR),
        "sector_code,sector,n_violations,total_penalty\n\
         23,Construction,1,0.00\n\
         49,Transportation & warehousing,1,1000.50\n\
         54,Office / Professional / Admin,2,1650.00\n\
         61,Education,1,2500.00\n\
         unknown,Unknown,1,3000.00\n"
    );

    assert_eq!(
        read(dir.path(), SUMMARY_FOCUS_SECTORS),
        "sector,n_violations,total_penalty\n\
         Office / Professional / Admin,2,1650.00\n\
         Education,1,2500.00\n"
    );

    let by_year_tag = read(dir.path(), SUMMARY_BY_YEAR_TAG);
    assert!(by_year_tag.starts_with("year,category,n_records\n"));
    assert!(by_year_tag.contains("2010,explicit_low_light,1\n"));
    assert!(by_year_tag.contains("2012,code_based,1\n"));

    for chart in [VIOLATIONS_CHART, PENALTIES_CHART] {
        assert_eq!(png_size(&dir.path().join(chart)), (WIDTH, HEIGHT));
    }
}

#[test]
fn test_filtered_records_keep_matched_rows_only() {
    let dir = tempfile::tempdir().unwrap();
    let report = pipeline::classify(&classify_options(&[VIOLATIONS], dir.path())).unwrap();

    assert_eq!(report.rows_read, 10);
    assert_eq!(report.matched, 6);
    assert_eq!(report.skipped.total(), 2);
    assert_eq!(report.skipped.count("bad_date"), 1);
    assert_eq!(report.skipped.count("bad_penalty"), 1);

    let (records, _) = read_filtered(&dir.path().join(FILTERED_RECORDS)).unwrap();
    let ids: Vec<&str> = records.iter().map(|r| r.activity_nr.as_str()).collect();
    assert_eq!(ids, vec!["1001", "1002", "1004", "1005", "1008", "1002"]);

    let categories: Vec<Category> = records.iter().map(|r| r.category).collect();
    assert_eq!(
        categories,
        vec![
            Category::CodeBased,
            Category::ExplicitLowLight,
            Category::ExplicitLowLight,
            Category::EgressLighting,
            Category::VisibilityHazard,
            Category::CodeBased,
        ]
    );

    // Keyword wins over the code path when both match.
    assert_eq!(records[2].standard, "19260056 A");
    assert_eq!(records[4].penalty.cents(), 100_050);
}

#[test]
fn test_year_counts_add_up_to_matched_records() {
    let dir = tempfile::tempdir().unwrap();
    let classified = pipeline::classify(&classify_options(&[VIOLATIONS], dir.path())).unwrap();
    let aggregated = pipeline::aggregate(&AggregateOptions {
        filtered: classified.filtered_path.clone(),
        inspections: Vec::new(),
        inspection_columns: InspectionColumnNames::default(),
        unknown_sector: UnknownSector::Bucket,
        output_dir: dir.path().to_path_buf(),
    })
    .unwrap();

    assert_eq!(aggregated.records, classified.matched);
    assert_eq!(aggregated.sectors, None);
    assert!(!dir.path().join(SUMMARY_BY_SECTOR).exists());

    let (records, _) = read_filtered(&classified.filtered_path).unwrap();
    let total_cents: i64 = records.iter().map(|r| r.penalty.cents()).sum();

    let mut rdr = csv::Reader::from_path(&aggregated.year_summary_path).unwrap();
    let mut n = 0u64;
    let mut cents = 0i64;
    for row in rdr.deserialize::<osha_lux::aggregate::YearSummary>() {
        let row = row.unwrap();
        n += row.n_violations;
        cents += row.total_penalty.cents();
    }
    assert_eq!(n as usize, classified.matched);
    assert_eq!(cents, total_cents);
}

#[test]
fn test_rerun_is_byte_identical() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    pipeline::run(&run_options(first.path())).unwrap();
    pipeline::run(&run_options(second.path())).unwrap();

    let mut names: Vec<PathBuf> = fs::read_dir(first.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    names.sort();
    assert_eq!(names.len(), 9);

    for path in names {
        let name = path.file_name().unwrap();
        assert_eq!(
            fs::read(&path).unwrap(),
            fs::read(second.path().join(name)).unwrap(),
            "{} differs between runs",
            name.to_string_lossy()
        );
    }
}

#[test]
fn test_drop_unknown_sector() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = run_options(dir.path());
    opts.unknown_sector = UnknownSector::Drop;
    pipeline::run(&opts).unwrap();

    let by_sector = read(dir.path(), SUMMARY_BY_SECTOR);
    assert!(!by_sector.contains("unknown"));
    assert_eq!(by_sector.lines().count(), 5);
}

#[test]
fn test_missing_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("osha_violation_missing.csv");
    let err = pipeline::classify(&classify_options(
        &[missing.to_str().unwrap()],
        dir.path(),
    ))
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::NoInputFiles { .. })
    ));
    assert!(!dir.path().join(FILTERED_RECORDS).exists());
}

#[test]
fn test_missing_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("osha_violation_nostd.csv");
    fs::write(
        &input,
        "activity_nr,issuance_date,initial_penalty\n1,2015-01-01,100\n",
    )
    .unwrap();

    let err = pipeline::classify(&classify_options(&[input.to_str().unwrap()], dir.path()))
        .unwrap_err();
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::MissingColumn { column, .. }) => assert_eq!(column, "standard"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_code_only_without_text_columns() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("osha_violation_codes.csv");
    fs::write(
        &input,
        "activity_nr,standard,issuance_date,initial_penalty\n\
         1,19100037 A03,2015-01-01,100\n\
         2,19100303 G02,2015-02-01,200\n\
         3,19260056,06/30/2016,300\n",
    )
    .unwrap();

    let report =
        pipeline::classify(&classify_options(&[input.to_str().unwrap()], dir.path())).unwrap();
    assert_eq!(report.matched, 2);
    assert_eq!(
        read(dir.path(), SUMMARY_BY_TAG),
        "category,n_records\ncode_based,2\n"
    );
}

#[test]
fn test_plot_window_with_no_years_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    pipeline::run(&run_options(dir.path())).unwrap();

    let err = pipeline::plot(&PlotOptions {
        summary: dir.path().join(SUMMARY_BY_YEAR),
        window: YearWindow {
            min: Some(2020),
            max: None,
        },
        output_dir: dir.path().join("late"),
    })
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::EmptySummary { .. })
    ));

    let charts = pipeline::plot(&PlotOptions {
        summary: dir.path().join(SUMMARY_BY_YEAR),
        window: YearWindow {
            min: Some(2011),
            max: Some(2012),
        },
        output_dir: dir.path().join("window"),
    })
    .unwrap();
    assert_eq!(charts.len(), 2);
    for chart in charts {
        assert_eq!(png_size(&chart), (WIDTH, HEIGHT));
    }
}

#[test]
fn test_no_matches_still_writes_headers() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("osha_violation_quiet.csv");
    fs::write(
        &input,
        "activity_nr,standard,issuance_date,initial_penalty,violation_description\n\
         1,19101030 D01,2015-01-01,100,Bloodborne pathogens plan missing\n\
         2,19100305 B01,2015-02-01,200,Extension cords hung below light fixtures\n",
    )
    .unwrap();

    let mut opts = run_options(dir.path());
    opts.classify = classify_options(&[input.to_str().unwrap()], dir.path());
    pipeline::run(&opts).unwrap();

    assert_eq!(
        read(dir.path(), FILTERED_RECORDS),
        "activity_nr,standard,issuance_date,year,penalty,category,narrative\n"
    );
    assert_eq!(read(dir.path(), SUMMARY_BY_TAG), "category,n_records\n");
    assert_eq!(
        read(dir.path(), SUMMARY_BY_YEAR),
        "year,n_violations,total_penalty\n"
    );
    assert_eq!(
        read(dir.path(), SUMMARY_FOCUS_SECTORS),
        "sector,n_violations,total_penalty\n"
    );
    assert!(!dir.path().join(VIOLATIONS_CHART).exists());
}
