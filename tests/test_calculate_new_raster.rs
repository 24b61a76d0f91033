use habsuit::io::ascii_grid::read_ascii_grid;
use habsuit::{calculate_new_raster, FaultPolicy, HabError, RunConfig, NO_DATA};
use ndarray::array;
use std::fs;
use std::path::Path;

const DEPTH_LU: &str = "\
MinDepth,MaxDepth,Min_Score,Max_Score,Fish_Stage
0,2,0,1,MWFs
2,6,1,0.5,MWFs
6,10,0.5,0,MWFs
0,10,0.2,0.2,MWFj
";

const BASE_RASTER: &str = "\
ncols 4
nrows 3
xllcorner 561000
yllcorner 4827000
cellsize 2
NODATA_value -9999
-9999 1 2 4
0 6 8 10
-9999 -9999 3 9
";

const UTM_11N: &str = "PROJCS[\"NAD_1983_UTM_Zone_11N\",GEOGCS[\"GCS_North_American_1983\"]]";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn write_inputs(dir: &Path, base: &str) -> RunConfig {
    let base_path = dir.join("Test_Raster.asc");
    fs::write(&base_path, base).unwrap();
    fs::write(dir.join("Test_Raster.prj"), UTM_11N).unwrap();
    let table_path = dir.join("DepthLU.csv");
    fs::write(&table_path, DEPTH_LU).unwrap();

    RunConfig::new(base_path, dir.join("OutPut_Raster_MWFs_.asc"), table_path, "MWFs")
}

#[test]
fn test_scores_written_with_source_framing() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = write_inputs(dir.path(), BASE_RASTER);

    let summary = calculate_new_raster(&config).unwrap();
    assert_eq!((summary.rows, summary.cols), (3, 4));
    assert_eq!(summary.no_data_cells, 3);
    assert_eq!(summary.scored_cells, 9);
    assert_eq!(summary.range_count, 3);

    let output = read_ascii_grid(&config.output_raster_path, NO_DATA).unwrap();
    assert_eq!(
        output.grid,
        array![
            [NO_DATA, 0.5, 1.0, 0.75],
            [0.0, 0.5, 0.25, 0.0],
            [NO_DATA, NO_DATA, 0.875, 0.125]
        ]
    );

    let base = read_ascii_grid(&config.base_raster_path, NO_DATA).unwrap();
    assert_eq!(output.frame, base.frame);
    assert_eq!(output.frame.spatial_reference, UTM_11N);
}

#[test]
fn test_spatial_reference_override() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_inputs(dir.path(), BASE_RASTER);
    config.spatial_reference = Some("EPSG:26911".to_string());

    calculate_new_raster(&config).unwrap();

    let prj = fs::read_to_string(dir.path().join("OutPut_Raster_MWFs_.prj")).unwrap();
    assert_eq!(prj, "EPSG:26911");
}

#[test]
fn test_out_of_table_depth_fails_without_output() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let base = BASE_RASTER.replace("-9999 -9999 3 9", "-9999 12.5 3 9");
    let mut config = write_inputs(dir.path(), &base);
    config.remap.policy = FaultPolicy::CollectAll;

    let err = calculate_new_raster(&config).unwrap_err();
    match err {
        HabError::Faults(report) => {
            assert_eq!(report.len(), 1);
            assert_eq!((report.faults[0].row, report.faults[0].col), (2, 1));
            assert_eq!(report.faults[0].value, 12.5);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!config.output_raster_path.exists());
}

#[test]
fn test_unknown_stage_fails_on_first_data_cell() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_inputs(dir.path(), BASE_RASTER);
    config.fish_stage = "mwfs".to_string();

    let err = calculate_new_raster(&config).unwrap_err();
    assert!(matches!(err, HabError::LookupMiss { row: 0, col: 1, .. }));
}

#[test]
fn test_missing_lookup_table_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_inputs(dir.path(), BASE_RASTER);
    config.lookup_table_path = dir.path().join("missing.csv");

    let err = calculate_new_raster(&config).unwrap_err();
    assert!(matches!(err, HabError::Csv(_)));
    assert!(!err.is_cell_fault());
}

#[test]
fn test_existing_output_kept_when_overwrite_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_inputs(dir.path(), BASE_RASTER);
    fs::write(&config.output_raster_path, "placeholder").unwrap();
    config.overwrite_output = false;

    let err = calculate_new_raster(&config).unwrap_err();
    assert!(matches!(err, HabError::Config(_)));
    assert_eq!(fs::read_to_string(&config.output_raster_path).unwrap(), "placeholder");
}
