use approx::assert_relative_eq;
use habsuit::core::{build_range_table, score_cell, CellOutcome};
use habsuit::{FaultPolicy, Grid, HabError, RangeRow, RemapParams, RemapProcessor, NO_DATA};
use ndarray::{array, Array2};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn depth_table() -> Vec<RangeRow> {
    vec![
        RangeRow::new(0.0, 0.5, 0.0, 0.3, "MWFs"),
        RangeRow::new(0.5, 1.5, 0.3, 1.0, "MWFs"),
        RangeRow::new(1.5, 4.0, 1.0, 0.6, "MWFs"),
        RangeRow::new(4.0, 20.0, 0.6, 0.0, "MWFs"),
        RangeRow::new(0.0, 20.0, 1.0, 1.0, "MWFj"),
    ]
}

fn processor(parallel: bool) -> RemapProcessor {
    RemapProcessor::with_params(RemapParams {
        parallel,
        ..RemapParams::default()
    })
}

fn depth_grid(rows: usize, cols: usize) -> Grid {
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        if (r * cols + c) % 5 == 0 {
            NO_DATA
        } else {
            ((r * 31 + c * 17) % 200) as f64 / 10.0
        }
    })
}

#[test]
fn test_example_scenario() {
    init_logging();
    let table = build_range_table(vec![RangeRow::new(0.0, 10.0, 0.0, 1.0, "MWFs")], "MWFs");
    let grid = array![[-1.0, 5.0], [0.0, 10.0]];

    let output = processor(false).remap(&grid, &table).unwrap();
    assert_eq!(output, array![[-1.0, 0.5], [0.0, 1.0]]);
}

#[test]
fn test_no_data_preserved_and_shape_kept() {
    init_logging();
    let table = build_range_table(depth_table(), "MWFs");
    let grid = depth_grid(40, 27);

    let output = processor(false).remap(&grid, &table).unwrap();
    assert_eq!(output.dim(), grid.dim());
    for (input, score) in grid.iter().zip(output.iter()) {
        if *input == NO_DATA {
            assert_eq!(*score, NO_DATA);
        } else {
            assert!((0.0..=1.0).contains(score), "score {} out of range", score);
        }
    }
}

#[test]
fn test_interpolation_endpoints() {
    let table = build_range_table(depth_table(), "MWFs");
    for entry in table.entries() {
        let low = score_cell(entry.interval.min_depth, &table, NO_DATA);
        let high = score_cell(entry.interval.max_depth, &table, NO_DATA);

        // shared boundaries resolve to the earlier interval, whose upper score matches
        match low {
            CellOutcome::Scored(s) => {
                let owner = table.lookup(entry.interval.min_depth).unwrap();
                let expected = if owner.interval == entry.interval {
                    entry.scores.min_score
                } else {
                    owner.scores.max_score
                };
                assert_relative_eq!(s, expected, epsilon = 1e-12);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        match high {
            CellOutcome::Scored(s) => assert_relative_eq!(s, entry.scores.max_score, epsilon = 1e-12),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}

#[test]
fn test_interpolation_linearity() {
    let table = build_range_table(depth_table(), "MWFs");
    for &x in &[0.1, 0.75, 1.2, 2.0, 3.999, 7.5, 19.0] {
        let entry = table.lookup(x).unwrap();
        let (a, b) = (entry.interval.min_depth, entry.interval.max_depth);
        let (s0, s1) = (entry.scores.min_score, entry.scores.max_score);
        let expected = s0 + ((x - a) / (b - a)) * (s1 - s0);
        assert_eq!(score_cell(x, &table, NO_DATA), CellOutcome::Scored(expected));
    }
}

#[test]
fn test_overlapping_intervals_use_first_inserted() {
    let rows = vec![
        RangeRow::new(2.0, 8.0, 0.0, 1.0, "MWFs"),
        RangeRow::new(0.0, 10.0, 1.0, 0.0, "MWFs"),
    ];
    let table = build_range_table(rows, "MWFs");
    assert_eq!(score_cell(5.0, &table, NO_DATA), CellOutcome::Scored(0.5));
    assert_eq!(score_cell(1.0, &table, NO_DATA), CellOutcome::Scored(0.9));
}

#[test]
fn test_category_filtering() {
    let table = build_range_table(depth_table(), "MWFj");
    assert_eq!(table.len(), 1);
    assert!(table.entries().iter().all(|e| e.scores.min_score == 1.0));

    let empty = build_range_table(depth_table(), "Spawning");
    assert!(empty.is_empty());
}

#[test]
fn test_empty_table_faults_on_data_cells_only() {
    let empty = build_range_table(depth_table(), "Spawning");

    let all_no_data = Array2::from_elem((3, 3), NO_DATA);
    let output = processor(false).remap(&all_no_data, &empty).unwrap();
    assert_eq!(output, all_no_data);

    let err = processor(false).remap(&array![[NO_DATA, 0.2]], &empty).unwrap_err();
    assert!(matches!(err, HabError::LookupMiss { row: 0, col: 1, .. }));
}

#[test]
fn test_lookup_miss_surfaces() {
    let table = build_range_table(vec![RangeRow::new(0.0, 10.0, 0.0, 1.0, "MWFs")], "MWFs");
    let err = processor(false).remap(&array![[1.0, 15.0]], &table).unwrap_err();
    match err {
        HabError::LookupMiss { row, col, value } => {
            assert_eq!((row, col, value), (0, 1, 15.0));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_degenerate_interval_surfaces() {
    let table = build_range_table(vec![RangeRow::new(5.0, 5.0, 0.2, 0.8, "MWFs")], "MWFs");
    let err = processor(false).remap(&array![[5.0]], &table).unwrap_err();
    assert!(matches!(
        err,
        HabError::DegenerateInterval { row: 0, col: 0, depth, .. } if depth == 5.0
    ));
}

#[test]
fn test_parallel_and_sequential_agree() {
    init_logging();
    let table = build_range_table(depth_table(), "MWFs");
    let grid = depth_grid(128, 77);

    let sequential = processor(false).remap(&grid, &table).unwrap();
    let parallel = processor(true).remap(&grid, &table).unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn test_fault_reporting_is_deterministic() {
    let table = build_range_table(vec![RangeRow::new(0.0, 10.0, 0.0, 1.0, "MWFs")], "MWFs");
    let mut grid = depth_grid(50, 20).mapv(|v| if v == NO_DATA { v } else { v / 2.0 });
    grid[[7, 3]] = 42.0;
    grid[[31, 0]] = 11.0;
    grid[[31, 19]] = -3.0;

    for parallel in [false, true] {
        let err = processor(parallel).remap(&grid, &table).unwrap_err();
        assert!(matches!(err, HabError::LookupMiss { row: 7, col: 3, .. }));

        let collect = RemapProcessor::with_params(RemapParams {
            parallel,
            policy: FaultPolicy::CollectAll,
            ..RemapParams::default()
        });
        match collect.remap(&grid, &table).unwrap_err() {
            HabError::Faults(report) => {
                let coords: Vec<_> = report.faults.iter().map(|f| (f.row, f.col)).collect();
                assert_eq!(coords, vec![(7, 3), (31, 0), (31, 19)]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
