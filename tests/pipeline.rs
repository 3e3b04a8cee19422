use std::fs;

use scour_tools::core::units::{ConversionTable, Unit};
use scour_tools::core::writers::LogMode;
use scour_tools::experiment::{Experiment, ProcessOptions};
use scour_tools::processors::alignment::CorrectionCurve;
use scour_tools::processors::baseline::{BaselineCorrector, SensorKind};
use scour_tools::processors::gaps::fill_gaps;
use scour_tools::processors::thresholds::{apply_rules, Comparison, ThresholdRule};
use scour_tools::{PipelineConfig, PointCloud, ScourSurface, StructureFootprint, TimeSeries};
use tempfile::tempdir;

#[test]
fn gap_threshold_baseline_scenario() {
    let mut values = vec![10.0, 10.0, f64::NAN, f64::NAN, 10.0, 10.0];
    assert_eq!(fill_gaps(&mut values, Some(3)), 2);
    assert_eq!(values[2], 10.0);
    assert_eq!(values[3], 10.0);

    let table = ConversionTable::default();
    let mut series = TimeSeries::new(vec![1.0, 2.0, 3.0], vec![5.0, 15.0, 8.0], Unit::Millimeter)
        .unwrap();
    let rule = ThresholdRule {
        time_start: 0.0,
        time_end: 10.0,
        unit: Unit::Millimeter,
        comparison: Comparison::Greater,
        limit: 12.0,
    };
    assert_eq!(apply_rules(&mut series, &[rule], &table).unwrap(), 1);
    assert_eq!(series.values()[0], 5.0);
    assert!(series.values()[1].is_nan());
    assert_eq!(series.values()[2], 8.0);

    let mut surface = TimeSeries::new(
        vec![0.0, 1.0, 2.0, 3.0],
        vec![100.0, 100.0, 90.0, 80.0],
        Unit::Millimeter,
    )
    .unwrap();
    let corrector = BaselineCorrector::new(SensorKind::SurfaceElevation, 2.0);
    corrector.apply(&mut surface).unwrap();
    assert_eq!(surface.values(), &[0.0, 0.0, 10.0, 20.0]);

    // one-way: a second pass is not a no-op, a reset restores the first result
    corrector.apply(&mut surface).unwrap();
    assert_ne!(surface.values(), &[0.0, 0.0, 10.0, 20.0]);
    surface.reset();
    corrector.apply(&mut surface).unwrap();
    assert_eq!(surface.values(), &[0.0, 0.0, 10.0, 20.0]);
}

#[test]
fn curve_extrapolates_past_last_point() {
    let curve = CorrectionCurve::new(vec![0.0, 10.0], vec![0.0, 5.0], Unit::Centimeter).unwrap();
    assert!((curve.depth_at(15.0) - 7.5).abs() < 1e-12);
}

#[test]
fn experiment_end_to_end() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("SC-H2-A1");
    fs::create_dir_all(root.join("Scour Depth")).unwrap();
    fs::create_dir_all(root.join("LiDAR")).unwrap();

    // US1 reads 100 mm dry, then the water surface rises 5 mm per second
    let mut raw = String::from("title\n");
    for i in 0..10 {
        let us = if i < 3 { 100.0 } else { 100.0 - 5.0 * (i - 2) as f64 };
        raw.push_str(&format!("{} {} 0 0 0 0 0.2 0 0\n", i, us));
    }
    let raw_path = root.join("logger.txt");
    fs::write(&raw_path, raw).unwrap();
    fs::write(
        root.join("Reach Times.csv"),
        "Instrument,Reach Time\nUS1,3\nADV-x,3\n",
    )
    .unwrap();
    fs::write(
        root.join("Scour Depth").join("US1.csv"),
        "Time,Scour depth,Unit\n0,0,cm\n9,0.9,cm\n",
    )
    .unwrap();

    let mut exp = Experiment::new(&root, PipelineConfig::default()).unwrap();
    exp.load_raw(&raw_path, None).unwrap();
    exp.load_supporting().unwrap();
    let summary = exp
        .process(&ProcessOptions {
            correct_depth: true,
            ..ProcessOptions::default()
        })
        .unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.depth_corrected, 1);

    let us1 = exp.instrument("US1").unwrap().series().values().to_vec();
    // depth 5 mm at t=3 plus 0.3 cm (3 mm) of scour
    assert!((us1[3] - 8.0).abs() < 1e-9);
    assert_eq!(us1[0], 0.0);
    let adv = exp.instrument("ADV-x").unwrap().series().values().to_vec();
    assert_eq!(&adv[..3], &[0.0, 0.0, 0.0]);
    assert_eq!(adv[3], 0.2);

    exp.save_processed(false).unwrap();
    assert!(root.join("Processed Data").join("US1.csv").exists());

    // flat bed at -2 cm, sampled in meters
    let mut cloud_text = String::from("X,Y,Z\n");
    for i in 1..60 {
        for j in 1..25 {
            cloud_text.push_str(&format!(
                "{},{},{}\n",
                i as f64 * 0.05,
                -1.4 + j as f64 * 0.05,
                -0.02
            ));
        }
    }
    fs::write(root.join("LiDAR").join("Point Cloud.txt"), cloud_text).unwrap();

    let mut config = PipelineConfig::default();
    config.grid.columns = 200;
    config.grid.rows = 100;
    let mut exp = Experiment::new(&root, config).unwrap();
    let surface = exp.build_surface().unwrap();
    assert!(surface.depth_at(1.95, -0.75).is_nan());

    let depth = exp
        .record_final_scour(&surface, "US1", 1.0, -0.75, LogMode::Truncate)
        .unwrap();
    assert!((depth + 2.0).abs() < 1e-6);
    let log = fs::read_to_string(root.join("Scour Depth").join("Final Scour Depth.csv")).unwrap();
    assert!(log.starts_with("US1,-"));
}

#[test]
fn footprint_mask_covers_interior_only() {
    let mut cloud = PointCloud::new();
    for i in 0..41 {
        for j in 0..21 {
            cloud.push(1.0 + i as f64 * 0.05, -1.3 + j as f64 * 0.05, -0.01);
        }
    }
    let footprint =
        StructureFootprint::from_corners([[1.9, -0.7], [2.0, -0.7], [2.0, -0.8], [1.9, -0.8]])
            .unwrap();
    let config = PipelineConfig::default();
    let mut grid_config = config.grid.clone();
    grid_config.columns = 81;
    grid_config.rows = 41;
    grid_config.apply_filter = false;

    let surface =
        ScourSurface::build(&cloud, footprint.clone(), &config.region, &grid_config).unwrap();
    let grid = surface.grid();
    for r in 0..grid.rows() {
        for c in 0..grid.columns() {
            let (x, y) = (grid.x()[c], grid.y()[r]);
            let v = grid.get(r, c).unwrap();
            if footprint.contains(x, y) {
                assert!(v.is_nan(), "({}, {}) should be masked", x, y);
            } else {
                assert!((v + 1.0).abs() < 1e-9, "({}, {}) changed to {}", x, y, v);
            }
        }
    }
}
