//! End-to-end crop workflows over synthetic pairs:
//! 1. Single pair cropping with per-feature and per-document failure isolation
//! 2. Dataset indexing → batch cropping (sequential, parallel, split by pair)
//! 3. Dataset summary → threshold validation

use crop_pipeline::{
    crop_dataset, crop_features, crop_image_pair, index_pairs, summarize_pairs,
    summarize_with_thresholds, BatchOptions, CropError, CropOptions, DisasterPhase, PairLayout,
    ValidationOutcome, ValidationThresholds,
};
use data_contracts::label::{LabelDocument, ValidationError};
use footprint_core::GeometryError;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// Raster whose pixel value encodes its coordinates, so crops can be checked.
fn gradient_raster(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 77]))
}

fn feature(uid: &str, wkt: &str) -> Value {
    json!({
        "wkt": wkt,
        "properties": { "uid": uid, "feature_type": "building", "subtype": "no-damage" }
    })
}

fn label_doc(features: Vec<Value>) -> Value {
    json!({ "features": { "xy": features, "lng_lat": [] } })
}

fn write_pair(
    root: &Path,
    pair_id: &str,
    size: (u32, u32),
    pre: Value,
    post: Value,
) -> anyhow::Result<()> {
    let images = root.join("images");
    let labels = root.join("labels");
    fs::create_dir_all(&images)?;
    fs::create_dir_all(&labels)?;
    for (phase, doc) in [("pre", pre), ("post", post)] {
        gradient_raster(size.0, size.1).save(images.join(format!("{pair_id}_{phase}_disaster.png")))?;
        fs::write(
            labels.join(format!("{pair_id}_{phase}_disaster.json")),
            serde_json::to_vec_pretty(&doc)?,
        )?;
    }
    Ok(())
}

fn square_features() -> Value {
    label_doc(vec![
        feature("a", "POLYGON ((10.5 12.2, 20.1 12.2, 20.1 30.7, 10.5 12.2))"),
        feature("b", "POLYGON ((40 40, 60 40, 60 55, 40 40))"),
    ])
}

#[test]
fn sibling_features_survive_failures() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let out = tmp.path().join("crops");
    let raster = DynamicImage::ImageRgb8(gradient_raster(100, 100));
    let doc: LabelDocument = serde_json::from_value(label_doc(vec![
        feature("inside", "POLYGON ((10.5 12.2, 20.1 12.2, 20.1 30.7, 10.5 12.2))"),
        feature("outside", "POLYGON ((150 150, 180 150, 180 175, 150 150))"),
        feature("broken", "POLYGON ((1 1, 2 x))"),
        feature("flat", "POLYGON ((5 5, 5 9, 5 5))"),
        feature("edge", "POLYGON ((90 95.5, 120 95.5, 120 130, 90 95.5))"),
    ]))?;
    let empty: LabelDocument = serde_json::from_value(label_doc(vec![]))?;

    let report = crop_features(
        "tile_00000001",
        &raster,
        &raster,
        &doc,
        &empty,
        &out,
        &CropOptions::default(),
    )?;
    let (crops, failures) = (&report.crops, &report.failures);
    assert!(report.document_failures.is_empty());

    let uids: Vec<_> = crops.iter().map(|c| c.uid.as_str()).collect();
    assert_eq!(uids, ["inside", "edge"]);
    for crop in crops {
        assert!(crop.path.exists(), "{} should be written", crop.path.display());
        assert_eq!(crop.phase, DisasterPhase::Pre);
    }

    let edge = &crops[1];
    assert_eq!((edge.rect.x, edge.rect.y), (90, 95));
    assert_eq!((edge.rect.width, edge.rect.height), (10, 5));

    assert_eq!(failures.len(), 3);
    let kind = |uid: &str| {
        failures
            .iter()
            .find(|f| f.uid == uid)
            .and_then(|f| f.error.geometry().cloned())
    };
    assert!(matches!(kind("outside"), Some(GeometryError::OutOfFrame { .. })));
    assert!(matches!(kind("broken"), Some(GeometryError::NumericParse { .. })));
    assert!(matches!(
        kind("flat"),
        Some(GeometryError::DegenerateBoundingBox { .. })
    ));
    assert!(!out
        .join("tile_00000001_outside_building_pre_disaster.png")
        .exists());
    Ok(())
}

#[test]
fn crop_matches_source_region() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let out = tmp.path().join("crops");
    let raster = DynamicImage::ImageRgb8(gradient_raster(64, 48));
    let doc: LabelDocument = serde_json::from_value(label_doc(vec![feature(
        "roof",
        "POLYGON ((10.2 5.9, 19.8 5.9, 19.8 14.1, 10.2 14.1, 10.2 5.9))",
    )]))?;

    let report = crop_features("p", &raster, &raster, &doc, &doc, &out, &CropOptions::default())?;
    assert!(report.failures.is_empty());
    assert_eq!(report.crops.len(), 2);

    let pre = image::open(out.join("p_roof_building_pre_disaster.png"))?;
    assert_eq!(pre.dimensions(), (10, 10));
    let rgb = pre.to_rgb8();
    assert_eq!(rgb.get_pixel(0, 0), &Rgb([10, 5, 77]));
    assert_eq!(rgb.get_pixel(9, 9), &Rgb([19, 14, 77]));
    assert!(out.join("p_roof_building_post_disaster.png").exists());
    Ok(())
}

#[test]
fn missing_coordinate_system_fails_only_that_document() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let raster = DynamicImage::ImageRgb8(gradient_raster(80, 80));
    let pre: LabelDocument = serde_json::from_value(json!({ "features": { "lng_lat": [] } }))?;
    let post: LabelDocument = serde_json::from_value(square_features())?;
    let report = crop_features(
        "p",
        &raster,
        &raster,
        &pre,
        &post,
        tmp.path(),
        &CropOptions::default(),
    )?;

    assert_eq!(report.document_failures.len(), 1);
    assert_eq!(report.document_failures[0].phase, DisasterPhase::Pre);
    assert!(matches!(
        report.document_failures[0].error,
        CropError::MissingCoordinateSystem {
            phase: DisasterPhase::Pre,
            ..
        }
    ));
    assert_eq!(report.crops.len(), 2);
    assert!(report.crops.iter().all(|c| c.phase == DisasterPhase::Post));
    assert!(tmp.path().join("p_a_building_post_disaster.png").exists());
    assert!(tmp.path().join("p_b_building_post_disaster.png").exists());
    Ok(())
}

#[test]
fn bad_label_fields_fail_only_their_feature() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let out = tmp.path().join("a").join("out");
    let raster = DynamicImage::ImageRgb8(gradient_raster(80, 80));
    let square = "POLYGON ((10 10, 20 10, 20 20, 10 10))";
    let doc: LabelDocument = serde_json::from_value(label_doc(vec![
        feature("a", square),
        json!({ "wkt": square, "properties": { "uid": "b", "feature_type": "" } }),
        feature("a", square),
        feature("x/../../../escaped", square),
        feature("", square),
    ]))?;
    let empty: LabelDocument = serde_json::from_value(label_doc(vec![]))?;

    let report = crop_features("p", &raster, &raster, &doc, &empty, &out, &CropOptions::default())?;

    assert!(report.document_failures.is_empty());
    let uids: Vec<_> = report.crops.iter().map(|c| c.uid.as_str()).collect();
    assert_eq!(uids, ["a"]);
    assert!(out.join("p_a_building_pre_disaster.png").exists());

    let errors: Vec<_> = report
        .failures
        .iter()
        .map(|f| match &f.error {
            CropError::Label { source, .. } => source.clone(),
            other => panic!("unexpected failure for {}: {other}", f.uid),
        })
        .collect();
    assert_eq!(errors.len(), 4);
    assert!(matches!(errors[0], ValidationError::EmptyFeatureType { .. }));
    assert!(matches!(errors[1], ValidationError::DuplicateUid { .. }));
    assert!(matches!(errors[2], ValidationError::UnsafeName { field: "uid", .. }));
    assert!(matches!(errors[3], ValidationError::EmptyUid { index: 4, .. }));

    assert!(!tmp.path().join("escaped_building_pre_disaster.png").exists());
    assert_eq!(fs::read_dir(&out)?.count(), 1);
    Ok(())
}

#[test]
fn unreadable_raster_fails_only_its_phase() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path().join("split");
    write_pair(&root, "flood_00000007", (80, 80), square_features(), square_features())?;
    fs::write(root.join("images/flood_00000007_pre_disaster.png"), b"not a png")?;

    let index = index_pairs(&root, &PairLayout::default())?;
    let out = tmp.path().join("crops");
    let report = crop_image_pair(&index.pairs[0], &out, &CropOptions::default())?;

    assert_eq!(report.document_failures.len(), 1);
    assert_eq!(report.document_failures[0].phase, DisasterPhase::Pre);
    assert!(matches!(report.document_failures[0].error, CropError::Image { .. }));
    assert_eq!(report.crops.len(), 2);
    assert!(out.join("flood_00000007_a_building_post_disaster.png").exists());
    Ok(())
}

#[test]
fn image_pair_from_disk() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path().join("test");
    write_pair(&root, "socal-fire_00000031", (80, 80), square_features(), square_features())?;

    let index = index_pairs(&root, &PairLayout::default())?;
    assert_eq!(index.pairs.len(), 1);
    let out = tmp.path().join("crops");
    let report = crop_image_pair(&index.pairs[0], &out, &CropOptions::default())?;
    assert_eq!(report.pair_id, "socal-fire_00000031");
    assert_eq!(report.crops.len(), 4);
    assert!(report.failures.is_empty());
    for name in [
        "socal-fire_00000031_a_building_pre_disaster.png",
        "socal-fire_00000031_a_building_post_disaster.png",
        "socal-fire_00000031_b_building_pre_disaster.png",
        "socal-fire_00000031_b_building_post_disaster.png",
    ] {
        assert!(out.join(name).exists(), "{name} missing");
    }
    Ok(())
}

#[test]
fn index_reports_incomplete_pairs() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_pair(root, "flood_00000002", (16, 16), square_features(), square_features())?;
    write_pair(root, "flood_00000001", (16, 16), square_features(), square_features())?;
    write_pair(root, "fire_00000009", (16, 16), square_features(), square_features())?;
    fs::remove_file(root.join("labels/fire_00000009_pre_disaster.json"))?;
    fs::write(root.join("images/notes.txt"), "ignored")?;

    let index = index_pairs(root, &PairLayout::default())?;
    let ids: Vec<_> = index.pairs.iter().map(|p| p.pair_id.as_str()).collect();
    assert_eq!(ids, ["flood_00000001", "flood_00000002"]);
    assert_eq!(index.missing.len(), 1);
    assert_eq!(index.missing[0].pair_id, "fire_00000009");
    assert_eq!(
        index.missing[0].missing,
        vec![root.join("labels/fire_00000009_pre_disaster.json")]
    );
    Ok(())
}

#[test]
fn batch_isolates_document_failures() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path().join("split");
    write_pair(&root, "quake_00000001", (80, 80), square_features(), square_features())?;
    write_pair(&root, "quake_00000002", (80, 80), square_features(), square_features())?;
    write_pair(&root, "quake_00000003", (80, 80), square_features(), square_features())?;
    fs::write(root.join("labels/quake_00000002_post_disaster.json"), "{ not json")?;

    let index = index_pairs(&root, &PairLayout::default())?;
    assert_eq!(index.pairs.len(), 3);

    let sequential = crop_dataset(&index.pairs, &tmp.path().join("seq"), &BatchOptions::default());
    let parallel = crop_dataset(
        &index.pairs,
        &tmp.path().join("par"),
        &BatchOptions {
            parallel: true,
            ..Default::default()
        },
    );

    for batch in [&sequential, &parallel] {
        let summary = batch.summary();
        assert_eq!(summary.pairs_processed, 3);
        assert_eq!(summary.pairs_failed, 0);
        assert_eq!(summary.documents_failed, 1);
        assert_eq!(summary.crops_written, 10);
        assert_eq!(summary.features_failed, 0);
        let ids: Vec<_> = batch.reports.iter().map(|r| r.pair_id.as_str()).collect();
        assert_eq!(ids, ["quake_00000001", "quake_00000002", "quake_00000003"]);
        let broken = &batch.reports[1];
        assert_eq!(broken.document_failures[0].phase, DisasterPhase::Post);
        assert!(matches!(broken.document_failures[0].error, CropError::Json { .. }));
        assert!(broken.crops.iter().all(|c| c.phase == DisasterPhase::Pre));
    }
    Ok(())
}

#[test]
fn batch_splits_output_by_pair_in_parallel() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path().join("split");
    write_pair(&root, "fire_00000001", (80, 80), square_features(), square_features())?;
    write_pair(&root, "fire_00000002", (80, 80), square_features(), square_features())?;
    let index = index_pairs(&root, &PairLayout::default())?;

    let out = tmp.path().join("crops");
    let batch = crop_dataset(
        &index.pairs,
        &out,
        &BatchOptions {
            parallel: true,
            split_by_pair: true,
            ..Default::default()
        },
    );
    assert_eq!(batch.summary().crops_written, 8);
    for pair_id in ["fire_00000001", "fire_00000002"] {
        let dir = out.join(pair_id);
        assert_eq!(fs::read_dir(&dir)?.count(), 4, "{pair_id}");
        assert!(dir.join(format!("{pair_id}_b_building_post_disaster.png")).exists());
    }
    Ok(())
}

#[test]
fn unusable_output_dir_fails_the_pair() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path().join("split");
    write_pair(&root, "wind_00000001", (32, 32), square_features(), square_features())?;
    let index = index_pairs(&root, &PairLayout::default())?;

    let blocker = tmp.path().join("not_a_dir");
    fs::write(&blocker, "file")?;
    let batch = crop_dataset(&index.pairs, &blocker, &BatchOptions::default());
    assert_eq!(batch.summary().pairs_failed, 1);
    assert!(matches!(batch.failures[0].error, CropError::Io { .. }));
    Ok(())
}

#[test]
fn summary_and_thresholds() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_pair(root, "storm_00000001", (32, 32), square_features(), square_features())?;
    write_pair(
        root,
        "storm_00000002",
        (32, 32),
        label_doc(vec![feature("x", "POLYGON ((1 1 1))")]),
        label_doc(vec![]),
    )?;
    let square = "POLYGON ((1 1, 9 1, 9 9, 1 1))";
    write_pair(
        root,
        "storm_00000003",
        (32, 32),
        label_doc(vec![feature("k", square), feature("k", square)]),
        square_features(),
    )?;

    let index = index_pairs(root, &PairLayout::default())?;
    let summary = summarize_pairs(&index, &CropOptions::default());
    assert_eq!(summary.pairs.len(), 3);
    assert_eq!(summary.totals.pre_features, 5);
    assert_eq!(summary.totals.post_features, 4);
    assert_eq!(summary.totals.empty_documents, 1);
    assert_eq!(summary.totals.feature_failures, 2);
    assert_eq!(summary.pairs[2].feature_failures, 1);
    assert_eq!(summary.totals.invalid_documents, 0);

    let lenient = summarize_with_thresholds(&index, &CropOptions::default(), &ValidationThresholds::default());
    assert_eq!(lenient.outcome, ValidationOutcome::Warn);

    let strict = ValidationThresholds {
        max_feature_failures: Some(0),
        ..Default::default()
    };
    let report = summarize_with_thresholds(&index, &CropOptions::default(), &strict);
    assert_eq!(report.outcome, ValidationOutcome::Fail);
    assert!(report
        .reasons
        .iter()
        .any(|r| r.starts_with("feature failures: 2 exceeds max 0")));
    Ok(())
}
