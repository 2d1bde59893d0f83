mod common;

use std::collections::BTreeMap;

use common::*;
use ifc_quantities::annotator::{AnnotatorSettings, VolumeAnnotator};
use ifc_quantities::export::{export_csv, export_json, quantity_rows, report_rows};
use ifc_quantities::geometry::MeasureContext;
use ifc_quantities::model::ModelRegistry;
use pretty_assertions::assert_eq;

fn annotated_registry() -> (ModelRegistry, String, VolumeAnnotator) {
    let mut registry = ModelRegistry::new();
    let id = load_fixture(&mut registry, "house.ifc");
    let mut annotator = VolumeAnnotator::new(AnnotatorSettings::default());
    annotator
        .compute(
            &mut registry,
            &MeasureContext::default(),
            &BTreeMap::from([(id.clone(), [WALL, SLAB].into_iter().collect())]),
            false,
        )
        .unwrap();
    (registry, id, annotator)
}

#[test]
fn rows_list_stored_volumes() {
    let (registry, id, annotator) = annotated_registry();
    let model = registry.get(&id).unwrap();

    let rows = quantity_rows(model, annotator.settings());

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].element, WALL);
    assert_eq!(rows[0].model, "house.ifc");
    assert_eq!(rows[0].global_id, "1wAll0000000000000000A");
    assert_eq!(rows[0].entity_type, "IFCWALL");
    assert_eq!(rows[0].name, "Wall 01");
    assert_close(rows[0].volume, WALL_VOLUME);
    assert_eq!(rows[1].element, SLAB);
}

#[test]
fn report_rows_follow_one_pass() {
    let mut registry = ModelRegistry::new();
    let id = load_fixture(&mut registry, "house.ifc");
    let mut annotator = VolumeAnnotator::new(AnnotatorSettings::default());

    let report = annotator
        .compute(
            &mut registry,
            &MeasureContext::default(),
            &BTreeMap::from([(id, [COLUMN].into_iter().collect())]),
            false,
        )
        .unwrap();
    let rows = report_rows(&registry, &report);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].entity_type, "IFCCOLUMN");
    assert_close(rows[0].volume, COLUMN_VOLUME);
}

#[test]
fn csv_report_has_header_and_rows() {
    let (registry, id, annotator) = annotated_registry();
    let rows = quantity_rows(registry.get(&id).unwrap(), annotator.settings());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("volumes.csv");

    export_csv(&rows, &path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "Model,Element,Global ID,Type,Name,Volume (m3)");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("house.ifc,#100,1wAll0000000000000000A,IFCWALL,Wall 01,"));
}

#[test]
fn json_report_totals_volumes() {
    let (registry, id, annotator) = annotated_registry();
    let rows = quantity_rows(registry.get(&id).unwrap(), annotator.settings());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("volumes.json");

    export_json(&rows, &path).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["elements"], 2);
    assert_close(value["total_volume"].as_f64().unwrap(), WALL_VOLUME + SLAB_VOLUME);
    assert_eq!(value["rows"][1]["entity_type"], "IFCSLAB");
}
