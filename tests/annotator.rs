mod common;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use common::*;
use ifc_quantities::annotator::{
    whole_registry, AnnotatorSettings, ProcessedRegistry, Selection, VolumeAnnotator,
};
use ifc_quantities::error::{AnnotateError, MeasureError, PropertyError};
use ifc_quantities::geometry::{MeasureContext, StepVolumeMeasurement};
use ifc_quantities::model::{IfcModel, ModelRegistry};
use ifc_quantities::properties::{IfcPropertiesManager, PropertyManager};
use pretty_assertions::assert_eq;

/// Counts calls while delegating to the real manager.
#[derive(Default)]
struct CountingProperties {
    inner: IfcPropertiesManager,
    ensured: usize,
    created: usize,
    attached: usize,
}

impl PropertyManager for CountingProperties {
    fn ensure_pset(
        &mut self,
        model: &mut IfcModel,
        element: u64,
        name: &str,
    ) -> Result<u64, PropertyError> {
        self.ensured += 1;
        self.inner.ensure_pset(model, element, name)
    }

    fn new_single_numeric_property(
        &mut self,
        model: &mut IfcModel,
        value_type: &str,
        name: &str,
        value: f64,
    ) -> Result<u64, PropertyError> {
        self.created += 1;
        self.inner
            .new_single_numeric_property(model, value_type, name, value)
    }

    fn add_prop_to_pset(
        &mut self,
        model: &mut IfcModel,
        pset: u64,
        property: u64,
    ) -> Result<(), PropertyError> {
        self.attached += 1;
        self.inner.add_prop_to_pset(model, pset, property)
    }

    fn add_element_to_pset(
        &mut self,
        model: &mut IfcModel,
        pset: u64,
        element: u64,
    ) -> Result<(), PropertyError> {
        self.inner.add_element_to_pset(model, pset, element)
    }

    fn save_to_ifc(&self, model: &IfcModel, raw: &[u8]) -> Result<Vec<u8>, PropertyError> {
        self.inner.save_to_ifc(model, raw)
    }
}

fn counting_annotator() -> VolumeAnnotator<StepVolumeMeasurement, CountingProperties> {
    VolumeAnnotator::with_services(
        StepVolumeMeasurement::default(),
        CountingProperties::default(),
        AnnotatorSettings::default(),
    )
}

fn select(key: &str, elements: &[u64]) -> Selection {
    BTreeMap::from([(key.to_string(), elements.iter().copied().collect())])
}

fn volume_properties(model: &IfcModel, element: u64) -> Vec<(String, String)> {
    model
        .property_sets(element)
        .into_iter()
        .filter(|pset| pset.name == "CalculatedQuantities")
        .flat_map(|pset| pset.properties)
        .filter(|(name, _)| name == "Volume")
        .collect()
}

#[test]
fn repeated_compute_attaches_once_until_forced() {
    let mut registry = ModelRegistry::new();
    let model_a = load_fixture(&mut registry, "a.ifc");
    let mut annotator = counting_annotator();
    let context = MeasureContext::default();
    let selection = select(&model_a, &[WALL, SLAB]);

    let first = annotator
        .compute(&mut registry, &context, &selection, false)
        .unwrap();
    assert_eq!(first.attachments(), 2);
    assert_eq!(annotator.properties().attached, 2);
    let expected: HashSet<u64> = [WALL, SLAB].into_iter().collect();
    assert_eq!(annotator.processed().processed(&model_a), Some(&expected));

    let second = annotator
        .compute(&mut registry, &context, &selection, false)
        .unwrap();
    assert_eq!(second.attachments(), 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(annotator.properties().attached, 2);

    let third = annotator
        .compute(&mut registry, &context, &selection, true)
        .unwrap();
    assert_eq!(third.attachments(), 2);
    assert_eq!(third.skipped, 0);
    assert_eq!(annotator.properties().attached, 4);
    assert_eq!(annotator.properties().created, 4);
    assert_eq!(annotator.properties().ensured, 4);
    assert_eq!(annotator.processed().processed(&model_a).map(|s| s.len()), Some(2));
}

#[test]
fn volumes_are_written_into_calculated_quantities() {
    let mut registry = ModelRegistry::new();
    let id = load_fixture(&mut registry, "model.ifc");
    let mut annotator = VolumeAnnotator::new(AnnotatorSettings::default());

    let report = annotator
        .compute(
            &mut registry,
            &MeasureContext::default(),
            &select(&id, &[WALL, SLAB, COLUMN]),
            false,
        )
        .unwrap();

    assert_close(report.total_volume(), WALL_VOLUME + SLAB_VOLUME + COLUMN_VOLUME);

    let model = registry.get(&id).unwrap();
    let settings = annotator.settings();
    for (element, expected) in [(WALL, WALL_VOLUME), (SLAB, SLAB_VOLUME), (COLUMN, COLUMN_VOLUME)] {
        let stored = model
            .numeric_property(element, &settings.pset_name, &settings.property_name)
            .unwrap();
        assert_close(stored, expected);
    }

    // The wall keeps its existing set next to the new one
    let names: Vec<String> = model.property_sets(WALL).into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Pset_WallCommon", "CalculatedQuantities"]);
}

#[test]
fn force_replaces_the_volume_instead_of_adding_one() {
    let mut registry = ModelRegistry::new();
    let id = load_fixture(&mut registry, "model.ifc");
    let mut annotator = VolumeAnnotator::new(AnnotatorSettings::default());
    let selection = select(&id, &[WALL]);
    let context = MeasureContext::default();

    let first = annotator.compute(&mut registry, &context, &selection, false).unwrap();
    let forced = annotator.compute(&mut registry, &context, &selection, true).unwrap();

    // Same property set, new property record
    assert_eq!(first.annotated[0].pset, forced.annotated[0].pset);
    assert_ne!(first.annotated[0].property, forced.annotated[0].property);

    let model = registry.get(&id).unwrap();
    assert_eq!(volume_properties(model, WALL).len(), 1);
    assert!(model.entity(first.annotated[0].property).is_none());
    assert_eq!(
        model
            .property_sets(WALL)
            .iter()
            .filter(|p| p.name == "CalculatedQuantities")
            .count(),
        1
    );
}

#[test]
fn new_elements_are_processed_on_first_encounter() {
    let mut registry = ModelRegistry::new();
    let id = load_fixture(&mut registry, "model.ifc");
    let mut annotator = VolumeAnnotator::new(AnnotatorSettings::default());
    let context = MeasureContext::default();

    annotator
        .compute(&mut registry, &context, &select(&id, &[WALL]), false)
        .unwrap();
    let report = annotator
        .compute(&mut registry, &context, &select(&id, &[WALL, COLUMN]), false)
        .unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.annotated.len(), 1);
    assert_eq!(report.annotated[0].element, COLUMN);
}

#[test]
fn unresolved_keys_are_reported_not_raised() {
    let mut registry = ModelRegistry::new();
    let id = load_fixture(&mut registry, "model.ifc");
    let mut annotator = VolumeAnnotator::new(AnnotatorSettings::default());

    let mut selection = select(&id, &[SLAB]);
    selection.insert("missing-model".to_string(), BTreeSet::from([1, 2]));

    let report = annotator
        .compute(&mut registry, &MeasureContext::default(), &selection, false)
        .unwrap();

    assert_eq!(report.unresolved, vec!["missing-model".to_string()]);
    assert_eq!(report.attachments(), 1);
    assert!(annotator.processed().processed("missing-model").is_none());
}

#[test]
fn fragment_ids_resolve_to_their_model() {
    let mut registry = ModelRegistry::new();
    let id = load_fixture(&mut registry, "model.ifc");
    let fragment = registry
        .get(&id)
        .unwrap()
        .fragments
        .iter()
        .find(|f| f.category == "Columns")
        .cloned()
        .unwrap();

    let mut annotator = VolumeAnnotator::new(AnnotatorSettings::default());
    let selection = BTreeMap::from([(
        fragment.id.clone(),
        fragment.element_ids.iter().copied().collect(),
    )]);
    let report = annotator
        .compute(&mut registry, &MeasureContext::default(), &selection, false)
        .unwrap();

    assert_eq!(report.attachments(), 1);
    assert_eq!(report.annotated[0].model, id);
    assert!(annotator.processed().contains(&id, COLUMN));
}

#[test]
fn measurement_failure_keeps_earlier_attachments() {
    let mut registry = ModelRegistry::new();
    let id = load_fixture(&mut registry, "model.ifc");
    let mut annotator = VolumeAnnotator::new(AnnotatorSettings::default());

    // Element ids are visited in order: the wall succeeds before the proxy fails
    let err = annotator
        .compute(
            &mut registry,
            &MeasureContext::default(),
            &select(&id, &[WALL, PROXY]),
            false,
        )
        .unwrap_err();

    match err {
        AnnotateError::Measure { element, source, .. } => {
            assert_eq!(element, PROXY);
            assert!(matches!(source, MeasureError::NoGeometry { element: PROXY, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(annotator.processed().contains(&id, WALL));
    assert!(!annotator.processed().contains(&id, PROXY));
    let model = registry.get(&id).unwrap();
    assert_eq!(volume_properties(model, WALL).len(), 1);
}

#[test]
fn unknown_representation_context_has_no_geometry() {
    let mut registry = ModelRegistry::new();
    let id = load_fixture(&mut registry, "model.ifc");
    let mut annotator = VolumeAnnotator::new(AnnotatorSettings::default());
    let context = MeasureContext {
        representation: "FootPrint".to_string(),
        length_scale: None,
    };

    let err = annotator
        .compute(&mut registry, &context, &select(&id, &[SLAB]), false)
        .unwrap_err();

    assert!(matches!(
        err,
        AnnotateError::Measure {
            source: MeasureError::NoGeometry { .. },
            ..
        }
    ));
}

#[test]
fn bounded_registry_forgets_oldest_model() {
    let mut registry = ModelRegistry::new();
    let first = load_fixture(&mut registry, "first.ifc");
    let second = load_fixture(&mut registry, "second.ifc");
    let mut annotator = VolumeAnnotator::new(AnnotatorSettings::default())
        .with_registry(ProcessedRegistry::with_max_models(1));
    let context = MeasureContext::default();

    annotator
        .compute(&mut registry, &context, &select(&first, &[WALL]), false)
        .unwrap();
    annotator
        .compute(&mut registry, &context, &select(&second, &[WALL]), false)
        .unwrap();

    assert_eq!(annotator.processed().len(), 1);
    assert!(!annotator.processed().contains(&first, WALL));
    assert!(annotator.processed().contains(&second, WALL));
}

#[test]
fn custom_property_names_are_honoured() {
    let mut registry = ModelRegistry::new();
    let id = load_fixture(&mut registry, "model.ifc");
    let settings = AnnotatorSettings {
        pset_name: "Qto_Custom".to_string(),
        property_name: "NetVolume".to_string(),
        value_type: "IfcVolumeMeasure".to_string(),
        max_cached_models: None,
    };
    let mut annotator = VolumeAnnotator::new(settings);

    let report = annotator
        .compute(&mut registry, &MeasureContext::default(), &select(&id, &[COLUMN]), false)
        .unwrap();

    let model = registry.get(&id).unwrap();
    let property = model.entity(report.annotated[0].property).unwrap();
    assert!(property.to_step_line().contains("IFCVOLUMEMEASURE("));
    assert_close(
        model.numeric_property(COLUMN, "Qto_Custom", "NetVolume").unwrap(),
        COLUMN_VOLUME,
    );
}

#[test]
fn shared_quantity_sets_are_split_per_element() {
    let shared = "
#600=IFCPROPERTYSINGLEVALUE('Volume',$,IFCREAL(9.),$);
#601=IFCPROPERTYSINGLEVALUE('Source',$,IFCLABEL('survey'),$);
#602=IFCPROPERTYSET('7pset0000000000000000G',#1,'CalculatedQuantities',$,(#600,#601));
#603=IFCRELDEFINESBYPROPERTIES('8rel00000000000000000H',#1,$,$,(#100,#200,#300),#602);
ENDSEC;
END-ISO-10303-21;";
    let document = fixture_ifc().replace("\nENDSEC;\nEND-ISO-10303-21;", shared);
    let mut registry = ModelRegistry::new();
    let id = registry.insert(
        ifc_quantities::parser::model_from_bytes("shared.ifc", document.into_bytes()).unwrap(),
    );
    let mut annotator = VolumeAnnotator::new(AnnotatorSettings::default());

    let report = annotator
        .compute(
            &mut registry,
            &MeasureContext::default(),
            &select(&id, &[WALL, COLUMN]),
            false,
        )
        .unwrap();

    let model = registry.get(&id).unwrap();
    let settings = annotator.settings();
    let stored = |element| {
        model
            .numeric_property(element, &settings.pset_name, &settings.property_name)
            .unwrap()
    };
    assert_close(stored(WALL), WALL_VOLUME);
    assert_close(stored(COLUMN), COLUMN_VOLUME);
    // The slab was not selected and keeps the shared value
    assert_close(stored(SLAB), 9.0);

    assert_ne!(report.annotated[0].pset, 602);
    assert_ne!(report.annotated[0].pset, report.annotated[1].pset);
    assert_eq!(model.entity(603).unwrap().references_at(4), vec![SLAB]);
    assert!(model.entity(600).is_some());

    // Other properties of the shared set carry over
    let wall_set = model
        .property_sets(WALL)
        .into_iter()
        .find(|p| p.name == "CalculatedQuantities")
        .unwrap();
    assert_eq!(wall_set.properties.len(), 2);
    assert_eq!(wall_set.properties[0].0, "Source");
    assert_eq!(volume_properties(model, WALL).len(), 1);
}

#[test]
fn batch_over_whole_registry_skips_unmeasurable_elements() {
    let mut registry = ModelRegistry::new();
    let id = load_fixture(&mut registry, "house.ifc");
    let mut annotator = VolumeAnnotator::new(AnnotatorSettings::default());
    let selection = whole_registry(&registry);
    let context = MeasureContext::default();

    // A plain compute stops at the proxy
    assert!(matches!(
        annotator.compute(&mut registry, &context, &selection, true),
        Err(AnnotateError::Measure { element: PROXY, .. })
    ));

    let report = annotator
        .compute_batch(&mut registry, &context, &selection, true)
        .unwrap();

    assert_eq!(report.attachments(), 3);
    assert_close(report.total_volume(), WALL_VOLUME + SLAB_VOLUME + COLUMN_VOLUME);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].element, PROXY);
    assert_eq!(report.failed[0].model, id);
    assert!(!annotator.processed().contains(&id, PROXY));

    let again = annotator
        .compute_batch(&mut registry, &context, &selection, false)
        .unwrap();
    assert_eq!(again.skipped, 3);
    assert_eq!(again.failed.len(), 1);
}
