use super::*;

#[test]
fn state_keys_parse_and_suffix() {
    assert_eq!("hp_75".parse::<StateKey>().unwrap(), StateKey::Hp75);
    assert_eq!("Dead".parse::<StateKey>().unwrap(), StateKey::Dead);
    assert!("zombie".parse::<StateKey>().is_err());
    assert_eq!(StateKey::Normal.suffix(), "");
    assert_eq!(StateKey::Poison.suffix(), "_PO");
    assert_eq!(StateKey::Ashed.suffix(), "_AS");
    assert_eq!(StateKey::ALL.len(), 11);
}

#[test]
fn new_project_has_normal_state() {
    let p = Project::new("Alice");
    assert_eq!(p.version, RECORD_VERSION);
    let normal = p.state(StateKey::Normal).unwrap();
    assert!(normal.source_ref.is_none());
    assert!(!normal.is_individual);
    assert_eq!(normal.params, RenderParameters::default());
    assert!(p.state(StateKey::Dead).is_none());
}

#[test]
fn legacy_record_loads_with_defaults() {
    let json = r#"{
        "version": "1.1",
        "display_name": "Old",
        "uuid": "8d0b3b55-5d38-4d7e-8a8e-0c6f4f0a9c11",
        "face_center": {"x": 0, "y": 0},
        "frame_id": null,
        "states": {
            "normal": {
                "suffix": "",
                "source_uuid": "abc",
                "scale": 1.5,
                "offset_x": 10,
                "offset_y": -4,
                "use_rembg": true
            }
        }
    }"#;
    let p: Project = serde_json::from_str(json).unwrap();
    let normal = p.state(StateKey::Normal).unwrap();
    assert_eq!(normal.source_ref, Some(SourceRef("abc".to_string())));
    assert_eq!(normal.params.scale, 1.5);
    assert_eq!(normal.params.offset_x, 10);
    assert!(normal.params.use_rembg);
    assert_eq!(normal.params.alpha_matting_fg_threshold, 240);
    assert_eq!(normal.params.icon_scale_b, 1.0);
    assert!(!normal.is_individual);
    assert_eq!(p.defaults, RenderParameters::default());
    assert_eq!(p.face_center, Some(FaceCenter::new(0, 0)));
}

#[test]
fn persisted_keys_match_record_schema() {
    let mut p = Project::new("Bob");
    p.state_mut(StateKey::Hp50).source_ref = Some(SourceRef("s1".into()));
    let v = serde_json::to_value(&p).unwrap();
    assert!(v.get("uuid").is_some());
    assert!(v.get("defaults").is_some());
    let hp50 = &v["states"]["hp_50"];
    assert_eq!(hp50["source_uuid"], "s1");
    assert_eq!(hp50["scale"], 1.0);
    assert_eq!(hp50["is_individual"], false);
    let back: Project = serde_json::from_value(v).unwrap();
    assert_eq!(back, p);
}

#[test]
fn anchor_resolution_order() {
    let mut p = Project::new("C");
    assert_eq!(p.resolve_anchor(StateKey::Normal), None);

    p.face_center = Some(FaceCenter::new(1, 1));
    assert_eq!(p.resolve_anchor(StateKey::Normal), Some(FaceCenter::new(1, 1)));
    assert_eq!(p.resolve_anchor(StateKey::Sleep), Some(FaceCenter::new(1, 1)));

    p.defaults.face_center = Some(FaceCenter::new(2, 2));
    assert_eq!(p.resolve_anchor(StateKey::Normal), Some(FaceCenter::new(2, 2)));

    p.state_mut(StateKey::Normal).params.face_center = Some(FaceCenter::new(3, 3));
    assert_eq!(p.resolve_anchor(StateKey::Normal), Some(FaceCenter::new(3, 3)));
    assert_eq!(p.resolve_anchor(StateKey::Sleep), Some(FaceCenter::new(2, 2)));
}

#[test]
fn validate_rejects_non_positive_scales() {
    let mut params = RenderParameters::default();
    assert!(params.validate().is_ok());
    params.scale = 0.0;
    assert!(params.validate().is_err());
    params.scale = 1.0;
    params.icon_scale_a = f32::NAN;
    assert!(params.validate().is_err());
}

#[test]
fn stored_project_paths() {
    let sp = StoredProject::new(Project::new("D"), "/pool/face12");
    assert_eq!(sp.slot_name(), "face12");
    assert_eq!(sp.slot_index(), Some(12));
    assert!(sp.metadata_path().ends_with("project_data.json"));
    assert!(sp.sources_dir().ends_with("sources"));
}

#[test]
fn states_with_source_follow_export_order() {
    let mut p = Project::new("E");
    p.state_mut(StateKey::Dead).source_ref = Some(SourceRef("d".into()));
    p.state_mut(StateKey::Poison).source_ref = Some(SourceRef("p".into()));
    let keys: Vec<_> = p.states_with_source().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![StateKey::Poison, StateKey::Dead]);
}
