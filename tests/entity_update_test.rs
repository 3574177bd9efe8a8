use luminous_field::{
    cgmath::Vector3,
    config::{BoxesConfig, SceneConfig},
    entities::{boxes::BoxField, butterfly::Butterfly, scene_rng},
};

#[test]
fn default_scene_box_field() {
    let config = SceneConfig::default().boxes;
    let field = BoxField::generate(&config, &mut scene_rng(Some(5)));

    assert_eq!(field.boxes.len(), 101);
    assert_eq!(field.boxes.iter().filter(|b| b.is_light_source).count(), 1);
    assert_eq!(field.light_position(), Vector3::new(0.0, 5.0, 0.0));
}

#[test]
fn boxes_stay_inside_their_region_over_time() {
    let config = BoxesConfig {
        bounds: 4.0,
        light_height: 2.0,
        seed: Some(11),
        ..Default::default()
    };
    let mut field = BoxField::generate(&config, &mut scene_rng(config.seed));
    let light_before = field.light_position();

    for _ in 0..600 {
        field.update(0.1);
    }

    for b in &field.boxes {
        assert!(b.position.x.abs() <= 4.0, "{:?}", b.position);
        assert!(b.position.y.abs() <= 4.0, "{:?}", b.position);
        assert!(b.position.z.abs() <= 4.0, "{:?}", b.position);
        assert!((0.0..std::f32::consts::TAU).contains(&b.rotation));
    }
    // the light box does not drift
    assert_eq!(field.light_position(), light_before);
}

#[test]
fn butterflies_keep_to_the_meadow() {
    let mut rng = scene_rng(Some(3));
    let count = 3;
    let mut butterflies: Vec<_> = (0..count)
        .map(|i| Butterfly::spawn(i, count, 0.005, &mut rng))
        .collect();

    // two simulated minutes at 60 frames per second
    for _ in 0..7200 {
        for b in butterflies.iter_mut() {
            b.update(1.0 / 60.0, &mut rng);
        }
    }

    for b in &butterflies {
        // a butterfly may overshoot the boundary by one step before turning
        assert!(b.position.x.abs() <= 10.1, "{:?}", b.position);
        assert!(b.position.z.abs() <= 10.1, "{:?}", b.position);
        assert!((0.5..=5.0).contains(&b.position.y));
        assert!(b.wing_angle > 0.0);
    }
}
