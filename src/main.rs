use std::path::PathBuf;

use luminous_field::{
    config::SceneConfig,
    entities::{boxes, butterfly, overlay, skybox},
    flow::{self, FlowConstructor},
};

/// Nothing is shared between the flows; each one keeps its own state.
#[derive(Debug, Default)]
struct State;

fn main() -> anyhow::Result<()> {
    // usage: luminous-field [config.toml]
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let scene = SceneConfig::load_or_default(config_path.as_deref())?;

    let constructors: Vec<FlowConstructor<State, ()>> = vec![
        skybox::constructor(&scene),
        boxes::constructor(&scene),
        butterfly::constructor(&scene),
        overlay::constructor(&scene),
    ];

    flow::run(scene, constructors)
}
