use std::path::PathBuf;
use std::process::ExitCode;

use penumbra_engine::device::GpuInit;
use penumbra_engine::logging::{init_logging, LoggingConfig};
use penumbra_engine::window::{Runtime, RuntimeConfig};

mod viewer;

use viewer::ViewerApp;

const DEFAULT_SCENE: &str = "assets/sponza/Sponza.gltf";

/// First positional argument, or the bundled Sponza scene.
fn scene_path(mut args: impl Iterator<Item = String>) -> PathBuf {
    args.nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCENE))
}

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());

    let scene = scene_path(std::env::args());
    log::info!("scene file: {}", scene.display());

    let config = RuntimeConfig {
        title: "penumbra".to_string(),
        start_fullscreen: true,
        ..RuntimeConfig::default()
    };

    match Runtime::run(config, GpuInit::default(), ViewerApp::new(scene)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn scene_path_defaults_to_sponza() {
        assert_eq!(scene_path(args(&["penumbra-viewer"])), PathBuf::from(DEFAULT_SCENE));
    }

    #[test]
    fn first_argument_is_the_scene() {
        assert_eq!(
            scene_path(args(&["penumbra-viewer", "scenes/box.glb", "extra"])),
            PathBuf::from("scenes/box.glb")
        );
    }
}
