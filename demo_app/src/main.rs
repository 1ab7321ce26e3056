//! Scene cache demo application
//!
//! Walks a player through three scenes whose combined assets do not fit the
//! configured caches, so the client has to rebuild them on the way.
//! Pass a `.toml` or `.ron` config path as the first argument to override
//! `client.toml`.

use rust_embed::RustEmbed;
use scene_cache::ecs::Query;
use scene_cache::foundation::logging;
use scene_cache::prelude::*;
use std::path::{Path, PathBuf};

#[derive(RustEmbed)]
#[folder = "assets/"]
struct DemoAssets;

const RUN_TICKS: u64 = 180;

fn scenery(sprites: &'static [&'static str], sound: &'static str) -> ScenePlan {
    Box::new(move |width, height, storage: &Storage| {
        log::debug!("Building scenery {width}x{height}");
        storage.spawn(
            Components::new()
                .with_sprites(SpriteBundle::from_paths(sprites.iter().copied())?)
                .with_sounds(SoundBundle::from_paths([sound])?),
        );
        Ok(())
    })
}

fn meadow_plan() -> ScenePlan {
    let scenery = scenery(&["grass.png"], "birds.wav");
    Box::new(move |width, height, storage: &Storage| {
        scenery(width, height, storage)?;
        storage.spawn(
            Components::new()
                .with_sprites(SpriteBundle::from_paths(["hero.png"])?)
                .with_camera(CameraIndex(0)),
        );
        Ok(())
    })
}

fn player_in(scene: &Scene) -> Vec<Entity> {
    scene
        .storage()
        .cursor(Query::all().with_camera())
        .map(|(entity, _)| entity)
        .collect()
}

fn load_config() -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let path = std::env::args()
        .nth(1)
        .map_or_else(|| manifest_dir.join("client.toml"), PathBuf::from);
    log::info!("Loading configuration from {}", path.display());

    let mut config = ClientConfig::load_or_default(&path)?;
    if config.assets.root.is_relative() {
        config.assets.root = manifest_dir.join(&config.assets.root);
    }
    Ok(config)
}

fn log_frame(client: &Client) {
    let live = client.caches().snapshot();
    let shown: Vec<String> = client
        .presentations()
        .iter()
        .map(|p| format!("{} -> {}", p.scene.name(), p.shown.name()))
        .collect();
    log::info!(
        "tick {:>3} | cache {:?} | sprites {}/{} sounds {}/{} | rebuilds {} | {}",
        client.current_tick(),
        client.cache_state(),
        live.sprites.len(),
        live.sprites.capacity(),
        live.sounds.len(),
        live.sounds.capacity(),
        client.rebuilds_started(),
        shown.join(", ")
    );
}

fn run(client: &mut Client) -> Result<(), Box<dyn std::error::Error>> {
    let meadow = client.register_scene("meadow", 640, 480, Some(meadow_plan()))?;
    let cave = client.register_scene("cave", 320, 240, Some(scenery(&["rock.png", "bat.png"], "drip.wav")))?;
    let tower = client.register_scene("tower", 320, 960, Some(scenery(&["brick.png", "flag.png"], "wind.wav")))?;
    client.activate_camera()?;

    let tick_duration = client.config().tick_duration();
    let stopwatch = Stopwatch::start_new();
    while client.current_tick() < RUN_TICKS {
        match client.current_tick() {
            40 => {
                log::info!("Player walks into the cave");
                client.activate_scene(&cave, &player_in(&meadow))?;
            }
            80 => {
                log::info!("Leaving the meadow, climbing the tower");
                client.deactivate_scene(&meadow);
                client.activate_scene(&tower, &[])?;
            }
            120 => {
                log::info!("Back to the meadow");
                client.deactivate_scene(&tower);
                client.change_scene(&meadow, &player_in(&cave))?;
            }
            _ => {}
        }

        if let Err(err) = client.update() {
            log::error!("Frame {} failed: {err}", client.current_tick());
        }
        if client.current_tick() % 20 == 0 {
            log_frame(client);
        }
        std::thread::sleep(tick_duration);
    }

    client.wait_for_rebuild();
    log::info!(
        "Ran {RUN_TICKS} ticks in {:.2}ms with {} cache rebuild(s)",
        stopwatch.elapsed_millis(),
        client.rebuilds_started()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_level(log::LevelFilter::Info);
    log::info!("Starting scene cache demo");

    let config = load_config()?;
    let embedded = match config.assets.mode {
        AssetMode::Embedded => Some(EmbeddedAssetSource::from_embed::<DemoAssets>(
            &config.assets.images_dir,
            &config.assets.sounds_dir,
        )),
        AssetMode::Filesystem => None,
    };

    let mut client = Client::from_config(config, embedded)?;
    run(&mut client)?;

    log::info!("Demo finished");
    Ok(())
}
