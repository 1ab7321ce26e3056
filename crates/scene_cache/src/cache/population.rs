//! Background asset population for scenes

use crossbeam::channel::Sender;
use std::sync::Arc;

use super::CacheGeneration;
use crate::assets::{AssetError, SoundLoader, SpriteLoader};
use crate::ecs::Query;
use crate::foundation::time::Stopwatch;
use crate::scene::Scene;

/// Completion signal of a background task, consumed once by the driver
#[derive(Debug)]
pub enum Completion {
    /// A scene was populated against the generation tagged `tags`
    Populated {
        /// Scene that was populated
        scene: Arc<Scene>,
        /// Scene epoch when the population started
        epoch: u64,
        /// Generation tags of the caches used
        tags: (u32, u32),
        /// Outcome of the population
        result: Result<(), AssetError>,
    },
    /// A rebuild finished; `scenes` were populated into the new generation
    Rebuilt {
        /// Sequence number of the rebuild
        rebuild: usize,
        /// Scenes included in the rebuild, with their epoch at rebuild start
        scenes: Vec<(Arc<Scene>, u64)>,
        /// Whether the new generation was published
        succeeded: bool,
    },
}

/// Runs the asset loaders over a scene's entities
#[derive(Clone)]
pub struct Populator {
    sprite_loader: SpriteLoader,
    sound_loader: SoundLoader,
    sender: Sender<Completion>,
}

impl Populator {
    /// Populator reporting completions on `sender`
    pub fn new(sprite_loader: SpriteLoader, sound_loader: SoundLoader, sender: Sender<Completion>) -> Self {
        Self {
            sprite_loader,
            sound_loader,
            sender,
        }
    }

    /// Channel completions are reported on
    pub fn sender(&self) -> &Sender<Completion> {
        &self.sender
    }

    /// Resolve every sprite and sound of `scene` into `generation`
    pub fn populate(&self, scene: &Scene, generation: &CacheGeneration) -> Result<(), AssetError> {
        let storage = scene.storage();
        for (_, components) in storage.cursor(Query::all().with_sprites()) {
            if let Some(bundle) = &components.sprites {
                self.sprite_loader.load(bundle, &generation.sprites)?;
            }
        }
        for (_, components) in storage.cursor(Query::all().with_sounds()) {
            if let Some(bundle) = &components.sounds {
                self.sound_loader.load(bundle, &generation.sounds)?;
            }
        }
        Ok(())
    }

    /// Populate `scene` on a worker thread and report a [`Completion::Populated`].
    ///
    /// The caller must already hold the scene's loading claim.
    pub fn spawn(&self, scene: Arc<Scene>, generation: CacheGeneration) {
        let populator = self.clone();
        let name = scene.name().to_string();
        let epoch = scene.epoch();
        let worker_scene = Arc::clone(&scene);

        let spawned = std::thread::Builder::new()
            .name(format!("populate-{name}"))
            .spawn(move || {
                let stopwatch = Stopwatch::start_new();
                let result = populator.populate(&worker_scene, &generation);
                log::debug!(
                    "Populated scene '{}' in {:.2}ms ({})",
                    worker_scene.name(),
                    stopwatch.elapsed_millis(),
                    if result.is_ok() { "ok" } else { "failed" }
                );
                let completion = Completion::Populated {
                    scene: worker_scene,
                    epoch,
                    tags: generation.tags(),
                    result,
                };
                if populator.sender.send(completion).is_err() {
                    log::trace!("Population finished after the client shut down");
                }
            });

        if let Err(err) = spawned {
            log::error!("Could not start population for scene '{name}': {err}");
            scene.abort_loading();
        }
    }
}

impl std::fmt::Debug for Populator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Populator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetKind, EmbeddedAssetSource, SpriteBundle};
    use crate::ecs::Components;
    use std::time::Duration;

    fn png() -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 255]));
        let mut cursor = std::io::Cursor::new(Vec::new());
        image.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    fn populator() -> (Populator, crossbeam::channel::Receiver<Completion>) {
        let archive = EmbeddedAssetSource::new();
        archive.insert(AssetKind::Image, "a.png", png());
        let source: Arc<dyn crate::assets::AssetSource> = Arc::new(archive);
        let (sender, receiver) = crossbeam::channel::unbounded();
        (
            Populator::new(SpriteLoader::new(Arc::clone(&source)), SoundLoader::new(source), sender),
            receiver,
        )
    }

    #[test]
    fn test_spawn_reports_completion() {
        let (populator, receiver) = populator();
        let scene = Arc::new(Scene::new("one", 1, 1, None));
        scene
            .storage()
            .spawn(Components::new().with_sprites(SpriteBundle::from_paths(["a.png"]).unwrap()));
        let generation = CacheGeneration::new(4, 4);

        assert!(scene.try_start_loading());
        populator.spawn(Arc::clone(&scene), generation.clone());

        match receiver.recv_timeout(Duration::from_secs(5)).unwrap() {
            Completion::Populated { scene: done, epoch, tags, result } => {
                assert!(Arc::ptr_eq(&done, &scene));
                assert_eq!(epoch, scene.epoch());
                assert_eq!(tags, generation.tags());
                assert!(result.is_ok());
            }
            other => panic!("unexpected completion {other:?}"),
        }
        assert!(generation.sprites.contains_key("a.png"));
    }

    #[test]
    fn test_populate_reports_capacity() {
        let (populator, _receiver) = populator();
        let scene = Scene::new("one", 1, 1, None);
        scene
            .storage()
            .spawn(Components::new().with_sprites(SpriteBundle::from_paths(["a.png"]).unwrap()));

        let err = populator
            .populate(&scene, &CacheGeneration::new(0, 1))
            .unwrap_err();
        assert!(err.is_capacity_exceeded());
    }
}
