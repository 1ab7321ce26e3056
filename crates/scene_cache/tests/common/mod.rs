//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use scene_cache::assets::AssetKind;
use scene_cache::cache::ResolutionError;
use scene_cache::prelude::*;

/// Assets referenced by the four test scenes: two sprites and one sound each
pub const SCENE_ONE: [&str; 3] = ["scene1_sprite1.png", "scene1_sprite2.png", "scene1_sound.wav"];
pub const SCENE_TWO: [&str; 3] = ["scene2_sprite1.png", "scene2_sprite2.png", "scene2_sound.wav"];
pub const SCENE_THREE: [&str; 3] = ["scene3_sprite1.png", "scene3_sprite2.png", "scene3_sound.wav"];
pub const SCENE_FOUR: [&str; 3] = ["scene4_sprite1.png", "scene5_sprite2.png", "scene6_sound.wav"];

pub fn png_bytes(shade: u8) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(4, 4, image::Rgba([shade, shade, shade, 255]));
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, image::ImageFormat::Png)
        .expect("encode png");
    cursor.into_inner()
}

pub fn wav_bytes(frames: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        for frame in 0..frames {
            let sample = i16::try_from(frame % 200).unwrap_or(0) * 100;
            writer.write_sample(sample).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}

/// In-memory archive holding every asset of the four test scenes
pub fn archive() -> EmbeddedAssetSource {
    let archive = EmbeddedAssetSource::new();
    for (shade, key) in [SCENE_ONE, SCENE_TWO, SCENE_THREE, SCENE_FOUR]
        .iter()
        .flatten()
        .enumerate()
    {
        if key.ends_with(".png") {
            archive.insert(AssetKind::Image, *key, png_bytes(u8::try_from(shade).unwrap_or(0)));
        } else {
            archive.insert(AssetKind::Sound, *key, wav_bytes(400));
        }
    }
    archive
}

/// Counts resolution handler calls instead of exiting the process
#[derive(Clone, Default)]
pub struct HandlerCalls(Arc<AtomicUsize>);

impl HandlerCalls {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn client(sprites: usize, sounds: usize, scenes: usize) -> (Client, HandlerCalls) {
    let config = ClientConfig::new("integration")
        .with_capacities(sprites, sounds)
        .with_scene_capacity(scenes);
    let client = Client::new(config, Arc::new(archive())).expect("client");
    let calls = HandlerCalls::default();
    let counter = Arc::clone(&calls.0);
    client.set_resolution_error_handler(Arc::new(move |_: &ResolutionError| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    (client, calls)
}

/// One entity holding the first two keys as sprites and the third as a sound
pub fn scene_plan(assets: [&'static str; 3]) -> ScenePlan {
    Box::new(move |_, _, storage: &Storage| {
        storage.spawn(
            Components::new()
                .with_sprites(SpriteBundle::from_paths(assets[..2].iter().copied())?)
                .with_sounds(SoundBundle::from_paths([assets[2]])?)
                .with_camera(CameraIndex(0)),
        );
        Ok(())
    })
}

/// Run updates until `done` holds; panics after a generous deadline
pub fn update_until(client: &mut Client, what: &str, done: impl Fn(&Client) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done(client) {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        client.update().expect("update");
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Run a fixed number of updates with a short pause between them
pub fn run_ticks(client: &mut Client, ticks: usize) {
    for _ in 0..ticks {
        client.update().expect("update");
        std::thread::sleep(Duration::from_millis(2));
    }
}

pub fn in_live_cache(client: &Client, key: &str) -> bool {
    let live = client.caches().snapshot();
    if key.ends_with(".png") {
        live.sprites.contains_key(key)
    } else {
        live.sounds.contains_key(key)
    }
}

pub fn sorted(mut keys: Vec<String>) -> Vec<String> {
    keys.sort();
    keys
}
