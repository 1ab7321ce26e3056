//! Scene registration, activation and transition behavior

mod common;

use common::*;
use parking_lot::{Condvar, Mutex};
use scene_cache::assets::AssetKind;
use scene_cache::ecs::{Query, TransferError};
use scene_cache::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Holds every read until opened and records how many reads overlap
struct GatedSource {
    inner: EmbeddedAssetSource,
    open: Mutex<bool>,
    opened: Condvar,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl GatedSource {
    fn new(inner: EmbeddedAssetSource) -> Self {
        Self {
            inner,
            open: Mutex::new(false),
            opened: Condvar::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn release(&self) {
        *self.open.lock() = true;
        self.opened.notify_all();
    }

    fn wait_for_reader(&self) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while self.in_flight.load(Ordering::SeqCst) == 0 {
            assert!(Instant::now() < deadline, "no population reached the source");
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

impl AssetSource for GatedSource {
    fn read_bytes(&self, kind: AssetKind, key: &str) -> Result<Vec<u8>, AssetError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        {
            let mut open = self.open.lock();
            while !*open {
                self.opened.wait(&mut open);
            }
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.read_bytes(kind, key)
    }
}

fn names(client: &Client) -> Vec<String> {
    client
        .active_scenes()
        .iter()
        .map(|scene| scene.name().to_string())
        .collect()
}

#[test]
fn test_first_scene_loads_its_assets() {
    let (mut client, _calls) = client(16, 16, 4);
    let one = client
        .register_scene("one", 640, 480, Some(scene_plan(SCENE_ONE)))
        .unwrap();
    assert_eq!(names(&client), vec!["one"]);

    update_until(&mut client, "scene one ready", |_| one.is_ready());

    for key in &SCENE_ONE {
        assert!(in_live_cache(&client, key), "{key} should be cached");
    }
    assert_eq!(one.storage().len(), 1);
}

#[test]
fn test_change_scene_needs_exactly_one_active() {
    let (client, _calls) = client(16, 16, 4);
    let one = client.register_scene("one", 1, 1, None).unwrap();
    let two = client.register_scene("two", 1, 1, None).unwrap();
    let three = client.register_scene("three", 1, 1, None).unwrap();
    client.activate_scene(&two, &[]).unwrap();

    let before = names(&client);
    let err = client.change_scene(&three, &[]).unwrap_err();
    assert!(matches!(
        err,
        ClientError::Scene(SceneError::InvalidTransition { active: 2 })
    ));
    assert_eq!(names(&client), before);

    client.deactivate_scene(&one);
    client.deactivate_scene(&two);
    let err = client.change_scene(&three, &[]).unwrap_err();
    assert!(matches!(
        err,
        ClientError::Scene(SceneError::InvalidTransition { active: 0 })
    ));

    client.activate_scene(&one, &[]).unwrap();
    client.change_scene_by_name("three", &[]).unwrap();
    assert_eq!(names(&client), vec!["three"]);
}

#[test]
fn test_active_scenes_never_repeat() {
    let (client, _calls) = client(16, 16, 8);
    let scenes: Vec<Arc<Scene>> = (0..5)
        .map(|i| client.register_scene(&format!("s{i}"), 1, 1, None).unwrap())
        .collect();

    for step in 0..60_usize {
        let scene = &scenes[(step * 7 + step / 3) % scenes.len()];
        if step % 4 == 3 {
            client.deactivate_scene(scene);
        } else {
            client.activate_scene(scene, &[]).unwrap();
        }

        let mut seen = names(&client);
        let total = seen.len();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), total, "duplicate active scene after step {step}");
    }
}

#[test]
fn test_deactivation_resets_asset_locations() {
    let (mut client, _calls) = client(16, 16, 4);
    let one = client
        .register_scene("one", 1, 1, Some(scene_plan(SCENE_ONE)))
        .unwrap();
    update_until(&mut client, "scene one ready", |_| one.is_ready());

    let rows: Vec<_> = one
        .storage()
        .cursor(Query::all().with_sprites().with_sounds())
        .collect();
    assert!(!rows.is_empty());
    for (_, components) in &rows {
        let sprites = components.sprites.as_ref().unwrap();
        assert!(sprites.blueprints().iter().all(|b| b.location.is_resolved()));
    }

    assert!(client.deactivate_scene(&one));

    for (_, components) in &rows {
        let sprites = components.sprites.as_ref().unwrap();
        let sounds = components.sounds.as_ref().unwrap();
        assert!(sprites.blueprints().iter().all(|b| !b.location.is_resolved()));
        assert!(sounds.blueprints().iter().all(|b| !b.location.is_resolved()));
    }
    assert!(!one.is_loaded());

    // Key fallback still finds assets left in the live caches
    let sprites = client
        .caches()
        .materialize_sprites(rows[0].1.sprites.as_ref().unwrap())
        .unwrap();
    assert_eq!(sprites.len(), 2);
}

#[test]
fn test_activation_transfers_entities_transactionally() {
    let (client, _calls) = client(16, 16, 4);
    let one = client.register_scene("one", 1, 1, None).unwrap();
    let two = client.register_scene("two", 1, 1, None).unwrap();
    let player = one.storage().spawn(Components::new().with_camera(CameraIndex(0)));
    let ghost = Storage::new().spawn(Components::new());

    let err = client.activate_scene(&two, &[player, ghost]).unwrap_err();
    assert!(matches!(
        err,
        ClientError::Scene(SceneError::TransferFailure(TransferError::Unowned(entity))) if entity == ghost
    ));
    assert!(one.storage().contains(player));
    assert!(two.storage().is_empty());
    assert_eq!(names(&client), vec!["one"]);

    assert_eq!(client.activate_scene_by_name("two", &[player]).unwrap(), 1);
    assert!(two.storage().contains(player));
    assert!(!one.storage().contains(player));
    assert_eq!(names(&client), vec!["one", "two"]);
}

#[test]
fn test_change_scene_moves_entities_and_resets_origin() {
    let (mut client, _calls) = client(16, 16, 4);
    let one = client
        .register_scene("one", 1, 1, Some(scene_plan(SCENE_ONE)))
        .unwrap();
    let two = client.register_scene("two", 1, 1, None).unwrap();
    update_until(&mut client, "scene one ready", |_| one.is_ready());

    let player = one.storage().spawn(Components::new());
    client.change_scene(&two, &[player]).unwrap();

    assert_eq!(names(&client), vec!["two"]);
    assert!(two.storage().contains(player));
    assert!(!one.is_loaded());
    assert_eq!(two.last_activated_tick(), 0);
    assert_eq!(two.last_selected_tick(), client.current_tick());

    update_until(&mut client, "scene two ready", |_| two.is_ready());
}

#[test]
fn test_scene_registry_is_bounded() {
    let (client, _calls) = client(16, 16, 2);
    client.register_scene("one", 1, 1, None).unwrap();
    client.register_scene("two", 1, 1, None).unwrap();
    assert!(matches!(
        client.register_scene("three", 1, 1, None),
        Err(ClientError::Scene(SceneError::Registry(_)))
    ));
}

#[test]
fn test_deactivation_during_population() {
    let source = Arc::new(GatedSource::new(archive()));
    let config = ClientConfig::new("gated").with_capacities(16, 16).with_scene_capacity(4);
    let mut client = Client::new(config, source.clone()).unwrap();
    client.set_resolution_error_handler(Arc::new(|_: &scene_cache::cache::ResolutionError| {}));
    let one = client
        .register_scene("one", 1, 1, Some(scene_plan(SCENE_ONE)))
        .unwrap();

    client.update().unwrap();
    source.wait_for_reader();
    assert!(one.is_loading());

    // Bounce the scene while its first population is still blocked
    assert!(client.deactivate_scene(&one));
    client.activate_scene(&one, &[]).unwrap();
    run_ticks(&mut client, 5);
    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);

    assert!(client.deactivate_scene(&one));
    source.release();
    update_until(&mut client, "population drained", |_| !one.is_loading());

    let rows: Vec<_> = one
        .storage()
        .cursor(Query::all().with_sprites().with_sounds())
        .collect();
    assert!(!rows.is_empty());
    for (_, components) in &rows {
        let sprites = components.sprites.as_ref().unwrap();
        let sounds = components.sounds.as_ref().unwrap();
        assert!(sprites.blueprints().iter().all(|b| !b.location.is_resolved()));
        assert!(sounds.blueprints().iter().all(|b| !b.location.is_resolved()));
    }
    assert!(!one.is_loaded());
    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);

    client.activate_scene(&one, &[]).unwrap();
    update_until(&mut client, "scene one ready again", |_| one.is_ready());
    for (_, components) in &rows {
        let sprites = components.sprites.as_ref().unwrap();
        assert!(sprites.blueprints().iter().all(|b| b.location.is_resolved()));
    }
}
