//! EffectPool Integration Tests
//!
//! Tests for:
//! - Key resolution (registered, unregistered, reserved and reference keys)
//! - Duplicate key rejection
//! - Voice reuse rule (virtual vs exclusive voices)
//! - Volume/pitch clamping and position passthrough
//! - Mixer volume conversion
//! - Set removal and load-state aggregation

use approx::assert_relative_eq;
use sfx_core::{ClipHandle, ClipLoader, Key, KeyReference, LoadState};
use sfx_pool::{
    ChannelCall, EffectDefinition, EffectPool, EffectSet, HeadlessDevice, HeadlessLoader,
    PoolBackend, PoolConfig, PoolError, VoiceState,
};
use std::sync::Arc;

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn create_pool() -> (EffectPool, HeadlessDevice, HeadlessLoader) {
    init_logger();
    let (backend, device, loader, _) = PoolBackend::headless();
    (
        EffectPool::new(PoolConfig::deterministic(2024), backend),
        device,
        loader,
    )
}

fn effect(key: &str, clip: u32, length: f32) -> Arc<EffectDefinition> {
    Arc::new(EffectDefinition::new(key, key).with_clip(ClipHandle::new(clip, length)))
}

fn exclusive(key: &str, clip: u32, length: f32) -> Arc<EffectDefinition> {
    Arc::new(
        EffectDefinition::new(key, key)
            .with_clip(ClipHandle::new(clip, length))
            .with_virtual(false),
    )
}

fn key(name: &str) -> Key {
    Key::from_literal(name)
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY RESOLUTION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_registered_keys_always_resolve() {
    let (mut pool, _, _) = create_pool();
    let set = Arc::new(
        EffectSet::new("ui")
            .with_definition(effect("ui.click", 1, 0.2))
            .with_definition(exclusive("ui.music", 2, 60.0)),
    );
    pool.init([set], [effect("world.bird", 3, 1.0)]);

    for name in ["ui.click", "ui.music", "world.bird"] {
        let voice = pool.peek(&key(name)).expect("registered key resolves");
        assert_eq!(voice.key(), Some(&key(name)));
        assert_eq!(voice.state(), VoiceState::Ready);
    }
}

#[test]
fn test_unregistered_key_is_a_miss_without_mutation() {
    let (mut pool, device, _) = create_pool();
    pool.init([], [effect("a", 1, 1.0)]);
    let voices_before = pool.voice_count();
    let channels_before = device.channels_created();

    assert!(pool.peek(&key("nope")).is_none());
    assert!(pool.play(&key("nope")).is_none());

    assert_eq!(pool.voice_count(), voices_before);
    assert_eq!(device.channels_created(), channels_before);
    assert_eq!(pool.effect_count(), 1);
    assert!(pool.key_id(&key("nope")).is_none());
    assert_eq!(pool.live_voice_count(&key("nope")), 0);
}

#[test]
fn test_reserved_key_is_a_miss() {
    let (mut pool, _, _) = create_pool();
    pool.init([], [effect("a", 1, 1.0)]);

    assert!(pool.peek(&Key::none()).is_none());
    assert!(pool.play(&Key::from_literal("")).is_none());

    let report = pool.init([], [effect("", 2, 1.0)]);
    assert!(matches!(report.rejected[..], [PoolError::ReservedKey { .. }]));
}

#[test]
fn test_reference_key_resolves_like_literal() {
    let (mut pool, _, _) = create_pool();
    pool.init([], [effect("ui.click", 1, 0.2)]);

    let reference = Key::from_reference(Arc::new(KeyReference::new("ui.click")));
    assert_eq!(reference, key("ui.click"));

    let by_reference = pool.peek(&reference).unwrap().id();
    let by_literal = pool.peek(&key("ui.click")).unwrap().id();
    assert_eq!(by_reference, by_literal);
    assert_eq!(pool.live_voice_count(&reference), 1);

    let missing = Key::from_reference(Arc::new(KeyReference::new("ui.hover")));
    assert!(pool.play(&missing).is_none());
}

#[test]
fn test_duplicate_key_keeps_first_definition() {
    let (mut pool, _, _) = create_pool();
    let first = effect("hit", 1, 0.5);
    let second = effect("hit", 2, 0.5);

    let report = pool.init([], [Arc::clone(&first), Arc::clone(&second)]);
    assert_eq!(report.accepted.len(), 1);
    assert!(matches!(report.rejected[..], [PoolError::DuplicateKey { .. }]));

    for _ in 0..3 {
        let voice = pool.play(&key("hit")).unwrap();
        assert!(Arc::ptr_eq(voice.definition().unwrap(), &first));
        assert_eq!(voice.active_clip(), Some(ClipHandle::new(1, 0.5)));
    }
}

#[test]
fn test_duplicate_across_set_and_standalone() {
    let (mut pool, _, _) = create_pool();
    let member = effect("shared", 1, 0.5);
    let set = Arc::new(EffectSet::new("s").with_definition(Arc::clone(&member)));

    // Set members register before standalone definitions
    let report = pool.init([set], [effect("shared", 2, 0.5)]);
    assert_eq!(report.rejected.len(), 1);
    assert!(Arc::ptr_eq(pool.definition(&key("shared")).unwrap(), &member));
}

// ═══════════════════════════════════════════════════════════════════════════════
// REUSE RULE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_playing_virtual_voice_is_reused() {
    let (mut pool, _, _) = create_pool();
    pool.init([], [effect("coin", 1, 5.0)]);

    let first = pool.play(&key("coin")).unwrap();
    assert!(first.is_playing());
    let first = first.id();

    let again = pool.peek(&key("coin")).unwrap().id();
    assert_eq!(again, first);
    assert_eq!(pool.live_voice_count(&key("coin")), 1);
}

#[test]
fn test_playing_exclusive_voice_is_not_reused() {
    let (mut pool, device, _) = create_pool();
    pool.init([], [exclusive("engine", 1, 5.0)]);

    let first = pool.play(&key("engine")).unwrap().id();
    let second = pool.peek(&key("engine")).unwrap().id();
    assert_ne!(first, second);
    assert_eq!(pool.live_voice_count(&key("engine")), 2);

    // Once the stream ends the first voice is eligible again
    device.advance(6.0);
    assert_eq!(pool.peek(&key("engine")).unwrap().id(), first);
}

#[test]
fn test_exclusive_replay_replaces_stream() {
    let (mut pool, device, _) = create_pool();
    pool.init([], [exclusive("engine", 1, 5.0)]);

    let voice = pool.peek(&key("engine")).unwrap();
    voice.play().unwrap();
    voice.play().unwrap();
    assert_eq!(device.playing_channels(), 1);
}

#[test]
fn test_deinitialized_voice_is_not_reused() {
    let (mut pool, _, _) = create_pool();
    pool.init([], [effect("coin", 1, 1.0)]);

    let voice = pool.peek(&key("coin")).unwrap();
    let first = voice.id();
    voice.deinit();

    let next = pool.peek(&key("coin")).unwrap();
    assert_ne!(next.id(), first);
    assert!(next.is_active());
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_volume_and_pitch_are_clamped() {
    let (mut pool, _, _) = create_pool();
    pool.init([], [effect("coin", 1, 1.0)]);

    let cases = [(-1.0, 10.0, 0.0, 3.0), (5.0, -10.0, 1.0, -3.0)];
    for (volume, pitch, want_volume, want_pitch) in cases {
        let voice = pool.peek(&key("coin")).unwrap();
        voice.set_volume(volume).set_pitch(pitch);
        let params = *voice.play().unwrap().last_params().unwrap();
        assert_relative_eq!(params.volume, want_volume);
        assert_relative_eq!(params.pitch, want_pitch);
    }
}

#[test]
fn test_set_position_reaches_channel() {
    let (mut pool, device, _) = create_pool();
    pool.init([], [effect("bird", 1, 1.0)]);

    // The pre-warmed voice owns the first channel
    pool.peek(&key("bird")).unwrap().set_position([1.0, 2.0, 3.0]);
    assert!(device.calls(0).contains(&ChannelCall::Position([1.0, 2.0, 3.0])));
    assert_eq!(device.count_calls(|c| c.is_trigger()), 0);
}

#[test]
fn test_mixer_volume_gain() {
    let (mut pool, device, _) = create_pool();

    pool.set_mixer_volume("bus", 0.0).unwrap();
    assert_relative_eq!(device.mixer_parameter("bus").unwrap(), -80.0);

    pool.set_mixer_volume("bus", 1.0).unwrap();
    assert_relative_eq!(device.mixer_parameter("bus").unwrap(), 0.0);

    pool.set_mixer_volume("bus", 0.5).unwrap();
    assert_relative_eq!(
        device.mixer_parameter("bus").unwrap(),
        20.0 * 0.5f32.log10(),
        epsilon = 1e-5
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// SETS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_remove_set_unregisters_members() {
    let (mut pool, device, _) = create_pool();
    let set = Arc::new(
        EffectSet::new("S")
            .with_definition(effect("K1", 1, 1.0))
            .with_definition(exclusive("K2", 2, 1.0)),
    );
    pool.init([Arc::clone(&set)], [effect("other", 3, 1.0)]);
    pool.play(&key("K1"));
    pool.play(&key("K2"));
    pool.peek(&key("K2"));

    pool.remove_set(&set);

    assert!(pool.peek(&key("K1")).is_none());
    assert!(pool.peek(&key("K2")).is_none());
    assert!(pool.peek(&key("other")).is_some());
    assert_eq!(pool.set_count(), 0);
    assert_eq!(device.channels_alive(), 1);

    // Safe to repeat
    pool.remove_set(&set);
    assert_eq!(pool.effect_count(), 1);
}

#[test]
fn test_remove_set_through_rebuilt_instance() {
    let (mut pool, device, _) = create_pool();
    let build = || {
        EffectSet::new("S")
            .with_definition(effect("K1", 1, 1.0))
            .with_definition(effect("K2", 2, 1.0))
    };
    pool.init([Arc::new(build())], []);
    pool.play(&key("K1"));

    pool.remove_set(&build());

    assert_eq!(pool.set_count(), 0);
    assert!(pool.peek(&key("K1")).is_none());
    assert!(pool.peek(&key("K2")).is_none());
    assert!(pool.load_set(&key("S")).is_none());
    assert_eq!(device.channels_alive(), 0);

    pool.rebuild();
    assert_eq!(pool.effect_count(), 0);
}

#[test]
fn test_add_set_after_init() {
    let (mut pool, _, _) = create_pool();
    pool.init([], [effect("a", 1, 1.0)]);

    let set = Arc::new(
        EffectSet::new("late")
            .with_definition(effect("a", 9, 1.0))
            .with_definition(effect("b", 2, 1.0)),
    );
    let report = pool.add_set(set);
    assert_eq!(report.accepted.len(), 1);
    assert_eq!(report.rejected.len(), 1);
    assert!(pool.peek(&key("b")).is_some());
    assert_eq!(pool.set_count(), 1);
}

#[test]
fn test_set_load_state_reports_mixed() {
    let (mut pool, _, mut loader) = create_pool();
    let set = Arc::new(
        EffectSet::new("combat")
            .with_definition(effect("hit", 1, 1.0))
            .with_definition(effect("miss", 2, 1.0)),
    );
    pool.init([set], []);

    loader.request_load(ClipHandle::new(1, 1.0));
    loader.finish_loads();
    loader.request_load(ClipHandle::new(2, 1.0));

    let state = pool.set_load_state(&key("combat")).unwrap();
    assert_eq!(state, LoadState::LOADED | LoadState::LOADING);
    assert!(!state.is_uniform());
    assert!(!state.is_ready());
}

#[test]
fn test_set_load_state_reports_failures() {
    let (mut pool, _, loader) = create_pool();
    let set = Arc::new(
        EffectSet::new("combat")
            .with_definition(effect("hit", 1, 1.0))
            .with_definition(effect("miss", 2, 1.0)),
    );
    pool.init([set], []);
    loader.fail_clip(ClipHandle::new(2, 1.0));

    pool.load_set(&key("combat")).unwrap();
    loader.finish_loads();
    assert_eq!(
        pool.set_load_state(&key("combat")),
        Some(LoadState::LOADED | LoadState::FAILED)
    );
}

#[test]
fn test_load_set_twice_requests_once() {
    let (mut pool, _, loader) = create_pool();
    let set = Arc::new(EffectSet::new("ui").with_definition(effect("ui.click", 1, 0.2)));
    pool.init([set], []);

    pool.load_set(&key("ui"));
    loader.finish_loads();
    pool.load_set(&key("ui"));
    assert_eq!(loader.load_requests(), 1);
    assert_eq!(pool.set_load_state(&key("ui")), Some(LoadState::LOADED));
}
