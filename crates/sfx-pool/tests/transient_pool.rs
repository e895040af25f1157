//! Transient Voice Pool Integration Tests
//!
//! Tests for:
//! - Auto-return timing from the selected clip and pitch
//! - Manual return racing a scheduled auto-return
//! - Stale tickets after a voice is leased again
//! - Capacity-driven eviction

use approx::assert_relative_eq;
use sfx_core::ClipHandle;
use sfx_pool::{
    EffectDefinition, EffectPool, HeadlessDevice, PoolBackend, PoolConfig, PoolError,
    TickScheduler, VoiceState,
};
use std::sync::Arc;

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn create_pool(config: PoolConfig) -> (EffectPool, HeadlessDevice, TickScheduler) {
    let _ = env_logger::builder().is_test(true).try_init();
    let (backend, device, _, scheduler) = PoolBackend::headless();
    (EffectPool::new(config, backend), device, scheduler)
}

/// Advance device and scheduler together
fn tick(device: &HeadlessDevice, scheduler: &TickScheduler, dt: f64) -> usize {
    device.advance(dt);
    scheduler.advance(dt)
}

fn chime() -> Arc<EffectDefinition> {
    Arc::new(EffectDefinition::new("sfx.chime", "Chime").with_clip(ClipHandle::new(1, 2.0)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUTO-RETURN
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_auto_return_after_clip_length() {
    let (mut pool, device, scheduler) = create_pool(PoolConfig::deterministic(1));

    let id = pool.play_definition(&chime(), true).unwrap();
    assert_eq!(scheduler.pending(), 1);
    assert_eq!(pool.pooled_counts(), (0, 1));

    assert_eq!(tick(&device, &scheduler, 1.0), 0);
    assert_eq!(pool.process_returns(), 0);
    assert_eq!(pool.voice(id).unwrap().state(), VoiceState::Playing);

    assert_eq!(tick(&device, &scheduler, 1.0), 1);
    assert_eq!(pool.process_returns(), 1);
    assert_eq!(pool.pooled_counts(), (1, 1));
    assert_eq!(pool.voice(id).unwrap().state(), VoiceState::Idle);
}

#[test]
fn test_manual_return_then_scheduled_return_is_noop() {
    let (mut pool, device, scheduler) = create_pool(PoolConfig::deterministic(1));

    let id = pool.play_definition(&chime(), true).unwrap();
    tick(&device, &scheduler, 1.0);
    pool.return_voice(id).unwrap();
    assert_eq!(pool.pooled_counts(), (1, 1));

    assert_eq!(tick(&device, &scheduler, 1.0), 1);
    assert_eq!(pool.process_returns(), 0);
    assert_eq!(pool.pooled_counts(), (1, 1));

    // The pool still hands the voice out exactly once
    let again = pool.play_definition(&chime(), false).unwrap();
    assert_eq!(again, id);
    assert_eq!(pool.pooled_counts(), (0, 1));
}

#[test]
fn test_stale_ticket_does_not_return_new_lease() {
    let (mut pool, device, scheduler) = create_pool(PoolConfig::deterministic(1));

    let id = pool.play_definition(&chime(), true).unwrap();
    tick(&device, &scheduler, 1.0);
    pool.return_voice(id).unwrap();

    // Same voice, new lease, no auto-return
    let again = pool.play_definition(&chime(), false).unwrap();
    assert_eq!(again, id);

    tick(&device, &scheduler, 1.0);
    assert_eq!(pool.process_returns(), 0);
    assert!(pool.voice(id).unwrap().is_active());
    assert_eq!(pool.return_voice(id), Ok(()));
}

#[test]
fn test_auto_return_uses_selected_pitch() {
    let (mut pool, device, scheduler) = create_pool(PoolConfig::deterministic(77));
    let def = Arc::new(
        EffectDefinition::new("sfx.whoosh", "Whoosh")
            .with_clip(ClipHandle::new(3, 1.5))
            .with_pitch_range(0.5, 1.5),
    );

    let id = pool.play_definition(&def, true).unwrap();
    let pitch = pool.voice(id).unwrap().active_pitch().unwrap();
    let expected = 1.5 * pitch.abs() as f64;

    tick(&device, &scheduler, expected - 0.01);
    assert_eq!(pool.process_returns(), 0);
    tick(&device, &scheduler, 0.02);
    assert_eq!(pool.process_returns(), 1);
}

#[test]
fn test_auto_return_uses_selected_clip() {
    let (mut pool, device, scheduler) = create_pool(PoolConfig::deterministic(5));
    let def = Arc::new(
        EffectDefinition::new("sfx.step", "Step")
            .with_clips([ClipHandle::new(1, 0.5), ClipHandle::new(2, 3.0)])
            .with_random_clip(),
    );

    let id = pool.peek_definition(&def).unwrap().set_clip_index(1).id();
    pool.play_voice(id, true);
    assert_eq!(
        pool.voice(id).unwrap().active_clip(),
        Some(ClipHandle::new(2, 3.0))
    );

    tick(&device, &scheduler, 2.9);
    assert_eq!(pool.process_returns(), 0);
    tick(&device, &scheduler, 0.2);
    assert_eq!(pool.process_returns(), 1);
}

#[test]
fn test_auto_return_on_the_frame_the_clip_ends() {
    let (mut pool, device, scheduler) = create_pool(PoolConfig::deterministic(1));
    let tick_sfx = Arc::new(
        EffectDefinition::new("sfx.tick", "Tick").with_clip(ClipHandle::new(4, 0.1)),
    );

    let id = pool.play_definition(&tick_sfx, true).unwrap();
    assert_eq!(tick(&device, &scheduler, 0.1), 1);
    assert!(!pool.voice(id).unwrap().is_playing());
    assert_eq!(pool.process_returns(), 1);
    assert_eq!(scheduler.pending(), 0);
}

#[test]
fn test_failed_play_schedules_nothing() {
    let (mut pool, _, scheduler) = create_pool(PoolConfig::deterministic(1));
    let empty = Arc::new(EffectDefinition::new("sfx.empty", "Empty"));

    let id = pool.play_definition(&empty, true).unwrap();
    assert_eq!(scheduler.pending(), 0);
    assert!(pool.voice(id).unwrap().active_clip().is_none());
}

#[test]
fn test_auto_return_ignored_for_key_linked_voice() {
    let (mut pool, _, scheduler) = create_pool(PoolConfig::deterministic(1));
    pool.init([], [chime()]);

    let id = pool.peek(&"sfx.chime".into()).unwrap().id();
    pool.play_voice(id, true);
    assert_eq!(scheduler.pending(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// CAPACITY
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_many_overlapping_plays_recycle() {
    let (mut pool, device, scheduler) = create_pool(PoolConfig::deterministic(1));

    for _ in 0..8 {
        pool.play_definition(&chime(), true);
    }
    assert_eq!(pool.pooled_counts(), (0, 8));

    tick(&device, &scheduler, 2.5);
    assert_eq!(pool.process_returns(), 8);
    assert_eq!(device.playing_channels(), 0);

    for _ in 0..8 {
        pool.play_definition(&chime(), true);
    }
    assert_eq!(device.channels_created(), 8);
}

#[test]
fn test_voice_limit_reclaims_longest_lease() {
    let (mut pool, device, scheduler) = create_pool(PoolConfig::compact(2));

    let a = pool.play_definition(&chime(), true).unwrap();
    let b = pool.play_definition(&chime(), true).unwrap();
    let c = pool.play_definition(&chime(), true).unwrap();
    assert!(pool.voice(a).is_none());
    assert_eq!(device.channels_alive(), 2);

    // The reclaimed voice's ticket is dropped, the rest return
    tick(&device, &scheduler, 2.0);
    assert_eq!(pool.process_returns(), 2);
    assert!(pool.voice(b).is_some());
    assert!(pool.voice(c).is_some());
    assert_eq!(
        pool.return_voice(a),
        Err(PoolError::UnknownVoice(a))
    );
}

#[test]
fn test_headless_clock_matches_clip_length() {
    let (mut pool, device, _) = create_pool(PoolConfig::deterministic(1));
    let id = pool.play_definition(&chime(), false).unwrap();

    device.advance(1.999);
    assert!(pool.voice(id).unwrap().is_playing());
    device.advance(0.002);
    assert!(!pool.voice(id).unwrap().is_playing());
    assert_relative_eq!(device.now(), 2.001, epsilon = 1e-9);
}
