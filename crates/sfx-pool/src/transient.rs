//! Transient voices
//!
//! Definition-driven playback through anonymous voices recycled by the
//! pool. Auto-return is scheduled with the host's
//! [`DelayScheduler`](crate::DelayScheduler) and lands in the return queue,
//! drained by [`EffectPool::process_returns`].

use std::sync::Arc;

use crate::definition::EffectDefinition;
use crate::error::{PoolError, PoolResult};
use crate::pool::EffectPool;
use crate::recycler::Release;
use crate::scheduler::ReturnTicket;
use crate::voice::{Voice, VoiceId, VoiceOrigin};

impl EffectPool {
    /// Lease a transient voice bound to `definition`
    ///
    /// Reuses the most recently returned voice, otherwise creates one. At the
    /// `max_voices` limit the longest-leased voice is reclaimed first.
    pub fn peek_definition(&mut self, definition: &Arc<EffectDefinition>) -> Option<&mut Voice> {
        let id = self.acquire_transient(definition)?;
        let voice = self.voices.get_mut(&id)?;
        voice.bump_lease();
        voice.init(Arc::clone(definition));
        Some(voice)
    }

    /// Lease, play, and optionally schedule the voice's return
    pub fn play_definition(
        &mut self,
        definition: &Arc<EffectDefinition>,
        auto_return: bool,
    ) -> Option<VoiceId> {
        let id = self.peek_definition(definition)?.id();
        self.play_voice(id, auto_return);
        Some(id)
    }

    /// Play a voice by id
    ///
    /// With `auto_return`, a transient voice is returned after
    /// `clip length × |pitch|` of the clip and pitch actually selected.
    /// The magnitude is used so a reversed clip (negative pitch) still gets
    /// a positive delay. A play that fails schedules nothing.
    pub fn play_voice(&mut self, id: VoiceId, auto_return: bool) -> Option<&mut Voice> {
        let Some(voice) = self.voices.get_mut(&id) else {
            log::warn!("Attempted to play unknown voice {}", id);
            return None;
        };
        let played = voice.play().is_ok();

        if auto_return {
            if voice.origin() != VoiceOrigin::Pooled {
                log::warn!("Voice {} is key-linked, ignoring auto-return", id);
            } else if !played {
                log::debug!("Voice {} did not play, no return scheduled", id);
            } else if let Some(params) = voice.last_params() {
                let seconds = params.clip.length_secs * params.pitch.abs();
                let ticket = ReturnTicket {
                    voice: id,
                    lease: voice.lease(),
                };
                let tx = self.returns_tx.clone();
                self.scheduler.delay(
                    seconds,
                    Box::new(move || {
                        tx.send(ticket);
                    }),
                );
                log::trace!("Voice {} returns in {:.3}s", id, seconds);
            }
        }
        Some(voice)
    }

    /// Release a transient voice back to the pool
    ///
    /// Returning an already-free voice changes nothing. It is reported as
    /// [`PoolError::AlreadyReleased`] when collection checks are on.
    pub fn return_voice(&mut self, id: VoiceId) -> PoolResult<()> {
        let voice = self.voices.get(&id).ok_or(PoolError::UnknownVoice(id))?;
        if voice.origin() != VoiceOrigin::Pooled {
            return Err(PoolError::NotPooled(id));
        }

        match self.recycler.release(id) {
            Release::Stored => {}
            Release::Evicted(oldest) => {
                log::debug!("Transient pool full, destroying voice {}", oldest);
                self.destroy_voice(oldest);
            }
            Release::AlreadyFree => {
                if self.recycler.collection_checks() {
                    let error = PoolError::AlreadyReleased(id);
                    log::error!("{}", error);
                    return Err(error);
                }
                log::debug!("Voice {} is already in the pool", id);
                return Ok(());
            }
            Release::Unknown => return Err(PoolError::UnknownVoice(id)),
        }

        if let Some(voice) = self.voices.get_mut(&id) {
            voice.deinit();
        }
        Ok(())
    }

    /// Apply queued auto-returns. Returns how many voices went back.
    ///
    /// Tickets for voices returned manually, or leased again since, are
    /// dropped.
    pub fn process_returns(&mut self) -> usize {
        let mut returned = 0;
        for ticket in self.returns_rx.drain() {
            let current = self.voices.get(&ticket.voice).map(Voice::lease);
            if current != Some(ticket.lease) || !self.recycler.is_leased(ticket.voice) {
                log::trace!("Ignoring stale return for voice {}", ticket.voice);
                continue;
            }
            if self.return_voice(ticket.voice).is_ok() {
                returned += 1;
            }
        }
        returned
    }

    /// (idle, total) transient voices
    pub fn pooled_counts(&self) -> (usize, usize) {
        (self.recycler.count_inactive(), self.recycler.count_all())
    }

    fn acquire_transient(&mut self, definition: &EffectDefinition) -> Option<VoiceId> {
        if let Some(id) = self.recycler.acquire() {
            return Some(id);
        }

        if let Some(limit) = self.config.max_voices {
            if self.recycler.count_all() >= limit {
                if let Some(oldest) = self.recycler.oldest_leased() {
                    log::warn!(
                        "Transient voice limit ({}) reached, reclaiming voice {}",
                        limit,
                        oldest
                    );
                    self.recycler.forget(oldest);
                    self.destroy_voice(oldest);
                }
            }
        }

        let Some(template) = self
            .config
            .default_template
            .clone()
            .or_else(|| definition.template_override.clone())
        else {
            log::error!(
                "{}",
                PoolError::MissingTemplate {
                    key: definition.key.clone()
                }
            );
            return None;
        };

        match self.spawn_voice(&template, VoiceOrigin::Pooled) {
            Ok(id) => {
                self.recycler.register(id);
                Some(id)
            }
            Err(e) => {
                log::error!("Failed to create a transient voice for '{}': {}", definition.key, e);
                None
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
