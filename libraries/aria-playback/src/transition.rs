//! Transition engine: seamless handoff between tracks
//!
//! Owns two pipeline slots, exactly one of which is active (feeding the
//! output device) at a time. A plain load stops and reuses the active slot;
//! gapless handoff pre-queues the next source on the active slot when the
//! pipeline signals it is about to finish; a crossfade runs complementary
//! volume ramps on both slots and swaps the active pointer.
//!
//! Ramps are advanced by [`TransitionEngine::tick`], driven by the
//! embedder's periodic timer. A tick only touches the slots' own volume, so
//! the timer can live on a worker task without racing anything else. At
//! most one ramp pair is ever in flight: a second load during a crossfade
//! hard-switches on the fading-in slot instead of stacking a third
//! transition.

use crate::pipeline::Pipeline;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Shape of a volume ramp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FadeCurve {
    /// Constant-rate ramp
    #[default]
    Linear,

    /// Constant perceived loudness across the fade pair
    ///
    /// sin/cos relationship: the two gains always satisfy
    /// in² + out² = 1.
    EqualPower,
}

impl FadeCurve {
    /// Gain at a normalized position of the fade
    ///
    /// `position` runs 0.0 → 1.0; `fade_out` selects the descending side.
    pub fn gain(self, position: f32, fade_out: bool) -> f32 {
        let position = position.clamp(0.0, 1.0);
        let t = if fade_out { 1.0 - position } else { position };

        match self {
            FadeCurve::Linear => t,
            FadeCurve::EqualPower => (t * std::f32::consts::PI * 0.5).sin(),
        }
    }
}

/// Transition (gapless/crossfade) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionSettings {
    /// Whether track changes crossfade (false = gapless handoff only)
    pub crossfade_enabled: bool,

    /// Crossfade duration in milliseconds (default: 3000)
    pub duration_ms: u32,

    /// Extra padding so the ramp extremes stay inaudible (default: 250)
    pub padding_ms: u32,

    /// Ramp shape
    pub curve: FadeCurve,
}

impl Default for TransitionSettings {
    fn default() -> Self {
        Self {
            crossfade_enabled: false,
            duration_ms: 3_000,
            padding_ms: 250,
            curve: FadeCurve::Linear,
        }
    }
}

impl TransitionSettings {
    /// The full ramp window: duration plus padding
    pub fn window(&self) -> Duration {
        Duration::from_millis(u64::from(self.duration_ms) + u64::from(self.padding_ms))
    }
}

/// One volume ramp, advanced tick by tick
#[derive(Debug, Clone)]
struct VolumeRamp {
    peak: f32,
    duration: Duration,
    elapsed: Duration,
    curve: FadeCurve,
    fade_out: bool,
}

impl VolumeRamp {
    fn fade_in(peak: f32, duration: Duration, curve: FadeCurve) -> Self {
        Self {
            peak,
            duration,
            elapsed: Duration::ZERO,
            curve,
            fade_out: false,
        }
    }

    fn fade_out(peak: f32, duration: Duration, curve: FadeCurve) -> Self {
        Self {
            peak,
            duration,
            elapsed: Duration::ZERO,
            curve,
            fade_out: true,
        }
    }

    /// Advance the ramp and return the new gain
    fn tick(&mut self, delta: Duration) -> f32 {
        self.elapsed = (self.elapsed + delta).min(self.duration);
        self.gain()
    }

    fn gain(&self) -> f32 {
        if self.duration.is_zero() {
            return if self.fade_out { 0.0 } else { self.peak };
        }
        let progress = self.elapsed.as_secs_f32() / self.duration.as_secs_f32();
        self.peak * self.curve.gain(progress, self.fade_out)
    }

    fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// The one ramp pair allowed in flight
#[derive(Debug)]
struct CrossfadeRamps {
    down_slot: usize,
    down: VolumeRamp,
    up: VolumeRamp,
}

/// How a load was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// Stop-and-play on the active slot
    Direct,

    /// Ramp pair started, active pointer swapped
    Crossfade,

    /// A crossfade was already running: the new track replaced the
    /// fading-in source outright
    HardSwitch,
}

/// What a tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// The in-flight crossfade finished and the outgoing slot stopped
    pub crossfade_completed: bool,

    /// The remaining-time check fired: playback crossfaded into this
    /// prepared uri
    pub next_started: Option<String>,
}

/// Two alternating pipeline slots with seamless handoff between them
pub struct TransitionEngine {
    slots: [Box<dyn Pipeline>; 2],
    active: usize,
    settings: TransitionSettings,
    fade: Option<CrossfadeRamps>,
    pending_next: Option<String>,
}

impl TransitionEngine {
    /// Create an engine over two pipeline slots
    pub fn new(a: Box<dyn Pipeline>, b: Box<dyn Pipeline>, settings: TransitionSettings) -> Self {
        Self {
            slots: [a, b],
            active: 0,
            settings,
            fade: None,
            pending_next: None,
        }
    }

    /// Current settings
    pub fn settings(&self) -> &TransitionSettings {
        &self.settings
    }

    /// Replace settings
    pub fn set_settings(&mut self, settings: TransitionSettings) {
        self.settings = settings;
    }

    /// Whether a ramp pair is currently in flight
    pub fn is_crossfading(&self) -> bool {
        self.fade.is_some()
    }

    /// The active slot
    pub fn active(&self) -> &dyn Pipeline {
        self.slots[self.active].as_ref()
    }

    /// Load a track into the engine
    pub fn load(&mut self, uri: &str) -> Handoff {
        self.pending_next = None;

        // Crossfades never stack more than one deep: replace the fading-in
        // source outright and stop the outgoing slot now
        if let Some(fade) = self.fade.take() {
            debug!("load during crossfade, hard-switching to {uri}");
            self.slots[fade.down_slot].stop();
            let slot = &mut self.slots[self.active];
            slot.stop();
            slot.set_source(uri);
            slot.set_volume(1.0);
            slot.play();
            return Handoff::HardSwitch;
        }

        let can_crossfade = self.settings.crossfade_enabled
            && self.settings.duration_ms > 0
            && self.slots[self.active].is_playing();

        if !can_crossfade {
            let slot = &mut self.slots[self.active];
            slot.clear_preload();
            slot.stop();
            slot.set_source(uri);
            slot.set_volume(1.0);
            slot.play();
            return Handoff::Direct;
        }

        // Ramp the outgoing slot down, swap active, ramp the incoming up
        let outgoing = self.active;
        let incoming = 1 - outgoing;
        let window = self.settings.window();
        let from = self.slots[outgoing].volume();

        self.fade = Some(CrossfadeRamps {
            down_slot: outgoing,
            down: VolumeRamp::fade_out(from, window, self.settings.curve),
            up: VolumeRamp::fade_in(1.0, window, self.settings.curve),
        });
        self.active = incoming;

        let slot = &mut self.slots[incoming];
        slot.stop();
        slot.set_volume(0.0);
        slot.set_source(uri);
        slot.play();
        debug!("crossfade started into {uri}");
        Handoff::Crossfade
    }

    /// Tell the engine which uri plays after the current one
    ///
    /// Enables the proactive crossfade trigger and the gapless preload.
    pub fn prepare_next(&mut self, uri: Option<&str>) {
        if self.pending_next.as_deref() != uri {
            self.slots[self.active].clear_preload();
            self.pending_next = uri.map(String::from);
        }
    }

    /// The pipeline reported it is about to finish its source
    ///
    /// Without crossfade, this is where the gapless pre-queue happens.
    pub fn handle_about_to_finish(&mut self) {
        if self.settings.crossfade_enabled {
            return;
        }
        if let Some(uri) = self.pending_next.clone() {
            debug!("pre-queueing {uri} for gapless handoff");
            self.slots[self.active].preload_next(&uri);
        }
    }

    /// Advance ramps and the remaining-time check
    pub fn tick(&mut self, delta: Duration) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        if let Some(fade) = &mut self.fade {
            let down_gain = fade.down.tick(delta);
            let up_gain = fade.up.tick(delta);
            let down_slot = fade.down_slot;
            let finished = fade.down.finished() && fade.up.finished();

            self.slots[down_slot].set_volume(down_gain);
            let active = self.active;
            self.slots[active].set_volume(up_gain);

            if finished {
                // The down ramp ends at pipeline stop
                self.slots[down_slot].stop();
                self.fade = None;
                outcome.crossfade_completed = true;
            }
            return outcome;
        }

        // Proactive trigger: fade into the prepared next track once the
        // remaining time no longer covers the ramp window
        if self.settings.crossfade_enabled
            && self.pending_next.is_some()
            && self.slots[self.active].is_playing()
        {
            let duration = self.slots[self.active].duration();
            if !duration.is_zero() {
                let remaining = duration.saturating_sub(self.slots[self.active].position());
                if remaining <= self.settings.window() {
                    let uri = self.pending_next.take().unwrap_or_default();
                    self.load(&uri);
                    outcome.next_started = Some(uri);
                }
            }
        }

        outcome
    }

    /// Pause the active slot
    pub fn pause(&mut self) {
        self.slots[self.active].pause();
    }

    /// Resume the active slot
    pub fn resume(&mut self) {
        self.slots[self.active].resume();
    }

    /// Seek within the active slot
    pub fn seek(&mut self, position: Duration) {
        self.slots[self.active].seek(position);
    }

    /// Position of the active slot
    pub fn position(&self) -> Duration {
        self.slots[self.active].position()
    }

    /// Duration of the active slot's source
    pub fn duration(&self) -> Duration {
        self.slots[self.active].duration()
    }

    /// Whether the active slot is playing
    pub fn is_playing(&self) -> bool {
        self.slots[self.active].is_playing()
    }

    /// Stop both slots and cancel any transition state
    pub fn stop_all(&mut self) {
        for slot in &mut self.slots {
            slot.clear_preload();
            slot.stop();
            slot.set_volume(1.0);
        }
        self.fade = None;
        self.pending_next = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Call-recording pipeline for engine tests
    #[derive(Debug, Default)]
    struct SlotState {
        uri: Option<String>,
        preloaded: Option<String>,
        playing: bool,
        volume: f32,
        position: Duration,
        duration: Duration,
    }

    #[derive(Clone, Default)]
    struct FakePipeline {
        state: Arc<Mutex<SlotState>>,
    }

    impl FakePipeline {
        fn new() -> (Self, Arc<Mutex<SlotState>>) {
            let state = Arc::new(Mutex::new(SlotState {
                volume: 1.0,
                ..SlotState::default()
            }));
            (
                Self {
                    state: Arc::clone(&state),
                },
                state,
            )
        }
    }

    impl Pipeline for FakePipeline {
        fn set_source(&mut self, uri: &str) {
            let mut s = self.state.lock().unwrap();
            s.uri = Some(uri.to_string());
            s.position = Duration::ZERO;
        }

        fn preload_next(&mut self, uri: &str) {
            self.state.lock().unwrap().preloaded = Some(uri.to_string());
        }

        fn clear_preload(&mut self) {
            self.state.lock().unwrap().preloaded = None;
        }

        fn play(&mut self) {
            self.state.lock().unwrap().playing = true;
        }

        fn pause(&mut self) {
            self.state.lock().unwrap().playing = false;
        }

        fn resume(&mut self) {
            self.state.lock().unwrap().playing = true;
        }

        fn stop(&mut self) {
            let mut s = self.state.lock().unwrap();
            s.playing = false;
            s.uri = None;
        }

        fn seek(&mut self, position: Duration) {
            self.state.lock().unwrap().position = position;
        }

        fn set_volume(&mut self, gain: f32) {
            self.state.lock().unwrap().volume = gain;
        }

        fn volume(&self) -> f32 {
            self.state.lock().unwrap().volume
        }

        fn position(&self) -> Duration {
            self.state.lock().unwrap().position
        }

        fn duration(&self) -> Duration {
            self.state.lock().unwrap().duration
        }

        fn is_playing(&self) -> bool {
            self.state.lock().unwrap().playing
        }

        fn current_uri(&self) -> Option<&str> {
            None
        }
    }

    fn crossfade_settings(duration_ms: u32) -> TransitionSettings {
        TransitionSettings {
            crossfade_enabled: true,
            duration_ms,
            padding_ms: 0,
            curve: FadeCurve::Linear,
        }
    }

    fn engine_with_states(
        settings: TransitionSettings,
    ) -> (TransitionEngine, Arc<Mutex<SlotState>>, Arc<Mutex<SlotState>>) {
        let (a, sa) = FakePipeline::new();
        let (b, sb) = FakePipeline::new();
        (TransitionEngine::new(Box::new(a), Box::new(b), settings), sa, sb)
    }

    #[test]
    fn plain_load_uses_active_slot() {
        let (mut engine, sa, sb) = engine_with_states(TransitionSettings::default());

        let handoff = engine.load("file:///t1.flac");

        assert_eq!(handoff, Handoff::Direct);
        assert_eq!(sa.lock().unwrap().uri.as_deref(), Some("file:///t1.flac"));
        assert!(sa.lock().unwrap().playing);
        assert!(sb.lock().unwrap().uri.is_none());
    }

    #[test]
    fn load_while_stopped_never_crossfades() {
        let (mut engine, _sa, _sb) = engine_with_states(crossfade_settings(1000));
        let handoff = engine.load("file:///t1.flac");
        assert_eq!(handoff, Handoff::Direct);
        assert!(!engine.is_crossfading());
    }

    #[test]
    fn crossfade_swaps_slots_and_ramps() {
        let (mut engine, sa, sb) = engine_with_states(crossfade_settings(1000));

        engine.load("file:///t1.flac");
        let handoff = engine.load("file:///t2.flac");

        assert_eq!(handoff, Handoff::Crossfade);
        assert!(engine.is_crossfading());
        // incoming slot starts silent with the new source
        assert_eq!(sb.lock().unwrap().uri.as_deref(), Some("file:///t2.flac"));
        assert_eq!(sb.lock().unwrap().volume, 0.0);
        assert!(sb.lock().unwrap().playing);
        // outgoing keeps playing while its ramp runs
        assert!(sa.lock().unwrap().playing);

        // halfway: complementary gains
        engine.tick(Duration::from_millis(500));
        assert!((sa.lock().unwrap().volume - 0.5).abs() < 0.01);
        assert!((sb.lock().unwrap().volume - 0.5).abs() < 0.01);

        // ramp end: outgoing stopped, incoming at full volume
        let outcome = engine.tick(Duration::from_millis(500));
        assert!(outcome.crossfade_completed);
        assert!(!engine.is_crossfading());
        assert!(!sa.lock().unwrap().playing);
        assert_eq!(sb.lock().unwrap().volume, 1.0);
        assert!(sb.lock().unwrap().playing);
    }

    #[test]
    fn second_load_during_crossfade_hard_switches() {
        let (mut engine, sa, sb) = engine_with_states(crossfade_settings(1000));

        engine.load("file:///t1.flac");
        engine.load("file:///t2.flac");
        engine.tick(Duration::from_millis(100));

        let handoff = engine.load("file:///t3.flac");

        assert_eq!(handoff, Handoff::HardSwitch);
        assert!(!engine.is_crossfading());
        // exactly one slot playing, with the second request's track
        assert!(!sa.lock().unwrap().playing);
        assert!(sb.lock().unwrap().playing);
        assert_eq!(sb.lock().unwrap().uri.as_deref(), Some("file:///t3.flac"));
        assert_eq!(sb.lock().unwrap().volume, 1.0);

        // no orphaned ramps keep mutating volumes afterwards
        engine.tick(Duration::from_millis(500));
        assert_eq!(sb.lock().unwrap().volume, 1.0);
    }

    #[test]
    fn remaining_time_triggers_prepared_next() {
        let (mut engine, sa, _sb) = engine_with_states(crossfade_settings(1000));

        engine.load("file:///t1.flac");
        engine.prepare_next(Some("file:///t2.flac"));
        {
            let mut s = sa.lock().unwrap();
            s.duration = Duration::from_secs(10);
            s.position = Duration::from_secs(2);
        }

        // plenty of time left: nothing happens
        let outcome = engine.tick(Duration::from_millis(50));
        assert_eq!(outcome.next_started, None);

        // inside the window: crossfade fires into the prepared track
        sa.lock().unwrap().position = Duration::from_millis(9_500);
        let outcome = engine.tick(Duration::from_millis(50));
        assert_eq!(outcome.next_started.as_deref(), Some("file:///t2.flac"));
        assert!(engine.is_crossfading());
    }

    #[test]
    fn gapless_preloads_on_about_to_finish() {
        let (mut engine, sa, _sb) = engine_with_states(TransitionSettings::default());

        engine.load("file:///t1.flac");
        engine.prepare_next(Some("file:///t2.flac"));
        engine.handle_about_to_finish();

        assert_eq!(sa.lock().unwrap().preloaded.as_deref(), Some("file:///t2.flac"));
    }

    #[test]
    fn about_to_finish_is_inert_when_crossfading() {
        let (mut engine, sa, _sb) = engine_with_states(crossfade_settings(1000));

        engine.load("file:///t1.flac");
        engine.prepare_next(Some("file:///t2.flac"));
        engine.handle_about_to_finish();

        assert!(sa.lock().unwrap().preloaded.is_none());
    }

    #[test]
    fn stop_all_cancels_everything() {
        let (mut engine, sa, sb) = engine_with_states(crossfade_settings(1000));

        engine.load("file:///t1.flac");
        engine.load("file:///t2.flac");
        engine.stop_all();

        assert!(!engine.is_crossfading());
        assert!(!sa.lock().unwrap().playing);
        assert!(!sb.lock().unwrap().playing);
        assert_eq!(sa.lock().unwrap().volume, 1.0);
        assert_eq!(sb.lock().unwrap().volume, 1.0);
    }

    #[test]
    fn equal_power_gains_sum_to_unit_power() {
        let curve = FadeCurve::EqualPower;
        let inc = curve.gain(0.5, false);
        let out = curve.gain(0.5, true);
        assert!((inc * inc + out * out - 1.0).abs() < 0.01);
    }

    #[test]
    fn linear_curve_boundaries() {
        let curve = FadeCurve::Linear;
        assert_eq!(curve.gain(0.0, false), 0.0);
        assert_eq!(curve.gain(1.0, false), 1.0);
        assert_eq!(curve.gain(0.0, true), 1.0);
        assert_eq!(curve.gain(1.0, true), 0.0);
    }
}
