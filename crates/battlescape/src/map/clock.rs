use std::time::Duration;

/// Periodic map triggers, in the order they are polled each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    Scroll,
    TileAnimation,
    Walk,
    Projectile,
}

impl TriggerKind {
    pub const ALL: [TriggerKind; 4] = [
        TriggerKind::Scroll,
        TriggerKind::TileAnimation,
        TriggerKind::Walk,
        TriggerKind::Projectile,
    ];

    const fn slot(self) -> usize {
        match self {
            TriggerKind::Scroll => 0,
            TriggerKind::TileAnimation => 1,
            TriggerKind::Walk => 2,
            TriggerKind::Projectile => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TriggerKind::Scroll => "scroll",
            TriggerKind::TileAnimation => "tile_animation",
            TriggerKind::Walk => "walk",
            TriggerKind::Projectile => "projectile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapTimings {
    pub scroll: Duration,
    pub tile_animation: Duration,
    pub walk: Duration,
    pub projectile: Duration,
}

impl Default for MapTimings {
    fn default() -> Self {
        Self {
            scroll: Duration::from_millis(50),
            tile_animation: Duration::from_millis(100),
            walk: Duration::from_millis(50),
            projectile: Duration::from_millis(20),
        }
    }
}

impl MapTimings {
    pub fn interval(&self, kind: TriggerKind) -> Duration {
        match kind {
            TriggerKind::Scroll => self.scroll,
            TriggerKind::TileAnimation => self.tile_animation,
            TriggerKind::Walk => self.walk,
            TriggerKind::Projectile => self.projectile,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    kind: TriggerKind,
    interval: Duration,
    elapsed: Duration,
    running: bool,
}

impl Trigger {
    pub fn new(kind: TriggerKind, interval: Duration) -> Self {
        Self {
            kind,
            interval,
            elapsed: Duration::ZERO,
            running: false,
        }
    }

    pub fn kind(&self) -> TriggerKind {
        self.kind
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
        self.elapsed = Duration::ZERO;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Accumulates `dt` and fires at most once; leftover time is dropped.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if !self.running {
            return false;
        }
        self.elapsed = self.elapsed.saturating_add(dt);
        if self.elapsed >= self.interval {
            self.elapsed = Duration::ZERO;
            return true;
        }
        false
    }
}

/// The fixed list of map triggers. The scroll trigger starts stopped; the
/// others run from creation.
#[derive(Debug, Clone)]
pub struct AnimationClock {
    triggers: [Trigger; 4],
}

impl AnimationClock {
    pub fn new(timings: MapTimings) -> Self {
        let triggers = TriggerKind::ALL.map(|kind| {
            let mut trigger = Trigger::new(kind, timings.interval(kind));
            if kind != TriggerKind::Scroll {
                trigger.start();
            }
            trigger
        });
        Self { triggers }
    }

    pub fn is_running(&self, kind: TriggerKind) -> bool {
        self.triggers[kind.slot()].is_running()
    }

    /// Starts or stops a trigger. Starting an already running trigger keeps
    /// its accumulated time.
    pub fn set_running(&mut self, kind: TriggerKind, running: bool) {
        let trigger = &mut self.triggers[kind.slot()];
        match (trigger.is_running(), running) {
            (false, true) => trigger.start(),
            (true, false) => trigger.stop(),
            _ => {}
        }
    }

    /// Advances every trigger by `dt`, returning the ones that fired in poll
    /// order.
    pub fn advance(&mut self, dt: Duration) -> Vec<TriggerKind> {
        self.triggers
            .iter_mut()
            .filter_map(|trigger| trigger.advance(dt).then_some(trigger.kind()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn trigger_fires_once_per_advance_without_catch_up() {
        let mut trigger = Trigger::new(TriggerKind::Walk, ms(50));
        trigger.start();
        assert!(!trigger.advance(ms(30)));
        assert!(trigger.advance(ms(30)));
        // 500ms elapsed still fires only once, and the excess is dropped.
        assert!(trigger.advance(ms(500)));
        assert!(!trigger.advance(ms(49)));
        assert!(trigger.advance(ms(1)));
    }

    #[test]
    fn stopped_trigger_never_fires() {
        let mut trigger = Trigger::new(TriggerKind::Scroll, ms(50));
        assert!(!trigger.advance(ms(100)));
        trigger.start();
        trigger.advance(ms(40));
        trigger.stop();
        assert!(!trigger.advance(ms(100)));
    }

    #[test]
    fn restart_resets_elapsed_time() {
        let mut trigger = Trigger::new(TriggerKind::Scroll, ms(50));
        trigger.start();
        trigger.advance(ms(40));
        trigger.stop();
        trigger.start();
        assert!(!trigger.advance(ms(40)));
    }

    #[test]
    fn clock_fires_in_fixed_order() {
        let mut clock = AnimationClock::new(MapTimings::default());
        clock.set_running(TriggerKind::Scroll, true);
        let fired = clock.advance(ms(100));
        assert_eq!(fired, TriggerKind::ALL.to_vec());
    }

    #[test]
    fn clock_respects_individual_intervals() {
        let mut clock = AnimationClock::new(MapTimings::default());
        assert!(!clock.is_running(TriggerKind::Scroll));
        assert_eq!(clock.advance(ms(20)), vec![TriggerKind::Projectile]);
        assert_eq!(clock.advance(ms(20)), vec![TriggerKind::Projectile]);
        // walk reaches 60ms, tile animation 60ms
        assert_eq!(
            clock.advance(ms(20)),
            vec![TriggerKind::Walk, TriggerKind::Projectile]
        );
        assert_eq!(
            clock.advance(ms(40)),
            vec![TriggerKind::TileAnimation, TriggerKind::Projectile]
        );
    }

    #[test]
    fn set_running_is_idempotent() {
        let mut clock = AnimationClock::new(MapTimings::default());
        clock.set_running(TriggerKind::Scroll, true);
        clock.advance(ms(30));
        clock.set_running(TriggerKind::Scroll, true);
        assert!(clock.advance(ms(20)).contains(&TriggerKind::Scroll));
        clock.set_running(TriggerKind::Scroll, false);
        assert!(!clock.is_running(TriggerKind::Scroll));
    }
}
