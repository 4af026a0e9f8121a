use bevy::prelude::*;

pub struct EffectsPlugin;

impl Plugin for EffectsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, invincibility_system);
    }
}

/// How an invincible entity shows it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlinkStyle {
    /// Sprite toggles visible/hidden every period.
    Toggle,
    /// Sprite alternates between `tint` and its own color every period.
    Tint { tint: Color, base: Color },
}

/// What the owner should look like after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkStep {
    /// Still invincible; `lit` is true on the "normal" half of the blink.
    Running { lit: bool },
    Finished,
}

/// A timed invincibility window with a blink effect.
///
/// This is a component, so the window lives and dies with its entity: a
/// despawned owner takes its window with it and nothing resumes later.
/// While it is present the owner ignores damage.
#[derive(Component, Debug, Clone)]
pub struct Invincibility {
    remaining: f32,
    period: f32,
    phase_elapsed: f32,
    lit: bool,
    pub style: BlinkStyle,
}

impl Invincibility {
    pub fn new(duration: f32, period: f32, style: BlinkStyle) -> Self {
        Self {
            remaining: duration,
            period: period.max(f32::EPSILON),
            phase_elapsed: 0.0,
            // The first half-period shows the hit (hidden / tinted).
            lit: false,
            style,
        }
    }

    pub fn tick(&mut self, dt: f32) -> BlinkStep {
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            return BlinkStep::Finished;
        }

        self.phase_elapsed += dt;
        while self.phase_elapsed >= self.period {
            self.phase_elapsed -= self.period;
            self.lit = !self.lit;
        }
        BlinkStep::Running { lit: self.lit }
    }
}

fn invincibility_system(
    mut commands: Commands,
    mut query: Query<(Entity, &mut Invincibility, &mut Sprite, &mut Visibility)>,
    time: Res<Time>,
) {
    let dt = time.delta_secs();

    for (entity, mut invincibility, mut sprite, mut visibility) in &mut query {
        let style = invincibility.style;
        match invincibility.tick(dt) {
            BlinkStep::Running { lit } => match style {
                BlinkStyle::Toggle => {
                    *visibility = if lit {
                        Visibility::Inherited
                    } else {
                        Visibility::Hidden
                    };
                }
                BlinkStyle::Tint { tint, base } => {
                    sprite.color = if lit { base } else { tint };
                }
            },
            BlinkStep::Finished => {
                *visibility = Visibility::Inherited;
                if let BlinkStyle::Tint { base, .. } = style {
                    sprite.color = base;
                }
                commands.entity(entity).remove::<Invincibility>();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blink_alternates_each_period() {
        let mut window = Invincibility::new(1.5, 0.1, BlinkStyle::Toggle);
        assert_eq!(window.tick(0.05), BlinkStep::Running { lit: false });
        assert_eq!(window.tick(0.05), BlinkStep::Running { lit: true });
        assert_eq!(window.tick(0.1), BlinkStep::Running { lit: false });
    }

    #[test]
    fn window_finishes_after_its_duration() {
        let mut window = Invincibility::new(0.45, 0.1, BlinkStyle::Toggle);
        for _ in 0..4 {
            assert!(matches!(window.tick(0.1), BlinkStep::Running { .. }));
        }
        assert_eq!(window.tick(0.1), BlinkStep::Finished);
    }

    #[test]
    fn a_long_frame_does_not_stall_the_blink() {
        let mut window = Invincibility::new(5.0, 0.1, BlinkStyle::Toggle);
        // Three and a half periods: an odd number of flips from the initial state.
        assert_eq!(window.tick(0.35), BlinkStep::Running { lit: true });
    }
}
