use bevy::prelude::*;

pub struct DifficultyPlugin;

impl Plugin for DifficultyPlugin {
    fn build(&self, app: &mut App) {
        // Static data defined in code, so there is no startup system:
        // Bevy calls DifficultyTable::default() for us.
        app.init_resource::<DifficultyTable>();
    }
}

/// The named presets a stage can be played at.
///
/// The discriminant doubles as the index into every column of
/// `DifficultyTable`, so the order here must match the order of the columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Difficulty {
    VeryEasy,
    Easy,
    #[default]
    Normal,
}

impl Difficulty {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Difficulty> {
        match index {
            0 => Some(Difficulty::VeryEasy),
            1 => Some(Difficulty::Easy),
            2 => Some(Difficulty::Normal),
            _ => None,
        }
    }
}

/// Everything a run needs to know about one difficulty tier, resolved
/// from the parallel columns of `DifficultyTable`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyParams {
    pub min_enemy_interval: f32,
    pub max_enemy_interval: f32,
    pub min_item_interval: f32,
    pub max_item_interval: f32,
    /// World units per second that scrolling entities move left.
    pub scroll_speed: f32,
    /// Seconds of running before the terminal marker is spawned.
    pub terminal_time: f32,
    pub jump: JumpTuning,
}

/// Jump impulse and gravity for the runner. Harder tiers fall faster and
/// jump harder so the arc stays short at high scroll speeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpTuning {
    pub jump_speed: f32,
    pub gravity_scale: f32,
}

/// Per-difficulty parameter columns. Column `i` of every array belongs to
/// `Difficulty::from_index(i)`.
///
/// Lookups never fail: an index past the last configured tier resolves to
/// the last tier, with a warning so a table that fell behind the enum shows
/// up in the log.
#[derive(Resource, Debug, Clone)]
pub struct DifficultyTable {
    pub min_enemy_intervals: Vec<f32>,
    pub max_enemy_intervals: Vec<f32>,
    pub min_item_intervals: Vec<f32>,
    pub max_item_intervals: Vec<f32>,
    pub scroll_speeds: Vec<f32>,
    pub terminal_times: Vec<f32>,
    pub jump_tunings: Vec<JumpTuning>,
    /// Boss tower hit points per tier.
    pub boss_health: Vec<u32>,
}

impl Default for DifficultyTable {
    fn default() -> Self {
        let soft_jump = JumpTuning {
            jump_speed: 10.0,
            gravity_scale: 1.0,
        };
        Self {
            min_enemy_intervals: vec![4.0, 3.0, 2.0],
            max_enemy_intervals: vec![6.0, 5.0, 3.5],
            min_item_intervals: vec![5.0, 4.0, 3.0],
            max_item_intervals: vec![8.0, 7.0, 6.0],
            scroll_speeds: vec![5.0, 7.0, 9.0],
            terminal_times: vec![80.0, 120.0, 150.0],
            jump_tunings: vec![
                soft_jump,
                soft_jump,
                JumpTuning {
                    jump_speed: 13.0,
                    gravity_scale: 2.1,
                },
            ],
            boss_health: vec![5, 7, 8],
        }
    }
}

impl DifficultyTable {
    /// Number of tiers every column can serve.
    pub fn tiers(&self) -> usize {
        [
            self.min_enemy_intervals.len(),
            self.max_enemy_intervals.len(),
            self.min_item_intervals.len(),
            self.max_item_intervals.len(),
            self.scroll_speeds.len(),
            self.terminal_times.len(),
            self.jump_tunings.len(),
        ]
        .into_iter()
        .min()
        .unwrap_or(0)
    }

    /// Resolves the parameters for `index`, clamping to the last tier.
    /// A table with an empty column resolves against the built-in table.
    pub fn lookup(&self, index: usize) -> DifficultyParams {
        let tiers = self.tiers();
        if tiers == 0 {
            warn!("Difficulty table has an empty column; using built-in tier values");
            return DifficultyTable::default().lookup(index);
        }

        let tier = clamp_tier(index, tiers);
        if tier != index {
            warn!(
                "Difficulty index {} is past the {} configured tiers; using tier {}",
                index, tiers, tier
            );
        }

        DifficultyParams {
            min_enemy_interval: self.min_enemy_intervals[tier],
            max_enemy_interval: self.max_enemy_intervals[tier],
            min_item_interval: self.min_item_intervals[tier],
            max_item_interval: self.max_item_intervals[tier],
            scroll_speed: self.scroll_speeds[tier],
            terminal_time: self.terminal_times[tier],
            jump: self.jump_tunings[tier],
        }
    }

    /// Boss hit points for `index`, with the same clamp as `lookup`.
    /// An empty column falls back to a single hit point.
    pub fn boss_health(&self, index: usize) -> u32 {
        if self.boss_health.is_empty() {
            warn!("Boss health table is empty; using 1 hit point");
            return 1;
        }
        let tier = clamp_tier(index, self.boss_health.len());
        if tier != index {
            warn!(
                "Boss difficulty index {} is past the {} configured tiers; using tier {}",
                index,
                self.boss_health.len(),
                tier
            );
        }
        self.boss_health[tier]
    }
}

fn clamp_tier(index: usize, tiers: usize) -> usize {
    index.min(tiers.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_tier_matches_shipped_values() {
        let table = DifficultyTable::default();
        let params = table.lookup(Difficulty::Normal.index());
        assert_eq!(params.min_enemy_interval, 2.0);
        assert_eq!(params.max_enemy_interval, 3.5);
        assert_eq!(params.scroll_speed, 9.0);
        assert_eq!(params.terminal_time, 150.0);
        assert_eq!(params.jump.jump_speed, 13.0);
    }

    #[test]
    fn out_of_range_index_uses_last_tier() {
        let table = DifficultyTable::default();
        let last = table.lookup(table.tiers() - 1);
        for index in [3, 4, 17, usize::MAX] {
            assert_eq!(table.lookup(index), last);
        }
    }

    #[test]
    fn shortest_column_bounds_the_tiers() {
        // A column that fell behind the others must not be indexed past its end.
        let mut table = DifficultyTable::default();
        table.terminal_times.truncate(2);
        assert_eq!(table.tiers(), 2);
        let params = table.lookup(Difficulty::Normal.index());
        assert_eq!(params.terminal_time, 120.0);
        assert_eq!(params.scroll_speed, 7.0);
    }

    #[test]
    fn empty_column_falls_back_to_built_in_values() {
        let mut table = DifficultyTable::default();
        table.scroll_speeds.clear();
        assert_eq!(table.tiers(), 0);

        let built_in = DifficultyTable::default();
        assert_eq!(table.lookup(1), built_in.lookup(1));
        assert_eq!(table.lookup(usize::MAX), built_in.lookup(2));
    }

    #[test]
    fn boss_health_clamps_like_the_table() {
        let table = DifficultyTable::default();
        assert_eq!(table.boss_health(0), 5);
        assert_eq!(table.boss_health(2), 8);
        assert_eq!(table.boss_health(9), 8);
    }

    #[test]
    fn difficulty_index_round_trips_through_the_enum() {
        for difficulty in [Difficulty::VeryEasy, Difficulty::Easy, Difficulty::Normal] {
            assert_eq!(Difficulty::from_index(difficulty.index()), Some(difficulty));
        }
        assert_eq!(Difficulty::from_index(3), None);
    }
}
