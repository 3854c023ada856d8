// Authoritative per-session simulation: input intent, the fixed tick, death/win transitions and
// the administrative mutations that share the same state.

use crate::domain::entities::{EnemyId, EnemyKind, ItemId, ItemKind};
use crate::domain::errors::AdminError;
use crate::domain::factory::{EntityFactory, StandardFactory};
use crate::domain::geometry::{Rect, overlaps};
use crate::domain::layout::{LevelLayout, SpawnSlot, Track, TrackId};
use crate::domain::movement::HazardPatrol;
use crate::domain::state::{
    CommunicationMode, EntityListing, InputCommand, PlayerState, SessionState, Snapshot,
};
use crate::domain::tuning::Tuning;
use std::time::Duration;
use tracing::{debug, info};

pub struct SimulationEngine {
    state: SessionState,
    tuning: Tuning,
    factory: Box<dyn EntityFactory>,
}

impl SimulationEngine {
    pub fn new(layout: LevelLayout, tuning: Tuning) -> Self {
        let factory = StandardFactory::new(tuning.enemy, tuning.item);
        Self::with_factory(layout, tuning, Box::new(factory))
    }

    pub fn with_factory(
        layout: LevelLayout,
        tuning: Tuning,
        factory: Box<dyn EntityFactory>,
    ) -> Self {
        let mut engine = Self {
            state: SessionState::new(layout, tuning.player.start_lives),
            tuning,
            factory,
        };
        engine.init_level();
        engine
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from(&self.state)
    }

    /// Records the player's intent; the next tick applies it.
    pub fn handle_input(&mut self, command: InputCommand) {
        let tuning = &self.tuning.player;
        let player = &mut self.state.player;

        match command {
            InputCommand::Left => player.intent_x = -tuning.speed_x,
            InputCommand::Right => player.intent_x = tuning.speed_x,
            InputCommand::Up if player.on_track => player.climb_intent = -tuning.climb_speed,
            InputCommand::Down if player.on_track => player.climb_intent = tuning.climb_speed,
            InputCommand::Up | InputCommand::Down => {}
            InputCommand::Jump => {
                if !player.on_track && !player.jumping {
                    player.jumping = true;
                    player.velocity.y = -tuning.jump_velocity;
                }
            }
            InputCommand::Stop => {
                player.intent_x = 0.0;
                if player.on_track {
                    player.climb_intent = 0.0;
                }
            }
        }
    }

    /// Advances the session by one fixed step. `dt` only drives the session clock; movement is
    /// expressed per tick.
    pub fn tick(&mut self, dt: Duration) -> Snapshot {
        self.state.clock += dt;
        self.state.tick += 1;
        self.state.player.just_gained_life = false;

        // Gameplay is paused between reaching the cage and the next level.
        if self.state.won {
            if self
                .state
                .reinit_at
                .is_some_and(|at| self.state.clock >= at)
            {
                self.start_next_level();
            }
            return self.snapshot();
        }

        self.step_horizontal();
        let track = self.update_track_membership();
        self.step_vertical(track);

        if self.fell_into_abyss() {
            info!(
                x = self.state.player.position.x,
                y = self.state.player.position.y,
                "player fell into the abyss"
            );
            self.player_death();
            return self.snapshot();
        }

        self.advance_enemies();
        self.expire_invincibility();
        self.resolve_collisions();

        self.snapshot()
    }

    fn player_bounds(&self) -> Rect {
        player_bounds(&self.state.player, &self.tuning)
    }

    fn step_horizontal(&mut self) {
        let tuning = &self.tuning.player;
        let SessionState { player, layout, .. } = &mut self.state;

        let vx = if player.on_track {
            player.intent_x * tuning.track_damping
        } else {
            player.intent_x
        };
        player.velocity.x = vx;
        player.position.x = (player.position.x + vx).clamp(0.0, layout.width - tuning.width);
    }

    /// Returns the vine the player grips this tick, if any.
    fn update_track_membership(&mut self) -> Option<Track> {
        let tuning = &self.tuning.player;
        let bounds = player_bounds(&self.state.player, &self.tuning);
        let center_x = bounds.center().x;

        let current = self
            .state
            .layout
            .tracks
            .iter()
            .find(|track| {
                (track.center_x() - center_x).abs() < tuning.track_grab_tolerance
                    && bounds.bottom() > track.top()
                    && bounds.top() < track.bottom()
            })
            .copied();

        let player = &mut self.state.player;
        let was_on_track = player.on_track;
        player.on_track = current.is_some();

        if player.on_track {
            player.jumping = false;
        } else if was_on_track {
            // Letting go drops any pending climb.
            player.climb_intent = 0.0;
        }
        current
    }

    fn step_vertical(&mut self, track: Option<Track>) {
        let tuning = self.tuning.player;
        let bounds = player_bounds(&self.state.player, &self.tuning);
        let SessionState { player, layout, .. } = &mut self.state;
        let max_y = layout.height - tuning.height;

        if let Some(track) = track {
            // Feet stay between the vine's ends.
            let min_y = (track.top() - tuning.height).max(0.0);
            let lowest_y = (track.bottom() - tuning.height).min(max_y).max(min_y);
            player.velocity.y = player.climb_intent;
            player.position.y = (player.position.y + player.climb_intent).clamp(min_y, lowest_y);
            player.jumping = false;
            return;
        }

        let vy = (player.velocity.y + tuning.gravity).min(tuning.max_fall_speed);

        if vy > 0.0 {
            // Feet about to touch a platform top.
            let next_bottom = bounds.bottom() + vy;
            let contact = layout
                .platforms
                .iter()
                .filter(|platform| platform.overlaps_x(&bounds))
                .find(|platform| {
                    // Feet sunk into a thick platform still count as standing on it.
                    let reach = (platform.top() + tuning.landing_tolerance).max(platform.bottom());
                    next_bottom >= platform.top() && next_bottom <= reach
                })
                .map(Rect::top);
            if let Some(top) = contact {
                land(player, top, tuning.height);
                return;
            }
        }

        let old_bottom = bounds.bottom();
        player.velocity.y = vy;
        player.position.y += vy;

        if vy > 0.0 {
            // Sweep the fall so a fast drop cannot tunnel through a platform.
            let new_bottom = old_bottom + vy;
            let crossed = layout
                .platforms
                .iter()
                .filter(|platform| platform.overlaps_x(&bounds))
                .map(Rect::top)
                .filter(|top| old_bottom <= *top + tuning.landing_tolerance && new_bottom >= *top)
                .min_by(f32::total_cmp);
            if let Some(top) = crossed {
                land(player, top, tuning.height);
                return;
            }
        }

        player.position.y = player.position.y.clamp(0.0, max_y);
        if player.position.y <= 0.0 && player.velocity.y < 0.0 {
            player.velocity.y = 0.0;
        }
    }

    fn fell_into_abyss(&self) -> bool {
        let tuning = &self.tuning.player;
        let player = &self.state.player;
        if player.on_track || player.velocity.y <= 0.0 || player.position.y <= tuning.abyss_y {
            return false;
        }

        let bounds = self.player_bounds();
        !self.state.layout.platforms.iter().any(|platform| {
            platform.overlaps_x(&bounds)
                && platform.bottom() >= bounds.bottom()
                && platform.top() <= bounds.bottom() + tuning.abyss_window
        })
    }

    fn advance_enemies(&mut self) {
        // Enemies that left the stage on an earlier tick were already reported once as inactive.
        self.state.enemies.retain(|enemy| enemy.active);

        for enemy in &mut self.state.enemies {
            enemy.advance();
            if !enemy.active {
                debug!(enemy_id = enemy.id, "enemy left the stage");
            }
        }

        self.state.hazard.advance(self.state.speed_multiplier);
    }

    fn expire_invincibility(&mut self) {
        let clock = self.state.clock;
        let player = &mut self.state.player;
        if player.invincible_until.is_some_and(|until| clock >= until) {
            player.invincible_until = None;
            debug!("invincibility expired");
        }
    }

    fn resolve_collisions(&mut self) {
        let bounds = self.player_bounds();

        // Pickups are never suppressed.
        let SessionState { player, items, .. } = &mut self.state;
        for item in items.iter_mut().filter(|item| item.active) {
            if overlaps(&bounds, &item.bounds()) {
                item.active = false;
                player.score += item.points;
                info!(
                    item_id = item.id,
                    kind = item.kind.label(),
                    points = item.points,
                    score = player.score,
                    "item collected"
                );
            }
        }

        if self.state.is_invincible() {
            return;
        }

        // First hit wins; at most one death per tick.
        let enemy_hit = self
            .state
            .enemies
            .iter()
            .filter(|enemy| enemy.active)
            .find(|enemy| overlaps(&bounds, &enemy.bounds()))
            .map(|enemy| enemy.id);
        if let Some(enemy_id) = enemy_hit {
            info!(enemy_id, "player caught by enemy");
            self.player_death();
            return;
        }

        if overlaps(&bounds, &hazard_bounds(&self.state.hazard)) {
            info!("player caught by hazard");
            self.player_death();
            return;
        }

        if !self.state.won && self.state.layout.cage.contains_point(bounds.center()) {
            self.level_win();
        }
    }

    fn player_death(&mut self) {
        let start = self.state.layout.player_start;
        let player = &mut self.state.player;
        player.lives = player.lives.saturating_sub(1);

        if player.lives == 0 {
            info!(
                score = player.score,
                level = self.state.level,
                "game over; restarting from level 1"
            );
            player.lives = self.tuning.player.start_lives;
            player.score = 0;
            player.invincible_until = None;
            self.state.level = 1;
            self.state.speed_multiplier = 1.0;
            self.state.won = false;
            self.state.reinit_at = None;
            self.init_level();
            return;
        }

        // Enemies and items stay where they are; only the player restarts.
        player.invincible_until = Some(self.state.clock + self.tuning.player.invincibility);
        player.reposition(start);
        info!(lives = player.lives, "player lost a life");
    }

    fn level_win(&mut self) {
        let tuning = self.tuning.level;
        let max_lives = self.tuning.player.max_lives;
        let player = &mut self.state.player;

        self.state.won = true;
        player.score += tuning.victory_bonus;
        if player.lives < max_lives {
            player.lives += 1;
            player.just_gained_life = true;
        } else {
            player.score += tuning.max_lives_bonus;
        }

        self.state.level += 1;
        self.state.speed_multiplier += tuning.speed_increment;
        self.state.reinit_at = Some(self.state.clock + tuning.settle_delay);

        info!(
            level = self.state.level,
            score = player.score,
            lives = player.lives,
            speed_multiplier = self.state.speed_multiplier,
            "level cleared"
        );
    }

    fn start_next_level(&mut self) {
        self.state.won = false;
        self.state.reinit_at = None;
        self.state.player.invincible_until = None;
        self.init_level();
        info!(level = self.state.level, "level started");
    }

    /// Recreates every enemy and item from the layout and puts the player at the start.
    /// Score, lives and level counters are left to the caller.
    fn init_level(&mut self) {
        self.state.enemies.clear();
        self.state.items.clear();

        let spawns = self.state.layout.spawns.clone();
        for (kind, slot) in spawns.enemies {
            self.push_enemy(kind, slot);
        }
        for (kind, slot) in spawns.items {
            self.push_item(kind, slot, None);
        }

        self.state.hazard = HazardPatrol::new(self.state.layout.hazard);
        let start = self.state.layout.player_start;
        self.state.player.reposition(start);

        debug!(
            enemies = self.state.enemies.len(),
            items = self.state.items.len(),
            speed_multiplier = self.state.speed_multiplier,
            "level initialized"
        );
    }

    fn push_enemy(&mut self, kind: EnemyKind, slot: SpawnSlot) -> EnemyId {
        let id = self.state.allocate_enemy_id();
        let mut enemy = self
            .factory
            .create_enemy(id, kind, slot, &self.state.layout);
        enemy.apply_speed_multiplier(self.state.speed_multiplier);
        self.state.enemies.push(enemy);
        id
    }

    fn push_item(&mut self, kind: ItemKind, slot: SpawnSlot, points: Option<u32>) -> ItemId {
        let id = self.state.allocate_item_id();
        let item = self.factory.create_item(id, kind, slot, points);
        self.state.items.push(item);
        id
    }

    fn validate_slot(&self, track: TrackId, height: f32) -> Result<Track, AdminError> {
        let found = self
            .state
            .layout
            .track(track)
            .ok_or(AdminError::InvalidTrack { track })?;
        if !height.is_finite() || !found.contains_height(height) {
            return Err(AdminError::HeightOutOfRange { track, height });
        }
        Ok(*found)
    }

    pub fn spawn_enemy(
        &mut self,
        kind: EnemyKind,
        track: TrackId,
        height: f32,
    ) -> Result<EnemyId, AdminError> {
        let track = self.validate_slot(track, height)?;
        let slot = SpawnSlot::on_track(track.id, track.center_x(), height);
        let id = self.push_enemy(kind, slot);
        info!(
            enemy_id = id,
            kind = kind.label(),
            track = track.id,
            height,
            "enemy spawned"
        );
        Ok(id)
    }

    pub fn despawn_enemy(&mut self, id: EnemyId) -> Result<(), AdminError> {
        let index = self
            .state
            .enemies
            .iter()
            .position(|enemy| enemy.id == id)
            .ok_or(AdminError::EnemyNotFound { id })?;
        self.state.enemies.remove(index);
        info!(enemy_id = id, "enemy despawned");
        Ok(())
    }

    pub fn spawn_item(
        &mut self,
        kind: ItemKind,
        track: TrackId,
        height: f32,
        points: Option<u32>,
    ) -> Result<ItemId, AdminError> {
        let track = self.validate_slot(track, height)?;
        if let Some(points) = points {
            let tuning = &self.tuning.item;
            if points < tuning.min_points || points > tuning.max_points {
                return Err(AdminError::InvalidPoints { points });
            }
        }

        let slot = SpawnSlot::on_track(track.id, track.center_x(), height);
        let id = self.push_item(kind, slot, points);
        info!(
            item_id = id,
            kind = kind.label(),
            track = track.id,
            height,
            "item spawned"
        );
        Ok(id)
    }

    /// Removes the first active item hanging on `track` within tolerance of `height`.
    pub fn despawn_item_at(&mut self, track: TrackId, height: f32) -> Result<ItemId, AdminError> {
        let found = self.validate_slot(track, height)?;
        let tolerance = self.tuning.item.despawn_tolerance;

        let index = self
            .state
            .items
            .iter()
            .position(|item| {
                let on_track = item.track == Some(found.id)
                    || (item.position.x - found.center_x()).abs() <= tolerance;
                item.active && on_track && (item.position.y - height).abs() <= tolerance
            })
            .ok_or(AdminError::NoItemAt { track, height })?;

        let item = self.state.items.remove(index);
        info!(item_id = item.id, track, height, "item despawned");
        Ok(item.id)
    }

    /// Removes an active item by id. Collected items count as gone.
    pub fn despawn_item(&mut self, id: ItemId) -> Result<(), AdminError> {
        let index = self
            .state
            .items
            .iter()
            .position(|item| item.id == id && item.active)
            .ok_or(AdminError::ItemNotFound { id })?;
        self.state.items.remove(index);
        info!(item_id = id, "item despawned");
        Ok(())
    }

    pub fn listing(&self) -> EntityListing {
        EntityListing::from(&self.state)
    }

    pub fn set_mode(&mut self, mode: CommunicationMode) {
        if self.state.mode != mode {
            info!(?mode, "communication mode changed");
        }
        self.state.mode = mode;
    }
}

fn player_bounds(player: &PlayerState, tuning: &Tuning) -> Rect {
    Rect::at(player.position, tuning.player.width, tuning.player.height)
}

fn hazard_bounds(hazard: &HazardPatrol) -> Rect {
    Rect::at(hazard.position, hazard.route.width, hazard.route.height)
}

fn land(player: &mut PlayerState, platform_top: f32, height: f32) {
    player.position.y = platform_top - height;
    player.velocity.y = 0.0;
    player.jumping = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Enemy, Item};
    use crate::domain::geometry::Vec2;

    const DT: Duration = Duration::from_millis(16);

    fn engine() -> SimulationEngine {
        SimulationEngine::new(LevelLayout::jungle(), Tuning::default())
    }

    // Engine with no enemies or items and the hazard parked at the far end of its route.
    fn empty_engine() -> SimulationEngine {
        let mut engine = engine();
        engine.state.enemies.clear();
        engine.state.items.clear();
        engine.state.hazard.position.x = engine.state.hazard.route.max_x;
        engine.state.hazard.moving_right = false;
        engine
    }

    fn put_player(engine: &mut SimulationEngine, x: f32, y: f32) {
        engine.state.player.position = Vec2::new(x, y);
        engine.state.player.velocity = Vec2::ZERO;
    }

    fn enemy_at(engine: &mut SimulationEngine, kind: EnemyKind, x: f32, y: f32) -> EnemyId {
        engine.push_enemy(kind, SpawnSlot::free(x, y))
    }

    fn item_at(engine: &mut SimulationEngine, kind: ItemKind, x: f32, y: f32) -> ItemId {
        engine.push_item(kind, SpawnSlot::free(x, y), None)
    }

    fn enemy<'a>(engine: &'a SimulationEngine, id: EnemyId) -> &'a Enemy {
        engine
            .state
            .enemies
            .iter()
            .find(|enemy| enemy.id == id)
            .expect("enemy should exist")
    }

    fn item<'a>(engine: &'a SimulationEngine, id: ItemId) -> &'a Item {
        engine
            .state
            .items
            .iter()
            .find(|item| item.id == id)
            .expect("item should exist")
    }

    #[test]
    fn when_engine_starts_then_level_one_is_populated() {
        let engine = engine();
        let snapshot = engine.snapshot();

        assert_eq!(snapshot.level, 1);
        assert_eq!(snapshot.player.lives, 3);
        assert_eq!(snapshot.player.score, 0);
        assert_eq!(snapshot.enemies.len(), 3);
        assert_eq!(snapshot.items.len(), 3);
        assert_eq!(snapshot.player.x, 200.0);
        assert_eq!(snapshot.player.y, 497.0);
    }

    #[test]
    fn when_player_stands_on_ground_then_position_is_stable() {
        let mut engine = empty_engine();

        for _ in 0..10 {
            engine.tick(DT);
        }

        assert_eq!(engine.state.player.position, Vec2::new(200.0, 497.0));
        assert_eq!(engine.state.player.velocity.y, 0.0);
        assert!(!engine.state.player.jumping);
    }

    #[test]
    fn when_player_touches_item_then_item_is_collected_and_scored() {
        let mut engine = empty_engine();
        put_player(&mut engine, 100.0, 500.0);
        let banana = item_at(&mut engine, ItemKind::Banana, 100.0, 500.0);

        let snapshot = engine.tick(DT);

        assert!(!item(&engine, banana).active);
        assert_eq!(snapshot.player.score, 70);
        assert!(snapshot.items.iter().all(|item| item.id != banana));
    }

    #[test]
    fn when_item_is_already_collected_then_touching_it_scores_nothing() {
        let mut engine = empty_engine();
        put_player(&mut engine, 100.0, 500.0);
        let banana = item_at(&mut engine, ItemKind::Banana, 100.0, 500.0);
        engine.tick(DT);
        assert_eq!(engine.state.player.score, 70);

        for _ in 0..5 {
            engine.tick(DT);
        }

        assert!(!item(&engine, banana).active);
        assert_eq!(engine.state.player.score, 70);
    }

    #[test]
    fn when_item_pickup_happens_while_invincible_then_it_still_scores() {
        let mut engine = empty_engine();
        engine.state.player.invincible_until = Some(Duration::from_secs(60));
        put_player(&mut engine, 100.0, 500.0);
        item_at(&mut engine, ItemKind::Orange, 100.0, 500.0);

        let snapshot = engine.tick(DT);

        assert_eq!(snapshot.player.score, 100);
    }

    #[test]
    fn when_enemy_hits_player_with_lives_left_then_only_player_is_reset() {
        let mut engine = engine();
        let bystander = engine.state.enemies[2].id;
        put_player(&mut engine, 300.0, 392.0);
        let attacker = enemy_at(&mut engine, EnemyKind::Patroller, 300.0, 392.0);
        let enemies_before = engine.state.enemies.len();
        let items_before = engine.state.items.clone();

        let snapshot = engine.tick(DT);

        assert_eq!(snapshot.player.lives, 2);
        assert_eq!(snapshot.player.x, 200.0);
        assert_eq!(snapshot.player.y, 497.0);
        assert!(snapshot.player.invincible);
        assert!(engine.state.player.invincible_until.is_some());
        // Non-fatal deaths leave the level untouched.
        assert_eq!(engine.state.enemies.len(), enemies_before);
        assert!(engine.state.enemies.iter().any(|e| e.id == attacker));
        assert!(engine.state.enemies.iter().any(|e| e.id == bystander));
        assert_eq!(engine.state.items, items_before);
    }

    #[test]
    fn when_last_life_is_lost_then_game_fully_resets() {
        let mut engine = engine();
        engine.state.player.lives = 1;
        engine.state.player.score = 850;
        engine.state.level = 3;
        engine.state.speed_multiplier = 1.4;
        put_player(&mut engine, 300.0, 392.0);
        let attacker = enemy_at(&mut engine, EnemyKind::Patroller, 300.0, 392.0);

        let snapshot = engine.tick(DT);

        assert_eq!(snapshot.player.lives, 3);
        assert_eq!(snapshot.player.score, 0);
        assert_eq!(snapshot.level, 1);
        assert_eq!(snapshot.speed_multiplier, 1.0);
        assert!(!snapshot.won);
        assert!(!snapshot.player.invincible);
        // Level was rebuilt with fresh entities.
        assert_eq!(snapshot.enemies.len(), 3);
        assert!(snapshot.enemies.iter().all(|e| e.id > attacker));
        assert_eq!(snapshot.items.len(), 3);
        assert_eq!(snapshot.player.x, 200.0);
    }

    #[test]
    fn when_invincible_then_enemy_contact_does_not_kill_again() {
        let mut engine = empty_engine();
        let attacker = enemy_at(&mut engine, EnemyKind::Patroller, 200.0, 497.0);

        engine.tick(DT);
        assert_eq!(engine.state.player.lives, 2);
        assert_eq!(enemy(&engine, attacker).position.x, 200.0);

        // Player respawned on top of the attacker; the grace period protects them.
        for _ in 0..10 {
            engine.tick(DT);
        }
        assert_eq!(engine.state.player.lives, 2);

        // Once the window runs out the same contact is lethal again.
        engine.tick(Duration::from_secs(3));
        assert_eq!(engine.state.player.lives, 1);
    }

    #[test]
    fn when_invincibility_window_passes_without_contact_then_it_clears() {
        let mut engine = empty_engine();
        engine.state.player.invincible_until = Some(Duration::from_millis(100));

        engine.tick(Duration::from_millis(50));
        assert!(engine.state.is_invincible());

        engine.tick(Duration::from_millis(50));
        assert!(!engine.state.is_invincible());
    }

    #[test]
    fn when_two_enemies_overlap_player_then_only_one_life_is_lost() {
        let mut engine = empty_engine();
        enemy_at(&mut engine, EnemyKind::Patroller, 200.0, 497.0);
        enemy_at(&mut engine, EnemyKind::Patroller, 205.0, 497.0);

        engine.tick(DT);

        assert_eq!(engine.state.player.lives, 2);
    }

    #[test]
    fn when_player_touches_hazard_then_player_dies() {
        let mut engine = empty_engine();
        put_player(&mut engine, 250.0, 92.0);
        engine.state.hazard.position.x = 240.0;

        engine.tick(DT);

        assert_eq!(engine.state.player.lives, 2);
    }

    // Standing on the top ledge with the body centre inside the cage.
    fn reach_cage(engine: &mut SimulationEngine) -> Snapshot {
        put_player(engine, 168.0, 92.0);
        engine.tick(DT)
    }

    #[test]
    fn when_player_enters_cage_then_level_is_won() {
        let mut engine = empty_engine();
        engine.state.player.score = 200;

        let snapshot = reach_cage(&mut engine);

        assert!(snapshot.won);
        assert_eq!(snapshot.player.score, 1200);
        assert_eq!(snapshot.player.lives, 4);
        assert!(snapshot.player.just_gained_life);
        assert_eq!(snapshot.level, 2);
        assert!((snapshot.speed_multiplier - 1.2).abs() < 1e-6);
    }

    #[test]
    fn when_level_is_won_then_cage_does_not_pay_twice() {
        let mut engine = empty_engine();
        reach_cage(&mut engine);
        let score = engine.state.player.score;

        for _ in 0..5 {
            let snapshot = engine.tick(DT);
            assert!(snapshot.won);
            assert_eq!(snapshot.player.score, score);
            assert_eq!(snapshot.level, 2);
            // The extra-life flag only lasts for one snapshot.
            assert!(!snapshot.player.just_gained_life);
        }
    }

    #[test]
    fn when_lives_are_at_max_then_win_pays_bonus_points_instead() {
        let mut engine = empty_engine();
        engine.state.player.lives = 5;

        let snapshot = reach_cage(&mut engine);

        assert_eq!(snapshot.player.lives, 5);
        assert_eq!(snapshot.player.score, 1500);
        assert!(!snapshot.player.just_gained_life);
    }

    #[test]
    fn when_settle_delay_passes_then_next_level_starts_faster() {
        let mut engine = empty_engine();
        reach_cage(&mut engine);
        let score = engine.state.player.score;

        let snapshot = engine.tick(Duration::from_secs(2));

        assert!(!snapshot.won);
        assert_eq!(snapshot.level, 2);
        assert_eq!(snapshot.player.score, score);
        assert_eq!(snapshot.player.lives, 4);
        assert_eq!(snapshot.enemies.len(), 3);
        assert_eq!(snapshot.items.len(), 3);
        assert_eq!(snapshot.player.x, 200.0);
        for enemy in &engine.state.enemies {
            assert!((enemy.speed - enemy.base_speed * 1.2).abs() < 1e-6);
        }
    }

    #[test]
    fn when_player_grips_track_then_up_climbs_and_jump_is_ignored() {
        let mut engine = empty_engine();
        // Centre (160) lines up with track 0 at x = 160.
        put_player(&mut engine, 148.0, 400.0);
        engine.tick(DT);
        assert!(engine.state.player.on_track);

        engine.handle_input(InputCommand::Jump);
        assert!(!engine.state.player.jumping);

        engine.handle_input(InputCommand::Up);
        engine.tick(DT);
        assert_eq!(engine.state.player.position.y, 397.0);
        assert!(!engine.state.player.jumping);

        engine.handle_input(InputCommand::Stop);
        engine.tick(DT);
        assert_eq!(engine.state.player.position.y, 397.0);
    }

    #[test]
    fn when_player_climbs_down_to_vine_bottom_and_walks_off_then_ground_holds() {
        let mut engine = empty_engine();
        // Track 2 at x = 400 ends on the ground top (525).
        put_player(&mut engine, 388.0, 400.0);
        engine.tick(DT);
        assert!(engine.state.player.on_track);

        engine.handle_input(InputCommand::Down);
        for _ in 0..40 {
            engine.tick(DT);
        }
        assert_eq!(engine.state.player.position.y, 497.0);
        assert!(engine.state.player.on_track);

        // Lets go of the vine on the tenth step; stays short of track 3.
        engine.handle_input(InputCommand::Right);
        for _ in 0..15 {
            engine.tick(DT);
        }

        let player = &engine.state.player;
        assert!(!player.on_track);
        assert!(player.position.x > 404.0);
        assert_eq!(player.position.y, 497.0);
        assert_eq!(player.lives, 3);
        assert!(player.invincible_until.is_none());
    }

    #[test]
    fn when_player_climbs_to_vine_top_then_it_steps_onto_the_platform() {
        let mut engine = empty_engine();
        // Track 2 tops out at the y = 220 platform.
        put_player(&mut engine, 388.0, 300.0);
        engine.tick(DT);

        engine.handle_input(InputCommand::Up);
        for _ in 0..50 {
            engine.tick(DT);
            assert!(engine.state.player.position.y >= 192.0);
        }

        let player = &engine.state.player;
        assert!(!player.on_track);
        assert_eq!(player.position.y, 192.0);
        assert_eq!(player.velocity.y, 0.0);
        assert_eq!(player.lives, 3);
    }

    #[test]
    fn when_player_walks_onto_vine_at_ground_then_down_keeps_feet_on_ground() {
        let mut engine = empty_engine();

        // From the start (200, 497), track 1 at x = 240 comes within reach on the fourth step.
        engine.handle_input(InputCommand::Right);
        for _ in 0..4 {
            engine.tick(DT);
        }
        assert!(engine.state.player.on_track);

        engine.handle_input(InputCommand::Stop);
        engine.handle_input(InputCommand::Down);
        for _ in 0..5 {
            engine.tick(DT);
        }
        assert_eq!(engine.state.player.position.y, 497.0);
        assert!(engine.state.player.on_track);

        engine.handle_input(InputCommand::Left);
        for _ in 0..8 {
            engine.tick(DT);
        }
        let player = &engine.state.player;
        assert!(!player.on_track);
        assert_eq!(player.position.y, 497.0);
        assert_eq!(player.lives, 3);
    }

    #[test]
    fn when_player_moves_on_track_then_horizontal_speed_is_damped() {
        let mut engine = empty_engine();
        put_player(&mut engine, 148.0, 400.0);
        engine.tick(DT);

        engine.handle_input(InputCommand::Right);
        engine.tick(DT);

        assert!((engine.state.player.position.x - 149.6).abs() < 1e-4);
    }

    #[test]
    fn when_player_is_off_track_then_climb_commands_are_ignored() {
        let mut engine = empty_engine();

        engine.handle_input(InputCommand::Up);
        engine.tick(DT);

        assert_eq!(engine.state.player.climb_intent, 0.0);
        assert_eq!(engine.state.player.position.y, 497.0);
    }

    #[test]
    fn when_player_jumps_then_second_jump_is_ignored_until_landing() {
        let mut engine = empty_engine();

        engine.handle_input(InputCommand::Jump);
        assert!(engine.state.player.jumping);
        engine.tick(DT);
        let y_after_first = engine.state.player.position.y;
        assert!(y_after_first < 497.0);

        engine.handle_input(InputCommand::Jump);
        assert!(engine.state.player.velocity.y > -5.0);

        for _ in 0..120 {
            engine.tick(DT);
        }
        assert_eq!(engine.state.player.position.y, 497.0);
        assert!(!engine.state.player.jumping);
    }

    #[test]
    fn when_player_walks_then_position_is_clamped_to_world() {
        let mut engine = empty_engine();
        put_player(&mut engine, 2.0, 92.0);

        engine.handle_input(InputCommand::Left);
        engine.tick(DT);

        assert_eq!(engine.state.player.position.x, 0.0);
    }

    #[test]
    fn when_fall_is_faster_than_landing_tolerance_then_sweep_still_lands() {
        let mut tuning = Tuning::default();
        tuning.player.landing_tolerance = 1.0;
        let mut engine = SimulationEngine::new(LevelLayout::jungle(), tuning);
        engine.state.enemies.clear();
        engine.state.items.clear();
        // Bottom at 415, platform top at 420, falling 8 px per tick.
        put_player(&mut engine, 300.0, 387.0);
        engine.state.player.velocity.y = 8.0;

        engine.tick(DT);

        assert_eq!(engine.state.player.position.y, 392.0);
        assert_eq!(engine.state.player.velocity.y, 0.0);
    }

    #[test]
    fn when_player_falls_past_the_ground_edge_then_player_dies() {
        let mut engine = empty_engine();
        put_player(&mut engine, 20.0, 505.0);
        engine.state.player.velocity.y = 2.0;

        let snapshot = engine.tick(DT);

        assert_eq!(snapshot.player.lives, 2);
        assert_eq!(snapshot.player.x, 200.0);
        assert_eq!(snapshot.player.y, 497.0);
    }

    #[test]
    fn when_faller_leaves_stage_then_it_is_reported_once_then_pruned() {
        let mut engine = empty_engine();
        let faller = enemy_at(&mut engine, EnemyKind::Faller, 800.0, 549.5);

        let snapshot = engine.tick(DT);
        let reported = snapshot
            .enemies
            .iter()
            .find(|e| e.id == faller)
            .expect("fallen enemy should be reported");
        assert!(!reported.active);

        let snapshot = engine.tick(DT);
        assert!(snapshot.enemies.iter().all(|e| e.id != faller));
    }

    #[test]
    fn when_spawning_enemy_on_bad_track_then_state_is_unchanged() {
        let mut engine = engine();
        let before = engine.state.enemies.clone();

        let bad_track = engine.spawn_enemy(EnemyKind::Patroller, 99, 300.0);
        let bad_height = engine.spawn_enemy(EnemyKind::Faller, 2, 100.0);
        let nan_height = engine.spawn_enemy(EnemyKind::Faller, 2, f32::NAN);

        assert_eq!(bad_track, Err(AdminError::InvalidTrack { track: 99 }));
        assert!(matches!(
            bad_height,
            Err(AdminError::HeightOutOfRange { track: 2, .. })
        ));
        assert!(nan_height.is_err());
        assert_eq!(engine.state.enemies, before);
    }

    #[test]
    fn when_spawning_enemy_then_it_sits_on_the_track_with_scaled_speed() {
        let mut engine = engine();
        engine.state.speed_multiplier = 1.4;
        let last_id = engine.state.enemies.last().map(|e| e.id).unwrap_or(0);

        let id = engine
            .spawn_enemy(EnemyKind::Patroller, 3, 300.0)
            .expect("spawn should succeed");

        assert!(id > last_id);
        let spawned = enemy(&engine, id);
        assert_eq!(spawned.position, Vec2::new(480.0, 300.0));
        assert_eq!(spawned.track, Some(3));
        assert!((spawned.speed - 1.2 * 1.4).abs() < 1e-6);
    }

    #[test]
    fn when_despawning_unknown_enemy_then_not_found_is_returned() {
        let mut engine = engine();
        let before = engine.state.enemies.len();

        assert_eq!(
            engine.despawn_enemy(9_999),
            Err(AdminError::EnemyNotFound { id: 9_999 })
        );
        assert_eq!(engine.state.enemies.len(), before);

        let id = engine.state.enemies[0].id;
        assert_eq!(engine.despawn_enemy(id), Ok(()));
        assert_eq!(engine.state.enemies.len(), before - 1);
    }

    #[test]
    fn when_spawning_item_with_out_of_range_points_then_it_is_rejected() {
        let mut engine = engine();
        let before = engine.state.items.clone();

        assert_eq!(
            engine.spawn_item(ItemKind::Cherry, 0, 300.0, Some(0)),
            Err(AdminError::InvalidPoints { points: 0 })
        );
        assert_eq!(
            engine.spawn_item(ItemKind::Cherry, 0, 300.0, Some(50_000)),
            Err(AdminError::InvalidPoints { points: 50_000 })
        );
        assert_eq!(engine.state.items, before);

        let id = engine
            .spawn_item(ItemKind::Cherry, 0, 300.0, Some(250))
            .expect("spawn should succeed");
        assert_eq!(item(&engine, id).points, 250);
    }

    #[test]
    fn when_despawning_item_by_position_then_nearest_match_is_removed() {
        let mut engine = engine();
        let id = engine
            .spawn_item(ItemKind::Banana, 5, 300.0, None)
            .expect("spawn should succeed");

        assert_eq!(
            engine.despawn_item_at(5, 400.0),
            Err(AdminError::NoItemAt {
                track: 5,
                height: 400.0
            })
        );
        assert_eq!(engine.despawn_item_at(5, 305.0), Ok(id));
        assert!(engine.state.items.iter().all(|item| item.id != id));
    }

    #[test]
    fn when_despawning_item_by_id_then_collected_items_count_as_missing() {
        let mut engine = engine();
        let id = engine.state.items[0].id;
        engine.state.items[0].active = false;

        assert_eq!(
            engine.despawn_item(id),
            Err(AdminError::ItemNotFound { id })
        );

        let other = engine.state.items[1].id;
        assert_eq!(engine.despawn_item(other), Ok(()));
    }

    #[test]
    fn when_level_is_rebuilt_then_entity_ids_keep_increasing() {
        let mut engine = engine();
        let highest = engine.state.enemies.iter().map(|e| e.id).max().unwrap_or(0);

        engine.init_level();

        assert!(engine.state.enemies.iter().all(|e| e.id > highest));
    }

    #[test]
    fn when_listing_entities_then_collected_items_are_left_out() {
        let mut engine = engine();
        engine.state.items[0].active = false;

        let listing = engine.listing();

        assert_eq!(listing.enemies.len(), 3);
        assert_eq!(listing.items.len(), 2);
    }

    #[test]
    fn when_mode_changes_then_snapshot_carries_it() {
        let mut engine = engine();

        engine.set_mode(CommunicationMode::Text);

        assert_eq!(engine.tick(DT).mode, CommunicationMode::Text);
    }
}
