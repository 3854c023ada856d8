// Entity construction. The engine asks for "an enemy of this kind in this slot" and leaves the
// creation policy (speeds, bounds, sizes) to the factory.

use super::entities::{Enemy, EnemyId, EnemyKind, Item, ItemId, ItemKind};
use super::geometry::Vec2;
use super::layout::{LevelLayout, SpawnSlot};
use super::movement::MovementPolicy;
use super::tuning::{EnemyTuning, ItemTuning};

pub trait EntityFactory: Send {
    fn create_enemy(
        &self,
        id: EnemyId,
        kind: EnemyKind,
        slot: SpawnSlot,
        layout: &LevelLayout,
    ) -> Enemy;

    /// `points` overrides the kind's default value when present.
    fn create_item(
        &self,
        id: ItemId,
        kind: ItemKind,
        slot: SpawnSlot,
        points: Option<u32>,
    ) -> Item;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFactory {
    pub enemy: EnemyTuning,
    pub item: ItemTuning,
}

impl StandardFactory {
    pub fn new(enemy: EnemyTuning, item: ItemTuning) -> Self {
        Self { enemy, item }
    }
}

impl EntityFactory for StandardFactory {
    fn create_enemy(
        &self,
        id: EnemyId,
        kind: EnemyKind,
        slot: SpawnSlot,
        layout: &LevelLayout,
    ) -> Enemy {
        let tuning = &self.enemy;
        let track = slot.track.and_then(|id| layout.track(id));

        let (policy, base_speed) = match kind {
            EnemyKind::Patroller => {
                let policy = match track {
                    Some(track) => MovementPolicy::patroller(
                        slot.position.x,
                        track.center_x(),
                        track.top() + tuning.track_top_margin,
                        track.bottom() - tuning.track_bottom_margin,
                        tuning.settle_speed,
                        tuning.settle_epsilon,
                    ),
                    None => MovementPolicy::patroller(
                        slot.position.x,
                        slot.position.x,
                        tuning.default_min_y,
                        tuning.default_max_y,
                        tuning.settle_speed,
                        tuning.settle_epsilon,
                    ),
                };
                (policy, tuning.patroller_speed)
            }
            EnemyKind::Faller => (
                MovementPolicy::Faller {
                    floor: tuning.faller_floor,
                },
                tuning.faller_speed,
            ),
        };

        Enemy {
            id,
            kind,
            position: slot.position,
            size: Vec2::new(tuning.width, tuning.height),
            speed: base_speed,
            base_speed,
            direction: 1,
            active: true,
            track: track.map(|track| track.id),
            policy,
        }
    }

    fn create_item(
        &self,
        id: ItemId,
        kind: ItemKind,
        slot: SpawnSlot,
        points: Option<u32>,
    ) -> Item {
        Item {
            id,
            kind,
            position: slot.position,
            size: Vec2::new(self.item.width, self.item.height),
            points: points.unwrap_or_else(|| kind.points()),
            active: true,
            track: slot.track,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::movement::{Patrol, PatrolPhase};

    #[test]
    fn when_patroller_is_created_on_a_track_then_bounds_follow_the_track() {
        let layout = LevelLayout::jungle();
        let factory = StandardFactory::default();

        let enemy = factory.create_enemy(
            7,
            EnemyKind::Patroller,
            SpawnSlot::on_track(1, 240.0, 300.0),
            &layout,
        );

        assert_eq!(enemy.id, 7);
        assert_eq!(enemy.track, Some(1));
        match enemy.policy {
            MovementPolicy::Patroller(Patrol {
                phase,
                min_y,
                max_y,
                center_x,
                ..
            }) => {
                assert_eq!(phase, PatrolPhase::Patrolling);
                assert_eq!(min_y, 135.0);
                assert_eq!(max_y, 495.0);
                assert_eq!(center_x, 240.0);
            }
            other => panic!("expected patroller policy, got {other:?}"),
        }
    }

    #[test]
    fn when_patroller_has_no_track_then_default_bounds_apply() {
        let layout = LevelLayout::jungle();
        let factory = StandardFactory::default();

        let enemy = factory.create_enemy(
            1,
            EnemyKind::Patroller,
            SpawnSlot::free(500.0, 300.0),
            &layout,
        );

        assert!(matches!(
            enemy.policy,
            MovementPolicy::Patroller(Patrol {
                min_y: 150.0,
                max_y: 520.0,
                phase: PatrolPhase::Patrolling,
                ..
            })
        ));
    }

    #[test]
    fn when_item_has_no_points_override_then_kind_value_is_used() {
        let factory = StandardFactory::default();

        let banana = factory.create_item(1, ItemKind::Banana, SpawnSlot::free(0.0, 0.0), None);
        let custom = factory.create_item(2, ItemKind::Cherry, SpawnSlot::free(0.0, 0.0), Some(5));

        assert_eq!(banana.points, 70);
        assert_eq!(custom.points, 5);
        assert!(banana.active);
    }
}
