//! Collision Resolver
//!
//! Predictive AABB test between two colliders. Each box is placed where its
//! owner is about to be this tick (current position plus the body's pending
//! displacement), so a moving body is stopped before it penetrates.
//!
//! The result is binary and first-hit: no contact list, depth or normal.

use tracing::trace;

use super::collider::Collider;
use crate::math::Vec3;
use crate::scene::page::ColliderId;

/// A collider resolved against its owner's position.
#[derive(Debug, Clone, Copy)]
pub struct ColliderRef<'a> {
    pub id: ColliderId,
    pub collider: &'a Collider,
    /// World position of the owning transform
    pub position: Vec3,
}

impl<'a> ColliderRef<'a> {
    pub fn new(id: ColliderId, collider: &'a Collider, position: Vec3) -> Self {
        Self { id, collider, position }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionOutcome {
    /// No box pair overlaps
    Clear,
    /// At least one box pair overlaps
    Hit,
    /// Both sides are the same collider; never a real collision
    SelfHit,
}

/// Transient result of [`compare`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionResult {
    pub outcome: CollisionOutcome,
    /// The collider that was hit
    pub other: Option<ColliderId>,
}

impl CollisionResult {
    pub const CLEAR: CollisionResult = CollisionResult {
        outcome: CollisionOutcome::Clear,
        other: None,
    };

    /// True only for a real collision; self comparisons never block.
    pub fn collided(&self) -> bool {
        self.outcome == CollisionOutcome::Hit
    }

    pub fn is_self(&self) -> bool {
        self.outcome == CollisionOutcome::SelfHit
    }
}

/// Test `a` against `b` at their predicted positions.
pub fn compare(a: ColliderRef<'_>, b: ColliderRef<'_>) -> CollisionResult {
    if a.id == b.id {
        return CollisionResult {
            outcome: CollisionOutcome::SelfHit,
            other: None,
        };
    }

    if a.collider.is_empty() || b.collider.is_empty() {
        return CollisionResult::CLEAR;
    }

    let a_shift = a.collider.body.pending_displacement();
    let b_shift = b.collider.body.pending_displacement();

    for box_a in a.collider.geometry() {
        let rect_a = box_a.world_rect(a.position, a_shift);
        for box_b in b.collider.geometry() {
            let rect_b = box_b.world_rect(b.position, b_shift);
            if rect_a.overlaps(&rect_b) {
                trace!(a = ?a.id, b = ?b.id, ?rect_a, ?rect_b, "collision");
                return CollisionResult {
                    outcome: CollisionOutcome::Hit,
                    other: Some(b.id),
                };
            }
        }
    }

    CollisionResult::CLEAR
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::pool::Pool;
    use crate::physics::body::BodyMode;
    use crate::physics::bounds::Bounds;
    use crate::scene::page::ColliderLink;

    /// Distinct live ids to compare with
    fn ids() -> (ColliderId, ColliderId) {
        let mut pool: Pool<ColliderLink> = Pool::new(2).unwrap();
        let a = pool.alloc(ColliderLink::Standalone(Collider::new())).unwrap();
        let b = pool.alloc(ColliderLink::Standalone(Collider::new())).unwrap();
        (a, b)
    }

    fn square(size: u32) -> Collider {
        Collider::from_bounds(vec![Bounds::new(0.0, 0.0, size, size)])
            .with_mode(BodyMode::ENABLED | BodyMode::AABB)
    }

    #[test]
    fn test_self_comparison_is_sentinel() {
        let (a, _) = ids();
        let c = square(10);
        let r = compare(ColliderRef::new(a, &c, Vec3::ZERO), ColliderRef::new(a, &c, Vec3::ZERO));
        assert!(r.is_self());
        assert!(!r.collided());
    }

    #[test]
    fn test_overlap_reports_other() {
        let (a, b) = ids();
        let (ca, cb) = (square(10), square(10));
        let r = compare(
            ColliderRef::new(a, &ca, Vec3::ZERO),
            ColliderRef::new(b, &cb, Vec3::new(5.0, 5.0, 0.0)),
        );
        assert!(r.collided());
        assert_eq!(r.other, Some(b));
    }

    #[test]
    fn test_symmetry() {
        let (a, b) = ids();
        let (ca, cb) = (square(10), square(4));
        for offset in [-12.0, -10.0, -3.0, 0.0, 3.0, 9.9, 10.0, 15.0] {
            let pa = Vec3::ZERO;
            let pb = Vec3::new(offset, offset * 0.5, 0.0);
            let ab = compare(ColliderRef::new(a, &ca, pa), ColliderRef::new(b, &cb, pb));
            let ba = compare(ColliderRef::new(b, &cb, pb), ColliderRef::new(a, &ca, pa));
            assert_eq!(ab.collided(), ba.collided(), "offset {}", offset);
        }
    }

    #[test]
    fn test_symmetry_with_pending_motion() {
        let (a, b) = ids();
        // (b offset, a push, b push)
        let cases = [
            (20.0, 0.0, -15.0),
            (20.0, 6.0, -6.0),
            (20.0, 5.0, -5.0),
            (20.0, -3.0, 3.0),
            (-14.0, -2.0, 8.0),
            (0.0, 30.0, -30.0),
            (0.0, 12.0, 0.0),
        ];
        for (offset, push_a, push_b) in cases {
            let mut ca = square(10);
            let mut cb = square(10);
            ca.body.add_force(push_a, 0.0, 0.0);
            cb.body.add_force(push_b, 0.0, 0.0);
            let pa = Vec3::ZERO;
            let pb = Vec3::new(offset, 0.0, 0.0);

            let ab = compare(ColliderRef::new(a, &ca, pa), ColliderRef::new(b, &cb, pb));
            let ba = compare(ColliderRef::new(b, &cb, pb), ColliderRef::new(a, &ca, pa));
            assert_eq!(ab.collided(), ba.collided(), "offset {} pushes {} {}", offset, push_a, push_b);
        }

        // Both moving into the same spot collides even though neither does alone
        let mut ca = square(10);
        let mut cb = square(10);
        ca.body.add_force(6.0, 0.0, 0.0);
        cb.body.add_force(-6.0, 0.0, 0.0);
        let pb = Vec3::new(20.0, 0.0, 0.0);
        assert!(compare(ColliderRef::new(a, &ca, Vec3::ZERO), ColliderRef::new(b, &cb, pb)).collided());
        assert!(compare(ColliderRef::new(b, &cb, pb), ColliderRef::new(a, &ca, Vec3::ZERO)).collided());
    }

    #[test]
    fn test_prediction_uses_pending_displacement() {
        let (a, b) = ids();
        let wall = square(10);
        let mut mover = square(10);
        let at = Vec3::new(20.0, 0.0, 0.0);

        let before = compare(ColliderRef::new(b, &mover, at), ColliderRef::new(a, &wall, Vec3::ZERO));
        assert!(!before.collided());

        // Moving 15 left would land at x = 5, inside the wall
        mover.body.add_force(-15.0, 0.0, 0.0);
        let after = compare(ColliderRef::new(b, &mover, at), ColliderRef::new(a, &wall, Vec3::ZERO));
        assert!(after.collided());
    }

    #[test]
    fn test_empty_never_collides() {
        let (a, b) = ids();
        let empty = Collider::new();
        let solid = square(10);
        let r = compare(ColliderRef::new(a, &empty, Vec3::ZERO), ColliderRef::new(b, &solid, Vec3::ZERO));
        assert!(!r.collided());
    }

    #[test]
    fn test_boxes_first_hit() {
        let (a, b) = ids();
        let tiles = Collider::from_bounds(vec![
            Bounds::new(0.0, 0.0, 4, 4),
            Bounds::new(100.0, 0.0, 4, 4),
        ]);
        let player = square(2);
        let r = compare(
            ColliderRef::new(a, &player, Vec3::new(101.0, 1.0, 0.0)),
            ColliderRef::new(b, &tiles, Vec3::ZERO),
        );
        assert!(r.collided());
    }
}
