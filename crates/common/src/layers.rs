use serde::{Deserialize, Serialize};

/// Collision layer bits. A collider carries a layer (what it is) and a mask
/// (what it collides with).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CollisionLayers(pub u32);

impl CollisionLayers {
    pub const NONE: Self = Self(0);
    pub const PLAYER: Self = Self(1 << 0);
    pub const GROUND: Self = Self(1 << 1);
    pub const WALL: Self = Self(1 << 2);
    pub const ENEMY: Self = Self(1 << 3);
    pub const PICKUP: Self = Self(1 << 4);
    pub const TRIGGER: Self = Self(1 << 5);
    pub const ALL: Self = Self(u32::MAX);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for CollisionLayers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Two colliders interact only if each one's layer intersects the other's mask.
pub fn should_collide(
    layer_a: CollisionLayers,
    mask_a: CollisionLayers,
    layer_b: CollisionLayers,
    mask_b: CollisionLayers,
) -> bool {
    layer_a.intersects(mask_b) && layer_b.intersects(mask_a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_never_collides() {
        let all = CollisionLayers::ALL;
        assert!(!should_collide(CollisionLayers::NONE, all, CollisionLayers::PLAYER, all));
        assert!(!should_collide(CollisionLayers::PLAYER, all, CollisionLayers::NONE, all));
        assert!(!should_collide(CollisionLayers::NONE, all, CollisionLayers::NONE, all));
    }

    #[test]
    fn all_mask_collides_with_any_nonzero_layer() {
        let all = CollisionLayers::ALL;
        for layer in [
            CollisionLayers::PLAYER,
            CollisionLayers::GROUND,
            CollisionLayers::WALL,
            CollisionLayers::ENEMY,
            CollisionLayers::PICKUP,
            CollisionLayers::TRIGGER,
        ] {
            assert!(should_collide(layer, all, CollisionLayers::GROUND, all));
        }
    }

    #[test]
    fn filter_is_symmetric_and() {
        let player = CollisionLayers::PLAYER;
        let ground = CollisionLayers::GROUND;
        // player wants ground, ground only wants enemies
        assert!(!should_collide(player, ground, ground, CollisionLayers::ENEMY));
        assert!(!should_collide(ground, CollisionLayers::ENEMY, player, ground));
        // both sides agree
        assert!(should_collide(player, ground, ground, player | CollisionLayers::ENEMY));
    }

    #[test]
    fn exhaustive_agreement_with_bit_formula() {
        let samples = [0u32, 1, 2, 3, 6, 32, 0xFFFF_FFFF];
        for &l1 in &samples {
            for &m1 in &samples {
                for &l2 in &samples {
                    for &m2 in &samples {
                        let expected = (l1 & m2) != 0 && (l2 & m1) != 0;
                        let got = should_collide(
                            CollisionLayers(l1),
                            CollisionLayers(m1),
                            CollisionLayers(l2),
                            CollisionLayers(m2),
                        );
                        assert_eq!(got, expected);
                        assert_eq!(
                            got,
                            should_collide(
                                CollisionLayers(l2),
                                CollisionLayers(m2),
                                CollisionLayers(l1),
                                CollisionLayers(m1),
                            )
                        );
                    }
                }
            }
        }
    }
}
