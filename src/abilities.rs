use crate::constants::{
    ABILITY_ACTIVE_SECS, ABILITY_COOLDOWN_SECS, BULLET_SPEED, SHOT_INTERVAL_SECS, TILE_HEIGHT,
    TILE_WIDTH,
};
use crate::types::{AbilityKind, AbilityPhase, AbilityView, BulletView, Character, Direction};
use crate::vector::Vector2;

#[derive(Clone, Debug)]
pub struct Bullet {
    pub position: Vector2,
    pub direction: Direction,
    pub active: bool,
}

impl Bullet {
    pub fn new(position: Vector2, direction: Direction) -> Self {
        Self {
            position,
            direction,
            active: true,
        }
    }

    pub fn update(&mut self, dt: f32, bounds: Vector2) {
        self.position += self.direction.unit() * BULLET_SPEED * dt;
        if self.position.x < 0.0
            || self.position.x > bounds.x
            || self.position.y < 0.0
            || self.position.y > bounds.y
        {
            self.active = false;
        }
    }

    /// Strict overlap between this bullet's tile-sized box and a box of `size` centered on `center`.
    pub fn hits(&self, center: Vector2, size: Vector2) -> bool {
        let reach_x = (TILE_WIDTH + size.x) / 2.0;
        let reach_y = (TILE_HEIGHT + size.y) / 2.0;
        (self.position.x - center.x).abs() < reach_x && (self.position.y - center.y).abs() < reach_y
    }

    pub fn view(&self) -> BulletView {
        BulletView {
            x: self.position.x,
            y: self.position.y,
            dir: self.direction,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ability {
    pub kind: AbilityKind,
    phase: AbilityPhase,
    timer: f32,
    clock: f32,
    last_shot: Option<f32>,
    pub bullets: Vec<Bullet>,
}

impl Ability {
    pub fn new(kind: AbilityKind) -> Self {
        Self {
            kind,
            phase: AbilityPhase::Ready,
            timer: 0.0,
            clock: 0.0,
            last_shot: None,
            bullets: Vec::new(),
        }
    }

    pub fn for_character(character: Character) -> Option<Self> {
        match character {
            Character::Classic => None,
            Character::Gunner => Some(Self::new(AbilityKind::Gun)),
            Character::Shield => Some(Self::new(AbilityKind::Shield)),
        }
    }

    pub fn phase(&self) -> AbilityPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == AbilityPhase::Active
    }

    pub fn activate(&mut self) -> bool {
        if self.phase != AbilityPhase::Ready {
            return false;
        }
        self.phase = AbilityPhase::Active;
        self.timer = 0.0;
        true
    }

    pub fn fire(&mut self, position: Vector2, direction: Direction) -> bool {
        if self.kind != AbilityKind::Gun || !self.is_active() || direction == Direction::Stop {
            return false;
        }
        if let Some(last) = self.last_shot {
            if self.clock - last <= SHOT_INTERVAL_SECS {
                return false;
            }
        }
        self.bullets.push(Bullet::new(position, direction));
        self.last_shot = Some(self.clock);
        true
    }

    pub fn update(&mut self, dt: f32, bounds: Vector2) {
        self.clock += dt;
        match self.phase {
            AbilityPhase::Active => {
                self.timer += dt;
                if self.timer >= ABILITY_ACTIVE_SECS {
                    self.phase = AbilityPhase::Cooldown;
                    self.timer = 0.0;
                }
            }
            AbilityPhase::Cooldown => {
                self.timer += dt;
                if self.timer >= ABILITY_COOLDOWN_SECS {
                    self.phase = AbilityPhase::Ready;
                    self.timer = 0.0;
                }
            }
            AbilityPhase::Ready => {}
        }
        for bullet in &mut self.bullets {
            bullet.update(dt, bounds);
        }
        self.bullets.retain(|bullet| bullet.active);
    }

    pub fn time_left(&self) -> f32 {
        match self.phase {
            AbilityPhase::Active => ABILITY_ACTIVE_SECS - self.timer,
            AbilityPhase::Cooldown => ABILITY_COOLDOWN_SECS - self.timer,
            AbilityPhase::Ready => 0.0,
        }
    }

    pub fn view(&self) -> AbilityView {
        AbilityView {
            kind: self.kind,
            phase: self.phase,
            time_left: self.time_left().max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Ability, Bullet};
    use crate::types::{AbilityKind, AbilityPhase, Character, Direction};
    use crate::vector::Vector2;

    const BOUNDS: Vector2 = Vector2 { x: 448.0, y: 576.0 };

    #[test]
    fn ability_cycles_ready_active_cooldown() {
        let mut ability = Ability::new(AbilityKind::Shield);
        assert!(ability.activate());
        assert!(!ability.activate());
        ability.update(4.9, BOUNDS);
        assert_eq!(ability.phase(), AbilityPhase::Active);
        ability.update(0.2, BOUNDS);
        assert_eq!(ability.phase(), AbilityPhase::Cooldown);
        assert!(!ability.activate());
        ability.update(10.0, BOUNDS);
        assert_eq!(ability.phase(), AbilityPhase::Ready);
    }

    #[test]
    fn gun_fire_is_rate_limited_and_requires_heading() {
        let mut gun = Ability::for_character(Character::Gunner).expect("gunner has a gun");
        let origin = Vector2::new(100.0, 100.0);
        assert!(!gun.fire(origin, Direction::Left));
        gun.activate();
        assert!(!gun.fire(origin, Direction::Stop));
        assert!(gun.fire(origin, Direction::Left));
        assert!(!gun.fire(origin, Direction::Left));
        gun.update(0.1, BOUNDS);
        assert!(!gun.fire(origin, Direction::Left));
        gun.update(0.1, BOUNDS);
        assert!(gun.fire(origin, Direction::Up));
        assert_eq!(gun.bullets.len(), 2);
    }

    #[test]
    fn bullets_expire_outside_playfield() {
        let mut gun = Ability::new(AbilityKind::Gun);
        gun.activate();
        gun.fire(Vector2::new(100.0, 100.0), Direction::Left);
        gun.update(0.2, BOUNDS);
        assert_eq!(gun.bullets.len(), 1);
        gun.update(0.1, BOUNDS);
        assert!(gun.bullets.is_empty());
        assert!(Ability::for_character(Character::Classic).is_none());
    }

    #[test]
    fn bullet_rect_overlap_is_strict() {
        let bullet = Bullet::new(Vector2::new(0.0, 0.0), Direction::Right);
        let ghost = Vector2::new(32.0, 32.0);
        assert!(bullet.hits(Vector2::new(23.9, 0.0), ghost));
        assert!(!bullet.hits(Vector2::new(24.0, 0.0), ghost));
        assert!(!bullet.hits(Vector2::new(0.0, 24.0), ghost));
    }
}
