use crate::abilities::Ability;
use crate::agent::{Agent, Steering};
use crate::constants::{BASE_SPEED, INVISIBILITY_SECS, SPEED_BOOST_MULTIPLIER, SPEED_BOOST_SECS};
use crate::nav::{NavGraph, NodeId};
use crate::rng::Rng;
use crate::types::{AbilityKind, AgentId, Character, Direction, PlayerView};
use crate::vector::Vector2;

#[derive(Clone, Debug)]
pub struct Player {
    pub agent: Agent,
    pub alive: bool,
    pub character: Character,
    pub ability: Option<Ability>,
    invisible_for: f32,
    speed_boost_for: f32,
}

impl Player {
    pub fn new(start: NodeId, graph: &NavGraph, character: Character) -> Self {
        let mut player = Self {
            agent: Agent::new(AgentId::Player, start, graph),
            alive: true,
            character,
            ability: Ability::for_character(character),
            invisible_for: 0.0,
            speed_boost_for: 0.0,
        };
        player.place_at_start(graph);
        player
    }

    fn place_at_start(&mut self, graph: &NavGraph) {
        self.agent.direction = Direction::Left;
        self.agent.set_between_nodes(Direction::Left, graph);
    }

    pub fn update(&mut self, dt: f32, graph: &NavGraph, input: Direction, rng: &mut Rng) {
        self.invisible_for = (self.invisible_for - dt).max(0.0);
        self.speed_boost_for = (self.speed_boost_for - dt).max(0.0);
        let multiplier = if self.is_speed_boosted() {
            SPEED_BOOST_MULTIPLIER
        } else {
            1.0
        };
        self.agent.set_speed(BASE_SPEED * multiplier);
        self.agent.update(dt, graph, Steering::Input(input), rng);

        let bounds = Vector2::new(graph.width_px(), graph.height_px());
        if let Some(ability) = self.ability.as_mut() {
            ability.update(dt, bounds);
        }
    }

    pub fn die(&mut self) {
        self.alive = false;
        self.agent.direction = Direction::Stop;
    }

    pub fn reset(&mut self, graph: &NavGraph) {
        self.agent.reset(graph);
        self.place_at_start(graph);
        self.alive = true;
        self.invisible_for = 0.0;
        self.speed_boost_for = 0.0;
        if let Some(ability) = self.ability.as_mut() {
            ability.bullets.clear();
        }
    }

    pub fn warp_to(&mut self, node: NodeId, graph: &NavGraph) {
        self.agent.node = node;
        self.agent.target = node;
        self.agent.position = graph.position(node);
    }

    pub fn grant_invisibility(&mut self) {
        self.invisible_for = INVISIBILITY_SECS;
    }

    pub fn grant_speed_boost(&mut self) {
        self.speed_boost_for = SPEED_BOOST_SECS;
    }

    pub fn is_invisible(&self) -> bool {
        self.invisible_for > 0.0
    }

    pub fn is_speed_boosted(&self) -> bool {
        self.speed_boost_for > 0.0
    }

    pub fn shield_active(&self) -> bool {
        self.ability
            .as_ref()
            .is_some_and(|ability| ability.kind == AbilityKind::Shield && ability.is_active())
    }

    pub fn activate_ability(&mut self) -> Option<AbilityKind> {
        let ability = self.ability.as_mut()?;
        ability.activate().then_some(ability.kind)
    }

    pub fn fire(&mut self) -> bool {
        let position = self.agent.position;
        let direction = self.agent.direction;
        match self.ability.as_mut() {
            Some(ability) => ability.fire(position, direction),
            None => false,
        }
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            x: self.agent.position.x,
            y: self.agent.position.y,
            dir: self.agent.direction,
            alive: self.alive,
            visible: self.agent.visible,
            character: self.character,
            invisible: self.is_invisible(),
            speed_boosted: self.is_speed_boosted(),
            ability: self.ability.as_ref().map(Ability::view),
        }
    }
}
