use serde_json::Value;

use crate::types::{Character, Direction};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbilityAction {
    Activate,
    Fire,
}

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Start {
        name: Option<String>,
        character: Option<Character>,
        seed: Option<u32>,
    },
    Input {
        dir: Direction,
    },
    Pause,
    Ability {
        action: AbilityAction,
    },
    Ping {
        t: f64,
    },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "start" => {
            let name = match object.get("name") {
                None => None,
                Some(value) => Some(value.as_str()?.to_string()),
            };
            let character = match object.get("character") {
                None => None,
                Some(value) => Some(Character::parse(value.as_str()?)?),
            };
            let seed = match object.get("seed") {
                None => None,
                Some(value) => Some(u32::try_from(value.as_u64()?).ok()?),
            };
            Some(ParsedClientMessage::Start {
                name,
                character,
                seed,
            })
        }
        "input" => {
            let dir = Direction::parse_move(object.get("dir")?.as_str()?)?;
            Some(ParsedClientMessage::Input { dir })
        }
        "pause" => Some(ParsedClientMessage::Pause),
        "ability" => {
            let action = match object.get("action").and_then(Value::as_str) {
                None | Some("use") => AbilityAction::Activate,
                Some("activate") => AbilityAction::Activate,
                Some("fire") => AbilityAction::Fire,
                Some(_) => return None,
            };
            Some(ParsedClientMessage::Ability { action })
        }
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}
