//! Card field rules, applied before anything reaches storage.
//!
//! Checks run in a fixed order and stop at the first violation.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::model::{Attribute, Card, CardPatch, CardType, NewCard, SubType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CardViolation {
    #[error("Name is required and must be a non-empty string.")]
    Name,
    #[error("Type is required and must be include in [Monster, Trap, Spell].")]
    Type,
    #[error("Image is required and must be a non-empty string.")]
    Image,
    #[error("Attribute is required and include in [Dark, Light, Earth, Water, Fire, Wind, Divine].")]
    Attribute,
    #[error("Description is required and must be a non-empty string.")]
    Description,
    #[error("Number must be a string matching format ex: ABCD-EF123.")]
    Number,
    #[error("Level is required to Monster type and must be a number in range [1, 6].")]
    Level,
    #[error("SubTypes is required to Monster type and must be one of [Normal, Ritual, Effect, XYZ, Toon, Fusion, Synchro].")]
    SubTypes,
    #[error("Attack is required to Monster type and must be a number.")]
    Attack,
    #[error("Defense is required to Monster type and must be a number.")]
    Defense,
}

/// Unchecked card body as sent by the client.
///
/// Every field is kept as raw JSON so that wrong types surface as the matching
/// violation instead of a deserialization error. `id` and `userId` are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct CardCandidate {
    #[serde(default)]
    pub number: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default, rename = "type")]
    pub card_type: Option<Value>,
    #[serde(default)]
    pub image: Option<Value>,
    #[serde(default)]
    pub attribute: Option<Value>,
    #[serde(default, rename = "subTypes")]
    pub sub_types: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub level: Option<Value>,
    #[serde(default)]
    pub attack: Option<Value>,
    #[serde(default)]
    pub defense: Option<Value>,
}

pub const MIN_LEVEL: i32 = 1;
pub const MAX_LEVEL: i32 = 6;

fn number_format() -> &'static Regex {
    lazy_static! {
        static ref CARD_NUMBER_RE: Regex = Regex::new(r"^[A-Za-z]+-[A-Za-z]+[0-9]+$").unwrap();
    }
    &CARD_NUMBER_RE
}

fn non_empty_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn member<T: std::str::FromStr>(v: &Value) -> Option<T> {
    match v {
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Whole JSON numbers that fit an INTEGER column; `7.0` counts, `7.5` does not.
fn integer(v: &Value) -> Option<i32> {
    let Value::Number(n) = v else { return None };
    if let Some(i) = n.as_i64() {
        return i32::try_from(i).ok();
    }
    let f = n.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}

fn catalog_number(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if number_format().is_match(s) => Some(s.clone()),
        _ => None,
    }
}

fn level(v: &Value) -> Option<i32> {
    integer(v).filter(|l| (MIN_LEVEL..=MAX_LEVEL).contains(l))
}

fn required<T>(
    v: &Option<Value>,
    parse: impl Fn(&Value) -> Option<T>,
    violation: CardViolation,
) -> Result<T, CardViolation> {
    v.as_ref().and_then(parse).ok_or(violation)
}

/// Absent is fine; present but malformed is not.
fn optional<T>(
    v: &Option<Value>,
    parse: impl Fn(&Value) -> Option<T>,
    violation: CardViolation,
) -> Result<Option<T>, CardViolation> {
    match v {
        None => Ok(None),
        Some(v) => parse(v).map(Some).ok_or(violation),
    }
}

/// Check a creation body and turn it into a storable card.
pub fn validate_card(c: &CardCandidate) -> Result<NewCard, CardViolation> {
    let name = required(&c.name, non_empty_text, CardViolation::Name)?;
    let card_type: CardType = required(&c.card_type, member, CardViolation::Type)?;
    let image = required(&c.image, non_empty_text, CardViolation::Image)?;
    let attribute: Attribute = required(&c.attribute, member, CardViolation::Attribute)?;
    let description = required(&c.description, non_empty_text, CardViolation::Description)?;

    let (number, level, sub_types, attack, defense) = match card_type {
        CardType::Monster => (
            optional(&c.number, catalog_number, CardViolation::Number)?,
            Some(required(&c.level, level, CardViolation::Level)?),
            Some(required(&c.sub_types, member::<SubType>, CardViolation::SubTypes)?),
            Some(required(&c.attack, integer, CardViolation::Attack)?),
            Some(required(&c.defense, integer, CardViolation::Defense)?),
        ),
        // Spells and traps may still carry these; keep them only if well-formed.
        CardType::Spell | CardType::Trap => (
            optional(&c.number, non_empty_text, CardViolation::Number)?,
            optional(&c.level, level, CardViolation::Level)?,
            optional(&c.sub_types, member::<SubType>, CardViolation::SubTypes)?,
            optional(&c.attack, integer, CardViolation::Attack)?,
            optional(&c.defense, integer, CardViolation::Defense)?,
        ),
    };

    Ok(NewCard {
        number,
        name,
        card_type,
        image,
        attribute,
        sub_types,
        level,
        attack,
        defense,
        description,
    })
}

/// Check an update body field by field; absent fields stay untouched.
pub fn validate_patch(c: &CardCandidate) -> Result<CardPatch, CardViolation> {
    Ok(CardPatch {
        name: optional(&c.name, non_empty_text, CardViolation::Name)?,
        card_type: optional(&c.card_type, member, CardViolation::Type)?,
        image: optional(&c.image, non_empty_text, CardViolation::Image)?,
        attribute: optional(&c.attribute, member, CardViolation::Attribute)?,
        description: optional(&c.description, non_empty_text, CardViolation::Description)?,
        // the catalog format depends on the merged type, see check_monster_complete
        number: optional(&c.number, non_empty_text, CardViolation::Number)?,
        level: optional(&c.level, level, CardViolation::Level)?,
        sub_types: optional(&c.sub_types, member, CardViolation::SubTypes)?,
        attack: optional(&c.attack, integer, CardViolation::Attack)?,
        defense: optional(&c.defense, integer, CardViolation::Defense)?,
    })
}

/// A Monster must end up with a well-formed number (if any), level, sub-type,
/// attack and defense.
pub fn check_monster_complete(card: &Card) -> Result<(), CardViolation> {
    if card.card_type != CardType::Monster {
        return Ok(());
    }
    if let Some(number) = &card.number {
        if !number_format().is_match(number) {
            return Err(CardViolation::Number);
        }
    }
    if card.level.is_none() {
        return Err(CardViolation::Level);
    }
    if card.sub_types.is_none() {
        return Err(CardViolation::SubTypes);
    }
    if card.attack.is_none() {
        return Err(CardViolation::Attack);
    }
    if card.defense.is_none() {
        return Err(CardViolation::Defense);
    }
    Ok(())
}
