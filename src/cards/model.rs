use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Closed, case-sensitive text enumeration stored as TEXT.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => anyhow::bail!("unknown {} {:?}", stringify!($name), other),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(
    CardType {
        Monster => "Monster",
        Spell => "Spell",
        Trap => "Trap",
    }
);

text_enum!(
    Attribute {
        Dark => "Dark",
        Light => "Light",
        Earth => "Earth",
        Water => "Water",
        Fire => "Fire",
        Wind => "Wind",
        Divine => "Divine",
    }
);

text_enum!(
    /// Monster sub-type; only meaningful when the card type is Monster.
    SubType {
        Normal => "Normal",
        Ritual => "Ritual",
        Effect => "Effect",
        Xyz => "XYZ",
        Toon => "Toon",
        Fusion => "Fusion",
        Synchro => "Synchro",
    }
);

/// Card as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub number: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub image: String,
    pub attribute: Attribute,
    pub sub_types: Option<SubType>,
    pub level: Option<i32>,
    pub attack: Option<i32>,
    pub defense: Option<i32>,
    pub description: String,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Card {
    /// Overlay the fields present in `patch`.
    pub fn patched(mut self, patch: &CardPatch) -> Self {
        if let Some(v) = &patch.number {
            self.number = Some(v.clone());
        }
        if let Some(v) = &patch.name {
            self.name = v.clone();
        }
        if let Some(v) = patch.card_type {
            self.card_type = v;
        }
        if let Some(v) = &patch.image {
            self.image = v.clone();
        }
        if let Some(v) = patch.attribute {
            self.attribute = v;
        }
        if let Some(v) = patch.sub_types {
            self.sub_types = Some(v);
        }
        if let Some(v) = patch.level {
            self.level = Some(v);
        }
        if let Some(v) = patch.attack {
            self.attack = Some(v);
        }
        if let Some(v) = patch.defense {
            self.defense = Some(v);
        }
        if let Some(v) = &patch.description {
            self.description = v.clone();
        }
        self
    }
}

/// Raw `cards` row; enumerations come back as text.
#[derive(Debug, Clone, FromRow)]
pub struct CardRow {
    pub id: Uuid,
    pub number: Option<String>,
    pub name: String,
    pub card_type: String,
    pub image: String,
    pub attribute: String,
    pub sub_types: Option<String>,
    pub level: Option<i32>,
    pub attack: Option<i32>,
    pub defense: Option<i32>,
    pub description: String,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<CardRow> for Card {
    type Error = anyhow::Error;

    fn try_from(r: CardRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            number: r.number,
            name: r.name,
            card_type: r.card_type.parse()?,
            image: r.image,
            attribute: r.attribute.parse()?,
            sub_types: r.sub_types.as_deref().map(str::parse).transpose()?,
            level: r.level,
            attack: r.attack,
            defense: r.defense,
            description: r.description,
            user_id: r.user_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// A validated card ready to be stored; the owner is supplied separately.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCard {
    pub number: Option<String>,
    pub name: String,
    pub card_type: CardType,
    pub image: String,
    pub attribute: Attribute,
    pub sub_types: Option<SubType>,
    pub level: Option<i32>,
    pub attack: Option<i32>,
    pub defense: Option<i32>,
    pub description: String,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardPatch {
    pub number: Option<String>,
    pub name: Option<String>,
    pub card_type: Option<CardType>,
    pub image: Option<String>,
    pub attribute: Option<Attribute>,
    pub sub_types: Option<SubType>,
    pub level: Option<i32>,
    pub attack: Option<i32>,
    pub defense: Option<i32>,
    pub description: Option<String>,
}
