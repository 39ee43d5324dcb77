//! Typed, absent-safe view over a D&D Beyond character document.
//!
//! Only the parts the views read are modelled. Every field is optional or
//! defaulted and goes through the `lenient` deserializers, so a document from
//! an older or newer schema still loads.

mod lenient;
mod sheet;

pub use sheet::{
    ability_modifier, AbilityScore, Proficiency, SavingThrow, Sheet, SkillScore, Spellcasting,
    SKILLS,
};

use crate::error::SheetError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// The six abilities, in sheet order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub const ALL: [Ability; 6] = [
        Ability::Strength,
        Ability::Dexterity,
        Ability::Constitution,
        Ability::Intelligence,
        Ability::Wisdom,
        Ability::Charisma,
    ];

    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    /// Stat id used by the character service (1 = Strength .. 6 = Charisma).
    pub fn stat_id(&self) -> i64 {
        match self {
            Ability::Strength => 1,
            Ability::Dexterity => 2,
            Ability::Constitution => 3,
            Ability::Intelligence => 4,
            Ability::Wisdom => 5,
            Ability::Charisma => 6,
        }
    }

    /// Lowercase name as used in modifier sub-types (`strength-score`).
    pub fn slug(&self) -> &'static str {
        match self {
            Ability::Strength => "strength",
            Ability::Dexterity => "dexterity",
            Ability::Constitution => "constitution",
            Ability::Intelligence => "intelligence",
            Ability::Wisdom => "wisdom",
            Ability::Charisma => "charisma",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    #[serde(default, deserialize_with = "lenient::option")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub race: Option<Race>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub classes: Vec<ClassEntry>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub feats: Vec<Feature>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub stats: Vec<Stat>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub bonus_stats: Vec<Stat>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub override_stats: Vec<Stat>,
    /// Modifier lists keyed by source category (race, class, feat, item...).
    #[serde(default, deserialize_with = "lenient::map_of_vecs")]
    pub modifiers: BTreeMap<String, Vec<Modifier>>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub base_hit_points: Option<i64>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub bonus_hit_points: Option<i64>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub override_hit_points: Option<i64>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub removed_hit_points: Option<i64>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub temporary_hit_points: Option<i64>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub inventory: Vec<Item>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub currencies: Option<Currencies>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub class_spells: Vec<ClassSpells>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub spells: Option<SpellSources>,
    /// Player name added by the scraper.
    #[serde(rename = "_player", default, deserialize_with = "lenient::option")]
    pub player: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Race {
    #[serde(default, deserialize_with = "lenient::option")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub base_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub weight_speeds: Option<WeightSpeeds>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub racial_traits: Vec<Feature>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeightSpeeds {
    #[serde(default, deserialize_with = "lenient::option")]
    pub normal: Option<Speeds>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Speeds {
    #[serde(default, deserialize_with = "lenient::option")]
    pub walk: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassEntry {
    #[serde(default, deserialize_with = "lenient::option")]
    pub level: Option<i64>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub definition: Option<NamedDefinition>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub subclass_definition: Option<NamedDefinition>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub class_features: Vec<Feature>,
}

impl ClassEntry {
    pub fn name(&self) -> Option<&str> {
        self.definition.as_ref()?.name.as_deref()
    }

    pub fn subclass_name(&self) -> Option<&str> {
        self.subclass_definition.as_ref()?.name.as_deref()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedDefinition {
    #[serde(default, deserialize_with = "lenient::option")]
    pub name: Option<String>,
}

/// A racial trait, class feature or feat.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feature {
    #[serde(default, deserialize_with = "lenient::option")]
    pub definition: Option<FeatureDefinition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDefinition {
    #[serde(default, deserialize_with = "lenient::option")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub snippet: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub required_level: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Stat {
    #[serde(default, deserialize_with = "lenient::option")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub value: Option<i64>,
    /// Precomputed modifier, when the document carries one.
    #[serde(default, deserialize_with = "lenient::option")]
    pub modifier: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modifier {
    #[serde(rename = "type", default, deserialize_with = "lenient::option")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub sub_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub value: Option<i64>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub fixed_value: Option<i64>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub friendly_type_name: Option<String>,
}

impl Modifier {
    pub fn is(&self, kind: &str, sub_type: &str) -> bool {
        self.kind.as_deref() == Some(kind) && self.sub_type.as_deref() == Some(sub_type)
    }

    /// `value`, falling back to `fixedValue`, then 0.
    pub fn amount(&self) -> i64 {
        self.value.or(self.fixed_value).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Item {
    #[serde(default, deserialize_with = "lenient::option")]
    pub equipped: Option<bool>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub definition: Option<ItemDefinition>,
}

impl Item {
    pub fn is_equipped(&self) -> bool {
        self.equipped.unwrap_or(false)
    }

    pub fn quantity(&self) -> i64 {
        self.quantity.unwrap_or(1)
    }

    pub fn name(&self) -> &str {
        self.definition
            .as_ref()
            .and_then(|d| d.name.as_deref())
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDefinition {
    #[serde(default, deserialize_with = "lenient::option")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub armor_type_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub armor_class: Option<i64>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub granted_modifiers: Vec<Modifier>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Currencies {
    #[serde(default, deserialize_with = "lenient::option")]
    pub pp: Option<i64>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub gp: Option<i64>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub ep: Option<i64>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub sp: Option<i64>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub cp: Option<i64>,
}

impl Currencies {
    /// Denominations from most to least valuable.
    pub fn denominations(&self) -> [(&'static str, i64); 5] {
        [
            ("pp", self.pp.unwrap_or(0)),
            ("gp", self.gp.unwrap_or(0)),
            ("ep", self.ep.unwrap_or(0)),
            ("sp", self.sp.unwrap_or(0)),
            ("cp", self.cp.unwrap_or(0)),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassSpells {
    #[serde(default, deserialize_with = "lenient::vec")]
    pub spells: Vec<SpellEntry>,
}

/// The top-level `spells` object, keyed by where the spell comes from.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpellSources {
    #[serde(default, deserialize_with = "lenient::vec")]
    pub class: Vec<SpellEntry>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub race: Vec<SpellEntry>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub feat: Vec<SpellEntry>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub item: Vec<SpellEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellEntry {
    #[serde(default, deserialize_with = "lenient::option")]
    pub prepared: Option<bool>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub always_prepared: Option<bool>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub definition: Option<SpellDefinition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpellDefinition {
    #[serde(default, deserialize_with = "lenient::option")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub level: Option<i64>,
}

impl Character {
    /// Load and parse a character file.
    pub fn from_path(path: &Path) -> Result<Self, SheetError> {
        let text = std::fs::read_to_string(path).map_err(|source| SheetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SheetError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }

    /// Full race name ("Hill Dwarf"), falling back to the base name.
    pub fn race_name(&self) -> &str {
        self.race
            .as_ref()
            .and_then(|r| r.full_name.as_deref().or(r.base_name.as_deref()))
            .unwrap_or("Unknown")
    }

    /// Base race name ("Dwarf"), falling back to the full name.
    pub fn base_race_name(&self) -> &str {
        self.race
            .as_ref()
            .and_then(|r| r.base_name.as_deref().or(r.full_name.as_deref()))
            .unwrap_or("Unknown")
    }

    /// "Wizard 5, Fighter 1"
    pub fn class_line(&self) -> String {
        self.classes
            .iter()
            .map(|c| format!("{} {}", c.name().unwrap_or("Unknown"), c.level.unwrap_or(0)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// "Wizard/Fighter"
    pub fn class_names(&self) -> String {
        self.classes
            .iter()
            .map(|c| c.name().unwrap_or("Unknown"))
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn total_level(&self) -> i64 {
        sheet::saturating_sum(self.classes.iter().map(|c| c.level.unwrap_or(0).max(0)))
    }

    /// All modifiers across every category.
    pub fn all_modifiers(&self) -> impl Iterator<Item = &Modifier> {
        self.modifiers.values().flatten()
    }

    /// Modifiers outside the given category.
    pub fn modifiers_except<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Modifier> {
        self.modifiers
            .iter()
            .filter(move |(k, _)| k.as_str() != category)
            .flat_map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_document_loads() {
        let c: Character = serde_json::from_value(json!({})).unwrap();
        assert_eq!(c.display_name(), "Unknown");
        assert_eq!(c.race_name(), "Unknown");
        assert_eq!(c.class_line(), "");
        assert_eq!(c.total_level(), 0);
    }

    #[test]
    fn camel_case_fields_are_read() {
        let c: Character = serde_json::from_value(json!({
            "name": "Trigger",
            "race": {"fullName": "Rock Gnome", "baseName": "Gnome",
                     "weightSpeeds": {"normal": {"walk": 25}}},
            "classes": [
                {"level": 5, "definition": {"name": "Wizard"},
                 "subclassDefinition": {"name": "School of Evocation"}},
                {"level": 1, "definition": {"name": "Fighter"}, "subclassDefinition": null}
            ],
            "baseHitPoints": 27,
            "removedHitPoints": 4,
            "_player": "alice"
        }))
        .unwrap();
        assert_eq!(c.race_name(), "Rock Gnome");
        assert_eq!(c.base_race_name(), "Gnome");
        assert_eq!(c.class_line(), "Wizard 5, Fighter 1");
        assert_eq!(c.class_names(), "Wizard/Fighter");
        assert_eq!(c.total_level(), 6);
        assert_eq!(c.classes[0].subclass_name(), Some("School of Evocation"));
        assert_eq!(c.classes[1].subclass_name(), None);
        assert_eq!(c.base_hit_points, Some(27));
        assert_eq!(c.player.as_deref(), Some("alice"));
    }

    #[test]
    fn odd_shapes_do_not_fail_the_document() {
        let c: Character = serde_json::from_value(json!({
            "name": "Odd",
            "race": "not an object",
            "classes": {"oops": true},
            "stats": [{"id": 1, "value": "eight"}, {"id": 2, "value": 14}],
            "modifiers": {"race": null, "class": [{"type": "bonus", "subType": "armor-class", "value": 1}]},
            "currencies": [],
            "spells": {"class": null, "race": [{"definition": {"name": "Light", "level": 0}}]}
        }))
        .unwrap();
        assert_eq!(c.display_name(), "Odd");
        assert!(c.race.is_none());
        assert!(c.classes.is_empty());
        assert_eq!(c.stats[0].value, None);
        assert_eq!(c.stats[1].value, Some(14));
        assert_eq!(c.all_modifiers().count(), 1);
        assert!(c.currencies.is_none());
        assert_eq!(c.spells.unwrap().race.len(), 1);
    }

    #[test]
    fn modifier_amount_prefers_value() {
        let m = Modifier {
            value: None,
            fixed_value: Some(2),
            ..Default::default()
        };
        assert_eq!(m.amount(), 2);
        let m = Modifier {
            value: Some(1),
            fixed_value: Some(2),
            ..Default::default()
        };
        assert_eq!(m.amount(), 1);
    }

    #[test]
    fn item_defaults() {
        let item: Item = serde_json::from_value(json!({"definition": {"name": "Rope"}})).unwrap();
        assert_eq!(item.name(), "Rope");
        assert_eq!(item.quantity(), 1);
        assert!(!item.is_equipped());
    }
}
