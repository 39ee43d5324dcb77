//! Derived statistics: everything the views show that is not stored
//! verbatim in the document.

use super::{Ability, Character, Item};

/// Skills with the ability they key off, in alphabetical order.
pub const SKILLS: [(&str, Ability); 18] = [
    ("acrobatics", Ability::Dexterity),
    ("animal-handling", Ability::Wisdom),
    ("arcana", Ability::Intelligence),
    ("athletics", Ability::Strength),
    ("deception", Ability::Charisma),
    ("history", Ability::Intelligence),
    ("insight", Ability::Wisdom),
    ("intimidation", Ability::Charisma),
    ("investigation", Ability::Intelligence),
    ("medicine", Ability::Wisdom),
    ("nature", Ability::Intelligence),
    ("perception", Ability::Wisdom),
    ("performance", Ability::Charisma),
    ("persuasion", Ability::Charisma),
    ("religion", Ability::Intelligence),
    ("sleight-of-hand", Ability::Dexterity),
    ("stealth", Ability::Dexterity),
    ("survival", Ability::Wisdom),
];

const CASTERS: [(&str, Ability); 9] = [
    ("Wizard", Ability::Intelligence),
    ("Artificer", Ability::Intelligence),
    ("Cleric", Ability::Wisdom),
    ("Druid", Ability::Wisdom),
    ("Ranger", Ability::Wisdom),
    ("Bard", Ability::Charisma),
    ("Paladin", Ability::Charisma),
    ("Sorcerer", Ability::Charisma),
    ("Warlock", Ability::Charisma),
];

const ARMOR_LIGHT: i64 = 1;
const ARMOR_MEDIUM: i64 = 2;
const ARMOR_HEAVY: i64 = 3;
const ARMOR_SHIELD: i64 = 4;

const DEFAULT_SCORE: i64 = 10;
const DEFAULT_SPEED: i64 = 30;

/// Standard 5e ability modifier: floor((score - 10) / 2).
pub fn ability_modifier(score: i64) -> i64 {
    score.saturating_sub(10).div_euclid(2)
}

/// Sum that clamps at the `i64` bounds instead of overflowing. Numbers come
/// straight from downloaded documents.
pub(crate) fn saturating_sum(values: impl IntoIterator<Item = i64>) -> i64 {
    values.into_iter().fold(0, i64::saturating_add)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbilityScore {
    pub ability: Ability,
    pub total: i64,
    pub modifier: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavingThrow {
    pub ability: Ability,
    pub bonus: i64,
    pub proficient: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Proficiency {
    None,
    Half,
    Full,
    Expertise,
}

impl Proficiency {
    pub fn marker(&self) -> &'static str {
        match self {
            Proficiency::None => "",
            Proficiency::Half => "½",
            Proficiency::Full => "*",
            Proficiency::Expertise => "**",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillScore {
    pub skill: &'static str,
    pub ability: Ability,
    pub bonus: i64,
    pub proficiency: Proficiency,
}

impl SkillScore {
    /// "sleight-of-hand" -> "Sleight Of Hand"
    pub fn display_name(&self) -> String {
        self.skill
            .split('-')
            .map(|w| {
                let mut c = w.chars();
                match c.next() {
                    Some(first) => first.to_uppercase().chain(c).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spellcasting {
    pub ability: Ability,
    pub modifier: i64,
    pub attack: i64,
    pub save_dc: i64,
}

/// Derived sheet for one character.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub abilities: [AbilityScore; 6],
    pub total_level: i64,
    pub proficiency_bonus: i64,
    pub saves: [SavingThrow; 6],
    pub skills: Vec<SkillScore>,
    pub max_hp: i64,
    pub current_hp: i64,
    pub temp_hp: i64,
    pub armor_class: i64,
    pub speed: i64,
    pub initiative: i64,
    pub spellcasting: Option<Spellcasting>,
}

impl Sheet {
    pub fn new(c: &Character) -> Self {
        let abilities = Ability::ALL.map(|a| ability_score(c, a));
        let modifier = |a: Ability| abilities[index(a)].modifier;

        let total_level = c.total_level();
        let proficiency_bonus = 2 + (total_level.max(1) - 1) / 4;

        let saves = Ability::ALL.map(|a| {
            let sub = format!("{}-saving-throws", a.slug());
            let proficient = c.all_modifiers().any(|m| m.is("proficiency", &sub));
            SavingThrow {
                ability: a,
                bonus: modifier(a).saturating_add(if proficient { proficiency_bonus } else { 0 }),
                proficient,
            }
        });

        let skills = SKILLS
            .iter()
            .map(|&(skill, ability)| {
                let proficiency = skill_proficiency(c, skill);
                let bonus = modifier(ability).saturating_add(match proficiency {
                    Proficiency::None => 0,
                    Proficiency::Half => proficiency_bonus / 2,
                    Proficiency::Full => proficiency_bonus,
                    Proficiency::Expertise => proficiency_bonus.saturating_mul(2),
                });
                SkillScore {
                    skill,
                    ability,
                    bonus,
                    proficiency,
                }
            })
            .collect();

        let max_hp = c.override_hit_points.unwrap_or_else(|| {
            saturating_sum([
                c.base_hit_points.unwrap_or(0),
                c.bonus_hit_points.unwrap_or(0),
                modifier(Ability::Constitution).saturating_mul(total_level),
            ])
        });
        let current_hp = max_hp.saturating_sub(c.removed_hit_points.unwrap_or(0));
        let dex_mod = modifier(Ability::Dexterity);

        let speed = c
            .race
            .as_ref()
            .and_then(|r| r.weight_speeds.as_ref())
            .and_then(|w| w.normal.as_ref())
            .and_then(|n| n.walk)
            .unwrap_or(DEFAULT_SPEED);

        let spellcasting = c
            .classes
            .iter()
            .filter_map(|cls| cls.name())
            .find_map(|name| CASTERS.iter().find(|(n, _)| *n == name))
            .map(|&(_, ability)| {
                let m = modifier(ability);
                Spellcasting {
                    ability,
                    modifier: m,
                    attack: m.saturating_add(proficiency_bonus),
                    save_dc: saturating_sum([8, m, proficiency_bonus]),
                }
            });

        Sheet {
            abilities,
            total_level,
            proficiency_bonus,
            saves,
            skills,
            max_hp,
            current_hp,
            temp_hp: c.temporary_hit_points.unwrap_or(0),
            armor_class: armor_class(c, dex_mod),
            speed,
            initiative: dex_mod,
            spellcasting,
        }
    }

    pub fn ability(&self, a: Ability) -> &AbilityScore {
        &self.abilities[index(a)]
    }

    pub fn save(&self, a: Ability) -> &SavingThrow {
        &self.saves[index(a)]
    }
}

fn index(a: Ability) -> usize {
    (a.stat_id() - 1) as usize
}

fn ability_score(c: &Character, ability: Ability) -> AbilityScore {
    let id = ability.stat_id();
    let base_entry = c.stats.iter().find(|s| s.id == Some(id));
    let base = base_entry.and_then(|s| s.value).unwrap_or(DEFAULT_SCORE);

    let bonus_stat = saturating_sum(
        c.bonus_stats
            .iter()
            .filter(|s| s.id == Some(id))
            .filter_map(|s| s.value),
    );
    let score_sub = format!("{}-score", ability.slug());
    let bonus_mods = saturating_sum(
        c.all_modifiers()
            .filter(|m| m.is("bonus", &score_sub))
            .map(|m| m.value.unwrap_or(0)),
    );

    let override_entry = c
        .override_stats
        .iter()
        .find(|s| s.id == Some(id) && (s.value.is_some() || s.modifier.is_some()));
    let total = override_entry
        .and_then(|s| s.value)
        .unwrap_or_else(|| saturating_sum([base, bonus_stat, bonus_mods]));

    let precomputed = override_entry
        .and_then(|s| s.modifier)
        .or_else(|| base_entry.and_then(|s| s.modifier));

    AbilityScore {
        ability,
        total,
        modifier: precomputed.unwrap_or_else(|| ability_modifier(total)),
    }
}

fn skill_proficiency(c: &Character, skill: &str) -> Proficiency {
    c.all_modifiers()
        .filter(|m| m.sub_type.as_deref() == Some(skill))
        .map(|m| match m.kind.as_deref() {
            Some("expertise") => Proficiency::Expertise,
            Some("proficiency") => Proficiency::Full,
            Some("half-proficiency") => Proficiency::Half,
            _ => Proficiency::None,
        })
        .max()
        .unwrap_or(Proficiency::None)
}

fn armor_bonus(item: &Item) -> i64 {
    saturating_sum(
        item.definition
            .iter()
            .flat_map(|d| &d.granted_modifiers)
            .filter(|m| m.is("bonus", "armor-class"))
            .map(|m| m.amount()),
    )
}

fn armor_class(c: &Character, dex_mod: i64) -> i64 {
    let mut base = 10;
    let mut dex_cap: Option<i64> = None;
    let mut shield = 0;
    let mut other: i64 = 0;

    for item in c.inventory.iter().filter(|i| i.is_equipped()) {
        let Some(def) = item.definition.as_ref() else {
            continue;
        };
        let item_ac = def.armor_class.unwrap_or(0);
        match def.armor_type_id {
            Some(ARMOR_SHIELD) => shield = item_ac.saturating_add(armor_bonus(item)),
            Some(kind @ (ARMOR_LIGHT | ARMOR_MEDIUM | ARMOR_HEAVY)) => {
                base = item_ac;
                dex_cap = match kind {
                    ARMOR_MEDIUM => Some(2),
                    ARMOR_HEAVY => Some(0),
                    _ => None,
                };
                other = other.saturating_add(armor_bonus(item));
            }
            _ => {}
        }
    }

    // Item-granted bonuses were counted from the equipped items above.
    other = other.saturating_add(saturating_sum(
        c.modifiers_except("item")
            .filter(|m| m.is("bonus", "armor-class"))
            .map(|m| m.value.unwrap_or(0)),
    ));

    let dex = dex_cap.map_or(dex_mod, |cap| dex_mod.min(cap));
    saturating_sum([base, dex, shield, other])
}
