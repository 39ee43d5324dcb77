//! Text views over a character. Each view is rendered into a `String`; the
//! CLI decides where it goes.

use crate::character::{Ability, Character, Feature, Sheet};
use regex::Regex;
use std::collections::HashSet;
use std::fmt::{self, Write};
use std::sync::OnceLock;

const RULE_WIDTH: usize = 55;
const SNIPPET_LEN: usize = 100;

/// The closed set of views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Sheet,
    Overview,
    Spells,
    Features,
    Inventory,
    Summary,
}

impl View {
    pub const ALL: [View; 6] = [
        View::Sheet,
        View::Overview,
        View::Spells,
        View::Features,
        View::Inventory,
        View::Summary,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            View::Sheet => "sheet",
            View::Overview => "overview",
            View::Spells => "spells",
            View::Features => "features",
            View::Inventory => "inventory",
            View::Summary => "summary",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Render one view of a character.
pub fn render(view: View, c: &Character) -> String {
    let sheet = Sheet::new(c);
    let mut out = String::new();
    let written = match view {
        View::Sheet => write_sheet(&mut out, c, &sheet),
        View::Overview => write_overview(&mut out, c, &sheet),
        View::Spells => write_spells(&mut out, c, &sheet),
        View::Features => write_features(&mut out, c),
        View::Inventory => write_inventory(&mut out, c),
        View::Summary => write_summary(&mut out, c, &sheet),
    };
    if let Err(err) = written {
        tracing::warn!("rendering {} view of {} stopped early: {}", view, c.display_name(), err);
    }
    out
}

fn signed(n: i64) -> String {
    format!("{:+}", n)
}

fn rule(ch: char) -> String {
    std::iter::repeat(ch).take(RULE_WIDTH).collect()
}

fn section(out: &mut String, title: &str) -> fmt::Result {
    writeln!(out, "\n{}", title)?;
    writeln!(out, "{}", rule('─'))
}

fn hp_line(sheet: &Sheet) -> String {
    let mut hp = format!("{}/{}", sheet.current_hp, sheet.max_hp);
    if sheet.temp_hp != 0 {
        write!(hp, " (+{} temp)", sheet.temp_hp).ok();
    }
    hp
}

fn spellcasting_line(sheet: &Sheet) -> Option<String> {
    sheet.spellcasting.map(|sc| {
        format!(
            "Spellcasting: {} | Attack {} | DC {}",
            sc.ability.abbreviation(),
            signed(sc.attack),
            sc.save_dc
        )
    })
}

fn write_overview(out: &mut String, c: &Character, sheet: &Sheet) -> fmt::Result {
    let classes = c.class_line();
    if classes.is_empty() {
        writeln!(out, "{} - {}", c.display_name(), c.race_name())?;
    } else {
        writeln!(out, "{} - {} {}", c.display_name(), c.race_name(), classes)?;
    }
    writeln!(
        out,
        "Level {} | HP: {} | AC: {} | Initiative: {} | Speed: {} ft | Proficiency: {}",
        sheet.total_level,
        hp_line(sheet),
        sheet.armor_class,
        signed(sheet.initiative),
        sheet.speed,
        signed(sheet.proficiency_bonus)
    )?;
    writeln!(out)?;

    let abilities: Vec<String> = sheet
        .abilities
        .iter()
        .map(|a| format!("{} {} ({})", a.ability.abbreviation(), a.total, signed(a.modifier)))
        .collect();
    writeln!(out, "Abilities: {}", abilities.join("  "))?;

    let saves: Vec<String> = sheet
        .saves
        .iter()
        .filter(|s| s.proficient)
        .map(|s| format!("{} {}", s.ability.abbreviation(), signed(s.bonus)))
        .collect();
    if !saves.is_empty() {
        writeln!(out, "Saving throws: {}", saves.join(", "))?;
    }

    if let Some(line) = spellcasting_line(sheet) {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

fn write_summary(out: &mut String, c: &Character, sheet: &Sheet) -> fmt::Result {
    let mut who = format!("Level {} {}", sheet.total_level, c.base_race_name());
    let classes = c.class_names();
    if !classes.is_empty() {
        who.push(' ');
        who.push_str(&classes);
    }
    writeln!(
        out,
        "{}: {} | HP {} | AC {}",
        c.display_name(),
        who,
        hp_line(sheet),
        sheet.armor_class
    )
}

struct SpellLine<'a> {
    name: &'a str,
    level: i64,
    marker: Option<&'static str>,
}

fn collect_spells(c: &Character) -> Vec<SpellLine<'_>> {
    let sources = c.spells.iter().flat_map(|s| {
        s.class
            .iter()
            .chain(s.race.iter())
            .chain(s.feat.iter())
            .chain(s.item.iter())
    });
    let entries = c
        .class_spells
        .iter()
        .flat_map(|cs| cs.spells.iter())
        .chain(sources);

    let mut seen = HashSet::new();
    let mut spells: Vec<SpellLine<'_>> = entries
        .filter_map(|e| {
            let def = e.definition.as_ref()?;
            let name = def.name.as_deref().unwrap_or("Unknown");
            if !seen.insert(name) {
                return None;
            }
            let marker = if e.always_prepared.unwrap_or(false) {
                Some("always")
            } else if e.prepared.unwrap_or(false) {
                Some("prepared")
            } else {
                None
            };
            Some(SpellLine {
                name,
                level: def.level.unwrap_or(0).max(0),
                marker,
            })
        })
        .collect();
    spells.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.name.cmp(b.name)));
    spells
}

fn write_spell_list(out: &mut String, c: &Character) -> fmt::Result {
    let spells = collect_spells(c);
    if spells.is_empty() {
        return writeln!(out, "No spells.");
    }
    let mut current = None;
    for spell in &spells {
        if current != Some(spell.level) {
            current = Some(spell.level);
            if spell.level == 0 {
                writeln!(out, "\nCantrips:")?;
            } else {
                writeln!(out, "\nLevel {}:", spell.level)?;
            }
        }
        match spell.marker {
            Some(m) => writeln!(out, "  - {} ({})", spell.name, m)?,
            None => writeln!(out, "  - {}", spell.name)?,
        }
    }
    Ok(())
}

fn write_spells(out: &mut String, c: &Character, sheet: &Sheet) -> fmt::Result {
    writeln!(out, "{}'s Spells", c.display_name())?;
    if let Some(line) = spellcasting_line(sheet) {
        writeln!(out, "{}", line)?;
    }
    write_spell_list(out, c)
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"))
}

/// First `SNIPPET_LEN` characters of a description, without markup.
pub fn short_description(raw: &str) -> String {
    let text = tag_re().replace_all(raw, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&rsquo;", "'")
        .replace("&lsquo;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() <= SNIPPET_LEN {
        return text;
    }
    let cut: String = text.chars().take(SNIPPET_LEN).collect();
    format!("{}...", cut.trim_end())
}

fn feature_line(f: &Feature) -> Option<String> {
    let def = f.definition.as_ref()?;
    let name = def.name.as_deref()?.trim();
    if name.is_empty() {
        return None;
    }
    let desc = def
        .snippet
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .or(def.description.as_deref())
        .map(short_description)
        .filter(|s| !s.is_empty());
    Some(match desc {
        Some(d) => format!("{}: {}", name, d),
        None => name.to_string(),
    })
}

fn feature_lines<'a>(features: impl Iterator<Item = &'a Feature>) -> Vec<String> {
    let mut seen = HashSet::new();
    features
        .filter_map(|f| {
            let name = f.definition.as_ref()?.name.clone()?;
            seen.insert(name).then(|| feature_line(f)).flatten()
        })
        .collect()
}

fn modifier_names(c: &Character, category: &str) -> Vec<String> {
    let mut names: Vec<String> = c
        .modifiers
        .get(category)
        .into_iter()
        .flatten()
        .filter_map(|m| m.friendly_type_name.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    names.sort();
    names
}

fn bullets(out: &mut String, lines: &[String]) -> fmt::Result {
    for line in lines {
        writeln!(out, "  - {}", line)?;
    }
    Ok(())
}

fn write_feature_list(out: &mut String, c: &Character) -> fmt::Result {
    let mut race = feature_lines(c.race.iter().flat_map(|r| r.racial_traits.iter()));
    if race.is_empty() {
        race = modifier_names(c, "race");
    }
    if !race.is_empty() {
        writeln!(out, "Race Features:")?;
        bullets(out, &race)?;
        writeln!(out)?;
    }

    let mut any_class_features = false;
    for cls in &c.classes {
        let level = cls.level.unwrap_or(0);
        write!(out, "{} {}", cls.name().unwrap_or("Unknown"), level)?;
        if let Some(sub) = cls.subclass_name() {
            write!(out, " ({})", sub)?;
        }
        writeln!(out, ":")?;
        let lines = feature_lines(cls.class_features.iter().filter(|f| {
            f.definition
                .as_ref()
                .and_then(|d| d.required_level)
                .map_or(true, |req| req <= level)
        }));
        any_class_features |= !lines.is_empty();
        bullets(out, &lines)?;
        writeln!(out)?;
    }
    if !any_class_features {
        let fallback = modifier_names(c, "class");
        if !fallback.is_empty() {
            writeln!(out, "Class Features:")?;
            bullets(out, &fallback)?;
            writeln!(out)?;
        }
    }

    let mut feats = feature_lines(c.feats.iter());
    if feats.is_empty() {
        feats = modifier_names(c, "feat");
    }
    if !feats.is_empty() {
        writeln!(out, "Feats:")?;
        bullets(out, &feats)?;
    }
    Ok(())
}

fn write_features(out: &mut String, c: &Character) -> fmt::Result {
    writeln!(out, "{}'s Features\n", c.display_name())?;
    write_feature_list(out, c)
}

fn write_inventory_list(out: &mut String, c: &Character) -> fmt::Result {
    let mut equipped = Vec::new();
    let mut carried = Vec::new();
    let mut weight = 0.0;
    for item in &c.inventory {
        let qty = item.quantity();
        let entry = if qty > 1 {
            format!("{} (x{})", item.name(), qty)
        } else {
            item.name().to_string()
        };
        if item.is_equipped() {
            equipped.push(entry);
        } else {
            carried.push(entry);
        }
        if let Some(w) = item.definition.as_ref().and_then(|d| d.weight) {
            weight += w * qty.max(0) as f64;
        }
    }
    equipped.sort();
    carried.sort();

    if equipped.is_empty() && carried.is_empty() {
        writeln!(out, "No items.")?;
    }
    if !equipped.is_empty() {
        writeln!(out, "Equipped:")?;
        bullets(out, &equipped)?;
    }
    if !carried.is_empty() {
        if !equipped.is_empty() {
            writeln!(out)?;
        }
        writeln!(out, "Carried:")?;
        bullets(out, &carried)?;
    }
    if weight > 0.0 {
        writeln!(out, "\nTotal weight: {} lb", (weight * 100.0).round() / 100.0)?;
    }

    let coins: Vec<String> = c
        .currencies
        .iter()
        .flat_map(|cur| cur.denominations())
        .filter(|(_, v)| *v > 0)
        .map(|(d, v)| format!("{} {}", v, d))
        .collect();
    if !coins.is_empty() {
        writeln!(out, "\nCurrency: {}", coins.join(", "))?;
    }
    Ok(())
}

fn write_inventory(out: &mut String, c: &Character) -> fmt::Result {
    writeln!(out, "{}'s Inventory\n", c.display_name())?;
    write_inventory_list(out, c)
}

fn write_sheet(out: &mut String, c: &Character, sheet: &Sheet) -> fmt::Result {
    writeln!(out, "{}", rule('═'))?;
    writeln!(out, "  {}", c.display_name().to_uppercase())?;
    let classes = c.class_line();
    if classes.is_empty() {
        writeln!(out, "  {}", c.race_name())?;
    } else {
        writeln!(out, "  {} | {}", c.race_name(), classes)?;
    }
    if let Some(player) = c.player.as_deref() {
        writeln!(out, "  Player: {}", player)?;
    }
    writeln!(out, "{}", rule('═'))?;

    section(out, "ABILITY SCORES")?;
    let (mut names, mut scores, mut mods) = (String::from("  "), String::from("  "), String::from("  "));
    for a in &sheet.abilities {
        write!(names, "{:^7} ", a.ability.abbreviation())?;
        write!(scores, "{:^7} ", a.total)?;
        write!(mods, "{:^7} ", format!("({})", signed(a.modifier)))?;
    }
    writeln!(out, "{}", names.trim_end())?;
    writeln!(out, "{}", scores.trim_end())?;
    writeln!(out, "{}", mods.trim_end())?;

    section(out, "COMBAT")?;
    writeln!(
        out,
        "  AC: {}    HP: {}    Speed: {} ft",
        sheet.armor_class,
        hp_line(sheet),
        sheet.speed
    )?;
    writeln!(
        out,
        "  Initiative: {}    Proficiency Bonus: {}",
        signed(sheet.initiative),
        signed(sheet.proficiency_bonus)
    )?;

    section(out, "SAVING THROWS")?;
    let saves: Vec<String> = Ability::ALL
        .iter()
        .map(|&a| {
            let s = sheet.save(a);
            let marker = if s.proficient { "*" } else { "" };
            format!("{}: {}{}", a.abbreviation(), signed(s.bonus), marker)
        })
        .collect();
    for row in saves.chunks(3) {
        let cells: Vec<String> = row.iter().map(|s| format!("{:12}", s)).collect();
        writeln!(out, "  {}", cells.join(" ").trim_end())?;
    }
    writeln!(out, "  (* = proficient)")?;

    section(out, "SKILLS")?;
    let skills: Vec<String> = sheet
        .skills
        .iter()
        .map(|s| format!("{}: {}{}", s.display_name(), signed(s.bonus), s.proficiency.marker()))
        .collect();
    let half = (skills.len() + 1) / 2;
    for i in 0..half {
        let left = &skills[i];
        match skills.get(i + half) {
            Some(right) => writeln!(out, "  {:26} {}", left, right)?,
            None => writeln!(out, "  {}", left)?,
        }
    }
    writeln!(out, "  (* = proficient, ** = expertise, ½ = half)")?;

    if let Some(sc) = sheet.spellcasting {
        section(out, "SPELLCASTING")?;
        writeln!(
            out,
            "  Spellcasting Ability: {} ({})",
            sc.ability.abbreviation(),
            signed(sc.modifier)
        )?;
        writeln!(out, "  Spell Attack: {}", signed(sc.attack))?;
        writeln!(out, "  Spell Save DC: {}", sc.save_dc)?;
    }

    section(out, "SPELLS")?;
    write_spell_list(out, c)?;

    section(out, "FEATURES")?;
    write_feature_list(out, c)?;

    section(out, "INVENTORY")?;
    write_inventory_list(out, c)?;

    writeln!(out, "\n{}", rule('═'))
}
