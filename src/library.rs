//! Discovery of downloaded character files.
//!
//! A campaign is a directory directly under the base directory. Both
//! `<base>/<campaign>/characters/*.json` (what the scraper writes) and the
//! flatter `<base>/<campaign>/*.json` are recognised.

use crate::character::Character;
use crate::error::LookupError;
use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Campaign label for files sitting directly in the base directory.
pub const NO_CAMPAIGN: &str = "-";

/// A discovered character file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterFile {
    pub path: PathBuf,
    /// Path relative to the base directory, `/`-separated.
    pub relative: String,
    /// File name without `.json`.
    pub stem: String,
    pub campaign: String,
}

/// One row of the `list` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterEntry {
    pub campaign: String,
    pub name: String,
    pub path: PathBuf,
}

fn is_combined_dump(name: &str) -> bool {
    name.starts_with("campaign_")
}

/// Every character file under `base`, ordered by relative path.
pub fn discover(base: &Path) -> Result<Vec<CharacterFile>, LookupError> {
    if !base.is_dir() {
        return Err(LookupError::MissingDirectory(base.to_path_buf()));
    }

    let mut files: Vec<CharacterFile> = WalkDir::new(base)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!("skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .filter_map(|e| character_file(base, e.path()))
        .filter(|f| !is_combined_dump(&f.stem))
        .collect();

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    tracing::debug!("discovered {} character files under {}", files.len(), base.display());
    Ok(files)
}

fn character_file(base: &Path, path: &Path) -> Option<CharacterFile> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    let stem = path.file_stem()?.to_string_lossy().into_owned();
    let campaign = if parts.len() > 1 {
        parts[0].clone()
    } else {
        NO_CAMPAIGN.to_string()
    };
    Some(CharacterFile {
        path: path.to_path_buf(),
        relative: parts.join("/"),
        stem,
        campaign,
    })
}

/// Resolve a name fragment to exactly one character file.
///
/// The fragment is matched case-insensitively against file stems, with
/// spaces and underscores treated alike so `grimgor ironhide` finds
/// `Grimgor_Ironhide_1001.json`. A fragment containing `/` is matched
/// against the relative path and against `<campaign>/<stem>` instead, which
/// lets a caller disambiguate by campaign (`bkb-primary/grim`). A path fragment naming one `<campaign>/<stem>`
/// exactly resolves to that file, so the qualified names offered in an
/// ambiguity error always work as queries.
pub fn locate(base: &Path, query: &str) -> Result<CharacterFile, LookupError> {
    let files = discover(base)?;
    let needle = fold(query.trim());
    let by_path = needle.contains('/');

    let mut matches: Vec<CharacterFile> = files
        .iter()
        .filter(|f| {
            if by_path {
                fold(&f.relative).contains(&needle) || qualified(f).contains(&needle)
            } else {
                fold(&f.stem).contains(&needle)
            }
        })
        .cloned()
        .collect();

    if by_path && matches.len() > 1 {
        if let Some(i) = matches.iter().position(|f| qualified(f) == needle) {
            return Ok(matches.swap_remove(i));
        }
    }

    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => Err(LookupError::NotFound {
            query: query.to_string(),
            available: candidate_names(&files),
        }),
        _ => Err(LookupError::Ambiguous {
            query: query.to_string(),
            candidates: candidate_names(&matches),
        }),
    }
}

fn fold(s: &str) -> String {
    s.to_lowercase().replace('_', " ")
}

fn qualified(f: &CharacterFile) -> String {
    fold(&format!("{}/{}", f.campaign, f.stem))
}

fn candidate_names(files: &[CharacterFile]) -> Vec<String> {
    // Stems alone are ambiguous across campaigns; qualify those.
    let mut names: Vec<String> = files
        .iter()
        .map(|f| {
            let clash = files
                .iter()
                .filter(|o| o.stem.eq_ignore_ascii_case(&f.stem))
                .count()
                > 1;
            if clash {
                format!("{}/{}", f.campaign, f.stem)
            } else {
                f.stem.clone()
            }
        })
        .collect();
    names.sort_by(|a, b| caseless(a, b));
    names.dedup();
    names
}

fn caseless(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Every character under `base` as (campaign, name), sorted by campaign
/// then name, case-insensitively.
pub fn enumerate(base: &Path) -> Result<Vec<CharacterEntry>, LookupError> {
    let mut entries: Vec<CharacterEntry> = discover(base)?
        .into_iter()
        .map(|f| {
            let name = match Character::from_path(&f.path) {
                Ok(c) => c.name.filter(|n| !n.trim().is_empty()).unwrap_or(f.stem),
                Err(err) => {
                    tracing::warn!("{}", err);
                    f.stem
                }
            };
            CharacterEntry {
                campaign: f.campaign,
                name,
                path: f.path,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        caseless(&a.campaign, &b.campaign)
            .then_with(|| caseless(&a.name, &b.name))
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(base: &Path, rel: &str, body: &str) {
        let p = base.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, body).unwrap();
    }

    #[test]
    fn both_layouts_are_discovered() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "alpha/characters/one.json", "{}");
        touch(tmp.path(), "beta/two.json", "{}");
        touch(tmp.path(), "loose.json", "{}");
        touch(tmp.path(), "alpha/notes.txt", "");
        touch(tmp.path(), "beta/campaign_42_characters.json", "[]");

        let files = discover(tmp.path()).unwrap();
        let rel: Vec<&str> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(rel, vec!["alpha/characters/one.json", "beta/two.json", "loose.json"]);
        assert_eq!(files[0].campaign, "alpha");
        assert_eq!(files[1].campaign, "beta");
        assert_eq!(files[2].campaign, NO_CAMPAIGN);
    }

    #[test]
    fn missing_base_is_reported() {
        let tmp = TempDir::new().unwrap();
        let err = discover(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, LookupError::MissingDirectory(_)));
    }

    #[test]
    fn path_fragment_disambiguates() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a/characters/grimgor.json", "{}");
        touch(tmp.path(), "b/characters/grimgor.json", "{}");

        match locate(tmp.path(), "grimgor").unwrap_err() {
            LookupError::Ambiguous { candidates, .. } => {
                assert_eq!(candidates, vec!["a/grimgor", "b/grimgor"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        let found = locate(tmp.path(), "B/Grim").unwrap();
        assert_eq!(found.campaign, "b");
    }

    #[test]
    fn qualified_name_picks_one_of_several_matches() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a/characters/grimgor.json", "{}");
        touch(tmp.path(), "a/characters/grimgor_backup.json", "{}");

        assert!(matches!(
            locate(tmp.path(), "a/grim"),
            Err(LookupError::Ambiguous { .. })
        ));
        let found = locate(tmp.path(), "a/grimgor").unwrap();
        assert_eq!(found.stem, "grimgor");
    }

    #[test]
    fn not_found_lists_available() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a/Zed_2.json", "{}");
        touch(tmp.path(), "a/amy_1.json", "{}");
        match locate(tmp.path(), "bob").unwrap_err() {
            LookupError::NotFound { available, .. } => {
                assert_eq!(available, vec!["amy_1", "Zed_2"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn enumerate_falls_back_to_stem() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "c/characters/broken.json", "{not json");
        touch(tmp.path(), "c/characters/named_1.json", r#"{"name": "Aria"}"#);
        let entries = enumerate(tmp.path()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Aria", "broken"]);
    }
}
