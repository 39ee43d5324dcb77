// API client module: a small blocking HTTP client for the D&D Beyond
// endpoints the scraper needs. Requests are sequential; the session cookie
// lives in the client's cookie jar and is exchanged for a short-lived bearer
// token on first use.

use crate::config::ScraperConfig;
use crate::error::{ApiError, ConfigError};
use regex::Regex;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

const BROWSER_UA: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Stat ids used by the character service, in sheet order.
pub const STAT_NAMES: [(u8, &str); 6] = [
    (1, "Strength"),
    (2, "Dexterity"),
    (3, "Constitution"),
    (4, "Intelligence"),
    (5, "Wisdom"),
    (6, "Charisma"),
];

/// A campaign the logged-in user belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Campaign {
    pub id: u64,
    pub name: String,
    pub dm: Option<String>,
    pub url: String,
}

/// A character id found on a campaign page, with whatever the page showed
/// next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignCharacter {
    pub id: u64,
    pub name: String,
    pub player: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

#[derive(Deserialize)]
struct CampaignListResponse {
    status: Option<String>,
    #[serde(default)]
    data: Vec<RawCampaign>,
}

#[derive(Deserialize)]
struct RawCampaign {
    id: Option<u64>,
    name: Option<String>,
    #[serde(rename = "dmUsername")]
    dm_username: Option<String>,
}

#[derive(Deserialize)]
struct CharacterResponse {
    #[serde(default)]
    success: bool,
    message: Option<String>,
    data: Option<Value>,
}

/// Blocking client holding the cookie jar, endpoint URLs and the cached
/// bearer token.
pub struct DdbClient {
    client: Client,
    site_url: String,
    auth_url: String,
    character_url: String,
    token: RefCell<Option<String>>,
}

impl DdbClient {
    /// Build a client with the `CobaltSession` cookie installed for the
    /// D&D Beyond domain and the configured endpoints.
    pub fn new(cfg: &ScraperConfig) -> Result<Self, ConfigError> {
        // Host-only cookie per endpoint, so overridden hosts get it as well.
        let jar = Arc::new(Jar::default());
        let cookie = format!("CobaltSession={}; Path=/", cfg.session);
        for base in [&cfg.site_url, &cfg.auth_url, &cfg.character_url] {
            if let Ok(url) = base.parse::<reqwest::Url>() {
                jar.add_cookie_str(&cookie, &url);
            }
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .cookie_provider(jar)
            .default_headers(headers)
            .build()
            .map_err(ConfigError::Client)?;

        Ok(DdbClient {
            client,
            site_url: cfg.site_url.clone(),
            auth_url: cfg.auth_url.clone(),
            character_url: cfg.character_url.clone(),
            token: RefCell::new(None),
        })
    }

    /// Exchange the session cookie for a bearer token, caching the result.
    fn bearer(&self) -> Result<String, ApiError> {
        if let Some(t) = self.token.borrow().as_ref() {
            return Ok(t.clone());
        }
        let url = format!("{}/v1/cobalt-token", self.auth_url);
        tracing::debug!("requesting bearer token from {}", url);
        let res = self.client.post(&url).send()?;
        let status = res.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthorized {
                message: format!("token exchange returned {}", status),
            });
        }
        let res = check_status(res, &url)?;
        let body: TokenResponse = res.json()?;
        let token = body
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized {
                message: "token exchange returned no token".into(),
            })?;
        *self.token.borrow_mut() = Some(token.clone());
        Ok(token)
    }

    fn authed_get(&self, url: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.client.get(url).bearer_auth(self.bearer()?))
    }

    /// List campaigns the account is active in.
    pub fn list_campaigns(&self) -> Result<Vec<Campaign>, ApiError> {
        let url = format!("{}/api/campaign/stt/active-campaigns", self.site_url);
        let res = self.authed_get(&url)?.send()?;
        let res = check_auth_status(res, &url)?;
        let body: CampaignListResponse = res.json()?;
        if body.status.as_deref() != Some("success") {
            return Err(ApiError::Envelope {
                url,
                message: format!("status {:?}", body.status.unwrap_or_default()),
            });
        }
        Ok(body
            .data
            .into_iter()
            .filter_map(|c| {
                let id = c.id?;
                Some(Campaign {
                    id,
                    name: c.name.unwrap_or_else(|| format!("campaign_{id}")),
                    dm: c.dm_username,
                    url: format!("{}/campaigns/{}", self.site_url, id),
                })
            })
            .collect())
    }

    /// Character ids linked from a campaign page. A page that is missing or
    /// not visible to this account yields an empty list.
    pub fn campaign_characters(&self, campaign_id: u64) -> Result<Vec<CampaignCharacter>, ApiError> {
        let url = format!("{}/campaigns/{}", self.site_url, campaign_id);
        let res = self.client.get(&url).send()?;
        let status = res.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
            tracing::warn!(campaign_id, %status, "campaign page not accessible");
            return Ok(Vec::new());
        }
        let html = check_status(res, &url)?.text()?;
        Ok(parse_campaign_page(&html))
    }

    /// Fetch the full character document. Stat entries get a readable `name`
    /// filled in from their id.
    pub fn character(&self, character_id: u64) -> Result<Value, ApiError> {
        let url = format!(
            "{}/character/v5/character/{}",
            self.character_url, character_id
        );
        let mut res = self.authed_get(&url)?.send()?;
        if res.status() == StatusCode::UNAUTHORIZED {
            // Bearer tokens are short-lived; refresh once.
            tracing::debug!(character_id, "bearer rejected, refreshing token");
            self.token.borrow_mut().take();
            res = self.authed_get(&url)?.send()?;
        }
        let res = check_auth_status(res, &url)?;
        let body: CharacterResponse = res.json()?;
        if !body.success {
            return Err(ApiError::Envelope {
                url,
                message: body.message.unwrap_or_else(|| "request unsuccessful".into()),
            });
        }
        let mut data = body.data.unwrap_or(Value::Null);
        if !data.is_object() {
            return Err(ApiError::Envelope {
                url,
                message: "response carried no character data".into(),
            });
        }
        enrich_stat_names(&mut data);
        Ok(data)
    }
}

fn check_status(res: Response, url: &str) -> Result<Response, ApiError> {
    if res.status().is_success() {
        Ok(res)
    } else {
        Err(ApiError::Status {
            status: res.status(),
            url: url.to_string(),
        })
    }
}

fn check_auth_status(res: Response, url: &str) -> Result<Response, ApiError> {
    if res.status() == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized {
            message: format!("{} rejected the bearer token", url),
        });
    }
    check_status(res, url)
}

/// Fill in `name` on `stats` and `bonusStats` entries from their numeric id.
pub fn enrich_stat_names(data: &mut Value) {
    for key in ["stats", "bonusStats"] {
        let Some(stats) = data.get_mut(key).and_then(Value::as_array_mut) else {
            continue;
        };
        for stat in stats.iter_mut().filter_map(Value::as_object_mut) {
            let name = stat
                .get("id")
                .and_then(Value::as_u64)
                .and_then(|id| STAT_NAMES.iter().find(|(sid, _)| u64::from(*sid) == id))
                .map(|(_, name)| *name);
            if let Some(name) = name {
                stat.insert("name".into(), Value::String(name.into()));
            }
        }
    }
}

fn character_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/characters/(\d+)").expect("static regex"))
}

fn character_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"character-info-primary[^>]*>\s*([^<]+?)\s*<").expect("static regex")
    })
}

fn player_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Player:\s*([^<]+)").expect("static regex"))
}

/// Pull character ids, names and players out of a campaign page.
///
/// Names and players are read from a window around the first link to each
/// character. The card markup puts them just before the link, so the nearest
/// match before it wins over anything after it.
pub fn parse_campaign_page(html: &str) -> Vec<CampaignCharacter> {
    let ids: BTreeSet<u64> = character_link_re()
        .captures_iter(html)
        .filter_map(|c| c[1].parse().ok())
        .collect();

    ids.into_iter()
        .map(|id| {
            let mut name = None;
            let mut player = None;
            if let Some(idx) = find_link(html, id) {
                let start = floor_char_boundary(html, idx.saturating_sub(1000));
                let end = floor_char_boundary(html, (idx + 500).min(html.len()));
                let (before, after) = (&html[start..idx], &html[idx..end]);
                name = nearest(character_name_re(), before, after);
                player = nearest(player_re(), before, after);
            }
            CampaignCharacter {
                id,
                name: name.unwrap_or_else(|| "Unknown".into()),
                player: player.unwrap_or_else(|| "Unknown".into()),
            }
        })
        .collect()
}

// Position of the first `/characters/<id>` link not followed by another digit.
fn find_link(html: &str, id: u64) -> Option<usize> {
    character_link_re()
        .captures_iter(html)
        .find(|c| c[1].parse::<u64>().ok() == Some(id))
        .and_then(|c| c.get(0))
        .map(|m| m.start())
}

fn nearest(re: &Regex, before: &str, after: &str) -> Option<String> {
    re.captures_iter(before)
        .last()
        .or_else(|| re.captures(after))
        .map(|c| c[1].trim().to_string())
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
