//! Sports statistics evidence provider (Sportradar NBA v8 REST API).
//!
//! Each operation is a path template under the provider base URL; the oracle
//! sees the catalog as callable tools.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use crate::infrastructure::chat::ToolDefinition;
use crate::infrastructure::http::check_response;
use crate::infrastructure::traits::EvidenceProvider;
use crate::infrastructure::{InfraError, InfraResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// `YYYY-MM-DD`, rendered as `YYYY/MM/DD`
    Date,
    Year,
    /// `REG`, `PRE` or `PST`
    SeasonType,
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvidenceOperation {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [Param],
    /// Path relative to the base URL, `{param}` placeholders
    pub path: &'static str,
}

const DATE: Param = Param { name: "date", kind: ParamKind::Date };
const YEAR: Param = Param { name: "year", kind: ParamKind::Year };
const SEASON_TYPE: Param = Param { name: "season_type", kind: ParamKind::SeasonType };
const TEAM_ID: Param = Param { name: "team_id", kind: ParamKind::Id };
const GAME_ID: Param = Param { name: "game_id", kind: ParamKind::Id };
const PLAYER_ID: Param = Param { name: "player_id", kind: ParamKind::Id };
const SERIES_ID: Param = Param { name: "series_id", kind: ParamKind::Id };

const SEASON: &[Param] = &[YEAR, SEASON_TYPE];
const TEAM_SEASON: &[Param] = &[YEAR, SEASON_TYPE, TEAM_ID];

pub const CATALOG: &[EvidenceOperation] = &[
    EvidenceOperation {
        name: "get_daily_change_log",
        description: "IDs and timestamps of teams, players, statistics, schedules and standings updated on a date.",
        params: &[DATE],
        path: "league/daily_change_log/{date}",
    },
    EvidenceOperation {
        name: "get_daily_injuries",
        description: "All injuries updated on a date, with player, description and status.",
        params: &[DATE],
        path: "league/injuries/{date}",
    },
    EvidenceOperation {
        name: "get_daily_transfers",
        description: "Player transfers added or edited on a date, with from/to teams.",
        params: &[DATE],
        path: "league/transfers/{date}",
    },
    EvidenceOperation {
        name: "get_league_hierarchy",
        description: "Conferences, divisions and teams (id, name, market, alias, venue).",
        params: &[],
        path: "league/hierarchy",
    },
    EvidenceOperation {
        name: "get_seasons",
        description: "Available seasons with id, year, type (REG/PRE/PST) and dates.",
        params: &[],
        path: "league/seasons",
    },
    EvidenceOperation {
        name: "get_free_agents",
        description: "Current free agents with player bio info.",
        params: &[],
        path: "league/free_agents",
    },
    EvidenceOperation {
        name: "get_league_injuries",
        description: "Current injuries for every team.",
        params: &[],
        path: "league/injuries",
    },
    EvidenceOperation {
        name: "get_daily_schedule",
        description: "Games scheduled on a date with status, home/away teams and venue.",
        params: &[DATE],
        path: "games/{date}/schedule",
    },
    EvidenceOperation {
        name: "get_series_schedule",
        description: "Playoff series for a season with round, participants and games.",
        params: SEASON,
        path: "series/{year}/{season_type}/schedule",
    },
    EvidenceOperation {
        name: "get_standings",
        description: "Standings for a season: wins, losses, win_pct, games_behind, streak.",
        params: SEASON,
        path: "seasons/{year}/{season_type}/standings",
    },
    EvidenceOperation {
        name: "get_league_leaders",
        description: "Statistical leaders per category (points, rebounds, ...) for a season.",
        params: SEASON,
        path: "seasons/{year}/{season_type}/leaders",
    },
    EvidenceOperation {
        name: "get_rankings",
        description: "Conference and division rankings of teams for a season.",
        params: SEASON,
        path: "seasons/{year}/{season_type}/rankings",
    },
    EvidenceOperation {
        name: "get_season_teams",
        description: "Teams participating in a season.",
        params: SEASON,
        path: "seasons/{year}/{season_type}/teams",
    },
    EvidenceOperation {
        name: "get_seasonal_statistics",
        description: "A team's season totals and averages plus opponent statistics.",
        params: TEAM_SEASON,
        path: "seasons/{year}/{season_type}/teams/{team_id}/statistics",
    },
    EvidenceOperation {
        name: "get_season_splits",
        description: "A team's season statistics broken down by category.",
        params: TEAM_SEASON,
        path: "seasons/{year}/{season_type}/teams/{team_id}/splits",
    },
    EvidenceOperation {
        name: "get_in_game_splits",
        description: "A team's season statistics by quarter and half.",
        params: TEAM_SEASON,
        path: "seasons/{year}/{season_type}/teams/{team_id}/splits/ingame",
    },
    EvidenceOperation {
        name: "get_schedule_splits",
        description: "A team's season statistics home vs away.",
        params: TEAM_SEASON,
        path: "seasons/{year}/{season_type}/teams/{team_id}/splits/schedule",
    },
    EvidenceOperation {
        name: "get_hierarchy_splits",
        description: "A team's season statistics against conference and division opponents.",
        params: TEAM_SEASON,
        path: "seasons/{year}/{season_type}/teams/{team_id}/splits/hierarchy",
    },
    EvidenceOperation {
        name: "get_series_statistics",
        description: "A team's statistics in a playoff series.",
        params: &[SERIES_ID, TEAM_ID],
        path: "series/{series_id}/teams/{team_id}/statistics",
    },
    EvidenceOperation {
        name: "get_game_boxscore",
        description: "Boxscore of a game: scoring by quarter and team/player totals.",
        params: &[GAME_ID],
        path: "games/{game_id}/boxscore",
    },
    EvidenceOperation {
        name: "get_game_summary",
        description: "Summary of a game with scoring by quarter and high-level statistics.",
        params: &[GAME_ID],
        path: "games/{game_id}/summary",
    },
    EvidenceOperation {
        name: "get_game_play_by_play",
        description: "Play-by-play events of a game per period.",
        params: &[GAME_ID],
        path: "games/{game_id}/pbp",
    },
    EvidenceOperation {
        name: "get_game_splits",
        description: "Home and away shooting splits of a game.",
        params: &[GAME_ID],
        path: "games/{game_id}/splits",
    },
    EvidenceOperation {
        name: "get_team_profile",
        description: "Team details and roster.",
        params: &[TEAM_ID],
        path: "teams/{team_id}/profile",
    },
    EvidenceOperation {
        name: "get_team_depth_chart",
        description: "Players per position ordered by depth rank.",
        params: &[TEAM_ID],
        path: "teams/{team_id}/depth_chart",
    },
    EvidenceOperation {
        name: "get_player_profile",
        description: "Player bio, draft info and per-season statistics.",
        params: &[PLAYER_ID],
        path: "players/{player_id}/profile",
    },
];

pub fn find_operation(name: &str) -> Option<&'static EvidenceOperation> {
    CATALOG.iter().find(|op| op.name == name)
}

impl EvidenceOperation {
    pub fn tool_definition(&self) -> ToolDefinition {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_string(), p.schema()))
            .collect();
        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": self.params.iter().map(|p| p.name).collect::<Vec<_>>(),
                "additionalProperties": false,
            }),
        }
    }

    /// Fill the path template from tool-call arguments.
    pub fn render_path(&self, arguments: &Value) -> InfraResult<String> {
        let mut path = self.path.to_string();
        for param in self.params {
            let value = param.render(self.name, arguments.get(param.name))?;
            path = path.replace(&format!("{{{}}}", param.name), &value);
        }
        Ok(path)
    }
}

impl Param {
    fn schema(&self) -> Value {
        match self.kind {
            ParamKind::Date => json!({"type": "string", "description": "Date in YYYY-MM-DD format"}),
            ParamKind::Year => json!({"type": "integer", "description": "Season year, e.g. 2024"}),
            ParamKind::SeasonType => json!({
                "type": "string",
                "enum": ["REG", "PRE", "PST"],
                "description": "Regular season, preseason or postseason"
            }),
            ParamKind::Id => json!({"type": "string", "description": format!("Provider {}", self.name)}),
        }
    }

    fn render(&self, operation: &str, value: Option<&Value>) -> InfraResult<String> {
        let missing = || InfraError::MissingArgument {
            operation: operation.to_string(),
            argument: self.name.to_string(),
        };
        let invalid = |detail: String| {
            InfraError::Parse(format!("{operation}: invalid {}: {detail}", self.name))
        };
        let value = value.filter(|v| !v.is_null()).ok_or_else(missing)?;
        let raw = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            other => return Err(invalid(other.to_string())),
        };
        if raw.is_empty() {
            return Err(missing());
        }

        match self.kind {
            ParamKind::Date => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map(|d| d.format("%Y/%m/%d").to_string())
                .map_err(|e| invalid(format!("{raw} ({e})"))),
            ParamKind::Year => raw
                .parse::<u16>()
                .map(|y| y.to_string())
                .map_err(|e| invalid(format!("{raw} ({e})"))),
            ParamKind::SeasonType => {
                let upper = raw.to_uppercase();
                match upper.as_str() {
                    "REG" | "PRE" | "PST" => Ok(upper),
                    _ => Err(invalid(raw)),
                }
            }
            ParamKind::Id => Ok(urlencoding::encode(&raw).into_owned()),
        }
    }
}

/// HTTP client for the statistics API.
pub struct SportsDataProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_attempts: usize,
}

impl SportsDataProvider {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        max_attempts: usize,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url.trim_end_matches('/'), path)
    }

    async fn fetch(&self, url: &str, api_key: &str) -> InfraResult<Value> {
        let resp = self
            .http
            .get(url)
            .query(&[("api_key", api_key)])
            .send()
            .await?;
        let resp = check_response(resp).await?;
        resp.json::<Value>()
            .await
            .map_err(|e| InfraError::Parse(format!("provider response: {e}")))
    }
}

#[async_trait]
impl EvidenceProvider for SportsDataProvider {
    fn tools(&self) -> Vec<ToolDefinition> {
        CATALOG.iter().map(EvidenceOperation::tool_definition).collect()
    }

    #[instrument(level = "debug", skip(self, arguments))]
    async fn invoke(&self, operation: &str, arguments: &Value) -> InfraResult<Value> {
        let op = find_operation(operation)
            .ok_or_else(|| InfraError::UnknownOperation(operation.to_string()))?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(InfraError::MissingApiKey("evidence provider"))?;
        let url = self.url_for(&op.render_path(arguments)?);
        debug!(%url, "evidence request");

        let attempts = &AtomicUsize::new(0);
        let max_attempts = self.max_attempts;
        let url = url.as_str();
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(250))
            .with_max_elapsed_time(None)
            .build();

        backoff::future::retry(backoff, move || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            match self.fetch(url, api_key).await {
                Ok(value) => Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(operation, attempt, %e, "evidence request failed, retrying");
                    match e {
                        InfraError::RateLimited { retry_after_secs } => Err(
                            backoff::Error::retry_after(e, Duration::from_secs(retry_after_secs)),
                        ),
                        e => Err(backoff::Error::transient(e)),
                    }
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }
}
