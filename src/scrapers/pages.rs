//! Page addresses and page-level metadata for the stats site.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// Table id of a pitcher's season game log.
pub const GAME_LOG_TABLE_ID: &str = "pitching_gamelogs";

/// Table id of the league-wide team batting table.
pub const TEAM_BATTING_TABLE_ID: &str = "teams_standard_batting";

static BREADCRUMB_ITEM: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[itemtype*="BreadcrumbList"] [itemprop="itemListElement"]"#).unwrap()
});
static ITEM_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop="name"]"#).unwrap());
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());

static TRAILING_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\s+(?:\d{4}|Pitching|Batting))+\s*$").unwrap());
static TITLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s+(?:\d{4}\b|MLB Pitcher Game Log)").unwrap());

/// Season game-log page for a pitcher.
pub fn game_log_url(base: &Url, player_id: &str, year: i32) -> Url {
    let mut url = base.clone();
    url.set_path("/players/gl.fcgi");
    url.query_pairs_mut()
        .clear()
        .append_pair("id", player_id)
        .append_pair("t", "p")
        .append_pair("year", &year.to_string());
    url
}

/// League team batting page for a season.
pub fn team_batting_url(base: &Url, year: i32) -> Url {
    let mut url = base.clone();
    url.set_path(&format!("/leagues/majors/{}-standard-batting.shtml", year));
    url.set_query(None);
    url
}

fn clean(text: String) -> Option<String> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// Player display name from a game-log page: breadcrumbs first, then a
/// "Game Logs" heading, then the document title.
pub fn extract_player_name(markup: &str) -> Option<String> {
    let document = Html::parse_document(markup);

    let items: Vec<_> = document.select(&BREADCRUMB_ITEM).collect();
    if items.len() >= 3 {
        let name = items
            .last()
            .and_then(|item| item.select(&ITEM_NAME).next())
            .and_then(|el| clean(el.text().collect()));
        if let Some(name) = name {
            debug!("Player name from breadcrumbs: {}", name);
            return Some(name);
        }
    }

    for h1 in document.select(&H1) {
        let Some(text) = clean(h1.text().collect()) else {
            continue;
        };
        if let Some((before, _)) = text.split_once("Game Logs") {
            let name = TRAILING_LABEL.replace(before.trim(), "").trim().to_string();
            if !name.is_empty() {
                debug!("Player name from heading: {}", name);
                return Some(name);
            }
        }
    }

    let title = document
        .select(&TITLE)
        .next()
        .and_then(|el| clean(el.text().collect()))?;
    TITLE_NAME
        .captures(&title)
        .map(|caps| caps[1].trim().to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.baseball-reference.com").unwrap()
    }

    #[test]
    fn test_urls() {
        assert_eq!(
            game_log_url(&base(), "degroja01", 2023).as_str(),
            "https://www.baseball-reference.com/players/gl.fcgi?id=degroja01&t=p&year=2023"
        );
        assert_eq!(
            team_batting_url(&base(), 2024).as_str(),
            "https://www.baseball-reference.com/leagues/majors/2024-standard-batting.shtml"
        );
    }

    #[test]
    fn test_name_from_breadcrumbs() {
        let markup = r#"
            <div itemscope itemtype="https://schema.org/BreadcrumbList">
              <span itemprop="itemListElement"><span itemprop="name">Home</span></span>
              <span itemprop="itemListElement"><span itemprop="name">Players</span></span>
              <span itemprop="itemListElement"><span itemprop="name">Jacob  deGrom</span></span>
            </div>
            <h1>Someone Else 2023 Pitching Game Logs</h1>
        "#;
        assert_eq!(extract_player_name(markup).as_deref(), Some("Jacob deGrom"));
    }

    #[test]
    fn test_name_from_heading() {
        let markup = "<h1><span>Jacob deGrom 2023 Pitching Game Logs</span></h1>";
        assert_eq!(extract_player_name(markup).as_deref(), Some("Jacob deGrom"));
    }

    #[test]
    fn test_name_from_title() {
        let markup = "<html><head><title>Jacob deGrom 2023 Pitching Game Logs | Baseball-Reference.com</title></head></html>";
        assert_eq!(extract_player_name(markup).as_deref(), Some("Jacob deGrom"));

        let markup = "<html><head><title>John Doe MLB Pitcher Game Log</title></head></html>";
        assert_eq!(extract_player_name(markup).as_deref(), Some("John Doe"));
    }

    #[test]
    fn test_no_name() {
        assert_eq!(extract_player_name("<html><body></body></html>"), None);
    }
}
