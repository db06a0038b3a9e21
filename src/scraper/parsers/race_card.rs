//! Race card (shutuba) parser for netkeiba.com.
//!
//! Handles both the desktop and mobile layouts. Horse numbers and table rows
//! are located through ordered lists of independent strategies; the first
//! strategy that succeeds wins.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use super::race_meta::{extract_meta, extract_title};
use crate::scraper::{horse_url, race_card_url, sp_race_card_url};
use crate::types::{EntryRecord, RaceId, RaceRecord, SourceUrls};

/// A strategy reading a horse number from one table row
type NumberStrategy = fn(&ElementRef<'_>) -> Option<u32>;

/// Horse number strategies, in priority order
const HORSE_NUMBER_STRATEGIES: [(&str, NumberStrategy); 5] = [
    ("umaban_cell", number_from_umaban_cell),
    ("checkbox_name", number_from_checkbox_name),
    ("checkbox_id", number_from_checkbox_id),
    ("number_cell", number_from_number_cell),
    ("row_id", number_from_row_id),
];

/// Row selectors, most specific layout first; only the first one yielding
/// rows is used
const ROW_SELECTORS: [&str; 3] = [
    "tr.HorseList",
    "table.Shutuba_Table tr, table.ShutubaTable tr, table.RaceTable01 tr",
    "tbody tr",
];

/// Characters after a horse number marker searched for the horse name
const NAME_WINDOW: usize = 320;

static CHECKBOX_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"check_(\d+)").unwrap());
static ROW_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"tr_(\d+)").unwrap());
static HORSE_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/horse/(\d+)").unwrap());
static JOCKEY_WEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s*(\d{1,2}(?:\.\d)?)$").unwrap());
static SEX_AGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([牡牝セ])(\d)").unwrap());
static ODDS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());
static NUMBER_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"class="Umaban[^"]*"[^>]*>\s*(\d{1,2})\s*<"#).unwrap()
});
static NAME_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"class="HorseName[^"]*"[^>]*>(?:\s*<[^>]+>)*\s*([^<]*[^<\s])\s*<"#).unwrap()
});

/// Parser for race card pages
pub struct RaceCardParser;

impl RaceCardParser {
    /// Parse a race card page into a record (date left empty)
    pub fn parse(html: &str, race_id: &RaceId, page_url: &str) -> RaceRecord {
        let document = Html::parse_document(html);

        let meta = extract_meta(html);
        let title = extract_title(&document);
        let entries = Self::parse_entries(&document, html, race_id, page_url);

        RaceRecord {
            race_id: race_id.clone(),
            date: String::new(),
            course: meta.course,
            grade: title.grade,
            name: title.name,
            distance: meta.distance,
            surface: meta.surface,
            turn: meta.turn,
            going: meta.going,
            source_urls: SourceUrls {
                mobile: sp_race_card_url(race_id.as_str()),
                desktop: race_card_url(race_id.as_str()),
            },
            entries,
        }
    }

    /// Parse entries, deduplicated by horse number (first row wins)
    pub fn parse_entries(
        document: &Html,
        html: &str,
        race_id: &RaceId,
        page_url: &str,
    ) -> Vec<EntryRecord> {
        let base = Url::parse(page_url).ok();
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for row in Self::candidate_rows(document) {
            if let Some(entry) = Self::parse_entry_row(&row, race_id, base.as_ref()) {
                if seen.insert(entry.horse_number) {
                    entries.push(entry);
                }
            }
        }

        if entries.is_empty() {
            debug!("No entry rows for race {}, scanning raw markup", race_id);
            entries = Self::scan_markup_entries(html, race_id);
        }

        entries
    }

    /// Rows of the first selector that matches anything
    fn candidate_rows(document: &Html) -> Vec<ElementRef<'_>> {
        for sel_str in ROW_SELECTORS {
            if let Ok(selector) = Selector::parse(sel_str) {
                let rows: Vec<_> = document.select(&selector).collect();
                if !rows.is_empty() {
                    return rows;
                }
            }
        }
        Vec::new()
    }

    fn parse_entry_row(
        row: &ElementRef,
        race_id: &RaceId,
        base: Option<&Url>,
    ) -> Option<EntryRecord> {
        let horse_number = extract_horse_number(row)?;
        let mut entry = EntryRecord::new(race_id, horse_number, "");

        // Horse name and db link
        if let Some(link) = first_match(row, &[".HorseName a", "a[href*='/horse/']"]) {
            entry.name = collapse_text(&link);
            entry.horse_db_url = link
                .value()
                .attr("href")
                .and_then(|href| horse_db_url(href, base));
        } else if let Some(elem) = first_match(row, &[".HorseName"]) {
            entry.name = collapse_text(&elem);
        }

        // Jockey, with carried weight as a trailing number: "ルメール57.0"
        if let Some(elem) = first_match(row, &["td.Jockey", ".Jockey"]) {
            let text = collapse_text(&elem);
            match JOCKEY_WEIGHT_RE.captures(&text) {
                Some(caps) => {
                    entry.jockey = caps[1].trim().to_string();
                    entry.weight = caps[2].parse().unwrap_or(0.0);
                }
                None => entry.jockey = text,
            }
        }

        // Sex and age
        let sex_age_text = first_match(row, &["td.Barei", ".Barei", ".Age"])
            .map(|elem| elem.text().collect::<String>())
            .filter(|text| SEX_AGE_RE.is_match(text))
            .unwrap_or_else(|| row.text().collect());
        if let Some(caps) = SEX_AGE_RE.captures(&sex_age_text) {
            entry.sex_age = format!("{}{}", &caps[1], &caps[2]);
        }

        // Win odds
        if let Some(elem) = first_match(row, &["span[id^='odds-']", "td.Odds", ".Odds_Ninki"]) {
            let text = elem.text().collect::<String>();
            entry.odds = ODDS_RE.find(&text).and_then(|m| m.as_str().parse().ok());
        }

        Some(entry)
    }

    /// Last resort: pair horse number markers with the next horse name
    /// marker in the raw markup
    fn scan_markup_entries(html: &str, race_id: &RaceId) -> Vec<EntryRecord> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for caps in NUMBER_MARKER_RE.captures_iter(html) {
            let Some(horse_number) = caps[1].parse::<u32>().ok().filter(|n| *n > 0) else {
                continue;
            };
            let start = caps.get(0).map_or(0, |m| m.end());
            let window = char_window(&html[start..], NAME_WINDOW);

            let Some(name) = NAME_MARKER_RE.captures(window) else {
                continue;
            };
            if seen.insert(horse_number) {
                entries.push(EntryRecord::new(race_id, horse_number, name[1].trim()));
            }
        }

        entries
    }
}

/// Extract a row's horse number; `None` means the row is not a runner
pub fn extract_horse_number(row: &ElementRef) -> Option<u32> {
    HORSE_NUMBER_STRATEGIES
        .iter()
        .find_map(|(_, strategy)| strategy(row))
}

fn number_from_umaban_cell(row: &ElementRef) -> Option<u32> {
    let selector = Selector::parse("td[class^='Umaban']").ok()?;
    let cell = row.select(&selector).next()?;
    digits_only(&cell.text().collect::<String>())
}

fn number_from_checkbox_name(row: &ElementRef) -> Option<u32> {
    let name = checkbox(row)?.value().attr("name")?;
    positive(name.trim())
}

fn number_from_checkbox_id(row: &ElementRef) -> Option<u32> {
    let id = checkbox(row)?.value().attr("id")?;
    let caps = CHECKBOX_ID_RE.captures(id)?;
    positive(&caps[1])
}

fn number_from_number_cell(row: &ElementRef) -> Option<u32> {
    let selector = Selector::parse("td[class*='Num'], td[class*='Waku']").ok()?;
    let cell = row.select(&selector).next()?;
    digits_only(&cell.text().collect::<String>())
}

fn number_from_row_id(row: &ElementRef) -> Option<u32> {
    let id = row.value().attr("id")?;
    let caps = ROW_ID_RE.captures(id)?;
    positive(&caps[1])
}

fn checkbox<'a>(row: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    let selector = Selector::parse("input[type='checkbox']").ok()?;
    row.select(&selector).next()
}

/// Keep only ASCII digits and parse
fn digits_only(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    positive(&digits)
}

fn positive(text: &str) -> Option<u32> {
    text.parse().ok().filter(|n| *n > 0)
}

fn first_match<'a>(row: &ElementRef<'a>, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|sel_str| {
        let selector = Selector::parse(sel_str).ok()?;
        row.select(&selector).next()
    })
}

fn collapse_text(elem: &ElementRef) -> String {
    elem.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical db.netkeiba.com horse page for a row link
fn horse_db_url(href: &str, base: Option<&Url>) -> Option<String> {
    if let Some(caps) = HORSE_ID_RE.captures(href) {
        return Some(horse_url(&caps[1]));
    }
    let resolved = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    Some(resolved.to_string())
}

/// Prefix of `text` at most `max_chars` characters long
fn char_window(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
