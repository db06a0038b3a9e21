//! Course and race condition extraction for race card pages.
//!
//! Works on raw markup and visible text rather than fixed selectors, since
//! the desktop and mobile layouts place these fields in different elements
//! (and sometimes drop them). Every field is optional.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// JRA racecourses in match-priority order
pub const COURSES: [&str; 10] = [
    "札幌", "函館", "福島", "新潟", "中山", "東京", "中京", "京都", "阪神", "小倉",
];

/// Characters of markup scanned for the turn after the distance
const TURN_WINDOW: usize = 80;

static DISTANCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(芝|ダート|ダ)\s*(\d{3,4})m").unwrap());

static GOING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"馬場\s*[:：]\s*(?:<[^>]*>\s*)*(稍重|不良|良|重)").unwrap()
});

/// Course and conditions of a race
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RaceMeta {
    /// Empty when no known course is named on the page
    pub course: String,
    pub distance: Option<u32>,
    pub surface: Option<String>, // "芝" or "ダ"
    pub turn: Option<String>,
    pub going: Option<String>,
}

/// Race name and grade
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RaceTitle {
    pub name: String,
    pub grade: Option<String>,
}

/// Extract course, distance, surface, turn, and going from raw markup
pub fn extract_meta(raw_html: &str) -> RaceMeta {
    let document = Html::parse_document(raw_html);
    let text = visible_text(&document);

    let mut meta = RaceMeta {
        course: find_course(&text).unwrap_or_default().to_string(),
        ..Default::default()
    };

    // Distance and surface: 芝1600m, ダート1800m, ダ1200m
    if let Some(caps) = DISTANCE_RE.captures(raw_html) {
        meta.surface = Some(normalize_surface(&caps[1]).to_string());
        meta.distance = caps[2].parse().ok();

        let end = caps.get(0).map_or(0, |m| m.end());
        meta.turn = raw_html[end..]
            .chars()
            .take(TURN_WINDOW)
            .find(|c| matches!(c, '右' | '左' | '直'))
            .map(String::from);
    } else {
        // Weak signal: first 右/左 anywhere. 直 is only trusted next to the
        // distance; elsewhere it is mostly 直線/直前 in running text
        meta.turn = raw_html
            .chars()
            .find(|c| matches!(c, '右' | '左'))
            .map(String::from);
    }

    meta.going = GOING_RE.captures(raw_html).map(|caps| caps[1].to_string());

    meta
}

/// First course of [`COURSES`] contained in `text`
pub fn find_course(text: &str) -> Option<&'static str> {
    COURSES.iter().copied().find(|course| text.contains(course))
}

fn normalize_surface(surface: &str) -> &str {
    if surface == "ダート" { "ダ" } else { surface }
}

/// Text of the document outside script and style elements
fn visible_text(document: &Html) -> String {
    let mut out = String::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|e| e.name().to_string()))
            .is_some_and(|name| matches!(name.as_str(), "script" | "style" | "noscript"));
        if !hidden {
            out.push_str(text);
        }
    }

    out
}

/// Extract race name and grade
pub fn extract_title(document: &Html) -> RaceTitle {
    let mut title = RaceTitle::default();

    for sel_str in [".RaceName", ".RaceName_main", ".Race_Name", "h1"] {
        if let Ok(selector) = Selector::parse(sel_str) {
            if let Some(elem) = document.select(&selector).next() {
                let text = elem.text().collect::<String>();
                let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !cleaned.is_empty() {
                    title.name = cleaned;
                    break;
                }
            }
        }
    }

    title.grade = grade_from_icon(document)
        .or_else(|| extract_grade(&title.name))
        .or_else(|| {
            let selector = Selector::parse(".RaceData01, .RaceData02").ok()?;
            let text = document
                .select(&selector)
                .map(|e| e.text().collect::<String>())
                .collect::<String>();
            extract_grade(&text)
        });

    title
}

/// Grade from netkeiba's grade icon classes
fn grade_from_icon(document: &Html) -> Option<String> {
    let selector = Selector::parse("[class*='Icon_GradeType']").ok()?;
    let icon = document.select(&selector).next()?;

    icon.value().classes().find_map(|class| match class {
        "Icon_GradeType1" => Some("G1".to_string()),
        "Icon_GradeType2" => Some("G2".to_string()),
        "Icon_GradeType3" => Some("G3".to_string()),
        _ => None,
    })
}

/// Extract race grade from text
fn extract_grade(text: &str) -> Option<String> {
    let grade = if text.contains("GIII") || text.contains("Ｇ３") || text.contains("G3") {
        "G3"
    } else if text.contains("GII") || text.contains("Ｇ２") || text.contains("G2") {
        "G2"
    } else if text.contains("GI") || text.contains("Ｇ１") || text.contains("G1") {
        "G1"
    } else if text.contains("オープン") || text.contains("OP") {
        "OP"
    } else {
        return None;
    };
    Some(grade.to_string())
}
