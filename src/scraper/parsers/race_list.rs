//! Race list parsers for race.netkeiba.com and race.sp.netkeiba.com
//!
//! Race ids show up two ways on listing pages: inside script blocks and
//! plain text (`race_id=202505040101`), and as query parameters of anchor
//! hrefs. Both are scanned and the results merged.

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use url::Url;

use crate::types::RaceId;

static RACE_ID_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"race_id=(\d{10,12})").unwrap());

/// Parser for race list pages
pub struct RaceListParser;

impl RaceListParser {
    /// Find the active navigation group on the per-date listing
    ///
    /// The inner listing marks the selected day with `li.Active`; when that
    /// class is missing, the `li` whose `date` attribute matches is used.
    pub fn active_group(html: &str, date: &str) -> Option<String> {
        let document = Html::parse_document(html);

        let by_date = format!("li[date='{}'][group]", date);
        ["li.Active[group]", by_date.as_str()]
            .iter()
            .find_map(|sel_str| {
                let selector = Selector::parse(sel_str).ok()?;
                document
                    .select(&selector)
                    .filter_map(|li| li.value().attr("group"))
                    .map(str::trim)
                    .find(|group| !group.is_empty())
                    .map(str::to_string)
            })
    }

    /// Scan raw markup for `race_id=` occurrences
    pub fn ids_from_text(html: &str) -> BTreeSet<RaceId> {
        RACE_ID_TEXT_RE
            .captures_iter(html)
            .filter_map(|caps| RaceId::parse(&caps[1]))
            .collect()
    }

    /// Read `race_id` query parameters from every anchor
    pub fn ids_from_links(html: &str, page_url: &str) -> BTreeSet<RaceId> {
        let document = Html::parse_document(html);
        let base = Url::parse(page_url).ok();

        let mut race_ids = BTreeSet::new();
        let Ok(selector) = Selector::parse("a[href]") else {
            return race_ids;
        };

        for elem in document.select(&selector) {
            let Some(href) = elem.value().attr("href") else {
                continue;
            };
            let resolved = match &base {
                Some(base) => base.join(href),
                None => Url::parse(href),
            };
            let Ok(url) = resolved else {
                continue;
            };

            if let Some(race_id) = url
                .query_pairs()
                .find(|(key, _)| key == "race_id")
                .and_then(|(_, value)| RaceId::parse(&value))
            {
                race_ids.insert(race_id);
            }
        }

        race_ids
    }

    /// Union of text-scanned and link-scanned ids
    pub fn parse_sub(html: &str, page_url: &str) -> BTreeSet<RaceId> {
        let mut race_ids = Self::ids_from_text(html);
        race_ids.extend(Self::ids_from_links(html, page_url));
        race_ids
    }
}
