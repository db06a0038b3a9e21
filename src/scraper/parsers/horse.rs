//! Horse page parser for db.netkeiba.com.
//!
//! Only the most recent result is read: the first race-result link on the
//! page and the table row that contains it.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::types::HorseBrief;

static RACE_RESULT_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/race/\d{10,12}(?:/|$|\?)").unwrap());

static FINISH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,2}$").unwrap());

/// Parser for horse pages
pub struct HorseParser;

impl HorseParser {
    /// Summarize the latest result; empty when the page has none
    pub fn parse_brief(html: &str) -> HorseBrief {
        let document = Html::parse_document(html);

        let Some(link) = Self::latest_result_link(&document) else {
            return HorseBrief::default();
        };
        let Some(row) = enclosing_row(link) else {
            return HorseBrief::default();
        };

        let name = link.text().collect::<String>().trim().to_string();

        let date = Selector::parse("a[href*='/race/list/']")
            .ok()
            .and_then(|selector| row.select(&selector).next())
            .map(|a| a.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty());

        HorseBrief {
            last_result_date: date,
            last_result_name: (!name.is_empty()).then_some(name),
            last_finish: Self::finish_position(&row),
        }
    }

    fn latest_result_link(document: &Html) -> Option<ElementRef<'_>> {
        let selector = Selector::parse("a[href]").ok()?;
        document.select(&selector).find(|a| {
            a.value()
                .attr("href")
                .is_some_and(|href| RACE_RESULT_HREF_RE.is_match(href))
        })
    }

    /// First cell holding a bare finishing position (1-18)
    fn finish_position(row: &ElementRef) -> Option<String> {
        let selector = Selector::parse("td").ok()?;
        row.select(&selector).find_map(|td| {
            let text = td.text().collect::<String>();
            let text = text.trim();
            if !FINISH_RE.is_match(text) {
                return None;
            }
            let position: u8 = text.parse().ok()?;
            (1..=18).contains(&position).then(|| position.to_string())
        })
    }
}

fn enclosing_row(elem: ElementRef<'_>) -> Option<ElementRef<'_>> {
    elem.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "tr")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HORSE_HTML: &str = r#"<html><body>
<div class="horse_title"><h1>ジャンタルマンタル</h1></div>
<table class="db_h_race_results nk_tb_common">
  <thead><tr><th>日付</th><th>開催</th><th>R</th><th>レース名</th><th>着順</th><th>頭数</th></tr></thead>
  <tbody>
    <tr>
      <td><a href="/race/list/20250504/">2025/05/04</a></td>
      <td><a href="/race/sum/05/20250504/">2東京6</a></td>
      <td>11R</td>
      <td><a href="/race/202505020611/" title="NHKマイルC(G1)">NHKマイルC(G1)</a></td>
      <td>1</td>
      <td>18</td>
    </tr>
    <tr>
      <td><a href="/race/list/20250406/">2025/04/06</a></td>
      <td><a href="/race/sum/09/20250406/">2阪神4</a></td>
      <td>11R</td>
      <td><a href="/race/202509020411/">大阪杯(G1)</a></td>
      <td>3</td>
      <td>16</td>
    </tr>
  </tbody>
</table>
</body></html>"#;

    #[test]
    fn test_parse_brief_latest_row() {
        let brief = HorseParser::parse_brief(HORSE_HTML);
        assert_eq!(brief.last_result_date.as_deref(), Some("2025/05/04"));
        assert_eq!(brief.last_result_name.as_deref(), Some("NHKマイルC(G1)"));
        // Only the first row counts; "11R" is not a bare number
        assert_eq!(brief.last_finish.as_deref(), Some("1"));
    }

    #[test]
    fn test_finish_skips_out_of_range_cells() {
        let html = r#"<table><tr>
            <td><a href="/race/list/20250105/">2025/01/05</a></td>
            <td>20</td><td>0</td><td>中止</td><td>7</td>
            <td><a href="/race/202506010101/">3歳未勝利</a></td>
        </tr></table>"#;
        let brief = HorseParser::parse_brief(html);
        assert_eq!(brief.last_finish.as_deref(), Some("7"));
        assert_eq!(brief.last_result_name.as_deref(), Some("3歳未勝利"));
    }

    #[test]
    fn test_no_result_link_is_empty() {
        let html = r#"<table><tr><td><a href="/race/list/20250504/">2025/05/04</a></td><td>1</td></tr></table>"#;
        assert!(HorseParser::parse_brief(html).is_empty());
        assert!(HorseParser::parse_brief("").is_empty());
    }

    #[test]
    fn test_link_outside_table_is_empty() {
        let html = r#"<p><a href="/race/202505020611/">NHKマイルC</a></p>"#;
        assert!(HorseParser::parse_brief(html).is_empty());
    }

    #[test]
    fn test_row_without_date_or_finish() {
        let html = r#"<table><tr><td><a href="https://db.netkeiba.com/race/202505020611/">NHKマイルC</a></td><td>取消</td></tr></table>"#;
        let brief = HorseParser::parse_brief(html);
        assert_eq!(brief.last_result_name.as_deref(), Some("NHKマイルC"));
        assert!(brief.last_result_date.is_none());
        assert!(brief.last_finish.is_none());
    }
}
