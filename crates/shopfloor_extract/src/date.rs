//! Date normalization to the canonical `YYYY/MM/DD` form.
//!
//! Every parser here returns `None` on failure; callers treat that as
//! "no date in this cell" and move on to the next heuristic.

use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate, TimeDelta};
use regex::Regex;

use crate::conf::TUP_SERIAL_DATE_EPOCH;
use crate::spec::EnumCellValue;

const C_DATE_FORMAT: &str = "%Y/%m/%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumDateLayout {
    /// `2024-03-05`, `2024/3/5`
    YearMonthDay,
    /// `2024年3月5日`
    YearMonthDayCjk,
    /// `24年3月5日`
    ShortYearMonthDayCjk,
    /// `3月5日`
    MonthDayCjk,
    /// `2024-03-05 08:30:00`
    YearMonthDayTime,
}

struct SpecDatePattern {
    regex: Regex,
    layout: EnumDateLayout,
    /// Match the whole text instead of its first whitespace-separated token.
    if_full_text: bool,
}

static L_DATE_PATTERNS: LazyLock<Vec<SpecDatePattern>> = LazyLock::new(|| {
    [
        (
            r"^(\d{4})[-/](\d{1,2})[-/](\d{1,2})$",
            EnumDateLayout::YearMonthDay,
            false,
        ),
        (
            r"^(\d{4})年(\d{1,2})月(\d{1,2})日$",
            EnumDateLayout::YearMonthDayCjk,
            false,
        ),
        (
            r"^(\d{2})年(\d{1,2})月(\d{1,2})日$",
            EnumDateLayout::ShortYearMonthDayCjk,
            false,
        ),
        (r"^(\d{1,2})月(\d{1,2})日$", EnumDateLayout::MonthDayCjk, false),
        (
            r"^(\d{4})-(\d{1,2})-(\d{1,2})\s+\d{1,2}:\d{1,2}:\d{1,2}$",
            EnumDateLayout::YearMonthDayTime,
            true,
        ),
    ]
    .into_iter()
    .filter_map(|(pattern, layout, if_full_text)| {
        Regex::new(pattern).ok().map(|regex| SpecDatePattern {
            regex,
            layout,
            if_full_text,
        })
    })
    .collect()
});

static RE_DATE_EMBEDDED: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(\d{4})\s*[-/年.]\s*(\d{1,2})\s*[-/月.]\s*(\d{1,2})(?:\s*日)?").ok()
});

////////////////////////////////////////////////////////////////////////////////
// #region Parsing

/// Parse one cell into a canonical date.
///
/// Numbers (plain or date-formatted) are serial days from 1899-12-30; text is
/// matched against the supported layouts. Blank cells and zero give `None`.
pub fn parse_date(value: &EnumCellValue) -> Option<String> {
    match value {
        EnumCellValue::None => None,
        EnumCellValue::Number(n) | EnumCellValue::DateSerial(n) => {
            if *n == 0.0 {
                return None;
            }
            parse_date_serial(*n)
        }
        EnumCellValue::String(s) => parse_date_text(s),
    }
}

/// Convert a spreadsheet serial day count; the fraction (time of day) is dropped.
pub fn parse_date_serial(n: f64) -> Option<String> {
    if !n.is_finite() {
        return None;
    }
    let (n_year, n_month, n_day) = TUP_SERIAL_DATE_EPOCH;
    let date_epoch = NaiveDate::from_ymd_opt(n_year, n_month, n_day)?;
    let delta = TimeDelta::try_days(n.trunc() as i64)?;
    date_epoch
        .checked_add_signed(delta)
        .map(|date| date.format(C_DATE_FORMAT).to_string())
}

/// Parse text in one of the supported layouts; first matching layout wins.
pub fn parse_date_text(text: &str) -> Option<String> {
    let c_text = text.trim();
    if c_text.is_empty() {
        return None;
    }
    let c_token = c_text.split_whitespace().next().unwrap_or(c_text);

    for pattern in L_DATE_PATTERNS.iter() {
        let c_target = if pattern.if_full_text { c_text } else { c_token };
        let Some(caps) = pattern.regex.captures(c_target) else {
            continue;
        };
        let l_parts: Vec<u32> = caps
            .iter()
            .skip(1)
            .flatten()
            .filter_map(|m| m.as_str().parse::<u32>().ok())
            .collect();
        if let Some(date) = derive_date_from_parts(pattern.layout, &l_parts) {
            return Some(date.format(C_DATE_FORMAT).to_string());
        }
    }
    None
}

/// Find a full date embedded in a longer label such as `日期：2024年3月5日`.
///
/// A match glued to more digits (`2024-03-01-02`, `12024-03-01`) is a code,
/// not a date.
pub fn search_date_text(text: &str) -> Option<String> {
    let regex = RE_DATE_EMBEDDED.as_ref()?;
    regex.captures_iter(text).find_map(|caps| {
        let m = caps.get(0)?;
        if is_digit_run_continued(&text[..m.start()], &text[m.end()..]) {
            return None;
        }
        let n_year = caps.get(1)?.as_str().parse::<i32>().ok()?;
        let n_month = caps.get(2)?.as_str().parse::<u32>().ok()?;
        let n_day = caps.get(3)?.as_str().parse::<u32>().ok()?;
        NaiveDate::from_ymd_opt(n_year, n_month, n_day)
            .map(|date| date.format(C_DATE_FORMAT).to_string())
    })
}

fn is_digit_run_continued(before: &str, after: &str) -> bool {
    if before.chars().next_back().is_some_and(|chr| chr.is_ascii_digit()) {
        return true;
    }
    let mut iter_after = after.chars();
    match iter_after.next() {
        Some(chr) if chr.is_ascii_digit() => true,
        Some('-' | '/' | '.') => iter_after.next().is_some_and(|chr| chr.is_ascii_digit()),
        _ => false,
    }
}

fn derive_date_from_parts(layout: EnumDateLayout, parts: &[u32]) -> Option<NaiveDate> {
    match (layout, parts) {
        (
            EnumDateLayout::YearMonthDay
            | EnumDateLayout::YearMonthDayCjk
            | EnumDateLayout::YearMonthDayTime,
            [n_year, n_month, n_day],
        ) => NaiveDate::from_ymd_opt(i32::try_from(*n_year).ok()?, *n_month, *n_day),
        (EnumDateLayout::ShortYearMonthDayCjk, [n_year_short, n_month, n_day]) => {
            NaiveDate::from_ymd_opt(expand_short_year(*n_year_short)?, *n_month, *n_day)
        }
        // Year is not in the text; the current year is assumed.
        (EnumDateLayout::MonthDayCjk, [n_month, n_day]) => {
            NaiveDate::from_ymd_opt(Local::now().year(), *n_month, *n_day)
        }
        _ => None,
    }
}

/// Two-digit years pivot at 69: `00..=68` → 20xx, `69..=99` → 19xx.
fn expand_short_year(n_year_short: u32) -> Option<i32> {
    let n_year = i32::try_from(n_year_short).ok()?;
    match n_year {
        0..=68 => Some(2000 + n_year),
        69..=99 => Some(1900 + n_year),
        _ => None,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
