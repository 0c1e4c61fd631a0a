//! Schedule page parsing.
//!
//! Pure transform from fetched markup to a sailing list, notes, or a
//! redirect signal. The operator publishes two formats: a daily schedule
//! table, and a seasonal weekly form addressed by a date-range selector.
//! When the daily table is absent, the date range containing the requested
//! date decides whether the rows on this page apply or the caller must
//! refetch at the range's own URL.

use chrono::{Datelike, NaiveDate, NaiveTime};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::domain::FerrySailing;

use super::error::ScheduleError;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Boilerplate the operator shows instead of a timetable.
const NO_SAILINGS_MESSAGES: [&str; 2] = [
    "Seasonal schedules have not been posted for these dates",
    "Schedules for your selected date and route are currently unavailable",
];

/// Outcome of parsing one schedule page.
#[derive(Debug, Clone, PartialEq)]
pub enum HtmlParseResult {
    /// The requested date lives on a different page; refetch there.
    Redirect(String),
    /// Sailings for the requested date, plus page-level notes.
    Schedule {
        sailings: Vec<FerrySailing>,
        notes: Vec<String>,
    },
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Parses a fetched schedule page for `date`.
///
/// # Errors
///
/// Fails when the seasonal form is malformed, a time or duration cell is
/// unreadable, or `date` falls outside every published range. Both cases
/// carry the page URL.
pub fn parse_schedule_html(
    html: &str,
    url: &Url,
    date: NaiveDate,
) -> Result<HtmlParseResult, ScheduleError> {
    // Word joiners sneak into the markup and break token matching.
    let html = html.replace('\u{2060}', "");
    let document = Html::parse_document(&html);

    let mut rows: Vec<ElementRef> = Vec::new();
    if let Some(table) = document
        .select(&selector("table#dailyScheduleTableOnward"))
        .next()
    {
        rows = table.select(&selector("tbody tr")).collect();
    } else if let Some(modal) = document.select(&selector("div#dateRangeModal")).next() {
        let hrefs: Vec<String> = modal
            .select(&selector("a"))
            .filter_map(|anchor| anchor.value().attr("href"))
            .map(str::to_string)
            .collect();
        let Some(index) = seasonal_daterange_index(&hrefs, date) else {
            return Err(ScheduleError::Parse {
                url: url.to_string(),
                message: format!("date {date} is out of seasonal schedules range"),
            });
        };
        let target = format!(
            "{}://{}{}",
            url.scheme(),
            url.host_str().unwrap_or_default(),
            hrefs[index]
        );
        if index > 0 && target != url.as_str() {
            return Ok(HtmlParseResult::Redirect(target));
        }
        rows = seasonal_schedule_rows(&document, url, date)?;
    }

    let sailings = parse_sailings_from_rows(&rows, date, url)?;
    let mut notes = Vec::new();
    if sailings.is_empty() {
        let message = NO_SAILINGS_MESSAGES
            .iter()
            .copied()
            .find(|message| html.contains(message))
            .unwrap_or("No sailings found");
        tracing::warn!(url = %url, "{message}");
        notes.push(message.to_string());
    }
    Ok(HtmlParseResult::Schedule { sailings, notes })
}

/// Rows for the requested weekday: everything between that weekday's header
/// and the next one. The HTML5 tree builder may wrap the rows in an
/// implicit `tbody`, so both shapes are walked.
fn seasonal_schedule_rows<'a>(
    document: &'a Html,
    url: &Url,
    date: NaiveDate,
) -> Result<Vec<ElementRef<'a>>, ScheduleError> {
    let form = document
        .select(&selector("form#seasonalSchedulesForm"))
        .next()
        .ok_or_else(|| ScheduleError::Parse {
            url: url.to_string(),
            message: "'seasonalSchedulesForm' not found".to_string(),
        })?;

    let weekday = WEEKDAY_NAMES[date.weekday().num_days_from_monday() as usize];
    let mut rows = Vec::new();
    for thead in form.select(&selector("thead")) {
        let heading = thead.text().collect::<String>().trim().to_lowercase();
        if !heading.starts_with(weekday) {
            continue;
        }
        for sibling in thead.next_siblings() {
            let Some(element) = ElementRef::wrap(sibling) else {
                continue;
            };
            match element.value().name() {
                "thead" => break,
                "tr" => rows.push(element),
                "tbody" => {
                    for child in element.children() {
                        if let Some(child) = ElementRef::wrap(child)
                            && child.value().name() == "tr"
                        {
                            rows.push(child);
                        }
                    }
                }
                _ => {}
            }
        }
        break;
    }
    Ok(rows)
}

fn parse_sailings_from_rows(
    rows: &[ElementRef],
    date: NaiveDate,
    url: &Url,
) -> Result<Vec<FerrySailing>, ScheduleError> {
    let td = selector("td");
    let mut sailings = Vec::new();
    for row in rows {
        let cells: Vec<ElementRef> = row.select(&td).collect();
        if cells.len() < 4 {
            continue;
        }
        let departure_cell = cell_text(&cells[1]);
        if departure_cell.contains("No sailings available")
            || departure_cell.contains("No passengers permitted")
        {
            continue;
        }

        // The departure cell may carry trailing comment lines after the time.
        let (departure_text, comments) = match departure_cell.trim().split_once('\n') {
            Some((time, rest)) => (time.trim().to_string(), rest.to_string()),
            None => (departure_cell.trim().to_string(), String::new()),
        };
        let notes = parse_sailing_comments(&comments);
        if notes
            .iter()
            .any(|note| is_sailing_excluded_on_date(note, date))
        {
            continue;
        }

        let departure = parse_clock(&departure_text, url)?;
        let arrival = parse_clock(cell_text(&cells[2]).trim(), url)?;
        let duration_text = cell_text(&cells[3]);
        let duration =
            parse_duration(duration_text.trim()).ok_or_else(|| ScheduleError::Parse {
                url: url.to_string(),
                message: format!("unrecognized duration '{}'", duration_text.trim()),
            })?;

        sailings.push(FerrySailing {
            departure,
            arrival,
            duration,
            notes,
        });
    }
    Ok(sailings)
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>()
}

fn parse_clock(text: &str, url: &Url) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(text, "%I:%M %p").map_err(|_| ScheduleError::Parse {
        url: url.to_string(),
        message: format!("unrecognized time '{text}'"),
    })
}

/// Durations appear as "Xh Ym", "Ym", "Xh", or "H:MM"; all normalize to
/// seconds.
fn parse_duration(text: &str) -> Option<i64> {
    if text.contains("h ") && text.contains('m') {
        let (hours, rest) = text.split_once('h')?;
        let minutes = rest.trim().strip_suffix('m')?;
        Some(hours.trim().parse::<i64>().ok()? * 3600 + minutes.trim().parse::<i64>().ok()? * 60)
    } else if text.contains('m') {
        let minutes = text.strip_suffix('m')?;
        Some(minutes.trim().parse::<i64>().ok()? * 60)
    } else if text.contains('h') {
        let hours = text.strip_suffix('h')?;
        Some(hours.trim().parse::<i64>().ok()? * 3600)
    } else {
        let (hours, minutes) = text.split_once(':')?;
        Some(hours.trim().parse::<i64>().ok()? * 3600 + minutes.trim().parse::<i64>().ok()? * 60)
    }
}

/// Splits a departure cell's trailing lines into individual notes, dropping
/// the "Note:" prefix the operator sometimes adds.
fn parse_sailing_comments(comments: &str) -> Vec<String> {
    comments
        .trim()
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix("Note:").unwrap_or(line).trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Whether a sailing note excludes the sailing on `date`.
///
/// "ONLY …" runs the sailing only on the listed dates; "EXCEPT …" and
/// "NOT AVAILABLE …" skip them; "FOOT PASSENGERS ONLY" always excludes.
/// Unknown shapes are logged and treated as informational.
fn is_sailing_excluded_on_date(comment: &str, date: NaiveDate) -> bool {
    let comment = comment.trim();
    if comment.is_empty() {
        return false;
    }
    let upper = comment.to_uppercase();
    if upper == "FOOT PASSENGERS ONLY" {
        return true;
    }
    if upper.starts_with("ONLY") {
        return !matches_comment_date(&upper, date);
    }
    if upper.starts_with("EXCEPT") || upper.starts_with("NOT AVAILABLE") {
        return matches_comment_date(&upper, date);
    }
    tracing::warn!("unknown sailing comment: '{comment}'");
    false
}

fn month_number(token: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|month| *month == token)
        .map(|index| index as u32 + 1)
}

/// Whether any date listed in an (uppercased) comment matches `date`'s
/// month and day. Tokens separate on comma, period, ampersand, and " ON ";
/// a bare month sets the month for following day numbers; "01 JAN" and
/// "JAN 1" two-word forms are accepted.
fn matches_comment_date(comment: &str, date: NaiveDate) -> bool {
    let mut normalized = comment.to_string();
    for separator in [".", "&", " ON ", " ON:"] {
        normalized = normalized.replace(separator, ",");
    }
    let tokens = normalized
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter(|token| {
            !matches!(
                *token,
                "ONLY" | "EXCEPT" | "NOT AVAILABLE" | "FOOT PASSENGERS ONLY"
            )
        });

    let mut month: Option<u32> = None;
    for token in tokens {
        if let Some(number) = month_number(token) {
            month = Some(number);
            continue;
        }
        let candidate: Option<(u32, u32)> = if let Ok(day) = token.parse::<u32>() {
            match month {
                Some(month) => Some((month, day)),
                None => {
                    tracing::warn!(
                        "failed to parse schedule dates: no month for '{token}' in '{comment}'"
                    );
                    return false;
                }
            }
        } else {
            let words: Vec<&str> = token.split(' ').collect();
            if words.len() == 2
                && let (Ok(day), Some(number)) = (words[0].parse::<u32>(), month_number(words[1]))
            {
                Some((number, day))
            } else if words.len() == 2
                && let (Some(number), Ok(day)) = (month_number(words[0]), words[1].parse::<u32>())
            {
                month = Some(number);
                Some((number, day))
            } else {
                tracing::warn!(
                    "failed to parse schedule dates: unknown word '{token}' in '{comment}'"
                );
                None
            }
        };
        match candidate {
            Some((month, day)) if date.month() == month && date.day() == day => return true,
            Some(_) => {}
            None => break,
        }
    }
    false
}

/// Index of the first date-range href containing `date`.
fn seasonal_daterange_index(hrefs: &[String], date: NaiveDate) -> Option<usize> {
    hrefs.iter().position(|href| {
        seasonal_daterange_from_href(href).is_some_and(|(from, to)| date >= from && date <= to)
    })
}

/// The `...YYYYMMDD-YYYYMMDD` tail of a date-range href.
fn seasonal_daterange_from_href(href: &str) -> Option<(NaiveDate, NaiveDate)> {
    let normalized = href.replace('=', "-").replace('_', "-");
    let parts: Vec<&str> = normalized.split('-').collect();
    if parts.len() < 2 {
        return None;
    }
    let from = NaiveDate::parse_from_str(parts[parts.len() - 2], "%Y%m%d").ok()?;
    let to = NaiveDate::parse_from_str(parts[parts.len() - 1], "%Y%m%d").ok()?;
    Some((from, to))
}
