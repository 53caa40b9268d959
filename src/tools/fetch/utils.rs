use crate::config::SearchConfig;
use crate::error::FetchError;
use crate::types::SearchParams;
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use std::fmt::Write;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use url::Url;

/// Random-ish jitter in milliseconds within [0, range).
///
/// Uses high-resolution timing to generate pseudo-random jitter for
/// introducing variability in retry delays and request timing.
pub(crate) fn jitter_ms(range: u64) -> u64 {
    if range == 0 {
        return 0;
    }
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_nanos(0));
    let nanos = now.subsec_nanos() as u64;
    let micros = (now.as_micros() & 0xFFFF) as u64;
    (nanos ^ (micros << 5)) % range
}

/// Whether `fmt` is a strftime pattern chrono can render.
pub fn is_valid_date_format(fmt: &str) -> bool {
    !fmt.is_empty() && !StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error))
}

fn format_date(date: NaiveDate, fmt: &str) -> Result<String, FetchError> {
    let bad = || FetchError::InvalidUrl(format!("unusable date format {fmt:?}"));
    if !is_valid_date_format(fmt) {
        return Err(bad());
    }
    let mut out = String::new();
    // time fields fail here: a date has none
    write!(out, "{}", date.format(fmt)).map_err(|_| bad())?;
    Ok(out)
}

/// Append dates and guests to `base`, keeping its existing query.
///
/// Existing pairs that use one of the managed names are replaced, so a pasted
/// search link with stale dates is corrected instead of duplicated.
pub fn build_search_url(
    base: &str,
    params: &SearchParams,
    search: &SearchConfig,
) -> Result<String, FetchError> {
    let mut url = Url::parse(base).map_err(|_| FetchError::InvalidUrl(base.to_string()))?;
    let checkin = format_date(params.checkin, &search.date_format)?;
    let checkout = format_date(params.checkout, &search.date_format)?;

    let managed = [
        search.checkin_param.as_str(),
        search.checkout_param.as_str(),
        search.occupancy_param.as_str(),
    ];
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| {
            let k: &str = k;
            !managed.contains(&k) && !search.extra.contains_key(k)
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(&search.checkin_param, &checkin);
        pairs.append_pair(&search.checkout_param, &checkout);
        pairs.append_pair(&search.occupancy_param, &params.occupancy.to_string());
        for (k, v) in &search.extra {
            pairs.append_pair(k, v);
        }
    }

    Ok(url.to_string())
}

/// `scheme://host[:port]/` of a URL, used as a same-site Referer.
pub(crate) fn origin_of(url: &str) -> Option<String> {
    let u = Url::parse(url).ok()?;
    let host = u.host_str()?;
    Some(match u.port() {
        Some(port) => format!("{}://{}:{}/", u.scheme(), host, port),
        None => format!("{}://{}/", u.scheme(), host),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{parse_date, Occupancy};

    fn params() -> SearchParams {
        SearchParams::new(
            parse_date("2025-10-10").unwrap(),
            parse_date("2025-10-15").unwrap(),
            Occupancy::new(2).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn appends_iso_dates_by_default() {
        let url = build_search_url(
            "https://hotel.example.com/rooms",
            &params(),
            &SearchConfig::default(),
        )
        .unwrap();
        assert_eq!(
            url,
            "https://hotel.example.com/rooms?checkin=2025-10-10&checkout=2025-10-15&adults=2"
        );
    }

    #[test]
    fn preserves_existing_query_and_replaces_managed_keys() {
        let url = build_search_url(
            "https://hotel.example.com/plans/1?room_id=10011842&checkin=2020-01-01",
            &params(),
            &SearchConfig::default(),
        )
        .unwrap();
        assert_eq!(
            url,
            "https://hotel.example.com/plans/1?room_id=10011842&checkin=2025-10-10&checkout=2025-10-15&adults=2"
        );
    }

    #[test]
    fn honours_custom_names_format_and_extras() {
        let mut search = SearchConfig {
            checkin_param: "checkin_date".into(),
            checkout_param: "checkout_date".into(),
            date_format: "%Y%m%d".into(),
            ..SearchConfig::default()
        };
        search.extra.insert("rooms".into(), "1".into());
        let url = build_search_url(
            "https://go-landabout.reservation.jp/ja/plans/10153436",
            &params(),
            &search,
        )
        .unwrap();
        assert_eq!(
            url,
            "https://go-landabout.reservation.jp/ja/plans/10153436?checkin_date=20251010&checkout_date=20251015&adults=2&rooms=1"
        );
    }

    #[test]
    fn rejects_garbage_base() {
        assert!(matches!(
            build_search_url("::nope", &params(), &SearchConfig::default()),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn unusable_date_format_is_an_error() {
        for fmt in ["%Q", "%Y-%m-%d %H:%M", ""] {
            let search = SearchConfig {
                date_format: fmt.into(),
                ..SearchConfig::default()
            };
            assert!(
                matches!(
                    build_search_url("https://hotel.example.com/", &params(), &search),
                    Err(FetchError::InvalidUrl(_))
                ),
                "{fmt:?}"
            );
        }
        assert!(is_valid_date_format("%Y/%m/%d"));
        assert!(!is_valid_date_format("%Q"));
    }

    #[test]
    fn origin_keeps_port() {
        assert_eq!(
            origin_of("http://127.0.0.1:8080/a?b=c").as_deref(),
            Some("http://127.0.0.1:8080/")
        );
        assert_eq!(
            origin_of("https://example.com/x").as_deref(),
            Some("https://example.com/")
        );
    }

    #[test]
    fn jitter_returns_within_range() {
        for _ in 0..100 {
            assert!(jitter_ms(100) < 100);
        }
        assert_eq!(jitter_ms(0), 0);
    }
}
