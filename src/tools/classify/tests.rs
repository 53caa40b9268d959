#[cfg(test)]
mod tests {
    use crate::config::ClassifierConfig;
    use crate::tools::classify::utils::*;
    use crate::tools::classify::*;
    use crate::types::Rule;

    const FILLER: &str = "lorem ipsum dolor sit amet ";

    fn page(title: &str, body: &str, filler_reps: usize) -> String {
        format!(
            "<html><head><title>{title}</title></head><body>{body}<p>{}</p></body></html>",
            FILLER.repeat(filler_reps)
        )
    }

    fn classifier() -> Classifier {
        Classifier::new(ClassifierConfig::default())
    }

    #[test]
    fn test_short_content_is_anomaly() {
        let c = classifier();
        for content in ["", "<p>Book now</p>"] {
            let v = c.classify(content);
            assert!(!v.available);
            assert_eq!(v.rule, Rule::PageLoadAnomaly);
            assert_eq!(v.reason, PAGE_LOAD_ANOMALY);
        }
    }

    #[test]
    fn test_anomaly_beats_positive_text() {
        let content = "Book now! Select your room here today!!!";
        assert_eq!(content.chars().count(), 40);
        let v = classifier().classify(content);
        assert!(!v.available);
        assert_eq!(v.reason, "page load anomaly");
    }

    #[test]
    fn test_forty_chars_with_keywords_is_anomaly() {
        let content = "<p>Book now</p><p>Select your room</p>!!";
        assert_eq!(content.chars().count(), 40);
        let v = classifier().classify(content);
        assert!(!v.available);
        assert_eq!(v.rule, Rule::PageLoadAnomaly);
        assert_eq!(v.reason, "page load anomaly");
    }

    #[test]
    fn test_unavailable_is_not_a_positive() {
        let content = page(
            "Hotel A",
            "<p>This room is unavailable for your dates.</p>",
            5,
        );
        let v = classifier().classify(&content);
        assert!(!v.available);
        assert_eq!(v.rule, Rule::NegativeIndicator);
        assert_eq!(v.reason, "negative indicators: unavailable");

        let cfg = ClassifierConfig {
            negative_indicators: vec![],
            ..ClassifierConfig::default()
        };
        let v = classify(&content, &cfg);
        assert!(!v.available);
        assert_ne!(v.rule, Rule::PositiveIndicator);
    }

    #[test]
    fn test_negative_beats_positive() {
        let content = page(
            "Lorem",
            "<p>Sold out. No rooms available.</p><a href='/r'>Book now</a>",
            5,
        );
        let v = classifier().classify(&content);
        assert!(!v.available);
        assert_eq!(v.rule, Rule::NegativeIndicator);
        assert_eq!(v.reason, "negative indicators: sold out, no rooms available");
    }

    #[test]
    fn test_japanese_negative() {
        let content = page("ホテル", "<p>ご指定の日程は満室です</p>", 5);
        let v = classifier().classify(&content);
        assert!(!v.available);
        assert!(v.reason.contains("満室"));
    }

    #[test]
    fn test_negative_ignores_script_text() {
        let content = page(
            "Lorem",
            "<script>var label = 'sold out';</script><p>Select your room</p>",
            5,
        );
        let v = classifier().classify(&content);
        assert!(v.available);
        assert_eq!(v.rule, Rule::PositiveIndicator);
    }

    #[test]
    fn test_positive_indicators_in_list_order() {
        let content = page("Lorem", "<h2>Select your room</h2><p>Book now</p>", 5);
        let v = classifier().classify(&content);
        assert!(v.available);
        assert_eq!(v.rule, Rule::PositiveIndicator);
        assert_eq!(v.reason, "positive indicators: book now, select your room");
    }

    #[test]
    fn test_padded_book_now_is_available() {
        let content = format!("Book Now! Select your room. {}", FILLER.repeat(4));
        assert!(content.chars().count() > 100);
        let v = classifier().classify(&content);
        assert!(v.available);
        assert!(v.reason.starts_with("positive indicators"));
    }

    #[test]
    fn test_full_width_positive() {
        let content = page("Lorem", "<p>ＢＯＯＫ　ＮＯＷ</p>", 5);
        let v = classifier().classify(&content);
        assert!(v.available);
        assert!(v.reason.contains("book now"));
    }

    #[test]
    fn test_booking_selector() {
        let content = page(
            "Lorem",
            "<a class='c-button-reservation' href='/x'>&rarr;</a>",
            5,
        );
        let v = classifier().classify(&content);
        assert!(v.available);
        assert_eq!(v.rule, Rule::BookingAnchor);
        assert_eq!(v.reason, "booking element: a.c-button-reservation");
    }

    #[test]
    fn test_booking_button_text() {
        let content = page("Lorem", "<button type='button'>Reserve</button>", 5);
        let v = classifier().classify(&content);
        assert!(v.available);
        assert_eq!(v.rule, Rule::BookingAnchor);
        assert_eq!(v.reason, "booking link: \"reserve\"");
    }

    #[test]
    fn test_submit_input_value() {
        let content = page("Lorem", "<form><input type='submit' value='予約へ進む'></form>", 5);
        let v = classifier().classify(&content);
        assert_eq!(v.rule, Rule::BookingAnchor);
    }

    #[test]
    fn test_facebook_link_is_not_booking() {
        let content = page(
            "Lorem",
            "<a href='https://facebook.com/x'>Facebook</a>",
            5,
        );
        let v = classifier().classify(&content);
        assert!(!v.available);
        assert_eq!(v.rule, Rule::Inconclusive);
    }

    #[test]
    fn test_price_pattern() {
        let c = classifier();
        let v = c.classify(&page("Lorem", "<p>Deluxe Twin ¥12,000 per night</p>", 5));
        assert!(v.available);
        assert_eq!(v.rule, Rule::PricePattern);
        assert_eq!(v.reason, "price pattern: ¥12,000");

        let v = c.classify(&page("Lorem", "<p>Standard 12,000円</p>", 5));
        assert_eq!(v.reason, "price pattern: 12,000円");
    }

    #[test]
    fn test_ratings_and_distances_are_not_prices() {
        let content = page(
            "Lorem",
            "<p>Rated $4.8 / 5 from 120 reviews</p><p>¥3 km to the station</p>",
            5,
        );
        let v = classifier().classify(&content);
        assert!(!v.available);
        assert_eq!(v.rule, Rule::Inconclusive);
    }

    #[test]
    fn test_availability_table() {
        let content = page(
            "Lorem",
            "<table><tr><td>Twin</td><td>予約</td></tr></table>",
            5,
        );
        let v = classifier().classify(&content);
        assert!(v.available);
        assert_eq!(v.rule, Rule::AvailabilityTable);
        assert_eq!(v.reason, "availability table mentions \"予約\"");
    }

    #[test]
    fn test_fallback_positive_on_substantial_hotel_page() {
        let content = page("Hotel Landabout Tokyo", "", 40);
        let v = classifier().classify(&content);
        assert!(v.available);
        assert_eq!(v.rule, Rule::FallbackPositive);
        assert_eq!(v.reason, FALLBACK_POSITIVE);
    }

    #[test]
    fn test_fallback_blocked() {
        let c = classifier();

        let v = c.classify(&page("Hotel Landabout - Error", "", 40));
        assert_eq!(v.rule, Rule::Inconclusive);

        let challenged = page(
            "Hotel Landabout",
            "<div id='cf-browser-verification'></div>",
            40,
        );
        assert_eq!(c.classify(&challenged).rule, Rule::Inconclusive);

        let short = page("Hotel Landabout", "", 10);
        assert!(short.chars().count() < 1_000);
        let v = c.classify(&short);
        assert!(!v.available);
        assert_eq!(v.reason, INCONCLUSIVE);

        let cfg = ClassifierConfig {
            fallback_positive: false,
            ..ClassifierConfig::default()
        };
        let v = classify(&page("Hotel Landabout", "", 40), &cfg);
        assert_eq!(v.rule, Rule::Inconclusive);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let c = classifier();
        let content = page("Hotel", "<p>Deluxe Twin ¥12,000</p>", 5);
        assert_eq!(c.classify(&content), c.classify(&content));
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("booking page", "book"));
        assert!(contains_word("please book", "book"));
        assert!(!contains_word("facebook", "book"));
        assert!(contains_word("今すぐ予約", "予約"));
    }

    #[test]
    fn test_price_regex_without_markers() {
        assert!(price_regex(&[]).is_none());
        assert_eq!(find_price("12,000", None), None);
    }
}
