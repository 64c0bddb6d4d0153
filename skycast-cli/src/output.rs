use std::fmt::Write;

use skycast_core::{PlaceCandidate, SessionState};

pub fn render_weather(state: &SessionState) -> String {
    let mut out = String::new();

    if let Some(error) = &state.error {
        let _ = writeln!(out, "{error}");
        return out;
    }

    if let Some(current) = &state.current {
        let _ = writeln!(out, "{}", current.name);
        let _ = writeln!(out, "  {}°C, {}", current.rounded_temperature(), current.description);
        let _ = writeln!(out, "  Humidity: {}%", current.humidity_pct);
        let _ = writeln!(out, "  Icon: {}", current.icon_url());
    }

    // Only shown when the forecast request succeeded.
    if !state.forecast.is_empty() {
        let _ = writeln!(out, "\n5-Day Forecast");
        for day in &state.forecast {
            let _ = writeln!(
                out,
                "  {}  {:>4}°C  {}",
                day.date.format("%a %d %b"),
                day.rounded_temperature(),
                day.summary
            );
        }
    }

    out
}

pub fn render_suggestions(places: &[PlaceCandidate]) -> String {
    if places.is_empty() {
        return "No matching cities.\n".to_string();
    }

    places
        .iter()
        .enumerate()
        .map(|(i, place)| format!("{:>2}. {place}\n", i + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use skycast_core::{CurrentWeather, ForecastDay};

    fn london() -> CurrentWeather {
        CurrentWeather {
            name: "London".into(),
            temperature_c: 15.2,
            humidity_pct: 70,
            description: "clear sky".into(),
            condition: "Clear".into(),
            icon: "01d".into(),
        }
    }

    #[test]
    fn weather_without_forecast_hides_forecast_panel() {
        let state = SessionState {
            current: Some(london()),
            ..Default::default()
        };

        let text = render_weather(&state);
        assert!(text.starts_with("London\n"));
        assert!(text.contains("15°C, clear sky"));
        assert!(text.contains("Humidity: 70%"));
        assert!(!text.contains("5-Day Forecast"));
    }

    #[test]
    fn weather_with_forecast_lists_each_day() {
        let state = SessionState {
            current: Some(london()),
            forecast: vec![ForecastDay {
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                temperature_c: 18.6,
                icon: "02d".into(),
                summary: "Clouds".into(),
                description: "few clouds".into(),
            }],
            ..Default::default()
        };

        let text = render_weather(&state);
        assert!(text.contains("5-Day Forecast"));
        assert!(text.contains("Wed 01 May"));
        assert!(text.contains("19°C  Clouds"));
    }

    #[test]
    fn error_replaces_weather_output() {
        let state = SessionState {
            error: Some("City not found or error fetching data".into()),
            ..Default::default()
        };

        assert_eq!(render_weather(&state), "City not found or error fetching data\n");
    }

    #[test]
    fn suggestions_are_numbered() {
        let places = vec![
            PlaceCandidate::new("London", Some("England"), "GB"),
            PlaceCandidate::new("London", None, "CA"),
        ];

        assert_eq!(
            render_suggestions(&places),
            " 1. London, England, GB\n 2. London, CA\n"
        );
        assert_eq!(render_suggestions(&[]), "No matching cities.\n");
    }
}
