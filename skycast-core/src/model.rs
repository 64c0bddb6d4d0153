use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

/// Present conditions for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    /// City name as echoed by the upstream service.
    pub name: String,
    pub temperature_c: f64,
    pub humidity_pct: u8,
    pub description: String,
    /// Short label, e.g. "Clouds".
    pub condition: String,
    pub icon: String,
}

impl CurrentWeather {
    pub fn icon_url(&self) -> String {
        format!("{ICON_BASE_URL}/{}@4x.png", self.icon)
    }

    pub fn rounded_temperature(&self) -> i64 {
        self.temperature_c.round() as i64
    }
}

/// One representative (midday) sample of a forecast day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub temperature_c: f64,
    pub icon: String,
    pub summary: String,
    pub description: String,
}

impl ForecastDay {
    pub fn icon_url(&self) -> String {
        format!("{ICON_BASE_URL}/{}@2x.png", self.icon)
    }

    pub fn rounded_temperature(&self) -> i64 {
        self.temperature_c.round() as i64
    }
}

/// A geocoding match offered as an autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    pub country: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl PlaceCandidate {
    pub fn new(name: &str, state: Option<&str>, country: &str) -> Self {
        Self {
            name: name.to_string(),
            state: state.map(str::to_string),
            country: country.to_string(),
            lat: None,
            lon: None,
        }
    }

    /// "Name, State, CC" or "Name, CC". This is also the text submitted when picked.
    pub fn display_name(&self) -> String {
        match self.state.as_deref() {
            Some(state) if !state.is_empty() => {
                format!("{}, {}, {}", self.name, state, self.country)
            }
            _ => format!("{}, {}", self.name, self.country),
        }
    }
}

impl std::fmt::Display for PlaceCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PlaceCandidate::new("Springfield", Some("Illinois"), "US"), "Springfield, Illinois, US")]
    #[case(PlaceCandidate::new("London", None, "GB"), "London, GB")]
    #[case(PlaceCandidate::new("Paris", Some(""), "FR"), "Paris, FR")]
    fn display_name_includes_state_only_when_present(
        #[case] candidate: PlaceCandidate,
        #[case] expected: &str,
    ) {
        assert_eq!(candidate.display_name(), expected);
        assert_eq!(candidate.to_string(), expected);
    }

    #[test]
    fn icon_urls_use_size_variants() {
        let current = CurrentWeather {
            name: "London".into(),
            temperature_c: 15.6,
            humidity_pct: 70,
            description: "clear sky".into(),
            condition: "Clear".into(),
            icon: "01d".into(),
        };
        assert_eq!(current.icon_url(), "https://openweathermap.org/img/wn/01d@4x.png");
        assert_eq!(current.rounded_temperature(), 16);

        let day = ForecastDay {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            temperature_c: -2.5,
            icon: "13d".into(),
            summary: "Snow".into(),
            description: "light snow".into(),
        };
        assert_eq!(day.icon_url(), "https://openweathermap.org/img/wn/13d@2x.png");
        assert_eq!(day.rounded_temperature(), -3);
    }
}
