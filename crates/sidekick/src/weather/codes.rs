/// A WMO weather interpretation code, as reported by Open-Meteo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Conditions {
    pub main: &'static str,
    pub description: &'static str,
}

const UNKNOWN: Conditions = Conditions {
    main: "Unknown",
    description: "unknown conditions",
};

/// Maps a WMO code to its conditions. Codes outside the table are
/// reported as unknown.
pub fn describe(code: i64) -> Conditions {
    let (main, description) = match code {
        0 => ("Clear", "clear sky"),
        1 => ("Mainly Clear", "mainly clear"),
        2 => ("Partly Cloudy", "partly cloudy"),
        3 => ("Overcast", "overcast"),
        45 => ("Foggy", "fog"),
        48 => ("Foggy", "depositing rime fog"),
        51 => ("Drizzle", "light drizzle"),
        53 => ("Drizzle", "moderate drizzle"),
        55 => ("Drizzle", "dense drizzle"),
        61 => ("Rain", "slight rain"),
        63 => ("Rain", "moderate rain"),
        65 => ("Rain", "heavy rain"),
        71 => ("Snow", "slight snow"),
        73 => ("Snow", "moderate snow"),
        75 => ("Snow", "heavy snow"),
        77 => ("Snow", "snow grains"),
        80 => ("Rain Showers", "slight rain showers"),
        81 => ("Rain Showers", "moderate rain showers"),
        82 => ("Rain Showers", "violent rain showers"),
        85 => ("Snow Showers", "slight snow showers"),
        86 => ("Snow Showers", "heavy snow showers"),
        95 => ("Thunderstorm", "thunderstorm"),
        96 => ("Thunderstorm", "thunderstorm with slight hail"),
        99 => ("Thunderstorm", "thunderstorm with heavy hail"),
        _ => return UNKNOWN,
    };
    Conditions { main, description }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert_eq!(
            describe(0),
            Conditions {
                main: "Clear",
                description: "clear sky"
            }
        );
        assert_eq!(describe(99).description, "thunderstorm with heavy hail");
        for code in [-1, 4, 100, 1000] {
            assert_eq!(describe(code), UNKNOWN);
        }
    }
}
