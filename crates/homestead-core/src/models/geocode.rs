use serde::{Deserialize, Serialize};

/// Forward geocoding input. Empty parts are skipped when the query string is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodeQuery {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl GeocodeQuery {
    pub fn new(
        address: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        zip: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            city: city.into(),
            state: state.into(),
            zip: zip.into(),
        }
    }

    /// Single-line address, e.g. `123 Main St, Tulsa, OK, 74103`.
    pub fn one_line(&self) -> String {
        [&self.address, &self.city, &self.state, &self.zip]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn is_empty(&self) -> bool {
        self.one_line().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Reverse geocoding output. Missing components are empty strings, never absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponents {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub formatted: String,
}

/// Joins a house number and street name, tolerating either being empty.
pub fn join_street(number: &str, street: &str) -> String {
    format!("{} {}", number.trim(), street.trim()).trim().to_string()
}
