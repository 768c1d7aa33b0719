//! Nominatim / OpenStreetMap geocoder client.
//!
//! The public instance allows at most one request per second; lookups here
//! are user-initiated, one per action, so no client-side throttling is done.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use crate::{GeocodeError, GeocodedPoint};

/// Geocodes a free-form query (address, landmark, intersection) using the
/// Nominatim search endpoint.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request fails, the service responds
/// with an error status, or the response can't be parsed.
pub async fn geocode_freeform(
    client: &reqwest::Client,
    base_url: &str,
    query: &str,
    limit: u32,
) -> Result<Option<GeocodedPoint>, GeocodeError> {
    let limit = limit.to_string();
    let resp = client
        .get(base_url)
        .query(&[("q", query), ("format", "json"), ("limit", limit.as_str())])
        .send()
        .await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }

    let body: serde_json::Value = resp.error_for_status()?.json().await?;
    parse_response(&body)
}

/// Parses Nominatim JSON response, taking the first result.
pub(crate) fn parse_response(
    body: &serde_json::Value,
) -> Result<Option<GeocodedPoint>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = coordinate(&first["lat"]).ok_or_else(|| GeocodeError::Parse {
        message: "Missing lat in Nominatim response".to_string(),
    })?;

    let lon = coordinate(&first["lon"]).ok_or_else(|| GeocodeError::Parse {
        message: "Missing lon in Nominatim response".to_string(),
    })?;

    let display_name = first["display_name"].as_str().map(String::from);

    Ok(Some(GeocodedPoint {
        latitude: lat,
        longitude: lon,
        display_name,
    }))
}

/// Nominatim returns coordinates as strings; accept plain numbers too.
fn coordinate(value: &serde_json::Value) -> Option<f64> {
    value
        .as_str()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .or_else(|| value.as_f64())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nominatim_result() {
        let body = serde_json::json!([{
            "lat": "40.7484421",
            "lon": "-73.9856589",
            "display_name": "Empire State Building, 350, 5th Avenue, Manhattan, New York"
        }]);
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.latitude - 40.748_442_1).abs() < 1e-7);
        assert!((result.longitude - -73.985_658_9).abs() < 1e-7);
        assert!(
            result
                .display_name
                .as_deref()
                .is_some_and(|n| n.starts_with("Empire State"))
        );
    }

    #[test]
    fn parses_nominatim_empty() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn takes_first_of_several_results() {
        let body = serde_json::json!([
            { "lat": "40.7", "lon": "-73.9" },
            { "lat": "41.0", "lon": "-74.0" }
        ]);
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.latitude - 40.7).abs() < 1e-12);
        assert!(result.display_name.is_none());
    }

    #[test]
    fn accepts_numeric_coordinates() {
        let body = serde_json::json!([{ "lat": 40.7, "lon": -73.9 }]);
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.longitude - -73.9).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_array_and_missing_coordinates() {
        let body = serde_json::json!({ "error": "Unable to geocode" });
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));

        let body = serde_json::json!([{ "lat": "40.7" }]);
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));

        let body = serde_json::json!([{ "lat": "north", "lon": "-73.9" }]);
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }
}
