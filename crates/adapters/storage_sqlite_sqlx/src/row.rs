//! Column encoding shared by the repositories.

use chrono::SecondsFormat;

use homebus_domain::time::Timestamp;

/// Fixed-width UTC text, so that lexical order matches time order.
pub(crate) fn encode_timestamp(timestamp: Timestamp) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(text: &str) -> Result<Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(text)
        .map(|timestamp| timestamp.to_utc())
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

pub(crate) fn decode<T, E>(value: Result<T, E>) -> Result<T, sqlx::Error>
where
    E: std::error::Error + Send + Sync + 'static,
{
    value.map_err(|err| sqlx::Error::Decode(Box::new(err)))
}
