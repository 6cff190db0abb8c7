//! Activity Streams objects and serde helpers.

mod note;

pub use note::{ApNote, ApTag};

use serde::{Deserialize, Deserializer};
use url::Url;

/// The Activity Streams public addressing collection.
pub const PUBLIC: &str = "https://www.w3.org/ns/activitystreams#Public";

/// The base JSON-LD context for all emitted activities.
pub const ACTIVITYSTREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";

/// Deserialize a field that is either a bare value or an array of values.
pub fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// Deserialize an actor reference that is either a URI string or an
/// embedded object carrying an `id`.
pub fn url_or_embedded<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum UrlOrEmbedded {
        Uri(Url),
        Embedded { id: Url },
    }

    Ok(match UrlOrEmbedded::deserialize(deserializer)? {
        UrlOrEmbedded::Uri(url) | UrlOrEmbedded::Embedded { id: url } => url,
    })
}
