//! Catalog records and request payloads
//!
//! Request bodies are deserialized leniently into `*Payload` structs and then
//! validated into the typed inputs the store accepts. Validation failures are
//! reported as unprocessable by the API layer.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Date formats accepted in request bodies, tried in order
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%Y/%m/%d",
    "%m/%d/%Y",
];

/// A field in a request body failed validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is absent, null or blank
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// The value is not a recognizable calendar date
    #[error("invalid date {0:?}")]
    InvalidDate(String),

    /// The gender is not one of M, F or X
    #[error("invalid gender {0:?}: expected M, F or X")]
    InvalidGender(String),
}

/// Parse a calendar date written as `1992-11-19`, `November 19, 1992`,
/// `Nov 19 1992`, `19 November 1992`, a slash form or an RFC 3339 timestamp
pub fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .ok_or_else(|| ValidationError::InvalidDate(input.to_string()))
}

/// Actor gender, stored upper case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    /// Male
    M,
    /// Female
    F,
    /// Other or unspecified
    X,
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "M" => Ok(Self::M),
            "F" => Ok(Self::F),
            "X" => Ok(Self::X),
            _ => Err(ValidationError::InvalidGender(s.to_string())),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::M => "M",
            Self::F => "F",
            Self::X => "X",
        };
        f.write_str(code)
    }
}

/// A stored actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Identifier assigned by the store
    pub actor_id: u64,
    /// Unique (case-insensitive) name
    pub name: String,
    /// Birth date, serialized as `YYYY-MM-DD`
    pub birth_date: NaiveDate,
    /// Gender code
    pub gender: Gender,
}

/// A stored movie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    /// Identifier assigned by the store
    pub movie_id: u64,
    /// Unique (case-insensitive) title
    pub title: String,
    /// Release date, serialized as `YYYY-MM-DD`
    pub release_date: NaiveDate,
}

/// Validated input for a new actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActor {
    pub name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
}

/// Validated partial update of an actor; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorChanges {
    pub name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
}

/// Validated input for a new movie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovie {
    pub title: String,
    pub release_date: NaiveDate,
}

/// Validated partial update of a movie
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieChanges {
    pub title: Option<String>,
    pub release_date: Option<NaiveDate>,
}

/// Actor fields as sent by clients
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

impl ActorPayload {
    /// Validate for creation; every field is required
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a missing field, an unparseable date or
    /// an unknown gender.
    pub fn into_new(self) -> Result<NewActor, ValidationError> {
        let name = required(self.name, "name")?;
        let birth_date = parse_date(&required(self.birth_date, "birth_date")?)?;
        let gender: Gender = required(self.gender, "gender")?.parse()?;
        Ok(NewActor {
            name,
            birth_date,
            gender,
        })
    }

    /// Validate for a partial update; only supplied fields are checked
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a blank name, an unparseable date or
    /// an unknown gender.
    pub fn into_changes(self) -> Result<ActorChanges, ValidationError> {
        Ok(ActorChanges {
            name: self.name.map(|name| required(Some(name), "name")).transpose()?,
            birth_date: self.birth_date.as_deref().map(parse_date).transpose()?,
            gender: self.gender.as_deref().map(str::parse::<Gender>).transpose()?,
        })
    }
}

/// Movie fields as sent by clients
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoviePayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
}

impl MoviePayload {
    /// Validate for creation; every field is required
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a missing field or an unparseable date.
    pub fn into_new(self) -> Result<NewMovie, ValidationError> {
        let title = required(self.title, "title")?;
        let release_date = parse_date(&required(self.release_date, "release_date")?)?;
        Ok(NewMovie {
            title,
            release_date,
        })
    }

    /// Validate for a partial update
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a blank title or an unparseable date.
    pub fn into_changes(self) -> Result<MovieChanges, ValidationError> {
        Ok(MovieChanges {
            title: self
                .title
                .map(|title| required(Some(title), "title"))
                .transpose()?,
            release_date: self.release_date.as_deref().map(parse_date).transpose()?,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingField(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = date(1992, 11, 19);
        for input in [
            "1992-11-19",
            "November 19, 1992",
            "Nov 19, 1992",
            "november 19 1992",
            "19 November 1992",
            "1992/11/19",
            "11/19/1992",
            "1992-11-19T08:30:00Z",
            "  1992-11-19 ",
        ] {
            assert_eq!(parse_date(input), Ok(expected), "{input}");
        }
        assert_eq!(parse_date("July 4, 2021"), Ok(date(2021, 7, 4)));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        for input in ["", "yesterday", "1992-13-01", "February 30, 2021"] {
            assert!(matches!(parse_date(input), Err(ValidationError::InvalidDate(_))), "{input}");
        }
    }

    #[test]
    fn test_gender_is_case_insensitive_and_upper_cased() {
        assert_eq!("m".parse::<Gender>(), Ok(Gender::M));
        assert_eq!("F".parse::<Gender>(), Ok(Gender::F));
        assert_eq!("x".parse::<Gender>().unwrap().to_string(), "X");
        assert!("female".parse::<Gender>().is_err());
        assert_eq!(serde_json::to_value(Gender::F).unwrap(), json!("F"));
    }

    #[test]
    fn test_actor_serializes_with_iso_date() {
        let actor = Actor {
            actor_id: 1,
            name: "Jane Doe".into(),
            birth_date: date(1992, 11, 19),
            gender: Gender::F,
        };
        assert_eq!(
            serde_json::to_value(&actor).unwrap(),
            json!({"actor_id": 1, "name": "Jane Doe", "birth_date": "1992-11-19", "gender": "F"})
        );
    }

    #[test]
    fn test_new_actor_requires_every_field() {
        let payload: ActorPayload =
            serde_json::from_value(json!({"name": "Jane", "birth_date": "November 19, 1992"}))
                .unwrap();
        assert_eq!(payload.into_new(), Err(ValidationError::MissingField("gender")));

        let payload: ActorPayload =
            serde_json::from_value(json!({"name": "  ", "birth_date": "1992-11-19", "gender": "f"}))
                .unwrap();
        assert_eq!(payload.into_new(), Err(ValidationError::MissingField("name")));

        let payload: ActorPayload = serde_json::from_value(
            json!({"name": "Jane", "birth_date": "1992-11-19", "gender": "f"}),
        )
        .unwrap();
        assert_eq!(
            payload.into_new().unwrap(),
            NewActor {
                name: "Jane".into(),
                birth_date: date(1992, 11, 19),
                gender: Gender::F,
            }
        );
    }

    #[test]
    fn test_actor_changes_only_touch_supplied_fields() {
        let payload: ActorPayload = serde_json::from_value(json!({"gender": "x"})).unwrap();
        assert_eq!(
            payload.into_changes().unwrap(),
            ActorChanges {
                gender: Some(Gender::X),
                ..ActorChanges::default()
            }
        );

        let payload: ActorPayload = serde_json::from_value(json!({"birth_date": "soon"})).unwrap();
        assert!(matches!(
            payload.into_changes(),
            Err(ValidationError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_movie_payload() {
        let payload: MoviePayload =
            serde_json::from_value(json!({"title": "Heat", "release_date": "December 15, 1995"}))
                .unwrap();
        assert_eq!(
            payload.into_new().unwrap(),
            NewMovie {
                title: "Heat".into(),
                release_date: date(1995, 12, 15),
            }
        );

        let payload: MoviePayload = serde_json::from_value(json!({"release_date": null})).unwrap();
        assert_eq!(payload.into_changes().unwrap(), MovieChanges::default());

        let payload: MoviePayload = serde_json::from_value(json!({"title": "Heat"})).unwrap();
        assert_eq!(payload.into_new(), Err(ValidationError::MissingField("release_date")));
    }
}
