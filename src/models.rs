//! Data models for the review board.
//!
//! Targets are the people or places being rated, reviews are single
//! rating + comment submissions against a target. Both mirror the rows of
//! the `targets` and `reviews` tables one to one.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Identifier assigned by the store to a target row.
pub type TargetId = i64;

/// Identifier assigned by the store to a review row.
pub type ReviewId = i64;

/// Input errors caught before anything reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name is required.")]
    NameRequired,

    #[error(
        "Rating must be between {min} and {max}, got {0}",
        min = Rating::MIN,
        max = Rating::MAX
    )]
    RatingOutOfRange(i64),

    #[error("Rating must be a whole number, got {0}")]
    RatingNotANumber(String),

    #[error("Pick who you want to review.")]
    TargetRequired,

    #[error("Category is required.")]
    RoleRequired,

    #[error("Unknown category: {0}")]
    UnknownRole(String),
}

/// Category a target belongs to.
///
/// The serialized names are the labels stored in the `role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Professor")]
    Professor,
    #[serde(rename = "Aluno")]
    Student,
    #[serde(rename = "Funcionário")]
    Staff,
    #[serde(rename = "Lugar/Comida")]
    PlaceOrFood,
    #[serde(rename = "Outro")]
    Other,
}

impl Role {
    /// All categories, in the order the registration form lists them.
    pub const ALL: [Role; 5] = [
        Role::Professor,
        Role::Student,
        Role::Staff,
        Role::PlaceOrFood,
        Role::Other,
    ];

    /// The label stored in the database and shown in the UI.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Professor => "Professor",
            Role::Student => "Aluno",
            Role::Staff => "Funcionário",
            Role::PlaceOrFood => "Lugar/Comida",
            Role::Other => "Outro",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" => Err(ValidationError::RoleRequired),
            "professor" | "teacher" => Ok(Role::Professor),
            "aluno" | "student" => Ok(Role::Student),
            "funcionário" | "funcionario" | "staff" => Ok(Role::Staff),
            "lugar/comida" | "place/food" | "place" | "food" => Ok(Role::PlaceOrFood),
            "outro" | "other" => Ok(Role::Other),
            _ => Err(ValidationError::UnknownRole(s.trim().to_string())),
        }
    }
}

/// A rating on the 1 to 5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Create a rating, rejecting values outside `1..=5`.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::RatingOutOfRange(value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// How the rating reads at a glance.
    pub fn tone(&self) -> Tone {
        match self.0 {
            4.. => Tone::Good,
            0..=2 => Tone::Bad,
            _ => Tone::Neutral,
        }
    }
}

impl Default for Rating {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<i64> for Rating {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for Rating {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let value: i64 = s
            .parse()
            .map_err(|_| ValidationError::RatingNotANumber(s.to_string()))?;
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Traffic-light reading of a rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Neutral,
    Bad,
}

impl Tone {
    pub fn emoji(&self) -> &'static str {
        match self {
            Tone::Good => "🟢",
            Tone::Neutral => "🟡",
            Tone::Bad => "🔴",
        }
    }
}

/// A registered person or entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub name: String,
    /// Labels outside the known categories are read as [`Role::Other`].
    #[serde(default = "other_role", deserialize_with = "lenient_role")]
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub department: String,
}

/// Payload for registering a target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTarget {
    pub name: String,
    pub role: Role,
    pub department: String,
}

impl NewTarget {
    /// Build a registration, trimming inputs. The name must not be blank.
    pub fn new(name: &str, role: Role, department: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::NameRequired);
        }

        Ok(Self {
            name: name.to_string(),
            role,
            department: department.trim().to_string(),
        })
    }
}

/// A single rating + comment submitted against a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub target_id: TargetId,
    pub rating: Rating,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comment: String,
    /// `None` when the store sent no timestamp or one we could not read.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for submitting a review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReview {
    pub target_id: TargetId,
    pub rating: Rating,
    pub comment: String,
}

impl NewReview {
    pub fn new(target_id: TargetId, rating: Rating, comment: &str) -> Self {
        Self {
            target_id,
            rating,
            comment: comment.trim().to_string(),
        }
    }
}

/// Format a review timestamp as `dd/mm/yyyy`.
pub fn format_review_date(created_at: Option<DateTime<Utc>>) -> Option<String> {
    created_at.map(|ts| ts.format("%d/%m/%Y").to_string())
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn other_role() -> Role {
    Role::Other
}

/// The `role` column is free text in the table; only the forms restrict it.
fn lenient_role<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw.parse().unwrap_or_else(|_| {
        warn!("Unknown category {:?} in targets table, reading it as {}", raw, Role::Other);
        Role::Other
    }))
}

/// Accepts RFC 3339 (`timestamptz`) and offset-less (`timestamp`) values;
/// anything else becomes `None` instead of failing the whole row.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert_eq!(Rating::new(1).unwrap().value(), 1);
        assert_eq!(Rating::new(5).unwrap().value(), 5);
        assert_eq!(Rating::default().value(), 3);
        assert_eq!(
            Rating::new(-2),
            Err(ValidationError::RatingOutOfRange(-2))
        );
    }

    #[test]
    fn test_rating_from_text() {
        assert_eq!(" 4 ".parse::<Rating>().map(|r| r.value()), Ok(4));
        assert_eq!("7".parse::<Rating>(), Err(ValidationError::RatingOutOfRange(7)));
        assert_eq!(
            "abc".parse::<Rating>(),
            Err(ValidationError::RatingNotANumber("abc".to_string()))
        );
    }

    #[test]
    fn test_rating_tone() {
        assert_eq!(Rating::new(5).unwrap().tone(), Tone::Good);
        assert_eq!(Rating::new(4).unwrap().tone(), Tone::Good);
        assert_eq!(Rating::new(3).unwrap().tone(), Tone::Neutral);
        assert_eq!(Rating::new(2).unwrap().tone(), Tone::Bad);
        assert_eq!(Rating::new(1).unwrap().tone().emoji(), "🔴");
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Professor".parse::<Role>(), Ok(Role::Professor));
        assert_eq!("aluno".parse::<Role>(), Ok(Role::Student));
        assert_eq!("FUNCIONÁRIO".parse::<Role>(), Ok(Role::Staff));
        assert_eq!("Lugar/Comida".parse::<Role>(), Ok(Role::PlaceOrFood));
        assert_eq!(" other ".parse::<Role>(), Ok(Role::Other));
        assert_eq!(
            "Reitor".parse::<Role>(),
            Err(ValidationError::UnknownRole("Reitor".to_string()))
        );
        assert_eq!("  ".parse::<Role>(), Err(ValidationError::RoleRequired));
    }

    #[test]
    fn test_target_row_with_unlisted_role() {
        let json = r#"[
            {"id": 1, "name": "Ana", "role": "aluno", "department": "COMP"},
            {"id": 2, "name": "Zeca", "role": "Coordenador", "department": "DEX"},
            {"id": 3, "name": "RU", "role": null}
        ]"#;

        let targets: Vec<Target> = serde_json::from_str(json).unwrap();
        assert_eq!(targets[0].role, Role::Student);
        assert_eq!(targets[1].role, Role::Other);
        assert_eq!(targets[1].department, "DEX");
        assert_eq!(targets[2].role, Role::Other);
    }

    #[test]
    fn test_role_labels_round_trip_through_serde() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.label()));
            assert_eq!(serde_json::from_str::<Role>(&json).unwrap(), role);
        }
    }

    #[test]
    fn test_new_target_requires_name() {
        assert_eq!(
            NewTarget::new("   ", Role::Other, "COMP"),
            Err(ValidationError::NameRequired)
        );

        let target = NewTarget::new("  Bandejão ", Role::PlaceOrFood, " H8 ").unwrap();
        assert_eq!(target.name, "Bandejão");
        assert_eq!(target.department, "H8");
    }

    #[test]
    fn test_review_row_from_store() {
        let json = r#"{
            "id": 7,
            "target_id": 2,
            "rating": 4,
            "comment": null,
            "created_at": "2024-03-01T12:34:56.789012+00:00"
        }"#;

        let review: Review = serde_json::from_str(json).unwrap();
        assert_eq!(review.rating.value(), 4);
        assert_eq!(review.comment, "");
        assert_eq!(
            review.created_at.map(|ts| ts.date_naive()),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap().date_naive())
        );
    }

    #[test]
    fn test_review_row_with_bad_timestamp() {
        let json = r#"{"id": 1, "target_id": 1, "rating": 2, "created_at": "yesterday"}"#;
        let review: Review = serde_json::from_str(json).unwrap();
        assert!(review.created_at.is_none());
        assert_eq!(format_review_date(review.created_at), None);
    }

    #[test]
    fn test_review_row_rejects_out_of_range_rating() {
        let json = r#"{"id": 1, "target_id": 1, "rating": 9}"#;
        assert!(serde_json::from_str::<Review>(json).is_err());
    }

    #[test]
    fn test_naive_timestamp_is_read_as_utc() {
        let ts = parse_timestamp("2024-05-09T08:00:00.5").unwrap();
        assert_eq!(format_review_date(Some(ts)).as_deref(), Some("09/05/2024"));
    }

    #[test]
    fn test_new_review_serializes_plain_rating() {
        let review = NewReview::new(3, Rating::new(5).unwrap(), " great ");
        let value = serde_json::to_value(&review).unwrap();
        assert_eq!(value["target_id"], 3);
        assert_eq!(value["rating"], 5);
        assert_eq!(value["comment"], "great");
    }
}
