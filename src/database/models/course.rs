use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub description: String,
    pub delivery: CourseDelivery,
    pub duration_hours: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How a course is delivered. Stored as text in the `delivery` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CourseDelivery {
    SelfPaced,
    Instructor,
    Workshop,
}

impl CourseDelivery {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseDelivery::SelfPaced => "self_paced",
            CourseDelivery::Instructor => "instructor",
            CourseDelivery::Workshop => "workshop",
        }
    }
}

impl FromStr for CourseDelivery {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "self_paced" => Ok(CourseDelivery::SelfPaced),
            "instructor" => Ok(CourseDelivery::Instructor),
            "workshop" => Ok(CourseDelivery::Workshop),
            other => Err(format!("Unknown course delivery: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_round_trips() {
        for delivery in [
            CourseDelivery::SelfPaced,
            CourseDelivery::Instructor,
            CourseDelivery::Workshop,
        ] {
            assert_eq!(delivery.as_str().parse::<CourseDelivery>().unwrap(), delivery);
        }
        assert!("online".parse::<CourseDelivery>().is_err());
    }
}
