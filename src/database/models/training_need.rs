use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrainingNeed {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub priority: NeedPriority,
    pub status: NeedStatus,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum NeedPriority {
    Low,
    Medium,
    High,
}

impl NeedPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            NeedPriority::Low => "low",
            NeedPriority::Medium => "medium",
            NeedPriority::High => "high",
        }
    }
}

impl FromStr for NeedPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(NeedPriority::Low),
            "medium" => Ok(NeedPriority::Medium),
            "high" => Ok(NeedPriority::High),
            other => Err(format!("Unknown priority: {}", other)),
        }
    }
}

/// Lifecycle of a training need. Only `pending` needs can be decided;
/// only `approved` needs can be completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum NeedStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl NeedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NeedStatus::Pending => "pending",
            NeedStatus::Approved => "approved",
            NeedStatus::Rejected => "rejected",
            NeedStatus::Completed => "completed",
        }
    }
}

impl FromStr for NeedStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(NeedStatus::Pending),
            "approved" => Ok(NeedStatus::Approved),
            "rejected" => Ok(NeedStatus::Rejected),
            "completed" => Ok(NeedStatus::Completed),
            other => Err(format!("Unknown status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_round_trips() {
        for p in [NeedPriority::Low, NeedPriority::Medium, NeedPriority::High] {
            assert_eq!(p.as_str().parse::<NeedPriority>().unwrap(), p);
        }
        assert!("urgent".parse::<NeedPriority>().is_err());
    }

    #[test]
    fn status_round_trips() {
        for s in [
            NeedStatus::Pending,
            NeedStatus::Approved,
            NeedStatus::Rejected,
            NeedStatus::Completed,
        ] {
            assert_eq!(s.as_str().parse::<NeedStatus>().unwrap(), s);
        }
        assert!("open".parse::<NeedStatus>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_value(NeedStatus::Pending).unwrap();
        assert_eq!(json, serde_json::json!("pending"));
    }
}
