use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Lifecycle of an adoption request. Any status may follow any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    #[default]
    Pending,
    Interview,
    Completed,
    Rejected,
    Approved,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 5] = [
        RequestStatus::Pending,
        RequestStatus::Interview,
        RequestStatus::Completed,
        RequestStatus::Rejected,
        RequestStatus::Approved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Interview => "INTERVIEW",
            RequestStatus::Completed => "COMPLETED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Approved => "APPROVED",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        RequestStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == upper)
            .ok_or_else(|| format!("unknown request status '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("pending".parse::<RequestStatus>(), Ok(RequestStatus::Pending));
        assert_eq!(" Approved ".parse::<RequestStatus>(), Ok(RequestStatus::Approved));
        assert!("ARCHIVED".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&RequestStatus::Interview).unwrap(),
            "\"INTERVIEW\""
        );
        assert_eq!(RequestStatus::default(), RequestStatus::Pending);
    }
}
