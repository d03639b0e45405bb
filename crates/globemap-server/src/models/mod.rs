use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: i64,
    pub email: String,
    pub created_at: String,
}

impl From<User> for UserPublic {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            created_at: u.created_at,
        }
    }
}

/// Identity attached to a request once its session token has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
}

macro_rules! string_enum {
    ($name:ident { $($variant:ident),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok($name::$variant),)+
                    other => Err(format!("unknown {}: {other}", stringify!($name))),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

string_enum!(Category {
    Conflict,
    Disaster,
    Health,
    Humanitarian,
    Climate,
});

string_enum!(Severity {
    Low,
    Medium,
    High,
    Critical,
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crisis {
    pub id: i64,
    pub title: String,
    pub category: Category,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub severity: Severity,
    pub summary: String,
    pub description: String,
    pub start_date: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charity {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub donation_url: String,
    pub crisis_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: i64,
    pub crisis_id: i64,
    pub charity_id: Option<i64>,
    pub user_id: Option<i64>,
    pub amount: i64,
    pub currency: String,
    pub stripe_payment_intent_id: String,
    pub status: String,
    pub created_at: String,
}

/// A succeeded donation as shown on the donor's dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationHistoryItem {
    pub id: i64,
    pub amount: i64,
    pub currency: String,
    pub created_at: String,
    pub crisis_title: String,
    pub crisis_country: String,
    pub charity_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationSummary {
    pub total_amount: i64,
    pub currency: String,
    pub crisis_count: i64,
    pub charity_count: i64,
}

impl Default for DonationSummary {
    fn default() -> Self {
        Self {
            total_amount: 0,
            currency: "USD".to_string(),
            crisis_count: 0,
            charity_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_parses_exact_names_only() {
        assert_eq!("Critical".parse::<Severity>(), Ok(Severity::Critical));
        assert!("critical".parse::<Severity>().is_err());
    }

    #[test]
    fn category_serializes_as_variant_name() {
        let json = serde_json::to_string(&Category::Humanitarian).unwrap();
        assert_eq!(json, "\"Humanitarian\"");
        assert_eq!(Category::ALL.len(), 5);
    }
}
