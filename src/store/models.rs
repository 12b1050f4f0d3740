//! Row types read from the store.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::Row;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// An active user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Columns selected by [`User::from_row`], in order.
    pub const COLUMNS: &'static str =
        "id, username, email, first_name, last_name, is_active, created_at";

    /// Scan a row selected with [`User::COLUMNS`].
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            is_active: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

/// Project lifecycle status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    Active,
    Completed,
    Cancelled,
    OnHold,
}

/// Project priority.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

fn enum_from_sql<T: std::str::FromStr>(value: ValueRef<'_>) -> FromSqlResult<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .as_str()?
        .parse::<T>()
        .map_err(|e| FromSqlError::Other(Box::new(e)))
}

impl FromSql for ProjectStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        enum_from_sql(value)
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        enum_from_sql(value)
    }
}

/// Monetary amount stored as INTEGER, REAL or numeric TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Budget(#[serde(with = "rust_decimal::serde::float")] pub Decimal);

impl FromSql for Budget {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let amount = match value {
            ValueRef::Integer(i) => Some(Decimal::from(i)),
            ValueRef::Real(f) => Decimal::from_f64(f),
            ValueRef::Text(_) => value.as_str()?.trim().parse::<Decimal>().ok(),
            _ => return Err(FromSqlError::InvalidType),
        };
        amount.map(Budget).ok_or(FromSqlError::InvalidType)
    }
}

/// A project row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    #[schema(value_type = f64)]
    pub budget: Budget,
    pub start_date: String,
    pub end_date: String,
}

impl Project {
    /// Columns selected by [`Project::from_row`], in order.
    pub const COLUMNS: &'static str =
        "id, name, description, status, priority, budget, start_date, end_date";

    /// Scan a row selected with [`Project::COLUMNS`].
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            status: row.get(3)?,
            priority: row.get(4)?,
            budget: row.get(5)?,
            start_date: row.get(6)?,
            end_date: row.get(7)?,
        })
    }
}
