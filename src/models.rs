use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::auth::TokenKeys;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub tokens: TokenKeys,
    pub allow_admin_registration: bool,
}

/* -------------------------
   Enums
--------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Patient,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Patient => "PATIENT",
        }
    }

    /// Registration accepts any casing; anything that is not ADMIN is a patient.
    pub fn from_registration(role: Option<&str>) -> Self {
        match role {
            Some(r) if r.trim().eq_ignore_ascii_case("ADMIN") => Role::Admin,
            _ => Role::Patient,
        }
    }

    /// Stored roles are constrained by the schema; unknown values degrade to patient.
    pub fn from_db(role: &str) -> Self {
        if role == "ADMIN" { Role::Admin } else { Role::Patient }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DayOfWeek {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

/// Numeric weekday (index) <-> stored symbol. Sunday is 0.
const WEEKDAYS: [(DayOfWeek, &str); 7] = [
    (DayOfWeek::Sunday, "SUNDAY"),
    (DayOfWeek::Monday, "MONDAY"),
    (DayOfWeek::Tuesday, "TUESDAY"),
    (DayOfWeek::Wednesday, "WEDNESDAY"),
    (DayOfWeek::Thursday, "THURSDAY"),
    (DayOfWeek::Friday, "FRIDAY"),
    (DayOfWeek::Saturday, "SATURDAY"),
];

impl DayOfWeek {
    pub fn from_weekday(weekday: i32) -> Option<Self> {
        usize::try_from(weekday)
            .ok()
            .and_then(|i| WEEKDAYS.get(i))
            .map(|(day, _)| *day)
    }

    pub fn weekday(self) -> i32 {
        self as i32
    }

    pub fn as_str(self) -> &'static str {
        WEEKDAYS[self as usize].1
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        WEEKDAYS
            .iter()
            .find(|(_, s)| *s == symbol)
            .map(|(day, _)| *day)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentStatus {
    Pending,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "PENDING",
            AppointmentStatus::Cancelled => "CANCELLED",
        }
    }
}

/* -------------------------
   DB Row Models
--------------------------*/

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DoctorRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub specialty: String,
    pub bio: Option<String>,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduleRow {
    pub id: i64,
    pub doctor_id: i64,
    pub day: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Appointment joined with its (possibly dangling) doctor and patient.
#[derive(Debug, sqlx::FromRow)]
pub struct AppointmentJoinedRow {
    pub id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: String,
    pub doctor_ref: Option<i64>,
    pub doctor_name: Option<String>,
    pub doctor_specialty: Option<String>,
    pub doctor_duration: Option<i32>,
    pub patient_ref: Option<i64>,
    pub patient_name: Option<String>,
}

/* -------------------------
   Shared API DTOs
--------------------------*/

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserOut {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<UserRow> for UserOut {
    fn from(u: UserRow) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: Role::from_db(&u.role),
        }
    }
}
