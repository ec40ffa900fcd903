// src/routes/doctor_routes.rs

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, is_unique_violation},
    middleware::auth_context::AuthContext,
    models::{AppState, DayOfWeek, DoctorRow, MessageResponse, ScheduleRow},
    schedule::{effective_duration, format_time_of_day, parse_window},
};

// Literal segments (`/all`, `/schedules`) are registered ahead of `{doctor_id}`;
// the router also ranks static segments above captures.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/doctors/all", get(list_doctors_admin))
        .route("/doctors", get(list_doctors).post(create_doctor))
        .route("/doctors/", get(list_doctors).post(create_doctor))
        .route("/doctors/schedules/{schedule_id}", delete(delete_schedule))
        .route("/doctors/{doctor_id}", get(get_doctor).delete(delete_doctor))
        .route("/doctors/{doctor_id}/schedule", post(add_schedule))
}

/* ============================================================
   DTOs
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct DoctorOut {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub specialty: String,
    pub bio: Option<String>,
    pub duration_minutes: i32,
}

impl From<DoctorRow> for DoctorOut {
    fn from(d: DoctorRow) -> Self {
        Self {
            id: d.id,
            name: d.name,
            email: d.email,
            specialty: d.specialty,
            bio: d.bio,
            duration_minutes: effective_duration(Some(d.duration_minutes)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScheduleOut {
    pub id: i64,
    pub weekday: i32,
    pub start_time: String,
    pub end_time: String,
}

impl From<&ScheduleRow> for ScheduleOut {
    fn from(s: &ScheduleRow) -> Self {
        Self {
            id: s.id,
            weekday: DayOfWeek::from_symbol(&s.day).map(DayOfWeek::weekday).unwrap_or(0),
            start_time: format_time_of_day(s.start_time),
            end_time: format_time_of_day(s.end_time),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorWithSchedules {
    #[serde(flatten)]
    pub doctor: DoctorOut,
    pub schedules: Vec<ScheduleOut>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub email: String,
    pub specialty: String,
    pub bio: Option<String>,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    pub weekday: i32,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Serialize)]
pub struct ScheduleCreated {
    pub id: i64,
    pub doctor_id: i64,
    pub weekday: i32,
    pub start_time: String,
    pub end_time: String,
    pub message: String,
}

/* ============================================================
   Queries
   ============================================================ */

async fn find_doctor(state: &AppState, doctor_id: i64) -> Result<DoctorRow, ApiError> {
    sqlx::query_as::<_, DoctorRow>(
        r#"
        SELECT id, name, email, specialty, bio, duration_minutes
        FROM doctors
        WHERE id = $1
        "#,
    )
    .bind(doctor_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(|| ApiError::not_found("Doctor"))
}

async fn load_doctors(state: &AppState) -> Result<Vec<DoctorRow>, ApiError> {
    sqlx::query_as::<_, DoctorRow>(
        r#"
        SELECT id, name, email, specialty, bio, duration_minutes
        FROM doctors
        ORDER BY id ASC
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)
}

fn group_schedules(rows: &[ScheduleRow]) -> BTreeMap<i64, Vec<ScheduleOut>> {
    let mut map: BTreeMap<i64, Vec<ScheduleOut>> = BTreeMap::new();
    for r in rows {
        map.entry(r.doctor_id).or_default().push(ScheduleOut::from(r));
    }
    map
}

/* ============================================================
   GET /doctors  (public, no schedules)
   ============================================================ */

pub async fn list_doctors(State(state): State<AppState>) -> Result<Json<Vec<DoctorOut>>, ApiError> {
    let doctors = load_doctors(&state).await?;
    Ok(Json(doctors.into_iter().map(DoctorOut::from).collect()))
}

/* ============================================================
   GET /doctors/all  (admin, with schedules)
   ============================================================ */

pub async fn list_doctors_admin(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<DoctorWithSchedules>>, ApiError> {
    auth.ensure_admin()?;

    let doctors = load_doctors(&state).await?;
    let schedules: Vec<ScheduleRow> = sqlx::query_as::<_, ScheduleRow>(
        r#"
        SELECT id, doctor_id, day, start_time, end_time
        FROM doctor_schedules
        ORDER BY doctor_id ASC, id ASC
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)?;

    let mut grouped = group_schedules(&schedules);
    let out = doctors
        .into_iter()
        .map(|d| {
            let schedules = grouped.remove(&d.id).unwrap_or_default();
            DoctorWithSchedules {
                doctor: d.into(),
                schedules,
            }
        })
        .collect();

    Ok(Json(out))
}

/* ============================================================
   POST /doctors  (admin)
   ============================================================ */

fn validate_doctor(req: &CreateDoctorRequest) -> Result<(), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::validation("name is required"));
    }
    if req.specialty.trim().is_empty() {
        return Err(ApiError::validation("specialty is required"));
    }
    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::validation("a valid email is required"));
    }
    Ok(())
}

fn doctor_email_taken() -> ApiError {
    ApiError::Conflict("EMAIL_TAKEN", "Email already exists".into())
}

pub async fn create_doctor(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateDoctorRequest>,
) -> Result<Json<DoctorOut>, ApiError> {
    auth.ensure_admin()?;
    validate_doctor(&req)?;

    let email = req.email.trim();
    let existing: Option<i64> = sqlx::query_scalar(r#"SELECT id FROM doctors WHERE email = $1"#)
        .bind(email)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::db)?;
    if existing.is_some() {
        return Err(doctor_email_taken());
    }

    let doctor: DoctorRow = sqlx::query_as::<_, DoctorRow>(
        r#"
        INSERT INTO doctors (name, email, specialty, bio, duration_minutes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, email, specialty, bio, duration_minutes
        "#,
    )
    .bind(req.name.trim())
    .bind(email)
    .bind(req.specialty.trim())
    .bind(req.bio.as_deref())
    .bind(effective_duration(req.duration_minutes))
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            doctor_email_taken()
        } else {
            ApiError::db(e)
        }
    })?;

    tracing::info!(doctor_id = doctor.id, by = auth.user_id, "doctor created");
    Ok(Json(doctor.into()))
}

/* ============================================================
   GET /doctors/{id}
   ============================================================ */

pub async fn get_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<DoctorWithSchedules>, ApiError> {
    let doctor = find_doctor(&state, doctor_id).await?;

    let schedules: Vec<ScheduleRow> = sqlx::query_as::<_, ScheduleRow>(
        r#"
        SELECT id, doctor_id, day, start_time, end_time
        FROM doctor_schedules
        WHERE doctor_id = $1
        ORDER BY id ASC
        "#,
    )
    .bind(doctor_id)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(DoctorWithSchedules {
        doctor: doctor.into(),
        schedules: schedules.iter().map(ScheduleOut::from).collect(),
    }))
}

/* ============================================================
   DELETE /doctors/{id}  (admin, cascades)
   ============================================================ */

pub async fn delete_doctor(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(doctor_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    auth.ensure_admin()?;

    let res = sqlx::query(r#"DELETE FROM doctors WHERE id = $1"#)
        .bind(doctor_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::db)?;

    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("Doctor"));
    }

    tracing::info!(doctor_id, by = auth.user_id, "doctor deleted");
    Ok(Json(MessageResponse::new("Doctor deleted successfully")))
}

/* ============================================================
   POST /doctors/{id}/schedule  (admin)
   ============================================================ */

fn schedule_exists() -> ApiError {
    ApiError::Conflict(
        "SCHEDULE_EXISTS",
        "Schedule already exists for this day. Delete the existing one first.".into(),
    )
}

pub async fn add_schedule(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(doctor_id): Path<i64>,
    Json(req): Json<CreateScheduleRequest>,
) -> Result<Json<ScheduleCreated>, ApiError> {
    auth.ensure_admin()?;

    find_doctor(&state, doctor_id).await?;

    let day = DayOfWeek::from_weekday(req.weekday).ok_or_else(|| {
        ApiError::validation(format!("Invalid weekday: {}. Use 0-6", req.weekday))
    })?;
    let (start_time, end_time) = parse_window(&req.start_time, &req.end_time)?;

    let existing: Option<i64> = sqlx::query_scalar(
        r#"SELECT id FROM doctor_schedules WHERE doctor_id = $1 AND day = $2"#,
    )
    .bind(doctor_id)
    .bind(day.as_str())
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?;
    if existing.is_some() {
        return Err(schedule_exists());
    }

    let row: ScheduleRow = sqlx::query_as::<_, ScheduleRow>(
        r#"
        INSERT INTO doctor_schedules (doctor_id, day, start_time, end_time)
        VALUES ($1, $2, $3, $4)
        RETURNING id, doctor_id, day, start_time, end_time
        "#,
    )
    .bind(doctor_id)
    .bind(day.as_str())
    .bind(start_time)
    .bind(end_time)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            schedule_exists()
        } else {
            ApiError::db(e)
        }
    })?;

    tracing::info!(schedule_id = row.id, doctor_id, day = day.as_str(), "schedule added");

    Ok(Json(ScheduleCreated {
        id: row.id,
        doctor_id: row.doctor_id,
        weekday: day.weekday(),
        start_time: format_time_of_day(row.start_time),
        end_time: format_time_of_day(row.end_time),
        message: "Schedule added successfully".into(),
    }))
}

/* ============================================================
   DELETE /doctors/schedules/{id}  (admin)
   ============================================================ */

pub async fn delete_schedule(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(schedule_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    auth.ensure_admin()?;

    let res = sqlx::query(r#"DELETE FROM doctor_schedules WHERE id = $1"#)
        .bind(schedule_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::db)?;

    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("Schedule"));
    }

    tracing::info!(schedule_id, by = auth.user_id, "schedule deleted");
    Ok(Json(MessageResponse::new("Schedule deleted successfully")))
}
