// src/routes/appointment_routes.rs

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, is_unique_violation},
    middleware::auth_context::AuthContext,
    models::{AppState, AppointmentJoinedRow, AppointmentStatus, DoctorRow, MessageResponse},
    schedule::{booking_bounds, effective_duration, format_timestamp, parse_slot, stored_slot_bounds},
};

/*
Booking conflicts are exact (doctor, date, time) matches among non-cancelled
rows. Two bookings whose ranges overlap at different start times are both
accepted.
*/

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", post(book_appointment))
        .route("/appointments/", post(book_appointment))
        .route("/appointments/me", get(my_appointments))
        .route("/appointments/all", get(all_appointments))
        .route("/appointments/doctor/{doctor_id}", get(doctor_appointments))
        .route("/appointments/{appointment_id}", delete(cancel_appointment))
}

/* ============================================================
   DTOs
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct DoctorBrief {
    pub id: i64,
    pub name: String,
    pub specialty: String,
}

#[derive(Debug, Serialize)]
pub struct PatientBrief {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct AppointmentOut {
    pub id: i64,
    pub start_at: String,
    pub end_at: String,
    pub status: String,
    pub doctor: Option<DoctorBrief>,
    pub patient: Option<PatientBrief>,
}

/// Public view of a doctor's booked slot; carries no patient identity.
#[derive(Debug, Serialize)]
pub struct BookedSlotOut {
    pub id: i64,
    pub start_at: String,
    pub end_at: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: i64,
    pub date: String, // YYYY-MM-DD
    pub time: String, // HH:MM
}

impl From<AppointmentJoinedRow> for AppointmentOut {
    fn from(r: AppointmentJoinedRow) -> Self {
        let bounds = stored_slot_bounds(r.date, r.time, effective_duration(r.doctor_duration));

        let doctor = match (r.doctor_ref, r.doctor_name) {
            (Some(id), Some(name)) => Some(DoctorBrief {
                id,
                name,
                specialty: r.doctor_specialty.unwrap_or_default(),
            }),
            _ => None,
        };
        let patient = match (r.patient_ref, r.patient_name) {
            (Some(id), Some(name)) => Some(PatientBrief { id, name }),
            _ => None,
        };

        Self {
            id: r.id,
            start_at: format_timestamp(bounds.start),
            end_at: format_timestamp(bounds.end),
            status: r.status,
            doctor,
            patient,
        }
    }
}

impl From<AppointmentJoinedRow> for BookedSlotOut {
    fn from(r: AppointmentJoinedRow) -> Self {
        let bounds = stored_slot_bounds(r.date, r.time, effective_duration(r.doctor_duration));
        Self {
            id: r.id,
            start_at: format_timestamp(bounds.start),
            end_at: format_timestamp(bounds.end),
            status: r.status,
        }
    }
}

const JOINED_SELECT: &str = r#"
    SELECT
      a.id,
      a.date,
      a.time,
      a.status,
      d.id               AS doctor_ref,
      d.name             AS doctor_name,
      d.specialty        AS doctor_specialty,
      d.duration_minutes AS doctor_duration,
      u.id               AS patient_ref,
      u.name             AS patient_name
    FROM appointments a
    LEFT JOIN doctors d ON d.id = a.doctor_id
    LEFT JOIN users   u ON u.id = a.patient_id
"#;

fn slot_taken() -> ApiError {
    ApiError::Conflict("SLOT_TAKEN", "This time slot is already booked".into())
}

/* ============================================================
   POST /appointments  (book)
   ============================================================ */

#[derive(Debug, sqlx::FromRow)]
struct InsertedAppointment {
    id: i64,
    status: String,
}

pub async fn book_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<BookAppointmentRequest>,
) -> Result<Json<AppointmentOut>, ApiError> {
    tracing::info!(
        doctor_id = req.doctor_id,
        date = %req.date,
        time = %req.time,
        patient_id = auth.user_id,
        "booking requested"
    );

    let doctor: DoctorRow = sqlx::query_as::<_, DoctorRow>(
        r#"
        SELECT id, name, email, specialty, bio, duration_minutes
        FROM doctors
        WHERE id = $1
        "#,
    )
    .bind(req.doctor_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(|| ApiError::not_found("Doctor"))?;

    let (date, time): (NaiveDate, NaiveTime) = parse_slot(&req.date, &req.time).map_err(|e| {
        tracing::warn!(error = ?e, "unparseable booking slot");
        e
    })?;
    let bounds = booking_bounds(date, time, effective_duration(Some(doctor.duration_minutes)))?;

    // check + insert in one transaction; the partial unique index rejects a
    // concurrent winner that slips past the check
    let mut tx = state.db.begin().await.map_err(ApiError::db)?;

    let patient_name: String = sqlx::query_scalar(r#"SELECT name FROM users WHERE id = $1"#)
        .bind(auth.user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(ApiError::not_authenticated)?;

    let existing: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id
        FROM appointments
        WHERE doctor_id = $1
          AND date = $2
          AND time = $3
          AND status <> $4
        LIMIT 1
        "#,
    )
    .bind(doctor.id)
    .bind(date)
    .bind(time)
    .bind(AppointmentStatus::Cancelled.as_str())
    .fetch_optional(&mut *tx)
    .await
    .map_err(ApiError::db)?;
    if existing.is_some() {
        return Err(slot_taken());
    }

    let inserted: InsertedAppointment = sqlx::query_as::<_, InsertedAppointment>(
        r#"
        INSERT INTO appointments (doctor_id, patient_id, date, time, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, status
        "#,
    )
    .bind(doctor.id)
    .bind(auth.user_id)
    .bind(date)
    .bind(time)
    .bind(AppointmentStatus::Pending.as_str())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            slot_taken()
        } else {
            ApiError::db(e)
        }
    })?;

    tx.commit().await.map_err(|e| {
        if is_unique_violation(&e) {
            slot_taken()
        } else {
            ApiError::db(e)
        }
    })?;

    tracing::info!(appointment_id = inserted.id, "appointment created");

    Ok(Json(AppointmentOut {
        id: inserted.id,
        start_at: format_timestamp(bounds.start),
        end_at: format_timestamp(bounds.end),
        status: inserted.status,
        doctor: Some(DoctorBrief {
            id: doctor.id,
            name: doctor.name,
            specialty: doctor.specialty,
        }),
        patient: Some(PatientBrief {
            id: auth.user_id,
            name: patient_name,
        }),
    }))
}

/* ============================================================
   GET /appointments/me
   ============================================================ */

pub async fn my_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<AppointmentOut>>, ApiError> {
    let sql = format!("{JOINED_SELECT} WHERE a.patient_id = $1 ORDER BY a.id ASC");
    let rows: Vec<AppointmentJoinedRow> = sqlx::query_as::<_, AppointmentJoinedRow>(&sql)
        .bind(auth.user_id)
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::db)?;

    Ok(Json(rows.into_iter().map(AppointmentOut::from).collect()))
}

/* ============================================================
   DELETE /appointments/{id}  (cancel, owner only)
   ============================================================ */

fn ensure_owner(auth: &AuthContext, patient_id: i64) -> Result<(), ApiError> {
    if auth.user_id == patient_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden("FORBIDDEN", "Not authorized".into()))
    }
}

pub async fn cancel_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let patient_id: i64 =
        sqlx::query_scalar(r#"SELECT patient_id FROM appointments WHERE id = $1"#)
            .bind(appointment_id)
            .fetch_optional(&state.db)
            .await
            .map_err(ApiError::db)?
            .ok_or_else(|| ApiError::not_found("Appointment"))?;

    ensure_owner(&auth, patient_id)?;

    // Already-cancelled rows are simply written again.
    sqlx::query(r#"UPDATE appointments SET status = $2 WHERE id = $1"#)
        .bind(appointment_id)
        .bind(AppointmentStatus::Cancelled.as_str())
        .execute(&state.db)
        .await
        .map_err(ApiError::db)?;

    tracing::info!(appointment_id, user_id = auth.user_id, "appointment cancelled");
    Ok(Json(MessageResponse::new("Appointment cancelled successfully")))
}

/* ============================================================
   GET /appointments/doctor/{id}  (public)
   ============================================================ */

pub async fn doctor_appointments(
    State(state): State<AppState>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<Vec<BookedSlotOut>>, ApiError> {
    let sql = format!(
        "{JOINED_SELECT} WHERE a.doctor_id = $1 AND a.status <> $2 ORDER BY a.date ASC, a.time ASC, a.id ASC"
    );
    let rows: Vec<AppointmentJoinedRow> = sqlx::query_as::<_, AppointmentJoinedRow>(&sql)
        .bind(doctor_id)
        .bind(AppointmentStatus::Cancelled.as_str())
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::db)?;

    Ok(Json(rows.into_iter().map(BookedSlotOut::from).collect()))
}

/* ============================================================
   GET /appointments/all  (admin)
   ============================================================ */

pub async fn all_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<AppointmentOut>>, ApiError> {
    auth.ensure_admin()?;

    let sql = format!("{JOINED_SELECT} ORDER BY a.id ASC");
    let rows: Vec<AppointmentJoinedRow> = sqlx::query_as::<_, AppointmentJoinedRow>(&sql)
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::db)?;

    Ok(Json(rows.into_iter().map(AppointmentOut::from).collect()))
}
