//! Narrow repository over the alert store: create/read plus the two
//! conditional terminal transitions. The affected-row count of the
//! conditional UPDATEs is the commit signal the lifecycle engine relies on.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::DatabaseError;
use crate::models::{Alert, AlertStatus, AlertType, GeoPoint, NewAlert, TrustedContact, UserRecord};

// ── Users & contacts ────────────────────────────────────────

pub fn insert_user(conn: &Connection, name: &str, phone: &str) -> Result<UserRecord, DatabaseError> {
    let user = UserRecord {
        id: Uuid::new_v4(),
        name: name.to_string(),
        phone: phone.to_string(),
        created_at: Utc::now(),
    };
    conn.execute(
        "INSERT INTO users (id, name, phone, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user.id, user.name, user.phone, user.created_at],
    )?;
    Ok(user)
}

pub fn get_user(conn: &Connection, id: Uuid) -> Result<Option<UserRecord>, DatabaseError> {
    let user = conn
        .query_row(
            "SELECT id, name, phone, created_at FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(UserRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    phone: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

pub fn insert_trusted_contact(
    conn: &Connection,
    user_id: Uuid,
    name: &str,
    phone: &str,
    relation: Option<&str>,
    is_primary: bool,
) -> Result<TrustedContact, DatabaseError> {
    let contact = TrustedContact {
        id: Uuid::new_v4(),
        user_id,
        name: name.to_string(),
        phone: phone.to_string(),
        relation: relation.map(str::to_string),
        is_primary,
        created_at: Utc::now(),
    };
    conn.execute(
        "INSERT INTO trusted_contacts (id, user_id, name, phone, relation, is_primary, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            contact.id,
            contact.user_id,
            contact.name,
            contact.phone,
            contact.relation,
            contact.is_primary,
            contact.created_at,
        ],
    )?;
    Ok(contact)
}

/// Trusted contacts for a user, primary contact first, then insertion order.
pub fn list_trusted_contacts(
    conn: &Connection,
    user_id: Uuid,
) -> Result<Vec<TrustedContact>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, phone, relation, is_primary, created_at
         FROM trusted_contacts
         WHERE user_id = ?1
         ORDER BY is_primary DESC, created_at ASC, rowid ASC",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok(TrustedContact {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            phone: row.get(3)?,
            relation: row.get(4)?,
            is_primary: row.get(5)?,
            created_at: row.get(6)?,
        })
    })?;

    let mut contacts = Vec::new();
    for row in rows {
        contacts.push(row?);
    }
    Ok(contacts)
}

/// Walk sessions are external collaborators; this exists as an FK target
/// for alerts created during a session.
pub fn insert_walk_session(conn: &Connection, user_id: Uuid) -> Result<Uuid, DatabaseError> {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO walk_sessions (id, user_id, started_at, active) VALUES (?1, ?2, ?3, 1)",
        params![id, user_id, Utc::now()],
    )?;
    Ok(id)
}

// ── Alerts ──────────────────────────────────────────────────

pub fn insert_alert(conn: &Connection, new: &NewAlert) -> Result<Alert, DatabaseError> {
    let alert = Alert {
        id: Uuid::new_v4(),
        user_id: new.user_id,
        session_id: new.session_id,
        alert_type: new.alert_type,
        confidence: new.confidence,
        status: AlertStatus::Pending,
        location: new.location,
        snapshot_url: new.snapshot_url.clone(),
        created_at: Utc::now(),
        triggered_at: None,
        cancelled_at: None,
    };
    conn.execute(
        "INSERT INTO alerts (id, user_id, session_id, alert_type, confidence, status,
                             location_lat, location_lng, snapshot_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            alert.id,
            alert.user_id,
            alert.session_id,
            alert.alert_type.as_str(),
            alert.confidence,
            alert.status.as_str(),
            alert.location.map(|p| p.lat),
            alert.location.map(|p| p.lng),
            alert.snapshot_url,
            alert.created_at,
        ],
    )?;
    Ok(alert)
}

pub fn get_alert(conn: &Connection, id: Uuid) -> Result<Option<Alert>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, user_id, session_id, alert_type, confidence, status,
                    location_lat, location_lng, snapshot_url, created_at, triggered_at, cancelled_at
             FROM alerts WHERE id = ?1",
            params![id],
            map_alert_row,
        )
        .optional()?;
    row.map(AlertRow::into_alert).transpose()
}

/// Alerts for a user, newest first.
pub fn list_alerts_by_user(conn: &Connection, user_id: Uuid) -> Result<Vec<Alert>, DatabaseError> {
    list_alerts(conn, "user_id", user_id)
}

/// Alerts recorded during a walk session, newest first.
pub fn list_alerts_by_session(
    conn: &Connection,
    session_id: Uuid,
) -> Result<Vec<Alert>, DatabaseError> {
    list_alerts(conn, "session_id", session_id)
}

fn list_alerts(conn: &Connection, column: &str, key: Uuid) -> Result<Vec<Alert>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, user_id, session_id, alert_type, confidence, status,
                location_lat, location_lng, snapshot_url, created_at, triggered_at, cancelled_at
         FROM alerts WHERE {column} = ?1
         ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![key], map_alert_row)?;

    let mut alerts = Vec::new();
    for row in rows {
        alerts.push(row?.into_alert()?);
    }
    Ok(alerts)
}

/// Commit PENDING→TRIGGERED. Returns whether this call performed the
/// transition; `false` means the alert was missing or already resolved.
pub fn mark_triggered(
    conn: &Connection,
    id: Uuid,
    at: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE alerts SET status = ?1, triggered_at = ?2 WHERE id = ?3 AND status = ?4",
        params![
            AlertStatus::Triggered.as_str(),
            at,
            id,
            AlertStatus::Pending.as_str()
        ],
    )?;
    Ok(changed == 1)
}

/// Commit PENDING→CANCELLED. Same contract as [`mark_triggered`].
pub fn mark_cancelled(
    conn: &Connection,
    id: Uuid,
    at: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE alerts SET status = ?1, cancelled_at = ?2 WHERE id = ?3 AND status = ?4",
        params![
            AlertStatus::Cancelled.as_str(),
            at,
            id,
            AlertStatus::Pending.as_str()
        ],
    )?;
    Ok(changed == 1)
}

// ── Row mapping ─────────────────────────────────────────────

struct AlertRow {
    id: Uuid,
    user_id: Uuid,
    session_id: Option<Uuid>,
    alert_type: String,
    confidence: f64,
    status: String,
    location_lat: Option<f64>,
    location_lng: Option<f64>,
    snapshot_url: Option<String>,
    created_at: DateTime<Utc>,
    triggered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
}

fn map_alert_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AlertRow> {
    Ok(AlertRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        session_id: row.get(2)?,
        alert_type: row.get(3)?,
        confidence: row.get(4)?,
        status: row.get(5)?,
        location_lat: row.get(6)?,
        location_lng: row.get(7)?,
        snapshot_url: row.get(8)?,
        created_at: row.get(9)?,
        triggered_at: row.get(10)?,
        cancelled_at: row.get(11)?,
    })
}

impl AlertRow {
    fn into_alert(self) -> Result<Alert, DatabaseError> {
        let location = match (self.location_lat, self.location_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        };
        Ok(Alert {
            id: self.id,
            user_id: self.user_id,
            session_id: self.session_id,
            alert_type: AlertType::from_str(&self.alert_type)?,
            confidence: self.confidence,
            status: AlertStatus::from_str(&self.status)?,
            location,
            snapshot_url: self.snapshot_url,
            created_at: self.created_at,
            triggered_at: self.triggered_at,
            cancelled_at: self.cancelled_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn fixture(conn: &Connection) -> UserRecord {
        insert_user(conn, "Maya", "+33600000001").unwrap()
    }

    fn panic_alert(user_id: Uuid, confidence: f64) -> NewAlert {
        NewAlert {
            user_id,
            session_id: None,
            alert_type: AlertType::Panic,
            confidence,
            location: None,
            snapshot_url: None,
        }
    }

    #[test]
    fn insert_and_get_alert_round_trip() {
        let conn = open_memory_database().unwrap();
        let user = fixture(&conn);

        let new = NewAlert {
            user_id: user.id,
            session_id: None,
            alert_type: AlertType::Scream,
            confidence: 0.9,
            location: Some(GeoPoint::new(48.85, 2.35).unwrap()),
            snapshot_url: Some("https://cdn.example/snap.jpg".into()),
        };
        let created = insert_alert(&conn, &new).unwrap();
        let loaded = get_alert(&conn, created.id).unwrap().unwrap();

        assert_eq!(loaded.alert_type, AlertType::Scream);
        assert_eq!(loaded.status, AlertStatus::Pending);
        assert_eq!(loaded.confidence, 0.9);
        assert_eq!(loaded.location.unwrap().lat, 48.85);
        assert_eq!(loaded.snapshot_url.as_deref(), Some("https://cdn.example/snap.jpg"));
        assert!(loaded.triggered_at.is_none());
        assert!(loaded.cancelled_at.is_none());
    }

    #[test]
    fn get_alert_missing_is_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_alert(&conn, Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn mark_triggered_commits_once() {
        let conn = open_memory_database().unwrap();
        let user = fixture(&conn);
        let alert = insert_alert(&conn, &panic_alert(user.id, 0.85)).unwrap();

        let now = Utc::now();
        assert!(mark_triggered(&conn, alert.id, now).unwrap());
        // Second attempt finds no PENDING row.
        assert!(!mark_triggered(&conn, alert.id, Utc::now()).unwrap());

        let loaded = get_alert(&conn, alert.id).unwrap().unwrap();
        assert_eq!(loaded.status, AlertStatus::Triggered);
        assert!(loaded.triggered_at.is_some());
        assert!(loaded.cancelled_at.is_none());
    }

    #[test]
    fn cancel_after_trigger_is_refused() {
        let conn = open_memory_database().unwrap();
        let user = fixture(&conn);
        let alert = insert_alert(&conn, &panic_alert(user.id, 0.85)).unwrap();

        assert!(mark_triggered(&conn, alert.id, Utc::now()).unwrap());
        assert!(!mark_cancelled(&conn, alert.id, Utc::now()).unwrap());

        let loaded = get_alert(&conn, alert.id).unwrap().unwrap();
        assert_eq!(loaded.status, AlertStatus::Triggered);
        assert!(loaded.cancelled_at.is_none());
    }

    #[test]
    fn mark_missing_alert_is_false() {
        let conn = open_memory_database().unwrap();
        assert!(!mark_triggered(&conn, Uuid::new_v4(), Utc::now()).unwrap());
        assert!(!mark_cancelled(&conn, Uuid::new_v4(), Utc::now()).unwrap());
    }

    #[test]
    fn list_alerts_by_user_newest_first() {
        let conn = open_memory_database().unwrap();
        let user = fixture(&conn);

        let first = insert_alert(&conn, &panic_alert(user.id, 0.6)).unwrap();
        // Force distinct created_at ordering.
        conn.execute(
            "UPDATE alerts SET created_at = ?1 WHERE id = ?2",
            params![Utc::now() - chrono::Duration::minutes(5), first.id],
        )
        .unwrap();
        let second = insert_alert(&conn, &panic_alert(user.id, 0.7)).unwrap();

        let alerts = list_alerts_by_user(&conn, user.id).unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].id, second.id);
        assert_eq!(alerts[1].id, first.id);
    }

    #[test]
    fn list_alerts_by_session_filters() {
        let conn = open_memory_database().unwrap();
        let user = fixture(&conn);
        let session = insert_walk_session(&conn, user.id).unwrap();

        let mut in_session = panic_alert(user.id, 0.6);
        in_session.session_id = Some(session);
        insert_alert(&conn, &in_session).unwrap();
        insert_alert(&conn, &panic_alert(user.id, 0.6)).unwrap();

        let alerts = list_alerts_by_session(&conn, session).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].session_id, Some(session));
    }

    #[test]
    fn trusted_contacts_primary_first() {
        let conn = open_memory_database().unwrap();
        let user = fixture(&conn);

        insert_trusted_contact(&conn, user.id, "Ana", "+33600000002", Some("Friend"), false)
            .unwrap();
        insert_trusted_contact(&conn, user.id, "Mom", "+33600000003", Some("Mother"), true)
            .unwrap();
        insert_trusted_contact(&conn, user.id, "Ben", "+33600000004", None, false).unwrap();

        let contacts = list_trusted_contacts(&conn, user.id).unwrap();
        assert_eq!(contacts.len(), 3);
        assert_eq!(contacts[0].name, "Mom");
        assert!(contacts[0].is_primary);
        assert_eq!(contacts[1].name, "Ana");
        assert_eq!(contacts[2].name, "Ben");
    }

    #[test]
    fn alert_requires_existing_user() {
        let conn = open_memory_database().unwrap();
        let result = insert_alert(&conn, &panic_alert(Uuid::new_v4(), 0.5));
        assert!(matches!(result, Err(DatabaseError::Sqlite(_))));
    }
}
