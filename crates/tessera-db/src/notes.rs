//! Note repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use tessera_core::{
    Author, CreateNoteRequest, Discussion, Error, Note, NotePermissions, NoteRepository,
    NoteType, NoteableRef, NoteableType, Result,
};

const NOTE_SELECT: &str = r#"
    SELECT n.id, n.discussion_id, n.note_type, n.noteable_type, n.noteable_id,
           n.note, n.note_html, n.created_at_utc, n.updated_at_utc,
           u.id AS author_id, u.name AS author_name, u.username AS author_username
    FROM note n
    JOIN app_user u ON u.id = n.author_id
"#;

fn map_note(row: &PgRow) -> Result<Note> {
    let noteable_type: String = row.get("noteable_type");
    let note_type: String = row.get("note_type");
    Ok(Note {
        id: row.get("id"),
        discussion_id: row.get("discussion_id"),
        note_type: NoteType::from_db(&note_type),
        noteable_type: noteable_type.parse::<NoteableType>()?,
        noteable_id: row.get("noteable_id"),
        author: Author {
            id: row.get("author_id"),
            name: row.get("author_name"),
            username: row.get("author_username"),
        },
        note: row.get("note"),
        note_html: row.get("note_html"),
        created_at: row.get("created_at_utc"),
        updated_at: row.get("updated_at_utc"),
        current_user: NotePermissions::default(),
    })
}

fn map_notes(rows: Vec<PgRow>) -> Result<Vec<Note>> {
    rows.iter().map(map_note).collect()
}

/// Fresh discussion id for a note that does not reply to anything.
fn new_discussion_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn list_discussions(&self, noteable: NoteableRef) -> Result<Vec<Discussion>> {
        let rows = sqlx::query(&format!(
            "{} WHERE n.noteable_type = $1 AND n.noteable_id = $2 ORDER BY n.id",
            NOTE_SELECT
        ))
        .bind(noteable.noteable_type.as_str())
        .bind(noteable.noteable_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let notes = map_notes(rows)?;
        debug!(
            subsystem = "db",
            component = "notes",
            op = "list_discussions",
            noteable_id = noteable.noteable_id,
            result_count = notes.len(),
            "Loaded notes"
        );
        Ok(Discussion::group(notes))
    }

    async fn find_discussion(
        &self,
        noteable: NoteableRef,
        discussion_id: &str,
    ) -> Result<Option<Discussion>> {
        let rows = sqlx::query(&format!(
            "{} WHERE n.noteable_type = $1 AND n.noteable_id = $2 AND n.discussion_id = $3 ORDER BY n.id",
            NOTE_SELECT
        ))
        .bind(noteable.noteable_type.as_str())
        .bind(noteable.noteable_id)
        .bind(discussion_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Discussion::group(map_notes(rows)?).into_iter().next())
    }

    async fn notes_since(&self, noteable: NoteableRef, since: DateTime<Utc>) -> Result<Vec<Note>> {
        let rows = sqlx::query(&format!(
            "{} WHERE n.noteable_type = $1 AND n.noteable_id = $2 AND n.updated_at_utc > $3 ORDER BY n.id",
            NOTE_SELECT
        ))
        .bind(noteable.noteable_type.as_str())
        .bind(noteable.noteable_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        map_notes(rows)
    }

    async fn find(&self, id: i64) -> Result<Option<Note>> {
        let row = sqlx::query(&format!("{} WHERE n.id = $1", NOTE_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(map_note).transpose()
    }

    async fn insert(&self, req: CreateNoteRequest) -> Result<Note> {
        let (discussion_id, note_type) = match req.discussion_id {
            Some(discussion_id) => {
                if self
                    .find_discussion(req.noteable, &discussion_id)
                    .await?
                    .is_none()
                {
                    return Err(Error::NotFound(format!(
                        "Discussion {} not found",
                        discussion_id
                    )));
                }
                (discussion_id, NoteType::DiscussionNote)
            }
            None => (new_discussion_id(), NoteType::Note),
        };

        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO note (discussion_id, note_type, noteable_type, noteable_id, author_id, note, note_html, created_at_utc, updated_at_utc)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
             RETURNING id",
        )
        .bind(&discussion_id)
        .bind(note_type.as_str())
        .bind(req.noteable.noteable_type.as_str())
        .bind(req.noteable.noteable_id)
        .bind(req.author_id)
        .bind(&req.note)
        .bind(&req.note_html)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "notes",
            op = "insert",
            note_id = id,
            noteable_id = req.noteable.noteable_id,
            "Note created"
        );

        self.find(id).await?.ok_or(Error::NoteNotFound(id))
    }

    async fn update(&self, id: i64, note: &str, note_html: &str) -> Result<Note> {
        let result = sqlx::query(
            "UPDATE note SET note = $1, note_html = $2, updated_at_utc = $3 WHERE id = $4",
        )
        .bind(note)
        .bind(note_html)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }

        info!(
            subsystem = "db",
            component = "notes",
            op = "update",
            note_id = id,
            "Note updated"
        );

        self.find(id).await?.ok_or(Error::NoteNotFound(id))
    }
}
