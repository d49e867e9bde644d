//! Keyword store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide lookup/create/update/delete APIs for notes, contexts and
//!   definitions.
//! - Translate unique-constraint failures into `RepoError::Duplicate`.
//!
//! # Invariants
//! - Names are normalized (`normalize_name`) before every query.
//! - Definitions are addressed by `(note, context)`; `context = None` is the
//!   note's context-less definition and is matched with `IS NULL` semantics.
//! - Deleting a note or a context cascades to its definitions only.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::context::Context;
use crate::model::name::{normalize_name, NameError};
use crate::model::note::{Definition, Note};
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const DEFINITION_SELECT_SQL: &str = "SELECT
    d.note_uuid,
    d.body,
    d.updated_at,
    c.uuid AS context_uuid,
    c.name AS context_name,
    c.description AS context_description
FROM definitions d
LEFT JOIN contexts c ON c.uuid = d.context_uuid";

pub type RepoResult<T> = Result<T, RepoError>;

/// Kind of record a repository error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Note,
    Context,
    Definition,
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Note => write!(f, "note"),
            Self::Context => write!(f, "context"),
            Self::Definition => write!(f, "definition"),
        }
    }
}

/// Repository error for keyword store operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite failure; the store is unusable for this call.
    Db(DbError),
    /// A record with the same normalized name (or pair) already exists.
    Duplicate { entity: Entity, name: String },
    /// Update/delete target does not exist.
    NotFound { entity: Entity, name: String },
    /// Caller-provided name cannot be normalized.
    InvalidName(NameError),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Duplicate { entity, name } => write!(f, "{entity} already exists: `{name}`"),
            Self::NotFound { entity, name } => write!(f, "{entity} not found: `{name}`"),
            Self::InvalidName(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid keyword store data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "keyword store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "keyword store requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidName(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<NameError> for RepoError {
    fn from(value: NameError) -> Self {
        Self::InvalidName(value)
    }
}

/// Keyword store contract.
///
/// Implementations must treat names case-insensitively and report unique
/// violations as `RepoError::Duplicate`.
pub trait NoteStore {
    fn find_note(&self, name: &str) -> RepoResult<Option<Note>>;
    fn find_context(&self, name: &str) -> RepoResult<Option<Context>>;
    fn create_note(&self, name: &str) -> RepoResult<Note>;
    fn create_context(&self, name: &str, description: &str) -> RepoResult<Context>;
    fn find_definition(
        &self,
        note: &Note,
        context: Option<&Context>,
    ) -> RepoResult<Option<Definition>>;
    fn create_definition(
        &self,
        note: &Note,
        context: Option<&Context>,
        body: &str,
    ) -> RepoResult<Definition>;
    /// Replaces the body of an existing `(note, context)` definition.
    fn update_definition(&self, note: &Note, context: Option<&Context>, body: &str)
        -> RepoResult<()>;
    /// Lists every definition of `note` in creation order.
    fn list_definitions(&self, note: &Note) -> RepoResult<Vec<Definition>>;
    fn delete_note(&self, note: &Note) -> RepoResult<()>;
    /// Deletes the context and the definitions scoped to it. Notes stay.
    fn delete_context(&self, context: &Context) -> RepoResult<()>;
    /// Lists all notes sorted by name.
    fn list_notes(&self) -> RepoResult<Vec<Note>>;
    /// Lists all contexts sorted by name.
    fn list_contexts(&self) -> RepoResult<Vec<Context>>;
    /// Lists notes holding a definition scoped to `context`, sorted by name.
    fn list_notes_in_context(&self, context: &Context) -> RepoResult<Vec<Note>>;
}

/// SQLite-backed keyword store.
///
/// Borrows a connection, so it works equally on a plain `Connection` and on
/// an open `Transaction` (which derefs to one).
pub struct SqliteNoteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteStore<'conn> {
    /// Constructs a store from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NoteStore for SqliteNoteStore<'_> {
    fn find_note(&self, name: &str) -> RepoResult<Option<Note>> {
        let name = normalize_name(name)?;
        let mut stmt = self
            .conn
            .prepare("SELECT uuid, name FROM notes WHERE name = ?1;")?;
        let mut rows = stmt.query([name.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    fn find_context(&self, name: &str) -> RepoResult<Option<Context>> {
        let name = normalize_name(name)?;
        let mut stmt = self
            .conn
            .prepare("SELECT uuid, name, description FROM contexts WHERE name = ?1;")?;
        let mut rows = stmt.query([name.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_context_row(row)?));
        }
        Ok(None)
    }

    fn create_note(&self, name: &str) -> RepoResult<Note> {
        let note = Note::new(normalize_name(name)?);
        self.conn
            .execute(
                "INSERT INTO notes (uuid, name) VALUES (?1, ?2);",
                params![note.uuid.to_string(), note.name.as_str()],
            )
            .map_err(|err| map_unique_violation(err, Entity::Note, &note.name))?;
        Ok(note)
    }

    fn create_context(&self, name: &str, description: &str) -> RepoResult<Context> {
        let context = Context::new(normalize_name(name)?, description.trim());
        self.conn
            .execute(
                "INSERT INTO contexts (uuid, name, description) VALUES (?1, ?2, ?3);",
                params![
                    context.uuid.to_string(),
                    context.name.as_str(),
                    context.description.as_str()
                ],
            )
            .map_err(|err| map_unique_violation(err, Entity::Context, &context.name))?;
        Ok(context)
    }

    fn find_definition(
        &self,
        note: &Note,
        context: Option<&Context>,
    ) -> RepoResult<Option<Definition>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DEFINITION_SELECT_SQL}
             WHERE d.note_uuid = ?1
               AND d.context_uuid IS ?2;"
        ))?;
        let mut rows = stmt.query(params![
            note.uuid.to_string(),
            context.map(|context| context.uuid.to_string())
        ])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_definition_row(row)?));
        }
        Ok(None)
    }

    fn create_definition(
        &self,
        note: &Note,
        context: Option<&Context>,
        body: &str,
    ) -> RepoResult<Definition> {
        self.conn
            .execute(
                "INSERT INTO definitions (note_uuid, context_uuid, body) VALUES (?1, ?2, ?3);",
                params![
                    note.uuid.to_string(),
                    context.map(|context| context.uuid.to_string()),
                    body
                ],
            )
            .map_err(|err| map_unique_violation(err, Entity::Definition, &note.name))?;
        touch_note(self.conn, note)?;

        self.find_definition(note, context)?.ok_or_else(|| {
            RepoError::InvalidData(format!(
                "definition for `{}` missing right after insert",
                note.name
            ))
        })
    }

    fn update_definition(
        &self,
        note: &Note,
        context: Option<&Context>,
        body: &str,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE definitions
             SET
                body = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE note_uuid = ?1
               AND context_uuid IS ?2;",
            params![
                note.uuid.to_string(),
                context.map(|context| context.uuid.to_string()),
                body
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: Entity::Definition,
                name: note.name.clone(),
            });
        }

        touch_note(self.conn, note)
    }

    fn list_definitions(&self, note: &Note) -> RepoResult<Vec<Definition>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DEFINITION_SELECT_SQL}
             WHERE d.note_uuid = ?1
             ORDER BY d.created_at ASC, d.rowid ASC;"
        ))?;
        let mut rows = stmt.query([note.uuid.to_string()])?;
        let mut definitions = Vec::new();
        while let Some(row) = rows.next()? {
            definitions.push(parse_definition_row(row)?);
        }
        Ok(definitions)
    }

    fn delete_note(&self, note: &Note) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE uuid = ?1;", [note.uuid.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: Entity::Note,
                name: note.name.clone(),
            });
        }
        Ok(())
    }

    fn delete_context(&self, context: &Context) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM contexts WHERE uuid = ?1;",
            [context.uuid.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: Entity::Context,
                name: context.name.clone(),
            });
        }
        Ok(())
    }

    fn list_notes(&self) -> RepoResult<Vec<Note>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid, name FROM notes ORDER BY name ASC;")?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn list_contexts(&self) -> RepoResult<Vec<Context>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid, name, description FROM contexts ORDER BY name ASC;")?;
        let mut rows = stmt.query([])?;
        let mut contexts = Vec::new();
        while let Some(row) = rows.next()? {
            contexts.push(parse_context_row(row)?);
        }
        Ok(contexts)
    }

    fn list_notes_in_context(&self, context: &Context) -> RepoResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT n.uuid, n.name
             FROM notes n
             INNER JOIN definitions d ON d.note_uuid = n.uuid
             WHERE d.context_uuid = ?1
             ORDER BY n.name ASC;",
        )?;
        let mut rows = stmt.query([context.uuid.to_string()])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }
}

/// Returns whether a SQLite error is a unique/primary-key violation.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(inner, _) => {
            inner.code == ErrorCode::ConstraintViolation
                && (inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

fn map_unique_violation(err: rusqlite::Error, entity: Entity, name: &str) -> RepoError {
    if is_unique_violation(&err) {
        RepoError::Duplicate {
            entity,
            name: name.to_string(),
        }
    } else {
        err.into()
    }
}

fn touch_note(conn: &Connection, note: &Note) -> RepoResult<()> {
    conn.execute(
        "UPDATE notes
         SET updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?1;",
        [note.uuid.to_string()],
    )?;
    Ok(())
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Note {
        uuid: parse_uuid(&uuid_text, "notes.uuid")?,
        name: row.get("name")?,
    })
}

fn parse_context_row(row: &Row<'_>) -> RepoResult<Context> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Context {
        uuid: parse_uuid(&uuid_text, "contexts.uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
    })
}

fn parse_definition_row(row: &Row<'_>) -> RepoResult<Definition> {
    let note_uuid: String = row.get("note_uuid")?;
    let context = match row.get::<_, Option<String>>("context_uuid")? {
        Some(uuid_text) => Some(Context {
            uuid: parse_uuid(&uuid_text, "definitions.context_uuid")?,
            name: row.get("context_name")?,
            description: row.get("context_description")?,
        }),
        None => None,
    };

    Ok(Definition {
        note_id: parse_uuid(&note_uuid, "definitions.note_uuid")?,
        context,
        body: row.get("body")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_store_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["notes", "contexts", "definitions"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
