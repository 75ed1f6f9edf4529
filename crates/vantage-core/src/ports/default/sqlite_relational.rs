//! Default relational + lexical store port: SQLite with FTS5.
//!
//! Connection setup and PRAGMA tuning grounded on
//! `storage/sqlite.rs::Storage::configure_connection`. Table layout follows
//! spec §6.3 (`entities`, `relationships`, `episodes`, `procedural_patterns`,
//! `topic_interest`, plus `documents` as the relational mirror of the
//! vector/lexical store's document schema, §3).

use crate::data::{Document, Entity, EntityType, Episode, Feedback, ProceduralPattern, Relationship, RelationshipType};
use crate::error::RelationalError;
use crate::ports::{Filters, LexicalHit, LexicalStore, RelationalStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    path TEXT NOT NULL,
    file_type TEXT NOT NULL,
    doc_type TEXT NOT NULL,
    summary TEXT NOT NULL,
    detailed_summary TEXT NOT NULL,
    keywords TEXT NOT NULL,
    entities TEXT NOT NULL,
    topics TEXT NOT NULL,
    full_content TEXT NOT NULL,
    embedding TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    page_count INTEGER,
    author TEXT,
    partial_index INTEGER NOT NULL DEFAULT 0
);

CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
    id UNINDEXED,
    summary,
    filename,
    keywords,
    full_content,
    tokenize = 'porter unicode61'
);

CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    name_key TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    document_ids TEXT NOT NULL,
    properties TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_entities_name_key ON entities(name_key, entity_type);

CREATE TABLE IF NOT EXISTS relationships (
    source_id TEXT NOT NULL,
    target_id TEXT NOT NULL,
    edge_type TEXT NOT NULL,
    weight REAL NOT NULL,
    document_ids TEXT NOT NULL,
    PRIMARY KEY (source_id, target_id, edge_type)
);
CREATE INDEX IF NOT EXISTS idx_relationships_source ON relationships(source_id);
CREATE INDEX IF NOT EXISTS idx_relationships_target ON relationships(target_id);

CREATE TABLE IF NOT EXISTS episodes (
    id TEXT PRIMARY KEY,
    user_id TEXT,
    query TEXT NOT NULL,
    query_embedding TEXT NOT NULL,
    response TEXT NOT NULL,
    result_ids TEXT NOT NULL,
    confidence REAL NOT NULL,
    feedback INTEGER NOT NULL,
    timestamp TEXT NOT NULL,
    access_count INTEGER NOT NULL,
    decay_factor REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_episodes_user ON episodes(user_id);

CREATE TABLE IF NOT EXISTS procedural_patterns (
    id TEXT PRIMARY KEY,
    user_id TEXT,
    pattern_type TEXT NOT NULL,
    data_key TEXT NOT NULL,
    data TEXT NOT NULL,
    success_count INTEGER NOT NULL DEFAULT 0,
    failure_count INTEGER NOT NULL DEFAULT 0,
    UNIQUE(user_id, pattern_type, data_key)
);

CREATE TABLE IF NOT EXISTS topic_interest (
    user_id TEXT NOT NULL DEFAULT '',
    topic TEXT NOT NULL,
    weight REAL NOT NULL DEFAULT 0.0,
    PRIMARY KEY (user_id, topic)
);

CREATE TABLE IF NOT EXISTS user_profiles (
    user_id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    last_seen_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS search_history (
    id TEXT PRIMARY KEY,
    user_id TEXT,
    query TEXT NOT NULL,
    intent TEXT,
    result_count INTEGER NOT NULL DEFAULT 0,
    timestamp TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS document_access (
    document_id TEXT NOT NULL,
    user_id TEXT,
    accessed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    user_id TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, RelationalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RelationalError::Unavailable(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, RelationalError> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn configure(conn: &Connection) -> Result<(), RelationalError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    let keywords: Vec<String> = serde_json::from_str(&row.get::<_, String>("keywords")?).unwrap_or_default();
    let entities: Vec<String> = serde_json::from_str(&row.get::<_, String>("entities")?).unwrap_or_default();
    let topics: Vec<String> = serde_json::from_str(&row.get::<_, String>("topics")?).unwrap_or_default();
    let embedding: Vec<f32> = serde_json::from_str(&row.get::<_, String>("embedding")?).unwrap_or_default();
    Ok(Document {
        id: row.get("id")?,
        filename: row.get("filename")?,
        path: row.get("path")?,
        file_type: row.get("file_type")?,
        doc_type: row.get("doc_type")?,
        summary: row.get("summary")?,
        detailed_summary: row.get("detailed_summary")?,
        keywords: keywords.into_iter().collect(),
        entities: entities.into_iter().collect(),
        topics: topics.into_iter().collect(),
        full_content: row.get("full_content")?,
        embedding,
        created_at: row.get::<_, DateTime<Utc>>("created_at")?,
        updated_at: row.get::<_, DateTime<Utc>>("updated_at")?,
        file_size: row.get::<_, i64>("file_size")? as u64,
        page_count: row.get::<_, Option<i64>>("page_count")?.map(|v| v as u32),
        author: row.get("author")?,
        partial_index: row.get::<_, i64>("partial_index")? != 0,
    })
}

#[async_trait]
impl RelationalStore for SqliteStore {
    async fn upsert_document(&self, doc: &Document) -> Result<(), RelationalError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO documents (id, filename, path, file_type, doc_type, summary, detailed_summary,
                keywords, entities, topics, full_content, embedding, created_at, updated_at, file_size,
                page_count, author, partial_index)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)
             ON CONFLICT(id) DO UPDATE SET
                filename=excluded.filename, path=excluded.path, file_type=excluded.file_type,
                doc_type=excluded.doc_type, summary=excluded.summary,
                detailed_summary=excluded.detailed_summary, keywords=excluded.keywords,
                entities=excluded.entities, topics=excluded.topics, full_content=excluded.full_content,
                embedding=excluded.embedding, updated_at=excluded.updated_at, file_size=excluded.file_size,
                page_count=excluded.page_count, author=excluded.author, partial_index=excluded.partial_index",
            params![
                doc.id,
                doc.filename,
                doc.path,
                doc.file_type,
                doc.doc_type,
                doc.summary,
                doc.detailed_summary,
                serde_json::to_string(&doc.keywords).unwrap(),
                serde_json::to_string(&doc.entities).unwrap(),
                serde_json::to_string(&doc.topics).unwrap(),
                doc.full_content,
                serde_json::to_string(&doc.embedding).unwrap(),
                doc.created_at,
                doc.updated_at,
                doc.file_size as i64,
                doc.page_count.map(|v| v as i64),
                doc.author,
                doc.partial_index as i64,
            ],
        )?;
        conn.execute("DELETE FROM documents_fts WHERE id = ?1", params![doc.id])?;
        conn.execute(
            "INSERT INTO documents_fts (id, summary, filename, keywords, full_content) VALUES (?1,?2,?3,?4,?5)",
            params![
                doc.id,
                doc.summary,
                doc.filename,
                doc.keywords.iter().cloned().collect::<Vec<_>>().join(" "),
                doc.full_content,
            ],
        )?;
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>, RelationalError> {
        let conn = self.lock();
        conn.query_row("SELECT * FROM documents WHERE id = ?1", params![id], row_to_document)
            .optional()
            .map_err(RelationalError::from)
    }

    async fn list_documents(&self, filters: &Filters, limit: usize, offset: usize) -> Result<Vec<Document>, RelationalError> {
        let conn = self.lock();
        let mut sql = "SELECT * FROM documents".to_string();
        if filters.contains_key("doc_type") {
            sql.push_str(" WHERE doc_type = :doc_type");
        }
        sql.push_str(" ORDER BY updated_at DESC LIMIT :limit OFFSET :offset");
        let mut stmt = conn.prepare(&sql)?;
        let doc_type = filters.get("doc_type").and_then(|v| match v {
            crate::ports::FilterValue::Scalar(serde_json::Value::String(s)) => Some(s.clone()),
            _ => None,
        });
        let rows = if let Some(ref dt) = doc_type {
            stmt.query_map(
                rusqlite::named_params! { ":doc_type": dt, ":limit": limit as i64, ":offset": offset as i64 },
                row_to_document,
            )?
        } else {
            stmt.query_map(rusqlite::named_params! { ":limit": limit as i64, ":offset": offset as i64 }, row_to_document)?
        };
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(RelationalError::from)
    }

    async fn delete_document(&self, id: &str) -> Result<(), RelationalError> {
        let conn = self.lock();
        conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        conn.execute("DELETE FROM documents_fts WHERE id = ?1", params![id])?;
        Ok(())
    }

    async fn upsert_entity(&self, entity: &Entity) -> Result<(), RelationalError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO entities (id, name, name_key, entity_type, document_ids, properties)
             VALUES (?1,?2,?3,?4,?5,?6)
             ON CONFLICT(id) DO UPDATE SET name=excluded.name, name_key=excluded.name_key,
                entity_type=excluded.entity_type, document_ids=excluded.document_ids,
                properties=excluded.properties",
            params![
                entity.id,
                entity.name,
                entity.lookup_key(),
                serde_json::to_string(&entity.entity_type).unwrap(),
                serde_json::to_string(&entity.document_ids).unwrap(),
                serde_json::to_string(&entity.properties).unwrap(),
            ],
        )?;
        Ok(())
    }

    async fn get_entity(&self, id: &str) -> Result<Option<Entity>, RelationalError> {
        let conn = self.lock();
        conn.query_row("SELECT * FROM entities WHERE id = ?1", params![id], row_to_entity)
            .optional()
            .map_err(RelationalError::from)
    }

    async fn find_entity_by_name(&self, normalized_name: &str, entity_type: EntityType) -> Result<Option<Entity>, RelationalError> {
        let conn = self.lock();
        conn.query_row(
            "SELECT * FROM entities WHERE name_key = ?1 AND entity_type = ?2",
            params![normalized_name, serde_json::to_string(&entity_type).unwrap()],
            row_to_entity,
        )
        .optional()
        .map_err(RelationalError::from)
    }

    async fn all_entities(&self) -> Result<Vec<Entity>, RelationalError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT * FROM entities")?;
        let rows = stmt.query_map([], row_to_entity)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(RelationalError::from)
    }

    async fn delete_entity(&self, id: &str) -> Result<(), RelationalError> {
        let conn = self.lock();
        conn.execute("DELETE FROM entities WHERE id = ?1", params![id])?;
        conn.execute("DELETE FROM relationships WHERE source_id = ?1 OR target_id = ?1", params![id])?;
        Ok(())
    }

    async fn upsert_relationship(&self, rel: &Relationship) -> Result<(), RelationalError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO relationships (source_id, target_id, edge_type, weight, document_ids)
             VALUES (?1,?2,?3,?4,?5)
             ON CONFLICT(source_id, target_id, edge_type) DO UPDATE SET
                weight=excluded.weight, document_ids=excluded.document_ids",
            params![
                rel.source_id,
                rel.target_id,
                rel.edge_type.to_string(),
                rel.weight,
                serde_json::to_string(&rel.document_ids).unwrap(),
            ],
        )?;
        Ok(())
    }

    async fn relationships_from(&self, source_id: &str) -> Result<Vec<Relationship>, RelationalError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT * FROM relationships WHERE source_id = ?1")?;
        let rows = stmt.query_map(params![source_id], row_to_relationship)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(RelationalError::from)
    }

    async fn relationships_touching(&self, entity_id: &str) -> Result<Vec<Relationship>, RelationalError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT * FROM relationships WHERE source_id = ?1 OR target_id = ?1")?;
        let rows = stmt.query_map(params![entity_id], row_to_relationship)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(RelationalError::from)
    }

    async fn delete_relationships_for_document(&self, entity_id: &str, doc_id: &str) -> Result<(), RelationalError> {
        let rels = self.relationships_touching(entity_id).await?;
        let conn = self.lock();
        for mut rel in rels.into_iter().filter(|r| r.edge_type.is_mentions() && r.document_ids.contains(doc_id)) {
            rel.document_ids.remove(doc_id);
            if rel.document_ids.is_empty() {
                conn.execute(
                    "DELETE FROM relationships WHERE source_id=?1 AND target_id=?2 AND edge_type=?3",
                    params![rel.source_id, rel.target_id, rel.edge_type.to_string()],
                )?;
            } else {
                conn.execute(
                    "UPDATE relationships SET document_ids=?4 WHERE source_id=?1 AND target_id=?2 AND edge_type=?3",
                    params![rel.source_id, rel.target_id, rel.edge_type.to_string(), serde_json::to_string(&rel.document_ids).unwrap()],
                )?;
            }
        }
        Ok(())
    }

    async fn insert_episode(&self, episode: &Episode) -> Result<(), RelationalError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO episodes (id, user_id, query, query_embedding, response, result_ids,
                confidence, feedback, timestamp, access_count, decay_factor)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
            params![
                episode.id,
                episode.user_id,
                episode.query,
                serde_json::to_string(&episode.query_embedding).unwrap(),
                episode.response,
                serde_json::to_string(&episode.result_ids).unwrap(),
                episode.confidence,
                episode.feedback.as_i8(),
                episode.timestamp,
                episode.access_count as i64,
                episode.decay_factor,
            ],
        )?;
        Ok(())
    }

    async fn get_episode(&self, id: &str) -> Result<Option<Episode>, RelationalError> {
        let conn = self.lock();
        conn.query_row("SELECT * FROM episodes WHERE id = ?1", params![id], row_to_episode)
            .optional()
            .map_err(RelationalError::from)
    }

    async fn update_episode(&self, episode: &Episode) -> Result<(), RelationalError> {
        let conn = self.lock();
        conn.execute(
            "UPDATE episodes SET feedback=?2, access_count=?3, decay_factor=?4 WHERE id=?1",
            params![episode.id, episode.feedback.as_i8(), episode.access_count as i64, episode.decay_factor],
        )?;
        Ok(())
    }

    async fn episodes_for_user(&self, user_id: Option<&str>) -> Result<Vec<Episode>, RelationalError> {
        let conn = self.lock();
        let mut stmt = match user_id {
            Some(_) => conn.prepare("SELECT * FROM episodes WHERE user_id = ?1")?,
            None => conn.prepare("SELECT * FROM episodes WHERE user_id IS NULL")?,
        };
        let rows = match user_id {
            Some(uid) => stmt.query_map(params![uid], row_to_episode)?,
            None => stmt.query_map(params![], row_to_episode)?,
        };
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(RelationalError::from)
    }

    async fn delete_episode(&self, id: &str) -> Result<(), RelationalError> {
        let conn = self.lock();
        conn.execute("DELETE FROM episodes WHERE id = ?1", params![id])?;
        Ok(())
    }

    async fn upsert_procedural_pattern(&self, pattern: &ProceduralPattern) -> Result<(), RelationalError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO procedural_patterns (id, user_id, pattern_type, data_key, data, success_count, failure_count)
             VALUES (?1,?2,?3,?4,?5,?6,?7)
             ON CONFLICT(user_id, pattern_type, data_key) DO UPDATE SET
                data=excluded.data, success_count=excluded.success_count, failure_count=excluded.failure_count",
            params![
                pattern.id,
                pattern.user_id,
                pattern.pattern_type,
                pattern.data_key,
                pattern.data.to_string(),
                pattern.success_count as i64,
                pattern.failure_count as i64,
            ],
        )?;
        Ok(())
    }

    async fn find_procedural_pattern(&self, user_id: Option<&str>, pattern_type: &str, data_key: &str) -> Result<Option<ProceduralPattern>, RelationalError> {
        let conn = self.lock();
        let sql = "SELECT * FROM procedural_patterns WHERE (user_id = ?1 OR (?1 IS NULL AND user_id IS NULL)) AND pattern_type = ?2 AND data_key = ?3";
        conn.query_row(sql, params![user_id, pattern_type, data_key], row_to_pattern)
            .optional()
            .map_err(RelationalError::from)
    }

    async fn procedural_patterns_for(&self, user_id: Option<&str>, pattern_type: &str) -> Result<Vec<ProceduralPattern>, RelationalError> {
        let conn = self.lock();
        let sql = "SELECT * FROM procedural_patterns WHERE (user_id = ?1 OR (?1 IS NULL AND user_id IS NULL)) AND pattern_type = ?2";
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![user_id, pattern_type], row_to_pattern)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(RelationalError::from)
    }

    async fn record_topic_interest(&self, user_id: Option<&str>, topic: &str, delta: f64) -> Result<(), RelationalError> {
        let conn = self.lock();
        let uid = user_id.unwrap_or("");
        conn.execute(
            "INSERT INTO topic_interest (user_id, topic, weight) VALUES (?1,?2,?3)
             ON CONFLICT(user_id, topic) DO UPDATE SET weight = weight + excluded.weight",
            params![uid, topic, delta],
        )?;
        Ok(())
    }

    async fn topic_preferences(&self, user_id: Option<&str>) -> Result<BTreeMap<String, f64>, RelationalError> {
        let conn = self.lock();
        let uid = user_id.unwrap_or("");
        let mut stmt = conn.prepare("SELECT topic, weight FROM topic_interest WHERE user_id = ?1")?;
        let rows = stmt.query_map(params![uid], |r| Ok((r.get::<_, String>(0)?, r.get::<_, f64>(1)?)))?;
        let mut out = BTreeMap::new();
        for row in rows {
            let (topic, weight) = row?;
            out.insert(topic, weight);
        }
        Ok(out)
    }
}

fn row_to_entity(row: &rusqlite::Row) -> rusqlite::Result<Entity> {
    let entity_type: EntityType = serde_json::from_str(&row.get::<_, String>("entity_type")?).unwrap_or(EntityType::Concept);
    let document_ids: std::collections::BTreeSet<String> = serde_json::from_str(&row.get::<_, String>("document_ids")?).unwrap_or_default();
    let properties: BTreeMap<String, String> = serde_json::from_str(&row.get::<_, String>("properties")?).unwrap_or_default();
    Ok(Entity { id: row.get("id")?, name: row.get("name")?, entity_type, document_ids, properties })
}

fn row_to_relationship(row: &rusqlite::Row) -> rusqlite::Result<Relationship> {
    let edge_type_str: String = row.get("edge_type")?;
    let document_ids: std::collections::BTreeSet<String> = serde_json::from_str(&row.get::<_, String>("document_ids")?).unwrap_or_default();
    Ok(Relationship {
        source_id: row.get("source_id")?,
        target_id: row.get("target_id")?,
        edge_type: RelationshipType::from(edge_type_str.as_str()),
        weight: row.get("weight")?,
        document_ids,
    })
}

fn row_to_episode(row: &rusqlite::Row) -> rusqlite::Result<Episode> {
    let query_embedding: Vec<f32> = serde_json::from_str(&row.get::<_, String>("query_embedding")?).unwrap_or_default();
    let result_ids: Vec<String> = serde_json::from_str(&row.get::<_, String>("result_ids")?).unwrap_or_default();
    let feedback = match row.get::<_, i64>("feedback")? {
        -1 => Feedback::Negative,
        1 => Feedback::Positive,
        _ => Feedback::Neutral,
    };
    Ok(Episode {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        query: row.get("query")?,
        query_embedding,
        response: row.get("response")?,
        result_ids,
        confidence: row.get("confidence")?,
        feedback,
        timestamp: row.get::<_, DateTime<Utc>>("timestamp")?,
        access_count: row.get::<_, i64>("access_count")? as u64,
        decay_factor: row.get("decay_factor")?,
    })
}

fn row_to_pattern(row: &rusqlite::Row) -> rusqlite::Result<ProceduralPattern> {
    let data: serde_json::Value = serde_json::from_str(&row.get::<_, String>("data")?).unwrap_or(serde_json::Value::Null);
    Ok(ProceduralPattern {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        pattern_type: row.get("pattern_type")?,
        data_key: row.get("data_key")?,
        data,
        success_count: row.get::<_, i64>("success_count")? as u64,
        failure_count: row.get::<_, i64>("failure_count")? as u64,
    })
}

/// Escape an FTS5 MATCH query so user text can't break query syntax;
/// wraps each term for AND-of-terms matching with implicit prefix/fuzz via
/// FTS5's porter tokenizer.
fn sanitize_fts5_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Lexical multi-match port backed by the same SQLite connection as
/// [`SqliteStore`]'s relational tables (spec §4.2 stage 3 field weights
/// are approximated by FTS5 column weighting via `bm25(documents_fts, ...)`,
/// since FTS5 doesn't support true per-query boosts).
pub struct Fts5LexicalStore {
    store: std::sync::Arc<SqliteStore>,
}

impl Fts5LexicalStore {
    pub fn new(store: std::sync::Arc<SqliteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LexicalStore for Fts5LexicalStore {
    async fn upsert(&self, _doc: &Document) -> Result<(), crate::error::LexicalStoreError> {
        // Upserts happen inside SqliteStore::upsert_document to keep the
        // FTS shadow table transactionally consistent with the row table.
        Ok(())
    }

    async fn delete(&self, _doc_id: &str) -> Result<(), crate::error::LexicalStoreError> {
        Ok(())
    }

    async fn multi_match(&self, query: &str, k: usize, _filters: &Filters) -> Result<Vec<LexicalHit>, crate::error::LexicalStoreError> {
        let conn = self.store.lock();
        let fts_query = sanitize_fts5_query(query);
        if fts_query.is_empty() {
            return Ok(Vec::new());
        }
        // bm25() weights approximate spec §4.2's {summary^3, filename^2,
        // keywords^1.5, full_content^1} over columns (id, summary, filename, keywords, full_content).
        let sql = "SELECT id, bm25(documents_fts, 0.0, 3.0, 2.0, 1.5, 1.0) AS rank
                   FROM documents_fts WHERE documents_fts MATCH ?1 ORDER BY rank LIMIT ?2";
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| crate::error::LexicalStoreError::Query(e.to_string()))?;
        let rows = stmt
            .query_map(params![fts_query, k as i64], |row| {
                let id: String = row.get(0)?;
                let rank: f64 = row.get(1)?;
                // bm25() is more-negative-is-better; flip sign to a positive score.
                Ok(LexicalHit { doc_id: id, score: (-rank) as f32 })
            })
            .map_err(|e| crate::error::LexicalStoreError::Query(e.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| crate::error::LexicalStoreError::Query(e.to_string()))
    }
}

impl From<&str> for RelationshipType {
    fn from(s: &str) -> Self {
        match s {
            "MENTIONS" => RelationshipType::Mentions,
            "CO_OCCURS" => RelationshipType::CoOccurs,
            "WORKS_AT" => RelationshipType::WorksAt,
            "LOCATED_IN" => RelationshipType::LocatedIn,
            "RELATED_TO" => RelationshipType::RelatedTo,
            "CREATED_BY" => RelationshipType::CreatedBy,
            other => RelationshipType::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RelationshipType::Mentions => "MENTIONS",
            RelationshipType::CoOccurs => "CO_OCCURS",
            RelationshipType::WorksAt => "WORKS_AT",
            RelationshipType::LocatedIn => "LOCATED_IN",
            RelationshipType::RelatedTo => "RELATED_TO",
            RelationshipType::CreatedBy => "CREATED_BY",
            RelationshipType::Other(s) => s,
        };
        write!(f, "{s}")
    }
}
