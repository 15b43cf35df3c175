use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, params};

use super::SupportError;
use super::embed::{HashingEmbedder, cosine_distance};

/// Hits returned when the caller does not ask for a count.
pub const TOP_K_RESULTS: usize = 3;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    source TEXT NOT NULL,
    embedding BLOB NOT NULL
);
";

#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub source: String,
    /// Cosine distance to the query; smaller is closer.
    pub distance: f32,
}

/// Documents with their embeddings, searched by brute-force cosine
/// distance.
pub struct KnowledgeBase {
    conn: Mutex<Connection>,
    embedder: HashingEmbedder,
    source_dir: PathBuf,
}

impl KnowledgeBase {
    /// Opens the index at `index_path`. Documents are loaded from
    /// `source_dir` by [`KnowledgeBase::ensure_loaded`].
    pub fn open(
        index_path: &Path,
        source_dir: impl Into<PathBuf>,
    ) -> Result<Self, SupportError> {
        if let Some(parent) = index_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(index_path)?;
        debug!("opened knowledge index at {}", index_path.display());
        Self::with_connection(conn, source_dir.into())
    }

    pub fn open_in_memory(
        source_dir: impl Into<PathBuf>,
    ) -> Result<Self, SupportError> {
        Self::with_connection(Connection::open_in_memory()?, source_dir.into())
    }

    fn with_connection(
        conn: Connection,
        source_dir: PathBuf,
    ) -> Result<Self, SupportError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            embedder: HashingEmbedder::default(),
            source_dir,
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds or replaces a document.
    pub fn add_document(
        &self,
        id: &str,
        content: &str,
        source: &str,
    ) -> Result<(), SupportError> {
        let embedding = encode(&self.embedder.embed(content));
        self.conn().execute(
            "INSERT OR REPLACE INTO documents (id, content, source, embedding)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, content, source, embedding],
        )?;
        Ok(())
    }

    pub fn count(&self) -> Result<usize, SupportError> {
        let count: i64 =
            self.conn()
                .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Indexes every `.txt` and `.md` file in the source directory, using
    /// the file name as id and source. A missing directory loads nothing.
    pub fn load_source_files(&self) -> Result<usize, SupportError> {
        let entries = match fs::read_dir(&self.source_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_text = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| matches!(ext, "txt" | "md"));
            if is_text && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let content = fs::read_to_string(path)?;
            self.add_document(&name, &content, &name)?;
        }
        info!(
            "loaded {} knowledge files from {}",
            paths.len(),
            self.source_dir.display()
        );
        Ok(paths.len())
    }

    /// Loads the source files if the index is empty.
    pub fn ensure_loaded(&self) -> Result<(), SupportError> {
        if self.count()? == 0 {
            self.load_source_files()?;
        }
        Ok(())
    }

    /// Returns the `top_k` documents nearest to `query`.
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, SupportError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SupportError::EmptyQuery);
        }
        let target = self.embedder.embed(query);

        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, content, source, embedding FROM documents")?;
        let rows = stmt.query_map([], |row| {
            let embedding: Vec<u8> = row.get(3)?;
            Ok(SearchHit {
                id: row.get(0)?,
                content: row.get(1)?,
                source: row.get(2)?,
                distance: cosine_distance(&target, &decode(&embedding)),
            })
        })?;
        let mut hits = rows.collect::<Result<Vec<_>, _>>()?;
        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}

fn encode(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
