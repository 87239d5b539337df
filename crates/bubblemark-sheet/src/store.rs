//! Template persistence
//!
//! Templates are written once when a sheet is generated and read for every
//! scanned page. Both stores allow one writer and many concurrent readers.

use crate::template::BubbleTemplate;
use crate::{SheetError, SheetResult};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Storage of bubble templates keyed by lecture and page
pub trait TemplateStore: Send + Sync {
    /// Templates of one page ordered by row number. Empty if none are stored.
    fn get_templates(&self, lecture_id: &str, page_number: u32) -> SheetResult<Vec<BubbleTemplate>>;

    /// Insert templates, replacing any with the same
    /// `(lecture_id, page_number, student_id)`.
    fn save_templates(&self, templates: &[BubbleTemplate]) -> SheetResult<()>;
}

type PageKey = (String, u32);

fn merge(page: &mut Vec<BubbleTemplate>, t: &BubbleTemplate) {
    match page.iter_mut().find(|e| e.student_id == t.student_id) {
        Some(existing) => *existing = t.clone(),
        None => page.push(t.clone()),
    }
}

fn sorted(mut page: Vec<BubbleTemplate>) -> Vec<BubbleTemplate> {
    page.sort_by_key(|t| t.row_number);
    page
}

/// In-process template store
#[derive(Debug, Default)]
pub struct InMemoryTemplateStore {
    pages: RwLock<HashMap<PageKey, Vec<BubbleTemplate>>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn get_templates(&self, lecture_id: &str, page_number: u32) -> SheetResult<Vec<BubbleTemplate>> {
        let pages = self
            .pages
            .read()
            .map_err(|_| SheetError::Store("template store lock poisoned".to_string()))?;
        Ok(sorted(
            pages
                .get(&(lecture_id.to_string(), page_number))
                .cloned()
                .unwrap_or_default(),
        ))
    }

    fn save_templates(&self, templates: &[BubbleTemplate]) -> SheetResult<()> {
        let mut pages = self
            .pages
            .write()
            .map_err(|_| SheetError::Store("template store lock poisoned".to_string()))?;
        for t in templates {
            merge(
                pages.entry((t.lecture_id.clone(), t.page_number)).or_default(),
                t,
            );
        }
        Ok(())
    }
}

/// Template store keeping one JSON file per lecture in a directory
#[derive(Debug)]
pub struct JsonDirTemplateStore {
    root: PathBuf,
    lock: RwLock<()>,
}

impl JsonDirTemplateStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(root: P) -> SheetResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| SheetError::Store(e.to_string()))?;
        Ok(Self {
            root,
            lock: RwLock::new(()),
        })
    }

    fn path_for(&self, lecture_id: &str) -> PathBuf {
        let name: String = lecture_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.root.join(format!("{}.json", name))
    }

    /// Write through a temp file in the store directory and rename it over
    /// `path`, so readers see either the old or the new file.
    fn replace_file(&self, path: &Path, contents: &str) -> SheetResult<()> {
        let fail = |e: std::io::Error| SheetError::Store(format!("{}: {}", path.display(), e));
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root).map_err(fail)?;
        tmp.write_all(contents.as_bytes()).map_err(fail)?;
        tmp.as_file().sync_all().map_err(fail)?;
        tmp.persist(path).map_err(|e| fail(e.error))?;
        Ok(())
    }

    fn load(&self, lecture_id: &str) -> SheetResult<Vec<BubbleTemplate>> {
        let path = self.path_for(lecture_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&path).map_err(|e| SheetError::Store(e.to_string()))?;
        let all: Vec<BubbleTemplate> = serde_json::from_str(&text)
            .map_err(|e| SheetError::Store(format!("{}: {}", path.display(), e)))?;
        // sanitized file names may be shared by several ids
        Ok(all.into_iter().filter(|t| t.lecture_id == lecture_id).collect())
    }
}

impl TemplateStore for JsonDirTemplateStore {
    fn get_templates(&self, lecture_id: &str, page_number: u32) -> SheetResult<Vec<BubbleTemplate>> {
        let _guard = self
            .lock
            .read()
            .map_err(|_| SheetError::Store("template store lock poisoned".to_string()))?;
        Ok(sorted(
            self.load(lecture_id)?
                .into_iter()
                .filter(|t| t.page_number == page_number)
                .collect(),
        ))
    }

    fn save_templates(&self, templates: &[BubbleTemplate]) -> SheetResult<()> {
        let _guard = self
            .lock
            .write()
            .map_err(|_| SheetError::Store("template store lock poisoned".to_string()))?;
        let mut by_lecture: HashMap<&str, Vec<&BubbleTemplate>> = HashMap::new();
        for t in templates {
            by_lecture.entry(t.lecture_id.as_str()).or_default().push(t);
        }
        for (lecture_id, new) in by_lecture {
            let path = self.path_for(lecture_id);
            let mut all: Vec<BubbleTemplate> = if path.exists() {
                let text =
                    fs::read_to_string(&path).map_err(|e| SheetError::Store(e.to_string()))?;
                serde_json::from_str(&text).map_err(|e| SheetError::Store(e.to_string()))?
            } else {
                Vec::new()
            };
            for t in new {
                match all.iter_mut().find(|e| {
                    e.lecture_id == t.lecture_id
                        && e.page_number == t.page_number
                        && e.student_id == t.student_id
                }) {
                    Some(existing) => *existing = t.clone(),
                    None => all.push(t.clone()),
                }
            }
            let json =
                serde_json::to_string_pretty(&all).map_err(|e| SheetError::Store(e.to_string()))?;
            self.replace_file(&path, &json)?;
            tracing::debug!(lecture_id, path = %path.display(), count = all.len(), "templates saved");
        }
        Ok(())
    }
}
