// Test doubles shared by the restore tests.
use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use walkdir::WalkDir;

use crate::errors::{RestoreError, Result};
use crate::restore::confirm::Confirmer;
use crate::restore::db_restore::{ConnectionSpec, DatabaseDriver, TableFilter};
use crate::restore::environment::{BootstrapLevel, SiteEnvironment};
use crate::restore::file_sync::{SyncBackend, SyncOutcome};

pub const DUMP_SQL: &str = "CREATE TABLE node (nid int);\nCREATE TABLE users (uid int);\n";

/// Writes `<dir>/<name>` laid out like a real site archive.
pub fn write_site_archive(dir: &Path, name: &str) -> anyhow::Result<PathBuf> {
    write_archive(
        dir,
        name,
        &[
            ("code/index.php", &b"<?php echo 'ok';\n"[..]),
            ("files/logo.png", &b"\x89PNG fake"[..]),
            ("database/database.sql", DUMP_SQL.as_bytes()),
        ],
    )
}

/// Writes `<dir>/<name>` holding exactly `entries`.
pub fn write_archive(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> anyhow::Result<PathBuf> {
    let archive_path = dir.join(name);
    let encoder = GzEncoder::new(File::create(&archive_path)?, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for &(path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(1_700_000_000);
        header.set_cksum();
        builder.append_data(&mut header, path, data)?;
    }

    builder.into_inner()?.finish()?;
    Ok(archive_path)
}

/// Relative path, contents and mtime of everything under `root`.
pub fn snapshot_tree(root: &Path) -> anyhow::Result<Vec<(PathBuf, Vec<u8>, SystemTime)>> {
    let mut snapshot = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(root)?.to_path_buf();
        let contents = if entry.file_type().is_file() {
            fs::read(entry.path())?
        } else {
            Vec::new()
        };
        snapshot.push((relative, contents, entry.metadata()?.modified()?));
    }
    Ok(snapshot)
}

pub struct FakeEnvironment {
    root: Option<PathBuf>,
}

impl FakeEnvironment {
    pub fn with_root(root: &Path) -> Self {
        FakeEnvironment {
            root: Some(root.to_path_buf()),
        }
    }

    pub fn without_root() -> Self {
        FakeEnvironment { root: None }
    }

    pub fn public_files_path(&self) -> PathBuf {
        self.root
            .as_ref()
            .expect("environment has a root")
            .join("sites/default/files")
    }

    fn root(&self) -> Result<PathBuf> {
        self.root
            .clone()
            .ok_or_else(|| RestoreError::Config("fake site has no root".to_string()))
    }
}

impl SiteEnvironment for FakeEnvironment {
    fn bootstrap_to(&self, level: BootstrapLevel) -> Result<()> {
        // The database step only needs credentials, which the fake always has.
        if level == BootstrapLevel::Configuration {
            return Ok(());
        }
        self.root().map(|_| ())
    }

    fn resolve_code_root(&self) -> Result<PathBuf> {
        self.root()
    }

    fn resolve_public_files_real_path(&self) -> Result<PathBuf> {
        let path = self.public_files_path();
        fs::create_dir_all(&path)?;
        Ok(path)
    }
}

#[derive(Default)]
struct DatabaseState {
    tables: BTreeSet<String>,
    events: Vec<String>,
}

/// In-memory database. Importing a dump creates the tables it declares.
#[derive(Default)]
pub struct FakeDatabase {
    state: Mutex<DatabaseState>,
    fail_drop: bool,
    fail_import: bool,
}

impl FakeDatabase {
    pub fn with_tables(tables: &[&str]) -> Self {
        let db = FakeDatabase::default();
        db.state
            .lock()
            .expect("state lock")
            .tables
            .extend(tables.iter().map(|t| t.to_string()));
        db
    }

    pub fn failing_drop() -> Self {
        FakeDatabase {
            fail_drop: true,
            ..Default::default()
        }
    }

    pub fn failing_import(tables: &[&str]) -> Self {
        let mut db = FakeDatabase::with_tables(tables);
        db.fail_import = true;
        db
    }

    pub fn tables(&self) -> Vec<String> {
        self.state.lock().expect("state lock").tables.iter().cloned().collect()
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().expect("state lock").events.clone()
    }

    fn record(&self, event: &str) {
        self.state.lock().expect("state lock").events.push(event.to_string());
    }
}

#[async_trait]
impl DatabaseDriver for FakeDatabase {
    fn connection_spec(&self) -> Result<ConnectionSpec> {
        ConnectionSpec::parse("postgres://app@localhost/site", "")
    }

    async fn drop_tables(&self, filter: &TableFilter) -> Result<usize> {
        self.record("drop");
        if self.fail_drop {
            return Err(RestoreError::Config("permission denied for schema public".to_string()));
        }
        let mut state = self.state.lock().expect("state lock");
        let before = state.tables.len();
        state.tables.retain(|table| !filter.allows(table));
        Ok(before - state.tables.len())
    }

    async fn import_dump(&self, dump_path: &Path) -> Result<()> {
        self.record("import");
        if self.fail_import {
            return Err(RestoreError::ImportFailed {
                database: "site".to_string(),
                dump: dump_path.to_path_buf(),
                detail: "syntax error at or near \"CREAT\"".to_string(),
            });
        }
        let sql = fs::read_to_string(dump_path)?;
        let mut state = self.state.lock().expect("state lock");
        for line in sql.lines() {
            if let Some(rest) = line.strip_prefix("CREATE TABLE ") {
                if let Some(name) = rest.split_whitespace().next() {
                    state.tables.insert(name.trim_matches('"').to_string());
                }
            }
        }
        Ok(())
    }

    async fn after_import(&self) -> Result<()> {
        self.record("after_import");
        Ok(())
    }
}

/// Copies with `std::fs`, recording each call.
#[derive(Default)]
pub struct CopyBackend {
    calls: RefCell<Vec<(String, String)>>,
}

impl CopyBackend {
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.borrow().clone()
    }
}

impl SyncBackend for CopyBackend {
    fn copy_tree(&self, source: &str, destination: &str, _verbose: bool) -> Result<SyncOutcome> {
        self.calls
            .borrow_mut()
            .push((source.to_string(), destination.to_string()));

        let source_root = Path::new(source);
        for entry in WalkDir::new(source_root) {
            let entry = entry.map_err(|e| RestoreError::Io(std::io::Error::other(e.to_string())))?;
            let relative = entry
                .path()
                .strip_prefix(source_root)
                .map_err(|e| RestoreError::Io(std::io::Error::other(e.to_string())))?;
            let target = Path::new(destination).join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                fs::copy(entry.path(), &target)?;
            }
        }

        Ok(SyncOutcome {
            success: true,
            status: "exit status: 0".to_string(),
            stderr: String::new(),
        })
    }
}

pub struct FailingBackend;

impl SyncBackend for FailingBackend {
    fn copy_tree(&self, _source: &str, _destination: &str, _verbose: bool) -> Result<SyncOutcome> {
        Ok(SyncOutcome {
            success: false,
            status: "exit status: 23".to_string(),
            stderr: "rsync: opendir \"/srv/private\" failed: permission denied".to_string(),
        })
    }
}

/// Accepts every prompt except those containing `decline`.
pub struct ScriptedConfirmer {
    decline: String,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedConfirmer {
    pub fn declining(fragment: &str) -> Self {
        ScriptedConfirmer {
            decline: fragment.to_string(),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(!prompt.contains(&self.decline))
    }
}
