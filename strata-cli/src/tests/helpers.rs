//! Test helpers composing an `apply` workspace on disk.

use crate::apply::ApplyArgs;
use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;

pub(super) const MAPPING: &str = r#"{"tables":[
    {"name":"shop","geometry":"point","mapping":{"shop":["__any__"]}},
    {"name":"roads","geometry":"linestring","mapping":{"highway":["__any__"]}}
]}"#;

pub(super) const CREATE_SHOP: &str = concat!(
    r#"{"element":{"node":{"id":7,"coord":{"x":13.4,"y":52.5},"tags":{"shop":"bakery"}}},"add":true}"#,
    "\n",
    r#"{"element":{"node":{"id":8,"coord":{"x":40.0,"y":10.0},"tags":{"shop":"kiosk"}}},"add":true}"#,
    "\n",
);

pub(super) const DELETE_SHOP: &str = concat!(
    r#"{"element":{"node":{"id":7,"coord":{"x":13.4,"y":52.5}}},"delete":true}"#,
    "\n",
);

/// Temporary directory holding every file an `apply` run touches.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        fs::write(root.join("mapping.json"), MAPPING).expect("write mapping");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn write_changes(&self, contents: &str) -> Utf8PathBuf {
        let path = self.path("changes.jsonl");
        fs::write(&path, contents).expect("write changes");
        path
    }

    pub(super) fn args(&self) -> ApplyArgs {
        ApplyArgs {
            state: Some(self.path("state/cache.json")),
            changes: Some(self.path("changes.jsonl")),
            mapping: Some(self.path("mapping.json")),
            database: Some(self.path("rows.db")),
            expire_tiles: None,
            expire_zoom: None,
            limit_to: None,
            workers: Some(2),
        }
    }

    pub(super) fn flags(&self) -> Vec<String> {
        let mut flags = vec!["strata".to_owned(), "apply".to_owned()];
        for (flag, name) in [
            ("--state", "state/cache.json"),
            ("--changes", "changes.jsonl"),
            ("--mapping", "mapping.json"),
            ("--database", "rows.db"),
        ] {
            flags.push(flag.to_owned());
            flags.push(self.path(name).into_string());
        }
        flags
    }
}
