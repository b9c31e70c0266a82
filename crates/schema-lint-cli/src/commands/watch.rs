//! Watch command implementation.
//!
//! Subscribes to filesystem events with `notify`, gathers them into
//! batches separated by a quiet period, and feeds each batch to the
//! orchestrator as removal and change events.

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use schema_lint_core::{
    discover_json_files, is_json_name, is_schema_name, ChangeOutcome, DiagnosticStore, Excludes,
    FsStore, Orchestrator,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;

use crate::config_resolver::Resolved;

/// Which paths of the tree are worth an event.
struct Filter {
    root: PathBuf,
    excludes: Excludes,
}

impl Filter {
    fn accepts(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        is_json_name(&name)
            && !relative.components().any(|c| c.as_os_str() == ".git")
            && !self.excludes.matches(relative)
    }
}

/// Events of one batch, the last event per path winning.
#[derive(Debug, Default)]
struct Batch {
    changed: BTreeSet<PathBuf>,
    removed: BTreeSet<PathBuf>,
}

impl Batch {
    fn record(&mut self, event: Event) {
        let mut paths = event.paths.into_iter();
        match event.kind {
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => {
                paths.for_each(|p| self.mark_removed(p));
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                if let Some(from) = paths.next() {
                    self.mark_removed(from);
                }
                paths.for_each(|p| self.mark_changed(p));
            }
            EventKind::Create(_) | EventKind::Modify(_) => {
                paths.for_each(|p| self.mark_changed(p));
            }
            EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
        }
    }

    fn mark_changed(&mut self, path: PathBuf) {
        self.removed.remove(&path);
        self.changed.insert(path);
    }

    fn mark_removed(&mut self, path: PathBuf) {
        self.changed.remove(&path);
        self.removed.insert(path);
    }

    fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }

    /// Drops filtered paths and orders changes data first, schemas last.
    fn into_changes(self, filter: &Filter) -> Changes {
        let removed = self
            .removed
            .into_iter()
            .filter(|p| filter.accepts(p))
            .collect();

        let (schemas, mut changed): (Vec<PathBuf>, Vec<PathBuf>) = self
            .changed
            .into_iter()
            .filter(|p| filter.accepts(p))
            .partition(|p| {
                p.file_name()
                    .is_some_and(|n| is_schema_name(&n.to_string_lossy()))
            });
        changed.extend(schemas);

        Changes { changed, removed }
    }
}

/// Work derived from one batch.
#[derive(Debug, Default, PartialEq, Eq)]
struct Changes {
    /// Created or modified, data documents before schemas.
    changed: Vec<PathBuf>,
    removed: Vec<PathBuf>,
}

impl Changes {
    fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Runs the watch command until interrupted.
pub fn run(resolved: Resolved, debounce_ms: Option<u64>) -> Result<()> {
    let Resolved {
        mut config, root, ..
    } = resolved;
    if let Some(ms) = debounce_ms {
        config.watch.debounce_ms = ms;
    }
    // Event paths are absolute, so the index must be keyed the same way.
    let root = std::fs::canonicalize(&root)
        .with_context(|| format!("Failed to resolve {}", root.display()))?;
    let debounce = config.watch.debounce();

    let sink = Arc::new(DiagnosticStore::new());
    let orchestrator = Orchestrator::builder()
        .store(Arc::new(FsStore::new(&root)))
        .sink(sink.clone())
        .config(&config)
        .build()
        .context("Failed to build orchestrator")?;

    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to start file watcher")?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", root.display()))?;

    let files = discover_json_files(&root, &config.analyzer)
        .with_context(|| format!("Failed to scan {}", root.display()))?;
    for failure in orchestrator.check_all(&files).failures {
        tracing::error!("{}: {}", failure.resource.display(), failure.error);
    }
    super::output::print_compact(&sink.report(files.len()));

    let filter = Filter {
        excludes: Excludes::new(&config.analyzer.exclude)
            .context("Invalid exclude pattern")?,
        root,
    };
    tracing::info!(
        "Watching {} JSON file(s) under {}",
        files.len(),
        filter.root.display()
    );

    loop {
        let mut batch = Batch::default();
        let first = rx.recv().context("File watcher stopped")?;
        collect(&mut batch, first);
        while let Ok(next) = rx.recv_timeout(debounce) {
            collect(&mut batch, next);
        }
        if batch.is_empty() {
            continue;
        }

        let changes = batch.into_changes(&filter);
        if changes.is_empty() {
            continue;
        }
        apply(&orchestrator, &changes);

        let report = sink.report(files.len());
        super::output::print_compact(&report);
        let (errors, warnings, infos) = report.count_by_severity();
        tracing::info!("{errors} error(s), {warnings} warning(s), {infos} info(s)");
    }
}

fn collect(batch: &mut Batch, event: notify::Result<Event>) {
    match event {
        Ok(event) => batch.record(event),
        Err(e) => tracing::warn!("Watch error: {e}"),
    }
}

fn apply(orchestrator: &Orchestrator, changes: &Changes) {
    for file in &changes.removed {
        tracing::debug!("Removed: {}", file.display());
        if let Err(e) = orchestrator.on_resource_removed(file) {
            tracing::error!("{}: {e}", file.display());
        }
    }
    for file in &changes.changed {
        tracing::debug!("Changed: {}", file.display());
        match orchestrator.on_resource_changed(file) {
            Ok(ChangeOutcome::Cascade(cascade)) => {
                for failure in cascade.failures {
                    tracing::error!("{}: {}", failure.resource.display(), failure.error);
                }
            }
            Ok(_) => {}
            Err(e) => tracing::error!("{}: {e}", file.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use schema_lint_core::{Config, MemoryStore};

    fn filter() -> Filter {
        Filter {
            root: PathBuf::from("/p"),
            excludes: Excludes::new(["**/node_modules/**"]).unwrap(),
        }
    }

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |e, p| e.add_path(PathBuf::from(p)))
    }

    fn created(path: &str) -> Event {
        event(EventKind::Create(CreateKind::File), &[path])
    }

    fn written(path: &str) -> Event {
        event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &[path],
        )
    }

    fn deleted(path: &str) -> Event {
        event(EventKind::Remove(RemoveKind::File), &[path])
    }

    fn paths(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn create_and_modify_are_changes_remove_is_removal() {
        let mut batch = Batch::default();
        batch.record(created("/p/a.json"));
        batch.record(written("/p/b.json"));
        batch.record(deleted("/p/gone.json"));

        let changes = batch.into_changes(&filter());
        assert_eq!(changes.changed, paths(&["/p/a.json", "/p/b.json"]));
        assert_eq!(changes.removed, paths(&["/p/gone.json"]));
    }

    #[test]
    fn schemas_come_after_data() {
        let mut batch = Batch::default();
        batch.record(written("/p/ASchema.json"));
        batch.record(written("/p/z.json"));
        batch.record(created("/p/a.json"));

        let changes = batch.into_changes(&filter());
        assert_eq!(
            changes.changed,
            paths(&["/p/a.json", "/p/z.json", "/p/ASchema.json"])
        );
    }

    #[test]
    fn last_event_per_path_wins() {
        let mut batch = Batch::default();
        batch.record(written("/p/a.json"));
        batch.record(deleted("/p/a.json"));
        batch.record(deleted("/p/b.json"));
        batch.record(created("/p/b.json"));

        let changes = batch.into_changes(&filter());
        assert_eq!(changes.changed, paths(&["/p/b.json"]));
        assert_eq!(changes.removed, paths(&["/p/a.json"]));
    }

    #[test]
    fn rename_removes_source_and_changes_target() {
        let mut batch = Batch::default();
        batch.record(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/p/old.json", "/p/new.json"],
        ));
        batch.record(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/p/moved-away.json"],
        ));

        let changes = batch.into_changes(&filter());
        assert_eq!(changes.changed, paths(&["/p/new.json"]));
        assert_eq!(
            changes.removed,
            paths(&["/p/moved-away.json", "/p/old.json"])
        );
    }

    #[test]
    fn non_json_excluded_and_access_events_are_dropped() {
        let mut batch = Batch::default();
        batch.record(written("/p/notes.txt"));
        batch.record(written("/p/node_modules/pkg/package.json"));
        batch.record(written("/p/.git/config.json"));
        batch.record(event(
            EventKind::Access(notify::event::AccessKind::Any),
            &["/p/a.json"],
        ));

        assert!(batch.into_changes(&filter()).is_empty());
    }

    #[test]
    fn applying_a_batch_validates_and_clears() {
        let store = Arc::new(MemoryStore::new());
        store.insert("/p/a.json", "{}");
        store.insert("/p/schema.json", "{\"required\": [\"n\"]}");
        let sink = Arc::new(DiagnosticStore::new());
        let orchestrator = Orchestrator::builder()
            .store(store.clone())
            .sink(sink.clone())
            .config(&Config::default())
            .build()
            .unwrap();

        let mut batch = Batch::default();
        batch.record(written("/p/schema.json"));
        batch.record(created("/p/a.json"));
        apply(&orchestrator, &batch.into_changes(&filter()));
        assert_eq!(sink.diagnostics_for(Path::new("/p/a.json")).len(), 1);

        store.remove(Path::new("/p/a.json"));
        let mut batch = Batch::default();
        batch.record(deleted("/p/a.json"));
        apply(&orchestrator, &batch.into_changes(&filter()));
        assert!(sink.is_empty());
        assert!(orchestrator.index().snapshot().is_empty());
    }
}
