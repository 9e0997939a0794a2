//! Named template compilation with a process-lifetime cache.
//!
//! Every compiled template pairs the shared `common.html` fragment with the
//! page fragment `<name>.html`; the page fragment is the render entry point
//! and usually `{% extends "common.html" %}`.
//!
//! Lookups go through [`TemplateCache::resolve`], which compiles a name at most
//! once even when many requests ask for it at the same moment: the first
//! caller installs a `Compiling` slot and spawns the compilation, everybody
//! else (first caller included) waits on the slot's watch channel and gets
//! the same outcome. A successful compilation stays cached for the life of the
//! process. A failed one is dropped from the map, so the next request retries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use minijinja::Environment;
use serde::Serialize;
use tokio::fs;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinError;
use tracing::{error, info};

use crate::errors::{CompileError, TemplateError};
use crate::helpers;

pub const COMMON_TEMPLATE: &str = "common.html";

/// Render-ready template. Immutable once built.
pub struct CompiledTemplate {
    name: String,
    entry: String,
    env: Environment<'static>,
}

impl CompiledTemplate {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render<S: Serialize>(&self, params: S) -> Result<String, TemplateError> {
        let render_err = |e: minijinja::Error| TemplateError::Render {
            name: self.name.clone(),
            source: Arc::new(e),
        };
        let tpl = self.env.get_template(&self.entry).map_err(render_err)?;
        tpl.render(params).map_err(render_err)
    }
}

impl std::fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

type Outcome = Result<Arc<CompiledTemplate>, TemplateError>;

enum Slot {
    Ready(Arc<CompiledTemplate>),
    Compiling(watch::Receiver<Option<Outcome>>),
}

// tokio's RwLock queues readers behind a waiting writer, so a cached lookup
// can wait on an unrelated insert. Writers never await while holding it.
type Slots = Arc<RwLock<HashMap<String, Slot>>>;

enum Lookup {
    Cached(Arc<CompiledTemplate>),
    Pending(watch::Receiver<Option<Outcome>>),
}

pub struct TemplateCache {
    dir: PathBuf,
    slots: Slots,
    compilations: Arc<AtomicUsize>,
}

impl TemplateCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            slots: Arc::new(RwLock::new(HashMap::new())),
            compilations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of compilations run so far, failed ones included.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    pub async fn resolve(&self, name: &str) -> Outcome {
        let pending = {
            let slots = self.slots.read().await;
            match slots.get(name) {
                Some(Slot::Ready(tpl)) => return Ok(tpl.clone()),
                Some(Slot::Compiling(rx)) => Some(rx.clone()),
                None => None,
            }
        };
        let mut rx = match pending {
            Some(rx) => rx,
            None => match self.join_or_start(name).await {
                Lookup::Cached(tpl) => return Ok(tpl),
                Lookup::Pending(rx) => rx,
            },
        };
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(done) => done.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| {
            Err(TemplateError::Compile {
                name: name.to_string(),
                source: Arc::new(CompileError::Interrupted),
            })
        })
    }

    // Re-check under the write lock; either the template got cached meanwhile,
    // somebody else is compiling it, or we start the compilation ourselves.
    async fn join_or_start(&self, name: &str) -> Lookup {
        let mut slots = self.slots.write().await;
        match slots.get(name) {
            Some(Slot::Ready(tpl)) => return Lookup::Cached(tpl.clone()),
            Some(Slot::Compiling(rx)) => return Lookup::Pending(rx.clone()),
            None => {}
        }
        let (tx, rx) = watch::channel(None);
        slots.insert(name.to_string(), Slot::Compiling(rx.clone()));
        drop(slots);

        let dir = self.dir.clone();
        let name = name.to_string();
        let slots = self.slots.clone();
        let compilations = self.compilations.clone();
        // Detached so the compilation finishes even if the triggering request goes away.
        tokio::spawn(async move {
            let job = {
                let name = name.clone();
                tokio::spawn(async move { compile(&dir, &name).await })
            };
            let joined = job.await;
            compilations.fetch_add(1, Ordering::Relaxed);
            let outcome = finish_flight(&slots, &name, joined).await;
            let _ = tx.send(Some(outcome));
        });
        Lookup::Pending(rx)
    }
}

// Settle the slot of a finished compilation: cache a success, clear anything
// else so the next request starts over. A panicked compile counts as a failure.
async fn finish_flight(
    slots: &Slots,
    name: &str,
    joined: Result<Result<CompiledTemplate, CompileError>, JoinError>,
) -> Outcome {
    let compiled = joined.unwrap_or_else(|e| {
        error!(target: "photo_site", "compilation of template {name} aborted: {e}");
        Err(CompileError::Interrupted)
    });
    let outcome = compiled.map(Arc::new).map_err(|e| TemplateError::Compile {
        name: name.to_string(),
        source: Arc::new(e),
    });
    let mut slots = slots.write().await;
    match &outcome {
        Ok(tpl) => {
            info!(target: "photo_site", "compiled template {name}");
            slots.insert(name.to_string(), Slot::Ready(tpl.clone()));
        }
        Err(e) => {
            error!(target: "photo_site", "{e}");
            slots.remove(name);
        }
    }
    outcome
}

async fn compile(dir: &Path, name: &str) -> Result<CompiledTemplate, CompileError> {
    let entry = format!("{name}.html");
    let common_src = read_source(&dir.join(COMMON_TEMPLATE)).await?;
    let page_src = read_source(&dir.join(&entry)).await?;

    let mut env = Environment::new();
    helpers::install(&mut env);
    env.add_template_owned(COMMON_TEMPLATE, common_src)
        .map_err(|source| CompileError::Syntax {
            file: COMMON_TEMPLATE.to_string(),
            source,
        })?;
    env.add_template_owned(entry.clone(), page_src)
        .map_err(|source| CompileError::Syntax {
            file: entry.clone(),
            source,
        })?;
    Ok(CompiledTemplate {
        name: name.to_string(),
        entry,
        env,
    })
}

async fn read_source(path: &Path) -> Result<String, CompileError> {
    fs::read_to_string(path)
        .await
        .map_err(|source| CompileError::Read {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;
    use std::task::Poll;
    use tempfile::TempDir;

    const COMMON: &str = "<html><title>{{ title }}</title>{% block content %}{% endblock %}</html>";
    const HOME: &str = r#"{% extends "common.html" %}{% block content %}home:{{ name }}{% endblock %}"#;

    fn fixture() -> (TempDir, TemplateCache) {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("common.html"), COMMON).unwrap();
        std::fs::write(tmp.path().join("home.html"), HOME).unwrap();
        let cache = TemplateCache::new(tmp.path());
        (tmp, cache)
    }

    #[tokio::test]
    async fn resolves_and_renders() {
        let (_tmp, cache) = fixture();
        let tpl = cache.resolve("home").await.unwrap();
        assert_eq!(tpl.name(), "home");
        let out = tpl.render(context! { title => "T", name => "home" }).unwrap();
        assert_eq!(out, "<html><title>T</title>home:home</html>");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_access_compiles_once() {
        let (_tmp, cache) = fixture();
        let cache = Arc::new(cache);
        let mut handles = Vec::new();
        for _ in 0..32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.resolve("home").await.unwrap() }));
        }
        let mut resolved = Vec::new();
        for h in handles {
            resolved.push(h.await.unwrap());
        }
        assert_eq!(cache.compilations(), 1);
        assert!(resolved.iter().all(|t| Arc::ptr_eq(t, &resolved[0])));
    }

    #[tokio::test]
    async fn concurrent_failure_is_shared() {
        let (_tmp, cache) = fixture();
        let mut waiters: Vec<_> = (0..8).map(|_| Box::pin(cache.resolve("missing"))).collect();
        // every caller is parked on the slot before the compile task gets to run
        std::future::poll_fn(|cx| {
            for w in waiters.iter_mut() {
                assert!(w.as_mut().poll(cx).is_pending());
            }
            Poll::Ready(())
        })
        .await;

        let mut sources = Vec::new();
        for w in waiters {
            match w.await {
                Err(TemplateError::Compile { name, source }) => {
                    assert_eq!(name, "missing");
                    assert!(matches!(*source, CompileError::Read { .. }));
                    sources.push(source);
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!(cache.compilations(), 1);
        assert!(sources.iter().all(|s| Arc::ptr_eq(s, &sources[0])));
    }

    #[tokio::test]
    async fn panicked_compilation_frees_the_slot() {
        let (_tmp, cache) = fixture();
        let (_tx, rx) = watch::channel(None);
        cache
            .slots
            .write()
            .await
            .insert("home".to_string(), Slot::Compiling(rx));
        let joined: Result<Result<CompiledTemplate, CompileError>, JoinError> =
            tokio::spawn(async { panic!("compiler blew up") }).await;
        let outcome = finish_flight(&cache.slots, "home", joined).await;
        match outcome {
            Err(TemplateError::Compile { source, .. }) => {
                assert!(matches!(*source, CompileError::Interrupted));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!cache.slots.read().await.contains_key("home"));
        assert!(cache.resolve("home").await.is_ok());
    }

    #[tokio::test]
    async fn failure_is_retried_on_next_request() {
        let (tmp, cache) = fixture();
        assert!(cache.resolve("gallery").await.is_err());
        assert_eq!(cache.compilations(), 1);
        std::fs::write(
            tmp.path().join("gallery.html"),
            r#"{% extends "common.html" %}{% block content %}g{% endblock %}"#,
        )
        .unwrap();
        let tpl = cache.resolve("gallery").await.unwrap();
        assert_eq!(cache.compilations(), 2);
        assert_eq!(tpl.render(context! { title => "x" }).unwrap(), "<html><title>x</title>g</html>");
    }

    #[tokio::test]
    async fn cached_template_does_not_reread_sources() {
        let (tmp, cache) = fixture();
        let first = cache.resolve("home").await.unwrap();
        std::fs::remove_file(tmp.path().join("home.html")).unwrap();
        std::fs::remove_file(tmp.path().join("common.html")).unwrap();
        let second = cache.resolve("home").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.compilations(), 1);
    }

    #[tokio::test]
    async fn syntax_error_is_reported() {
        let (tmp, cache) = fixture();
        std::fs::write(tmp.path().join("broken.html"), "{% if %}").unwrap();
        match cache.resolve("broken").await {
            Err(TemplateError::Compile { source, .. }) => {
                assert!(matches!(&*source, CompileError::Syntax { file, .. } if file == "broken.html"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn render_error_names_the_template() {
        let (tmp, cache) = fixture();
        std::fs::write(tmp.path().join("bad.html"), r#"{% include "nowhere.html" %}"#).unwrap();
        let tpl = cache.resolve("bad").await.unwrap();
        let err = tpl.render(context! {}).unwrap_err();
        assert!(matches!(err, TemplateError::Render { ref name, .. } if name == "bad"));
    }
}
