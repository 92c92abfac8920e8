//! End-to-end tests through the `GenFs` facade.
//!
//! # Sections
//!
//! - **Routing:** generated roots shadow the real filesystem, the root lists
//!   both, unknown paths are not found
//! - **Generators:** file, nested directory and served-filesystem bindings
//! - **Notifications:** links, triggers and subscriptions
//! - **Cache:** single-flight generation and eviction on trigger
//! - **Cancellation and gating**

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use genfs_kernel::{
    CancellationToken, DirEntry, Event, GenFs, GenFsConfig, GenFsError, Generator, LocalBackend,
    MemoryBackend, VfsOps, dir_fn, exists_all, file_fn,
};
use tokio::task::JoinSet;
use tokio::time::timeout;

// ============================================================================
// Shared test setup
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A project on disk: `go.mod`, `app.go`, and a `bud/` directory that the
/// generators are expected to hide.
fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("go.mod"), "module app\n").unwrap();
    std::fs::write(dir.path().join("app.go"), "package app\n").unwrap();
    std::fs::create_dir(dir.path().join("bud")).unwrap();
    std::fs::write(dir.path().join("bud/stale.go"), "package stale\n").unwrap();
    std::fs::create_dir(dir.path().join("view")).unwrap();
    dir
}

/// `bud/app/main.go` is generated from `app.go` and goes stale when it
/// changes.
fn main_go() -> Generator {
    file_fn(|ctx| async move {
        let app = ctx.read("app.go").await?;
        ctx.link_target("app.go", Event::Update);
        let mut out = b"package main\n// from: ".to_vec();
        out.extend_from_slice(&app);
        Ok(out)
    })
}

fn counting(calls: Arc<AtomicUsize>) -> Generator {
    file_fn(move |_| {
        let calls = calls.clone();
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("generation {n}").into_bytes())
        }
    })
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_generated_root_shadows_real_directory() {
    init_tracing();
    let dir = project();
    let mut fsys = GenFs::with_backend(LocalBackend::new(dir.path()));
    fsys.add_generators([("bud/app/main.go", main_go())]).unwrap();

    let main = fsys.read("bud/app/main.go").await.unwrap();
    assert!(main.starts_with(b"package main"));

    // Exists on disk, but `bud` belongs to the generators now.
    let err = fsys.read("bud/stale.go").await.unwrap_err();
    assert!(matches!(err, GenFsError::NotFound(ref p) if p == "bud/stale.go"));
    assert_eq!(
        fsys.read_dir("bud").await.unwrap(),
        vec![DirEntry::directory("app")]
    );
}

#[tokio::test]
async fn test_falls_through_to_real_filesystem() {
    let dir = project();
    let mut fsys = GenFs::with_backend(LocalBackend::new(dir.path()));
    fsys.add_generators([("bud/app/main.go", main_go())]).unwrap();

    assert_eq!(fsys.read("go.mod").await.unwrap(), b"module app\n");
    assert!(fsys.exists("view").await);

    let err = fsys.open("missing/file.go").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_root_listing_is_merged_and_sorted() {
    let dir = project();
    let mut fsys = GenFs::with_backend(LocalBackend::new(dir.path()));
    fsys.add_generators([
        ("bud/app/main.go", main_go()),
        ("public/app.css", Generator::bytes("body {}")),
    ])
    .unwrap();

    let root = fsys.read_dir(".").await.unwrap();
    let names: Vec<_> = root.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["app.go", "bud", "go.mod", "public", "view"]
    );
    let bud = root.iter().find(|e| e.name == "bud").unwrap();
    assert!(bud.is_dir());
    assert_eq!(bud.size, None);
}

#[tokio::test]
async fn test_generated_only_filesystem() {
    let mut fsys = GenFs::generated_only();
    fsys.add_generators([("bud/main.go", Generator::bytes("package main"))])
        .unwrap();

    assert_eq!(
        fsys.read_dir(".").await.unwrap(),
        vec![DirEntry::directory("bud")]
    );
    assert!(matches!(
        fsys.open("go.mod").await,
        Err(GenFsError::NotFound(_))
    ));
    assert!(matches!(
        fsys.open("../etc/passwd").await,
        Err(GenFsError::InvalidPath(_))
    ));
}

// ============================================================================
// Generators
// ============================================================================

#[tokio::test]
async fn test_virtual_directories_from_bindings() {
    let empty = || dir_fn(|_| async { Ok(vec![]) });
    let mut fsys = GenFs::generated_only();
    fsys.add_generators([("pkg/b", empty()), ("pkg/a", empty())])
        .unwrap();

    assert_eq!(
        fsys.read_dir("pkg").await.unwrap(),
        vec![DirEntry::directory("a"), DirEntry::directory("b")]
    );
}

#[tokio::test]
async fn test_virtual_listing_marks_file_bindings_as_directories() {
    let mut fsys = GenFs::generated_only();
    fsys.add_generators([
        ("pkg/a", Generator::bytes("a")),
        ("pkg/b", Generator::bytes("b")),
    ])
    .unwrap();

    let listing = fsys.read_dir("pkg").await.unwrap();
    assert_eq!(
        listing,
        vec![DirEntry::directory("a"), DirEntry::directory("b")]
    );
    assert!(listing.iter().all(DirEntry::is_dir));
    // The bindings themselves still resolve to files.
    assert_eq!(fsys.read("pkg/a").await.unwrap(), b"a");
}

#[tokio::test]
async fn test_nested_dir_generators() {
    let mut fsys = GenFs::generated_only();
    fsys.add_generators([
        (
            "bud/plugin",
            dir_fn(|_| async {
                Ok(vec![
                    (
                        "tailwind".to_string(),
                        dir_fn(|ctx| async move {
                            let index = format!("// {}", ctx.target());
                            Ok(vec![("index.js".to_string(), Generator::bytes(index))])
                        }),
                    ),
                    ("README.md".to_string(), Generator::bytes("# plugins")),
                ])
            }),
        ),
        ("bud/plugin/markdown/index.js", Generator::bytes("// markdown")),
    ])
    .unwrap();

    assert_eq!(
        fsys.read("bud/plugin/tailwind/index.js").await.unwrap(),
        b"// bud/plugin/tailwind"
    );
    assert_eq!(
        fsys.read("bud/plugin/markdown/index.js").await.unwrap(),
        b"// markdown"
    );
    assert_eq!(
        fsys.read_dir("bud/plugin").await.unwrap(),
        vec![
            DirEntry::file("README.md"),
            DirEntry::directory("markdown"),
            DirEntry::directory("tailwind"),
        ]
    );
    assert!(
        fsys.open("bud/plugin/tailwind/missing.js")
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(
        fsys.open("bud/plugin/README.md/child")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn test_serve_generator() {
    let assets = MemoryBackend::new()
        .with_file("css/app.css", "body {}")
        .with_file("favicon.ico", [0u8, 1, 2]);
    let mut fsys = GenFs::generated_only();
    fsys.add_generators([("bud/public", Generator::serve(assets))])
        .unwrap();

    assert_eq!(fsys.read("bud/public/css/app.css").await.unwrap(), b"body {}");
    let listing = fsys.read_dir("bud/public").await.unwrap();
    let names: Vec<_> = listing.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["css", "favicon.ico"]);
    assert!(
        fsys.open("bud/public/missing.css")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn test_generator_failure_names_path() {
    let mut fsys = GenFs::generated_only();
    fsys.add_generators([(
        "bud/broken.go",
        file_fn(|_| async { Err(anyhow::anyhow!("template exploded")) }),
    )])
    .unwrap();

    match fsys.open("bud/broken.go").await.unwrap_err() {
        GenFsError::Generate { path, source } => {
            assert_eq!(path, "bud/broken.go");
            assert_eq!(source.to_string(), "template exploded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_generator_not_found_passes_through() {
    let mut fsys = GenFs::generated_only();
    fsys.add_generators([
        (
            "bud/optional.go",
            file_fn(|ctx| async move {
                Err(anyhow::Error::new(GenFsError::not_found(ctx.target())))
            }),
        ),
        ("bud/optional.go/inner", Generator::bytes("x")),
    ])
    .unwrap();

    // Nothing at the exact path, so the deeper binding shows through.
    assert_eq!(
        fsys.read_dir("bud/optional.go").await.unwrap(),
        vec![DirEntry::directory("inner")]
    );
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn test_trigger_notifies_dependent() {
    init_tracing();
    let dir = project();
    let mut fsys = GenFs::with_backend(LocalBackend::new(dir.path()));
    fsys.add_generators([
        ("bud/app/main.go", main_go()),
        ("bud/view/index.go", Generator::bytes("package view")),
    ])
    .unwrap();

    let mut main = fsys.subscribe("bud/app/main.go").await.unwrap();
    let mut view = fsys.subscribe("bud/view/index.go").await.unwrap();

    assert_eq!(fsys.dependents("app.go", Event::Update), vec!["bud/app/main.go"]);
    assert_eq!(fsys.trigger("app.go", Event::Update), 1);

    let msg = timeout(Duration::from_secs(1), main.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(msg.topic, "bud/app/main.go");
    assert_eq!(msg.event, Event::Update);

    assert!(main.try_recv().is_none());
    assert!(view.try_recv().is_none());
}

#[tokio::test]
async fn test_trigger_other_event_is_silent() {
    let dir = project();
    let mut fsys = GenFs::with_backend(LocalBackend::new(dir.path()));
    fsys.add_generators([("bud/app/main.go", main_go())]).unwrap();

    let mut main = fsys.subscribe("bud/app/main.go").await.unwrap();
    assert_eq!(fsys.trigger("app.go", Event::Delete), 0);
    assert_eq!(fsys.trigger("go.mod", Event::Update), 0);
    assert!(main.try_recv().is_none());
}

#[tokio::test]
async fn test_repeated_triggers_each_deliver() {
    let dir = project();
    let mut fsys = GenFs::with_backend(LocalBackend::new(dir.path()));
    fsys.add_generators([("bud/app/main.go", main_go())]).unwrap();

    let mut main = fsys.subscribe("bud/app/main.go").await.unwrap();
    for _ in 0..3 {
        fsys.trigger("app.go", Event::Update);
    }
    for _ in 0..3 {
        let msg = timeout(Duration::from_secs(1), main.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.event, Event::Update);
    }
    assert!(main.try_recv().is_none());
}

#[tokio::test]
async fn test_trigger_walks_one_hop() {
    let real = MemoryBackend::new().with_file("schema.sql", "create table");
    let mut fsys = GenFs::with_backend(real);
    fsys.add_generators([
        (
            "bud/model.go",
            file_fn(|ctx| async move {
                let schema = ctx.read("schema.sql").await?;
                ctx.link_target("schema.sql", Event::Update);
                Ok(schema)
            }),
        ),
        (
            "bud/api.go",
            file_fn(|ctx| async move {
                let model = ctx.read("bud/model.go").await?;
                ctx.link_target("bud/model.go", Event::Update);
                Ok(model)
            }),
        ),
    ])
    .unwrap();

    let mut model = fsys.subscribe("bud/model.go").await.unwrap();
    let mut api = fsys.subscribe("bud/api.go").await.unwrap();
    assert_eq!(fsys.links().len(), 2);

    assert_eq!(fsys.trigger("schema.sql", Event::Update), 1);
    assert!(model.try_recv().is_some());
    assert!(api.try_recv().is_none());
}

#[tokio::test]
async fn test_subscribe_missing_path_fails() {
    let fsys = GenFs::generated_only();
    let err = fsys.subscribe("bud/nothing.go").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(fsys.bus().topic_count(), 0);
}

#[tokio::test]
async fn test_released_subscription_stops_delivery() {
    let dir = project();
    let mut fsys = GenFs::with_backend(LocalBackend::new(dir.path()));
    fsys.add_generators([("bud/app/main.go", main_go())]).unwrap();

    let main = fsys.subscribe("bud/app/main.go").await.unwrap();
    main.release();
    assert_eq!(fsys.bus().subscriber_count("bud/app/main.go"), 0);
    // The dependent is still counted; there is just nobody listening.
    assert_eq!(fsys.trigger("app.go", Event::Update), 1);
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn test_cache_generates_once_until_triggered() {
    let calls = Arc::new(AtomicUsize::new(0));
    let real = MemoryBackend::new().with_file("app.go", "package app");
    let mut fsys = GenFs::new(
        Some(Arc::new(real)),
        GenFsConfig::default().with_cache(true),
    );
    let counter = counting(calls.clone());
    fsys.add_generators([
        ("bud/count.txt", counter),
        ("bud/app/main.go", main_go()),
    ])
    .unwrap();

    let first = fsys.open("bud/count.txt").await.unwrap();
    let second = fsys.open("bud/count.txt").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.data(), Some(&b"generation 1"[..]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Triggering the path itself drops its snapshot.
    fsys.trigger("bud/count.txt", Event::Update);
    let third = fsys.read("bud/count.txt").await.unwrap();
    assert_eq!(third, b"generation 2");

    // Triggering an input drops the dependents' snapshots.
    fsys.open("bud/app/main.go").await.unwrap();
    let cache = fsys.cache().unwrap();
    assert!(cache.contains("bud/app/main.go"));
    fsys.trigger("app.go", Event::Update);
    assert!(!cache.contains("bud/app/main.go"));
}

#[tokio::test]
async fn test_changed_input_is_regenerated_after_trigger() {
    let real = Arc::new(MemoryBackend::new().with_file("app.go", "v1"));
    let mut fsys = GenFs::new(
        Some(real.clone() as Arc<dyn VfsOps>),
        GenFsConfig::default().with_cache(true),
    );
    fsys.add_generators([("bud/app/main.go", main_go())]).unwrap();
    let mut main = fsys.subscribe("bud/app/main.go").await.unwrap();

    assert!(fsys.read("bud/app/main.go").await.unwrap().ends_with(b"v1"));

    // Until the trigger arrives the cached snapshot stands.
    real.write_file("app.go", "v2").unwrap();
    assert!(fsys.read("bud/app/main.go").await.unwrap().ends_with(b"v1"));

    fsys.trigger("app.go", Event::Update);
    assert_eq!(main.try_recv().unwrap().event, Event::Update);
    assert!(fsys.read("bud/app/main.go").await.unwrap().ends_with(b"v2"));

    // Once the input is gone the generated file is gone too.
    assert!(real.remove("app.go").unwrap());
    fsys.trigger("app.go", Event::Update);
    assert!(
        fsys.open("bud/app/main.go")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_opens_share_one_generation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut fsys = GenFs::new(None, GenFsConfig::default().with_cache(true));
    let slow = {
        let calls = calls.clone();
        file_fn(move |_| {
            let calls = calls.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(b"slow".to_vec())
            }
        })
    };
    fsys.add_generators([("bud/slow.txt", slow)]).unwrap();
    let fsys = Arc::new(fsys);

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let fsys = fsys.clone();
        tasks.spawn(async move { fsys.read("bud/slow.txt").await });
    }
    while let Some(result) = tasks.join_next().await {
        assert_eq!(result.unwrap().unwrap(), b"slow");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Cancellation and gating
// ============================================================================

#[tokio::test]
async fn test_open_with_cancel() {
    let mut fsys = GenFs::new(None, GenFsConfig::default().with_cache(true));
    fsys.add_generators([(
        "bud/hang.go",
        file_fn(|_| async {
            std::future::pending::<()>().await;
            Ok(Vec::new())
        }),
    )])
    .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = timeout(
        Duration::from_secs(1),
        fsys.open_with_cancel("bud/hang.go", &cancel),
    )
    .await
    .unwrap()
    .unwrap_err();
    assert!(matches!(err, GenFsError::Cancelled(ref p) if p == "bud/hang.go"));
    assert!(fsys.cache().unwrap().is_empty());
}

#[tokio::test]
async fn test_generator_gates_on_prerequisites() {
    let gated = || {
        file_fn(|ctx| async move {
            exists_all(&ctx, ["go.mod", "package.json"]).await?;
            Ok(b"ready".to_vec())
        })
    };

    let mut partial = GenFs::with_backend(MemoryBackend::new().with_file("go.mod", ""));
    partial.add_generators([("bud/ready.txt", gated())]).unwrap();
    match partial.open("bud/ready.txt").await.unwrap_err() {
        GenFsError::Missing { paths } => assert_eq!(paths, vec!["package.json"]),
        other => panic!("unexpected error: {other:?}"),
    }

    let mut complete = GenFs::with_backend(
        MemoryBackend::new()
            .with_file("go.mod", "")
            .with_file("package.json", "{}"),
    );
    complete.add_generators([("bud/ready.txt", gated())]).unwrap();
    assert_eq!(complete.read("bud/ready.txt").await.unwrap(), b"ready");
}

#[tokio::test]
async fn test_exists_all_on_facade() {
    let mut fsys = GenFs::with_backend(MemoryBackend::new().with_file("go.mod", ""));
    fsys.add_generators([("bud/main.go", Generator::bytes(""))])
        .unwrap();

    exists_all(&fsys, ["go.mod", "bud/main.go", "bud"]).await.unwrap();
    let err = exists_all(&fsys, ["go.sum"]).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "missing \"go.sum\"");
}
