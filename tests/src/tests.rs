use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dlsync::{
    cache::SnapshotCache,
    config::PatternList,
    diff::DiffEngine,
    snapshot::SnapshotBuilder,
    storage::{fs::FileSystem, DirEntries},
    transfer::TransferPlan,
    Direction::{Download, DownloadOverwrite, Upload, UploadOverwrite},
    Error, Kind,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use crate::dataset::{Dataset, Entry, Patch};
use crate::harness::{action_map, directions};
use crate::stubs::adls;
use crate::{harness, utils};

/// Reference time of hand-written listings
fn t0() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_000_000)
}

#[tokio::test]
async fn default_dataset_actions() {
    let harness = harness(Dataset::default()).await;
    let actions = harness.diff(true).await.unwrap();

    let expected = [
        ("only-local.txt", Upload),
        ("both.txt", DownloadOverwrite),
        ("newer-local.txt", UploadOverwrite),
        ("newer-remote.txt", DownloadOverwrite),
        ("data.csv", Upload),
        ("data.csv.bak", Download),
        ("only-local/file1.txt", Upload),
        ("only-local/deep/file1.txt", Upload),
        ("only-remote.txt", Download),
        ("only-remote/file1.txt", Download),
        ("only-remote/deep/file1.txt", Download),
        ("both/both.txt", DownloadOverwrite),
        ("both/only-local.txt", Upload),
        ("both/only-remote.txt", Download),
        ("both/deep/file1.txt", UploadOverwrite),
    ];
    assert_eq!(directions(&actions), action_map(&expected));
    assert!(actions.iter().all(|a| a.kind == Kind::File));

    // remote driven actions come before the uploads of local only files
    let first_upload = actions
        .iter()
        .position(|a| a.direction == Upload)
        .unwrap();
    assert!(actions[first_upload..].iter().all(|a| a.direction == Upload));
}

#[tokio::test]
async fn local_newer_file_is_uploaded_over() {
    let dataset = Dataset::new(vec![Entry::file("a.txt", 100)], vec![Entry::file("a.txt", 150)])
        .with_mtime_ref(UNIX_EPOCH + Duration::from_secs(200));
    let harness = harness(dataset).await;

    let remote = harness.remote_snapshot().await;
    assert_eq!(remote.root()[0].mtime().timestamp_millis(), 50_000);
    let local = harness.local_snapshot().await;
    assert_eq!(local.root()[0].mtime().timestamp(), 100);

    let actions = harness.diff(true).await.unwrap();
    assert_eq!(directions(&actions), action_map(&[("a.txt", UploadOverwrite)]));
}

#[tokio::test]
async fn remote_only_directory_is_downloaded() {
    let dataset = Dataset::new(vec![], vec![Entry::dir("dir", vec![Entry::file("b.txt", 10)])]);
    let harness = harness(dataset).await;
    let actions = harness.diff(true).await.unwrap();
    assert_eq!(directions(&actions), action_map(&[("dir/b.txt", Download)]));
}

#[tokio::test]
async fn local_only_file_is_uploaded() {
    let dataset = Dataset::new(vec![Entry::file("c.txt", 10)], vec![]);
    let harness = harness(dataset).await;
    let actions = harness.diff(true).await.unwrap();
    assert_eq!(directions(&actions), action_map(&[("c.txt", Upload)]));
}

#[tokio::test]
async fn same_age_is_downloaded_over() {
    let dataset = Dataset::default().apply_local(Patch::Age("/newer-local.txt", 100));
    let harness = harness(dataset).await;
    let actions = harness.diff(true).await.unwrap();
    assert_eq!(directions(&actions)["newer-local.txt"], DownloadOverwrite);
}

#[tokio::test]
async fn tolerance_absorbs_small_differences() {
    let dataset = Dataset::new(vec![Entry::file("a.txt", 8)], vec![Entry::file("a.txt", 10)]);
    let harness = harness(dataset).await;
    let local = harness.local_tree(&harness.local_snapshot().await, true);
    let remote = harness.remote_tree(&harness.remote_snapshot().await, true);

    let actions = DiffEngine::new().diff(&local, &remote).unwrap();
    assert_eq!(actions[0].direction, UploadOverwrite);

    let actions = DiffEngine::new()
        .with_mtime_tolerance(Duration::from_secs(5))
        .diff(&local, &remote)
        .unwrap();
    assert_eq!(actions[0].direction, DownloadOverwrite);
}

#[tokio::test]
async fn local_snapshot_records_metadata() {
    let harness = harness(Dataset::default()).await;
    let snapshot = harness.local_snapshot().await;

    let names: Vec<_> = snapshot.root().iter().map(|e| e.path()).collect();
    assert_eq!(
        names,
        [
            "./both",
            "./both.txt",
            "./data.csv",
            "./newer-local.txt",
            "./newer-remote.txt",
            "./only-local",
            "./only-local.txt",
        ]
    );
    let both_txt = &snapshot.root()[1];
    assert_eq!(both_txt.size(), Some("/both.txt".len() as u64));
    assert_eq!(
        std::time::SystemTime::from(both_txt.mtime()),
        harness.dataset.mtime(100)
    );
    let both = &snapshot.root()[0];
    assert!(both.is_dir());
    assert_eq!(both.children()[0].path(), "./both/both.txt");
    assert_eq!(snapshot.file_count(), 10);
}

#[tokio::test]
async fn remote_snapshot_matches_dataset() {
    let harness = harness(Dataset::default()).await;
    let snapshot = harness.remote_snapshot().await;

    assert_eq!(snapshot.file_count(), 10);
    let deep = &snapshot.root()[0].children()[1];
    assert_eq!(deep.path(), "/lake/both/deep");
    assert_eq!(deep.children()[0].path(), "/lake/both/deep/file1.txt");
    assert_eq!(
        deep.children()[0].size(),
        Some("/both/deep/file1.txt - remote".len() as u64)
    );
}

#[tokio::test]
async fn snapshot_skips_ignored_paths() {
    let harness = harness(Dataset::default()).await;
    let ignore = PatternList::new(["only-local", "*.csv", "both/deep"].iter()).unwrap();
    let snapshot = SnapshotBuilder::new(harness.local.storage())
        .ignore(&ignore)
        .build()
        .await
        .unwrap();

    let tree = harness.local_tree(&snapshot, true);
    let paths: Vec<_> = tree.flatten().into_iter().map(|(path, _)| path).collect();
    assert_eq!(
        paths,
        [
            "both",
            "both/both.txt",
            "both/only-local.txt",
            "both.txt",
            "newer-local.txt",
            "newer-remote.txt",
            "only-local.txt",
        ]
    );
}

#[tokio::test]
async fn missing_local_root_is_unavailable() {
    let root = utils::temp_path(Some("dlsync-missing"), None);
    let err = FileSystem::new(&root).unwrap_err();
    assert!(matches!(err, Error::NamespaceUnavailable { .. }));
}

#[tokio::test]
async fn missing_remote_root_is_unavailable() {
    let harness = harness(Dataset::default()).await;
    let lake = adls::lake(harness.remote.server(), "/nowhere");
    let err = SnapshotBuilder::new(&lake).build().await.unwrap_err();
    match err {
        Error::NamespaceUnavailable { path, reason } => {
            assert_eq!(path, "/nowhere");
            assert!(reason.contains("no such directory"));
        }
        err => panic!("unexpected error: {err}"),
    }
}

#[tokio::test]
async fn forbidden_subdirectory_aborts_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/webhdfs/v1/lake"))
        .respond_with(ResponseTemplate::new(200).set_body_json(adls::list_status(vec![
            adls::file_status(&Entry::file("a.txt", 1), t0()),
            adls::file_status(&Entry::dir("private", vec![]), t0()),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/webhdfs/v1/lake/private"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let lake = adls::lake(&server, "/lake");
    let err = SnapshotBuilder::new(&lake).build().await.unwrap_err();
    match err {
        Error::NamespaceUnavailable { path, reason } => {
            assert_eq!(path, "/lake/private");
            assert!(reason.contains("permission denied"));
        }
        err => panic!("unexpected error: {err}"),
    }
}

struct FirstPage;

impl wiremock::Match for FirstPage {
    fn matches(&self, request: &Request) -> bool {
        !request.url.query_pairs().any(|(key, _)| key == "listAfter")
    }
}

#[tokio::test]
async fn remote_listing_is_paged() {
    let server = MockServer::start().await;
    let first: Vec<_> = (0..4000)
        .map(|i| adls::file_status(&Entry::file(&format!("f{i:04}"), 1), t0()))
        .collect();
    let second = vec![
        adls::file_status(&Entry::file("g0", 1), t0()),
        adls::file_status(&Entry::file("g1", 1), t0()),
    ];
    Mock::given(method("GET"))
        .and(path("/webhdfs/v1/lake"))
        .and(query_param("listSize", "4000"))
        .and(FirstPage)
        .respond_with(ResponseTemplate::new(200).set_body_json(adls::list_status(first)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/webhdfs/v1/lake"))
        .and(query_param("listAfter", "f3999"))
        .respond_with(ResponseTemplate::new(200).set_body_json(adls::list_status(second)))
        .expect(1)
        .mount(&server)
        .await;

    let lake = adls::lake(&server, "/lake");
    let snapshot = SnapshotBuilder::new(&lake).build().await.unwrap();
    assert_eq!(snapshot.file_count(), 4002);
    assert_eq!(snapshot.root()[4001].path(), "/lake/g1");
}

#[tokio::test]
async fn cached_remote_snapshot_gives_same_actions() {
    let harness = harness(Dataset::default()).await;
    let remote = harness.remote_snapshot().await;

    let cache = SnapshotCache::new(utils::temp_path(Some("dlsync-cache"), Some("json")));
    cache.save(&remote).await.unwrap();
    let cached = cache.load().await.unwrap();
    assert_eq!(cached.root(), remote.root());
    tokio::fs::remove_file(cache.path()).await.unwrap();

    let local = harness.local_tree(&harness.local_snapshot().await, true);
    let engine = DiffEngine::new();
    let fresh_actions = engine
        .diff(&local, &harness.remote_tree(&remote, true))
        .unwrap();
    let cached_actions = engine
        .diff(&local, &harness.remote_tree(&cached, true))
        .unwrap();
    assert_eq!(fresh_actions, cached_actions);
}

#[tokio::test]
async fn case_insensitive_matching() {
    let dataset = Dataset::new(
        vec![Entry::file("Readme.md", 10)],
        vec![Entry::file("README.md", 100)],
    );
    let harness = harness(dataset).await;

    let actions = harness.diff(true).await.unwrap();
    assert_eq!(
        directions(&actions),
        action_map(&[("README.md", Download), ("Readme.md", Upload)])
    );

    let actions = harness.diff(false).await.unwrap();
    assert_eq!(
        directions(&actions),
        action_map(&[("Readme.md", UploadOverwrite)])
    );
}

#[tokio::test]
async fn case_insensitive_plan_targets_existing_files() {
    let dataset = Dataset::new(
        vec![Entry::file("Readme.md", 10)],
        vec![Entry::file("README.md", 100)],
    );
    let harness = harness(dataset).await;
    let actions = harness.diff(false).await.unwrap();

    let local_root = harness.local.storage().root_dir();
    let plan = TransferPlan::new(&actions, local_root, harness.remote.storage().root());
    assert_eq!(plan.len(), 1);
    let call = &plan.calls()[0];
    assert_eq!(call.direction, UploadOverwrite);
    assert_eq!(call.remote, "/lake/README.md");
    assert_eq!(call.local, local_root.join("Readme.md"));
    assert!(call.local.is_file());
}

#[cfg(unix)]
#[tokio::test]
async fn backslash_in_local_names() {
    let dataset = Dataset::new(
        vec![
            Entry::dir(r"a\b", vec![Entry::file(r"c\d.txt", 10)]),
            Entry::file(r"e\f.txt", 10),
        ],
        vec![],
    );
    let harness = harness(dataset).await;
    let actions = harness.diff(true).await.unwrap();
    assert_eq!(
        directions(&actions),
        action_map(&[(r"a\b/c\d.txt", Upload), (r"e\f.txt", Upload)])
    );

    let local_root = harness.local.storage().root_dir();
    let plan = TransferPlan::new(&actions, local_root, harness.remote.storage().root());
    assert!(plan.calls().iter().all(|c| c.local.is_file()));
    assert_eq!(
        harness.local.storage().fs_path(r"./a\b/c\d.txt").unwrap(),
        local_root.join(r"a\b").join(r"c\d.txt")
    );
}

#[tokio::test]
async fn file_against_directory_is_ambiguous() {
    let dataset = Dataset::new(
        vec![Entry::file("x", 10)],
        vec![Entry::dir("x", vec![Entry::file("y", 10)])],
    );
    let harness = harness(dataset).await;
    let err = harness.diff(true).await.unwrap_err();
    assert!(matches!(err, Error::AmbiguousMatch { .. }));
}

#[tokio::test]
async fn transfer_plan_reattaches_roots() {
    let harness = harness(Dataset::default()).await;
    let actions = harness.diff(true).await.unwrap();
    let local_root = harness.local.storage().root_dir();
    let plan = TransferPlan::new(&actions, local_root, harness.remote.storage().root());

    assert_eq!(plan.len(), actions.len());
    let calls = plan.calls();
    let first_download = calls
        .iter()
        .position(|c| !c.direction.is_upload())
        .unwrap();
    assert!(calls[..first_download].iter().all(|c| c.direction.is_upload()));
    assert!(calls[first_download..].iter().all(|c| !c.direction.is_upload()));

    let call = calls
        .iter()
        .find(|c| c.remote == "/lake/both/deep/file1.txt")
        .unwrap();
    assert_eq!(call.direction, UploadOverwrite);
    assert_eq!(call.local, local_root.join("both/deep/file1.txt"));
    assert!(call.local.is_file());
}
