//! Library cache, channel catalog and playback planning

mod helpers;

use helpers::*;
use rtag_common::config::{FingerprintMode, RunConfig};
use rtag_common::events::{EventBus, SyncEvent};
use rtag_sync::backend::ExecutionBackend;
use rtag_sync::services::{
    ChannelCatalog, ChannelStat, LibraryCache, ManifestStore, Player, PresetPrompter,
    RecordInspector, SyncPipeline,
};
use rtag_sync::SyncError;
use std::path::PathBuf;
use std::sync::Arc;

fn info(begin: &str, end: &str, duration: &str, channels: &[(&str, u64)]) -> String {
    let mut text = format!(
        "begin_time:     {}\nend_time:       {}\nduration:       {} Seconds\nchannels_info:  ",
        begin, end, duration
    );
    for (name, count) in channels {
        text.push_str(&format!("{}  {} messages: pb.Msg\n                ", name, count));
    }
    text
}

/// Sync one tag into `out` and return the run configuration used
async fn synced_workspace(root: &std::path::Path, mock: &Arc<MockBackend>) -> RunConfig {
    let nas = root.join("nas");
    let a1 = write_fragment(&nas, "soc1", "a.record.00001", 10);
    let b1 = write_fragment(&nas, "soc2", "a.record.00001", 10);
    let c1 = write_fragment(&nas, "soc1", "c.record.00001", 10);
    let manifest = format!(
        "{}{}",
        manifest_line("2025-12-27 16:30:00", "Lane Change", &[&c1]),
        manifest_line("2025-12-27 16:28:10", "Hard Brake", &[&a1, &b1]),
    );
    let tasks = ManifestStore::parse_str(&manifest).unwrap();

    let config = run_config(&root.join("out"));
    let exec: Arc<dyn ExecutionBackend> = mock.clone();
    SyncPipeline::new(Arc::new(config.clone()), exec)
        .with_disk_space(Arc::new(FixedSpace(u64::MAX)))
        .sync(&tasks, &[])
        .await
        .unwrap();
    config
}

#[tokio::test]
async fn test_library_lists_synced_tags_in_time_order() {
    let root = tempfile::tempdir().unwrap();
    let mock = MockBackend::new();
    let config = synced_workspace(root.path(), &mock).await;

    let library = LibraryCache::from_config(&config).get_library().unwrap();

    assert_eq!(library.len(), 2);
    assert_eq!(library[0].tag, "Hard_Brake");
    assert_eq!(library[0].time, "2025-12-27 16:28:10");
    assert_eq!(library[1].tag, "Lane_Change");
    assert_eq!(
        library[0].partitions.keys().collect::<Vec<_>>(),
        vec!["soc1", "soc2"]
    );
    let fragment = &library[0].partitions["soc1"][0];
    assert!(fragment.path.ends_with("01.Hard_Brake/soc1/a.record.00001.split"));
    assert_eq!(fragment.begin, "2025-12-27T16:28:05");
    assert_eq!(fragment.duration, 15);
}

#[tokio::test]
async fn test_second_read_served_from_cache() {
    let root = tempfile::tempdir().unwrap();
    let mock = MockBackend::new();
    let config = synced_workspace(root.path(), &mock).await;

    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();
    let cache = LibraryCache::from_config(&config).with_events(bus);

    let first = cache.get_library().unwrap();
    let second = cache.get_library().unwrap();

    assert_eq!(first, second);
    assert_eq!(cache.scan_count(), 1);
    assert!(cache.cache_path().is_file());

    assert!(matches!(
        rx.try_recv().unwrap(),
        SyncEvent::LibraryLoaded {
            entries: 2,
            from_cache: false
        }
    ));
    assert!(matches!(
        rx.try_recv().unwrap(),
        SyncEvent::LibraryLoaded {
            entries: 2,
            from_cache: true
        }
    ));

    // A fresh instance reads the persisted envelope without scanning
    let reopened = LibraryCache::from_config(&config);
    assert_eq!(reopened.get_library().unwrap(), first);
    assert_eq!(reopened.scan_count(), 0);
}

#[tokio::test]
async fn test_sidecar_fingerprint_sees_new_contracts() {
    let root = tempfile::tempdir().unwrap();
    let mock = MockBackend::new();
    let config = synced_workspace(root.path(), &mock).await;

    let cache = LibraryCache::new(config.work_dir(), FingerprintMode::Sidecars);
    assert_eq!(cache.get_library().unwrap().len(), 2);

    let nas = root.path().join("nas");
    let d1 = write_fragment(&nas, "soc2", "d.record.00001", 10);
    let tasks =
        ManifestStore::parse_str(&manifest_line("2025-12-27 17:00:00", "Cut In", &[&d1])).unwrap();
    let exec: Arc<dyn ExecutionBackend> = mock.clone();
    SyncPipeline::new(Arc::new(config.clone()), exec)
        .with_disk_space(Arc::new(FixedSpace(u64::MAX)))
        .sync(&tasks, &[])
        .await
        .unwrap();

    let library = cache.get_library().unwrap();
    assert_eq!(cache.scan_count(), 2);
    assert_eq!(library.len(), 3);
    assert_eq!(library[2].tag, "Cut_In");
}

#[tokio::test]
async fn test_unreadable_cache_triggers_rescan() {
    let root = tempfile::tempdir().unwrap();
    let mock = MockBackend::new();
    let config = synced_workspace(root.path(), &mock).await;

    let cache = LibraryCache::from_config(&config);
    let expected = cache.get_library().unwrap();
    std::fs::write(cache.cache_path(), b"{ not json").unwrap();

    assert_eq!(cache.get_library().unwrap(), expected);
    assert_eq!(cache.scan_count(), 2);
}

#[test]
fn test_missing_work_dir_is_empty_library() {
    let root = tempfile::tempdir().unwrap();
    let work_dir = root.path().join("20251227").join("truck7");

    let cache = LibraryCache::new(&work_dir, FingerprintMode::Mtime);

    assert!(cache.get_library().unwrap().is_empty());
    assert!(!work_dir.exists());
}

#[tokio::test]
async fn test_play_library_entry_through_backend() {
    let root = tempfile::tempdir().unwrap();
    let mock = MockBackend::new();
    let config = synced_workspace(root.path(), &mock).await;
    let library = LibraryCache::from_config(&config).get_library().unwrap();

    let exec: Arc<dyn ExecutionBackend> = mock.clone();
    let player = Player::new(exec, TOOL);
    let plan = player
        .plan_entry(&library[0], None, 5, 12, &["/sensor/lidar/top".to_string()])
        .unwrap();
    player.play(&plan).await.unwrap();

    assert_eq!(plan.files.len(), 2);
    let played = mock.interactive_commands();
    assert_eq!(played.len(), 1);
    assert!(played[0].starts_with("cyber_recorder play -l -f "));
    assert!(played[0].contains("soc1/a.record.00001.split"));
    assert!(played[0].contains("soc2/a.record.00001.split"));
    assert!(played[0].contains("-b \"2025-12-27 16:28:10\" -e \"2025-12-27 16:28:17\""));
    assert!(played[0].ends_with("-k /sensor/lidar/top"));
}

#[tokio::test]
async fn test_loose_files_play_back_to_back() {
    let root = tempfile::tempdir().unwrap();
    let first = write_fragment(root.path(), "soc1", "a.record.00001", 10);
    let second = write_fragment(root.path(), "soc1", "a.record.00002", 10);

    let mock = MockBackend::new();
    mock.info_for(
        "a.record.00001",
        &info("2025-12-27 16:28:05", "2025-12-27 16:28:15", "10.0", &[]),
    );
    mock.info_for(
        "a.record.00002",
        &info("2025-12-27 16:28:15", "2025-12-27 16:28:25", "10.9", &[]),
    );
    let exec: Arc<dyn ExecutionBackend> = mock.clone();
    let inspector = RecordInspector::new(exec.clone(), TOOL);
    let player = Player::new(exec, TOOL);

    // Given out of order; played in sequence order
    let plan = player
        .plan_files(&inspector, &[second.clone(), first.clone()], 5, 12, &[])
        .await
        .unwrap();

    assert_eq!(plan.window.total, 20);
    assert_eq!(plan.files, vec![first.clone(), second.clone()]);
    assert_eq!(
        plan.command,
        format!(
            "cyber_recorder play -l -f {} {} -b \"2025-12-27 16:28:10\" -e \"2025-12-27 16:28:17\"",
            first.display(),
            second.display()
        )
    );
}

#[tokio::test]
async fn test_range_past_the_end_plays_everything() {
    let root = tempfile::tempdir().unwrap();
    let file = write_fragment(root.path(), "soc1", "a.record.00001", 10);
    let mock = MockBackend::new();
    mock.info_for("a.record.00001", INFO_CAMERA_LIDAR);
    let exec: Arc<dyn ExecutionBackend> = mock.clone();
    let inspector = RecordInspector::new(exec.clone(), TOOL);

    let plan = Player::new(exec, TOOL)
        .plan_files(&inspector, &[file], 30, 40, &[])
        .await
        .unwrap();

    assert!(plan.window.reset);
    assert_eq!((plan.window.start_sec, plan.window.end_sec), (0, 15));
}

#[tokio::test]
async fn test_channel_catalog_unions_directories() {
    let root = tempfile::tempdir().unwrap();
    let a1 = write_fragment(root.path(), "soc1", "a.record.00001", 10);
    let a2 = write_fragment(root.path(), "soc1", "a.record.00002", 10);
    let b1 = write_fragment(root.path(), "soc2", "b.record.00001", 10);

    let mock = MockBackend::new();
    mock.info_for("/soc1/", INFO_CAMERA_LIDAR);
    mock.info_for(
        "/soc2/",
        &info(
            "2025-12-27 16:28:05",
            "2025-12-27 16:28:20",
            "15",
            &[("/sensor/camera/front", 100), ("/sensor/radar/front", 20)],
        ),
    );
    let exec: Arc<dyn ExecutionBackend> = mock.clone();
    let inspector = RecordInspector::new(exec, TOOL);

    let channels = ChannelCatalog::new(&inspector)
        .collect(&[a1, a2, b1])
        .await
        .unwrap();

    let stat = |name: &str, messages| ChannelStat {
        name: name.to_string(),
        messages,
    };
    assert_eq!(
        channels,
        vec![
            stat("/sensor/camera/front", 250),
            stat("/sensor/lidar/top", 150),
            stat("/sensor/radar/front", 20),
        ]
    );
    // One info call per directory
    assert_eq!(mock.commands().len(), 2);
}

#[tokio::test]
async fn test_preset_exclusions_checked_against_catalog() {
    let root = tempfile::tempdir().unwrap();
    let a1 = write_fragment(root.path(), "soc1", "a.record.00001", 10);
    let mock = MockBackend::new();
    mock.info_for("/soc1/", INFO_CAMERA_LIDAR);
    let exec: Arc<dyn ExecutionBackend> = mock.clone();
    let inspector = RecordInspector::new(exec, TOOL);
    let catalog = ChannelCatalog::new(&inspector);
    let fragments: Vec<PathBuf> = vec![a1];
    let presets = vec!["/sensor/lidar/top".to_string(), "/not/recorded".to_string()];

    let declined = PresetPrompter::new(presets.clone(), false);
    assert!(catalog
        .choose_excluded(&declined, &fragments)
        .await
        .unwrap()
        .is_empty());
    assert!(mock.commands().is_empty());

    let accepted = PresetPrompter::new(presets, true);
    assert_eq!(
        catalog.choose_excluded(&accepted, &fragments).await.unwrap(),
        vec!["/sensor/lidar/top".to_string()]
    );
}

#[tokio::test]
async fn test_info_failure_surfaces_backend_error() {
    let root = tempfile::tempdir().unwrap();
    let file = write_fragment(root.path(), "soc1", "broken.record.00001", 10);
    let exec: Arc<dyn ExecutionBackend> = MockBackend::new();

    let result = RecordInspector::new(exec, TOOL).info(&file).await;

    assert!(matches!(result, Err(SyncError::Backend(_))));
}
