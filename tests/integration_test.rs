//! Integration test: registry construction, event pipeline, descriptor
//! resolution, threshold alerts. Everything except the fanotify syscalls
//! themselves, which need CAP_SYS_ADMIN and are exercised manually.

use std::io::Write;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};

use nix::sys::fanotify::MaskFlags;

use entroguard::config::DetectionConfig;
use entroguard::detector::Finding;
use entroguard::watcher::RawEvent;
use entroguard::{Detector, EventPipeline, WatchRegistry};

fn write_file(path: &Path, content: &[u8]) {
    std::fs::File::create(path).unwrap().write_all(content).unwrap();
}

/// 64 KiB with an exactly uniform byte histogram; entropy 8.0.
fn scrambled_bytes() -> Vec<u8> {
    (0..65536u32)
        .map(|i| ((i.wrapping_mul(1103515245).wrapping_add(12345)) % 256) as u8)
        .collect()
}

fn open_handle(path: &Path) -> OwnedFd {
    OwnedFd::from(std::fs::File::open(path).unwrap())
}

fn fd_is_open(fd: RawFd) -> bool {
    unsafe { libc::fcntl(fd, libc::F_GETFD) != -1 }
}

fn other_pid() -> i32 {
    std::process::id() as i32 + 1
}

fn pipeline_for(paths: &[PathBuf]) -> EventPipeline {
    let registry = WatchRegistry::from_paths(paths);
    let detector = Detector::new(DetectionConfig::default());
    EventPipeline::new(registry, detector)
}

#[test]
fn open_then_high_entropy_modify_raises_both_alerts() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().canonicalize().unwrap().join("f.txt");
    write_file(&file, b"ordinary low entropy text, nothing to see here");

    let mut pipeline = pipeline_for(&[file.clone()]);

    // OPEN with unchanged content: one informational record, no alerts.
    let event = RawEvent::new(MaskFlags::FAN_OPEN, other_pid(), Some(open_handle(&file)));
    let findings = pipeline.process(event);
    assert_eq!(findings.len(), 1);
    assert!(matches!(
        findings[0],
        Finding::FileAccess { previous: Some(_), .. }
    ));

    // The file is rewritten in place with scrambled bytes.
    write_file(&file, &scrambled_bytes());

    let event = RawEvent::new(MaskFlags::FAN_MODIFY, other_pid(), Some(open_handle(&file)));
    let findings = pipeline.process(event);

    assert_eq!(findings.len(), 3);
    assert!(matches!(findings[0], Finding::FileAccess { .. }));
    assert!(matches!(findings[1], Finding::EntropyJump { .. }));
    assert!(matches!(findings[2], Finding::HighEntropy { entropy, .. } if entropy > 7.0));

    // Across both events: exactly two informational records, two alerts.
}

#[test]
fn directory_watch_reports_children_without_entropy_readings() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().canonicalize().unwrap();
    let inside = base.join("dropped.bin");
    write_file(&inside, &scrambled_bytes());

    let mut pipeline = pipeline_for(&[base]);

    let event = RawEvent::new(MaskFlags::FAN_MODIFY, other_pid(), Some(open_handle(&inside)));
    let findings = pipeline.process(event);

    assert_eq!(findings.len(), 1);
    assert!(matches!(findings[0], Finding::DirectoryAccess { .. }));
    assert!(pipeline.registry().targets()[0].last_entropy.is_none());
}

#[test]
fn own_events_are_filtered_and_still_release_the_handle() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().canonicalize().unwrap().join("f.txt");
    write_file(&file, b"content");

    let mut pipeline = pipeline_for(&[file.clone()]);

    let handle = open_handle(&file);
    let raw = handle.as_raw_fd();
    let own_pid = std::process::id() as i32;

    let findings = pipeline.process(RawEvent::new(MaskFlags::FAN_OPEN, own_pid, Some(handle)));

    assert!(findings.is_empty());
    assert!(!fd_is_open(raw), "self-filtered event leaked its descriptor");
}

#[test]
fn processing_releases_the_handle_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().canonicalize().unwrap().join("f.txt");
    write_file(&file, b"plain baseline content");

    let mut pipeline = pipeline_for(&[file.clone()]);

    let handle = open_handle(&file);
    let raw = handle.as_raw_fd();

    let findings = pipeline.process(RawEvent::new(MaskFlags::FAN_OPEN, other_pid(), Some(handle)));

    assert!(!findings.is_empty());
    assert!(!fd_is_open(raw), "processed event leaked its descriptor");
}

#[test]
fn events_without_a_handle_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().canonicalize().unwrap().join("f.txt");
    write_file(&file, b"content");

    let mut pipeline = pipeline_for(&[file]);

    let findings = pipeline.process(RawEvent::new(MaskFlags::FAN_OPEN, other_pid(), None));
    assert!(findings.is_empty());
}

#[test]
fn unmatched_paths_produce_no_findings() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().canonicalize().unwrap();
    let watched = base.join("watched");
    let elsewhere = base.join("elsewhere");
    std::fs::create_dir(&watched).unwrap();
    std::fs::create_dir(&elsewhere).unwrap();

    let stray = elsewhere.join("stray.txt");
    write_file(&stray, b"unrelated");

    let mut pipeline = pipeline_for(&[watched]);

    let findings = pipeline.process(RawEvent::new(
        MaskFlags::FAN_OPEN,
        other_pid(),
        Some(open_handle(&stray)),
    ));
    assert!(findings.is_empty());
}

#[test]
fn transient_read_failure_keeps_the_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().canonicalize().unwrap().join("f.txt");
    write_file(&file, b"stable baseline content");

    let mut pipeline = pipeline_for(&[file.clone()]);
    let baseline = pipeline.registry().targets()[0].last_entropy;
    assert!(baseline.is_some());

    // Keep a descriptor for the event, then truncate so the recompute sees
    // an empty file and fails.
    let handle = open_handle(&file);
    write_file(&file, b"");

    let findings = pipeline.process(RawEvent::new(MaskFlags::FAN_MODIFY, other_pid(), Some(handle)));

    assert!(findings.is_empty());
    assert_eq!(pipeline.registry().targets()[0].last_entropy, baseline);
}

#[test]
fn open_and_modify_in_one_event_are_handled_per_kind() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().canonicalize().unwrap().join("f.txt");
    write_file(&file, b"ordinary text content for the baseline");

    let mut pipeline = pipeline_for(&[file.clone()]);

    let mask = MaskFlags::FAN_OPEN | MaskFlags::FAN_MODIFY;
    let findings = pipeline.process(RawEvent::new(mask, other_pid(), Some(open_handle(&file))));

    // One informational record per kind, no alerts for unchanged content.
    assert_eq!(findings.len(), 2);
    assert!(findings
        .iter()
        .all(|f| matches!(f, Finding::FileAccess { .. })));
}
