use framecull::executor::{self, Mode, Outcome};
use framecull::{DedupConfig, DedupError, HashKind, Threshold, plan_directory};
use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn left_half_white() -> RgbImage {
    ImageBuffer::from_fn(64, 64, |x, _| {
        if x < 32 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) }
    })
}

fn top_half_white() -> RgbImage {
    ImageBuffer::from_fn(64, 64, |_, y| {
        if y < 32 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) }
    })
}

fn write_frames(dir: &Path, images: &[RgbImage]) {
    for (i, image) in images.iter().enumerate() {
        image
            .save(dir.join(format!("frame_{:06}.png", i + 1)))
            .unwrap();
    }
}

fn config(dir: &Path) -> DedupConfig {
    DedupConfig {
        hash: HashKind::Mean,
        extensions: vec!["png".to_string()],
        ..DedupConfig::new(dir)
    }
    .validate()
    .unwrap()
}

fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .map(|p| (p.file_name().unwrap().to_string_lossy().into_owned(), fs::read(&p).unwrap()))
        .collect()
}

fn names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn identical_frames_keep_only_the_first() {
    let temp_dir = TempDir::new().unwrap();
    write_frames(temp_dir.path(), &vec![left_half_white(); 5]);

    let plan = plan_directory(&config(temp_dir.path()), false).unwrap();
    assert_eq!(plan.kept_count(), 1);
    assert_eq!(plan.dropped_count(), 4);

    let report = executor::execute(&plan);
    assert!(report.is_clean());
    assert_eq!(names(temp_dir.path()), vec!["frame_000001.png"]);
}

#[test]
fn new_content_starts_a_new_group() {
    let temp_dir = TempDir::new().unwrap();
    write_frames(
        temp_dir.path(),
        &[left_half_white(), left_half_white(), top_half_white(), top_half_white()],
    );

    let plan = plan_directory(&config(temp_dir.path()), false).unwrap();
    let kept: Vec<usize> = plan.kept().map(|f| f.position).collect();
    assert_eq!(kept, vec![0, 2]);
    let pairs: Vec<(String, String)> = plan
        .dropped()
        .map(|(d, k)| (d.frame.name(), k.name()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("frame_000002.png".to_string(), "frame_000001.png".to_string()),
            ("frame_000004.png".to_string(), "frame_000003.png".to_string()),
        ]
    );
}

#[test]
fn png_frames_with_jpg_names_are_decoded() {
    let temp_dir = TempDir::new().unwrap();
    for (i, image) in [left_half_white(), left_half_white(), top_half_white()]
        .iter()
        .enumerate()
    {
        image
            .save_with_format(
                temp_dir.path().join(format!("frame_{:06}.jpg", i + 1)),
                ImageFormat::Png,
            )
            .unwrap();
    }
    let config = DedupConfig {
        hash: HashKind::Mean,
        ..DedupConfig::new(temp_dir.path())
    }
    .validate()
    .unwrap();

    let plan = plan_directory(&config, false).unwrap();
    assert_eq!(plan.total_frames(), 3);
    let kept: Vec<usize> = plan.kept().map(|f| f.position).collect();
    assert_eq!(kept, vec![0, 2]);
}

#[test]
fn empty_directory_is_an_empty_plan() {
    let temp_dir = TempDir::new().unwrap();
    let plan = plan_directory(&config(temp_dir.path()), false).unwrap();
    assert!(plan.is_empty());

    let report = executor::execute(&plan);
    assert!(report.removed.is_empty());
    assert!(report.is_clean());
}

#[test]
fn dry_run_changes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    write_frames(
        temp_dir.path(),
        &[left_half_white(), left_half_white(), top_half_white()],
    );
    let before = snapshot(temp_dir.path());

    let plan = plan_directory(&config(temp_dir.path()), false).unwrap();
    match executor::run(&plan, Mode::DryRun) {
        Outcome::DryRun(text) => {
            assert!(text.contains("Would delete frame_000002.png (duplicate of frame_000001.png"))
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    assert_eq!(snapshot(temp_dir.path()), before);
}

#[test]
fn undeletable_file_does_not_stop_the_rest() {
    let temp_dir = TempDir::new().unwrap();
    write_frames(temp_dir.path(), &vec![left_half_white(); 4]);
    let plan = plan_directory(&config(temp_dir.path()), false).unwrap();

    // a directory in place of a dropped frame cannot be removed with remove_file
    let blocked = temp_dir.path().join("frame_000003.png");
    fs::remove_file(&blocked).unwrap();
    fs::create_dir(&blocked).unwrap();

    let report = executor::execute(&plan);
    assert_eq!(report.removed.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        DedupError::Deletion { path, .. } if path == &blocked
    ));
    assert!(matches!(
        report.check(),
        Err(DedupError::IncompleteDeletion { failed: 1, attempted: 3 })
    ));
    assert_eq!(
        names(temp_dir.path()),
        vec!["frame_000001.png", "frame_000003.png"]
    );
}

#[test]
fn second_run_drops_nothing() {
    let temp_dir = TempDir::new().unwrap();
    write_frames(
        temp_dir.path(),
        &[
            left_half_white(),
            left_half_white(),
            top_half_white(),
            top_half_white(),
            left_half_white(),
        ],
    );
    let config = config(temp_dir.path());

    let first = plan_directory(&config, false).unwrap();
    assert_eq!(first.kept_count(), 3);
    executor::execute(&first);

    let second = plan_directory(&config, false).unwrap();
    assert_eq!(second.dropped_count(), 0);
    assert_eq!(second.kept_count(), 3);
}

#[test]
fn repeated_planning_is_deterministic() {
    let temp_dir = TempDir::new().unwrap();
    write_frames(
        temp_dir.path(),
        &[left_half_white(), top_half_white(), top_half_white()],
    );
    let config = config(temp_dir.path());
    assert_eq!(
        plan_directory(&config, false).unwrap(),
        plan_directory(&config, false).unwrap()
    );
}

#[test]
fn higher_threshold_drops_at_least_as_much() {
    let temp_dir = TempDir::new().unwrap();
    write_frames(
        temp_dir.path(),
        &[left_half_white(), top_half_white(), left_half_white(), left_half_white()],
    );

    let mut previous = 0;
    for t in [0, 5, 16, 40, 64] {
        let config = DedupConfig {
            threshold: Threshold(t),
            ..config(temp_dir.path())
        };
        let plan = plan_directory(&config, false).unwrap();
        assert!(plan.dropped_count() >= previous, "threshold {t}");
        assert!(plan.kept_count() >= 1);
        previous = plan.dropped_count();
    }
    assert_eq!(previous, 3);
}

#[test]
fn corrupt_frame_aborts_before_anything_is_deleted() {
    let temp_dir = TempDir::new().unwrap();
    write_frames(temp_dir.path(), &vec![left_half_white(); 3]);
    fs::write(temp_dir.path().join("frame_000002.png"), b"truncated").unwrap();
    let before = snapshot(temp_dir.path());

    let err = plan_directory(&config(temp_dir.path()), false).unwrap_err();
    assert!(matches!(err, DedupError::Decode { .. }));
    assert_eq!(snapshot(temp_dir.path()), before);
}
