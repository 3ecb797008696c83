//! Integration tests for the apply step.
//!
//! A plan is built from a real export tree, then previewed and applied into
//! a separate destination.

use assert_fs::prelude::*;
use assert_fs::TempDir;
use media_export_reconciler::core::apply::{
    ApplyAction, ApplyExecutor, ApplyPlanner, OperationMode,
};
use media_export_reconciler::core::pipeline::{Pipeline, ReconciliationPlan};
use media_export_reconciler::error::ApplyError;
use predicates::prelude::*;

fn export(temp: &TempDir) -> ReconciliationPlan {
    let root = temp.child("export");
    root.child("memories/img_20230501_1200.jpg").write_binary(b"jpeg").unwrap();
    root.child("memories/img_20230501_1200(1).jpg").write_binary(b"jpeg").unwrap();
    root.child("memories/img_20230501_1200_overlay.png").write_binary(b"png").unwrap();
    root.child("memories/beach.mp4").write_binary(b"video").unwrap();
    root.child("thumbs/beach-thumbnail.jpg").write_binary(b"t").unwrap();
    root.child("notes.xyz").write_str("ignored").unwrap();

    Pipeline::builder().root(root.path()).build().unwrap().run().unwrap()
}

#[test]
fn dry_run_touches_nothing() {
    let temp = TempDir::new().unwrap();
    let plan = export(&temp);
    let dest = temp.child("library");

    let actions = ApplyPlanner::plan(&plan, dest.path()).unwrap();
    let outcome = ApplyExecutor::new(&plan.root).execute(&actions, OperationMode::Copy, true);

    assert!(outcome.dry_run);
    assert!(outcome.is_clean());
    assert_eq!(outcome.completed.len(), actions.len());
    assert_eq!(outcome.files_placed, 3);
    assert_eq!(outcome.files_deleted, 2);
    dest.assert(predicate::path::missing());
    temp.child("export/memories/img_20230501_1200(1).jpg")
        .assert(predicate::path::exists());
    temp.child("export/thumbs/beach-thumbnail.jpg")
        .assert(predicate::path::exists());
}

#[test]
fn copy_builds_dated_library_and_deletes_discards() {
    let temp = TempDir::new().unwrap();
    let plan = export(&temp);
    let dest = temp.child("library");

    let actions = ApplyPlanner::plan(&plan, dest.path()).unwrap();
    let outcome = ApplyExecutor::new(&plan.root).execute(&actions, OperationMode::Copy, false);

    assert!(outcome.is_clean(), "failures: {:?}", outcome.failures);
    dest.child("Photos/2023/05/img_20230501_1200.jpg")
        .assert(predicate::path::is_file())
        .assert("jpeg");
    dest.child("Photos/2023/05/img_20230501_1200-overlay.png")
        .assert("png");
    dest.child("Videos/Undated/beach.mp4").assert("video");

    // Copies keep the originals; only discards leave the export
    temp.child("export/memories/img_20230501_1200.jpg")
        .assert(predicate::path::exists());
    temp.child("export/memories/img_20230501_1200(1).jpg")
        .assert(predicate::path::missing());
    temp.child("export/thumbs/beach-thumbnail.jpg")
        .assert(predicate::path::missing());
    temp.child("export/thumbs").assert(predicate::path::missing());
    assert_eq!(outcome.folders_removed, 1);
}

#[test]
fn move_empties_the_export() {
    let temp = TempDir::new().unwrap();
    let plan = export(&temp);
    let dest = temp.child("library");

    let actions = ApplyPlanner::plan(&plan, dest.path()).unwrap();
    let outcome = ApplyExecutor::new(&plan.root).execute(&actions, OperationMode::Move, false);

    assert!(outcome.is_clean(), "failures: {:?}", outcome.failures);
    assert_eq!(outcome.files_placed, 3);
    temp.child("export/memories").assert(predicate::path::missing());
    temp.child("export/notes.xyz").assert(predicate::path::exists());
    dest.child("Videos/Undated/beach.mp4").assert(predicate::path::exists());
}

#[test]
fn stamped_capture_time_becomes_modification_time() {
    let temp = TempDir::new().unwrap();
    let plan = export(&temp);
    let dest = temp.child("library");

    let actions = ApplyPlanner::plan(&plan, dest.path()).unwrap();
    ApplyExecutor::new(&plan.root).execute(&actions, OperationMode::Copy, false);

    let expected = actions
        .iter()
        .find_map(|a| match a {
            ApplyAction::Place {
                destination,
                capture_time: Some(t),
                ..
            } if destination.ends_with("img_20230501_1200.jpg") => t.to_system_time(),
            _ => None,
        })
        .unwrap();
    let modified = std::fs::metadata(dest.child("Photos/2023/05/img_20230501_1200.jpg").path())
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(modified, expected);
}

#[test]
fn destination_inside_export_is_refused() {
    let temp = TempDir::new().unwrap();
    let plan = export(&temp);

    let result = ApplyPlanner::plan(&plan, &plan.root.join("sorted"));

    assert!(matches!(result, Err(ApplyError::DestinationInsideRoot { .. })));
}

#[test]
fn existing_destination_files_are_not_overwritten() {
    let temp = TempDir::new().unwrap();
    let plan = export(&temp);
    let dest = temp.child("library");
    dest.child("Videos/Undated/beach.mp4").write_str("already here").unwrap();

    let actions = ApplyPlanner::plan(&plan, dest.path()).unwrap();
    let outcome = ApplyExecutor::new(&plan.root).execute(&actions, OperationMode::Copy, false);

    assert!(outcome.is_clean());
    dest.child("Videos/Undated/beach.mp4").assert("already here");
    dest.child("Videos/Undated/beach_1.mp4").assert("video");
}
