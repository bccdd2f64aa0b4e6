use common::*;
use geobit::Repository;
use geobit::artifacts::objects::value::Value;
use geobit::artifacts::progress::operation_progress::OperationKind;
use geobit::artifacts::diff::path_filter::PathFilter;
use geobit::commands::Operation;
use geobit::commands::porcelain::Resume;
use geobit::commands::porcelain::merge::Merge;
use geobit::commands::porcelain::revert::{ResumeRevert, Revert};
use geobit::errors::{OperationError, PreconditionError};
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;

#[rstest]
fn revert_undoes_the_commit(imported: Repository) {
    let reverted = edit(&imported, 1, AREA, Value::from(175), "Grow parcel 1");
    edit(&imported, 2, OWNER, Value::from("frank"), "Transfer parcel 2");
    let tip = head_id(&imported);

    let created = Revert::new([reverted.to_string()]).run(&imported).unwrap();

    assert_eq!(created.len(), 1);
    let commit = imported.database().commit(&created[0]).unwrap();
    assert_eq!(commit.parents(), &[tip]);
    assert_eq!(
        commit.message(),
        format!("Revert 'Grow parcel 1'\nThis reverts {reverted}")
    );
    assert_eq!(area(&head_feature(&imported, 1).unwrap()), Some(&Value::from(100)));
    assert_eq!(owner(&head_feature(&imported, 2).unwrap()), Some(&Value::from("frank")));
    assert_trees_match_head(&imported);
    assert_eq!(imported.progress().active().unwrap(), None);
}

#[rstest]
fn reverting_an_addition_removes_the_feature(imported: Repository) {
    write(&imported, 3, random_parcel());
    commit_all(&imported, "Add parcel 3");

    Revert::new(["HEAD"]).run(&imported).unwrap();

    assert_eq!(head_feature(&imported, 3), None);
}

#[rstest]
fn no_commit_leaves_the_inverse_staged(imported: Repository) {
    edit(&imported, 1, AREA, Value::from(175), "Grow parcel 1");
    let tip = edit(&imported, 2, AREA, Value::from(250), "Grow parcel 2");

    let created = Revert::new(["HEAD", "HEAD~1"])
        .no_commit(true)
        .run(&imported)
        .unwrap();

    assert!(created.is_empty());
    assert_eq!(head_id(&imported), tip);
    assert_eq!(
        imported.staging_area().count_staged(PathFilter::all()).unwrap(),
        2
    );
    let initial_tree = imported
        .database()
        .commit_tree_id(&imported.resolve_revision("HEAD~2").unwrap().unwrap())
        .unwrap();
    assert_eq!(imported.staging_area().tree().unwrap(), initial_tree);
    assert_eq!(imported.working_tree().tree().unwrap(), initial_tree);
}

#[rstest]
fn merge_commits_are_refused(imported: Repository) {
    branch(&imported, "roads");
    switch(&imported, "roads");
    edit(&imported, 1, AREA, Value::from(110), "Theirs");
    switch(&imported, "master");
    edit(&imported, 2, AREA, Value::from(210), "Ours");
    Merge::new(["roads"]).run(&imported).unwrap();

    let err = Revert::new(["HEAD"]).run(&imported).unwrap_err();

    assert!(matches!(
        err,
        OperationError::Precondition(PreconditionError::InvalidArgument(_))
    ));
}

#[rstest]
fn conflicting_revert_can_be_skipped(imported: Repository) {
    let reverted = edit(&imported, 1, OWNER, Value::from("carol"), "Sell to carol");
    edit(&imported, 1, OWNER, Value::from("dave"), "Sell to dave");
    let also_reverted = edit(&imported, 2, AREA, Value::from(250), "Grow parcel 2");

    let err = Revert::new([also_reverted.to_string(), reverted.to_string()])
        .run(&imported)
        .unwrap_err();

    assert!(err.is_conflict());
    assert!(err.to_string().starts_with("error: could not revert"));
    let progress = imported.progress().load(OperationKind::Revert).unwrap().unwrap();
    assert_eq!(progress.current(), Some(&reverted));
    assert_eq!(progress.cursor(), 1);

    let created = ResumeRevert::new(Resume::Skip).run(&imported).unwrap();

    assert!(created.is_empty());
    assert_eq!(owner(&head_feature(&imported, 1).unwrap()), Some(&Value::from("dave")));
    assert_eq!(area(&head_feature(&imported, 2).unwrap()), Some(&Value::from(200)));
    assert_trees_match_head(&imported);
    assert_eq!(imported.progress().active().unwrap(), None);
}

#[rstest]
fn aborted_revert_restores_head(imported: Repository) {
    let reverted = edit(&imported, 1, OWNER, Value::from("carol"), "Sell to carol");
    let tip = edit(&imported, 1, OWNER, Value::from("dave"), "Sell to dave");
    Revert::new([reverted.to_string()]).run(&imported).unwrap_err();

    ResumeRevert::new(Resume::Abort).run(&imported).unwrap();

    assert_eq!(head_id(&imported), tip);
    assert_trees_match_head(&imported);
    assert!(!imported.conflicts().has_conflicts().unwrap());
}
