use common::*;
use geobit::Repository;
use geobit::artifacts::objects::value::Value;
use geobit::artifacts::progress::operation_progress::OperationKind;
use geobit::artifacts::refs::{CHERRY_PICK_HEAD, ORIG_HEAD};
use geobit::commands::Operation;
use geobit::commands::porcelain::Resume;
use geobit::commands::porcelain::add::Add;
use geobit::commands::porcelain::checkout::Checkout;
use geobit::commands::porcelain::cherry_pick::{CherryPick, ResumeCherryPick};
use geobit::errors::{OperationError, PreconditionError};
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;

fn assert_no_markers(repository: &Repository) {
    assert_eq!(repository.refs().read_id(CHERRY_PICK_HEAD).unwrap(), None);
    assert_eq!(repository.refs().read_id(ORIG_HEAD).unwrap(), None);
    assert_eq!(repository.progress().active().unwrap(), None);
}

#[rstest]
fn picked_commit_lands_on_head(imported: Repository) {
    branch(&imported, "fixes");
    switch(&imported, "fixes");
    edit(&imported, 2, OWNER, Value::from("frank"), "Transfer parcel 2");
    let picked = edit(&imported, 1, AREA, Value::from(105), "Correct parcel 1 area");
    switch(&imported, "master");
    let tip = head_id(&imported);

    let created = CherryPick::new(["fixes"]).run(&imported).unwrap();

    assert_eq!(created.len(), 1);
    assert_eq!(head_id(&imported), created[0]);
    let commit = imported.database().commit(&created[0]).unwrap();
    let original = imported.database().commit(&picked).unwrap();
    assert_eq!(commit.parents(), &[tip]);
    assert_eq!(commit.message(), original.message());
    assert_eq!(commit.author(), original.author());

    assert_eq!(area(&head_feature(&imported, 1).unwrap()), Some(&Value::from(105)));
    assert_eq!(owner(&head_feature(&imported, 2).unwrap()), Some(&Value::from("bob")));
    assert_trees_match_head(&imported);
    assert_no_markers(&imported);
}

#[rstest]
fn commits_are_picked_in_order(imported: Repository) {
    branch(&imported, "fixes");
    switch(&imported, "fixes");
    let first = edit(&imported, 1, AREA, Value::from(105), "Correct parcel 1 area");
    write(&imported, 3, random_parcel());
    let second = commit_all(&imported, "Add parcel 3");
    switch(&imported, "master");

    let created = CherryPick::new([first.to_string(), second.to_string()])
        .run(&imported)
        .unwrap();

    assert_eq!(created.len(), 2);
    let last = imported.database().commit(&created[1]).unwrap();
    assert_eq!(last.parent(), Some(&created[0]));
    assert_eq!(last.message(), "Add parcel 3");
    assert!(head_feature(&imported, 3).is_some());
}

#[rstest]
fn picking_an_applied_change_is_empty(imported: Repository) {
    branch(&imported, "fixes");
    switch(&imported, "fixes");
    let picked = edit(&imported, 1, AREA, Value::from(105), "Correct parcel 1 area");
    switch(&imported, "master");
    edit(&imported, 1, AREA, Value::from(105), "Same correction");
    let tip = head_id(&imported);

    let err = CherryPick::new([picked.to_string()]).run(&imported).unwrap_err();

    assert!(matches!(
        &err,
        OperationError::NothingToCommit(message) if message.starts_with("cherry-pick of")
    ));
    assert_eq!(head_id(&imported), tip);
    assert_no_markers(&imported);
}

#[rstest]
fn conflict_records_the_picked_commit(imported: Repository) {
    branch(&imported, "fixes");
    switch(&imported, "fixes");
    let picked = edit(&imported, 1, OWNER, Value::from("carol"), "Sell to carol");
    switch(&imported, "master");
    let tip = edit(&imported, 1, OWNER, Value::from("dave"), "Sell to dave");

    let err = CherryPick::new(["fixes"]).run(&imported).unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(
        imported.refs().read_id(CHERRY_PICK_HEAD).unwrap(),
        Some(picked.clone())
    );
    assert_eq!(head_id(&imported), tip);
    assert_eq!(
        imported
            .progress()
            .load(OperationKind::CherryPick)
            .unwrap()
            .unwrap()
            .current(),
        Some(&picked)
    );

    ResumeCherryPick::new(Resume::Abort).run(&imported).unwrap();

    assert_eq!(head_id(&imported), tip);
    assert_trees_match_head(&imported);
    assert!(!imported.conflicts().has_conflicts().unwrap());
    assert_no_markers(&imported);
}

#[rstest]
fn continue_commits_the_resolution(imported: Repository) {
    branch(&imported, "fixes");
    switch(&imported, "fixes");
    edit(&imported, 1, OWNER, Value::from("carol"), "Sell to carol");
    switch(&imported, "master");
    let tip = edit(&imported, 1, OWNER, Value::from("dave"), "Sell to dave");
    CherryPick::new(["fixes"]).run(&imported).unwrap_err();

    Checkout::paths(["parcels/1"], None)
        .ours()
        .run(&imported)
        .unwrap();
    write(&imported, 1, parcel("carol and dave", 100));
    Add::new().run(&imported).unwrap();
    let created = ResumeCherryPick::new(Resume::Continue).run(&imported).unwrap();

    assert_eq!(created.len(), 1);
    let commit = imported.database().commit(&created[0]).unwrap();
    assert_eq!(commit.parents(), &[tip]);
    assert_eq!(commit.message(), "Sell to carol");
    assert_eq!(head_feature(&imported, 1), Some(parcel("carol and dave", 100)));
    assert_no_markers(&imported);
}

#[rstest]
fn nothing_to_pick_is_refused(imported: Repository) {
    let err = CherryPick::new(Vec::<String>::new()).run(&imported).unwrap_err();

    assert!(matches!(
        err,
        OperationError::Precondition(PreconditionError::InvalidArgument(_))
    ));
}

#[rstest]
fn unborn_head_is_refused(repository: Repository) {
    let err = CherryPick::new(["master"]).run(&repository).unwrap_err();

    assert!(err.is_precondition());
}
