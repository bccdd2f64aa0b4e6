use common::*;
use geobit::Repository;
use geobit::artifacts::diff::path_filter::PathFilter;
use geobit::artifacts::objects::value::Value;
use geobit::artifacts::refs::MERGE_HEAD;
use geobit::commands::Operation;
use geobit::commands::porcelain::add::Add;
use geobit::commands::porcelain::merge::Merge;
use geobit::commands::porcelain::reset::{Reset, ResetMode};
use geobit::errors::{OperationError, PreconditionError};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

mod common;

/// Two commits on master; the second grows parcel 1
#[fixture]
fn history(imported: Repository) -> Repository {
    edit(&imported, 1, AREA, Value::from(180), "Grow parcel 1");
    imported
}

fn staged(repository: &Repository) -> usize {
    repository
        .staging_area()
        .count_staged(PathFilter::all())
        .unwrap()
}

fn unstaged(repository: &Repository) -> usize {
    repository
        .working_tree()
        .count_unstaged(PathFilter::all())
        .unwrap()
}

#[rstest]
fn soft_reset_keeps_the_index(history: Repository) {
    let previous = history.resolve_revision("HEAD~1").unwrap().unwrap();

    let target = Reset::new(ResetMode::Soft)
        .target("HEAD~1")
        .run(&history)
        .unwrap();

    assert_eq!(target, previous);
    assert_eq!(head_id(&history), previous);
    assert_eq!(staged(&history), 1);
    assert_eq!(unstaged(&history), 0);
}

#[rstest]
fn mixed_reset_keeps_the_working_tree(history: Repository) {
    Reset::new(ResetMode::Mixed)
        .target("HEAD~1")
        .run(&history)
        .unwrap();

    assert_eq!(staged(&history), 0);
    assert_eq!(unstaged(&history), 1);
    assert_eq!(area(&work_feature(&history, 1).unwrap()), Some(&Value::from(180)));
}

#[rstest]
fn hard_reset_discards_everything(history: Repository) {
    write(&history, 2, parcel("grace", 200));

    Reset::new(ResetMode::Hard)
        .target("HEAD~1")
        .run(&history)
        .unwrap();

    assert_trees_match_head(&history);
    assert_eq!(area(&work_feature(&history, 1).unwrap()), Some(&Value::from(100)));
    assert_eq!(owner(&work_feature(&history, 2).unwrap()), Some(&Value::from("bob")));
}

#[rstest]
fn path_reset_unstages_only_that_path(history: Repository) {
    write(&history, 1, parcel("heidi", 180));
    write(&history, 2, parcel("ivan", 200));
    Add::new().run(&history).unwrap();
    let tip = head_id(&history);

    Reset::new(ResetMode::Mixed)
        .path("parcels/1")
        .run(&history)
        .unwrap();

    assert_eq!(head_id(&history), tip);
    assert_eq!(staged(&history), 1);
    assert_eq!(unstaged(&history), 1);
    assert_eq!(owner(&work_feature(&history, 1).unwrap()), Some(&Value::from("heidi")));
}

#[rstest]
#[case::soft(ResetMode::Soft)]
#[case::hard(ResetMode::Hard)]
fn path_reset_must_be_mixed(history: Repository, #[case] mode: ResetMode) {
    let err = Reset::new(mode).path("parcels/1").run(&history).unwrap_err();

    assert!(matches!(
        err,
        OperationError::Precondition(PreconditionError::InvalidArgument(_))
    ));
}

#[rstest]
fn hard_reset_clears_a_stopped_merge(history: Repository) {
    branch(&history, "roads");
    switch(&history, "roads");
    edit(&history, 1, OWNER, Value::from("carol"), "Sell to carol");
    switch(&history, "master");
    let tip = edit(&history, 1, OWNER, Value::from("dave"), "Sell to dave");
    Merge::new(["roads"]).run(&history).unwrap_err();

    Reset::new(ResetMode::Hard).run(&history).unwrap();

    assert_eq!(head_id(&history), tip);
    assert_trees_match_head(&history);
    assert!(!history.conflicts().has_conflicts().unwrap());
    assert_eq!(history.refs().read_id(MERGE_HEAD).unwrap(), None);
    assert_eq!(history.progress().active().unwrap(), None);
}

#[rstest]
fn unknown_target_is_refused(history: Repository) {
    let err = Reset::new(ResetMode::Hard)
        .target("nowhere")
        .run(&history)
        .unwrap_err();

    assert!(matches!(
        err,
        OperationError::Precondition(PreconditionError::UnresolvedReference(_))
    ));
}
