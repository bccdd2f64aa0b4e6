use assert_fs::TempDir;
use assert_fs::prelude::*;
use common::*;
use geobit::Repository;
use geobit::areas::repository::REPOSITORY_DIR;
use geobit::artifacts::objects::value::Value;
use geobit::artifacts::progress::operation_progress::OperationKind;
use geobit::artifacts::refs::MERGE_HEAD;
use geobit::commands::Operation;
use geobit::commands::porcelain::Resume;
use geobit::commands::porcelain::merge::{Merge, ResumeMerge};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

mod common;

#[fixture]
fn repository_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

fn open(dir: &TempDir) -> Repository {
    let repository = Repository::open(dir.path()).expect("Failed to open repository");
    configure_identity(&repository);
    repository
}

#[rstest]
fn opening_creates_the_repository_layout(repository_dir: TempDir) {
    open(&repository_dir);

    let root = repository_dir.child(REPOSITORY_DIR);
    assert!(root.path().is_dir());
    assert!(root.child("HEAD").path().is_file());
}

#[rstest]
fn commits_survive_reopening(repository_dir: TempDir) {
    let tip = {
        let repository = open(&repository_dir);
        repository
            .working_tree()
            .create_type_tree(PARCELS, parcels_schema())
            .unwrap();
        write(&repository, 1, parcel("alice", 100));
        commit_all(&repository, "Initial import")
    };

    let repository = open(&repository_dir);

    assert_eq!(head_id(&repository), tip);
    assert_eq!(head_feature(&repository, 1), Some(parcel("alice", 100)));
    assert_eq!(
        repository.database().commit(&tip).unwrap().message(),
        "Initial import"
    );
    assert_trees_match_head(&repository);
}

#[rstest]
fn stopped_merge_can_be_aborted_after_reopening(repository_dir: TempDir) {
    let tip = {
        let repository = open(&repository_dir);
        repository
            .working_tree()
            .create_type_tree(PARCELS, parcels_schema())
            .unwrap();
        write(&repository, 1, parcel("alice", 100));
        commit_all(&repository, "Initial import");

        branch(&repository, "roads");
        switch(&repository, "roads");
        edit(&repository, 1, OWNER, Value::from("carol"), "Sell to carol");
        switch(&repository, "master");
        let tip = edit(&repository, 1, OWNER, Value::from("dave"), "Sell to dave");
        Merge::new(["roads"]).run(&repository).unwrap_err();
        tip
    };

    let repository = open(&repository_dir);
    assert_eq!(repository.conflicts().count().unwrap(), 1);
    assert!(repository.progress().load(OperationKind::Merge).unwrap().is_some());
    assert!(repository.refs().read_id(MERGE_HEAD).unwrap().is_some());

    ResumeMerge::new(Resume::Abort).run(&repository).unwrap();

    assert_eq!(head_id(&repository), tip);
    assert_eq!(repository.conflicts().count().unwrap(), 0);
    assert_eq!(repository.progress().active().unwrap(), None);
    assert_trees_match_head(&repository);
}

#[rstest]
fn commit_graph_survives_reopening(repository_dir: TempDir) {
    let (first, second) = {
        let repository = open(&repository_dir);
        repository
            .working_tree()
            .create_type_tree(PARCELS, parcels_schema())
            .unwrap();
        write(&repository, 1, parcel("alice", 100));
        let first = commit_all(&repository, "Initial import");
        let second = edit(&repository, 1, OWNER, Value::from("bob"), "Sell to bob");
        (first, second)
    };

    let repository = open(&repository_dir);

    assert_eq!(repository.graph().parents(&first).unwrap(), Some(vec![]));
    assert_eq!(
        repository.graph().parents(&second).unwrap(),
        Some(vec![first.clone()])
    );
    assert_eq!(repository.graph().children(&first).unwrap(), vec![second]);
}
