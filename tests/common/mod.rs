#![allow(dead_code)]

use fake::Fake;
use fake::faker::name::en::Name;
use geobit::Repository;
use geobit::areas::config::{USER_EMAIL_KEY, USER_NAME_KEY};
use geobit::artifacts::objects::feature::FeatureRecord;
use geobit::artifacts::objects::object_id::ObjectId;
use geobit::artifacts::objects::schema::{AttributeDescriptor, SchemaRecord};
use geobit::artifacts::objects::value::{FieldType, Value};
use geobit::commands::Operation;
use geobit::commands::porcelain::add::Add;
use geobit::commands::porcelain::branch::CreateBranch;
use geobit::commands::porcelain::checkout::Checkout;
use geobit::commands::porcelain::commit::CommitStaged;
use rstest::fixture;

pub const PARCELS: &str = "parcels";

pub const OWNER: usize = 0;
pub const AREA: usize = 1;
pub const GEOMETRY: usize = 2;

pub fn parcels_schema() -> SchemaRecord {
    SchemaRecord::new(
        PARCELS.to_string(),
        vec![
            AttributeDescriptor::new("owner".to_string(), FieldType::String),
            AttributeDescriptor::new("area".to_string(), FieldType::Integer),
            AttributeDescriptor::new("geom".to_string(), FieldType::Geometry),
        ],
    )
}

pub fn parcel(owner: &str, area: i64) -> FeatureRecord {
    let x = area % 100;
    FeatureRecord::new(vec![
        Value::from(owner),
        Value::from(area),
        Value::Geometry(format!("POLYGON (({x} 0, {x} 10, {} 10, {x} 0))", x + 10)),
    ])
}

pub fn random_parcel() -> FeatureRecord {
    parcel(&Name().fake::<String>(), (100..10_000).fake::<i64>())
}

pub fn parcel_path(id: u32) -> String {
    format!("{PARCELS}/{id}")
}

/// In-memory repository with an identity configured
#[fixture]
pub fn repository() -> Repository {
    let repository = Repository::in_memory().expect("Failed to create repository");
    configure_identity(&repository);
    repository
}

/// Repository whose master branch holds one commit with parcels 1 and 2
#[fixture]
pub fn imported(repository: Repository) -> Repository {
    repository
        .working_tree()
        .create_type_tree(PARCELS, parcels_schema())
        .expect("Failed to create feature type tree");
    write(&repository, 1, parcel("alice", 100));
    write(&repository, 2, parcel("bob", 200));
    commit_all(&repository, "Initial import");

    repository
}

pub fn configure_identity(repository: &Repository) {
    let config = repository.config();
    config
        .set(USER_NAME_KEY, "Ada Surveyor")
        .expect("Failed to set user name");
    config
        .set(USER_EMAIL_KEY, "ada@example.com")
        .expect("Failed to set user email");
}

pub fn write(repository: &Repository, id: u32, feature: FeatureRecord) -> ObjectId {
    repository
        .working_tree()
        .insert(&parcel_path(id), feature, None)
        .expect("Failed to write feature")
}

pub fn remove(repository: &Repository, id: u32) {
    let removed = repository
        .working_tree()
        .delete(&parcel_path(id))
        .expect("Failed to delete feature");
    assert!(removed, "parcel {id} was not in the working tree");
}

/// Stage everything and commit it
pub fn commit_all(repository: &Repository, message: &str) -> ObjectId {
    Add::new().run(repository).expect("Failed to stage changes");
    CommitStaged::new()
        .message(message)
        .run(repository)
        .expect("Failed to commit")
}

/// Set one attribute of a parcel in the working tree and commit the change
pub fn edit(repository: &Repository, id: u32, index: usize, value: Value, message: &str) -> ObjectId {
    let feature = work_feature(repository, id).expect("parcel missing from working tree");
    write(repository, id, feature.with_value(index, value));
    commit_all(repository, message)
}

pub fn branch(repository: &Repository, name: &str) {
    CreateBranch::new(name)
        .run(repository)
        .expect("Failed to create branch");
}

pub fn switch(repository: &Repository, name: &str) {
    Checkout::new(name)
        .run(repository)
        .expect("Failed to check out branch");
}

pub fn head_id(repository: &Repository) -> ObjectId {
    repository
        .refs()
        .head_id()
        .expect("Failed to read HEAD")
        .expect("HEAD has no commit")
}

pub fn branch_id(repository: &Repository, name: &str) -> ObjectId {
    repository
        .refs()
        .read_id(&format!("refs/heads/{name}"))
        .expect("Failed to read branch")
        .expect("branch does not exist")
}

/// Id of the object at a parcel's path in a commit's tree
pub fn node_id(repository: &Repository, commit_id: &ObjectId, id: u32) -> Option<ObjectId> {
    let database = repository.database();
    let tree_id = database
        .commit_tree_id(commit_id)
        .expect("Failed to read commit");
    database
        .find_node(&tree_id, &parcel_path(id))
        .expect("Failed to look up node")
        .map(|node| node.object_id().clone())
}

/// Parcel as recorded in HEAD's tree
pub fn head_feature(repository: &Repository, id: u32) -> Option<FeatureRecord> {
    node_id(repository, &head_id(repository), id).map(|feature_id| {
        repository
            .database()
            .feature(&feature_id)
            .expect("Failed to read feature")
    })
}

pub fn work_feature(repository: &Repository, id: u32) -> Option<FeatureRecord> {
    repository
        .working_tree()
        .find(&parcel_path(id))
        .expect("Failed to look up node")
        .map(|node| {
            repository
                .database()
                .feature(node.object_id())
                .expect("Failed to read feature")
        })
}

pub fn owner(feature: &FeatureRecord) -> Option<&Value> {
    feature.value(OWNER)
}

pub fn area(feature: &FeatureRecord) -> Option<&Value> {
    feature.value(AREA)
}

/// Working tree, index and HEAD all hold the same tree
pub fn assert_trees_match_head(repository: &Repository) {
    let head_tree = repository.head_tree().expect("Failed to read HEAD tree");
    assert_eq!(repository.staging_area().tree().unwrap(), head_tree);
    assert_eq!(repository.working_tree().tree().unwrap(), head_tree);
}
