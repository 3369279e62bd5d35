/// Common test fixtures and data structures
///
/// Items are built from a serde model and converted with `serde_dynamo`, the
/// same way application code would write them.
use dynamo_replicate::store::{Item, KeySchema};
use serde::{Deserialize, Serialize};

/// Partition key attribute of every fixture table
pub const PARTITION_KEY: &str = "game";

/// Sort key attribute of every fixture table
pub const SORT_KEY: &str = "age";

/// Test object with partition and sort key
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct TestObject {
    pub game: String,
    pub age: String,
    pub ux: String,
    pub number2: usize,
}

impl TestObject {
    pub fn new(game: &str, age: &str, number2: usize) -> Self {
        Self {
            game: game.to_string(),
            age: age.to_string(),
            ux: format!("ux_{game}_{age}"),
            number2,
        }
    }

    pub fn to_item(&self) -> Item {
        serde_dynamo::to_item(self).expect("fixture serializes")
    }

    pub fn from_item(item: Item) -> Self {
        serde_dynamo::from_item(item).expect("fixture deserializes")
    }
}

/// Key schema of the fixture tables
pub fn key_schema() -> KeySchema {
    KeySchema::new([PARTITION_KEY, SORT_KEY]).expect("non-empty schema")
}

/// `count` objects sharing the partition `game`
pub fn objects(game: &str, count: usize) -> Vec<TestObject> {
    (0..count)
        .map(|i| TestObject::new(game, &format!("{i:03}"), i))
        .collect()
}

/// `count` items sharing the partition `game`
pub fn items(game: &str, count: usize) -> Vec<Item> {
    objects(game, count).iter().map(TestObject::to_item).collect()
}
