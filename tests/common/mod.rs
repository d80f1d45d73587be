use bson::doc;
use bson::Document;
use mongodb::Client;
use tracing_subscriber::EnvFilter;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for integration test.");
}

pub const DATABASE: &str = "harness";
pub const COLLECTION: &str = "answers";

pub async fn insert_answer(
    client: &Client,
    answer: i32,
) {
    client
        .database(DATABASE)
        .collection::<Document>(COLLECTION)
        .insert_one(doc! { "_id": 1, "answer": answer }, None)
        .await
        .unwrap();
}

pub async fn find_answer(client: &Client) -> Option<Document> {
    client
        .database(DATABASE)
        .collection::<Document>(COLLECTION)
        .find_one(doc! { "_id": 1 }, None)
        .await
        .unwrap()
}
