use std::time::Duration;
use std::time::Instant;

use bson::doc;
use mongo_harness::MongoServer;
use mongo_harness::PanicReporter;

use crate::common::enable_logger;
use crate::common::find_answer;
use crate::common::insert_answer;

#[tokio::test]
#[ignore = "requires a legacy mongod on PATH"]
async fn stored_document_is_read_back() {
    enable_logger();
    let mut server = MongoServer::new_started(PanicReporter::shared()).await;
    let client = server.session().await;

    insert_answer(&client, 42).await;
    assert_eq!(find_answer(&client).await, Some(doc! { "_id": 1, "answer": 42 }));

    let db_path = server.db_path().unwrap().to_path_buf();
    server.stop().await;
    assert!(!db_path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires a legacy mongod on PATH"]
async fn concurrent_instances_are_isolated() {
    enable_logger();
    let (mut first, mut second) = tokio::join!(
        MongoServer::new_started(PanicReporter::shared()),
        MongoServer::new_started(PanicReporter::shared()),
    );
    assert_ne!(first.port, second.port);
    assert_ne!(first.db_path(), second.db_path());

    let (first_client, second_client) = tokio::join!(first.session(), second.session());
    tokio::join!(insert_answer(&first_client, 42), insert_answer(&second_client, 43));

    assert_eq!(find_answer(&first_client).await, Some(doc! { "_id": 1, "answer": 42 }));
    assert_eq!(find_answer(&second_client).await, Some(doc! { "_id": 1, "answer": 43 }));

    tokio::join!(first.stop(), second.stop());
}

#[tokio::test]
#[ignore = "requires a legacy mongod on PATH"]
async fn stop_returns_within_bound() {
    enable_logger();
    let mut server = MongoServer::new_started(PanicReporter::shared()).await;

    let begin = Instant::now();
    server.stop().await;
    assert!(begin.elapsed() <= server.stop_timeout + Duration::from_secs(1));
}
