use std::collections::HashSet;
use std::time::Duration;

use bson::doc;
use mongo_harness::PanicReporter;
use mongo_harness::ReplicaSet;

use crate::common::enable_logger;
use crate::common::find_answer;
use crate::common::insert_answer;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires a legacy mongod on PATH"]
async fn three_members_form_one_set() {
    enable_logger();
    let mut set = ReplicaSet::new(3, PanicReporter::shared()).await;

    let addrs = set.addrs();
    assert_eq!(addrs.len(), 3);
    assert_eq!(addrs.iter().collect::<HashSet<_>>().len(), 3);

    let client = set.session().await;
    insert_answer(&client, 42).await;

    // the write is replicated to a secondary eventually
    let secondary = set.members()[1].session().await;
    let mut replicated = None;
    for _ in 0..50 {
        replicated = secondary
            .database(crate::common::DATABASE)
            .collection::<bson::Document>(crate::common::COLLECTION)
            .find_one(
                doc! { "_id": 1 },
                mongodb::options::FindOneOptions::builder()
                    .selection_criteria(mongodb::options::SelectionCriteria::ReadPreference(
                        mongodb::options::ReadPreference::SecondaryPreferred { options: Default::default() },
                    ))
                    .build(),
            )
            .await
            .unwrap();
        if replicated.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(replicated, Some(doc! { "_id": 1, "answer": 42 }));
    assert_eq!(find_answer(&client).await, Some(doc! { "_id": 1, "answer": 42 }));

    set.stop().await;
}
