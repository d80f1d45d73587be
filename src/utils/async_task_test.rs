use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::utils::async_task::retry_with_backoff;
use crate::utils::async_task::spawn_task;
use crate::utils::async_task::task_with_timeout_and_exponential_backoff;
use crate::utils::async_task::wait_at_most;
use crate::BackoffPolicy;
use crate::Error;

#[tokio::test]
async fn test_task_with_timeout_and_exponential_backoff_success() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let task = move || {
        let counter = counter_clone.clone();
        async move {
            let current = counter.fetch_add(1, Ordering::SeqCst);
            if current == 0 {
                Err(Error::ClusterInit("First attempt fails".to_string()))
            } else {
                Ok::<_, crate::Error>(current)
            }
        }
    };

    let policy = BackoffPolicy {
        base_delay_ms: 10,
        max_delay_ms: 100,
        timeout_ms: 1000,
        max_retries: 3,
    };

    let result = task_with_timeout_and_exponential_backoff(task, policy).await;

    assert_eq!(result.unwrap(), 1);
    assert_eq!(counter.load(Ordering::SeqCst), 2); // 1 failure + 1 success
}

#[tokio::test]
async fn test_task_with_timeout_and_exponential_backoff_max_retries() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let task = move || {
        let counter = counter_clone.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<u32, _>(Error::ClusterInit("Always fails".to_string()))
        }
    };

    let policy = BackoffPolicy {
        base_delay_ms: 10,
        max_delay_ms: 100,
        timeout_ms: 1000,
        max_retries: 3,
    };

    let result = task_with_timeout_and_exponential_backoff(task, policy).await;

    // exhaustion is reported with the last attempt's error
    match result {
        Err(Error::RetryTaskFailed(message)) => {
            assert!(message.contains("3 attempt(s)"), "got {message}");
            assert!(message.contains("Always fails"), "got {message}");
        }
        other => panic!("expected RetryTaskFailed, got {:?}", other),
    }
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_task_with_timeout_and_exponential_backoff_timeout() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let task = move || {
        let counter = counter_clone.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<u32, _>(42)
        }
    };

    let policy = BackoffPolicy {
        base_delay_ms: 10,
        max_delay_ms: 100,
        timeout_ms: 50,
        max_retries: 2,
    };

    let result = task_with_timeout_and_exponential_backoff(task, policy).await;

    assert!(
        matches!(result, Err(Error::RetryTaskFailed(ref m)) if m.contains("Retry timeout")),
        "got {:?}",
        result
    );
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_delay_is_capped() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let task = move || {
        let counter = counter_clone.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Error::ClusterInit("nope".to_string()))
        }
    };

    // delays: 100, 200, 200, 200 -> 700ms total
    let policy = BackoffPolicy {
        base_delay_ms: 100,
        max_delay_ms: 200,
        timeout_ms: 1000,
        max_retries: 5,
    };

    let started = Instant::now();
    let result = task_with_timeout_and_exponential_backoff(task, policy).await;

    assert!(result.is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 5);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(700) && elapsed < Duration::from_millis(800));
}

#[tokio::test]
async fn test_unlimited_retries_keep_going_until_success() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let task = move || {
        let counter = counter_clone.clone();
        async move {
            let current = counter.fetch_add(1, Ordering::SeqCst);
            if current < 7 {
                Err(Error::ClusterInit("not yet".to_string()))
            } else {
                Ok(current)
            }
        }
    };

    let policy = BackoffPolicy {
        base_delay_ms: 1,
        max_delay_ms: 2,
        timeout_ms: 1000,
        max_retries: 0,
    };

    let result = task_with_timeout_and_exponential_backoff(task, policy).await;
    assert_eq!(result.unwrap(), 7);
}

#[tokio::test]
async fn test_retry_with_backoff_stops_at_first_permanent_error() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let task = move || {
        let counter = counter_clone.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<u32, _>(Error::InvalidConfig("bad member list".to_string()))
        }
    };

    let policy = BackoffPolicy {
        base_delay_ms: 10,
        max_delay_ms: 100,
        timeout_ms: 1000,
        max_retries: 5,
    };

    let result = retry_with_backoff(task, policy, Error::is_transient).await;

    assert!(matches!(result, Err(Error::InvalidConfig(_))));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_with_backoff_retries_transient_errors() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let task = move || {
        let counter = counter_clone.clone();
        async move {
            let current = counter.fetch_add(1, Ordering::SeqCst);
            match current {
                0 => Err(Error::NotYetReady("still starting".to_string())),
                1 => {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok(current)
                }
                _ => Ok(current),
            }
        }
    };

    // the second attempt times out, which also counts as transient
    let policy = BackoffPolicy {
        base_delay_ms: 1,
        max_delay_ms: 5,
        timeout_ms: 50,
        max_retries: 5,
    };

    let result = retry_with_backoff(task, policy, Error::is_transient).await;

    assert_eq!(result.unwrap(), 2);
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_wait_at_most_returns_true_when_task_finishes() {
    let handle = spawn_task("quick", async {});
    assert!(wait_at_most(handle, Duration::from_secs(1)).await);
}

#[tokio::test]
async fn test_wait_at_most_abandons_slow_task_without_cancelling_it() {
    let finished = Arc::new(AtomicU32::new(0));
    let finished_clone = finished.clone();

    let handle = spawn_task("slow", async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        finished_clone.store(1, Ordering::SeqCst);
    });

    let started = Instant::now();
    assert!(!wait_at_most(handle, Duration::from_millis(20)).await);
    assert!(started.elapsed() < Duration::from_millis(200));

    // the abandoned task still runs to completion
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}
