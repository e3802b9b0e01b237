//! Fixed-window concurrency for per-text embedding requests.

use std::future::Future;

use futures::future::try_join_all;

use crate::error::EmbeddingError;

/// Embed `texts` by issuing at most `window` requests at a time.
///
/// Inputs are split into consecutive windows; every request in a window
/// runs concurrently and the whole window settles before the next starts.
/// Each request writes into the slot of its input position, so the output
/// order matches `texts` regardless of completion order. The first failure
/// aborts the call and discards everything computed so far.
pub async fn embed_windowed<'a, F, Fut>(
    texts: &'a [String],
    window: usize,
    embed_one: F,
) -> Result<Vec<Vec<f32>>, EmbeddingError>
where
    F: Fn(&'a str) -> Fut,
    Fut: Future<Output = Result<Vec<f32>, EmbeddingError>>,
{
    let window = window.max(1);
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; texts.len()];

    for (batch_index, batch) in texts.chunks(window).enumerate() {
        let offset = batch_index * window;
        let requests = batch.iter().enumerate().map(|(i, text)| {
            let request = embed_one(text.as_str());
            async move { request.await.map(|vector| (offset + i, vector)) }
        });

        for (position, vector) in try_join_all(requests).await? {
            slots[position] = Some(vector);
        }

        tracing::debug!(
            completed = (offset + batch.len()),
            total = texts.len(),
            "embedding window settled"
        );
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.ok_or_else(|| {
                EmbeddingError::InvalidResponse(format!("no embedding produced for input {i}"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| i.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_input() {
        let result = embed_windowed(&[], 5, |_| async { Ok(vec![1.0]) }).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_order_preserved_when_completion_is_reversed() {
        let inputs = texts(7);
        let result = embed_windowed(&inputs, 5, |text| async move {
            let n: u64 = text.parse().unwrap();
            // Earlier inputs finish later within each window.
            tokio::time::sleep(Duration::from_millis(40 - n * 5)).await;
            Ok(vec![n as f32])
        })
        .await
        .unwrap();

        let got: Vec<f32> = result.into_iter().map(|v| v[0]).collect();
        assert_eq!(got, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[tokio::test]
    async fn test_in_flight_requests_bounded_by_window() {
        let in_flight = &AtomicUsize::new(0);
        let peak = &AtomicUsize::new(0);
        let inputs = texts(12);

        embed_windowed(&inputs, 5, move |_| async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![0.0])
        })
        .await
        .unwrap();

        assert_eq!(peak.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_next_window_waits_for_previous() {
        let log = &Mutex::new(Vec::new());
        let inputs = texts(4);

        embed_windowed(&inputs, 2, move |text| async move {
            log.lock().unwrap().push(format!("start {text}"));
            if text == "0" {
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            log.lock().unwrap().push(format!("end {text}"));
            Ok(vec![0.0])
        })
        .await
        .unwrap();

        let log = log.lock().unwrap();
        let position = |entry: &str| log.iter().position(|e| e == entry).unwrap();
        assert!(position("end 0") < position("start 2"));
        assert!(position("end 1") < position("start 3"));
    }

    #[tokio::test]
    async fn test_single_failure_aborts_call() {
        let calls = AtomicUsize::new(0);
        let inputs = texts(10);

        let result = embed_windowed(&inputs, 5, |text| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if text == "3" {
                    Err(EmbeddingError::InvalidResponse("missing embedding".to_string()))
                } else {
                    Ok(vec![1.0])
                }
            }
        })
        .await;

        assert!(matches!(result, Err(EmbeddingError::InvalidResponse(_))));
        // The second window is never issued.
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }
}
