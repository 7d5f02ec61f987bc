//! First-success race over a set of futures

use crate::error::{SwapError, SwapResult};

use futures::stream::{FuturesUnordered, StreamExt};
use std::fmt::Display;
use std::future::Future;

/// Resolve with the first future that succeeds.
///
/// Unlike `select_ok` from `futures`, the error returned when every future
/// fails lists each failure, in input order.
pub async fn race_until_success<I, F, T, E>(futures: I) -> SwapResult<T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut pending: FuturesUnordered<_> = futures
        .into_iter()
        .enumerate()
        .map(|(index, future)| async move { (index, future.await) })
        .collect();
    if pending.is_empty() {
        return Err(SwapError::Internal(
            "race_until_success called without futures".to_string(),
        ));
    }

    let mut errors = Vec::with_capacity(pending.len());
    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(value) => return Ok(value),
            Err(e) => errors.push((index, e.to_string())),
        }
    }

    errors.sort_by_key(|(index, _)| *index);
    let errors: Vec<String> = errors.into_iter().map(|(_, e)| e).collect();
    Err(SwapError::AllFailed(errors.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    async fn delayed(ms: u64, result: Result<u32, &'static str>) -> Result<u32, &'static str> {
        sleep(Duration::from_millis(ms)).await;
        result
    }

    #[tokio::test]
    async fn test_first_success_wins_over_earlier_failure() {
        let result = race_until_success(vec![
            Box::pin(delayed(1, Err("node a down"))),
            Box::pin(delayed(20, Ok(2))),
            Box::pin(delayed(200, Ok(3))),
        ])
        .await;

        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_all_failures_are_reported_in_input_order() {
        let result = race_until_success(vec![
            Box::pin(delayed(5, Err("nonce too low"))),
            Box::pin(delayed(1, Err("already known"))),
        ])
        .await;

        match result {
            Err(SwapError::AllFailed(message)) => {
                assert_eq!(message, "nonce too low\nalready known");
            }
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let none: Vec<std::future::Ready<Result<u32, String>>> = Vec::new();
        assert!(matches!(
            tokio_test::block_on(race_until_success(none)),
            Err(SwapError::Internal(_))
        ));
    }
}
