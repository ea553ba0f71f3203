use std::{fmt::Display, future::Future};
use tracing::{error, warn};

/// Outcome of a successful run: the value plus how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: usize,
}

impl<T> Attempted<T> {
    /// Attempts beyond the first.
    pub fn retries(&self) -> usize {
        self.attempts.saturating_sub(1)
    }
}

/// Bounded retry with no delay between attempts. `max_attempts` counts the
/// first try, so `1` means "no retry".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 1 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Runs `op` until it succeeds or the attempts are used up. Every attempt
    /// starts from scratch; `outcome` holds the latest result, so on
    /// exhaustion the last error is returned unchanged.
    pub async fn run<F, Fut, T, E>(&self, mut op: F) -> Result<Attempted<T>, E>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        let mut outcome = op(attempt).await;

        while attempt < max_attempts {
            match outcome {
                Ok(value) => return Ok(Attempted { value, attempts: attempt }),
                Err(err) => {
                    warn!(attempt, max_attempts, error = %err, "Attempt failed, retrying");
                    attempt += 1;
                    outcome = op(attempt).await;
                }
            }
        }

        match outcome {
            Ok(value) => Ok(Attempted { value, attempts: attempt }),
            Err(err) => {
                error!(attempts = attempt, error = %err, "Retry budget exhausted");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_first_attempt_success() {
        let policy = RetryPolicy::new(3);
        let result = policy.run(|_| async { Ok::<_, String>(7) }).await.unwrap();
        assert_eq!(result.value, 7);
        assert_eq!(result.retries(), 0);
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::new(3);
        let result = policy
            .run(|_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err(format!("boom {n}")) } else { Ok(n) } }
            })
            .await
            .unwrap();
        assert_eq!(result.value, 2);
        assert_eq!(result.attempts, 3);
    }

    #[tokio::test]
    async fn test_returns_last_error() {
        let policy = RetryPolicy::new(2);
        let err = policy
            .run(|attempt| async move { Err::<(), _>(format!("failure {attempt}")) })
            .await
            .unwrap_err();
        assert_eq!(err, "failure 2");
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy { max_attempts: 0 };
        let _ = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("nope") }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
