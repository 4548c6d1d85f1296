use crate::error::Error;
use tracing::{debug, warn};

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` attempts have been made. There is no delay between
/// attempts. The final error is returned unchanged.
pub(crate) fn with_retries<T, F>(max_attempts: usize, mut attempt: F) -> Result<T, Error>
where
    F: FnMut(usize) -> Result<T, Error>,
{
    let max_attempts = max_attempts.max(1);
    let mut number = 1;

    loop {
        debug!(attempt = number, max_attempts, "starting attempt");
        match attempt(number) {
            Ok(value) => return Ok(value),
            Err(error) if number < max_attempts && error.is_retryable() => {
                warn!(attempt = number, max_attempts, %error, "attempt failed, retrying");
                number += 1;
            }
            Err(error) => {
                warn!(attempt = number, max_attempts, %error, "giving up");
                return Err(error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProtocolError, ResolutionError};
    use std::io;

    #[test]
    fn returns_first_success() {
        let mut calls = 0;
        let result = with_retries(3, |n| {
            calls += 1;
            if n < 2 {
                Err(io::Error::from(io::ErrorKind::ConnectionReset).into())
            } else {
                Ok(n)
            }
        });
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls, 2);
    }

    #[test]
    fn returns_last_error_after_budget() {
        let mut calls = 0;
        let result: Result<(), _> = with_retries(3, |n| {
            calls += 1;
            Err(ProtocolError::TokenMismatch {
                expected: n as i64,
                received: 0,
            }
            .into())
        });
        assert_eq!(calls, 3);
        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::TokenMismatch { expected: 3, .. }))
        ));
    }

    #[test]
    fn resolution_errors_are_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = with_retries(3, |_| {
            calls += 1;
            Err(ResolutionError::NoRecords.into())
        });
        assert_eq!(calls, 1);
        assert!(result.is_err());
    }

    #[test]
    fn zero_budget_still_attempts_once() {
        let mut calls = 0;
        let _ = with_retries(0, |_| {
            calls += 1;
            Ok::<_, Error>(())
        });
        assert_eq!(calls, 1);
    }
}
