use std::{fmt, future::Future, time::Duration};

/// Upper bound for a single language-model call.
pub const LLM_TIMEOUT: Duration = Duration::from_secs(10);

/// The bounded future did not finish in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed(Duration);

impl Elapsed {
    #[must_use]
    pub const fn duration(self) -> Duration {
        self.0
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timed out after {}ms", self.0.as_millis())
    }
}

impl std::error::Error for Elapsed {}

/// Race `future` against a timer.
///
/// When the timer fires first the future is dropped, which cancels any
/// in-flight request it owns.
pub async fn timebox<F: Future>(duration: Duration, future: F) -> Result<F::Output, Elapsed> {
    futures_lite::future::or(async { Ok(future.await) }, async {
        async_io::Timer::after(duration).await;
        Err(Elapsed(duration))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    use futures_lite::future::{block_on, pending};

    #[test]
    fn ready_future_wins() {
        let out = block_on(timebox(Duration::from_secs(5), async { 7 }));
        assert_eq!(out, Ok(7));
    }

    #[test]
    fn pending_future_times_out() {
        let limit = Duration::from_millis(20);
        let out = block_on(timebox(limit, pending::<()>()));
        assert_eq!(out, Err(Elapsed(limit)));
    }

    #[test]
    fn cancelled_future_is_dropped() {
        struct Flag(std::sync::Arc<std::sync::atomic::AtomicBool>);
        impl Drop for Flag {
            fn drop(&mut self) {
                self.0.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        }

        let dropped = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Flag(dropped.clone());
        let slow = async move {
            let _flag = flag;
            pending::<()>().await;
        };
        let out = block_on(timebox(Duration::from_millis(10), slow));
        assert!(out.is_err());
        assert!(dropped.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn elapsed_display() {
        assert_eq!(
            Elapsed(Duration::from_secs(10)).to_string(),
            "timed out after 10000ms"
        );
    }
}
