//! Bridge from the blocking workflow runner to the async HTTP client.
//!
//! Steps run strictly one after another, so the transport exposes a blocking
//! surface and hands each request future to [`block_on_future`].

use anyhow::{Context, Result, anyhow};
use std::{future::Future, thread};
use tokio::runtime::{Builder, Handle, RuntimeFlavor};

/// Drive `future` to completion from synchronous code.
///
/// Inside a multi-thread runtime the current worker is parked with
/// `block_in_place`. A current-thread runtime cannot be blocked that way, so the
/// future moves to a helper thread with its own runtime. Outside Tokio a
/// throwaway current-thread runtime is built on the calling thread.
pub fn block_on_future<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(future))
        }
        Ok(_) => thread::spawn(move || run_on_fresh_runtime(future))
            .join()
            .map_err(|_| anyhow!("request thread panicked"))?,
        Err(_) => run_on_fresh_runtime(future),
    }
}

fn run_on_fresh_runtime<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build request runtime")?
        .block_on(future)
}

#[cfg(test)]
mod tests {
    use super::block_on_future;

    #[test]
    fn runs_future_without_ambient_runtime() {
        let value = block_on_future(async { Ok::<_, anyhow::Error>(21 * 2) }).expect("future result");
        assert_eq!(value, 42);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reuses_ambient_multi_thread_runtime() {
        let value = block_on_future(async {
            tokio::task::yield_now().await;
            Ok::<_, anyhow::Error>("done")
        })
        .expect("future result");
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn current_thread_runtime_uses_helper_thread() {
        let value = block_on_future(async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            Ok::<_, anyhow::Error>("slept")
        })
        .expect("future result");
        assert_eq!(value, "slept");
    }

    #[test]
    fn propagates_future_errors() {
        let error = block_on_future(async { Err::<(), _>(anyhow::anyhow!("boom")) }).expect_err("error");
        assert_eq!(error.to_string(), "boom");
    }
}
