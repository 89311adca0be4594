//! Resolve on the first event matching a predicate.

use futures::{Stream, StreamExt, TryStreamExt};

use crate::error::{Error, Result};

/// Drive `events` until one satisfies `predicate` and return it.
///
/// The stream is dropped on return, which ends the subscription behind it.
/// A stream error is returned as is; a stream that ends without a match is
/// [`Error::Subscription`].
pub async fn first_match<S, T, F>(events: S, mut predicate: F) -> Result<T>
where
    S: Stream<Item = Result<T>>,
    F: FnMut(&T) -> bool,
{
    let matching = events.try_filter(|event| futures::future::ready(predicate(event)));
    futures::pin_mut!(matching);

    match matching.next().await {
        Some(event) => event,
        None => Err(Error::Subscription("stream ended before a matching event".into())),
    }
}
