use crate::domains::vote::repository::VoteStream;
use crate::domains::vote::types::VoteRecord;
use crate::errors::DomainError;
use async_trait::async_trait;
use futures::StreamExt;

/// Receiver side of a vote stream.
///
/// `drive` calls `on_row` once per vote, then exactly one of `on_complete`
/// or `on_error`.
#[async_trait]
pub trait VoteConsumer: Send {
    type Error: From<DomainError> + Send + Sync;

    async fn on_row(&mut self, vote: VoteRecord) -> Result<(), Self::Error>;

    async fn on_complete(&mut self) -> Result<(), Self::Error>;

    async fn on_error(&mut self, error: &Self::Error);
}

/// Pump every vote from `stream` into `consumer`, returning the row count.
///
/// The stream is dropped on return, which closes the underlying cursor
/// on every exit path.
pub async fn drive<C>(mut stream: VoteStream, consumer: &mut C) -> Result<u64, C::Error>
where
    C: VoteConsumer,
{
    let mut rows: u64 = 0;

    while let Some(item) = stream.next().await {
        let outcome = match item {
            Ok(vote) => consumer.on_row(vote).await,
            Err(e) => Err(C::Error::from(e)),
        };
        if let Err(e) = outcome {
            consumer.on_error(&e).await;
            return Err(e);
        }
        rows += 1;
    }

    consumer.on_complete().await?;
    Ok(rows)
}
