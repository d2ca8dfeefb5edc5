//! Chunked reader-to-writer copy with a byte ceiling.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{Budget, CopyError};

/// Size of the stack buffer used per read.
pub const CHUNK_SIZE: usize = 1024;

/// Copy `reader` into `writer`, failing once more than `max` bytes are seen.
///
/// Reads at most `CHUNK_SIZE` bytes at a time. When the budget is spent the
/// copier still reads once more to tell a source that ends exactly at the
/// limit from one that keeps going. Returns the number of bytes written.
pub async fn copy_max<R, W>(max: u64, writer: &mut W, reader: &mut R) -> Result<u64, CopyError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut budget = Budget::new(max);
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let want = budget.remaining().clamp(1, CHUNK_SIZE as u64) as usize;
        let n = reader.read(&mut buf[..want]).await?;
        if n == 0 {
            writer.flush().await?;
            return Ok(budget.used());
        }
        budget.consume(n as u64)?;
        writer.write_all(&buf[..n]).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copies_payload_within_limit() {
        let mut source: &[u8] = b"webhooks are pushy";
        let mut sink = Vec::new();

        let written = copy_max(64, &mut sink, &mut source).await.unwrap();

        assert_eq!(written, 18);
        assert_eq!(sink, b"webhooks are pushy");
    }

    #[tokio::test]
    async fn payload_of_exactly_max_succeeds() {
        let mut source: &[u8] = b"0123456789";
        let mut sink = Vec::new();

        let written = copy_max(10, &mut sink, &mut source).await.unwrap();

        assert_eq!(written, 10);
    }

    #[tokio::test]
    async fn oversized_payload_fails() {
        let mut source: &[u8] = b"0123456789A";
        let mut sink = Vec::new();

        let err = copy_max(10, &mut sink, &mut source).await.unwrap_err();

        assert!(matches!(err, CopyError::Exceeded { limit: 10 }));
        assert_eq!(sink.len(), 10);
    }

    #[tokio::test]
    async fn zero_limit_accepts_only_empty_source() {
        let mut empty: &[u8] = b"";
        let mut sink = Vec::new();
        assert_eq!(copy_max(0, &mut sink, &mut empty).await.unwrap(), 0);

        let mut one: &[u8] = b"x";
        assert!(copy_max(0, &mut sink, &mut one).await.is_err());
    }

    #[tokio::test]
    async fn large_source_is_copied_iteratively() {
        let payload = vec![7u8; CHUNK_SIZE * 4096 + 17];
        let mut source: &[u8] = &payload;
        let mut sink = Vec::with_capacity(payload.len());

        let written = copy_max(payload.len() as u64, &mut sink, &mut source)
            .await
            .unwrap();

        assert_eq!(written as usize, payload.len());
        assert_eq!(sink, payload);
    }
}
