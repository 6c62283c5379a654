//! Input - JSON lines into record batches

use anyhow::{Context, Result, bail};
use sluice_model::{DEFAULT_EVENT_TYPE, Record};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Open the input source; `-` reads stdin
pub async fn open(input: &str) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }

    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("failed to open input {}", input))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Read lines into batches of up to `batch_size` records
///
/// Batches go to `senders` round-robin. Blank lines are skipped; a line
/// that is not a JSON object (including one that is not UTF-8) becomes a
/// raw record with its bytes unchanged. Returns the number of records read.
pub async fn forward<R>(
    mut reader: R,
    batch_size: usize,
    senders: &[mpsc::Sender<Vec<Record>>],
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    if senders.is_empty() {
        bail!("no stage workers to send input to");
    }

    let mut buf = Vec::new();
    let mut batch = Vec::with_capacity(batch_size);
    let mut next = 0;
    let mut total = 0;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .context("failed to read input")?;
        if read == 0 {
            break;
        }

        let line = strip_line_ending(&buf);
        if line.trim_ascii().is_empty() {
            continue;
        }

        batch.push(Record::from_bytes(DEFAULT_EVENT_TYPE, line.to_vec()));
        total += 1;

        if batch.len() >= batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            send(&senders[next % senders.len()], full).await?;
            next += 1;
        }
    }

    if !batch.is_empty() {
        send(&senders[next % senders.len()], batch).await?;
    }

    tracing::debug!(records = total, "input exhausted");
    Ok(total)
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

async fn send(sender: &mpsc::Sender<Vec<Record>>, batch: Vec<Record>) -> Result<()> {
    sender
        .send(batch)
        .await
        .map_err(|_| anyhow::anyhow!("stage input channel closed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::Receiver<Vec<Record>>) -> Vec<Vec<Record>> {
        let mut batches = Vec::new();
        while let Ok(batch) = rx.try_recv() {
            batches.push(batch);
        }
        batches
    }

    #[tokio::test]
    async fn test_forward_batches() {
        let input = b"{\"type\":\"A\"}\n{\"type\":\"B\"}\n\nnot json\n" as &[u8];
        let (tx, mut rx) = mpsc::channel(10);

        let total = forward(input, 2, &[tx]).await.unwrap();

        assert_eq!(total, 3);
        let batches = drain(&mut rx);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert!(batches[0][0].is_event());
        assert!(!batches[1][0].is_event());
        assert_eq!(batches[1][0].as_raw().unwrap().as_ref(), b"not json");
    }

    #[tokio::test]
    async fn test_forward_invalid_utf8_becomes_raw() {
        let input = b"{\"type\":\"A\"}\n\xff\xfe bytes\n{\"type\":\"B\"}\n" as &[u8];
        let (tx, mut rx) = mpsc::channel(10);

        let total = forward(input, 10, &[tx]).await.unwrap();

        assert_eq!(total, 3);
        let batches = drain(&mut rx);
        assert_eq!(batches.len(), 1);
        assert!(batches[0][0].is_event());
        assert_eq!(batches[0][1].as_raw().unwrap().as_ref(), b"\xff\xfe bytes");
        assert!(batches[0][2].is_event());
    }

    #[tokio::test]
    async fn test_forward_keeps_raw_whitespace() {
        let input = b"  indented text \r\n   \n{\"type\":\"A\"}" as &[u8];
        let (tx, mut rx) = mpsc::channel(10);

        let total = forward(input, 10, &[tx]).await.unwrap();

        assert_eq!(total, 2);
        let batches = drain(&mut rx);
        assert_eq!(batches[0][0].as_raw().unwrap().as_ref(), b"  indented text ");
        // Final line without a newline is still read
        assert!(batches[0][1].is_event());
    }

    #[tokio::test]
    async fn test_forward_round_robin() {
        let input = b"{}\n{}\n{}\n" as &[u8];
        let (tx1, mut rx1) = mpsc::channel(10);
        let (tx2, mut rx2) = mpsc::channel(10);

        forward(input, 1, &[tx1, tx2]).await.unwrap();

        assert_eq!(drain(&mut rx1).len(), 2);
        assert_eq!(drain(&mut rx2).len(), 1);
    }

    #[tokio::test]
    async fn test_forward_empty_input() {
        let (tx, mut rx) = mpsc::channel(10);
        assert_eq!(forward(b"" as &[u8], 10, &[tx]).await.unwrap(), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_forward_requires_senders() {
        assert!(forward(b"{}\n" as &[u8], 10, &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_forward_closed_channel() {
        let (tx, rx) = mpsc::channel(10);
        drop(rx);
        assert!(forward(b"{}\n" as &[u8], 1, &[tx]).await.is_err());
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let err = open("/definitely/not/here.jsonl").await.err().unwrap();
        assert!(err.to_string().contains("failed to open input"));
    }
}
