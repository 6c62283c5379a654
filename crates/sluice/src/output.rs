//! Output - prints what each component receives

use std::io::Write;

use anyhow::{Context, Result};
use sluice_model::{Payload, Record};
use tokio::sync::mpsc;

/// Format one delivered record as `[component] <record>`
///
/// Events print as compact JSON, raw records as (lossy) UTF-8.
pub fn format_record(component: &str, record: &Record) -> String {
    match record.payload() {
        Payload::Event(event) => format!("[{}] {}", component, event.to_json_string()),
        Payload::Raw(bytes) => format!("[{}] {}", component, String::from_utf8_lossy(bytes)),
    }
}

/// Print every batch a component receives until its channel closes
///
/// Returns the number of records printed.
pub async fn print_component(name: String, mut receiver: mpsc::Receiver<Vec<Record>>) -> Result<u64> {
    let mut printed = 0u64;

    while let Some(records) = receiver.recv().await {
        let mut chunk = String::new();
        for record in &records {
            chunk.push_str(&format_record(&name, record));
            chunk.push('\n');
        }

        // One locked write per batch keeps lines from different components whole
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(chunk.as_bytes())
            .and_then(|()| stdout.flush())
            .with_context(|| format!("failed to write output for {}", name))?;
        printed += records.len() as u64;
    }

    tracing::debug!(component = %name, records = printed, "component output closed");
    Ok(printed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sluice_model::{Bytes, Event};

    #[test]
    fn test_format_event() {
        let record = Record::from_event(Event::new("event", json!({"type": "A"})).unwrap());
        assert_eq!(format_record("alerts", &record), r#"[alerts] {"type":"A"}"#);
    }

    #[test]
    fn test_format_raw() {
        let record = Record::raw(Bytes::from_static(b"plain line"));
        assert_eq!(format_record("archive", &record), "[archive] plain line");
    }

    #[tokio::test]
    async fn test_print_component_counts() {
        let (tx, rx) = mpsc::channel(4);
        let printer = tokio::spawn(print_component("c".to_string(), rx));

        tx.send(vec![Record::raw(Bytes::from_static(b"a"))]).await.unwrap();
        tx.send(vec![
            Record::raw(Bytes::from_static(b"b")),
            Record::raw(Bytes::from_static(b"c")),
        ])
        .await
        .unwrap();
        drop(tx);

        assert_eq!(printer.await.unwrap().unwrap(), 3);
    }
}
