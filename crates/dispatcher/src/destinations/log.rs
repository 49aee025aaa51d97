//! LogDestination - logs record summary via tracing

use contracts::{ContractError, Destination, Record};
use serde_json::Value;
use tracing::{info, instrument};

const PREVIEW_CHARS: usize = 120;

/// Destination that logs record summaries for debugging
pub struct LogDestination {
    name: String,
    logged: u64,
}

impl LogDestination {
    /// Create a new LogDestination with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logged: 0,
        }
    }

    fn log_record_summary(&self, record: &Record) {
        match serde_json::from_slice::<Value>(record.as_bytes()) {
            Ok(Value::Object(fields)) => {
                let field = |key: &str| fields.get(key).and_then(Value::as_str).unwrap_or("-");
                info!(
                    destination = %self.name,
                    host = field("host"),
                    short_message = field("short_message"),
                    len = record.len(),
                    "Record received"
                );
            }
            _ => {
                let text = record.to_lossy_str();
                let preview: String = text.chars().take(PREVIEW_CHARS).collect();
                info!(
                    destination = %self.name,
                    preview = %preview,
                    len = record.len(),
                    "Record received"
                );
            }
        }
    }
}

impl Destination for LogDestination {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_destination_send",
        skip(self, record),
        fields(destination = %self.name)
    )]
    async fn send(&mut self, record: &Record) -> Result<(), ContractError> {
        self.log_record_summary(record);
        self.logged += 1;
        Ok(())
    }

    #[instrument(name = "log_destination_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(destination = %self.name, logged = self.logged, "LogDestination closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn test_log_destination_summarises_json() {
        let mut destination = LogDestination::new("log://");
        let record = Record::from(r#"{"version":"1.1","host":"web-1","short_message":"disk full"}"#);

        destination.send(&record).await.unwrap();
        assert!(logs_contain("web-1"));
        assert!(logs_contain("disk full"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_log_destination_accepts_binary() {
        let mut destination = LogDestination::new("log://");
        let record = Record::from(vec![0x78, 0x9c, 0xff, 0x00]);

        assert!(destination.send(&record).await.is_ok());
        destination.close().await.unwrap();
        assert!(logs_contain("logged=1"));
    }

    #[tokio::test]
    async fn test_log_destination_name() {
        let destination = LogDestination::new("my_logger");
        assert_eq!(destination.name(), "my_logger");
    }
}
