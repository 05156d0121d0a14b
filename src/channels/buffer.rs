//! Buffered output for rendered answers
//!
//! Text between directives accumulates in the buffer. `$n` and queued sends
//! flush it as one trimmed message to the parent sink.

use crate::core::traits::OutputSink;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

pub struct MessageBuffer<'a> {
    parent: &'a dyn OutputSink,
    buffer: Mutex<String>,
}

impl<'a> MessageBuffer<'a> {
    pub fn new(parent: &'a dyn OutputSink) -> Self {
        Self {
            parent,
            buffer: Mutex::new(String::new()),
        }
    }

    pub fn write(&self, text: &str) {
        self.buffer.lock().unwrap().push_str(text);
    }

    pub async fn flush(&self) -> Result<()> {
        self.flush_with("").await
    }

    /// Flush whatever is left
    pub async fn end(&self) -> Result<()> {
        self.flush().await
    }

    async fn flush_with(&self, tail: &str) -> Result<()> {
        let message = {
            let mut buffer = self.buffer.lock().unwrap();
            let mut message = std::mem::take(&mut *buffer);
            message.push_str(tail);
            message
        };
        let message = message.trim();
        if message.is_empty() {
            return Ok(());
        }
        self.parent.send_queued(message.to_string()).await
    }
}

#[async_trait]
impl OutputSink for MessageBuffer<'_> {
    async fn send(&self, message: String) -> Result<()> {
        self.write(&message);
        Ok(())
    }

    async fn send_queued(&self, message: String) -> Result<()> {
        if message.is_empty() {
            return Ok(());
        }
        self.flush_with(&message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    #[async_trait]
    impl OutputSink for Collect {
        async fn send(&self, message: String) -> Result<()> {
            self.0.lock().unwrap().push(message);
            Ok(())
        }

        async fn send_queued(&self, message: String) -> Result<()> {
            self.send(message).await
        }
    }

    #[tokio::test]
    async fn test_send_appends_and_queued_flushes() {
        let parent = Collect::default();
        let buffer = MessageBuffer::new(&parent);
        buffer.write("1");
        buffer.send("hello".into()).await.unwrap();
        buffer.write("2 ");
        buffer.end().await.unwrap();

        buffer.write("1");
        buffer.send_queued("hello".into()).await.unwrap();
        buffer.write("2");
        buffer.end().await.unwrap();

        assert_eq!(*parent.0.lock().unwrap(), vec!["1hello2", "1hello", "2"]);
    }

    #[tokio::test]
    async fn test_empty_flush_sends_nothing() {
        let parent = Collect::default();
        let buffer = MessageBuffer::new(&parent);
        buffer.write("  ");
        buffer.flush().await.unwrap();
        buffer.send_queued(String::new()).await.unwrap();
        assert!(parent.0.lock().unwrap().is_empty());
    }
}
