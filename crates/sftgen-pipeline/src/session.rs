//! Scoped ownership of the client's connection handle

use sftgen_llm::{LlmClient, LlmError};
use std::ops::Deref;
use tracing::debug;

/// Holds a client's connection open for the duration of a run.
///
/// The handle is opened on [`ClientSession::acquire`] and closed when the
/// session is dropped, on every exit path.
pub struct ClientSession<'a, C: LlmClient> {
    client: &'a mut C,
}

impl<'a, C: LlmClient> ClientSession<'a, C> {
    /// Open the client's connection (if needed) and hold it
    pub fn acquire(client: &'a mut C) -> Result<Self, LlmError> {
        client.open()?;
        debug!("Acquired connection for model {}", client.model_name());
        Ok(Self { client })
    }
}

impl<C: LlmClient> Deref for ClientSession<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.client
    }
}

impl<C: LlmClient> Drop for ClientSession<'_, C> {
    fn drop(&mut self) {
        self.client.close();
        debug!("Released connection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sftgen_llm::MockClient;

    #[tokio::test]
    async fn test_session_closes_on_drop() {
        let mut client = MockClient::new("hi");
        let probe = client.clone();
        client.close();

        {
            let session = ClientSession::acquire(&mut client).unwrap();
            assert!(session.is_open());
            assert_eq!(session.complete("s", "c").await.unwrap(), "hi");
        }

        assert!(!probe.is_open());
        assert_eq!(probe.open_count(), 1);
        assert_eq!(probe.close_count(), 2);
    }

    #[test]
    fn test_session_closes_on_early_return() {
        fn run(client: &mut MockClient) -> Result<(), LlmError> {
            let _session = ClientSession::acquire(client)?;
            Err(LlmError::Communication("bail".into()))
        }

        let mut client = MockClient::new("hi");
        let probe = client.clone();
        assert!(run(&mut client).is_err());
        assert!(!probe.is_open());
    }
}
