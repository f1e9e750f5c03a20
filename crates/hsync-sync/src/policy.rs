use async_trait::async_trait;

/// Decides whether the engine may announce a document to a peer that did
/// not ask for it.
#[async_trait]
pub trait SharePolicy: Send + Sync {
    async fn should_share(&self, peer: &str, document_id: &str) -> bool;
}

/// Never share proactively. Peers only get documents whose id they already
/// know and request explicitly.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverShare;

#[async_trait]
impl SharePolicy for NeverShare {
    async fn should_share(&self, _peer: &str, _document_id: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn never_share_refuses_everything() {
        let policy = NeverShare;
        assert!(!policy.should_share("peer-a", "4NMNnkMhL8jXrdJ9jamS58PAVdXu").await);
        assert!(!policy.should_share("", "").await);
    }
}
