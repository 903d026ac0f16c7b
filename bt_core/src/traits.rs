use async_trait::async_trait;

/// An external service that turns text into a dense vector.
///
/// Availability is probed lazily and remembered; `refresh` forces a new
/// probe. Implementations must be cheap to share across tasks.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Cached liveness of the provider.
    async fn is_available(&self) -> bool;

    /// Re-probe the provider and return the new liveness.
    async fn refresh(&self) -> bool;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error>;

    /// Model identifier used for requests.
    fn model(&self) -> &str;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Self::Error> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NeverError;

    impl std::fmt::Display for NeverError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "never")
        }
    }

    impl std::error::Error for NeverError {}

    struct LengthProvider;

    #[async_trait]
    impl EmbeddingProvider for LengthProvider {
        type Error = NeverError;

        async fn is_available(&self) -> bool {
            true
        }

        async fn refresh(&self) -> bool {
            true
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error> {
            Ok(vec![text.len() as f32, 1.0])
        }

        fn model(&self) -> &str {
            "length"
        }
    }

    #[tokio::test]
    async fn test_default_embed_batch_preserves_order() {
        let provider = LengthProvider;
        let texts = vec!["a".to_string(), "abc".to_string(), "ab".to_string()];
        let vectors = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0][0], 1.0);
        assert_eq!(vectors[1][0], 3.0);
        assert_eq!(vectors[2][0], 2.0);
    }
}
