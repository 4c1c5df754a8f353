use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes prepared requests; wrappers layer authentication on top.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl HttpClient for Box<dyn HttpClient> {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        (**self).execute(req).await
    }
}
