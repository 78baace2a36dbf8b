use super::{
    EvolveReport, Island, IslandApi, IslandError, MigrantEnvelope, MigrantSet, StatusReport,
};
use futures::{future::BoxFuture, FutureExt};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Talks to islands over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpIslandClient {
    http: Client,
    init_timeout: Duration,
}

impl HttpIslandClient {
    /// `call_timeout` bounds every request; init requests use the shorter
    /// `init_timeout` so an unreachable island is retried promptly.
    pub fn new(call_timeout: Duration, init_timeout: Duration) -> Result<Self, IslandError> {
        let http = Client::builder().timeout(call_timeout).build()?;
        Ok(HttpIslandClient { http, init_timeout })
    }
}

fn check_status(response: Response) -> Result<Response, IslandError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(IslandError::Status {
            code: status.as_u16(),
        })
    }
}

// Body is read whole so that a bad payload surfaces as `Decode`, not `Transport`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, IslandError> {
    let body = check_status(response)?.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

impl IslandApi for HttpIslandClient {
    fn init<'a>(&'a self, island: &'a Island) -> BoxFuture<'a, Result<(), IslandError>> {
        async move {
            let response = self
                .http
                .post(island.endpoint("init"))
                .timeout(self.init_timeout)
                .send()
                .await?;
            check_status(response)?;
            Ok(())
        }
        .boxed()
    }

    fn evolve<'a>(
        &'a self,
        island: &'a Island,
        generations: usize,
    ) -> BoxFuture<'a, Result<EvolveReport, IslandError>> {
        async move {
            let response = self
                .http
                .post(island.endpoint("evolve"))
                .query(&[("generations", generations)])
                .send()
                .await?;
            decode(response).await
        }
        .boxed()
    }

    fn pull_migrants<'a>(
        &'a self,
        island: &'a Island,
    ) -> BoxFuture<'a, Result<MigrantSet, IslandError>> {
        async move {
            let response = self.http.get(island.endpoint("migrants")).send().await?;
            let envelope: MigrantEnvelope = decode(response).await?;
            Ok(MigrantSet::try_from(envelope)?)
        }
        .boxed()
    }

    fn push_migrants<'a>(
        &'a self,
        island: &'a Island,
        migrants: &'a MigrantSet,
    ) -> BoxFuture<'a, Result<(), IslandError>> {
        async move {
            let response = self
                .http
                .post(island.endpoint("migrants"))
                .json(migrants)
                .send()
                .await?;
            check_status(response)?;
            Ok(())
        }
        .boxed()
    }

    fn status<'a>(
        &'a self,
        island: &'a Island,
    ) -> BoxFuture<'a, Result<StatusReport, IslandError>> {
        async move {
            let response = self.http.get(island.endpoint("status")).send().await?;
            decode(response).await
        }
        .boxed()
    }
}
