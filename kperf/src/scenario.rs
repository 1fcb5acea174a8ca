use typed_builder::TypedBuilder;

use crate::{
    aggregate::Aggregate,
    executor::Executor,
    http::{Connector, HttpClient, HttpVersion},
    metric::Sample,
    shutdown::Shutdown,
    BoxError,
};

/// What is being measured, glued to the executor that runs it.
///
/// Every worker of the executor gets its own [`HttpClient`] built from these
/// settings through [`Scenario::client`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct Scenario<E> {
    #[builder(setter(into))]
    pub name: String,
    /// Target URL as typed by the user. A missing scheme means `https`.
    #[builder(setter(into))]
    pub url: String,
    #[builder(default)]
    pub version: HttpVersion,
    /// Log failed attempts as they happen.
    #[builder(default)]
    pub verbose: bool,
    /// Carry response bodies into the samples.
    #[builder(default)]
    pub keep_body: bool,
    /// Carry raw request and response heads into the samples.
    #[builder(default)]
    pub capture_heads: bool,
    #[builder(default = Shutdown::never())]
    pub shutdown: Shutdown,
    #[builder(default)]
    pub connector: Connector,
    pub executor: E,
}

impl<E> Scenario<E> {
    pub async fn run<A>(&self) -> Result<A, BoxError>
    where
        E: Executor<A>,
        A: Aggregate<Metric = Sample>,
    {
        self.executor.exec(self).await
    }

    /// A fresh client, not yet connected.
    pub fn client(&self) -> HttpClient {
        HttpClient::builder()
            .version(self.version)
            .capture_heads(self.capture_heads)
            .connector(self.connector.clone())
            .shutdown(self.shutdown.clone())
            .build()
    }
}
