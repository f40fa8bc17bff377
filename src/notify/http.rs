use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::{Delivery, Notifier};

#[derive(Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Sends through a JSON email API (`POST {from, to, subject, html}` with a bearer key).
#[derive(Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl HttpNotifier {
    pub fn new(endpoint: &str, api_key: &str, from: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Delivery {
        let body = OutgoingEmail {
            from: &self.from,
            to: [to],
            subject,
            html,
        };

        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Delivery::failed(format!("Email API request failed: {e}")),
        };

        let status = response.status();
        if status.is_success() {
            Delivery::sent()
        } else {
            let detail = response.text().await.unwrap_or_default();
            Delivery::failed(format!("Email API returned HTTP {status}: {detail}"))
        }
    }
}
