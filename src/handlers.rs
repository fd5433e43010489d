//! Request handlers: turn pipeline results and errors into client replies.
//!
//! Every reply is a [`PublishResponse`]; failures carry a stable error kind
//! plus whether the recovery worker will repair the publish on its own.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::PublishError;
use crate::model::{PublishRequest, PublishResult, Session};
use crate::publish::Publisher;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    /// True when the recovery worker has a repair job for this publish.
    pub recoverable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remix_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PublishResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl PublishResponse {
    fn failure(err: &PublishError) -> PublishResponse {
        PublishResponse {
            ok: false,
            publish_id: err.publish_id(),
            published_url: None,
            remix_url: None,
            result: None,
            error: Some(ErrorBody {
                kind: err.kind(),
                message: err.to_string(),
                recoverable: err.is_recoverable(),
            }),
        }
    }
}

/// Link others can follow to remix a published page.
fn remix_url(hostname: &str, publish_id: i64) -> String {
    format!("https://{hostname}/remix/{publish_id}")
}

#[instrument(skip_all)]
pub async fn handle_publish(
    publisher: &Publisher,
    session: Option<&Session>,
    req: &PublishRequest,
) -> PublishResponse {
    let Some(session) = session else {
        return PublishResponse::failure(&PublishError::AuthRequired);
    };

    match publisher.publish(session, req).await {
        Ok(result) => {
            info!(
                publish_id = result.publish_id,
                url = %result.published_url,
                "publish succeeded"
            );
            PublishResponse {
                ok: true,
                publish_id: Some(result.publish_id),
                published_url: Some(result.published_url.clone()),
                remix_url: Some(remix_url(
                    &publisher.config().hostname,
                    result.publish_id,
                )),
                result: Some(result),
                error: None,
            }
        }
        Err(err) => {
            warn!(kind = err.kind(), %err, "publish failed");
            PublishResponse::failure(&err)
        }
    }
}

#[instrument(skip_all)]
pub async fn handle_unpublish(
    publisher: &Publisher,
    session: Option<&Session>,
    publish_id: i64,
) -> PublishResponse {
    let Some(session) = session else {
        return PublishResponse::failure(&PublishError::AuthRequired);
    };

    match publisher.unpublish(session, publish_id).await {
        Ok(()) => PublishResponse {
            ok: true,
            publish_id: Some(publish_id),
            published_url: None,
            remix_url: None,
            result: None,
            error: None,
        },
        Err(err) => {
            warn!(kind = err.kind(), %err, "unpublish failed");
            PublishResponse::failure(&err)
        }
    }
}
