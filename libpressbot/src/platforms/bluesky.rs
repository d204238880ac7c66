//! Bluesky client implementation over AT Protocol XRPC

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};
use crate::platforms::SocialClient;
use crate::types::{ListMember, PostRecord};

/// Default Bluesky service (PDS entryway)
pub const DEFAULT_SERVICE: &str = "https://bsky.social";

const REPOST_COLLECTION: &str = "app.bsky.feed.repost";

/// Map an XRPC error response to PlatformError
///
/// Uses the HTTP status first and the AT Protocol error code second, keeping
/// the code and message in the resulting text.
///
/// # Arguments
///
/// * `status` - HTTP status of the response
/// * `body` - Decoded XRPC error body (may be empty)
/// * `context` - The operation context (e.g., "authentication", "repost")
fn map_xrpc_error(status: StatusCode, body: &XrpcErrorBody, context: &str) -> PlatformError {
    let code = body.error.as_deref().unwrap_or("Unknown");
    let detail = match &body.message {
        Some(message) => format!("{} ({}): {}", status, code, message),
        None => format!("{} ({})", status, code),
    };

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || matches!(
            code,
            "AuthenticationRequired" | "InvalidToken" | "ExpiredToken" | "AuthFactorTokenRequired"
        )
    {
        return PlatformError::Authentication(format!(
            "Bluesky authentication failed during {}: {}. Check BLUESKY_USERNAME and the app password.",
            context, detail
        ));
    }

    if status == StatusCode::TOO_MANY_REQUESTS || code == "RateLimitExceeded" {
        return PlatformError::RateLimit(format!(
            "Bluesky rate limit exceeded during {}: {}",
            context, detail
        ));
    }

    if status == StatusCode::BAD_REQUEST {
        return PlatformError::Validation(format!(
            "Bluesky rejected the request during {}: {}",
            context, detail
        ));
    }

    PlatformError::Api(format!("Bluesky operation failed during {}: {}", context, detail))
}

/// Map a transport-level failure (no XRPC response) to PlatformError
fn map_transport_error(error: reqwest::Error, context: &str) -> PlatformError {
    if error.is_decode() {
        return PlatformError::Api(format!(
            "Unexpected Bluesky response during {}: {}",
            context, error
        ));
    }

    PlatformError::Network(format!(
        "Network error while contacting Bluesky during {}: {}",
        context, error
    ))
}

#[derive(Debug, Default, Deserialize)]
struct XrpcErrorBody {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Serialize)]
struct CreateSessionInput<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionOutput {
    access_jwt: String,
    did: String,
}

#[derive(Deserialize)]
struct GetListOutput {
    #[serde(default)]
    items: Vec<ListItemView>,
}

#[derive(Deserialize)]
struct ListItemView {
    subject: ProfileView,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileView {
    handle: String,
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct GetAuthorFeedOutput {
    #[serde(default)]
    feed: Vec<FeedViewPost>,
}

#[derive(Deserialize)]
struct FeedViewPost {
    post: PostView,
}

#[derive(Deserialize)]
struct PostView {
    uri: String,
    cid: String,
    #[serde(default)]
    record: PostRecordData,
}

#[derive(Default, Deserialize)]
struct PostRecordData {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct CreateRecordInput<'a> {
    repo: &'a str,
    collection: &'a str,
    record: RepostRecord<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RepostRecord<'a> {
    #[serde(rename = "$type")]
    record_type: &'a str,
    subject: StrongRef<'a>,
    created_at: String,
}

#[derive(Serialize)]
struct StrongRef<'a> {
    uri: &'a str,
    cid: &'a str,
}

#[derive(Deserialize)]
struct CreateRecordOutput {
    uri: String,
}

impl From<GetListOutput> for Vec<ListMember> {
    fn from(output: GetListOutput) -> Self {
        output
            .items
            .into_iter()
            .map(|item| ListMember {
                handle: item.subject.handle,
                display_name: item.subject.display_name,
            })
            .collect()
    }
}

impl From<GetAuthorFeedOutput> for Vec<PostRecord> {
    fn from(output: GetAuthorFeedOutput) -> Self {
        output
            .feed
            .into_iter()
            .map(|item| PostRecord {
                uri: item.post.uri,
                cid: item.post.cid,
                text: item.post.record.text,
            })
            .collect()
    }
}

struct Session {
    access_jwt: SecretString,
    did: String,
}

pub struct BlueskyClient {
    http: Client,
    service: String,
    identifier: String,
    password: SecretString,
    session: Option<Session>,
}

impl BlueskyClient {
    /// Create a new Bluesky client
    ///
    /// # Arguments
    ///
    /// * `service` - Base URL of the service (e.g., "https://bsky.social")
    /// * `identifier` - The handle or email used to log in
    /// * `password` - The app password for authentication
    pub fn new(service: &str, identifier: String, password: SecretString) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("pressbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlatformError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            service: service.trim_end_matches('/').to_string(),
            identifier,
            password,
            session: None,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    fn endpoint(&self, nsid: &str) -> String {
        format!("{}/xrpc/{}", self.service, nsid)
    }

    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| PlatformError::Authentication("Not authenticated".to_string()).into())
    }

    /// Send a request and decode the JSON body, mapping XRPC errors
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, context: &str) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| map_transport_error(e, context))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<XrpcErrorBody>().await.unwrap_or_default();
            return Err(map_xrpc_error(status, &body, context).into());
        }

        let output = response
            .json::<T>()
            .await
            .map_err(|e| map_transport_error(e, context))?;
        Ok(output)
    }
}

#[async_trait]
impl SocialClient for BlueskyClient {
    async fn authenticate(&mut self) -> Result<()> {
        tracing::debug!("Creating Bluesky session for {}", self.identifier);

        let request = self
            .http
            .post(self.endpoint("com.atproto.server.createSession"))
            .json(&CreateSessionInput {
                identifier: &self.identifier,
                password: self.password.expose_secret(),
            });
        let output: CreateSessionOutput = self.send(request, "authentication").await?;

        self.session = Some(Session {
            access_jwt: SecretString::from(output.access_jwt),
            did: output.did,
        });
        tracing::info!("Authenticated successfully");

        Ok(())
    }

    async fn fetch_list_members(&self, list_uri: &str, limit: usize) -> Result<Vec<ListMember>> {
        let session = self.session()?;
        let limit = limit.to_string();

        let request = self
            .http
            .get(self.endpoint("app.bsky.graph.getList"))
            .query(&[("list", list_uri), ("limit", limit.as_str())])
            .bearer_auth(session.access_jwt.expose_secret());
        let output: GetListOutput = self.send(request, "list fetch").await?;

        Ok(output.into())
    }

    async fn fetch_recent_posts(&self, handle: &str, limit: usize) -> Result<Vec<PostRecord>> {
        let session = self.session()?;
        let limit = limit.to_string();

        let request = self
            .http
            .get(self.endpoint("app.bsky.feed.getAuthorFeed"))
            .query(&[("actor", handle), ("limit", limit.as_str())])
            .bearer_auth(session.access_jwt.expose_secret());
        let output: GetAuthorFeedOutput = self.send(request, "feed fetch").await?;

        Ok(output.into())
    }

    async fn repost(&self, uri: &str, cid: &str) -> Result<String> {
        let session = self.session()?;

        let input = CreateRecordInput {
            repo: &session.did,
            collection: REPOST_COLLECTION,
            record: RepostRecord {
                record_type: REPOST_COLLECTION,
                subject: StrongRef { uri, cid },
                created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            },
        };
        let request = self
            .http
            .post(self.endpoint("com.atproto.repo.createRecord"))
            .bearer_auth(session.access_jwt.expose_secret())
            .json(&input);
        let output: CreateRecordOutput = self.send(request, "repost").await?;

        tracing::debug!("Reposted {} as {}", uri, output.uri);
        Ok(output.uri)
    }

    fn name(&self) -> &str {
        "bluesky"
    }
}
