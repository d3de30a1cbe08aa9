//! Bitbucket Server transport client (reqwest-based).
//!
//! Builds authenticated JSON requests against `<base>/rest/api/1.0/`,
//! executes them under a cancellation token and classifies the outcome
//! into [`ClientError`].
//!
//! API docs: <https://developer.atlassian.com/server/bitbucket/rest/v805/intro/>

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Body, Method, Request, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::connection::ConnectionSettings;
use crate::error::{ClientError, ClientResult};
use crate::tls::TrustRoots;

/// Fixed API prefix appended to every base URL.
pub const API_PATH: &str = "/rest/api/1.0/";

const JSON_MEDIA_TYPE: &str = "application/json";

/// HTTP client bound to one Bitbucket Server.
///
/// Cheap to clone; all state is read-only after construction and safe to
/// share between concurrent requests.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    /// Applied last on every request, replacing any default of the same name.
    headers: HeaderMap,
}

/// Status and body of a completed exchange.
#[derive(Debug)]
pub struct RawResponse {
    pub url: String,
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl Client {
    /// Build a client without contacting the server.
    ///
    /// Use [`Client::connect`] to also run the liveness check.
    pub fn new(settings: &ConnectionSettings) -> ClientResult<Self> {
        let builder = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("bbsync/", env!("CARGO_PKG_VERSION")));
        let builder = TrustRoots::load(settings.ca_cert_path.as_deref()).apply(builder);
        let http = builder.build()?;

        Self::with_http_client(&settings.base_url, &settings.token, http)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_http_client(base_url: &str, token: &str, http: reqwest::Client) -> ClientResult<Self> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
            headers: auth_headers(token)?,
        })
    }

    /// Build a client and verify that it can talk to the server.
    pub async fn connect(
        settings: &ConnectionSettings,
        cancel: &CancellationToken,
    ) -> ClientResult<Self> {
        let client = Self::new(settings)?;
        if let Err(e) = client.ping(cancel).await {
            tracing::error!(base_url = %client.base_url, error = %e, "Bitbucket liveness check failed");
            return Err(e);
        }
        tracing::info!(base_url = %client.base_url, "connected to Bitbucket Server");
        Ok(client)
    }

    /// The normalized base URL, including the API prefix.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Liveness check: list the top-level project collection.
    pub async fn ping(&self, cancel: &CancellationToken) -> ClientResult<()> {
        let request = self.request(Method::GET, &["projects"], &[], None::<&()>)?;
        self.execute(request, cancel).await
    }

    /// Resolve path segments against the base URL, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Build an authenticated request.
    ///
    /// GET requests never carry a body. Other methods carry the JSON encoding
    /// of `body`, or an empty payload when it is `None`.
    pub fn request<B>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> ClientResult<Request>
    where
        B: Serialize + ?Sized,
    {
        let mut url = self.endpoint(segments)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let is_get = method == Method::GET;
        let mut request = Request::new(method, url);
        request
            .headers_mut()
            .insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));

        if !is_get {
            let payload = match body {
                Some(body) => serde_json::to_vec(body).map_err(ClientError::Encode)?,
                None => Vec::new(),
            };
            request
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
            *request.body_mut() = Some(Body::from(payload));
        }

        for (name, value) in &self.headers {
            request.headers_mut().insert(name.clone(), value.clone());
        }

        Ok(request)
    }

    /// Execute a request and decode the JSON response body into `T`.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> ClientResult<T> {
        let response = self.send(request, cancel).await?;
        decode_response(&response.url, response.status, &response.body)?
            .ok_or(ClientError::EmptyBody { url: response.url })
    }

    /// Execute a request whose response body is not needed.
    pub async fn execute(&self, request: Request, cancel: &CancellationToken) -> ClientResult<()> {
        let response = self.send(request, cancel).await?;
        check_status(&response.url, response.status)
    }

    /// Perform the HTTP exchange, racing it against `cancel`.
    pub async fn send(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> ClientResult<RawResponse> {
        let url = request.url().to_string();
        let method = request.method().clone();
        tracing::debug!(%method, %url, "Bitbucket request");

        let exchange = async {
            let response = self.http.execute(request).await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, ClientError>((status, body.to_vec()))
        };

        let (status, body) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(%method, %url, "Bitbucket request cancelled");
                return Err(ClientError::Cancelled);
            }
            result = exchange => result?,
        };

        tracing::debug!(%method, %url, status = status.as_u16(), "Bitbucket response");
        Ok(RawResponse { url, status, body })
    }
}

/// Classify a status code, ignoring the body.
pub fn check_status(url: &str, status: StatusCode) -> ClientResult<()> {
    match ClientError::from_status(url, status) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Classify a status code and decode the body.
///
/// Returns `Ok(None)` for 204 responses, where no decoding is attempted.
pub fn decode_response<T: DeserializeOwned>(
    url: &str,
    status: StatusCode,
    body: &[u8],
) -> ClientResult<Option<T>> {
    check_status(url, status)?;
    if status == StatusCode::NO_CONTENT {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ClientError::from_decode(url, e))
}

fn normalize_base_url(base_url: &str) -> ClientResult<Url> {
    let joined = format!("{}{}", base_url.trim_end_matches('/'), API_PATH);
    let url = Url::parse(&joined).map_err(|e| ClientError::InvalidUrl(format!("{joined}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidUrl(format!("{joined} cannot be a base")));
    }
    Ok(url)
}

fn auth_headers(token: &str) -> ClientResult<HeaderMap> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| ClientError::InvalidHeader("bearer token contains invalid characters".into()))?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}
