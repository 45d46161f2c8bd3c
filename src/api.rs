// Graph API client: a small blocking HTTP client for the handful of
// endpoints needed to authenticate and publish a Reel.

use std::fs::File;
use std::path::Path;

use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{AppCredentials, Config};
use crate::error::{RepostError, Result};
use crate::session::TokenData;

/// Permissions requested during the OAuth dialog.
pub const SCOPES: [&str; 4] = [
    "instagram_basic",
    "instagram_content_publish",
    "pages_read_engagement",
    "pages_show_list",
];

const OAUTH_STATE: &str = "instagram_repost_auth";

/// Graph API endpoints used for login and publishing.
pub trait GraphApi {
    /// URL of the Facebook login dialog the user has to open in a browser.
    fn authorization_url(&self, app: &AppCredentials) -> Result<Url>;

    /// Trade the code from the redirect URL for an access token, upgraded
    /// to a long-lived one when possible.
    fn exchange_code(&self, app: &AppCredentials, code: &str) -> Result<TokenData>;

    fn verify_token(&self, access_token: &str) -> Result<()>;

    fn instagram_account(&self, access_token: &str, ig_user_id: &str) -> Result<InstagramAccount>;

    fn instagram_accounts(&self, access_token: &str) -> Result<Vec<InstagramAccount>>;

    fn create_reel_container(&self, access_token: &str, ig_user_id: &str, caption: &str) -> Result<String>;

    fn upload_video(&self, access_token: &str, container_id: &str, video: &Path) -> Result<()>;

    fn container_status(&self, access_token: &str, container_id: &str) -> Result<ContainerStatus>;

    fn publish_container(&self, access_token: &str, ig_user_id: &str, container_id: &str) -> Result<String>;
}

/// Whether the Graph API refused the credentials themselves, as opposed to
/// a transport failure or a server-side error.
pub fn is_credential_rejection(err: &RepostError) -> bool {
    matches!(err, RepostError::Graph { status: 400 | 401 | 403, .. })
}

/// Blocking client that holds the reqwest client and the base URLs of the
/// Graph API and the resumable upload host.
#[derive(Clone)]
pub struct GraphClient {
    client: Client,
    graph_base: String,
    upload_base: String,
    version: String,
}

/// Instagram business account linked to a Facebook page.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InstagramAccount {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Page {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    instagram_business_account: Option<InstagramAccount>,
}

#[derive(Deserialize, Debug)]
struct Paged<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Deserialize, Debug)]
struct IdResponse {
    id: String,
}

/// Processing state of a media container.
#[derive(Deserialize, Debug, Clone)]
pub struct ContainerStatus {
    #[serde(default)]
    pub status_code: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GraphErrorBody {
    error: GraphErrorDetail,
}

#[derive(Deserialize, Debug)]
struct GraphErrorDetail {
    message: String,
}

impl GraphClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(GraphClient {
            client,
            graph_base: config.graph_api_base.clone(),
            upload_base: config.upload_base.clone(),
            version: config.graph_api_version.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.graph_base, self.version, path.trim_start_matches('/'))
    }

    fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let res = req.send()?;
        parse_response(res)
    }
}

impl GraphApi for GraphClient {
    fn authorization_url(&self, app: &AppCredentials) -> Result<Url> {
        let base = format!("https://www.facebook.com/{}/dialog/oauth", self.version);
        let scope = SCOPES.join(",");
        Url::parse_with_params(
            &base,
            &[
                ("client_id", app.app_id.as_str()),
                ("redirect_uri", app.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("response_type", "code"),
                ("state", OAUTH_STATE),
            ],
        )
        .map_err(|e| RepostError::Auth(format!("could not build authorization URL: {}", e)))
    }

    // The short-lived token is kept if the long-lived upgrade fails.
    fn exchange_code(&self, app: &AppCredentials, code: &str) -> Result<TokenData> {
        let url = self.url("oauth/access_token");
        let short: TokenData = self.send(self.client.get(&url).query(&[
            ("client_id", app.app_id.as_str()),
            ("client_secret", app.app_secret.as_str()),
            ("redirect_uri", app.redirect_uri.as_str()),
            ("code", code.trim()),
        ]))?;

        let long = self.send::<TokenData>(self.client.get(&url).query(&[
            ("grant_type", "fb_exchange_token"),
            ("client_id", app.app_id.as_str()),
            ("client_secret", app.app_secret.as_str()),
            ("fb_exchange_token", short.access_token.as_str()),
        ]));
        match long {
            Ok(token) => Ok(token),
            Err(e) => {
                warn!("Could not get long-lived token, keeping short-lived one: {}", e);
                Ok(short)
            }
        }
    }

    /// Cheap call used to check that a stored token still works.
    fn verify_token(&self, access_token: &str) -> Result<()> {
        let _: serde_json::Value = self.send(
            self.client
                .get(self.url("me"))
                .query(&[("access_token", access_token)]),
        )?;
        Ok(())
    }

    /// Fetch a business account by id, which also checks the token can see it.
    fn instagram_account(&self, access_token: &str, ig_user_id: &str) -> Result<InstagramAccount> {
        self.send(self.client.get(self.url(ig_user_id)).query(&[
            ("fields", "id,username"),
            ("access_token", access_token),
        ]))
    }

    /// Instagram business accounts linked to the pages the user manages.
    fn instagram_accounts(&self, access_token: &str) -> Result<Vec<InstagramAccount>> {
        let pages: Paged<Page> = self.send(self.client.get(self.url("me/accounts")).query(&[
            ("fields", "name,instagram_business_account{id,username}"),
            ("access_token", access_token),
        ]))?;
        Ok(pages
            .data
            .into_iter()
            .filter_map(|page| {
                if page.instagram_business_account.is_none() {
                    debug!("Page {:?} has no Instagram account", page.name);
                }
                page.instagram_business_account
            })
            .collect())
    }

    /// Create a resumable REELS container and return its id.
    fn create_reel_container(&self, access_token: &str, ig_user_id: &str, caption: &str) -> Result<String> {
        let resp: IdResponse = self.send(self.client.post(self.url(&format!("{}/media", ig_user_id))).form(&[
            ("media_type", "REELS"),
            ("upload_type", "resumable"),
            ("caption", caption),
            ("access_token", access_token),
        ]))?;
        Ok(resp.id)
    }

    /// Send the video bytes for a resumable container in one request.
    fn upload_video(&self, access_token: &str, container_id: &str, video: &Path) -> Result<()> {
        let url = format!("{}/ig-api-upload/{}/{}", self.upload_base, self.version, container_id);
        let file = File::open(video)?;
        let size = file.metadata()?.len();

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("OAuth {}", access_token))
            .map_err(|_| RepostError::Auth("access token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert("offset", HeaderValue::from_static("0"));
        headers.insert("file_size", HeaderValue::from(size));

        debug!("Uploading {} bytes to {}", size, url);
        let _: serde_json::Value = self.send(
            self.client
                .post(&url)
                .headers(headers)
                .body(Body::sized(file, size)),
        )?;
        Ok(())
    }

    fn container_status(&self, access_token: &str, container_id: &str) -> Result<ContainerStatus> {
        self.send(self.client.get(self.url(container_id)).query(&[
            ("fields", "status_code,status"),
            ("access_token", access_token),
        ]))
    }

    /// Publish a finished container. Returns the new media id.
    fn publish_container(&self, access_token: &str, ig_user_id: &str, container_id: &str) -> Result<String> {
        let resp: IdResponse = self.send(
            self.client
                .post(self.url(&format!("{}/media_publish", ig_user_id)))
                .form(&[("creation_id", container_id), ("access_token", access_token)]),
        )?;
        Ok(resp.id)
    }
}

fn parse_response<T: DeserializeOwned>(res: Response) -> Result<T> {
    let status = res.status();
    let txt = res.text().unwrap_or_default();
    if !status.is_success() {
        return Err(RepostError::Graph {
            status: status.as_u16(),
            message: graph_error_message(&txt),
        });
    }
    Ok(serde_json::from_str(&txt)?)
}

/// Pull `error.message` out of a Graph error body, falling back to the raw
/// text for anything else.
pub fn graph_error_message(body: &str) -> String {
    match serde_json::from_str::<GraphErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.trim().is_empty() => "empty response".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GraphClient {
        let config = Config::from_lookup(|_| None).unwrap();
        GraphClient::from_config(&config).unwrap()
    }

    #[test]
    fn authorization_url_carries_app_and_scopes() {
        let app = AppCredentials {
            app_id: "123".into(),
            app_secret: "secret".into(),
            redirect_uri: "https://example.com/auth/callback".into(),
        };
        let url = client().authorization_url(&app).unwrap();
        assert_eq!(url.path(), "/v18.0/dialog/oauth");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".into(), "123".into())));
        assert!(pairs.contains(&("redirect_uri".into(), "https://example.com/auth/callback".into())));
        assert!(pairs.contains(&("scope".into(), SCOPES.join(","))));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(!url.as_str().contains("secret"));
    }

    #[test]
    fn endpoint_urls_include_version() {
        assert_eq!(
            client().url("/17841/media"),
            "https://graph.facebook.com/v18.0/17841/media"
        );
    }

    #[test]
    fn only_client_errors_reject_credentials() {
        let graph = |status| RepostError::Graph { status, message: "x".into() };
        assert!(is_credential_rejection(&graph(400)));
        assert!(is_credential_rejection(&graph(401)));
        assert!(is_credential_rejection(&graph(403)));
        assert!(!is_credential_rejection(&graph(500)));
        assert!(!is_credential_rejection(&graph(503)));
        assert!(!is_credential_rejection(&RepostError::Auth("x".into())));
    }

    #[test]
    fn graph_error_messages() {
        let body = r#"{"error":{"message":"Invalid OAuth access token.","type":"OAuthException","code":190}}"#;
        assert_eq!(graph_error_message(body), "Invalid OAuth access token.");
        assert_eq!(graph_error_message("  Bad Gateway "), "Bad Gateway");
        assert_eq!(graph_error_message(""), "empty response");
    }

    #[test]
    fn pages_without_instagram_accounts_parse() {
        let body = r#"{"data":[{"id":"1","name":"Shop"},{"id":"2","name":"Blog","instagram_business_account":{"id":"178","username":"blog"}}]}"#;
        let pages: Paged<Page> = serde_json::from_str(body).unwrap();
        let accounts: Vec<_> = pages.data.into_iter().filter_map(|p| p.instagram_business_account).collect();
        assert_eq!(
            accounts,
            vec![InstagramAccount { id: "178".into(), username: Some("blog".into()) }]
        );
    }
}
