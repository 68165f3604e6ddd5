//! Blocking client for the Pocket v3 API.
//!
//! Every endpoint is a JSON POST; `X-Accept: application/json` makes the
//! OAuth endpoints answer in JSON instead of form encoding. Failures come
//! back as a non-2xx status with the details in `X-Error-Code`/`X-Error`.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use reqwest::blocking::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::{self, DeserializeOwned, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PocketError, Result};
use crate::models::{Action, Article, ArticleId};

pub const API_BASE: &str = "https://getpocket.com/v3";
pub const AUTHORIZE_URL: &str = "https://getpocket.com/auth/authorize";

/// The operations the deduplication pass needs from a saved-items service.
#[cfg_attr(test, mockall::automock)]
pub trait ReadingList {
    fn retrieve(&mut self, filter: &RetrieveFilter) -> Result<Vec<Article>>;

    /// Queues locally; nothing is sent until `commit`.
    fn queue_delete(&mut self, id: ArticleId);

    fn commit(&mut self) -> Result<SendResponse>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Unread,
    Archive,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    Newest,
    Oldest,
    Title,
    Site,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailType {
    Simple,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetrieveFilter {
    pub state: State,
    pub sort: Sort,
    #[serde(rename = "detailType")]
    pub detail_type: DetailType,
}

impl Default for RetrieveFilter {
    /// Everything, oldest first, so the earliest copy of a duplicate is kept.
    fn default() -> Self {
        RetrieveFilter {
            state: State::All,
            sort: Sort::Oldest,
            detail_type: DetailType::Simple,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken(pub String);

#[derive(Serialize)]
struct RequestTokenBody<'a> {
    consumer_key: &'a str,
    redirect_uri: &'a str,
}

#[derive(Deserialize)]
struct RequestTokenReply {
    code: String,
}

#[derive(Serialize)]
struct AuthorizeBody<'a> {
    consumer_key: &'a str,
    code: &'a str,
}

#[derive(Deserialize)]
struct AuthorizeReply {
    access_token: String,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Serialize)]
struct GetBody<'a> {
    consumer_key: &'a str,
    access_token: &'a str,
    #[serde(flatten)]
    filter: &'a RetrieveFilter,
}

#[derive(Serialize)]
struct SendBody<'a> {
    consumer_key: &'a str,
    access_token: &'a str,
    actions: &'a [Action],
}

#[derive(Debug, Deserialize)]
struct PocketItem {
    item_id: ArticleId,
    #[serde(default)]
    given_url: String,
    #[serde(default)]
    resolved_url: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    sort_id: Option<u64>,
}

impl PocketItem {
    fn into_article(self) -> Article {
        // items saved through some integrations only carry the resolved url
        let url = match (self.given_url.is_empty(), self.resolved_url) {
            (true, Some(resolved)) => resolved,
            (_, _) => self.given_url,
        };
        Article { id: self.item_id, url }
    }
}

#[derive(Debug, Deserialize)]
struct GetReply {
    #[serde(default)]
    list: ItemList,
}

/// `list` is an object keyed by item id in the requested order, or `[]`
/// when the account has no items.
#[derive(Debug, Default)]
struct ItemList(Vec<PocketItem>);

impl<'de> Deserialize<'de> for ItemList {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ItemListVisitor;

        impl<'de> Visitor<'de> for ItemListVisitor {
            type Value = ItemList;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of items keyed by id or an array of items")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<ItemList, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut items = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((_, item)) = map.next_entry::<de::IgnoredAny, PocketItem>()? {
                    items.push(item);
                }
                Ok(ItemList(items))
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<ItemList, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(item) = seq.next_element::<PocketItem>()? {
                    items.push(item);
                }
                Ok(ItemList(items))
            }

            fn visit_unit<E>(self) -> std::result::Result<ItemList, E>
            where
                E: de::Error,
            {
                Ok(ItemList::default())
            }
        }

        deserializer.deserialize_any(ItemListVisitor)
    }
}

fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s.parse().map(Some).map_err(de::Error::custom),
    }
}

fn parse_items(body: &[u8]) -> Result<Vec<Article>> {
    let reply: GetReply = serde_json::from_slice(body).map_err(|source| PocketError::Decode {
        endpoint: "get",
        source,
    })?;
    let mut items = reply.list.0;
    if items.iter().all(|item| item.sort_id.is_some()) {
        items.sort_by_key(|item| item.sort_id);
    }
    Ok(items.into_iter().map(PocketItem::into_article).collect())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub action_results: Vec<serde_json::Value>,
}

impl SendResponse {
    pub fn succeeded(&self) -> usize {
        self.action_results
            .iter()
            .filter(|result| !matches!(result, serde_json::Value::Bool(false)))
            .count()
    }
}

impl fmt::Display for SendResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status {}, {}/{} actions succeeded",
            self.status,
            self.succeeded(),
            self.action_results.len(),
        )
    }
}

fn header(response: &reqwest::blocking::Response, name: &str) -> String {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn post_raw<B: Serialize>(
    http: &Client,
    base_url: &str,
    endpoint: &'static str,
    body: &B,
) -> Result<Vec<u8>> {
    let url = format!("{}/{}", base_url.trim_end_matches('/'), endpoint);
    tracing::debug!(%url, "POST");
    let response = http
        .post(&url)
        .header("X-Accept", "application/json")
        .json(body)
        .send()
        .map_err(|source| PocketError::Http { endpoint, source })?;

    let status = response.status();
    if !status.is_success() {
        return Err(PocketError::Api {
            endpoint,
            status: status.as_u16(),
            code: header(&response, "X-Error-Code"),
            message: header(&response, "X-Error"),
        });
    }

    let bytes = response
        .bytes()
        .map_err(|source| PocketError::Http { endpoint, source })?;
    Ok(bytes.to_vec())
}

fn post<B: Serialize, R: DeserializeOwned>(
    http: &Client,
    base_url: &str,
    endpoint: &'static str,
    body: &B,
) -> Result<R> {
    let bytes = post_raw(http, base_url, endpoint, body)?;
    serde_json::from_slice(&bytes).map_err(|source| PocketError::Decode { endpoint, source })
}

pub fn auth_url(token: &RequestToken, redirect_uri: &str) -> Result<Url> {
    let url = Url::parse_with_params(
        AUTHORIZE_URL,
        &[("request_token", token.0.as_str()), ("redirect_uri", redirect_uri)],
    )?;
    Ok(url)
}

/// The unauthenticated half of the API: the OAuth handshake.
pub struct Authorizer {
    http: Client,
    base_url: String,
    consumer_key: SecretString,
}

impl Authorizer {
    pub fn new(consumer_key: SecretString) -> Authorizer {
        Authorizer::with_base_url(consumer_key, API_BASE)
    }

    /// Talks to `base_url` instead of the public API, e.g. a local stub.
    pub fn with_base_url(consumer_key: SecretString, base_url: impl Into<String>) -> Authorizer {
        Authorizer {
            http: Client::new(),
            base_url: base_url.into(),
            consumer_key,
        }
    }

    pub fn request_token(&self, redirect_uri: &str) -> Result<RequestToken> {
        let body = RequestTokenBody {
            consumer_key: self.consumer_key.expose_secret(),
            redirect_uri,
        };
        let reply: RequestTokenReply = post(&self.http, &self.base_url, "oauth/request", &body)?;
        Ok(RequestToken(reply.code))
    }

    /// Trades a request token the user has approved for an access token.
    pub fn authorize(self, token: &RequestToken) -> Result<PocketClient> {
        let body = AuthorizeBody {
            consumer_key: self.consumer_key.expose_secret(),
            code: &token.0,
        };
        let reply: AuthorizeReply = post(&self.http, &self.base_url, "oauth/authorize", &body)?;
        if let Some(username) = &reply.username {
            tracing::info!(%username, "authorized");
        }
        Ok(PocketClient {
            http: self.http,
            base_url: self.base_url,
            consumer_key: self.consumer_key,
            access_token: SecretString::from(reply.access_token),
            actions: Vec::new(),
            dump_path: None,
        })
    }
}

pub struct PocketClient {
    http: Client,
    base_url: String,
    consumer_key: SecretString,
    access_token: SecretString,
    actions: Vec<Action>,
    dump_path: Option<PathBuf>,
}

impl PocketClient {
    /// Also write the raw `get` reply to `path`.
    pub fn dump_responses_to(&mut self, path: PathBuf) {
        self.dump_path = Some(path);
    }

    /// Actions waiting for the next `commit`.
    pub fn queued(&self) -> &[Action] {
        &self.actions
    }
}

impl ReadingList for PocketClient {
    fn retrieve(&mut self, filter: &RetrieveFilter) -> Result<Vec<Article>> {
        let body = GetBody {
            consumer_key: self.consumer_key.expose_secret(),
            access_token: self.access_token.expose_secret(),
            filter,
        };
        let raw = post_raw(&self.http, &self.base_url, "get", &body)?;
        if let Some(path) = &self.dump_path {
            fs::write(path, &raw)?;
            tracing::info!(path = %path.display(), "wrote raw response");
        }
        parse_items(&raw)
    }

    fn queue_delete(&mut self, id: ArticleId) {
        self.actions.push(Action::Delete { item_id: id });
    }

    fn commit(&mut self) -> Result<SendResponse> {
        let body = SendBody {
            consumer_key: self.consumer_key.expose_secret(),
            access_token: self.access_token.expose_secret(),
            actions: &self.actions,
        };
        tracing::debug!(actions = self.actions.len(), "sending queued actions");
        // the queue survives a failed send
        let response: SendResponse = post(&self.http, &self.base_url, "send", &body)?;
        self.actions.clear();
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.id.0.as_str()).collect()
    }

    #[test]
    fn get_body_carries_filter() {
        let filter = RetrieveFilter::default();
        let body = GetBody {
            consumer_key: "ck",
            access_token: "at",
            filter: &filter,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "consumer_key": "ck",
                "access_token": "at",
                "state": "all",
                "sort": "oldest",
                "detailType": "simple",
            })
        );
    }

    #[test]
    fn send_body_lists_every_delete() {
        let actions = vec![
            Action::Delete { item_id: ArticleId::from("2") },
            Action::Delete { item_id: ArticleId::from("5") },
        ];
        let body = SendBody {
            consumer_key: "ck",
            access_token: "at",
            actions: &actions,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "consumer_key": "ck",
                "access_token": "at",
                "actions": [
                    {"action": "delete", "item_id": "2"},
                    {"action": "delete", "item_id": "5"},
                ],
            })
        );
    }

    #[test]
    fn parse_keeps_object_order() {
        let body = br#"{
            "status": 1,
            "list": {
                "9": {"item_id": "9", "given_url": "https://c.com/"},
                "3": {"item_id": "3", "given_url": "https://a.com/"},
                "5": {"item_id": "5", "given_url": "https://b.com/"}
            }
        }"#;
        let articles = parse_items(body).unwrap();
        assert_eq!(ids(&articles), ["9", "3", "5"]);
        assert_eq!(articles[1].url, "https://a.com/");
    }

    #[test]
    fn parse_orders_by_sort_id() {
        let body = br#"{
            "status": 1,
            "list": {
                "9": {"item_id": "9", "given_url": "https://c.com/", "sort_id": 2},
                "3": {"item_id": "3", "given_url": "https://a.com/", "sort_id": 0},
                "5": {"item_id": "5", "given_url": "https://b.com/", "sort_id": "1"}
            }
        }"#;
        let articles = parse_items(body).unwrap();
        assert_eq!(ids(&articles), ["3", "5", "9"]);
    }

    #[test]
    fn parse_empty_list_shapes() {
        assert!(parse_items(br#"{"status": 2, "list": []}"#).unwrap().is_empty());
        assert!(parse_items(br#"{"status": 2, "list": null}"#).unwrap().is_empty());
        assert!(parse_items(br#"{"status": 2}"#).unwrap().is_empty());
    }

    #[test]
    fn parse_falls_back_to_resolved_url() {
        let body = br#"{"list": {"1": {"item_id": "1", "given_url": "", "resolved_url": "https://r.io/"}}}"#;
        let articles = parse_items(body).unwrap();
        assert_eq!(articles[0].url, "https://r.io/");
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = parse_items(b"<html>").unwrap_err();
        assert!(matches!(err, PocketError::Decode { endpoint: "get", .. }));
    }

    #[test]
    fn auth_url_encodes_query() {
        let url = auth_url(&RequestToken("abc-123".into()), "https://google.com/").unwrap();
        assert_eq!(
            url.as_str(),
            "https://getpocket.com/auth/authorize?request_token=abc-123&redirect_uri=https%3A%2F%2Fgoogle.com%2F"
        );
    }

    #[test]
    fn send_response_display() {
        let response: SendResponse =
            serde_json::from_value(json!({"status": 1, "action_results": [true, false, true]}))
                .unwrap();
        assert_eq!(response.succeeded(), 2);
        assert_eq!(response.to_string(), "status 1, 2/3 actions succeeded");
    }
}
