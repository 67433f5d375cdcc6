//! Content-filter repository on the controller
//!
//! Filters are listed per site, matched by exact name, and updated with a
//! full-object PUT. The PUT replaces the whole object, so a [`ContentFilter`]
//! keeps the JSON object exactly as fetched (key order and number text
//! included) and only its `block_list` entry is ever rewritten.

use reqwest::StatusCode;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::ControllerConfig;
use crate::error::{AuthFailure, Result, SyncError};
use crate::session::{build_client, ControllerSession, CSRF_HEADER};

const ID_FIELD: &str = "_id";
const NAME_FIELD: &str = "name";
const BLOCK_LIST_FIELD: &str = "block_list";

/// One content-filtering rule as the controller stores it
///
/// `_id`, `name` and `block_list` are read out of the fetched object for
/// convenience; the object itself is what gets serialized. Fields this client
/// does not understand are therefore sent back unchanged, in their original
/// position and textual form.
///
/// # Examples
///
/// ```
/// use unifi_filter_sync::filters::ContentFilter;
///
/// let object = serde_json::json!({"_id": "64f0", "name": "Ads", "enabled": true});
/// let filter = ContentFilter::try_from(object.as_object().cloned().unwrap_or_default())?;
/// assert_eq!(filter.name(), "Ads");
/// assert!(filter.block_list().is_empty());
///
/// let updated = filter.with_block_list(vec!["ads.example".to_string()]);
/// assert_eq!(updated.fields()["enabled"], serde_json::json!(true));
/// # Ok::<(), String>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ContentFilter {
    id: String,
    name: String,
    block_list: Vec<String>,
    fields: Map<String, Value>,
}

impl ContentFilter {
    /// Controller-assigned identifier (`_id`)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name, matched case-sensitively by [`find_filter`]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn block_list(&self) -> &[String] {
        &self.block_list
    }

    /// The full object that is sent on update
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns a copy of this filter with its block list replaced
    ///
    /// The `block_list` entry keeps its position in the object; if the
    /// controller omitted it, it is appended. Every other field is left
    /// untouched.
    ///
    /// # Arguments
    /// * `domains` - The new block list, in the order it should be stored
    ///
    /// # Returns
    /// * `ContentFilter` - The filter object to hand to [`FilterApi::update_filter`]
    pub fn with_block_list(&self, domains: Vec<String>) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(
            BLOCK_LIST_FIELD.to_string(),
            Value::Array(domains.iter().cloned().map(Value::String).collect()),
        );
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            block_list: domains,
            fields,
        }
    }
}

impl TryFrom<Map<String, Value>> for ContentFilter {
    type Error = String;

    fn try_from(fields: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        let id = match fields.get(ID_FIELD) {
            Some(Value::String(id)) => id.clone(),
            _ => return Err(format!("filter object has no string '{}'", ID_FIELD)),
        };
        let name = match fields.get(NAME_FIELD) {
            Some(Value::String(name)) => name.clone(),
            _ => return Err(format!("filter '{}' has no string '{}'", id, NAME_FIELD)),
        };
        let block_list = match fields.get(BLOCK_LIST_FIELD) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(domain) => Ok(domain.clone()),
                    other => Err(format!(
                        "filter '{}' has a non-string block_list entry: {}",
                        name, other
                    )),
                })
                .collect::<std::result::Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(format!(
                    "filter '{}' has a block_list that is not an array: {}",
                    name, other
                ))
            }
        };

        Ok(Self {
            id,
            name,
            block_list,
            fields,
        })
    }
}

impl Serialize for ContentFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Parses the list endpoint body, either a bare array or `{"data": [...]}`
///
/// # Errors
/// * [`SyncError::Api`] if the body is not JSON, has neither shape, or holds
///   an entry without a string `_id` and `name`
pub fn parse_filter_list(body: &str) -> Result<Vec<ContentFilter>> {
    const CONTEXT: &str = "content-filtering list";

    let value: Value = serde_json::from_str(body).map_err(|e| SyncError::shape(CONTEXT, e))?;
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut wrapper) => match wrapper.remove("data") {
            Some(Value::Array(entries)) => entries,
            _ => return Err(SyncError::shape(CONTEXT, "expected an array or a 'data' array")),
        },
        _ => return Err(SyncError::shape(CONTEXT, "expected an array or a 'data' array")),
    };

    entries
        .into_iter()
        .map(|entry| match entry {
            Value::Object(fields) => {
                ContentFilter::try_from(fields).map_err(|e| SyncError::shape(CONTEXT, e))
            }
            other => Err(SyncError::shape(
                CONTEXT,
                format!("filter entry is not an object: {}", other),
            )),
        })
        .collect()
}

/// Finds the single filter whose name equals `name` exactly (case-sensitive)
///
/// # Arguments
/// * `filters` - Filters as returned by [`FilterApi::list_filters`]
/// * `name` - Display name to look for; no trimming, case folding or prefix match
///
/// # Returns
/// * `Result<&ContentFilter>` - The only filter with that name. Absence and
///   ambiguity are both reported as [`SyncError::NotFound`].
pub fn find_filter<'a>(filters: &'a [ContentFilter], name: &str) -> Result<&'a ContentFilter> {
    let mut matches = filters.iter().filter(|f| f.name == name);
    match (matches.next(), matches.next()) {
        (Some(filter), None) => Ok(filter),
        (None, _) => Err(SyncError::NotFound(format!(
            "Filter '{}' not found. Please create it in the UniFi UI first.",
            name
        ))),
        (Some(_), Some(_)) => {
            let count = filters.iter().filter(|f| f.name == name).count();
            Err(SyncError::NotFound(format!(
                "Filter name '{}' is ambiguous: {} filters share it",
                name, count
            )))
        }
    }
}

/// The controller operations the sync workflows depend on
///
/// [`ControllerClient`] talks HTTP; tests substitute an in-memory fake.
#[allow(async_fn_in_trait)]
pub trait FilterApi {
    async fn login(&mut self) -> Result<()>;
    async fn list_filters(&mut self) -> Result<Vec<ContentFilter>>;
    async fn update_filter(&mut self, filter: &ContentFilter) -> Result<()>;
}

/// HTTP implementation of [`FilterApi`] against one controller site
pub struct ControllerClient {
    config: ControllerConfig,
    client: reqwest::Client,
    session: Option<ControllerSession>,
}

impl ControllerClient {
    /// Creates a client for the controller and site named in `config`
    ///
    /// No request is made here; call [`FilterApi::login`] first.
    ///
    /// # Arguments
    /// * `config` - Resolved connection settings
    ///
    /// # Returns
    /// * `Result<Self>` - The client, or [`SyncError::Api`] if the HTTP client
    ///   could not be built
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use unifi_filter_sync::config::ControllerConfig;
    /// use unifi_filter_sync::filters::{ControllerClient, FilterApi};
    ///
    /// # async fn example() -> unifi_filter_sync::error::Result<()> {
    /// let config = ControllerConfig::new("https://192.168.1.1", "admin", "secret", "default");
    /// let mut client = ControllerClient::new(config)?;
    /// client.login().await?;
    /// let filters = client.list_filters().await?;
    /// println!("{} content filters", filters.len());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: ControllerConfig) -> Result<Self> {
        let client = build_client(&config)?;
        Ok(Self {
            config,
            client,
            session: None,
        })
    }

    pub fn session(&self) -> Option<&ControllerSession> {
        self.session.as_ref()
    }

    fn session_mut(&mut self) -> Result<&mut ControllerSession> {
        self.session.as_mut().ok_or_else(|| {
            SyncError::auth(
                AuthFailure::NotLoggedIn,
                "not logged in; call login before using the filter API",
            )
        })
    }
}

impl FilterApi for ControllerClient {
    async fn login(&mut self) -> Result<()> {
        let session = ControllerSession::login(self.client.clone(), &self.config).await?;
        self.session = Some(session);
        Ok(())
    }

    async fn list_filters(&mut self) -> Result<Vec<ContentFilter>> {
        let url = self.config.filters_url();
        let session = self.session_mut()?;
        debug!("Listing content filters from {}", url);

        let response = session
            .client()
            .get(&url)
            .send()
            .await
            .map_err(|e| SyncError::transport(&url, e))?;
        session.refresh_csrf(response.headers());

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::transport(&url, e))?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SyncError::auth(
                AuthFailure::Forbidden,
                format!(
                    "controller refused to list content filters (HTTP {}); the session may have expired",
                    status
                ),
            ));
        }
        if !status.is_success() {
            return Err(SyncError::status(status, "listing content filters", &body));
        }

        let filters = parse_filter_list(&body)?;
        debug!("Controller returned {} content filters", filters.len());
        Ok(filters)
    }

    async fn update_filter(&mut self, filter: &ContentFilter) -> Result<()> {
        let url = self.config.filter_url(&filter.id);
        let session = self.session_mut()?;
        debug!("Updating content filter '{}' at {}", filter.name, url);

        let mut request = session.client().put(&url).json(filter);
        if let Some(token) = session.csrf_token() {
            request = request.header(CSRF_HEADER, token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::transport(&url, e))?;
        session.refresh_csrf(response.headers());

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::transport(&url, e))?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SyncError::auth(
                AuthFailure::Forbidden,
                format!(
                    "controller refused the update of '{}' (HTTP {}); the CSRF token may be missing or expired",
                    filter.name, status
                ),
            ));
        }
        if !status.is_success() {
            return Err(SyncError::status(status, "updating content filter", &body));
        }

        info!(
            "Updated {} domains on the controller",
            filter.block_list().len()
        );
        Ok(())
    }
}
