//! [`Gateway`] over the appliance's NITRO REST configuration API.
//!
//! Objects live at `/nitro/v1/config/<type>[/<name>]` and bindings at
//! `/nitro/v1/config/<parent>_<child>_binding/<parent name>`. Every request
//! carries the credentials in `X-NITRO-USER` / `X-NITRO-PASS` headers.

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{Attrs, Gateway, GatewayError, ObjectKind};
use crate::config::{ApplianceConfig, Credentials};

const CONFIG_PATH: [&str; 3] = ["nitro", "v1", "config"];

const HEADER_USER: &str = "X-NITRO-USER";
const HEADER_PASS: &str = "X-NITRO-PASS";

/// NITRO error code for "Resource already exists".
const ERR_RESOURCE_EXISTS: i64 = 273;
/// NITRO error code for "No such resource".
const ERR_NO_SUCH_RESOURCE: i64 = 258;

/// Status envelope the appliance attaches to error responses.
#[derive(Debug, Default, Deserialize)]
struct NitroStatus {
    #[serde(default)]
    errorcode: i64,
    #[serde(default)]
    message: String,
}

/// Blocking NITRO client bound to one appliance.
pub struct NitroClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
}

impl NitroClient {
    pub fn new(config: &ApplianceConfig) -> Result<Self, GatewayError> {
        let endpoint = config.base_url();
        let base_url = Url::parse(&endpoint).map_err(|e| GatewayError::Endpoint {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Endpoint {
                endpoint,
                reason: "not a hierarchical URL".to_string(),
            });
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::Transport {
                url: endpoint.clone(),
                source: e,
            })?;

        Ok(Self {
            client,
            base_url,
            credentials: config.credentials(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str], query: Option<(&str, String)>) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| GatewayError::Endpoint {
                endpoint: self.base_url.to_string(),
                reason: "not a hierarchical URL".to_string(),
            })?;
            path.pop_if_empty().extend(CONFIG_PATH).extend(segments);
        }
        if let Some((key, value)) = query {
            url.query_pairs_mut().append_pair(key, &value);
        }
        Ok(url)
    }

    /// Send one request. `kind`/`name` identify the target in errors.
    fn execute(
        &self,
        method: Method,
        url: Url,
        resource_type: &str,
        target: (ObjectKind, &str),
        body: Option<Value>,
    ) -> Result<Option<Value>, GatewayError> {
        let (kind, name) = target;
        debug!(method = %method, url = %url, "NITRO request");

        let mut builder = self
            .client
            .request(method, url.clone())
            .header(
                CONTENT_TYPE,
                format!("application/vnd.com.citrix.netscaler.{}+json", resource_type),
            )
            .header(HEADER_USER, self.credentials.username.as_str())
            .header(HEADER_PASS, self.credentials.password.expose());
        if let Some(body) = body {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().map_err(|e| GatewayError::Transport {
            url: url.to_string(),
            source: e,
        })?;
        let status = response.status();
        let text = response.text().map_err(|e| GatewayError::Transport {
            url: url.to_string(),
            source: e,
        })?;
        debug!(status = status.as_u16(), url = %url, "NITRO response");

        if !status.is_success() {
            return Err(classify(status, &text, kind, name));
        }
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| GatewayError::Protocol {
                kind,
                message: e.to_string(),
            })
    }

    fn get_records(
        &self,
        url: Url,
        resource_type: &str,
        target: (ObjectKind, &str),
    ) -> Result<Vec<Attrs>, GatewayError> {
        let body = self.execute(Method::GET, url, resource_type, target, None)?;
        records(target.0, resource_type, body)
    }
}

/// Map a non-success response onto the error taxonomy.
fn classify(status: StatusCode, body: &str, kind: ObjectKind, name: &str) -> GatewayError {
    let parsed: Option<NitroStatus> = serde_json::from_str(body).ok();
    let code = parsed.as_ref().map(|s| s.errorcode).unwrap_or(0);

    if code == ERR_RESOURCE_EXISTS || (code == 0 && status == StatusCode::CONFLICT) {
        return GatewayError::AlreadyExists {
            kind,
            name: name.to_string(),
        };
    }
    if code == ERR_NO_SUCH_RESOURCE || (code == 0 && status == StatusCode::NOT_FOUND) {
        return GatewayError::NotFound {
            kind,
            name: name.to_string(),
        };
    }

    let message = parsed
        .map(|s| s.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    GatewayError::Rejected {
        status: status.as_u16(),
        code,
        message,
    }
}

/// Pull the record array stored under `key` out of a response body.
///
/// An absent body or key means "no records".
fn records(kind: ObjectKind, key: &str, body: Option<Value>) -> Result<Vec<Attrs>, GatewayError> {
    let mut object = match body {
        None => return Ok(Vec::new()),
        Some(Value::Object(object)) => object,
        Some(other) => {
            return Err(GatewayError::Protocol {
                kind,
                message: format!("expected a JSON object, got {}", other),
            })
        }
    };

    match object.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(attrs) => Ok(attrs),
                other => Err(GatewayError::Protocol {
                    kind,
                    message: format!("expected '{}' entries to be objects, got {}", key, other),
                }),
            })
            .collect(),
        Some(other) => Err(GatewayError::Protocol {
            kind,
            message: format!("expected '{}' to be an array, got {}", key, other),
        }),
    }
}

fn with_field(attrs: &Attrs, field: &str, value: &str) -> Attrs {
    let mut attrs = attrs.clone();
    attrs
        .entry(field.to_string())
        .or_insert_with(|| Value::String(value.to_string()));
    attrs
}

fn envelope(key: &str, attrs: Attrs) -> Value {
    let mut body = serde_json::Map::new();
    body.insert(key.to_string(), Value::Object(attrs));
    Value::Object(body)
}

impl Gateway for NitroClient {
    fn create(&self, kind: ObjectKind, name: &str, attrs: &Attrs) -> Result<(), GatewayError> {
        let resource_type = kind.resource_type();
        let url = self.url(&[resource_type], None)?;
        let body = envelope(resource_type, with_field(attrs, kind.name_field(), name));
        self.execute(Method::POST, url, resource_type, (kind, name), Some(body))?;
        Ok(())
    }

    fn delete(&self, kind: ObjectKind, name: &str) -> Result<(), GatewayError> {
        let resource_type = kind.resource_type();
        let url = self.url(&[resource_type, name], None)?;
        self.execute(Method::DELETE, url, resource_type, (kind, name), None)?;
        Ok(())
    }

    fn exists(&self, kind: ObjectKind, name: &str) -> Result<bool, GatewayError> {
        match self.find(kind, name) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn bind(
        &self,
        parent: ObjectKind,
        parent_name: &str,
        child: ObjectKind,
        child_name: &str,
        attrs: &Attrs,
    ) -> Result<(), GatewayError> {
        let binding_type = parent.binding_type(child);
        let url = self.url(&[&binding_type], None)?;
        let attrs = with_field(attrs, "name", parent_name);
        let attrs = with_field(&attrs, child.bind_field(), child_name);
        let body = envelope(&binding_type, attrs);
        self.execute(Method::PUT, url, &binding_type, (child, child_name), Some(body))?;
        Ok(())
    }

    fn unbind(
        &self,
        parent: ObjectKind,
        parent_name: &str,
        child: ObjectKind,
        child_name: &str,
        filter_key: &str,
    ) -> Result<(), GatewayError> {
        let binding_type = parent.binding_type(child);
        let url = self.url(
            &[&binding_type, parent_name],
            Some(("args", format!("{}:{}", filter_key, child_name))),
        )?;
        self.execute(Method::DELETE, url, &binding_type, (child, child_name), None)?;
        Ok(())
    }

    fn find(&self, kind: ObjectKind, name: &str) -> Result<Attrs, GatewayError> {
        let resource_type = kind.resource_type();
        let url = self.url(&[resource_type, name], None)?;
        self.get_records(url, resource_type, (kind, name))?
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound {
                kind,
                name: name.to_string(),
            })
    }

    fn find_all_bound(
        &self,
        parent: ObjectKind,
        parent_name: &str,
        child: ObjectKind,
    ) -> Result<Vec<Attrs>, GatewayError> {
        let binding_type = parent.binding_type(child);
        let url = self.url(&[&binding_type, parent_name], None)?;
        self.get_records(url, &binding_type, (parent, parent_name))
    }

    fn find_bound(
        &self,
        parent: ObjectKind,
        parent_name: &str,
        child: ObjectKind,
        filter_key: &str,
        filter_value: &str,
    ) -> Result<Attrs, GatewayError> {
        let binding_type = parent.binding_type(child);
        let url = self.url(
            &[&binding_type, parent_name],
            Some(("filter", format!("{}:{}", filter_key, filter_value))),
        )?;
        self.get_records(url, &binding_type, (child, filter_value))?
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound {
                kind: child,
                name: filter_value.to_string(),
            })
    }

    fn find_all(&self, kind: ObjectKind) -> Result<Vec<Attrs>, GatewayError> {
        let resource_type = kind.resource_type();
        let url = self.url(&[resource_type], None)?;
        self.get_records(url, resource_type, (kind, ""))
    }
}
