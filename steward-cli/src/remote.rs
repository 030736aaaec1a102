//! Directory client over the JSON 1.1 RPC API.
//!
//! Every operation is a `POST /` with the operation named in `X-Amz-Target`.
//! Requests are not signed, so this talks to local emulators or to a
//! signing proxy in front of the real service.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use steward_core::{
    Attribute, DeliveryMedium, MessageAction, ResourceIdentity, StewardConfig, UserStatus,
};
use steward_sync::{ClientError, CreateUserRequest, DirectoryClient, RemoteUser};

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Blocking client for one directory endpoint.
pub struct HttpDirectory {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpDirectory {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            endpoint: endpoint.into(),
        }
    }

    /// Build from config. `endpoint_override` (flag or env) wins over the
    /// file; a bare `region` falls back to the public regional endpoint.
    pub fn from_config(config: &StewardConfig, endpoint_override: Option<&str>) -> Result<Self> {
        let endpoint = match (endpoint_override, &config.endpoint, &config.region) {
            (Some(e), _, _) => e.to_string(),
            (None, Some(e), _) => e.clone(),
            (None, None, Some(region)) => format!("https://cognito-idp.{region}.amazonaws.com/"),
            (None, None, None) => bail!(
                "no directory endpoint configured; pass --endpoint, set STEWARD_ENDPOINT, \
                 or add `endpoint:` to ~/.steward/config.yaml"
            ),
        };
        Ok(Self::new(endpoint, Duration::from_secs(config.timeout_secs)))
    }

    fn call<B: Serialize, R: DeserializeOwned>(&self, operation: &str, body: &B) -> Result<R, ClientError> {
        let payload =
            serde_json::to_string(body).map_err(|e| ClientError::Decode(e.to_string()))?;
        debug!(operation, endpoint = %self.endpoint, "POST");

        let response = self
            .agent
            .post(&self.endpoint)
            .set("X-Amz-Target", &format!("{TARGET_PREFIX}.{operation}"))
            .set("Content-Type", CONTENT_TYPE)
            .send_string(&payload);

        match response {
            Ok(resp) => {
                let text = resp
                    .into_string()
                    .map_err(|e| ClientError::Transport(e.to_string()))?;
                // Operations without output answer with an empty body.
                let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
                serde_json::from_str(text).map_err(|e| ClientError::Decode(e.to_string()))
            }
            Err(ureq::Error::Status(status, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                Err(service_error(status, &text))
            }
            Err(ureq::Error::Transport(t)) => Err(ClientError::Transport(t.to_string())),
        }
    }
}

/// Map an error body `{ "__type": "prefix#Code", "message": ".." }`.
fn service_error(status: u16, body: &str) -> ClientError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed
        .kind
        .as_deref()
        .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
        .unwrap_or_else(|| format!("HTTP{status}"));
    let message = parsed
        .message
        .or(parsed.message_upper)
        .unwrap_or_else(|| body.trim().to_string());

    match code.as_str() {
        "UserNotFoundException" | "ResourceNotFoundException" => ClientError::NotFound { message },
        _ => ClientError::Service { code, message },
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type")]
    kind: Option<String>,
    message: Option<String>,
    #[serde(rename = "Message")]
    message_upper: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireAttribute {
    name: String,
    #[serde(default)]
    value: String,
}

impl From<&Attribute> for WireAttribute {
    fn from(a: &Attribute) -> Self {
        Self {
            name: a.name.clone(),
            value: a.value.clone(),
        }
    }
}

impl From<WireAttribute> for Attribute {
    fn from(a: WireAttribute) -> Self {
        Attribute::new(a.name, a.value)
    }
}

fn wire(attributes: &[Attribute]) -> Vec<WireAttribute> {
    attributes.iter().map(WireAttribute::from).collect()
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct UserKey<'a> {
    user_pool_id: &'a str,
    username: &'a str,
}

impl<'a> From<&'a ResourceIdentity> for UserKey<'a> {
    fn from(id: &'a ResourceIdentity) -> Self {
        Self {
            user_pool_id: &id.pool_id.0,
            username: &id.username.0,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AdminCreateUser<'a> {
    #[serde(flatten)]
    key: UserKey<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temporary_password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_action: Option<MessageAction>,
    force_alias_creation: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    desired_delivery_mediums: Vec<DeliveryMedium>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    client_metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    validation_data: Vec<WireAttribute>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    user_attributes: Vec<WireAttribute>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AdminCreateUserOutput {
    user: WireUser,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireUser {
    username: String,
    #[serde(default = "enabled_default")]
    enabled: bool,
    #[serde(default)]
    user_status: UserStatus,
    #[serde(default)]
    attributes: Vec<WireAttribute>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AdminGetUserOutput {
    username: String,
    #[serde(default = "enabled_default")]
    enabled: bool,
    #[serde(default)]
    user_status: UserStatus,
    #[serde(default)]
    user_attributes: Vec<WireAttribute>,
}

fn enabled_default() -> bool {
    true
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AdminSetUserPassword<'a> {
    #[serde(flatten)]
    key: UserKey<'a>,
    password: &'a str,
    permanent: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AdminUpdateUserAttributes<'a> {
    #[serde(flatten)]
    key: UserKey<'a>,
    user_attributes: Vec<WireAttribute>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GroupMembership<'a> {
    #[serde(flatten)]
    key: UserKey<'a>,
    group_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AdminListGroupsForUser<'a> {
    #[serde(flatten)]
    key: UserKey<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AdminListGroupsForUserOutput {
    #[serde(default)]
    groups: Vec<WireGroup>,
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireGroup {
    group_name: String,
}

#[derive(Deserialize)]
struct Empty {}

// ---------------------------------------------------------------------------
// DirectoryClient
// ---------------------------------------------------------------------------

impl DirectoryClient for HttpDirectory {
    fn create_user(&self, request: &CreateUserRequest) -> Result<RemoteUser, ClientError> {
        let body = AdminCreateUser {
            key: UserKey::from(&request.identity),
            temporary_password: request.temporary_password.as_deref(),
            message_action: request.message_action,
            force_alias_creation: request.force_alias_creation,
            desired_delivery_mediums: request.desired_delivery_mediums.clone(),
            client_metadata: request.client_metadata.clone(),
            validation_data: wire(&request.validation_data),
            user_attributes: wire(&request.user_attributes),
        };
        let out: AdminCreateUserOutput = self.call("AdminCreateUser", &body)?;
        Ok(RemoteUser {
            username: out.user.username,
            enabled: out.user.enabled,
            status: out.user.user_status,
            attributes: out.user.attributes.into_iter().map(Attribute::from).collect(),
        })
    }

    fn get_user(&self, identity: &ResourceIdentity) -> Result<RemoteUser, ClientError> {
        let out: AdminGetUserOutput = self.call("AdminGetUser", &UserKey::from(identity))?;
        Ok(RemoteUser {
            username: out.username,
            enabled: out.enabled,
            status: out.user_status,
            attributes: out.user_attributes.into_iter().map(Attribute::from).collect(),
        })
    }

    fn set_password(
        &self,
        identity: &ResourceIdentity,
        password: &str,
        permanent: bool,
    ) -> Result<(), ClientError> {
        let body = AdminSetUserPassword {
            key: UserKey::from(identity),
            password,
            permanent,
        };
        self.call::<_, Empty>("AdminSetUserPassword", &body).map(|_| ())
    }

    fn update_attributes(
        &self,
        identity: &ResourceIdentity,
        attributes: &[Attribute],
    ) -> Result<(), ClientError> {
        let body = AdminUpdateUserAttributes {
            key: UserKey::from(identity),
            user_attributes: wire(attributes),
        };
        self.call::<_, Empty>("AdminUpdateUserAttributes", &body).map(|_| ())
    }

    fn add_to_group(&self, identity: &ResourceIdentity, group: &str) -> Result<(), ClientError> {
        let body = GroupMembership {
            key: UserKey::from(identity),
            group_name: group,
        };
        self.call::<_, Empty>("AdminAddUserToGroup", &body).map(|_| ())
    }

    fn remove_from_group(
        &self,
        identity: &ResourceIdentity,
        group: &str,
    ) -> Result<(), ClientError> {
        let body = GroupMembership {
            key: UserKey::from(identity),
            group_name: group,
        };
        self.call::<_, Empty>("AdminRemoveUserFromGroup", &body).map(|_| ())
    }

    fn list_groups_for_user(
        &self,
        identity: &ResourceIdentity,
    ) -> Result<Vec<String>, ClientError> {
        let mut groups = Vec::new();
        let mut next_token = None;
        loop {
            let body = AdminListGroupsForUser {
                key: UserKey::from(identity),
                next_token: next_token.take(),
            };
            let page: AdminListGroupsForUserOutput = self.call("AdminListGroupsForUser", &body)?;
            groups.extend(page.groups.into_iter().map(|g| g.group_name));
            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }
        Ok(groups)
    }

    fn delete_user(&self, identity: &ResourceIdentity) -> Result<(), ClientError> {
        self.call::<_, Empty>("AdminDeleteUser", &UserKey::from(identity))
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_not_found_maps_to_not_found() {
        let err = service_error(
            400,
            r#"{"__type":"com.amazonaws.cognito#UserNotFoundException","message":"User does not exist."}"#,
        );
        assert_eq!(
            err,
            ClientError::NotFound {
                message: "User does not exist.".into()
            }
        );
    }

    #[test]
    fn other_types_map_to_service_errors() {
        let err = service_error(400, r#"{"__type":"UsernameExistsException","Message":"taken"}"#);
        assert_eq!(
            err,
            ClientError::Service {
                code: "UsernameExistsException".into(),
                message: "taken".into()
            }
        );
    }

    #[test]
    fn unparseable_body_keeps_status() {
        match service_error(502, "Bad Gateway") {
            ClientError::Service { code, message } => {
                assert_eq!(code, "HTTP502");
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn create_body_uses_wire_names_and_skips_empty_fields() {
        let id = ResourceIdentity::decode("eu-west-1_Pool1/alice").unwrap();
        let body = AdminCreateUser {
            key: UserKey::from(&id),
            temporary_password: Some("Temp-Pass-1"),
            message_action: Some(MessageAction::Suppress),
            force_alias_creation: false,
            desired_delivery_mediums: vec![DeliveryMedium::Email],
            client_metadata: BTreeMap::new(),
            validation_data: vec![],
            user_attributes: wire(&[Attribute::new("email", "a@x.io")]),
        };
        let json: serde_json::Value = serde_json::to_value(&body).unwrap();
        assert_eq!(json["UserPoolId"], "eu-west-1_Pool1");
        assert_eq!(json["Username"], "alice");
        assert_eq!(json["MessageAction"], "SUPPRESS");
        assert_eq!(json["DesiredDeliveryMediums"][0], "EMAIL");
        assert_eq!(json["UserAttributes"][0]["Name"], "email");
        assert!(json.get("ClientMetadata").is_none());
        assert!(json.get("ValidationData").is_none());
    }

    #[test]
    fn missing_endpoint_is_reported() {
        let err = HttpDirectory::from_config(&StewardConfig::default(), None)
            .err()
            .expect("no endpoint");
        assert!(err.to_string().contains("no directory endpoint"));
    }

    #[test]
    fn region_derives_endpoint() {
        let config = StewardConfig {
            region: Some("eu-west-1".into()),
            ..StewardConfig::default()
        };
        let client = HttpDirectory::from_config(&config, None).unwrap();
        assert_eq!(client.endpoint, "https://cognito-idp.eu-west-1.amazonaws.com/");
        let client = HttpDirectory::from_config(&config, Some("http://localhost:9229")).unwrap();
        assert_eq!(client.endpoint, "http://localhost:9229");
    }
}
