//! Client → gateway control protocol.

use serde::{Deserialize, Serialize};

/// Control frames a client sends over its WebSocket connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Join an organization room, implicitly leaving any other room.
    JoinOrganization(OrganizationRef),
    /// Leave an organization room. A no-op when not a member.
    LeaveOrganization(OrganizationRef),
    /// Present credentials. Sent on every connect, including reconnects,
    /// because the gateway keeps no session state across connections.
    Authenticate { token: String },
}

/// An organization reference: the object form, or the historical bare string
/// still sent by older clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrganizationRef {
    Bare(String),
    #[serde(rename_all = "camelCase")]
    Object { organization_id: String },
}

impl OrganizationRef {
    pub fn object(id: impl Into<String>) -> Self {
        OrganizationRef::Object {
            organization_id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            OrganizationRef::Bare(id) => id,
            OrganizationRef::Object { organization_id } => organization_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_object_form() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"join-organization","data":{"organizationId":"org-42"}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::JoinOrganization(org) => assert_eq!(org.id(), "org-42"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn join_historical_bare_string() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"join-organization","data":"org-42"}"#).unwrap();
        match msg {
            ClientMessage::JoinOrganization(org) => assert_eq!(org.id(), "org-42"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn authenticate_frame() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"authenticate","data":{"token":"abc"}}"#).unwrap();
        assert_eq!(msg, ClientMessage::Authenticate { token: "abc".into() });
    }

    #[test]
    fn serializes_to_the_object_form() {
        let text = serde_json::to_string(&ClientMessage::LeaveOrganization(
            OrganizationRef::object("org-9"),
        ))
        .unwrap();
        assert_eq!(
            text,
            r#"{"type":"leave-organization","data":{"organizationId":"org-9"}}"#
        );
    }
}
