//! Protocol actions and their wire text encoding
//!
//! An [`Action`] is one protocol message: a request or answer type, a
//! correlation id, fragmentation info for multi-part answers, a typed
//! payload and the remote peer address. Actions are built once, sent
//! once, and immutable afterwards.
//!
//! Wire format (field separator U+001F):
//!
//! ```text
//! <type code> US <operation id> US <part>/<total> US <payload tag> US <payload>
//! ```
//!
//! A resource payload joins name and value with U+001E.

use crate::{DhtError, Result, MAX_ID};
use burrow_core::{BinaryKey, PeerAddress, Resource};

/// Correlation identifier binding a request to its answer fragments.
/// Valid values are `[0, MAX_ID)`.
pub type OperationId = u16;

/// Separator between wire fields (ASCII unit separator)
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// Separator joining a resource's name and value on the wire (ASCII
/// record separator)
pub const RESOURCE_SEPARATOR: char = '\u{1e}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Ping,
    FindNode,
    FindValue,
    Store,
    Invite,
    PingAnswer,
    FindNodeAnswer,
    FindValueAnswer,
    StoreAnswer,
    InviteAnswer,
}

impl ActionType {
    pub fn is_request(self) -> bool {
        matches!(
            self,
            Self::Ping | Self::FindNode | Self::FindValue | Self::Store | Self::Invite
        )
    }

    pub fn is_answer(self) -> bool {
        !self.is_request()
    }

    /// The answer type paired with a request type
    pub fn answer_type(self) -> Option<ActionType> {
        match self {
            Self::Ping => Some(Self::PingAnswer),
            Self::FindNode => Some(Self::FindNodeAnswer),
            Self::FindValue => Some(Self::FindValueAnswer),
            Self::Store => Some(Self::StoreAnswer),
            Self::Invite => Some(Self::InviteAnswer),
            _ => None,
        }
    }

    /// Stable numeric wire code
    fn code(self) -> u8 {
        match self {
            Self::Ping => 1,
            Self::FindNode => 2,
            Self::FindValue => 3,
            Self::Store => 4,
            Self::Invite => 5,
            Self::PingAnswer => 11,
            Self::FindNodeAnswer => 12,
            Self::FindValueAnswer => 13,
            Self::StoreAnswer => 14,
            Self::InviteAnswer => 15,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Ping),
            2 => Some(Self::FindNode),
            3 => Some(Self::FindValue),
            4 => Some(Self::Store),
            5 => Some(Self::Invite),
            11 => Some(Self::PingAnswer),
            12 => Some(Self::FindNodeAnswer),
            13 => Some(Self::FindValueAnswer),
            14 => Some(Self::StoreAnswer),
            15 => Some(Self::InviteAnswer),
            _ => None,
        }
    }
}

/// Typed action payload; decoding validates strictly per variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No payload
    Ignored,
    /// A target key in the keyspace
    NodeId(BinaryKey),
    /// A contactable peer
    PeerAddress(PeerAddress),
    /// A serialized resource
    Resource(Resource),
    Boolean(bool),
}

impl Payload {
    fn tag(&self) -> u8 {
        match self {
            Self::Ignored => 0,
            Self::NodeId(_) => 1,
            Self::PeerAddress(_) => 2,
            Self::Resource(_) => 3,
            Self::Boolean(_) => 4,
        }
    }

    fn encode(&self) -> String {
        match self {
            Self::Ignored => String::new(),
            Self::NodeId(key) => key.to_hex(),
            Self::PeerAddress(address) => address.to_string(),
            Self::Resource(resource) => {
                format!("{}{}{}", resource.name(), RESOURCE_SEPARATOR, resource.value())
            }
            Self::Boolean(value) => value.to_string(),
        }
    }

    fn decode(tag: u8, text: &str) -> Result<Self> {
        match tag {
            0 => Ok(Self::Ignored),
            1 => Ok(Self::NodeId(BinaryKey::from_hex(text)?)),
            2 => Ok(Self::PeerAddress(
                PeerAddress::new(text).map_err(DhtError::Key)?,
            )),
            3 => {
                let (name, value) = text.split_once(RESOURCE_SEPARATOR).ok_or_else(|| {
                    DhtError::InvalidAction("resource payload missing separator".to_string())
                })?;
                Ok(Self::Resource(
                    Resource::new(name, value).map_err(DhtError::Key)?,
                ))
            }
            4 => match text {
                "true" => Ok(Self::Boolean(true)),
                "false" => Ok(Self::Boolean(false)),
                other => Err(DhtError::InvalidAction(format!(
                    "invalid boolean payload: {other}"
                ))),
            },
            other => Err(DhtError::InvalidAction(format!(
                "unknown payload tag: {other}"
            ))),
        }
    }
}

/// One protocol message
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    action_type: ActionType,
    operation_id: OperationId,
    part: u16,
    total_parts: u16,
    payload: Payload,
    peer: PeerAddress,
}

impl Action {
    /// Assemble an action, validating the id range and fragment indices
    pub fn new(
        action_type: ActionType,
        operation_id: OperationId,
        part: u16,
        total_parts: u16,
        payload: Payload,
        peer: PeerAddress,
    ) -> Result<Self> {
        if operation_id >= MAX_ID {
            return Err(DhtError::InvalidAction(format!(
                "operation id {operation_id} outside [0, {MAX_ID})"
            )));
        }
        if part == 0 || part > total_parts {
            return Err(DhtError::InvalidAction(format!(
                "fragment {part}/{total_parts} out of range"
            )));
        }
        Ok(Self {
            action_type,
            operation_id,
            part,
            total_parts,
            payload,
            peer,
        })
    }

    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    pub fn operation_id(&self) -> OperationId {
        self.operation_id
    }

    /// 1-based index of this fragment
    pub fn part(&self) -> u16 {
        self.part
    }

    /// Number of fragments the sender split this answer into
    pub fn total_parts(&self) -> u16 {
        self.total_parts
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The remote peer: destination for outbound actions, source for
    /// inbound ones.
    pub fn peer(&self) -> &PeerAddress {
        &self.peer
    }

    /// Serialize for one transport send
    pub fn encode(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}/{}{sep}{}{sep}{}",
            self.action_type.code(),
            self.operation_id,
            self.part,
            self.total_parts,
            self.payload.tag(),
            self.payload.encode(),
            sep = FIELD_SEPARATOR,
        )
    }

    /// Parse a raw transport message from `peer`
    pub fn decode(peer: PeerAddress, text: &str) -> Result<Self> {
        let fields: Vec<&str> = text.splitn(5, FIELD_SEPARATOR).collect();
        if fields.len() != 5 {
            return Err(DhtError::InvalidAction(format!(
                "expected 5 fields, got {}",
                fields.len()
            )));
        }

        let type_code: u8 = fields[0]
            .parse()
            .map_err(|_| DhtError::InvalidAction(format!("bad type code: {}", fields[0])))?;
        let action_type = ActionType::from_code(type_code)
            .ok_or_else(|| DhtError::InvalidAction(format!("unknown type code: {type_code}")))?;

        let operation_id: OperationId = fields[1]
            .parse()
            .map_err(|_| DhtError::InvalidAction(format!("bad operation id: {}", fields[1])))?;

        let (part, total_parts) = fields[2].split_once('/').ok_or_else(|| {
            DhtError::InvalidAction(format!("bad fragment field: {}", fields[2]))
        })?;
        let part: u16 = part
            .parse()
            .map_err(|_| DhtError::InvalidAction(format!("bad fragment index: {part}")))?;
        let total_parts: u16 = total_parts.parse().map_err(|_| {
            DhtError::InvalidAction(format!("bad fragment count: {total_parts}"))
        })?;

        let tag: u8 = fields[3]
            .parse()
            .map_err(|_| DhtError::InvalidAction(format!("bad payload tag: {}", fields[3])))?;
        let payload = Payload::decode(tag, fields[4])?;

        Self::new(action_type, operation_id, part, total_parts, payload, peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(name: &str) -> PeerAddress {
        PeerAddress::new(name).unwrap()
    }

    fn roundtrip(action: Action) {
        let encoded = action.encode();
        let decoded = Action::decode(action.peer().clone(), &encoded).unwrap();
        assert_eq!(decoded, action);
    }

    #[test]
    fn roundtrip_all_payload_kinds() {
        let key = BinaryKey::hash_bytes(b"target", 128).unwrap();
        roundtrip(
            Action::new(ActionType::Ping, 3, 1, 1, Payload::Ignored, peer("a")).unwrap(),
        );
        roundtrip(
            Action::new(ActionType::FindNode, 7, 1, 1, Payload::NodeId(key), peer("a")).unwrap(),
        );
        roundtrip(
            Action::new(
                ActionType::FindNodeAnswer,
                7,
                2,
                4,
                Payload::PeerAddress(peer("b")),
                peer("a"),
            )
            .unwrap(),
        );
        roundtrip(
            Action::new(
                ActionType::FindValueAnswer,
                0,
                1,
                1,
                Payload::Resource(Resource::new("note", "the value").unwrap()),
                peer("a"),
            )
            .unwrap(),
        );
        roundtrip(
            Action::new(
                ActionType::StoreAnswer,
                255,
                1,
                1,
                Payload::Boolean(true),
                peer("a"),
            )
            .unwrap(),
        );
    }

    #[test]
    fn resource_value_may_contain_field_separator_text() {
        let resource = Resource::new("name", "value with spaces and / slashes").unwrap();
        roundtrip(
            Action::new(
                ActionType::Store,
                1,
                1,
                1,
                Payload::Resource(resource),
                peer("a"),
            )
            .unwrap(),
        );
    }

    #[test]
    fn id_out_of_range_rejected() {
        assert!(Action::new(ActionType::Ping, MAX_ID, 1, 1, Payload::Ignored, peer("a")).is_err());
    }

    #[test]
    fn bad_fragment_indices_rejected() {
        assert!(Action::new(ActionType::Ping, 1, 0, 1, Payload::Ignored, peer("a")).is_err());
        assert!(Action::new(ActionType::Ping, 1, 3, 2, Payload::Ignored, peer("a")).is_err());
    }

    #[test]
    fn decode_failures() {
        let p = peer("a");
        // too few fields
        assert!(Action::decode(p.clone(), "1\u{1f}2").is_err());
        // unknown type code
        assert!(Action::decode(p.clone(), "9\u{1f}0\u{1f}1/1\u{1f}0\u{1f}").is_err());
        // malformed fragment field
        assert!(Action::decode(p.clone(), "1\u{1f}0\u{1f}11\u{1f}0\u{1f}").is_err());
        // bad boolean payload
        assert!(Action::decode(p.clone(), "14\u{1f}0\u{1f}1/1\u{1f}4\u{1f}maybe").is_err());
        // resource payload without the name/value separator
        assert!(Action::decode(p.clone(), "4\u{1f}0\u{1f}1/1\u{1f}3\u{1f}no-separator").is_err());
        // node id payload with bad hex
        assert!(Action::decode(p, "2\u{1f}0\u{1f}1/1\u{1f}1\u{1f}xyz").is_err());
    }

    #[test]
    fn answer_type_mapping() {
        assert_eq!(ActionType::Ping.answer_type(), Some(ActionType::PingAnswer));
        assert_eq!(ActionType::Store.answer_type(), Some(ActionType::StoreAnswer));
        assert_eq!(ActionType::PingAnswer.answer_type(), None);
        assert!(ActionType::FindValue.is_request());
        assert!(ActionType::FindValueAnswer.is_answer());
    }
}
