use serde::{Deserialize, Serialize};

/// Authority name matching any authority in a filter URI.
pub const WILDCARD_AUTHORITY: &str = "*";
/// Entity id matching any entity in a filter URI.
pub const WILDCARD_ENTITY_ID: u32 = 0xFFFF_FFFF;
/// Major version matching any version in a filter URI.
pub const WILDCARD_VERSION: u8 = 0xFF;
/// Resource id matching any resource in a filter URI.
pub const WILDCARD_RESOURCE_ID: u16 = 0xFFFF;

const WILDCARD_SERVICE_ID: u32 = 0x0000_FFFF;
const WILDCARD_INSTANCE_ID: u32 = 0xFFFF_0000;

/// uProtocol addressing URI.
///
/// Identifies a uEntity (authority + entity id + major version) and one of
/// its resources. Filter URIs used for listener registration may carry
/// wildcards in any field; URIs attached to messages may not.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct UUri {
    pub authority_name: String,
    pub ue_id: u32,
    pub ue_version_major: u8,
    pub resource_id: u16,
}

impl UUri {
    #[must_use]
    pub fn new(
        authority_name: impl Into<String>,
        ue_id: u32,
        ue_version_major: u8,
        resource_id: u16,
    ) -> Self {
        Self {
            authority_name: authority_name.into(),
            ue_id,
            ue_version_major,
            resource_id,
        }
    }

    /// Filter URI matching every message address.
    #[must_use]
    pub fn any() -> Self {
        Self {
            authority_name: WILDCARD_AUTHORITY.to_string(),
            ue_id: WILDCARD_ENTITY_ID,
            ue_version_major: WILDCARD_VERSION,
            resource_id: WILDCARD_RESOURCE_ID,
        }
    }

    /// An empty URI has a blank authority and all-zero ids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.authority_name.trim().is_empty()
            && self.ue_id == 0
            && self.ue_version_major == 0
            && self.resource_id == 0
    }

    #[must_use]
    pub fn has_wildcards(&self) -> bool {
        self.authority_name == WILDCARD_AUTHORITY
            || (self.ue_id & WILDCARD_SERVICE_ID) == WILDCARD_SERVICE_ID
            || (self.ue_id & WILDCARD_INSTANCE_ID) == WILDCARD_INSTANCE_ID
            || self.ue_version_major == WILDCARD_VERSION
            || self.resource_id == WILDCARD_RESOURCE_ID
    }

    /// Valid as the target of an RPC request: no wildcards, resource id in
    /// the method range [0x0001, 0x7FFF].
    #[must_use]
    pub fn is_rpc_method(&self) -> bool {
        !self.is_empty()
            && !self.has_wildcards()
            && self.ue_version_major != 0
            && (0x0001..=0x7FFF).contains(&self.resource_id)
    }

    /// Valid as the reply-to address of an RPC request: no wildcards,
    /// resource id zero.
    #[must_use]
    pub fn is_rpc_response(&self) -> bool {
        !self.is_empty()
            && !self.has_wildcards()
            && self.resource_id == 0
            && self.ue_version_major != 0
    }

    /// Valid as a published topic: no wildcards, resource id in the topic
    /// range [0x8000, 0xFFFE].
    #[must_use]
    pub fn is_publish_topic(&self) -> bool {
        !self.is_empty()
            && !self.has_wildcards()
            && self.ue_version_major != 0
            && (0x8000..=0xFFFE).contains(&self.resource_id)
    }

    /// Valid as a subscription filter: the resource id must stay in the
    /// topic range [0x8000, 0xFFFE] or be the resource wildcard; the other
    /// fields may carry wildcards freely.
    #[must_use]
    pub fn is_subscription_pattern(&self) -> bool {
        self.resource_id >= 0x8000
    }

    /// Valid as a notification source or sink.
    #[must_use]
    pub fn is_notification_source(&self) -> bool {
        self.is_publish_topic()
    }

    #[must_use]
    pub fn is_notification_sink(&self) -> bool {
        self.is_rpc_response()
    }

    /// Wildcard-aware filter match, with `self` as the filter pattern.
    #[must_use]
    pub fn matches(&self, candidate: &UUri) -> bool {
        self.matches_authority(candidate)
            && self.matches_entity(candidate)
            && self.matches_version(candidate)
            && self.matches_resource(candidate)
    }

    fn matches_authority(&self, candidate: &UUri) -> bool {
        self.authority_name == WILDCARD_AUTHORITY || self.authority_name == candidate.authority_name
    }

    fn matches_entity(&self, candidate: &UUri) -> bool {
        let service_ok = (self.ue_id & WILDCARD_SERVICE_ID) == WILDCARD_SERVICE_ID
            || (self.ue_id & WILDCARD_SERVICE_ID) == (candidate.ue_id & WILDCARD_SERVICE_ID);
        let instance_ok = (self.ue_id & WILDCARD_INSTANCE_ID) == WILDCARD_INSTANCE_ID
            || (self.ue_id & WILDCARD_INSTANCE_ID) == (candidate.ue_id & WILDCARD_INSTANCE_ID);
        service_ok && instance_ok
    }

    fn matches_version(&self, candidate: &UUri) -> bool {
        self.ue_version_major == WILDCARD_VERSION
            || self.ue_version_major == candidate.ue_version_major
    }

    fn matches_resource(&self, candidate: &UUri) -> bool {
        self.resource_id == WILDCARD_RESOURCE_ID || self.resource_id == candidate.resource_id
    }
}

impl std::fmt::Display for UUri {
    /// Long-form rendering: `//authority/UEID/VERSION/RESOURCE` (hex fields).
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "//{}/{:X}/{:X}/{:X}",
            self.authority_name, self.ue_id, self.ue_version_major, self.resource_id
        )
    }
}
