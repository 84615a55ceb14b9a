use serde::{Deserialize, Serialize};

use super::unix_now;

/// A mitigation applied by the connector to a threat.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MitigationEvent {
    #[serde(rename = "type")]
    pub action: MitigationAction,
    pub info_type: MitigationInfoType,
    pub time: i64,
    pub element_id: String,
    pub reason: MitigationReason,
    pub info: MitigationInfo,
}

impl MitigationEvent {
    pub fn new(
        action: MitigationAction,
        element_id: impl Into<String>,
        reason: MitigationReason,
        info: MitigationInfo,
    ) -> Self {
        Self {
            action,
            info_type: info.info_type(),
            time: unix_now(),
            element_id: element_id.into(),
            reason,
            info,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MitigationAction {
    /// Threat stored in quarantine
    Quarantine,
    /// Threat blocked without quarantine
    Block,
    /// Threat removed without quarantine
    Remove,
    /// A log message warns about the threat
    Log,
}

/// What triggered the mitigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MitigationReason {
    Malware,
    Phishing,
    Error,
    /// The element could not be analyzed
    Invalid,
    TooBig,
    FileType,
    FilePath,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MitigationInfoType {
    File,
    Email,
    Url,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonDetails {
    #[serde(default)]
    pub malwares: Vec<String>,
    /// e.g. expert analysis urls
    #[serde(default)]
    pub gmalware_urls: Vec<String>,
    #[serde(default)]
    pub quarantine_location: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfos {
    #[serde(flatten)]
    pub common: CommonDetails,
    /// Path and name of the file
    pub file: String,
    pub filetype: String,
    pub size: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailInfos {
    #[serde(flatten)]
    pub common: CommonDetails,
    pub subject: String,
    pub sender: String,
    pub recipients: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlInfos {
    #[serde(flatten)]
    pub common: CommonDetails,
    pub method: String,
    pub url: String,
    pub content_length: i64,
    pub content_type: String,
}

/// Element-specific details of a mitigation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MitigationInfo {
    File(FileInfos),
    Email(EmailInfos),
    Url(UrlInfos),
}

impl MitigationInfo {
    pub fn info_type(&self) -> MitigationInfoType {
        match self {
            MitigationInfo::File(_) => MitigationInfoType::File,
            MitigationInfo::Email(_) => MitigationInfoType::Email,
            MitigationInfo::Url(_) => MitigationInfoType::Url,
        }
    }
}

impl From<FileInfos> for MitigationInfo {
    fn from(info: FileInfos) -> Self {
        MitigationInfo::File(info)
    }
}

impl From<EmailInfos> for MitigationInfo {
    fn from(info: EmailInfos) -> Self {
        MitigationInfo::Email(info)
    }
}

impl From<UrlInfos> for MitigationInfo {
    fn from(info: UrlInfos) -> Self {
        MitigationInfo::Url(info)
    }
}
