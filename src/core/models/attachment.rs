use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::user::Ability;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];
const FILE_EXTENSIONS: &[&str] = &[
    "doc", "docx", "xls", "xlsx", "ppt", "pptx", "pdf", "txt", "zip", "rar",
];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "wav"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "flv"];

/// Kind of an uploaded attachment. Serialized as its number.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u8", into = "u8")]
pub enum AttachmentType {
    File,
    Image,
    Audio,
    Video,
    DialogMessage,
    Answer,
}

impl AttachmentType {
    /// Ability an actor needs to upload this kind.
    pub fn required_ability(self) -> Ability {
        match self {
            AttachmentType::File => Ability::InsertAttachment,
            AttachmentType::Image => Ability::InsertImage,
            AttachmentType::Audio => Ability::InsertAudio,
            AttachmentType::Video => Ability::InsertVideo,
            AttachmentType::Answer => Ability::InsertReward,
            AttachmentType::DialogMessage => Ability::CreateDialog,
        }
    }

    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            AttachmentType::File => FILE_EXTENSIONS,
            AttachmentType::Image | AttachmentType::DialogMessage | AttachmentType::Answer => IMAGE_EXTENSIONS,
            AttachmentType::Audio => AUDIO_EXTENSIONS,
            AttachmentType::Video => VIDEO_EXTENSIONS,
        }
    }
}

impl From<AttachmentType> for u8 {
    fn from(kind: AttachmentType) -> Self {
        match kind {
            AttachmentType::File => 0,
            AttachmentType::Image => 1,
            AttachmentType::Audio => 2,
            AttachmentType::Video => 3,
            AttachmentType::DialogMessage => 4,
            AttachmentType::Answer => 5,
        }
    }
}

impl TryFrom<u8> for AttachmentType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AttachmentType::File),
            1 => Ok(AttachmentType::Image),
            2 => Ok(AttachmentType::Audio),
            3 => Ok(AttachmentType::Video),
            4 => Ok(AttachmentType::DialogMessage),
            5 => Ok(AttachmentType::Answer),
            other => Err(format!("unknown attachment type {}", other)),
        }
    }
}

/// Metadata of a file a user is about to attach.
#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAttachment {
    /// 0 file, 1 image, 2 audio, 3 video, 4 dialog message, 5 answer.
    #[serde(rename = "type", default = "default_type")]
    #[schema(value_type = u8, example = 1)]
    pub attachment_type: AttachmentType,
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    #[serde(default)]
    pub order: u32,
}

fn default_type() -> AttachmentType {
    AttachmentType::File
}

impl NewAttachment {
    /// Lower-cased extension of `name`, if it has one.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    #[schema(value_type = u8)]
    pub attachment_type: AttachmentType,
    pub file_name: String,
    pub extension: String,
    pub file_size: u64,
    pub order: u32,
    pub is_approved: bool,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}
